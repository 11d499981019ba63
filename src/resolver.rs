//! Custom-property (`--x` / `var()`) resolution over a whole stylesheet.
//!
//! The stylesheet is parsed with `lightningcss` and rewritten in four
//! passes:
//!
//! 1. rules outside the supported subset are removed (at-rules, selectors
//!    with pseudo-classes, selectors not starting with `*` or `.`);
//! 2. `--name: value` declarations are moved out of their rules into a
//!    table, last declaration wins;
//! 3. `var()` references are substituted [`MAX_SUBSTITUTION_DEPTH`] times,
//!    in the table and in the remaining declarations;
//! 4. declarations still holding a `var()` are dropped with a diagnostic,
//!    then empty rules are dropped.
//!
//! Substituted tokens are not re-scanned within the same iteration, so a
//! cyclic definition terminates after the fixed number of iterations.
//!
//! Each table iteration replaces a reference with the previous iteration's
//! value of its target, so a definition's reach doubles per iteration, and
//! declarations read the table after it has been updated. Five iterations
//! resolve any reference chain of up to [`MAX_RESOLVED_CHAIN`] links; a
//! longer chain is reported as unresolved.

use crate::debug::{DebugCounters, DebugLogger};
use crate::error::{CssValueError, Result};
use lightningcss::properties::Property;
use lightningcss::properties::custom::{CustomProperty, CustomPropertyName, TokenList, TokenOrValue};
use lightningcss::rules::{CssRule, CssRuleList};
use lightningcss::rules::style::StyleRule;
use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::traits::ToCss;
use rayon::prelude::*;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};

/// Number of substitution iterations over the stylesheet.
pub const MAX_SUBSTITUTION_DEPTH: usize = 5;

/// Longest `--a: var(--b)` chain, counted in links, that still resolves.
pub const MAX_RESOLVED_CHAIN: usize = (1 << (MAX_SUBSTITUTION_DEPTH + 1)) - 3;

const UNKNOWN_SELECTOR: &str = "unknown";

type TokenTable<'i> = HashMap<String, CustomProperty<'i>>;

/// Custom property declarations as written, before substitution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCustomProperties {
    values: BTreeMap<String, String>,
}

impl RawCustomProperties {
    fn from_table(table: &TokenTable<'_>) -> Self {
        let values = table
            .iter()
            .map(|(name, custom)| {
                let raw = Property::Custom(custom.clone())
                    .value_to_css_string(PrinterOptions::default())
                    .unwrap_or_default();
                (name.clone(), raw)
            })
            .collect();
        Self { values }
    }

    pub fn raw_value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub css: String,
    /// Declarations dropped because a `var()` stayed unresolved.
    pub unresolved: usize,
    pub custom_properties: RawCustomProperties,
    /// Substitution iterations that replaced at least one reference.
    pub iterations: usize,
}

#[derive(Debug, Clone)]
pub struct BatchResolution {
    pub resolution: Resolution,
    pub diagnostics: Vec<String>,
}

#[derive(Clone)]
pub struct CustomPropertyResolver {
    minify: bool,
    debug: Option<DebugLogger>,
}

impl Default for CustomPropertyResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CustomPropertyResolver {
    pub fn new() -> Self {
        Self {
            minify: true,
            debug: None,
        }
    }

    pub(crate) fn with_options(minify: bool, debug: Option<DebugLogger>) -> Self {
        Self { minify, debug }
    }

    pub fn resolve<F>(&self, css: &str, mut on_diagnostic: F) -> Result<Resolution>
    where
        F: FnMut(bool, &str),
    {
        let logger = self.debug.as_ref();
        let mut sheet = parse_stylesheet(css)?;

        let dropped_rules = retain_supported_rules(&mut sheet.rules, logger);

        let mut table = TokenTable::new();
        extract_custom_properties_from(&mut sheet.rules, &mut table);
        let custom_properties = RawCustomProperties::from_table(&table);
        if let Some(logger) = logger {
            for (name, raw) in &custom_properties.values {
                logger.log_event(json!({
                    "type": "css.custom.extracted",
                    "name": name,
                    "value": raw,
                }));
            }
        }

        let mut iterations = 0;
        let mut substituted = 0;
        for _ in 0..MAX_SUBSTITUTION_DEPTH {
            let snapshot = table.clone();
            let mut replaced = 0;
            for custom in table.values_mut() {
                replaced += substitute_tokens(&mut custom.value, &snapshot);
            }
            replaced += substitute_rules(&mut sheet.rules, &table);
            if replaced == 0 {
                // Nothing changed, so the remaining iterations would be no-ops.
                break;
            }
            iterations += 1;
            substituted += replaced;
        }

        let unresolved = drop_unresolved(&mut sheet.rules, &mut on_diagnostic, logger);

        let printed = sheet
            .to_css(PrinterOptions {
                minify: self.minify,
                ..PrinterOptions::default()
            })
            .map_err(|err| CssValueError::Print(err.to_string()))?;

        if let Some(logger) = logger {
            let mut counters = DebugCounters::default();
            counters.increment("css.rules_dropped", dropped_rules as u64);
            counters.increment("css.custom_properties", custom_properties.len() as u64);
            counters.increment("css.var_substituted", substituted as u64);
            counters.increment("css.var_unresolved", unresolved as u64);
            logger.log_event(json!({
                "type": "css.resolve.summary",
                "iterations": iterations,
                "unresolved": unresolved,
            }));
            logger.emit_summary("resolve", &counters);
            logger.flush();
        }

        Ok(Resolution {
            css: printed.code,
            unresolved,
            custom_properties,
            iterations,
        })
    }

    /// Resolves independent stylesheets in parallel, keeping input order.
    pub fn resolve_batch(&self, sheets: &[&str]) -> Vec<Result<BatchResolution>> {
        sheets
            .par_iter()
            .map(|css| -> Result<BatchResolution> {
                let mut diagnostics = Vec::new();
                let resolution =
                    self.resolve(css, |_, message| diagnostics.push(message.to_string()))?;
                Ok(BatchResolution {
                    resolution,
                    diagnostics,
                })
            })
            .collect()
    }
}

/// Resolves `var()` references in `css` and returns the minified result.
///
/// Never fails: a stylesheet that cannot be parsed or printed is reported
/// through `on_diagnostic` with `false` and yields an empty string.
pub fn resolve_custom_properties<F>(css: &str, mut on_diagnostic: F) -> String
where
    F: FnMut(bool, &str),
{
    match CustomPropertyResolver::new().resolve(css, &mut on_diagnostic) {
        Ok(resolution) => resolution.css,
        Err(err) => {
            on_diagnostic(false, &err.to_string());
            String::new()
        }
    }
}

pub fn resolve_batch(sheets: &[&str]) -> Vec<Result<BatchResolution>> {
    CustomPropertyResolver::new().resolve_batch(sheets)
}

/// Custom properties declared by the supported rules of `css`.
pub fn extract_custom_properties(css: &str) -> Result<RawCustomProperties> {
    let mut sheet = parse_stylesheet(css)?;
    retain_supported_rules(&mut sheet.rules, None);
    let mut table = TokenTable::new();
    extract_custom_properties_from(&mut sheet.rules, &mut table);
    Ok(RawCustomProperties::from_table(&table))
}

fn parse_stylesheet<'i, 'o>(css: &'i str) -> Result<StyleSheet<'i, 'o>> {
    let options = ParserOptions {
        error_recovery: true,
        ..ParserOptions::default()
    };
    StyleSheet::parse(css, options).map_err(|err| CssValueError::Stylesheet(err.to_string()))
}

fn selector_text(style: &StyleRule<'_>) -> String {
    style
        .selectors
        .to_css_string(PrinterOptions::default())
        .unwrap_or_default()
}

fn retain_supported_rules(rules: &mut CssRuleList<'_>, logger: Option<&DebugLogger>) -> usize {
    let mut dropped = 0;
    rules.0.retain_mut(|rule| {
        let (keep, selector, reason) = match rule {
            CssRule::Style(style) => {
                let selector = selector_text(style);
                if selector.contains(':') {
                    (false, selector, "pseudo_class")
                } else if !(selector.starts_with('*') || selector.starts_with('.')) {
                    (false, selector, "selector_not_class_or_universal")
                } else {
                    dropped += retain_supported_rules(&mut style.rules, logger);
                    (true, selector, "")
                }
            }
            _ => (false, String::new(), "at_rule"),
        };
        if !keep {
            dropped += 1;
            if let Some(logger) = logger {
                logger.log_event(json!({
                    "type": "css.rule.dropped",
                    "selector": selector,
                    "reason": reason,
                }));
            }
        }
        keep
    });
    dropped
}

fn extract_custom_properties_from<'i>(rules: &mut CssRuleList<'i>, table: &mut TokenTable<'i>) {
    for rule in rules.0.iter_mut() {
        if let CssRule::Style(style) = rule {
            extract_from_block(&mut style.declarations.declarations, table);
            extract_from_block(&mut style.declarations.important_declarations, table);
            extract_custom_properties_from(&mut style.rules, table);
        }
    }
}

fn extract_from_block<'i>(declarations: &mut Vec<Property<'i>>, table: &mut TokenTable<'i>) {
    let mut kept = Vec::with_capacity(declarations.len());
    for property in declarations.drain(..) {
        match property {
            Property::Custom(custom) if matches!(custom.name, CustomPropertyName::Custom(_)) => {
                let name = custom.name.as_ref().to_string();
                table.insert(name, custom);
            }
            other => kept.push(other),
        }
    }
    *declarations = kept;
}

fn property_tokens_mut<'a, 'i>(property: &'a mut Property<'i>) -> Option<&'a mut TokenList<'i>> {
    match property {
        Property::Unparsed(unparsed) => Some(&mut unparsed.value),
        Property::Custom(custom) => Some(&mut custom.value),
        _ => None,
    }
}

fn property_tokens<'a, 'i>(property: &'a Property<'i>) -> Option<&'a TokenList<'i>> {
    match property {
        Property::Unparsed(unparsed) => Some(&unparsed.value),
        Property::Custom(custom) => Some(&custom.value),
        _ => None,
    }
}

fn substitute_rules<'i>(rules: &mut CssRuleList<'i>, table: &TokenTable<'i>) -> usize {
    let mut replaced = 0;
    for rule in rules.0.iter_mut() {
        if let CssRule::Style(style) = rule {
            let block = &mut style.declarations;
            for property in block
                .declarations
                .iter_mut()
                .chain(block.important_declarations.iter_mut())
            {
                if let Some(tokens) = property_tokens_mut(property) {
                    replaced += substitute_tokens(tokens, table);
                }
            }
            replaced += substitute_rules(&mut style.rules, table);
        }
    }
    replaced
}

// One substitution step; inserted tokens are left for the next iteration.
fn substitute_tokens<'i>(tokens: &mut TokenList<'i>, table: &TokenTable<'i>) -> usize {
    let mut replaced = 0;
    let mut out = Vec::with_capacity(tokens.0.len());
    for token in tokens.0.drain(..) {
        match token {
            TokenOrValue::Var(var) => {
                let name: &str = var.name.ident.as_ref();
                if let Some(definition) = table.get(name) {
                    out.extend(definition.value.0.iter().cloned());
                    replaced += 1;
                    continue;
                }
                match var.fallback {
                    Some(fallback) => {
                        out.extend(fallback.0);
                        replaced += 1;
                    }
                    None => out.push(TokenOrValue::Var(var)),
                }
            }
            TokenOrValue::Function(mut function) => {
                replaced += substitute_tokens(&mut function.arguments, table);
                out.push(TokenOrValue::Function(function));
            }
            other => out.push(other),
        }
    }
    tokens.0 = out;
    replaced
}

fn first_unresolved(tokens: &TokenList<'_>) -> Option<String> {
    for token in &tokens.0 {
        match token {
            TokenOrValue::Var(var) => {
                let name: &str = var.name.ident.as_ref();
                return Some(format!("var({name})"));
            }
            TokenOrValue::Function(function) => {
                if let Some(found) = first_unresolved(&function.arguments) {
                    return Some(found);
                }
            }
            _ => {}
        }
    }
    None
}

fn drop_unresolved<F>(
    rules: &mut CssRuleList<'_>,
    on_diagnostic: &mut F,
    logger: Option<&DebugLogger>,
) -> usize
where
    F: FnMut(bool, &str),
{
    let mut dropped = 0;
    for rule in rules.0.iter_mut() {
        if let CssRule::Style(style) = rule {
            let mut selector = selector_text(style);
            if selector.trim().is_empty() {
                selector = UNKNOWN_SELECTOR.to_string();
            }
            let block = &mut style.declarations;
            for (declarations, important) in [
                (&mut block.declarations, false),
                (&mut block.important_declarations, true),
            ] {
                declarations.retain(|property| {
                    let Some(reference) = property_tokens(property).and_then(first_unresolved)
                    else {
                        return true;
                    };
                    let declaration = property
                        .to_css_string(important, PrinterOptions::default())
                        .unwrap_or_else(|_| reference.clone());
                    let message = format!(
                        "unresolved {reference} in declaration `{declaration}` of selector `{selector}`"
                    );
                    on_diagnostic(true, &message);
                    if let Some(logger) = logger {
                        logger.log_event(json!({
                            "type": "css.var.unresolved",
                            "reference": reference,
                            "declaration": declaration,
                            "selector": selector,
                        }));
                    }
                    dropped += 1;
                    false
                });
            }
            dropped += drop_unresolved(&mut style.rules, on_diagnostic, logger);
        }
    }
    rules.0.retain(|rule| match rule {
        CssRule::Style(style) => {
            !(style.declarations.declarations.is_empty()
                && style.declarations.important_declarations.is_empty()
                && style.rules.0.is_empty())
        }
        _ => true,
    });
    dropped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn resolve_collecting(css: &str) -> (String, Vec<(bool, String)>) {
        let mut diagnostics = Vec::new();
        let out = resolve_custom_properties(css, |unresolved, message| {
            diagnostics.push((unresolved, message.to_string()));
        });
        (out, diagnostics)
    }

    #[test]
    fn universal_definition_resolves_class_reference() {
        let (css, diagnostics) = resolve_collecting("*{--a:red} .c{color:var(--a)}");
        assert_eq!(css, ".c{color:red}");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn missing_reference_drops_declaration_with_one_diagnostic() {
        let (css, diagnostics) =
            resolve_collecting(".c{--x:var(--missing)} .c{background:var(--x)}");
        assert!(!css.contains("background"), "css={css}");
        assert!(!css.contains(".c"), "css={css}");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].0);
        assert!(diagnostics[0].1.contains("var(--missing)"), "{}", diagnostics[0].1);
        assert!(diagnostics[0].1.contains(".c"));
    }

    #[test]
    fn dropping_one_declaration_keeps_the_rest_of_the_rule() {
        let (css, diagnostics) = resolve_collecting(".c{color:var(--nope);width:10px}");
        assert_eq!(css, ".c{width:10px}");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn nested_chain_resolves_within_bound() {
        let (css, diagnostics) = resolve_collecting(
            ".c{--a:var(--b);--b:var(--c);--c:var(--d);--d:var(--e);--e:1px} .c{margin:var(--a)}",
        );
        assert_eq!(css, ".c{margin:1px}");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn fallback_is_used_when_definition_is_missing() {
        let (css, diagnostics) =
            resolve_collecting(".c{--size:2px} .c{padding:var(--gap, var(--size))}");
        assert_eq!(css, ".c{padding:2px}");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn references_inside_functions_are_substituted() {
        let (css, diagnostics) =
            resolve_collecting(".c{--w:10px} .c{width:calc(var(--w) + 5px)}");
        assert!(css.starts_with(".c{width:calc("), "css={css}");
        assert!(css.contains("10px"), "css={css}");
        assert!(!css.contains("var("));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn cyclic_definitions_terminate_and_report() {
        let (css, diagnostics) =
            resolve_collecting(".c{--a:var(--b);--b:var(--a)} .c{color:var(--a)}");
        assert_eq!(css, "");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn out_of_scope_rules_are_removed() {
        let (css, diagnostics) = resolve_collecting(
            "@media (min-width: 10px){.m{color:blue}} .a:hover{color:red} div{color:red} #id{color:red} .k{color:green}",
        );
        assert_eq!(css, ".k{color:green}");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn pseudo_scoped_definitions_are_ignored() {
        let (css, diagnostics) = resolve_collecting(":root{--a:red} .c{color:var(--a)}");
        assert_eq!(css, "");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn last_declaration_wins() {
        let props = extract_custom_properties("*{--a:1px} .b{--a:2px;--c:red}").expect("extract");
        assert_eq!(props.len(), 2);
        assert_eq!(props.raw_value("--a"), Some("2px"));
        assert!(props.contains("--c"));
        assert_eq!(props.names().collect::<Vec<_>>(), vec!["--a", "--c"]);
        assert!(!props.is_empty());
    }

    #[test]
    fn resolution_reports_counts() {
        let resolution = CustomPropertyResolver::new()
            .resolve(".c{--a:1px} .c{top:var(--a);left:var(--z)}", |_, _| {})
            .expect("resolve");
        assert_eq!(resolution.unresolved, 1);
        assert_eq!(resolution.iterations, 1);
        assert_eq!(resolution.custom_properties.raw_value("--a"), Some("1px"));
        assert_eq!(resolution.css, ".c{top:1px}");
    }

    fn chain_css(links: usize) -> String {
        let mut css = String::from(".c{");
        for idx in 0..links {
            css.push_str(&format!("--p{idx}:var(--p{});", idx + 1));
        }
        css.push_str(&format!("--p{links}:1px}} .c{{margin:var(--p0)}}"));
        css
    }

    #[test]
    fn chain_resolves_up_to_the_doubling_limit() {
        assert_eq!(MAX_RESOLVED_CHAIN, 61);
        for links in [5, 9, 33, MAX_RESOLVED_CHAIN] {
            let (css, diagnostics) = resolve_collecting(&chain_css(links));
            assert_eq!(css, ".c{margin:1px}", "links={links}");
            assert!(diagnostics.is_empty(), "links={links}");
        }
    }

    #[test]
    fn chain_past_the_limit_is_reported() {
        let links = MAX_RESOLVED_CHAIN + 1;
        let (css, diagnostics) = resolve_collecting(&chain_css(links));
        assert_eq!(css, "");
        assert_eq!(diagnostics.len(), 1);
        assert!(
            diagnostics[0].1.contains(&format!("var(--p{links})")),
            "{}",
            diagnostics[0].1
        );
    }

    #[test]
    fn batch_resolution_keeps_order_and_diagnostics() {
        let results = resolve_batch(&[
            "*{--a:red} .c{color:var(--a)}",
            ".c{color:var(--missing)}",
        ]);
        assert_eq!(results.len(), 2);
        let first = results[0].as_ref().expect("first");
        assert_eq!(first.resolution.css, ".c{color:red}");
        assert!(first.diagnostics.is_empty());
        let second = results[1].as_ref().expect("second");
        assert_eq!(second.resolution.css, "");
        assert_eq!(second.diagnostics.len(), 1);
    }

    #[test]
    fn batch_summaries_count_each_sheet_separately() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let path = std::env::temp_dir().join(format!(
            "css_value_engine_batch_{}_{}.jsonl",
            std::process::id(),
            nanos
        ));
        let logger = DebugLogger::new(&path).expect("debug logger");
        let resolver = CustomPropertyResolver::with_options(true, Some(logger.clone()));
        let sheets: Vec<String> = (0..8)
            .map(|idx| {
                if idx % 2 == 0 {
                    ".a{--x:1px} .a{top:var(--x)}".to_string()
                } else {
                    ".b{left:var(--nope)}".to_string()
                }
            })
            .collect();
        let refs: Vec<&str> = sheets.iter().map(String::as_str).collect();
        let results = resolver.resolve_batch(&refs);
        assert!(results.iter().all(|result| result.is_ok()));
        logger.flush();

        let log = std::fs::read_to_string(&path).expect("read debug log");
        let summaries: Vec<serde_json::Value> = log
            .lines()
            .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
            .filter(|record| record["type"] == "debug.summary")
            .collect();
        assert_eq!(summaries.len(), 8);
        for summary in &summaries {
            let counts = &summary["counts"];
            if counts.get("css.var_unresolved").is_some() {
                assert_eq!(counts["css.var_unresolved"], 1);
                assert!(counts.get("css.custom_properties").is_none(), "{summary}");
            } else {
                assert_eq!(counts["css.custom_properties"], 1, "{summary}");
                assert_eq!(counts["css.var_substituted"], 1, "{summary}");
            }
        }
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn debug_log_records_unresolved_references() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let path = std::env::temp_dir().join(format!(
            "css_value_engine_resolver_{}_{}.jsonl",
            std::process::id(),
            nanos
        ));
        let logger = DebugLogger::new(&path).expect("debug logger");
        let resolver = CustomPropertyResolver::with_options(true, Some(logger.clone()));
        resolver
            .resolve("@media print{.p{color:red}} .c{--x:1px;top:var(--y)}", |_, _| {})
            .expect("resolve");
        drop(resolver);
        drop(logger);
        let log = std::fs::read_to_string(&path).expect("read debug log");
        assert!(log.contains("\"css.rule.dropped\""));
        assert!(log.contains("\"css.custom.extracted\""));
        assert!(log.contains("\"css.var.unresolved\""));
        assert!(log.contains("\"css.var_unresolved\":1"));
        let _ = std::fs::remove_file(path);
    }
}
