//! Grid track lists for `grid-template-columns` / `grid-template-rows`.
//!
//! Track lists are flattened into one [`Track`] per column or row so an
//! editor can show and resize them individually. `repeat(N, ...)` with a
//! literal count is expanded; `auto-fill` / `auto-fit` repeats cannot be
//! enumerated from text alone and stay as a single opaque track.
//!
//! Expansion is one-directional: serializing an expanded list never
//! reconstructs the `repeat()` notation. A `repeat()` nested in another
//! repeat's template is kept opaque, and a repeat that would grow the list
//! past [`MAX_EXPANDED_TRACKS`] is not expanded.

use crate::minmax::Minmax;
use crate::value::{Node, parse_value, split_commas};

/// Upper bound on a literal `repeat()` count that is still expanded.
pub const MAX_REPEAT_COUNT: usize = 10_000;

/// Upper bound on the number of tracks one list expands to.
pub const MAX_EXPANDED_TRACKS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub value: String,
}

impl Track {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn as_minmax(&self) -> Option<Minmax> {
        crate::minmax::parse_minmax(&self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridAxisMode {
    Explicit,
    AutoFill,
    AutoFit,
    Auto,
    None,
    Subgrid,
    Masonry,
    LineNames,
}

impl GridAxisMode {
    pub fn as_str(self) -> &'static str {
        match self {
            GridAxisMode::Explicit => "explicit",
            GridAxisMode::AutoFill => "auto-fill",
            GridAxisMode::AutoFit => "auto-fit",
            GridAxisMode::Auto => "auto",
            GridAxisMode::None => "none",
            GridAxisMode::Subgrid => "subgrid",
            GridAxisMode::Masonry => "masonry",
            GridAxisMode::LineNames => "line-names",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnsupportedKind {
    Subgrid,
    Masonry,
    LineNames,
    AutoFill,
    AutoFit,
}

impl UnsupportedKind {
    pub fn as_str(self) -> &'static str {
        self.axis_mode().as_str()
    }

    pub fn axis_mode(self) -> GridAxisMode {
        match self {
            UnsupportedKind::Subgrid => GridAxisMode::Subgrid,
            UnsupportedKind::Masonry => GridAxisMode::Masonry,
            UnsupportedKind::LineNames => GridAxisMode::LineNames,
            UnsupportedKind::AutoFill => GridAxisMode::AutoFill,
            UnsupportedKind::AutoFit => GridAxisMode::AutoFit,
        }
    }

    fn reason(self) -> &'static str {
        match self {
            UnsupportedKind::Subgrid => "subgrid tracks are inherited from the parent grid",
            UnsupportedKind::Masonry => "masonry layout has no fixed track list",
            UnsupportedKind::LineNames => "named grid lines cannot be edited visually",
            UnsupportedKind::AutoFill => "repeat(auto-fill, ...) depends on the container size",
            UnsupportedKind::AutoFit => "repeat(auto-fit, ...) depends on the container size",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridTemplateSupport {
    Supported,
    Unsupported {
        reason: String,
        kind: UnsupportedKind,
    },
}

impl GridTemplateSupport {
    fn unsupported(kind: UnsupportedKind) -> Self {
        GridTemplateSupport::Unsupported {
            reason: kind.reason().to_string(),
            kind,
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, GridTemplateSupport::Supported)
    }

    pub fn kind(&self) -> Option<UnsupportedKind> {
        match self {
            GridTemplateSupport::Supported => None,
            GridTemplateSupport::Unsupported { kind, .. } => Some(*kind),
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            GridTemplateSupport::Supported => None,
            GridTemplateSupport::Unsupported { reason, .. } => Some(reason),
        }
    }
}

fn is_empty_template(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none")
}

pub fn parse_track_list(text: &str) -> Vec<Track> {
    if is_empty_template(text) {
        return Vec::new();
    }
    let Ok(nodes) = parse_value(text) else {
        return Vec::new();
    };
    let mut tracks = Vec::new();
    collect_tracks(&nodes, &mut tracks, false);
    tracks
}

fn collect_tracks(nodes: &[Node], out: &mut Vec<Track>, in_repeat: bool) {
    for node in nodes {
        match node {
            Node::WhiteSpace | Node::Brackets(_) => {}
            Node::Identifier(ident) => out.push(Track::new(ident.clone())),
            Node::Dimension { .. } | Node::Percentage(_) | Node::Number { .. } => {
                out.push(Track::new(node.to_css()));
            }
            Node::Function { .. } if !in_repeat && node.is_function("repeat") => {
                match expand_repeat(node, out.len()) {
                    Some(expanded) => out.extend(expanded),
                    None => out.push(Track::new(node.to_css())),
                }
            }
            Node::Function { .. } => out.push(Track::new(node.to_css())),
            _ => {}
        }
    }
}

fn repeat_count(count: &[Node]) -> Option<usize> {
    match count {
        [Node::Number { int_value: Some(n), .. }] if *n > 0 => {
            let n = *n as usize;
            (n <= MAX_REPEAT_COUNT).then_some(n)
        }
        _ => None,
    }
}

fn expand_repeat(node: &Node, existing: usize) -> Option<Vec<Track>> {
    let (_, children) = node.function_children()?;
    let comma = children.iter().position(Node::is_comma)?;
    let count = repeat_count(&children[..comma])?;
    let mut template = Vec::new();
    collect_tracks(&children[comma + 1..], &mut template, true);
    if template.is_empty() {
        return None;
    }
    let total = template.len().checked_mul(count)?;
    if existing.saturating_add(total) > MAX_EXPANDED_TRACKS {
        return None;
    }
    let mut tracks = Vec::with_capacity(total);
    for _ in 0..count {
        tracks.extend(template.iter().cloned());
    }
    Some(tracks)
}

pub fn serialize_track_list(tracks: &[Track]) -> String {
    if tracks.is_empty() {
        return "none".to_string();
    }
    tracks
        .iter()
        .map(|track| track.value.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn classify_axis_mode(text: &str) -> GridAxisMode {
    if is_empty_template(text) {
        return GridAxisMode::None;
    }
    if text.trim().eq_ignore_ascii_case("auto") {
        return GridAxisMode::Auto;
    }
    match check_grid_template_support(text).kind() {
        Some(kind) => kind.axis_mode(),
        None => GridAxisMode::Explicit,
    }
}

/// Reports whether a track list can be edited visually.
///
/// Top-level nodes are scanned in document order and the first
/// unsupported construct wins, so `[a] repeat(auto-fill, 1fr)` reports
/// line names while `repeat(auto-fill, 1fr) [a]` reports auto-fill.
/// `var()` references are accepted; they are resolved before layout.
pub fn check_grid_template_support(text: &str) -> GridTemplateSupport {
    if is_empty_template(text) {
        return GridTemplateSupport::Supported;
    }
    let Ok(nodes) = parse_value(text) else {
        return GridTemplateSupport::Supported;
    };
    if nodes.iter().any(|node| node.ident_eq("subgrid")) {
        return GridTemplateSupport::unsupported(UnsupportedKind::Subgrid);
    }
    if nodes.iter().any(|node| node.ident_eq("masonry")) {
        return GridTemplateSupport::unsupported(UnsupportedKind::Masonry);
    }
    for node in &nodes {
        if let Node::Brackets(_) = node {
            return GridTemplateSupport::unsupported(UnsupportedKind::LineNames);
        }
        if let Some(kind) = auto_repeat_kind(node) {
            return GridTemplateSupport::unsupported(kind);
        }
    }
    GridTemplateSupport::Supported
}

fn auto_repeat_kind(node: &Node) -> Option<UnsupportedKind> {
    if !node.is_function("repeat") {
        return None;
    }
    let (_, children) = node.function_children()?;
    let first = split_commas(children).into_iter().next()?;
    match first {
        [count] if count.ident_eq("auto-fill") => Some(UnsupportedKind::AutoFill),
        [count] if count.ident_eq("auto-fit") => Some(UnsupportedKind::AutoFit),
        _ => None,
    }
}

/// Modes whose track count has to be measured from the rendered grid.
pub fn is_implicit_mode(mode: GridAxisMode) -> bool {
    matches!(
        mode,
        GridAxisMode::AutoFill | GridAxisMode::AutoFit | GridAxisMode::Auto | GridAxisMode::None
    )
}

pub fn is_editable_mode(mode: GridAxisMode) -> bool {
    matches!(
        mode,
        GridAxisMode::Explicit | GridAxisMode::Auto | GridAxisMode::None
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(tracks: &[Track]) -> Vec<&str> {
        tracks.iter().map(|track| track.value.as_str()).collect()
    }

    #[test]
    fn empty_and_none_yield_no_tracks() {
        assert!(parse_track_list("").is_empty());
        assert!(parse_track_list("none").is_empty());
        assert!(parse_track_list("  NONE ").is_empty());
        assert_eq!(serialize_track_list(&[]), "none");
    }

    #[test]
    fn simple_track_lists_round_trip() {
        for text in [
            "1fr 2fr 1fr",
            "100px auto 20%",
            "min-content max-content 0",
            "minmax(100px,1fr) fit-content(300px) 1fr",
        ] {
            assert_eq!(serialize_track_list(&parse_track_list(text)), text);
        }
        assert_eq!(
            serialize_track_list(&parse_track_list("  1fr    minmax(10px , auto) ")),
            "1fr minmax(10px,auto)"
        );
    }

    #[test]
    fn repeat_with_literal_count_expands() {
        assert_eq!(
            parse_track_list("repeat(3, 1fr)"),
            vec![Track::new("1fr"), Track::new("1fr"), Track::new("1fr")]
        );
        assert_eq!(
            values(&parse_track_list("repeat(2, 100px 1fr)")),
            vec!["100px", "1fr", "100px", "1fr"]
        );
        assert_eq!(
            values(&parse_track_list("50px repeat(2, [col] minmax(0, 1fr)) [end] 50px")),
            vec!["50px", "minmax(0,1fr)", "minmax(0,1fr)", "50px"]
        );
    }

    #[test]
    fn non_enumerable_repeat_stays_opaque() {
        assert_eq!(
            parse_track_list("repeat(auto-fill, 100px)"),
            vec![Track::new("repeat(auto-fill,100px)")]
        );
        assert_eq!(
            values(&parse_track_list("repeat(auto-fit, minmax(200px, 1fr))")),
            vec!["repeat(auto-fit,minmax(200px,1fr))"]
        );
        for text in [
            "repeat(0, 1fr)",
            "repeat(-2, 1fr)",
            "repeat(1.5, 1fr)",
            "repeat(var(--n), 1fr)",
            "repeat(20000, 1fr)",
            "repeat(2, [a])",
        ] {
            let tracks = parse_track_list(text);
            assert_eq!(tracks.len(), 1, "{text}");
            assert!(tracks[0].value.starts_with("repeat("), "{text}");
        }
    }

    #[test]
    fn nested_repeat_stays_opaque_inside_template() {
        assert_eq!(
            values(&parse_track_list("repeat(2, repeat(3, 1fr) 10px)")),
            vec!["repeat(3,1fr)", "10px", "repeat(3,1fr)", "10px"]
        );
        let tracks = parse_track_list("repeat(10000, repeat(10000, repeat(10000, 1fr)))");
        assert_eq!(tracks.len(), MAX_EXPANDED_TRACKS);
        assert!(tracks.iter().all(|track| track.value == "repeat(10000,repeat(10000,1fr))"));
    }

    #[test]
    fn expansion_is_capped_per_list() {
        assert_eq!(
            values(&parse_track_list("repeat(10000, 1fr 2fr)")),
            vec!["repeat(10000,1fr 2fr)"]
        );
        let tracks = parse_track_list("repeat(6000, 1fr) repeat(6000, 2fr)");
        assert_eq!(tracks.len(), 6001);
        assert_eq!(tracks[6000].value, "repeat(6000,2fr)");
    }

    #[test]
    fn decimal_tracks_round_trip() {
        for text in ["33.33333% 1.125fr", "123456789px 0.001fr", "minmax(12.75px,2.5fr)"] {
            assert_eq!(serialize_track_list(&parse_track_list(text)), text);
        }
    }

    #[test]
    fn keywords_are_matched_as_identifiers() {
        assert!(check_grid_template_support("var(--subgrid-cols)").is_supported());
        assert_eq!(classify_axis_mode("var(--masonry-rows)"), GridAxisMode::Explicit);
        assert_eq!(classify_axis_mode("SUBGRID"), GridAxisMode::Subgrid);
    }

    #[test]
    fn line_names_are_dropped() {
        assert_eq!(
            values(&parse_track_list("[header] 1fr [content] 2fr [footer]")),
            vec!["1fr", "2fr"]
        );
    }

    #[test]
    fn tracks_expose_minmax() {
        let tracks = parse_track_list("minmax(100px, 1fr) 2fr");
        assert_eq!(tracks[0].as_minmax(), Some(Minmax::new("100px", "1fr")));
        assert_eq!(tracks[1].as_minmax(), None);
    }

    #[test]
    fn support_check_reports_kind() {
        let subgrid = check_grid_template_support("subgrid");
        assert!(!subgrid.is_supported());
        assert_eq!(subgrid.kind(), Some(UnsupportedKind::Subgrid));
        assert_eq!(
            check_grid_template_support("masonry").kind(),
            Some(UnsupportedKind::Masonry)
        );
        assert_eq!(
            check_grid_template_support("repeat(auto-fill, 100px)").kind(),
            Some(UnsupportedKind::AutoFill)
        );
        assert_eq!(
            check_grid_template_support("repeat(auto-fit, 100px)").kind(),
            Some(UnsupportedKind::AutoFit)
        );
        let names = check_grid_template_support("[header] 1fr [content] 2fr");
        assert_eq!(names.kind(), Some(UnsupportedKind::LineNames));
        assert!(names.reason().is_some());
        assert_eq!(names.kind().map(UnsupportedKind::as_str), Some("line-names"));
    }

    #[test]
    fn support_check_accepts_plain_and_var_values() {
        for text in ["", "none", "1fr 1fr", "repeat(3, 1fr)", "var(--cols)", "repeat(2, [a] 1fr)"] {
            assert!(check_grid_template_support(text).is_supported(), "{text}");
        }
    }

    #[test]
    fn first_unsupported_construct_wins() {
        assert_eq!(
            check_grid_template_support("[a] repeat(auto-fill, 1fr)").kind(),
            Some(UnsupportedKind::LineNames)
        );
        assert_eq!(
            check_grid_template_support("repeat(auto-fill, 1fr) [a]").kind(),
            Some(UnsupportedKind::AutoFill)
        );
    }

    #[test]
    fn axis_modes_classify() {
        assert_eq!(classify_axis_mode(""), GridAxisMode::None);
        assert_eq!(classify_axis_mode("none"), GridAxisMode::None);
        assert_eq!(classify_axis_mode("auto"), GridAxisMode::Auto);
        assert_eq!(classify_axis_mode("subgrid [a]"), GridAxisMode::Subgrid);
        assert_eq!(classify_axis_mode("masonry"), GridAxisMode::Masonry);
        assert_eq!(classify_axis_mode("repeat(auto-fit, 1fr)"), GridAxisMode::AutoFit);
        assert_eq!(classify_axis_mode("repeat(auto-fill, 1fr)"), GridAxisMode::AutoFill);
        assert_eq!(classify_axis_mode("[a] 1fr"), GridAxisMode::LineNames);
        assert_eq!(classify_axis_mode("1fr auto 2fr"), GridAxisMode::Explicit);
        assert_eq!(GridAxisMode::AutoFill.as_str(), "auto-fill");
    }

    #[test]
    fn mode_predicates() {
        assert!(is_implicit_mode(GridAxisMode::AutoFill));
        assert!(is_implicit_mode(GridAxisMode::None));
        assert!(!is_implicit_mode(GridAxisMode::Explicit));
        assert!(is_editable_mode(GridAxisMode::Explicit));
        assert!(!is_editable_mode(GridAxisMode::Subgrid));
        assert!(!is_editable_mode(GridAxisMode::LineNames));
        assert!(!is_editable_mode(GridAxisMode::AutoFit));
    }
}
