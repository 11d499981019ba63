//! Component-value trees for single CSS property values.
//!
//! Tokenization is delegated to `cssparser`; this module only folds the
//! token stream into nested [`Node`]s and prints them back in a canonical
//! form (commas without surrounding space, single spaces between
//! components, shortest numbers). Every codec in the crate consumes this
//! tree instead of re-scanning text.

use crate::error::{CssValueError, Result};
use cssparser::{ParseError, Parser, ParserInput, Token};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Identifier(String),
    Dimension { value: f64, unit: String },
    /// Percentage in percent units (`60%` is `60.0`).
    Percentage(f64),
    Number { value: f64, int_value: Option<i32> },
    Function { name: String, children: Vec<Node> },
    Brackets(Vec<Node>),
    Parentheses(Vec<Node>),
    Operator(char),
    WhiteSpace,
    Hash(String),
    String(String),
    Url(String),
}

impl Node {
    pub fn is_function(&self, name: &str) -> bool {
        matches!(self, Node::Function { name: own, .. } if own.eq_ignore_ascii_case(name))
    }

    pub fn ident_eq(&self, name: &str) -> bool {
        matches!(self, Node::Identifier(ident) if ident.eq_ignore_ascii_case(name))
    }

    pub fn is_comma(&self) -> bool {
        matches!(self, Node::Operator(','))
    }

    pub fn function_children(&self) -> Option<(&str, &[Node])> {
        match self {
            Node::Function { name, children } => Some((name.as_str(), children.as_slice())),
            _ => None,
        }
    }

    pub fn to_css(&self) -> String {
        let mut out = String::new();
        write_node(self, &mut out);
        out
    }
}

pub fn parse_value(text: &str) -> Result<Vec<Node>> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    parse_node_list(&mut parser).map_err(|err| CssValueError::Syntax {
        line: err.location.line + 1,
        column: err.location.column,
        message: format!("{:?}", err.kind),
    })
}

fn parse_node_list<'i, 't>(
    parser: &mut Parser<'i, 't>,
) -> std::result::Result<Vec<Node>, ParseError<'i, ()>> {
    let mut nodes = Vec::new();
    loop {
        let start = parser.position();
        let token = match parser.next_including_whitespace() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        // Numbers are re-read from the source so `60%` stays exactly 60.
        let source = parser.slice_from(start);
        let node = match token {
            Token::WhiteSpace(_) => Node::WhiteSpace,
            Token::Ident(ident) => Node::Identifier(ident.to_string()),
            Token::Number { value, int_value, .. } => Node::Number {
                value: leading_number(source).unwrap_or(f64::from(value)),
                int_value,
            },
            Token::Percentage { unit_value, .. } => Node::Percentage(
                leading_number(source).unwrap_or(f64::from(unit_value) * 100.0),
            ),
            Token::Dimension { value, unit, .. } => Node::Dimension {
                value: leading_number(source).unwrap_or(f64::from(value)),
                unit: unit.to_ascii_lowercase(),
            },
            Token::Function(name) => {
                let name = name.to_string();
                let children = parser.parse_nested_block(|nested| parse_node_list(nested))?;
                Node::Function { name, children }
            }
            Token::SquareBracketBlock => {
                Node::Brackets(parser.parse_nested_block(|nested| parse_node_list(nested))?)
            }
            Token::ParenthesisBlock => {
                Node::Parentheses(parser.parse_nested_block(|nested| parse_node_list(nested))?)
            }
            Token::Comma => Node::Operator(','),
            Token::Colon => Node::Operator(':'),
            Token::Delim(c) => Node::Operator(c),
            Token::Hash(value) | Token::IDHash(value) => Node::Hash(value.to_string()),
            Token::QuotedString(value) => Node::String(value.to_string()),
            Token::UnquotedUrl(value) => Node::Url(value.to_string()),
            other => return Err(parser.new_unexpected_token_error(other)),
        };
        nodes.push(node);
    }
    Ok(normalize_whitespace(nodes))
}

// Drops whitespace at the list edges and around commas, and collapses runs.
fn normalize_whitespace(nodes: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::WhiteSpace => {
                if matches!(out.last(), None | Some(Node::WhiteSpace) | Some(Node::Operator(','))) {
                    continue;
                }
                out.push(Node::WhiteSpace);
            }
            Node::Operator(',') => {
                if matches!(out.last(), Some(Node::WhiteSpace)) {
                    out.pop();
                }
                out.push(Node::Operator(','));
            }
            other => out.push(other),
        }
    }
    if matches!(out.last(), Some(Node::WhiteSpace)) {
        out.pop();
    }
    out
}

pub fn generate(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(node, &mut out);
    }
    out
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Identifier(ident) => out.push_str(ident),
        Node::Dimension { value, unit } => {
            out.push_str(&format_number(*value));
            out.push_str(unit);
        }
        Node::Percentage(value) => {
            out.push_str(&format_number(*value));
            out.push('%');
        }
        Node::Number { value, .. } => out.push_str(&format_number(*value)),
        Node::Function { name, children } => {
            out.push_str(name);
            out.push('(');
            out.push_str(&generate(children));
            out.push(')');
        }
        Node::Brackets(children) => {
            out.push('[');
            out.push_str(&generate(children));
            out.push(']');
        }
        Node::Parentheses(children) => {
            out.push('(');
            out.push_str(&generate(children));
            out.push(')');
        }
        Node::Operator(c) => out.push(*c),
        Node::WhiteSpace => out.push(' '),
        Node::Hash(value) => {
            out.push('#');
            out.push_str(value);
        }
        Node::String(value) => {
            out.push('"');
            for ch in value.chars() {
                match ch {
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    '\n' => out.push_str("\\a "),
                    _ => out.push(ch),
                }
            }
            out.push('"');
        }
        Node::Url(value) => {
            out.push_str("url(");
            out.push_str(value);
            out.push(')');
        }
    }
}

/// Shortest decimal form that reads back to the same value.
pub fn format_number<T>(value: T) -> String
where
    T: Copy + Into<f64> + fmt::Display,
{
    let wide: f64 = value.into();
    if !wide.is_finite() || wide == 0.0 {
        return "0".to_string();
    }
    value.to_string()
}

// `[+-]digits[.digits][e[+-]digits]` at the start of a numeric token.
fn leading_number(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let digits = |from: usize| bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    end += digits(end);
    if bytes.get(end) == Some(&b'.') && bytes.get(end + 1).is_some_and(u8::is_ascii_digit) {
        end += 1;
        end += digits(end);
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exponent = end + 1;
        if matches!(bytes.get(exponent), Some(b'+' | b'-')) {
            exponent += 1;
        }
        if bytes.get(exponent).is_some_and(u8::is_ascii_digit) {
            end = exponent + digits(exponent);
        }
    }
    text[..end].parse().ok()
}

/// Splits a node list on top-level commas. An empty list yields no groups.
pub fn split_commas(nodes: &[Node]) -> Vec<&[Node]> {
    if nodes.is_empty() {
        return Vec::new();
    }
    nodes.split(|node| node.is_comma()).collect()
}

/// A `var(--name[, fallback])` reference. The fallback is kept as raw text.
#[derive(Debug, Clone, PartialEq)]
pub struct VarRef {
    pub name: String,
    pub fallback: Option<String>,
}

impl VarRef {
    pub fn from_node(node: &Node) -> Option<VarRef> {
        let (name, children) = node.function_children()?;
        if !name.eq_ignore_ascii_case("var") {
            return None;
        }
        let (head, fallback) = match children.iter().position(Node::is_comma) {
            Some(idx) => (&children[..idx], Some(generate(&children[idx + 1..]))),
            None => (children, None),
        };
        match head {
            [Node::Identifier(ident)] if ident.starts_with("--") => Some(VarRef {
                name: ident.clone(),
                fallback,
            }),
            _ => None,
        }
    }

    pub fn to_css(&self) -> String {
        match &self.fallback {
            Some(fallback) => format!("var({}, {})", self.name, fallback),
            None => format!("var({})", self.name),
        }
    }
}
