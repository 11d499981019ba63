use crate::error::CssValueError;
use crate::value::{Node, generate, parse_value, split_commas};
use std::fmt;
use std::str::FromStr;

/// The two arguments of `minmax(min, max)`, each kept as canonical text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Minmax {
    pub min: String,
    pub max: String,
}

impl Minmax {
    pub fn new(min: impl Into<String>, max: impl Into<String>) -> Self {
        Self {
            min: min.into(),
            max: max.into(),
        }
    }

    pub fn from_nodes(nodes: &[Node]) -> Option<Minmax> {
        let [node] = nodes else {
            return None;
        };
        let (name, children) = node.function_children()?;
        if !name.eq_ignore_ascii_case("minmax") {
            return None;
        }
        match split_commas(children).as_slice() {
            [min, max] if !min.is_empty() && !max.is_empty() => {
                Some(Minmax::new(generate(min), generate(max)))
            }
            _ => None,
        }
    }
}

pub fn parse_minmax(text: &str) -> Option<Minmax> {
    let nodes = parse_value(text).ok()?;
    Minmax::from_nodes(&nodes)
}

pub fn serialize_minmax(minmax: &Minmax) -> String {
    format!("minmax({},{})", minmax.min, minmax.max)
}

impl fmt::Display for Minmax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&serialize_minmax(self))
    }
}

impl FromStr for Minmax {
    type Err = CssValueError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        parse_minmax(text).ok_or_else(|| CssValueError::mismatch("minmax(<min>,<max>)", text))
    }
}
