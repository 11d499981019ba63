//! `linear-gradient()` and `repeating-linear-gradient()` codec.
//!
//! The whole value is matched against
//! `linear-gradient( [ <angle> | to <side-or-corner> ]? , <color-stop-list> )`
//! before anything is returned, so callers never see a partially parsed
//! gradient. Each comma-separated group is then one of a direction (first
//! group only), a color transition hint, or a color stop. Colors,
//! positions and hints may be `var()` references; their fallbacks are
//! carried as raw text.
//!
//! Formatting normalizes every resolved color to `rgb(r g b / a)`, so hex
//! and named colors do not survive a round trip verbatim.

use crate::color::{Rgb, parse_color};
use crate::value::{Node, VarRef, format_number, parse_value, split_commas};
use std::fmt;

const ANGLE_UNITS: [&str; 4] = ["deg", "grad", "rad", "turn"];

const LENGTH_UNITS: [&str; 23] = [
    "px", "em", "rem", "ex", "rex", "ch", "rch", "cap", "ic", "lh", "rlh", "vw", "vh", "vi", "vb",
    "vmin", "vmax", "cm", "mm", "q", "in", "pt", "pc",
];

#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub value: f64,
    pub unit: String,
}

impl Unit {
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }

    pub fn to_css(&self) -> String {
        format!("{}{}", format_number(self.value), self.unit)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColorOrVar {
    Rgb(Rgb),
    Var(VarRef),
}

impl ColorOrVar {
    pub fn to_css(&self) -> String {
        match self {
            ColorOrVar::Rgb(rgb) => rgb.to_css(),
            ColorOrVar::Var(var) => var.to_css(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LengthOrVar {
    Unit(Unit),
    Var(VarRef),
}

impl LengthOrVar {
    pub fn to_css(&self) -> String {
        match self {
            LengthOrVar::Unit(unit) => unit.to_css(),
            LengthOrVar::Var(var) => var.to_css(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradientStop {
    pub color: Option<ColorOrVar>,
    pub position: Option<LengthOrVar>,
    pub hint: Option<LengthOrVar>,
}

impl GradientStop {
    pub fn hint_only(hint: LengthOrVar) -> Self {
        Self {
            hint: Some(hint),
            ..Self::default()
        }
    }

    pub fn is_hint_only(&self) -> bool {
        self.color.is_none() && self.position.is_none() && self.hint.is_some()
    }

    pub fn to_css(&self) -> String {
        let mut parts = Vec::with_capacity(3);
        if let Some(color) = &self.color {
            parts.push(color.to_css());
        }
        if let Some(position) = &self.position {
            parts.push(position.to_css());
        }
        if let Some(hint) = &self.hint {
            parts.push(hint.to_css());
        }
        parts.join(" ")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GradientDirection {
    Angle(Unit),
    /// Keywords after `to`, e.g. `right` or `top left`.
    SideOrCorner(String),
}

impl GradientDirection {
    pub fn to_css(&self) -> String {
        match self {
            GradientDirection::Angle(angle) => angle.to_css(),
            GradientDirection::SideOrCorner(keywords) => format!("to {keywords}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedGradient {
    /// `None` means the default top-to-bottom direction.
    pub direction: Option<GradientDirection>,
    pub stops: Vec<GradientStop>,
    pub repeating: bool,
}

impl ParsedGradient {
    pub fn angle(&self) -> Option<&Unit> {
        match &self.direction {
            Some(GradientDirection::Angle(angle)) => Some(angle),
            _ => None,
        }
    }

    pub fn side_or_corner(&self) -> Option<&str> {
        match &self.direction {
            Some(GradientDirection::SideOrCorner(keywords)) => Some(keywords),
            _ => None,
        }
    }
}

impl fmt::Display for ParsedGradient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_linear_gradient(self))
    }
}

enum Component {
    Stop(GradientStop),
    Hint(LengthOrVar),
}

pub fn parse_linear_gradient(text: &str) -> Option<ParsedGradient> {
    let nodes = parse_value(text).ok()?;
    let [node] = nodes.as_slice() else {
        return None;
    };
    let (name, children) = node.function_children()?;
    let repeating = if name.eq_ignore_ascii_case("linear-gradient") {
        false
    } else if name.eq_ignore_ascii_case("repeating-linear-gradient") {
        true
    } else {
        return None;
    };

    let groups = split_commas(children);
    let mut direction = None;
    let mut components = Vec::with_capacity(groups.len());
    for (idx, group) in groups.iter().enumerate() {
        let items = group_items(group)?;
        if idx == 0 {
            if let Some(parsed) = parse_direction(&items) {
                direction = Some(parsed);
                continue;
            }
        }
        components.push(parse_component(&items)?);
    }
    if !matches_stop_list(&components) {
        return None;
    }

    let stops = components
        .into_iter()
        .map(|component| match component {
            Component::Stop(stop) => stop,
            Component::Hint(hint) => GradientStop::hint_only(hint),
        })
        .collect();
    Some(ParsedGradient {
        direction,
        stops,
        repeating,
    })
}

// Whitespace-separated components of one comma group.
fn group_items(group: &[Node]) -> Option<Vec<&Node>> {
    let mut items = Vec::new();
    for chunk in group.split(|node| matches!(node, Node::WhiteSpace)) {
        match chunk {
            [node] => items.push(node),
            _ => return None,
        }
    }
    if items.is_empty() { None } else { Some(items) }
}

fn parse_direction(items: &[&Node]) -> Option<GradientDirection> {
    match items {
        [Node::Dimension { value, unit }] if ANGLE_UNITS.contains(&unit.as_str()) => {
            Some(GradientDirection::Angle(Unit::new(*value, unit.clone())))
        }
        [Node::Number { value, .. }] if *value == 0.0 => {
            Some(GradientDirection::Angle(Unit::new(0.0, "deg")))
        }
        [to, keywords @ ..] if to.ident_eq("to") => {
            parse_side_or_corner(keywords).map(GradientDirection::SideOrCorner)
        }
        _ => None,
    }
}

fn parse_side_or_corner(items: &[&Node]) -> Option<String> {
    let mut horizontal = None;
    let mut vertical = None;
    let mut ordered = Vec::with_capacity(2);
    for item in items {
        let Node::Identifier(ident) = item else {
            return None;
        };
        let keyword = ident.to_ascii_lowercase();
        let slot = match keyword.as_str() {
            "left" | "right" => &mut horizontal,
            "top" | "bottom" => &mut vertical,
            _ => return None,
        };
        if slot.is_some() {
            return None;
        }
        *slot = Some(());
        ordered.push(keyword);
    }
    if ordered.is_empty() {
        return None;
    }
    Some(ordered.join(" "))
}

fn parse_component(items: &[&Node]) -> Option<Component> {
    if let [single] = items {
        if VarRef::from_node(single).is_none() {
            if let Some(hint) = parse_length_percentage(single) {
                return Some(Component::Hint(hint));
            }
        }
    }
    let (color, rest) = items.split_first()?;
    let mut stop = GradientStop {
        color: Some(parse_color_slot(color)?),
        ..GradientStop::default()
    };
    match rest {
        [] => {}
        [position] => {
            stop.position = Some(parse_length_slot(position)?);
        }
        [position, hint] => {
            stop.position = Some(parse_length_slot(position)?);
            stop.hint = Some(parse_length_slot(hint)?);
        }
        _ => return None,
    }
    Some(Component::Stop(stop))
}

fn parse_color_slot(node: &Node) -> Option<ColorOrVar> {
    if let Some(var) = VarRef::from_node(node) {
        return Some(ColorOrVar::Var(var));
    }
    match node {
        Node::Identifier(_) | Node::Hash(_) | Node::Function { .. } => {
            parse_color(&node.to_css()).map(ColorOrVar::Rgb)
        }
        _ => None,
    }
}

fn parse_length_slot(node: &Node) -> Option<LengthOrVar> {
    match VarRef::from_node(node) {
        Some(var) => Some(LengthOrVar::Var(var)),
        None => parse_length_percentage(node),
    }
}

fn parse_length_percentage(node: &Node) -> Option<LengthOrVar> {
    let unit = match node {
        Node::Percentage(value) => Unit::new(*value, "%"),
        Node::Dimension { value, unit } if LENGTH_UNITS.contains(&unit.as_str()) => {
            Unit::new(*value, unit.clone())
        }
        Node::Number { value, .. } if *value == 0.0 => Unit::new(0.0, ""),
        _ => return None,
    };
    Some(LengthOrVar::Unit(unit))
}

// <color-stop> [ , <hint>? , <color-stop> ]+ with at least two stops.
fn matches_stop_list(components: &[Component]) -> bool {
    let (Some(Component::Stop(_)), Some(Component::Stop(_))) =
        (components.first(), components.last())
    else {
        return false;
    };
    let stop_count = components
        .iter()
        .filter(|component| matches!(component, Component::Stop(_)))
        .count();
    let consecutive_hints = components
        .windows(2)
        .any(|pair| matches!(pair, [Component::Hint(_), Component::Hint(_)]));
    stop_count >= 2 && !consecutive_hints
}

pub fn format_linear_gradient(gradient: &ParsedGradient) -> String {
    let mut parts = Vec::with_capacity(gradient.stops.len() + 1);
    if let Some(direction) = &gradient.direction {
        parts.push(direction.to_css());
    }
    for stop in &gradient.stops {
        let text = stop.to_css();
        if !text.is_empty() {
            parts.push(text);
        }
    }
    let prefix = if gradient.repeating { "repeating-" } else { "" };
    format!("{prefix}linear-gradient({})", parts.join(", "))
}
