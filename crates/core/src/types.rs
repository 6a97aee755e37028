use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ExperimentError, ExperimentResult};

/// Experiment key for the purchase button background color test.
pub const PURCHASE_BUTTON_BACKGROUND_COLOR: &str = "PurchaseButtonBackgroundColor";

/// Experiment key for the boolean demo test.
pub const ANOTHER_TEST: &str = "AnotherTest";

/// 32-bit ARGB color.
///
/// The canonical string form is `#AARRGGBB` in uppercase hex. Parsing accepts
/// an optional leading `#` followed by exactly eight hex digits; anything else
/// is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub a: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const GREEN: Color = Color::from_argb(0xFF, 0x00, 0x80, 0x00);
    pub const RED: Color = Color::from_argb(0xFF, 0xFF, 0x00, 0x00);
    pub const BLUE: Color = Color::from_argb(0xFF, 0x00, 0x00, 0xFF);
    pub const GRAY: Color = Color::from_argb(0xFF, 0x80, 0x80, 0x80);

    pub const fn from_argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self { a, r, g, b }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}{:02X}", self.a, self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = ExperimentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 8 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ExperimentError::Parse(format!(
                "expected 8 hex digits (AARRGGBB), got '{s}'"
            )));
        }
        let byte = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| ExperimentError::Parse(format!("bad color byte in '{s}': {e}")))
        };
        Ok(Color::from_argb(byte(0)?, byte(2)?, byte(4)?, byte(6)?))
    }
}

impl TryFrom<String> for Color {
    type Error = ExperimentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// The kind a stored variant string is decoded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
    Bool,
    Color,
    Text,
}

/// A typed experiment value, as handed to and returned from the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum VariantValue {
    Bool(bool),
    Color(Color),
    Text(String),
}

impl VariantValue {
    pub fn kind(&self) -> VariantKind {
        match self {
            VariantValue::Bool(_) => VariantKind::Bool,
            VariantValue::Color(_) => VariantKind::Color,
            VariantValue::Text(_) => VariantKind::Text,
        }
    }

    /// Render the value the way the catalog stores it.
    ///
    /// Empty text has no canonical form: the empty string is the "no variant"
    /// sentinel returned for unknown keys.
    pub fn to_canonical(&self) -> ExperimentResult<String> {
        match self {
            VariantValue::Bool(b) => Ok(b.to_string()),
            VariantValue::Color(c) => Ok(c.to_string()),
            VariantValue::Text(t) if t.is_empty() => Err(ExperimentError::Stringification(
                "empty text variant".to_string(),
            )),
            VariantValue::Text(t) => Ok(t.clone()),
        }
    }

    /// Decode a stored variant string as the requested kind.
    pub fn parse_as(kind: VariantKind, raw: &str) -> ExperimentResult<Self> {
        match kind {
            VariantKind::Bool => parse_bool(raw).map(VariantValue::Bool),
            VariantKind::Color => raw.parse().map(VariantValue::Color),
            VariantKind::Text => Ok(VariantValue::Text(raw.to_string())),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            VariantValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            VariantValue::Color(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            VariantValue::Text(t) => Some(t),
            _ => None,
        }
    }
}

fn parse_bool(raw: &str) -> ExperimentResult<bool> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(ExperimentError::Parse(format!("'{raw}' is not a boolean")))
    }
}

/// Canonical form of a variant value written as a plain string, e.g. in a
/// config file. Booleans in any case become `true`/`false` and `#`-prefixed
/// ARGB hex becomes uppercase `#AARRGGBB`; anything else is kept as text.
/// The empty string has no canonical form.
pub fn canonical_variant(raw: &str) -> ExperimentResult<String> {
    if raw.is_empty() {
        return Err(ExperimentError::Stringification(
            "empty variant value".to_string(),
        ));
    }
    if let Ok(flag) = parse_bool(raw) {
        return Ok(flag.to_string());
    }
    if raw.starts_with('#') {
        if let Ok(color) = raw.parse::<Color>() {
            return Ok(color.to_string());
        }
    }
    Ok(raw.to_string())
}

impl From<bool> for VariantValue {
    fn from(value: bool) -> Self {
        VariantValue::Bool(value)
    }
}

impl From<Color> for VariantValue {
    fn from(value: Color) -> Self {
        VariantValue::Color(value)
    }
}

impl From<&str> for VariantValue {
    fn from(value: &str) -> Self {
        VariantValue::Text(value.to_string())
    }
}

impl From<String> for VariantValue {
    fn from(value: String) -> Self {
        VariantValue::Text(value)
    }
}

/// Definition of one experiment: a key and its candidate values. Values
/// loaded from config may be in any accepted spelling; the catalog stores
/// them through [`canonical_variant`]. The order of `variants` is the selection tie-break order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentDefinition {
    pub key: String,
    #[serde(default)]
    pub variants: Vec<String>,
}

impl ExperimentDefinition {
    pub fn new(key: impl Into<String>, variants: Vec<String>) -> Self {
        Self {
            key: key.into(),
            variants,
        }
    }

    /// Build a definition from typed values, canonicalizing each one.
    pub fn from_values(key: impl Into<String>, values: &[VariantValue]) -> ExperimentResult<Self> {
        let variants = values
            .iter()
            .map(VariantValue::to_canonical)
            .collect::<ExperimentResult<Vec<_>>>()?;
        Ok(Self::new(key, variants))
    }

    pub fn colors(key: impl Into<String>, colors: &[Color]) -> Self {
        Self::new(key, colors.iter().map(Color::to_string).collect())
    }

    /// Boolean experiment with variants `true` then `false`.
    pub fn flag(key: impl Into<String>) -> Self {
        Self::new(key, vec![true.to_string(), false.to_string()])
    }

    pub fn texts(key: impl Into<String>, texts: &[&str]) -> Self {
        Self::new(key, texts.iter().map(|t| t.to_string()).collect())
    }
}

/// The built-in demo catalog: a three-way button color test and a flag.
pub fn demo_definitions() -> Vec<ExperimentDefinition> {
    vec![
        ExperimentDefinition::colors(
            PURCHASE_BUTTON_BACKGROUND_COLOR,
            &[Color::GREEN, Color::RED, Color::BLUE],
        ),
        ExperimentDefinition::flag(ANOTHER_TEST),
    ]
}
