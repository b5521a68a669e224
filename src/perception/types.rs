use std::fmt;
use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One input-like element found on a screen, in canonical form.
///
/// Every attribute is always serialized; missing source attributes become
/// empty strings / `false` (`enabled` defaults to `true`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementDescriptor {
    pub text: String,
    pub resource_id: String,
    #[serde(rename = "type")]
    pub element_type: String,
    /// `[x1,y1][x2,y2]` in the hierarchy's coordinate space, or empty.
    pub bounds: String,
    pub class: String,
    pub content_desc: String,
    pub enabled: bool,
    pub password: bool,
}

impl Default for ElementDescriptor {
    fn default() -> Self {
        Self {
            text: String::new(),
            resource_id: String::new(),
            element_type: String::new(),
            bounds: String::new(),
            class: String::new(),
            content_desc: String::new(),
            enabled: true,
            password: false,
        }
    }
}

/// Canonical element mapping: id → descriptor, in visit order.
pub type ElementMap = IndexMap<String, ElementDescriptor>;

/// Integer bounding box in some coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

fn bounds_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\[(-?\d+(?:\.\d+)?),(-?\d+(?:\.\d+)?)\]\[(-?\d+(?:\.\d+)?),(-?\d+(?:\.\d+)?)\]$")
            .expect("bounds pattern is valid")
    })
}

/// Largest coordinate magnitude kept; anything beyond is clamped.
pub const COORD_LIMIT: i64 = 1_000_000;

/// Round a raw coordinate into `[-COORD_LIMIT, COORD_LIMIT]`.
/// Non-finite values are `None`.
pub fn coordinate(raw: f64) -> Option<i64> {
    if !raw.is_finite() {
        return None;
    }
    let limit = COORD_LIMIT as f64;
    Some(raw.round().clamp(-limit, limit) as i64)
}

impl Bounds {
    pub fn new(x1: i64, y1: i64, x2: i64, y2: i64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Parse `[x1,y1][x2,y2]`. Whitespace is ignored and fractional
    /// coordinates are rounded.
    pub fn parse(raw: &str) -> Option<Self> {
        let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        let caps = bounds_regex().captures(&compact)?;
        let num = |i: usize| -> Option<i64> {
            caps.get(i)?.as_str().parse::<f64>().ok().and_then(coordinate)
        };
        Some(Self::new(num(1)?, num(2)?, num(3)?, num(4)?))
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}][{},{}]", self.x1, self.y1, self.x2, self.y2)
    }
}

/// Size of the coordinate space a hierarchy reports its bounds in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceFrame {
    pub width: u32,
    pub height: u32,
}

impl ReferenceFrame {
    /// A frame is only usable when both sides are positive.
    pub fn new(width: i64, height: i64) -> Option<Self> {
        if width <= 0 || height <= 0 {
            return None;
        }
        Some(Self {
            width: u32::try_from(width).ok()?,
            height: u32::try_from(height).ok()?,
        })
    }

    /// Frame implied by a reference element's bottom-right corner.
    pub fn from_bounds(bounds: &Bounds) -> Option<Self> {
        Self::new(bounds.x2, bounds.y2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementOrigin {
    /// Parsed from an Android or iOS hierarchy dump.
    Hierarchy,
    /// Supplied by the caller as a pre-extracted element list.
    ActionableElements,
}

/// Which nodes of a hierarchy are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionPolicy {
    AllClickable,
    #[default]
    InputFieldsOnly,
}

/// Result of one extraction call.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub elements: ElementMap,
    pub frame: Option<ReferenceFrame>,
    pub origin: ElementOrigin,
}

impl Extraction {
    pub fn empty(origin: ElementOrigin) -> Self {
        Self {
            elements: ElementMap::new(),
            frame: None,
            origin,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Last `.`-separated component of a class or tag name.
pub fn trailing_component(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}
