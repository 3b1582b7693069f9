use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Overlap of two rects. Edge contact yields a zero-area rect rather than
    /// `None`.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if left > right || top > bottom {
            return None;
        }
        Some(Rect::new(left, top, right - left, bottom - top))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "unit", content = "value")]
pub enum MarginValue {
    Px(f64),
    Percent(f64),
}

impl Default for MarginValue {
    fn default() -> Self {
        Self::Px(0.0)
    }
}

impl MarginValue {
    fn resolve(&self, reference: f64) -> f64 {
        match self {
            Self::Px(value) => *value,
            Self::Percent(value) => reference * value / 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarginParseError {
    #[error("root margin must have 1 to 4 values, got {0}")]
    Arity(usize),
    #[error("invalid root margin value {0:?}: expected pixels or a percentage")]
    Value(String),
}

impl FromStr for MarginValue {
    type Err = MarginParseError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let invalid = || MarginParseError::Value(token.to_string());
        let finite = |number: &str| {
            number
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(invalid)
        };
        if let Some(number) = token.strip_suffix("px") {
            return finite(number).map(Self::Px);
        }
        if let Some(number) = token.strip_suffix('%') {
            return finite(number).map(Self::Percent);
        }
        // A bare zero is the only unitless length.
        match token.parse::<f64>() {
            Ok(value) if value == 0.0 => Ok(Self::Px(0.0)),
            _ => Err(invalid()),
        }
    }
}

/// Grows (positive) or shrinks (negative) the root box before intersecting,
/// written like a CSS margin: `"10px"`, `"10px 20%"`, `"1px 2px 3px 4px"`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RootMargin {
    pub top: MarginValue,
    pub right: MarginValue,
    pub bottom: MarginValue,
    pub left: MarginValue,
}

impl RootMargin {
    pub fn uniform_px(value: f64) -> Self {
        let side = MarginValue::Px(value);
        Self {
            top: side,
            right: side,
            bottom: side,
            left: side,
        }
    }

    /// Vertical sides resolve percentages against the root height,
    /// horizontal sides against its width.
    pub fn apply(&self, root: &Rect) -> Rect {
        let top = self.top.resolve(root.height);
        let right = self.right.resolve(root.width);
        let bottom = self.bottom.resolve(root.height);
        let left = self.left.resolve(root.width);
        Rect::new(
            root.x - left,
            root.y - top,
            root.width + left + right,
            root.height + top + bottom,
        )
    }
}

impl FromStr for RootMargin {
    type Err = MarginParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parts = value
            .split_whitespace()
            .map(str::parse::<MarginValue>)
            .collect::<Result<Vec<_>, _>>()?;

        let (top, right, bottom, left) = match parts.as_slice() {
            [all] => (*all, *all, *all, *all),
            [vertical, horizontal] => (*vertical, *horizontal, *vertical, *horizontal),
            [top, horizontal, bottom] => (*top, *horizontal, *bottom, *horizontal),
            [top, right, bottom, left] => (*top, *right, *bottom, *left),
            other => return Err(MarginParseError::Arity(other.len())),
        };
        Ok(Self {
            top,
            right,
            bottom,
            left,
        })
    }
}
