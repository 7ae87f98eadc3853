//! Named numeric scaling rules applied to raw stored values before display.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::data::table::coerce_f64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transform {
    /// `10K`: stored in ten-thousandths.
    TenK,
    /// `HdPct`: fraction shown as percent.
    HdPct,
    /// `10KHdPct`: ten-thousandths shown as percent.
    TenKHdPct,
    /// `Fixed`: shown as stored.
    Fixed,
}

impl Transform {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim() {
            "10K" => Some(Transform::TenK),
            "HdPct" => Some(Transform::HdPct),
            "10KHdPct" => Some(Transform::TenKHdPct),
            "Fixed" => Some(Transform::Fixed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Transform::TenK => "10K",
            Transform::HdPct => "HdPct",
            Transform::TenKHdPct => "10KHdPct",
            Transform::Fixed => "Fixed",
        }
    }

    pub fn apply(self, value: f64) -> f64 {
        match self {
            Transform::TenK => value / 10000.0,
            Transform::HdPct => value * 100.0,
            Transform::TenKHdPct => value / 100.0,
            Transform::Fixed => value,
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Transform {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Raw value alongside its converted form. `converted` is `None` when the raw
/// value is not numeric; callers show the raw value instead of a synthetic zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Converted {
    #[serde(rename = "Raw")]
    pub raw: Value,
    #[serde(rename = "Converted")]
    pub converted: Option<f64>,
}

/// Apply `transform` (identity when `None`) to `raw`.
pub fn apply_numeric_transform(raw: &Value, transform: Option<Transform>) -> Converted {
    let converted = coerce_f64(raw).map(|value| transform.unwrap_or(Transform::Fixed).apply(value));
    Converted {
        raw: raw.clone(),
        converted,
    }
}
