//! Enumerates level-indexed families of records.
//!
//! Keys are assumed to follow `prefix + level + suffix`, where the base id's
//! prefix is everything but its last two characters and the suffix is its last
//! character (`144101` -> `1441` + level + `1`). This convention is inferred
//! from observed ids, not a documented schema.

use crate::data::table::{Record, Table};

/// Collect `(level, record)` for level 1, 2, 3, ... until a key is missing or
/// `max_level` is exceeded. Base ids shorter than 3 characters yield nothing.
pub fn build_level_series<'a>(
    base_id: &str,
    table: &'a Table,
    max_level: Option<u32>,
) -> Vec<(u32, &'a Record)> {
    let chars: Vec<char> = base_id.trim().chars().collect();
    if chars.len() < 3 {
        return Vec::new();
    }
    let prefix: String = chars[..chars.len() - 2].iter().collect();
    let suffix = chars[chars.len() - 1];

    let mut series = Vec::new();
    let mut level = 1u32;
    while max_level.map_or(true, |max| level <= max) {
        let key = format!("{prefix}{level}{suffix}");
        let Some(record) = table.get(&key) else {
            break;
        };
        series.push((level, record));
        level += 1;
    }
    series
}
