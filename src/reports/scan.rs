//! Lists every Param expression carried by the Skill, Word, Potential and
//! Talent tables, optionally resolving each one.

use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::data::TableRegistry;
use crate::param::bind::{declared_level_count, param_fields};
use crate::param::{ParamExpr, ParamResolver, ResolvedParam};

/// Scanned containers, in output order.
pub const SCAN_CONTAINERS: &[&str] = &["Skill", "Word", "Potential", "Talent"];

const OWNER_NAME_FIELDS: &[&str] = &["Name", "Title"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParamRow {
    pub container: String,
    pub owner_id: String,
    pub owner_name: String,
    pub param_key: String,
    pub param_text: String,
    pub table: String,
    pub mode: String,
    pub identifier: String,
    pub extras: String,
}

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Keep only rows whose first token equals this.
    pub filter_table: Option<String>,
    /// Drop rows repeating an earlier ParamText.
    pub unique: bool,
}

pub fn scan_params(registry: &TableRegistry, options: &ScanOptions) -> Vec<ParamRow> {
    let mut rows = Vec::new();
    for container in SCAN_CONTAINERS {
        let Some(table) = registry.table(container) else {
            debug!(container, "container table not loaded; skipping");
            continue;
        };
        for (owner_id, record) in table.iter() {
            // First string among Name/Title, not first present.
            let owner_name = OWNER_NAME_FIELDS
                .iter()
                .find_map(|key| record.get(*key).and_then(Value::as_str))
                .unwrap_or_default();
            for (param_key, text) in param_fields(record) {
                let expr = ParamExpr::parse(text);
                let token = |index: usize| expr.tokens().get(index).cloned().unwrap_or_default();
                rows.push(ParamRow {
                    container: (*container).to_string(),
                    owner_id: owner_id.to_string(),
                    owner_name: owner_name.to_string(),
                    param_key,
                    param_text: text.to_string(),
                    table: token(0),
                    mode: token(1),
                    identifier: token(2),
                    extras: expr.extras(),
                });
            }
        }
    }

    if let Some(filter) = options.filter_table.as_deref() {
        rows.retain(|row| row.table == filter);
    }
    if options.unique {
        let mut seen = HashSet::new();
        rows.retain(|row| seen.insert(row.param_text.clone()));
    }
    info!(rows = rows.len(), "scanned param expressions");
    rows
}

/// Console listing of the first `limit` rows followed by `shown / total`.
pub fn render_rows(rows: &[ParamRow], limit: Option<usize>) -> String {
    let shown = limit.map_or(rows.len(), |limit| limit.min(rows.len()));
    let mut out = String::new();
    for row in &rows[..shown] {
        let name = if row.owner_name.is_empty() {
            "-"
        } else {
            row.owner_name.as_str()
        };
        let _ = writeln!(
            out,
            "[{}] {:<10} {:<20} {}: {}",
            row.container, row.owner_id, name, row.param_key, row.param_text
        );
    }
    let _ = writeln!(out, "\nshown: {shown} / total: {}", rows.len());
    out
}

/// Row counts per `(Container, Table)`, key-sorted.
pub fn summarize(rows: &[ParamRow]) -> BTreeMap<(String, String), usize> {
    let mut counts = BTreeMap::new();
    for row in rows {
        *counts
            .entry((row.container.clone(), row.table.clone()))
            .or_insert(0) += 1;
    }
    counts
}

pub fn render_summary(counts: &BTreeMap<(String, String), usize>) -> String {
    let mut out = String::from("\n=== Summary: Container x Table ===\n");
    for ((container, table), count) in counts {
        let table = if table.is_empty() { "-" } else { table.as_str() };
        let _ = writeln!(out, "{container:<10}  {table:<15}  {count:>5}");
    }
    out
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResolvedRow {
    pub container: String,
    pub owner_id: String,
    pub param_key: String,
    pub max_level: Option<u32>,
    pub param: ResolvedParam,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedScan {
    pub generated_at: String,
    pub count: usize,
    pub rows: Vec<ResolvedRow>,
}

/// Resolve every row, bounding levels by the owner's declared level count.
pub fn resolve_rows(registry: &TableRegistry, rows: &[ParamRow]) -> ResolvedScan {
    let resolver = ParamResolver::new(registry);
    let resolved: Vec<ResolvedRow> = rows
        .iter()
        .map(|row| {
            let max_level = registry
                .table(&row.container)
                .and_then(|table| table.get(&row.owner_id))
                .and_then(declared_level_count)
                .and_then(|count| u32::try_from(count).ok());
            ResolvedRow {
                container: row.container.clone(),
                owner_id: row.owner_id.clone(),
                param_key: row.param_key.clone(),
                max_level,
                param: resolver.resolve(&row.param_text, max_level),
            }
        })
        .collect();
    let empty = resolved.iter().filter(|row| row.param.is_empty()).count();
    info!(rows = resolved.len(), empty, "resolved scanned params");
    ResolvedScan {
        generated_at: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        count: resolved.len(),
        rows: resolved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Table;
    use serde_json::json;

    fn registry() -> TableRegistry {
        TableRegistry::new()
            .with_table(
                Table::from_value(
                    "Skill",
                    json!({
                        "100": {"Title": "Skill.100.1", "MaxLevel": 2, "Param1": "BuffValue,NoLevel,1,Time,10K", "Param2": "plain"},
                        "101": {"Name": 5, "Title": "Skill.101.1", "Param1": "HitDamage,DamageNum,9"}
                    }),
                )
                .unwrap(),
            )
            .with_table(
                Table::from_value(
                    "Talent",
                    json!({"7": {"Param3": "BuffValue,NoLevel,1,Time,10K", "Param1": " Effect , LevelUp ,5501, Value"}}),
                )
                .unwrap(),
            )
            .with_table(Table::from_value("BuffValue", json!({"1": {"Time": 20000}})).unwrap())
    }

    #[test]
    fn scans_containers_in_fixed_order() {
        let rows = scan_params(&registry(), &ScanOptions::default());
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].container, "Skill");
        assert_eq!(rows[0].owner_name, "Skill.100.1");
        assert_eq!(rows[0].extras, "Time,10K");
        assert_eq!(rows[1].owner_name, "Skill.101.1");
        assert_eq!(rows[2].container, "Talent");
        assert_eq!(rows[2].param_key, "Param1");
        assert_eq!(rows[2].table, "Effect");
        assert_eq!(rows[2].extras, "Value");
    }

    #[test]
    fn filters_and_dedups() {
        let options = ScanOptions {
            filter_table: Some("BuffValue".to_string()),
            unique: true,
        };
        let rows = scan_params(&registry(), &options);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].owner_id, "100");
    }

    #[test]
    fn summary_counts_per_container_and_table() {
        let rows = scan_params(&registry(), &ScanOptions::default());
        let counts = summarize(&rows);
        assert_eq!(counts[&("Skill".to_string(), "BuffValue".to_string())], 1);
        assert_eq!(counts[&("Talent".to_string(), "Effect".to_string())], 1);
        assert!(render_summary(&counts).contains("Talent"));
    }

    #[test]
    fn render_limits_rows() {
        let rows = scan_params(&registry(), &ScanOptions::default());
        let text = render_rows(&rows, Some(1));
        assert!(text.contains("shown: 1 / total: 4"));
        assert_eq!(text.matches("Param").count(), 1);
    }

    #[test]
    fn resolve_uses_owner_level_context() {
        let registry = registry();
        let rows = scan_params(&registry, &ScanOptions::default());
        let scan = resolve_rows(&registry, &rows);
        assert_eq!(scan.count, 4);
        assert_eq!(scan.rows[0].max_level, Some(2));
        assert!(!scan.rows[0].param.is_empty());
        assert!(scan.rows[1].param.is_empty());
    }
}
