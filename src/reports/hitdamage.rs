//! Distribution of `(levelTypeData, LevelData)` pairs across HitDamage records.

use std::collections::HashMap;
use std::fmt::Write as _;

use serde_json::Value;

use crate::data::table::{coerce_int, display_value, get_first_present, id_key};
use crate::data::Table;

pub const HIT_DAMAGE_TABLE: &str = "HitDamage";

const LEVEL_TYPE_FIELDS: &[&str] = &["levelTypeData", "LevelTypeData", "LevelType"];
const LEVEL_DATA_FIELDS: &[&str] = &["LevelData", "LevelId", "LevelID"];
const SKILL_ID_FIELDS: &[&str] = &["SkillId", "skillId", "skillID"];

pub const CSV_HEADER: &[&str] = &[
    "levelTypeData",
    "LevelData",
    "count",
    "ratio_percent",
    "skillId_present",
    "skillId_absent",
    "sample_ids",
    "first_Id",
    "first_HitdamageInfo",
    "first_SkillSlotType",
];

pub type Combo = (Option<i64>, Option<i64>);

#[derive(Debug, Clone, PartialEq)]
pub struct FirstHit {
    pub id: Value,
    pub info: Value,
    pub slot_type: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComboStat {
    pub combo: Combo,
    pub count: usize,
    pub sample_ids: Vec<String>,
    pub skill_id_present: usize,
    pub skill_id_absent: usize,
    pub first_hit: FirstHit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComboReport {
    pub total: usize,
    pub missing_level_type: usize,
    pub missing_level_data: usize,
    pub top_samples: usize,
    /// Ascending by level type then level data, absent values last.
    pub combos: Vec<ComboStat>,
}

impl ComboReport {
    pub fn ratio_percent(&self, stat: &ComboStat) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            stat.count as f64 / self.total as f64 * 100.0
        }
    }
}

pub fn analyze_combos(hit_damage: &Table, top_samples: usize) -> ComboReport {
    let mut total = 0;
    let mut missing_level_type = 0;
    let mut missing_level_data = 0;
    let mut stats: HashMap<Combo, ComboStat> = HashMap::new();

    for (key, record) in hit_damage.iter() {
        total += 1;
        let level_type = get_first_present(record, LEVEL_TYPE_FIELDS).and_then(coerce_int);
        let level_data = get_first_present(record, LEVEL_DATA_FIELDS).and_then(coerce_int);
        let skill_id = get_first_present(record, SKILL_ID_FIELDS).and_then(coerce_int);
        if level_type.is_none() {
            missing_level_type += 1;
        }
        if level_data.is_none() {
            missing_level_data += 1;
        }

        let combo = (level_type, level_data);
        let stat = stats.entry(combo).or_insert_with(|| ComboStat {
            combo,
            count: 0,
            sample_ids: Vec::new(),
            skill_id_present: 0,
            skill_id_absent: 0,
            first_hit: FirstHit {
                id: record.get("Id").cloned().unwrap_or_else(|| Value::from(key)),
                info: record.get("HitdamageInfo").cloned().unwrap_or(Value::Null),
                slot_type: record.get("SkillSlotType").cloned().unwrap_or(Value::Null),
            },
        });
        stat.count += 1;
        if skill_id.is_some() {
            stat.skill_id_present += 1;
        } else {
            stat.skill_id_absent += 1;
        }
        if stat.sample_ids.len() < top_samples {
            let id = record.get("Id").and_then(id_key).unwrap_or_else(|| key.to_string());
            stat.sample_ids.push(id);
        }
    }

    let mut combos: Vec<ComboStat> = stats.into_values().collect();
    combos.sort_by_key(|stat| (absent_last(stat.combo.0), absent_last(stat.combo.1)));
    ComboReport {
        total,
        missing_level_type,
        missing_level_data,
        top_samples,
        combos,
    }
}

fn absent_last(value: Option<i64>) -> (bool, i64) {
    (value.is_none(), value.unwrap_or_default())
}

fn combo_part(value: Option<i64>) -> String {
    value.map_or_else(|| "None".to_string(), |v| v.to_string())
}

fn value_or_none(value: &Value) -> String {
    if value.is_null() {
        "None".to_string()
    } else {
        display_value(value)
    }
}

pub fn render_report(report: &ComboReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== HitDamage: levelTypeData x LevelData ===");
    let _ = writeln!(out, "total: {}", report.total);
    let _ = writeln!(out, "missing levelTypeData: {}", report.missing_level_type);
    let _ = writeln!(out, "missing LevelData    : {}", report.missing_level_data);
    let _ = writeln!(out);
    for stat in &report.combos {
        let ids = stat.sample_ids.join(", ");
        let _ = writeln!(
            out,
            "- levelTypeData={} / LevelData={} : {} ({:.2}%)",
            combo_part(stat.combo.0),
            combo_part(stat.combo.1),
            stat.count,
            report.ratio_percent(stat)
        );
        let _ = writeln!(
            out,
            "    SkillId present: {} / absent: {}",
            stat.skill_id_present, stat.skill_id_absent
        );
        let _ = writeln!(
            out,
            "    sample ids (max {}): {}",
            report.top_samples,
            if ids.is_empty() { "(none)" } else { ids.as_str() }
        );
        let _ = writeln!(
            out,
            "    first: Id={} / Info={} / SkillSlotType={}",
            value_or_none(&stat.first_hit.id),
            value_or_none(&stat.first_hit.info),
            value_or_none(&stat.first_hit.slot_type)
        );
        let _ = writeln!(out);
    }
    out
}

/// CSV records matching [CSV_HEADER]; absent combo parts are empty cells.
pub fn csv_records(report: &ComboReport) -> Vec<Vec<String>> {
    report
        .combos
        .iter()
        .map(|stat| {
            vec![
                stat.combo.0.map(|v| v.to_string()).unwrap_or_default(),
                stat.combo.1.map(|v| v.to_string()).unwrap_or_default(),
                stat.count.to_string(),
                format!("{:.2}", report.ratio_percent(stat)),
                stat.skill_id_present.to_string(),
                stat.skill_id_absent.to_string(),
                stat.sample_ids.join(" "),
                display_value(&stat.first_hit.id),
                display_value(&stat.first_hit.info),
                display_value(&stat.first_hit.slot_type),
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table() -> Table {
        Table::from_value(
            HIT_DAMAGE_TABLE,
            json!({
                "1": {"Id": 1, "levelTypeData": 2, "LevelData": 10, "SkillId": 100, "HitdamageInfo": "a"},
                "2": {"Id": 2, "LevelTypeData": "2", "LevelId": 10},
                "3": {"Id": 3, "LevelData": 5},
                "4": {"Id": 4, "levelTypeData": 1, "LevelData": "x", "skillID": 7},
                "5": {"Id": 5, "levelTypeData": 2, "LevelData": 10}
            }),
        )
        .unwrap()
    }

    #[test]
    fn groups_pairs_with_aliases_and_counts_gaps() {
        let report = analyze_combos(&table(), 1);
        assert_eq!(report.total, 5);
        assert_eq!(report.missing_level_type, 1);
        assert_eq!(report.missing_level_data, 1);
        let combos: Vec<Combo> = report.combos.iter().map(|s| s.combo).collect();
        assert_eq!(combos, vec![(Some(1), None), (Some(2), Some(10)), (None, Some(5))]);

        let main = &report.combos[1];
        assert_eq!(main.count, 3);
        assert_eq!(main.skill_id_present, 1);
        assert_eq!(main.skill_id_absent, 2);
        assert_eq!(main.sample_ids, vec!["1".to_string()]);
        assert_eq!(main.first_hit.info, json!("a"));
        assert_eq!(format!("{:.2}", report.ratio_percent(main)), "60.00");
    }

    #[test]
    fn csv_rows_follow_header() {
        let report = analyze_combos(&table(), 5);
        let records = csv_records(&report);
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.len() == CSV_HEADER.len()));
        assert_eq!(records[1][6], "1 2 5");
        assert_eq!(records[0][1], "");
    }

    #[test]
    fn render_mentions_every_combo() {
        let text = render_report(&analyze_combos(&table(), 5));
        assert!(text.contains("levelTypeData=None / LevelData=5"));
        assert!(text.contains("(20.00%)"));
    }

    #[test]
    fn null_level_fields_fall_through_to_aliases() {
        let table = Table::from_value(
            HIT_DAMAGE_TABLE,
            json!({"1": {"Id": 1, "levelTypeData": null, "LevelTypeData": 4, "LevelData": null, "LevelId": 2}}),
        )
        .unwrap();
        let report = analyze_combos(&table, 5);
        assert_eq!(report.missing_level_type, 0);
        assert_eq!(report.missing_level_data, 0);
        assert_eq!(report.combos[0].combo, (Some(4), Some(2)));
    }
}
