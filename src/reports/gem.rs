//! Character gem attribute reports: flat value tables, the per-type
//! availability table, and per-group attribute listings with display names.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Number, Value};
use tracing::{info, warn};

use crate::data::table::{coerce_f64, coerce_int, display_value, Table, TextTable};
use crate::reports::output::{write_csv_records, write_json};
use crate::reports::ReportError;

pub const ATTR_TYPE_TABLE: &str = "CharGemAttrType";
pub const ATTR_GROUP_TABLE: &str = "CharGemAttrGroup";
pub const ATTR_VALUE_TABLE: &str = "CharGemAttrValue";
pub const SLOT_CONTROL_TABLE: &str = "CharGemSlotControl";
pub const EFFECT_DESC_TEXT: &str = "EffectDesc";

pub const TYPES_CSV: &str = "gem_param_types_list.csv";
pub const VALUES_CSV: &str = "gem_param_values_rarity.csv";
pub const SPLIT_DIR: &str = "gem_param_values_rarity_by_param";
pub const PARAMETER_TABLE_CSV: &str = "gem_parameter_table.csv";
pub const GROUPS_DIR: &str = "char_gem_attr_groups";

const TYPES_HEADER: &[&str] = &["AttrTypeId", "GroupId", "AttrTypeName_raw"];
const VALUES_HEADER: &[&str] = &[
    "AttrTypeId",
    "AttrTypeName_raw",
    "Value",
    "Rarity",
    "Subtype1",
    "Subtype2",
];
const PARAMETER_TABLE_HEADER: &[&str] = &[
    "Parameter", "Pos1", "Pos2", "Pos3", "Rarity4", "Rarity3", "Rarity2", "Rarity1",
];
const POSITION_MARK: &str = "○";

/// Combined group files and the groups each one holds.
pub const GROUP_SETS: &[(&str, &[i64])] = &[
    ("group_1_2_3_4.json", &[1, 2, 3, 4]),
    ("group_5_6_7_8.json", &[5, 6, 7, 8]),
    ("group_9_10.json", &[9, 10]),
];

/// Trait tag suffix (last two digits of the tag number) -> display name.
const TRAIT_NAMES: &[(&str, &str)] = &[
    ("05", "主力金素質1"),
    ("06", "主力金素質2"),
    ("07", "主力虹素質1"),
    ("08", "主力金素質3"),
    ("09", "主力金素質4"),
    ("10", "主力虹素質2"),
    ("11", "主力金素質5"),
    ("12", "主力金素質6"),
    ("13", "主力虹素質3"),
    ("25", "支援金素質1"),
    ("26", "支援金素質2"),
    ("27", "支援虹素質1"),
    ("28", "支援金素質3"),
    ("29", "支援金素質4"),
    ("30", "支援虹素質2"),
    ("31", "支援金素質5"),
    ("32", "支援金素質6"),
    ("33", "支援虹素質3"),
    ("41", "汎用金素質1"),
    ("42", "汎用金素質2"),
    ("43", "汎用金素質3"),
];

static TRAIT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"##素質#([0-9]{4})#レベル").expect("trait pattern is a valid regex"));

/// Numeric-looking strings become numbers (integers first, then floats);
/// everything else is returned unchanged.
pub fn parse_numeric(value: &Value) -> Value {
    let Value::String(text) = value else {
        return value.clone();
    };
    let trimmed = text.trim();
    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(int) = trimmed.parse::<i64>() {
            return Value::from(int);
        }
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map_or_else(|| value.clone(), Value::Number)
}

// ---------------------------------------------------------------------------
// gem-values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct AttrTypeRow {
    pub attr_type_id: i64,
    pub group_id: Value,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttrValueRow {
    pub attr_type_id: i64,
    pub name: String,
    pub value: Value,
    pub rarity: Value,
    pub subtype1: Value,
    pub subtype2: Value,
}

impl AttrValueRow {
    fn record(&self) -> Vec<String> {
        vec![
            self.attr_type_id.to_string(),
            self.name.clone(),
            display_value(&self.value),
            display_value(&self.rarity),
            display_value(&self.subtype1),
            display_value(&self.subtype2),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GemValueTables {
    pub types: Vec<AttrTypeRow>,
    pub values: Vec<AttrValueRow>,
}

pub fn build_value_tables(attr_types: &Table, attr_values: &Table) -> GemValueTables {
    let mut types: Vec<AttrTypeRow> = attr_types
        .iter()
        .filter_map(|(key, record)| {
            let Some(id) = record.get("Id").and_then(coerce_int) else {
                warn!(table = ATTR_TYPE_TABLE, key, "attr type without integer Id");
                return None;
            };
            Some(AttrTypeRow {
                attr_type_id: id,
                group_id: record.get("GroupId").cloned().unwrap_or(Value::Null),
                name: record.get("AttrType").map(display_value).unwrap_or_default(),
            })
        })
        .collect();
    types.sort_by_key(|row| row.attr_type_id);

    let names: HashMap<i64, &str> = types
        .iter()
        .map(|row| (row.attr_type_id, row.name.as_str()))
        .collect();

    let mut values: Vec<AttrValueRow> = attr_values
        .iter()
        .filter_map(|(key, record)| {
            let Some(id) = record.get("AttrType").and_then(coerce_int) else {
                warn!(table = ATTR_VALUE_TABLE, key, "attr value without integer AttrType");
                return None;
            };
            let field = |name: &str| record.get(name).cloned().unwrap_or(Value::Null);
            Some(AttrValueRow {
                attr_type_id: id,
                name: names
                    .get(&id)
                    .map_or_else(|| format!("(Unknown:{id})"), |name| name.to_string()),
                value: parse_numeric(&field("Value")),
                rarity: field("Rarity"),
                subtype1: field("AttrTypeFirstSubtype"),
                subtype2: field("AttrTypeSecondSubtype"),
            })
        })
        .collect();
    values.sort_by_cached_key(|row| {
        (
            row.attr_type_id,
            coerce_int(&row.rarity).unwrap_or(0),
            !row.value.is_number(),
            display_value(&row.value),
        )
    });

    GemValueTables { types, values }
}

/// Write both tables under `out_dir`, plus one file per attr type when `split`.
pub fn write_value_tables(
    tables: &GemValueTables,
    out_dir: &Path,
    split: bool,
) -> Result<(), ReportError> {
    let type_records: Vec<Vec<String>> = tables
        .types
        .iter()
        .map(|row| {
            vec![
                row.attr_type_id.to_string(),
                display_value(&row.group_id),
                row.name.clone(),
            ]
        })
        .collect();
    write_csv_records(&out_dir.join(TYPES_CSV), TYPES_HEADER, &type_records)?;

    let value_records: Vec<Vec<String>> = tables.values.iter().map(AttrValueRow::record).collect();
    write_csv_records(&out_dir.join(VALUES_CSV), VALUES_HEADER, &value_records)?;

    if split {
        for chunk in tables
            .values
            .chunk_by(|a, b| a.attr_type_id == b.attr_type_id)
        {
            let id = chunk[0].attr_type_id;
            let records: Vec<Vec<String>> = chunk.iter().map(AttrValueRow::record).collect();
            let path = out_dir.join(SPLIT_DIR).join(format!("attr_{id:03}.csv"));
            write_csv_records(&path, VALUES_HEADER, &records)?;
        }
    }
    info!(
        types = tables.types.len(),
        values = tables.values.len(),
        "wrote gem value tables"
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// gem-table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterRow {
    pub parameter: String,
    pub positions: [bool; 3],
    /// Values for rarity 4, 3, 2, 1, comma-joined in file order.
    pub rarity_values: [String; 4],
}

impl ParameterRow {
    pub fn record(&self) -> Vec<String> {
        let mut record = vec![self.parameter.clone()];
        record.extend(
            self.positions
                .iter()
                .map(|&available| if available { POSITION_MARK } else { "" }.to_string()),
        );
        record.extend(self.rarity_values.iter().cloned());
        record
    }
}

fn int_list(value: Option<&Value>) -> Vec<i64> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(coerce_int).collect())
        .unwrap_or_default()
}

pub fn build_parameter_table(
    attr_types: &Table,
    attr_groups: &Table,
    attr_values: &Table,
    slot_control: &Table,
) -> Vec<ParameterRow> {
    let mut position_groups: HashMap<i64, Vec<i64>> = HashMap::new();
    for slot in slot_control.records() {
        let position = slot.get("Position").and_then(coerce_int).unwrap_or(1);
        position_groups
            .entry(position)
            .or_default()
            .extend(int_list(slot.get("AttrGroupId")));
    }

    let mut group_types: HashMap<i64, Vec<i64>> = HashMap::new();
    for group in attr_groups.records() {
        if let Some(group_id) = group.get("GroupId").and_then(coerce_int) {
            group_types.insert(group_id, int_list(group.get("AttrType")));
        }
    }

    let mut positions: HashMap<i64, [bool; 3]> = HashMap::new();
    for (slot, position) in (1..=3).enumerate() {
        for group in position_groups.get(&position).into_iter().flatten() {
            for attr_type in group_types.get(group).into_iter().flatten() {
                positions.entry(*attr_type).or_default()[slot] = true;
            }
        }
    }

    let mut values: HashMap<(i64, i64), Vec<String>> = HashMap::new();
    for record in attr_values.records() {
        let attr_type = record.get("AttrType").and_then(coerce_int);
        let rarity = record.get("Rarity").and_then(coerce_int);
        let (Some(attr_type), Some(rarity)) = (attr_type, rarity) else {
            continue;
        };
        let value = record.get("Value").map(parse_numeric).unwrap_or(Value::Null);
        values
            .entry((attr_type, rarity))
            .or_default()
            .push(display_value(&value));
    }

    let mut ids: Vec<(i64, &str)> = attr_types
        .iter()
        .filter_map(|(key, _)| key.trim().parse::<i64>().ok().map(|id| (id, key)))
        .collect();
    ids.sort_by_key(|(id, _)| *id);

    ids.into_iter()
        .filter_map(|(id, key)| {
            let record = attr_types.get(key)?;
            let joined = |rarity: i64| {
                values
                    .get(&(id, rarity))
                    .map(|list| list.join(","))
                    .unwrap_or_default()
            };
            Some(ParameterRow {
                parameter: record.get("AttrType").map(display_value).unwrap_or_default(),
                positions: positions.get(&id).copied().unwrap_or_default(),
                rarity_values: [joined(4), joined(3), joined(2), joined(1)],
            })
        })
        .collect()
}

pub fn write_parameter_table(rows: &[ParameterRow], path: &Path) -> Result<(), ReportError> {
    let records: Vec<Vec<String>> = rows.iter().map(ParameterRow::record).collect();
    write_csv_records(path, PARAMETER_TABLE_HEADER, &records)
}

// ---------------------------------------------------------------------------
// gem-groups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroupValue {
    pub type_id: i64,
    pub rarity: Value,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttrGroup {
    pub group_id: i64,
    pub weight: Option<Value>,
    pub names: BTreeMap<String, Vec<GroupValue>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CombinedGroups<'a> {
    pub group_ids: &'a [i64],
    pub groups: BTreeMap<String, &'a AttrGroup>,
}

/// `EffectDesc.<AttrType><subtypes, zero-padded to 4>.1`; `None` without subtypes.
pub fn effect_desc_key(value: &crate::data::Record) -> Option<String> {
    let subtypes: String = ["AttrTypeFirstSubtype", "AttrTypeSecondSubtype"]
        .iter()
        .filter_map(|key| value.get(*key).filter(|v| !v.is_null()))
        .map(display_value)
        .collect();
    if subtypes.is_empty() {
        return None;
    }
    let attr_type = value.get("AttrType").map(display_value).unwrap_or_default();
    Some(format!("EffectDesc.{attr_type}{subtypes:0>4}.1"))
}

/// Replace a `##素質#NNNN#レベル` tagged name by its trait display name.
pub fn resolve_trait_name(raw: &str) -> String {
    let Some(captures) = TRAIT_PATTERN.captures(raw) else {
        return raw.to_string();
    };
    // Four ASCII digits; the trait is keyed by the last two.
    let tail = &captures[1][2..];
    TRAIT_NAMES
        .iter()
        .find(|(suffix, _)| *suffix == tail)
        .map_or_else(|| raw.to_string(), |(_, name)| (*name).to_string())
}

/// Fractions below 1 render as a percentage, integral values as integers.
pub fn format_group_value(value: &Value) -> String {
    let Some(number) = coerce_f64(value) else {
        return display_value(value);
    };
    if number < 1.0 {
        return format!("{}%", format_general(number * 100.0));
    }
    if number.fract() == 0.0 && number.abs() < i64::MAX as f64 {
        return (number as i64).to_string();
    }
    number.to_string()
}

/// `%g`: six significant digits, trailing zeros removed, exponent form for
/// very small or large magnitudes.
pub fn format_general(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return if value == 0.0 { "0".to_string() } else { value.to_string() };
    }
    let scientific = format!("{value:.5e}");
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if !(-4..6).contains(&exponent) {
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{}e{sign}{:02}", trim_zeros(mantissa), exponent.abs());
    }
    let decimals = (5 - exponent).max(0) as usize;
    trim_zeros(&format!("{value:.decimals$}")).to_string()
}

fn trim_zeros(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

pub fn build_attr_groups(
    attr_types: &Table,
    attr_groups: &Table,
    attr_values: &Table,
    effect_descs: &TextTable,
) -> BTreeMap<i64, AttrGroup> {
    let mut weights: HashMap<i64, Value> = HashMap::new();
    for group in attr_groups.records() {
        let Some(group_id) = group.get("GroupId").and_then(coerce_int) else {
            continue;
        };
        if let Some(weight) = group.get("Weight") {
            weights.entry(group_id).or_insert_with(|| weight.clone());
        }
    }

    let mut values_by_type: HashMap<i64, Vec<&crate::data::Record>> = HashMap::new();
    for value in attr_values.records() {
        if let Some(type_id) = value.get("TypeId").and_then(coerce_int) {
            values_by_type.entry(type_id).or_default().push(value);
        }
    }

    let mut groups: BTreeMap<i64, AttrGroup> = BTreeMap::new();
    for (key, attr_type) in attr_types.iter() {
        let type_id = attr_type.get("Id").and_then(coerce_int);
        let group_id = attr_type.get("GroupId").and_then(coerce_int);
        let (Some(type_id), Some(group_id)) = (type_id, group_id) else {
            warn!(table = ATTR_TYPE_TABLE, key, "attr type without Id/GroupId");
            continue;
        };
        let group = groups.entry(group_id).or_insert_with(|| AttrGroup {
            group_id,
            weight: weights.get(&group_id).cloned(),
            names: BTreeMap::new(),
        });
        for value in values_by_type.get(&type_id).into_iter().flatten() {
            let Some(name) = effect_desc_key(value).and_then(|key| effect_descs.get(&key)) else {
                continue;
            };
            if name.is_empty() {
                continue;
            }
            group
                .names
                .entry(resolve_trait_name(name))
                .or_default()
                .push(GroupValue {
                    type_id,
                    rarity: value.get("Rarity").cloned().unwrap_or(Value::Null),
                    value: format_group_value(value.get("Value").unwrap_or(&Value::String(String::new()))),
                });
        }
    }
    for group in groups.values_mut() {
        for list in group.names.values_mut() {
            list.sort_by_key(|entry| coerce_int(&entry.rarity).unwrap_or(0));
        }
    }
    groups
}

pub fn write_attr_groups(groups: &BTreeMap<i64, AttrGroup>, out_dir: &Path) -> Result<(), ReportError> {
    for (group_id, group) in groups {
        write_json(&out_dir.join(format!("group_{group_id}.json")), group)?;
    }
    for &(file_name, group_ids) in GROUP_SETS {
        let combined = CombinedGroups {
            group_ids,
            groups: group_ids
                .iter()
                .filter_map(|id| groups.get(id).map(|group| (id.to_string(), group)))
                .collect(),
        };
        write_json(&out_dir.join(file_name), &combined)?;
    }
    info!(groups = groups.len(), dir = %out_dir.display(), "wrote gem attribute groups");
    Ok(())
}
