//! In-memory tables keyed by string-encoded ids, plus the small coercion
//! helpers every report uses to read loosely-typed record fields.

use std::collections::HashMap;

use serde_json::{Map, Value};

/// One table row: field name -> scalar or list value, in source order.
pub type Record = Map<String, Value>;

/// Immutable id -> record mapping for one gameplay table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    name: String,
    rows: Map<String, Value>,
}

impl Table {
    pub fn new(name: impl Into<String>, rows: Map<String, Value>) -> Self {
        Table {
            name: name.into(),
            rows,
        }
    }

    /// Build from a JSON value; `None` unless the top level is an object.
    pub fn from_value(name: impl Into<String>, value: Value) -> Option<Self> {
        match value {
            Value::Object(rows) => Some(Table::new(name, rows)),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Record for `id`. Entries that are not JSON objects are treated as absent.
    pub fn get(&self, id: &str) -> Option<&Record> {
        self.rows.get(id).and_then(Value::as_object)
    }

    /// Records in file order. Non-object entries are skipped.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Record)> {
        self.rows
            .iter()
            .filter_map(|(id, value)| value.as_object().map(|record| (id.as_str(), record)))
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.iter().map(|(_, record)| record)
    }
}

/// Localized strings keyed by `"<TableName>.<id>.<field-index>"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextTable {
    name: String,
    entries: HashMap<String, String>,
}

impl TextTable {
    pub fn new(name: impl Into<String>, entries: HashMap<String, String>) -> Self {
        TextTable {
            name: name.into(),
            entries,
        }
    }

    /// Non-string values are dropped.
    pub fn from_map(name: impl Into<String>, map: Map<String, Value>) -> Self {
        let entries = map
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::String(text) => Some((key, text)),
                _ => None,
            })
            .collect();
        TextTable::new(name, entries)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Text for `<table>.<id>.<index>`.
    pub fn field(&self, table: &str, id: &str, index: u32) -> Option<&str> {
        self.get(&format!("{table}.{id}.{index}"))
    }

    /// Follow a text-key field value (e.g. a record's `Title`) into this table.
    pub fn lookup(&self, key: Option<&Value>) -> Option<&str> {
        match key? {
            Value::String(key) if !key.is_empty() => self.get(key),
            _ => None,
        }
    }
}

/// First non-null value among `keys` in `record` (schema spelling varies by table).
pub fn get_first_present<'a>(record: &'a Record, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| record.get(*key).filter(|value| !value.is_null()))
}

/// Integer coercion: integers as-is, floats truncated toward zero, strings that
/// parse as an integer after trimming. Everything else (null, bool, lists) fails.
pub fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Float coercion: numbers, and strings that parse as a float after trimming.
pub fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Table key for an id-valued field: integers render in decimal, strings pass through.
pub fn id_key(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(i.to_string()),
            None => n.as_f64().filter(|f| f.fract() == 0.0).map(|f| format!("{f:.0}")),
        },
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// Plain-text rendering for CSV cells and console output. Null renders empty.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format_float(f),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// Floats keep a trailing `.0` when integral so they stay distinguishable from ints.
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Sort key for string ids: numeric ids first in numeric order, then the rest.
pub fn numeric_id_order(id: &str) -> (u8, i64, String) {
    match id.trim().parse::<i64>() {
        Ok(n) => (0, n, String::new()),
        Err(_) => (1, 0, id.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Table {
        Table::from_value(
            "Sample",
            json!({
                "2": {"Id": 2, "Name": "b"},
                "1": {"Id": 1, "Name": "a"},
                "junk": 5
            }),
        )
        .unwrap()
    }

    #[test]
    fn table_iterates_in_file_order_and_skips_non_objects() {
        let table = sample();
        let ids: Vec<&str> = table.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["2", "1"]);
        assert!(table.get("junk").is_none());
        assert!(table.contains("1"));
    }

    #[test]
    fn from_value_rejects_arrays() {
        assert!(Table::from_value("Bad", json!([1, 2])).is_none());
    }

    #[test]
    fn coerce_int_follows_loose_rules() {
        assert_eq!(coerce_int(&json!(3)), Some(3));
        assert_eq!(coerce_int(&json!(3.9)), Some(3));
        assert_eq!(coerce_int(&json!(" 12 ")), Some(12));
        assert_eq!(coerce_int(&json!("1.5")), None);
        assert_eq!(coerce_int(&json!(null)), None);
        assert_eq!(coerce_int(&json!(true)), None);
    }

    #[test]
    fn coerce_f64_accepts_numeric_strings() {
        assert_eq!(coerce_f64(&json!("0.04")), Some(0.04));
        assert_eq!(coerce_f64(&json!(7)), Some(7.0));
        assert_eq!(coerce_f64(&json!("abc")), None);
        assert_eq!(coerce_f64(&json!([1])), None);
    }

    #[test]
    fn text_table_follows_key_fields() {
        let texts = TextTable::from_map(
            "Item",
            json!({"Item.1.1": "Potion", "Item.2.1": 5})
                .as_object()
                .cloned()
                .unwrap(),
        );
        assert_eq!(texts.len(), 1);
        assert_eq!(texts.field("Item", "1", 1), Some("Potion"));
        assert_eq!(texts.lookup(Some(&json!("Item.1.1"))), Some("Potion"));
        assert_eq!(texts.lookup(Some(&json!(""))), None);
        assert_eq!(texts.lookup(None), None);
    }

    #[test]
    fn display_value_renders_cells() {
        assert_eq!(display_value(&json!(null)), "");
        assert_eq!(display_value(&json!(105)), "105");
        assert_eq!(display_value(&json!(1.0)), "1.0");
        assert_eq!(display_value(&json!(0.04)), "0.04");
        assert_eq!(display_value(&json!("x")), "x");
    }

    #[test]
    fn numeric_ids_sort_numerically() {
        let mut ids = vec!["10", "9", "abc", "100"];
        ids.sort_by_key(|id| numeric_id_order(id));
        assert_eq!(ids, vec!["9", "10", "100", "abc"]);
    }

    #[test]
    fn first_present_skips_null_aliases() {
        let record = json!({"SkillId": null, "skillId": 0, "skillID": 42})
            .as_object()
            .cloned()
            .unwrap();
        assert_eq!(get_first_present(&record, &["SkillId", "skillID"]), Some(&json!(42)));
        assert_eq!(get_first_present(&record, &["SkillId", "skillId"]), Some(&json!(0)));
        assert_eq!(get_first_present(&record, &["SkillId", "Missing"]), None);
    }
}
