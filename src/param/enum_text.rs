//! Resolves enum values to display text through the EnumDesc table and its
//! localized strings.

use serde_json::Value;

use crate::data::table::{coerce_int, Table, TextTable};
use crate::data::TableRegistry;

pub const ENUM_DESC_TABLE: &str = "EnumDesc";

const ENUM_NAME_FIELD: &str = "EnumName";
const ENUM_VALUE_FIELD: &str = "Value";
const ENUM_KEY_FIELD: &str = "Key";

#[derive(Debug, Clone, Copy)]
pub struct EnumTextResolver<'a> {
    descs: Option<&'a Table>,
    texts: Option<&'a TextTable>,
}

impl<'a> EnumTextResolver<'a> {
    pub fn new(descs: Option<&'a Table>, texts: Option<&'a TextTable>) -> Self {
        EnumTextResolver { descs, texts }
    }

    pub fn from_registry(registry: &'a TableRegistry) -> Self {
        EnumTextResolver::new(registry.table(ENUM_DESC_TABLE), registry.text(ENUM_DESC_TABLE))
    }

    /// Display text for `raw` in family `enum_name`. Linear scan; `None` when
    /// the value is not an integer or nothing matches.
    pub fn resolve(&self, enum_name: &str, raw: &Value) -> Option<&'a str> {
        let value = coerce_int(raw)?;
        let descs = self.descs?;
        let entry = descs.records().find(|record| {
            record.get(ENUM_NAME_FIELD).and_then(Value::as_str) == Some(enum_name)
                && record.get(ENUM_VALUE_FIELD).and_then(coerce_int) == Some(value)
        })?;
        self.texts?.lookup(entry.get(ENUM_KEY_FIELD))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixtures() -> (Table, TextTable) {
        let descs = Table::from_value(
            ENUM_DESC_TABLE,
            json!({
                "1": {"Id": 1, "EnumName": "EffectType", "Value": 1, "Key": "EnumDesc.1.1"},
                "2": {"Id": 2, "EnumName": "EffectType", "Value": 2, "Key": "EnumDesc.2.1"},
                "3": {"Id": 3, "EnumName": "ElementType", "Value": 1, "Key": "EnumDesc.3.1"}
            }),
        )
        .unwrap();
        let texts = TextTable::from_map(
            ENUM_DESC_TABLE,
            json!({"EnumDesc.1.1": "Attack", "EnumDesc.2.1": "Defense", "EnumDesc.3.1": "Fire"})
                .as_object()
                .cloned()
                .unwrap(),
        );
        (descs, texts)
    }

    #[test]
    fn matches_family_and_value() {
        let (descs, texts) = fixtures();
        let resolver = EnumTextResolver::new(Some(&descs), Some(&texts));
        assert_eq!(resolver.resolve("EffectType", &json!(2)), Some("Defense"));
        assert_eq!(resolver.resolve("ElementType", &json!("1")), Some("Fire"));
    }

    #[test]
    fn absent_for_non_integer_or_no_match() {
        let (descs, texts) = fixtures();
        let resolver = EnumTextResolver::new(Some(&descs), Some(&texts));
        assert_eq!(resolver.resolve("EffectType", &json!("abc")), None);
        assert_eq!(resolver.resolve("EffectType", &json!(99)), None);
        assert_eq!(resolver.resolve("Unknown", &json!(1)), None);
    }

    #[test]
    fn absent_without_tables() {
        let resolver = EnumTextResolver::new(None, None);
        assert_eq!(resolver.resolve("EffectType", &json!(1)), None);
    }
}
