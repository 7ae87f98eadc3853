//! Interprets Param expressions against a [TableRegistry].
//!
//! Resolution is pure: the same expression over the same registry always
//! yields the same [ResolvedParam]. Nothing here returns an error; malformed
//! expressions, unknown tables and missing records all resolve to an empty
//! payload that callers treat as "nothing to display".

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::data::table::Record;
use crate::data::TableRegistry;
use crate::param::bind::{bind_hit_damage, BindResult, SkillReferenceIndex, SKILL_TABLE};
use crate::param::enum_text::EnumTextResolver;
use crate::param::expr::{Directive, FieldDirective, Mode, ParamExpr, TableFamily};
use crate::param::level_series::build_level_series;
use crate::param::transform::{apply_numeric_transform, Transform};

pub const HIT_DAMAGE_TABLE: &str = "HitDamage";
pub const BUFF_VALUE_TABLE: &str = "BuffValue";
pub const EFFECT_VALUE_TABLE: &str = "EffectValue";
pub const ONCE_ADDITIONAL_ATTRIBUTE_VALUE_TABLE: &str = "OnceAdditionalAttributeValue";

/// Candidate names of the HitDamage per-level value list, in priority order.
const DAMAGE_SEQUENCE_FIELDS: &[&str] = &["SkillPercentAmend", "DamageNum", "Values", "Value"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResolvedParam {
    pub source: String,
    pub table: Option<String>,
    pub mode: Option<String>,
    pub identifier: Option<String>,
    pub resolved: Option<Resolved>,
}

impl ResolvedParam {
    pub fn is_empty(&self) -> bool {
        self.resolved.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Resolved {
    /// One record, one result per field directive.
    Fields(Vec<FieldResult>),
    /// One entry per level of a level-indexed family.
    Levels(Vec<LevelFields>),
    /// Per-level damage coefficients with the owning-skill bind.
    Damage(DamageSeries),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldResult {
    Numeric(NumericField),
    Enum(EnumField),
}

impl FieldResult {
    pub fn field(&self) -> &str {
        match self {
            FieldResult::Numeric(numeric) => &numeric.field,
            FieldResult::Enum(enumerated) => &enumerated.field,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NumericField {
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
    pub raw: Value,
    pub converted: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EnumField {
    pub field: String,
    #[serde(rename = "Enum")]
    pub enum_name: String,
    pub raw: Value,
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LevelFields {
    pub level: u32,
    pub id: String,
    pub fields: Vec<FieldResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DamageSeries {
    pub id: String,
    pub sequence_field: String,
    pub entries: Vec<DamageEntry>,
    pub bind: BindResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DamageEntry {
    pub level: u32,
    pub raw: Value,
    pub converted: Option<f64>,
}

/// Resolver over an immutable registry. The skill reverse index is built once
/// in [ParamResolver::new].
#[derive(Debug)]
pub struct ParamResolver<'a> {
    registry: &'a TableRegistry,
    enums: EnumTextResolver<'a>,
    skill_index: SkillReferenceIndex,
}

impl<'a> ParamResolver<'a> {
    pub fn new(registry: &'a TableRegistry) -> Self {
        let skill_index = registry
            .table(SKILL_TABLE)
            .map(SkillReferenceIndex::build)
            .unwrap_or_default();
        ParamResolver {
            registry,
            enums: EnumTextResolver::from_registry(registry),
            skill_index,
        }
    }

    /// Resolve `source`. `max_level` bounds LevelUp and DamageNum iteration.
    pub fn resolve(&self, source: &str, max_level: Option<u32>) -> ResolvedParam {
        self.resolve_expr(&ParamExpr::parse(source), max_level)
    }

    pub fn resolve_expr(&self, expr: &ParamExpr, max_level: Option<u32>) -> ResolvedParam {
        let resolved = if expr.is_complete() {
            self.dispatch(expr, max_level)
        } else {
            None
        };
        if resolved.is_none() {
            debug!(source = expr.source(), "param resolved to empty payload");
        }
        ResolvedParam {
            source: expr.source().to_string(),
            table: expr.table.as_ref().map(|t| t.as_str().to_string()),
            mode: expr.mode.as_ref().map(|m| m.as_str().to_string()),
            identifier: expr.identifier.clone(),
            resolved,
        }
    }

    fn dispatch(&self, expr: &ParamExpr, max_level: Option<u32>) -> Option<Resolved> {
        let table = expr.table.as_ref()?;
        let mode = expr.mode.as_ref()?;
        let id = expr.identifier.as_deref()?;
        match (table, mode) {
            (TableFamily::HitDamage, Mode::DamageNum) => self.resolve_damage(id, max_level),
            (TableFamily::BuffValue, Mode::NoLevel) => {
                self.resolve_no_level(BUFF_VALUE_TABLE, id, &expr.fields)
            }
            (TableFamily::EffectValue, Mode::NoLevel) => {
                self.resolve_no_level(EFFECT_VALUE_TABLE, id, &expr.fields)
            }
            (TableFamily::OnceAdditionalAttributeValue, Mode::NoLevel) => {
                self.resolve_no_level(ONCE_ADDITIONAL_ATTRIBUTE_VALUE_TABLE, id, &expr.fields)
            }
            (TableFamily::Effect, Mode::LevelUp) => {
                self.resolve_level_up(EFFECT_VALUE_TABLE, id, &expr.fields, max_level)
            }
            (TableFamily::OnceAdditionalAttribute, Mode::LevelUp) => self.resolve_level_up(
                ONCE_ADDITIONAL_ATTRIBUTE_VALUE_TABLE,
                id,
                &expr.fields,
                max_level,
            ),
            _ => None,
        }
    }

    fn lookup(&self, table_name: &str, id: &str) -> Option<&'a Record> {
        let record = self.registry.table(table_name)?.get(id);
        if record.is_none() {
            debug!(table = table_name, id, "referenced record not found");
        }
        record
    }

    fn resolve_no_level(
        &self,
        table_name: &str,
        id: &str,
        fields: &[FieldDirective],
    ) -> Option<Resolved> {
        let record = self.lookup(table_name, id)?;
        Some(Resolved::Fields(self.resolve_fields(record, fields)))
    }

    fn resolve_level_up(
        &self,
        value_table: &str,
        base_id: &str,
        fields: &[FieldDirective],
        max_level: Option<u32>,
    ) -> Option<Resolved> {
        let table = self.registry.table(value_table)?;
        let levels: Vec<LevelFields> = build_level_series(base_id, table, max_level)
            .into_iter()
            .map(|(level, record)| LevelFields {
                level,
                id: record_id(record, base_id, level),
                fields: self.resolve_fields(record, fields),
            })
            .collect();
        if levels.is_empty() {
            debug!(table = value_table, base_id, "empty level series");
            return None;
        }
        Some(Resolved::Levels(levels))
    }

    fn resolve_damage(&self, id: &str, max_level: Option<u32>) -> Option<Resolved> {
        let record = self.lookup(HIT_DAMAGE_TABLE, id)?;
        let Some((sequence_field, values)) = damage_sequence(record) else {
            warn!(hit_damage = id, "HitDamage record has no value list");
            return None;
        };
        let entries: Vec<DamageEntry> = (1u32..)
            .zip(values)
            .take_while(|(level, _)| max_level.map_or(true, |max| *level <= max))
            .map(|(level, raw)| {
                let converted = apply_numeric_transform(raw, Some(Transform::TenK));
                DamageEntry {
                    level,
                    raw: converted.raw,
                    converted: converted.converted,
                }
            })
            .collect();
        if entries.is_empty() {
            debug!(hit_damage = id, "empty damage series");
            return None;
        }
        let bind = bind_hit_damage(
            id,
            record,
            values.len(),
            &self.skill_index,
            self.registry.table(SKILL_TABLE),
        );
        Some(Resolved::Damage(DamageSeries {
            id: id.to_string(),
            sequence_field: sequence_field.to_string(),
            entries,
            bind,
        }))
    }

    fn resolve_fields(&self, record: &Record, fields: &[FieldDirective]) -> Vec<FieldResult> {
        fields
            .iter()
            .map(|directive| {
                let raw = record.get(&directive.field).cloned().unwrap_or(Value::Null);
                match &directive.directive {
                    Directive::Enum(enum_name) => FieldResult::Enum(EnumField {
                        field: directive.field.clone(),
                        enum_name: enum_name.clone(),
                        text: self.enums.resolve(enum_name, &raw).map(str::to_string),
                        raw,
                    }),
                    Directive::Numeric(transform) => {
                        let converted = apply_numeric_transform(&raw, *transform);
                        FieldResult::Numeric(NumericField {
                            field: directive.field.clone(),
                            transform: *transform,
                            raw: converted.raw,
                            converted: converted.converted,
                        })
                    }
                }
            })
            .collect()
    }
}

/// First list-valued field among the known names, else the first list field.
fn damage_sequence(record: &Record) -> Option<(&str, &Vec<Value>)> {
    DAMAGE_SEQUENCE_FIELDS
        .iter()
        .find_map(|name| {
            record
                .get_key_value(*name)
                .and_then(|(key, value)| value.as_array().map(|list| (key.as_str(), list)))
        })
        .or_else(|| {
            record
                .iter()
                .find_map(|(key, value)| value.as_array().map(|list| (key.as_str(), list)))
        })
}

/// The record's own `Id`, else the probed key rebuilt from the base id.
fn record_id(record: &Record, base_id: &str, level: u32) -> String {
    if let Some(id) = record.get("Id").and_then(crate::data::table::id_key) {
        return id;
    }
    let chars: Vec<char> = base_id.trim().chars().collect();
    let prefix: String = chars[..chars.len().saturating_sub(2)].iter().collect();
    let suffix: String = chars.last().map(|c| c.to_string()).unwrap_or_default();
    format!("{prefix}{level}{suffix}")
}
