//! Associates a shared HitDamage record with the skill that owns it.
//!
//! HitDamage rows rarely name their skill, so a reverse index over every
//! skill's `ParamN` fields is built once and consulted when no explicit link
//! exists. The chosen method is always reported so uncertain binds can be
//! flagged downstream.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::data::table::{coerce_int, get_first_present, id_key, numeric_id_order, Record, Table};
use crate::param::expr::ParamExpr;

pub const SKILL_TABLE: &str = "Skill";

/// Records carry their Param expressions in `Param1` .. `Param15`.
pub const PARAM_FIELD_COUNT: u32 = 15;

const SKILL_LINK_FIELDS: &[&str] = &["SkillId", "skillId", "skillID"];
const LEVEL_COUNT_FIELDS: &[&str] = &["MaxLevel", "MaxLv", "LevelMax"];

pub fn param_keys() -> impl Iterator<Item = String> {
    (1..=PARAM_FIELD_COUNT).map(|i| format!("Param{i}"))
}

/// `(ParamN, text)` for every Param field of `record` holding an expression.
pub fn param_fields(record: &Record) -> Vec<(String, &str)> {
    param_keys()
        .filter_map(|key| {
            let text = record.get(&key).and_then(Value::as_str)?;
            is_param_expression(text).then_some((key, text))
        })
        .collect()
}

/// An expression is any string with at least one comma.
pub fn is_param_expression(text: &str) -> bool {
    text.contains(',')
}

/// Declared level count of a skill-like record, when present.
pub fn declared_level_count(record: &Record) -> Option<i64> {
    get_first_present(record, LEVEL_COUNT_FIELDS).and_then(coerce_int)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BindMethod {
    Explicit,
    UniqueReverseMatch,
    LengthMatched,
    AmbiguousFirstCandidate,
    NoReferenceFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BindResult {
    pub method: BindMethod,
    pub skill_id: Option<String>,
    pub candidates: Vec<String>,
}

/// HitDamage id -> skills whose Params reference `HitDamage,DamageNum,<id>`.
#[derive(Debug, Clone, Default)]
pub struct SkillReferenceIndex {
    by_hit_damage: HashMap<String, Vec<String>>,
}

impl SkillReferenceIndex {
    pub fn build(skills: &Table) -> Self {
        let mut by_hit_damage: HashMap<String, Vec<String>> = HashMap::new();
        for (skill_id, record) in skills.iter() {
            for (_, text) in param_fields(record) {
                let expr = ParamExpr::parse(text);
                if let Some(hit_id) = expr.hit_damage_reference() {
                    let owners = by_hit_damage.entry(hit_id.to_string()).or_default();
                    if !owners.iter().any(|owner| owner == skill_id) {
                        owners.push(skill_id.to_string());
                    }
                }
            }
        }
        for owners in by_hit_damage.values_mut() {
            owners.sort_by_key(|id| numeric_id_order(id));
        }
        debug!(references = by_hit_damage.len(), "built HitDamage reverse index");
        SkillReferenceIndex { by_hit_damage }
    }

    pub fn candidates(&self, hit_damage_id: &str) -> &[String] {
        self.by_hit_damage
            .get(hit_damage_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Bind HitDamage `hit_damage_id` (whose value list has `sequence_len` entries)
/// to its owning skill. An explicit, non-zero `SkillId` wins.
pub fn bind_hit_damage(
    hit_damage_id: &str,
    record: &Record,
    sequence_len: usize,
    index: &SkillReferenceIndex,
    skills: Option<&Table>,
) -> BindResult {
    let candidates = index.candidates(hit_damage_id).to_vec();

    let explicit = get_first_present(record, SKILL_LINK_FIELDS)
        .and_then(id_key)
        .filter(|id| id != "0");
    if let Some(skill_id) = explicit {
        return BindResult {
            method: BindMethod::Explicit,
            skill_id: Some(skill_id),
            candidates,
        };
    }

    let (method, skill_id) = match candidates.as_slice() {
        [] => (BindMethod::NoReferenceFound, None),
        [only] => (BindMethod::UniqueReverseMatch, Some(only.clone())),
        [first, ..] => {
            let length_matched = skills.and_then(|skills| {
                candidates.iter().find(|id| {
                    skills
                        .get(id)
                        .and_then(declared_level_count)
                        .map_or(false, |count| usize::try_from(count).ok() == Some(sequence_len))
                })
            });
            match length_matched {
                Some(id) => (BindMethod::LengthMatched, Some(id.clone())),
                None => {
                    warn!(
                        hit_damage = hit_damage_id,
                        candidates = candidates.len(),
                        "ambiguous HitDamage owner; using first candidate"
                    );
                    (BindMethod::AmbiguousFirstCandidate, Some(first.clone()))
                }
            }
        }
    };

    BindResult {
        method,
        skill_id,
        candidates,
    }
}
