//! Full detail dump for one character: base stats, skills with every Param
//! resolved, gem slots, upgrade materials and related records.

use std::collections::HashSet;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::{debug, info};

use crate::data::table::{coerce_int, Record, Table, TextTable};
use crate::data::TableRegistry;
use crate::param::bind::{declared_level_count, param_fields};
use crate::param::{ParamResolver, ResolvedParam};

pub const DEFAULT_CHARACTER_ID: i64 = 144;

pub const CHARACTER_TABLE: &str = "Character";
pub const SKILL_TABLE: &str = "Skill";
pub const SKILL_UPGRADE_TABLE: &str = "CharacterSkillUpgrade";
pub const GEM_TABLE: &str = "CharGem";
pub const ITEM_TABLE: &str = "Item";
pub const VIEW_TABLE: &str = "CharacterDes";
pub const TAG_TABLE: &str = "CharacterTag";
pub const ADVANCE_TABLE: &str = "CharacterAdvance";
pub const ATTRIBUTE_TABLE: &str = "Attribute";
pub const AI_TABLE: &str = "AI";

pub const CHARACTER_TABLES: &[&str] = &[
    CHARACTER_TABLE,
    SKILL_TABLE,
    SKILL_UPGRADE_TABLE,
    GEM_TABLE,
    ITEM_TABLE,
    VIEW_TABLE,
    TAG_TABLE,
    ADVANCE_TABLE,
    ATTRIBUTE_TABLE,
    AI_TABLE,
];

pub const CHARACTER_TEXTS: &[&str] = &[
    CHARACTER_TABLE,
    SKILL_TABLE,
    GEM_TABLE,
    ITEM_TABLE,
    VIEW_TABLE,
    TAG_TABLE,
];

/// `(output slot, Character field)` for the nine skill slots.
const SKILL_SLOTS: &[(&str, &str)] = &[
    ("NormalAtk", "NormalAtkId"),
    ("Skill", "SkillId"),
    ("SpecialSkill", "SpecialSkillId"),
    ("Ultimate", "UltimateId"),
    ("AssistNormalAtk", "AssistNormalAtkId"),
    ("AssistSkill", "AssistSkillId"),
    ("AssistSpecialSkill", "AssistSpecialSkillId"),
    ("AssistUltimate", "AssistUltimateId"),
    ("TalentSkill", "TalentSkillId"),
];

const VIEW_TEXT_FIELDS: &[&str] = &[
    "Alias",
    "CnCv",
    "JpCv",
    "CharDes",
    "PotentialMain1",
    "PotentialMain2",
    "PotentialAssistant1",
    "PotentialAssistant2",
    "PotentialMainContent1",
    "PotentialMainContent2",
    "PotentialAssistantContent1",
    "PotentialAssistantContent2",
];

const MATERIAL_SLOTS: u32 = 3;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CharacterDetails {
    pub id: Value,
    pub internal_name: Value,
    pub japanese_name: Option<String>,
    pub atk_spd: Value,
    #[serde(rename = "SwitchCD")]
    pub switch_cd: Value,
    pub energy_conv_ratio: Value,
    pub energy_efficiency: Value,
    pub skills_upgrade_group: Value,
    pub gem_slots: Value,
    pub skills: SkillSlots,
    pub gem_slot_details: Vec<TextedRecord>,
    pub skill_upgrade_details: Vec<MaterialEntry>,
    pub related_ids: RelatedIds,
    pub related_details: RelatedDetails,
}

/// Slot name -> skill, in slot order; `None` when the slot id is not an integer.
/// Serializes as a JSON object.
#[derive(Debug, Clone, Default)]
pub struct SkillSlots(pub Vec<(&'static str, Option<SkillDetail>)>);

impl SkillSlots {
    pub fn get(&self, slot: &str) -> Option<&SkillDetail> {
        self.0
            .iter()
            .find(|(name, _)| *name == slot)
            .and_then(|(_, detail)| detail.as_ref())
    }
}

impl Serialize for SkillSlots {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (slot, detail) in &self.0 {
            map.serialize_entry(slot, detail)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SkillDetail {
    pub id: i64,
    pub raw_data: Record,
    pub texts: SkillTexts,
    pub params: Vec<SkillParam>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SkillTexts {
    pub title: Option<String>,
    pub brief_desc: Option<String>,
    pub desc: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SkillParam {
    pub key: String,
    pub param: ResolvedParam,
}

/// A record plus texts looked up through its key fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TextedRecord {
    pub id: Value,
    pub raw_data: Record,
    pub texts: serde_json::Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Value>,
}

/// Upgrade or advance entry with its resolved materials appended.
#[derive(Debug, Clone, Serialize)]
pub struct MaterialEntry {
    #[serde(flatten)]
    pub raw: Record,
    #[serde(rename = "Materials", skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<TextedRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelatedIds {
    #[serde(rename = "ViewId")]
    pub view_id: Value,
    #[serde(rename = "AdvanceGroup")]
    pub advance_group: Value,
    #[serde(rename = "FragmentsId")]
    pub fragments_id: Value,
    #[serde(rename = "AttributeId")]
    pub attribute_id: Value,
    #[serde(rename = "AIId")]
    pub ai_id: Value,
    #[serde(rename = "AssistAIId")]
    pub assist_ai_id: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelatedDetails {
    #[serde(rename = "View")]
    pub view: Option<ViewDetail>,
    #[serde(rename = "Advance")]
    pub advance: Vec<MaterialEntry>,
    #[serde(rename = "FragmentItem")]
    pub fragment_item: Option<TextedRecord>,
    #[serde(rename = "Attributes")]
    pub attributes: Vec<Record>,
    #[serde(rename = "AI")]
    pub ai: Option<AiDetail>,
    #[serde(rename = "AssistAI")]
    pub assist_ai: Option<AiDetail>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ViewDetail {
    pub raw_data: Record,
    pub texts: serde_json::Map<String, Value>,
    pub tag_details: Vec<TextedRecord>,
    pub prefer_tags: Value,
    pub hate_tags: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AiDetail {
    pub id: i64,
    pub raw_data: Record,
}

/// Read-only view of the tables one character report needs.
struct Sources<'a> {
    registry: &'a TableRegistry,
    empty: Table,
    no_text: TextTable,
}

impl<'a> Sources<'a> {
    fn new(registry: &'a TableRegistry) -> Self {
        Sources {
            registry,
            empty: Table::default(),
            no_text: TextTable::default(),
        }
    }

    fn table(&self, name: &str) -> &Table {
        self.registry.table(name).unwrap_or(&self.empty)
    }

    fn text(&self, name: &str) -> &TextTable {
        self.registry.text(name).unwrap_or(&self.no_text)
    }
}

fn field(record: &Record, key: &str) -> Value {
    record.get(key).cloned().unwrap_or(Value::Null)
}

fn text_value(texts: &TextTable, key: Option<&Value>) -> Value {
    texts
        .lookup(key)
        .map_or(Value::Null, |text| Value::String(text.to_string()))
}

/// Build the report, or `None` when `character_id` is not in the Character table.
pub fn character_details(registry: &TableRegistry, character_id: i64) -> Option<CharacterDetails> {
    let sources = Sources::new(registry);
    let key = character_id.to_string();
    let Some(entry) = sources.table(CHARACTER_TABLE).get(&key) else {
        info!(character_id, "character not found");
        return None;
    };

    let resolver = ParamResolver::new(registry);
    let skills = SkillSlots(
        SKILL_SLOTS
            .iter()
            .map(|&(slot, id_field)| {
                let detail = entry
                    .get(id_field)
                    .and_then(Value::as_i64)
                    .map(|skill_id| skill_detail(&sources, &resolver, skill_id));
                (slot, detail)
            })
            .collect(),
    );

    let item_texts = sources.text(ITEM_TABLE);
    let related_ids = RelatedIds {
        view_id: field(entry, "ViewId"),
        advance_group: field(entry, "AdvanceGroup"),
        fragments_id: field(entry, "FragmentsId"),
        attribute_id: field(entry, "AttributeId"),
        ai_id: field(entry, "AIId"),
        assist_ai_id: field(entry, "AssistAIId"),
    };
    let related_details = RelatedDetails {
        view: view_detail(&sources, &related_ids.view_id),
        advance: advance_entries(&sources, &related_ids.advance_group),
        fragment_item: item_detail(
            sources.table(ITEM_TABLE),
            item_texts,
            &related_ids.fragments_id,
            None,
        ),
        attributes: attribute_group(sources.table(ATTRIBUTE_TABLE), &related_ids.attribute_id),
        ai: ai_detail(sources.table(AI_TABLE), &related_ids.ai_id),
        assist_ai: ai_detail(sources.table(AI_TABLE), &related_ids.assist_ai_id),
    };

    let details = CharacterDetails {
        id: field(entry, "Id"),
        internal_name: field(entry, "Name"),
        japanese_name: sources
            .text(CHARACTER_TABLE)
            .field(CHARACTER_TABLE, &key, 1)
            .map(str::to_string),
        atk_spd: field(entry, "AtkSpd"),
        switch_cd: field(entry, "SwitchCD"),
        energy_conv_ratio: field(entry, "EnergyConvRatio"),
        energy_efficiency: field(entry, "EnergyEfficiency"),
        skills_upgrade_group: field(entry, "SkillsUpgradeGroup"),
        gem_slots: field(entry, "GemSlots"),
        skills,
        gem_slot_details: gem_details(&sources, entry.get("GemSlots")),
        skill_upgrade_details: upgrade_entries(&sources, entry.get("SkillsUpgradeGroup")),
        related_ids,
        related_details,
    };
    info!(character_id, "built character details");
    Some(details)
}

fn skill_detail(sources: &Sources<'_>, resolver: &ParamResolver<'_>, skill_id: i64) -> SkillDetail {
    let key = skill_id.to_string();
    let raw = sources.table(SKILL_TABLE).get(&key).cloned().unwrap_or_default();
    let texts = sources.text(SKILL_TABLE);
    let text = |index: u32| texts.field(SKILL_TABLE, &key, index).map(str::to_string);
    let max_level = declared_level_count(&raw).and_then(|count| u32::try_from(count).ok());
    let params = param_fields(&raw)
        .into_iter()
        .map(|(param_key, expr)| SkillParam {
            key: param_key,
            param: resolver.resolve(expr, max_level),
        })
        .collect();
    debug!(skill_id, "resolved skill params");
    SkillDetail {
        id: skill_id,
        texts: SkillTexts {
            title: text(1),
            brief_desc: text(13),
            desc: text(2),
        },
        params,
        raw_data: raw,
    }
}

fn item_detail(
    items: &Table,
    texts: &TextTable,
    item_id: &Value,
    quantity: Option<Value>,
) -> Option<TextedRecord> {
    let id = item_id.as_i64()?;
    let raw = items.get(&id.to_string()).cloned().unwrap_or_default();
    let mut item_texts = serde_json::Map::new();
    for key in ["Title", "Desc", "Literary"] {
        item_texts.insert(key.to_string(), text_value(texts, raw.get(key)));
    }
    Some(TextedRecord {
        id: item_id.clone(),
        raw_data: raw,
        texts: item_texts,
        quantity,
    })
}

fn materials(sources: &Sources<'_>, entry: &Record) -> Vec<TextedRecord> {
    let items = sources.table(ITEM_TABLE);
    let texts = sources.text(ITEM_TABLE);
    (1..=MATERIAL_SLOTS)
        .filter_map(|index| {
            let tid = field(entry, &format!("Tid{index}"));
            let qty = entry.get(&format!("Qty{index}")).filter(|q| !q.is_null()).cloned();
            item_detail(items, texts, &tid, qty)
        })
        .collect()
}

fn gem_details(sources: &Sources<'_>, gem_slots: Option<&Value>) -> Vec<TextedRecord> {
    let Some(slots) = gem_slots.and_then(Value::as_array) else {
        return Vec::new();
    };
    let gems = sources.table(GEM_TABLE);
    let texts = sources.text(GEM_TABLE);
    slots
        .iter()
        .map(|gem_id| {
            let key = crate::data::table::id_key(gem_id).unwrap_or_default();
            let raw = gems.get(&key).cloned().unwrap_or_default();
            let mut gem_texts = serde_json::Map::new();
            for field in ["Title", "Desc"] {
                gem_texts.insert(field.to_string(), text_value(texts, raw.get(field)));
            }
            TextedRecord {
                id: gem_id.clone(),
                raw_data: raw,
                texts: gem_texts,
                quantity: None,
            }
        })
        .collect()
}

fn upgrade_entries(sources: &Sources<'_>, groups: Option<&Value>) -> Vec<MaterialEntry> {
    let Some(groups) = groups.and_then(Value::as_array) else {
        return Vec::new();
    };
    let upgrades = sources.table(SKILL_UPGRADE_TABLE);
    let mut seen = HashSet::new();
    groups
        .iter()
        .filter_map(|group| {
            let key = crate::data::table::id_key(group)?;
            if !seen.insert(key.clone()) {
                return None;
            }
            let entry = upgrades.get(&key).filter(|entry| !entry.is_empty())?;
            Some(MaterialEntry {
                raw: entry.clone(),
                materials: materials(sources, entry),
            })
        })
        .collect()
}

fn advance_entries(sources: &Sources<'_>, group: &Value) -> Vec<MaterialEntry> {
    let Some(group) = group.as_i64() else {
        return Vec::new();
    };
    let mut entries: Vec<MaterialEntry> = sources
        .table(ADVANCE_TABLE)
        .records()
        .filter(|entry| entry.get("Group").and_then(Value::as_i64) == Some(group))
        .map(|entry| MaterialEntry {
            raw: entry.clone(),
            materials: materials(sources, entry),
        })
        .collect();
    entries.sort_by_key(|entry| entry.raw.get("AdvanceLvl").and_then(coerce_int).unwrap_or(0));
    entries
}

fn attribute_group(attributes: &Table, attribute_id: &Value) -> Vec<Record> {
    let Some(group) = coerce_int(attribute_id) else {
        return Vec::new();
    };
    let mut entries: Vec<Record> = attributes
        .records()
        .filter(|entry| entry.get("GroupId").and_then(Value::as_i64) == Some(group))
        .cloned()
        .collect();
    entries.sort_by_key(|entry| entry.get("lvl").and_then(coerce_int).unwrap_or(0));
    entries
}

fn view_detail(sources: &Sources<'_>, view_id: &Value) -> Option<ViewDetail> {
    let id = view_id.as_i64()?;
    let raw = sources.table(VIEW_TABLE).get(&id.to_string())?;
    let view_texts = sources.text(VIEW_TABLE);
    let tags = sources.table(TAG_TABLE);
    let tag_texts = sources.text(TAG_TABLE);

    let tag_details = raw
        .get("Tag")
        .and_then(Value::as_array)
        .map(|tag_ids| {
            tag_ids
                .iter()
                .map(|tag_id| {
                    let key = crate::data::table::id_key(tag_id).unwrap_or_default();
                    let tag_raw = tags.get(&key).cloned().unwrap_or_default();
                    let mut texts = serde_json::Map::new();
                    texts.insert("Title".to_string(), text_value(tag_texts, tag_raw.get("Title")));
                    TextedRecord {
                        id: tag_id.clone(),
                        raw_data: tag_raw,
                        texts,
                        quantity: None,
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    let mut texts = serde_json::Map::new();
    for key in VIEW_TEXT_FIELDS {
        texts.insert((*key).to_string(), text_value(view_texts, raw.get(*key)));
    }
    Some(ViewDetail {
        raw_data: raw.clone(),
        texts,
        tag_details,
        prefer_tags: field(raw, "PreferTags"),
        hate_tags: field(raw, "HateTags"),
    })
}

fn ai_detail(ai: &Table, ai_id: &Value) -> Option<AiDetail> {
    let id = ai_id.as_i64()?;
    let raw = ai.get(&id.to_string())?;
    Some(AiDetail {
        id,
        raw_data: raw.clone(),
    })
}
