//! Merges Star Tower events with their NPC lines, options, guaranteed map and
//! the effects of every option outcome.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::data::table::{coerce_int, display_value, id_key, numeric_id_order, Table, TextTable};
use crate::data::TableRegistry;

pub const EVENT_TABLE: &str = "StarTowerEvent";
pub const MAP_TABLE: &str = "StarTowerMap";
pub const OPTIONS_TABLE: &str = "EventOptions";
pub const RESULT_TABLE: &str = "EventResult";
pub const DROP_TABLE: &str = "Drop";
pub const DROP_PKG_TABLE: &str = "DropPkg";
pub const ITEM_TABLE: &str = "Item";
pub const ACTION_TEXT: &str = "StarTowerEventAction";
pub const OPTION_ACTION_TEXT: &str = "StarTowerEventOptionAction";
pub const STAR_TOWER_TEXT: &str = "StarTower";

pub const STAR_TOWER_TABLES: &[&str] = &[
    EVENT_TABLE,
    MAP_TABLE,
    OPTIONS_TABLE,
    RESULT_TABLE,
    DROP_TABLE,
    DROP_PKG_TABLE,
    ITEM_TABLE,
];

pub const STAR_TOWER_TEXTS: &[&str] = &[
    ACTION_TEXT,
    OPTION_ACTION_TEXT,
    STAR_TOWER_TEXT,
    OPTIONS_TABLE,
    ITEM_TABLE,
];

pub const DEFAULT_OUTPUT_FILE: &str = "StarTowerEventsCombined.json";

/// Results carry up to five `EffectN` / `ParameterN` pairs.
const EFFECT_SLOTS: u32 = 5;

static PROBABILITY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"（([0-9]+)％）").expect("probability pattern is a valid regex"));

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedEvent {
    pub id: i64,
    pub description: Value,
    pub event_type: Value,
    pub guaranteed_map_id: Value,
    pub guaranteed_map_scene_res: Value,
    pub guaranteed_map_theme: Option<String>,
    pub related_npcs: Vec<Value>,
    pub actions: Vec<NpcActions>,
    pub options: Vec<NpcOption>,
    pub option_outcomes: Vec<OptionOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NpcActions {
    pub npc_id: Value,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NpcOption {
    pub option_index: u32,
    pub npc_id: Value,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionOutcome {
    pub option_id: i64,
    pub option_index: i64,
    pub text: Option<String>,
    pub results: Vec<ResultOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultOutcome {
    pub result_id: i64,
    pub probability_percent: Option<f64>,
    pub effects: Vec<EffectInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DropItem {
    pub item_id: i64,
    pub item_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectInfo {
    pub code: Value,
    pub parameters: Vec<Value>,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_type: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drop_items: Option<Vec<DropItem>>,
}

impl EffectInfo {
    fn new(code: &Value, parameters: &[Value], kind: &'static str) -> Self {
        EffectInfo {
            code: code.clone(),
            parameters: parameters.to_vec(),
            kind,
            amount: None,
            value: None,
            target_id: None,
            note_id: None,
            quantity: None,
            note_type: None,
            drop_items: None,
        }
    }
}

/// Percentages written as `（NN％）`, in order of appearance.
pub fn extract_probabilities(text: Option<&str>) -> Vec<f64> {
    let Some(text) = text else {
        return Vec::new();
    };
    PROBABILITY_PATTERN
        .captures_iter(text)
        .filter_map(|captures| captures[1].parse::<f64>().ok())
        .collect()
}

/// Drop lookups shared by every `trigger_drop` effect.
struct DropLookup<'a> {
    drops: &'a Table,
    packages: HashMap<i64, Vec<i64>>,
    items: &'a Table,
    item_texts: &'a TextTable,
}

impl<'a> DropLookup<'a> {
    fn new(drops: &'a Table, drop_pkgs: &Table, items: &'a Table, item_texts: &'a TextTable) -> Self {
        let mut packages: HashMap<i64, Vec<i64>> = HashMap::new();
        for entry in drop_pkgs.records() {
            let pkg_id = entry.get("PkgId").and_then(Value::as_i64);
            let item_id = entry.get("ItemId").and_then(Value::as_i64);
            if let (Some(pkg_id), Some(item_id)) = (pkg_id, item_id) {
                packages.entry(pkg_id).or_default().push(item_id);
            }
        }
        DropLookup {
            drops,
            packages,
            items,
            item_texts,
        }
    }

    fn item_name(&self, item_id: i64) -> Option<String> {
        let key = item_id.to_string();
        if !self.items.contains(&key) {
            return None;
        }
        self.item_texts.field(ITEM_TABLE, &key, 1).map(str::to_string)
    }

    /// Items of drop `drop_id`, preferring the `<drop_id><variant>` row when it exists.
    fn items_for(&self, parameters: &[Value]) -> Vec<DropItem> {
        let Some(drop_id) = parameters.first().map(display_value) else {
            return Vec::new();
        };
        let key = match parameters.get(1).map(display_value) {
            Some(variant) if self.drops.contains(&format!("{drop_id}{variant}")) => {
                format!("{drop_id}{variant}")
            }
            _ => drop_id,
        };
        let Some(pkg_id) = self
            .drops
            .get(&key)
            .filter(|entry| !entry.is_empty())
            .and_then(|entry| entry.get("PkgId"))
            .and_then(Value::as_i64)
        else {
            return Vec::new();
        };
        self.packages
            .get(&pkg_id)
            .into_iter()
            .flatten()
            .map(|&item_id| DropItem {
                item_id,
                item_name: self.item_name(item_id),
            })
            .collect()
    }
}

fn describe_effect(code: &Value, parameters: &[Value], drops: &DropLookup<'_>) -> EffectInfo {
    let first = parameters.first().cloned();
    let second = parameters.get(1).cloned();
    match code.as_i64() {
        Some(1) => EffectInfo {
            amount: first,
            ..EffectInfo::new(code, parameters, "gain_coin")
        },
        Some(5) => EffectInfo {
            amount: first,
            ..EffectInfo::new(code, parameters, "spend_coin")
        },
        Some(3) => EffectInfo {
            drop_items: Some(drops.items_for(parameters)),
            ..EffectInfo::new(code, parameters, "trigger_drop")
        },
        Some(6) => EffectInfo {
            value: first,
            ..EffectInfo::new(code, parameters, "modify_hp_or_resource")
        },
        Some(14) => EffectInfo {
            target_id: first,
            ..EffectInfo::new(code, parameters, "apply_event_effect")
        },
        Some(16) => EffectInfo {
            target_id: first,
            ..EffectInfo::new(code, parameters, "trigger_event_message")
        },
        Some(17) => EffectInfo {
            quantity: first,
            note_type: second,
            ..EffectInfo::new(code, parameters, "gain_notes_random")
        },
        Some(18) => EffectInfo {
            note_id: first,
            quantity: second,
            ..EffectInfo::new(code, parameters, "gain_specific_notes")
        },
        Some(19) => EffectInfo {
            quantity: first,
            ..EffectInfo::new(code, parameters, "spend_notes_random")
        },
        _ => EffectInfo::new(code, parameters, "unknown_effect"),
    }
}

/// Consecutive lines `<prefix>.1`, `<prefix>.2`, ... until the first gap.
fn consecutive_lines(texts: &TextTable, prefix: &str) -> Vec<String> {
    (1..)
        .map_while(|line| texts.get(&format!("{prefix}.{line}")).map(str::to_string))
        .collect()
}

fn gather_actions(texts: &TextTable, event_id: i64, npcs: &[Value]) -> Vec<NpcActions> {
    npcs.iter()
        .filter_map(|npc| {
            let prefix = format!("{ACTION_TEXT}.{event_id}{}", display_value(npc));
            let lines = consecutive_lines(texts, &prefix);
            (!lines.is_empty()).then(|| NpcActions {
                npc_id: npc.clone(),
                lines,
            })
        })
        .collect()
}

/// Options are numbered `01`, `02`, ...; stops at the first number no NPC has text for.
fn gather_options(texts: &TextTable, event_id: i64, npcs: &[Value]) -> Vec<NpcOption> {
    let mut options = Vec::new();
    for option_index in 1u32.. {
        let before = options.len();
        for npc in npcs {
            let prefix = format!(
                "{OPTION_ACTION_TEXT}.{event_id}{option_index:02}{}",
                display_value(npc)
            );
            let lines = consecutive_lines(texts, &prefix);
            if !lines.is_empty() {
                options.push(NpcOption {
                    option_index,
                    npc_id: npc.clone(),
                    lines,
                });
            }
        }
        if options.len() == before {
            break;
        }
    }
    options
}

/// Integer keys of `table` grouped by `key / 100`, each group ascending.
fn ids_by_hundreds(table: &Table) -> HashMap<i64, Vec<i64>> {
    let mut grouped: HashMap<i64, Vec<i64>> = HashMap::new();
    for (key, _) in table.iter() {
        if let Ok(id) = key.trim().parse::<i64>() {
            grouped.entry(id.div_euclid(100)).or_default().push(id);
        }
    }
    for ids in grouped.values_mut() {
        ids.sort_unstable();
    }
    grouped
}

struct Sources<'a> {
    registry: &'a TableRegistry,
    empty: Table,
    no_text: TextTable,
}

impl<'a> Sources<'a> {
    fn table(&self, name: &str) -> &Table {
        self.registry.table(name).unwrap_or(&self.empty)
    }

    fn text(&self, name: &str) -> &TextTable {
        self.registry.text(name).unwrap_or(&self.no_text)
    }
}

pub fn merge_events(registry: &TableRegistry) -> Vec<MergedEvent> {
    let sources = Sources {
        registry,
        empty: Table::default(),
        no_text: TextTable::default(),
    };
    let events = sources.table(EVENT_TABLE);
    let maps = sources.table(MAP_TABLE);
    let results = sources.table(RESULT_TABLE);
    let action_texts = sources.text(ACTION_TEXT);
    let option_texts = sources.text(OPTION_ACTION_TEXT);
    let option_labels = sources.text(OPTIONS_TABLE);
    let themes = sources.text(STAR_TOWER_TEXT);
    let drops = DropLookup::new(
        sources.table(DROP_TABLE),
        sources.table(DROP_PKG_TABLE),
        sources.table(ITEM_TABLE),
        sources.text(ITEM_TABLE),
    );
    let options_by_rule = ids_by_hundreds(sources.table(OPTIONS_TABLE));
    let results_by_option = ids_by_hundreds(results);

    let mut keys: Vec<&str> = events.iter().map(|(key, _)| key).collect();
    keys.sort_by_key(|key| numeric_id_order(key));

    let mut merged = Vec::with_capacity(keys.len());
    let mut seen = HashSet::new();
    for key in keys {
        let Some(event) = events.get(key) else {
            continue;
        };
        let Some(event_id) = event.get("Id").and_then(coerce_int) else {
            warn!(table = EVENT_TABLE, key, "event without integer Id");
            continue;
        };
        if !seen.insert(event_id) {
            warn!(event_id, "duplicate event id");
        }
        let npcs: Vec<Value> = event
            .get("RelatedNPCs")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let map_id = event.get("GuaranteedMapId").cloned().unwrap_or(Value::Null);
        let map_entry = id_key(&map_id)
            .and_then(|id| maps.get(&id))
            .filter(|entry| !entry.is_empty());
        let scene_res = map_entry
            .and_then(|entry| entry.get("SceneRes"))
            .cloned()
            .unwrap_or(Value::Null);
        let theme = map_entry
            .and_then(|entry| entry.get("Theme"))
            .and_then(Value::as_i64)
            .and_then(|theme| themes.field(STAR_TOWER_TEXT, &theme.to_string(), 1))
            .map(str::to_string);

        let rule_id = event.get("OptionsRulesId").map_or(Some(0), Value::as_i64);
        let option_ids = rule_id
            .and_then(|rule| options_by_rule.get(&rule))
            .cloned()
            .unwrap_or_default();
        let option_outcomes = option_ids
            .into_iter()
            .map(|option_id| {
                let text = option_labels.field(OPTIONS_TABLE, &option_id.to_string(), 1);
                let probabilities = extract_probabilities(text);
                let outcomes = results_by_option
                    .get(&option_id)
                    .into_iter()
                    .flatten()
                    .enumerate()
                    .map(|(index, &result_id)| ResultOutcome {
                        result_id,
                        probability_percent: probabilities.get(index).copied(),
                        effects: result_effects(results, result_id, &drops),
                    })
                    .collect();
                OptionOutcome {
                    option_id,
                    option_index: option_id.rem_euclid(100),
                    text: text.map(str::to_string),
                    results: outcomes,
                }
            })
            .collect();

        merged.push(MergedEvent {
            id: event_id,
            description: event.get("Desc").cloned().unwrap_or(Value::Null),
            event_type: event.get("EventType").cloned().unwrap_or(Value::Null),
            guaranteed_map_id: map_id,
            guaranteed_map_scene_res: scene_res,
            guaranteed_map_theme: theme,
            actions: gather_actions(action_texts, event_id, &npcs),
            options: gather_options(option_texts, event_id, &npcs),
            related_npcs: npcs,
            option_outcomes,
        });
    }
    info!(events = merged.len(), "merged star tower events");
    merged
}

fn result_effects(results: &Table, result_id: i64, drops: &DropLookup<'_>) -> Vec<EffectInfo> {
    let Some(result) = results.get(&result_id.to_string()) else {
        return Vec::new();
    };
    (1..=EFFECT_SLOTS)
        .filter_map(|slot| {
            let code = result.get(&format!("Effect{slot}"))?;
            let parameters = result
                .get(&format!("Parameter{slot}"))
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            Some(describe_effect(code, parameters, drops))
        })
        .collect()
}
