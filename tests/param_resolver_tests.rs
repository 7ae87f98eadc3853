use datamine::data::{Table, TableRegistry, TextTable};
use datamine::param::resolver::FieldResult;
use datamine::param::{BindMethod, ParamExpr, ParamResolver, Resolved};
use serde_json::{json, Value};

fn table(name: &str, rows: Value) -> Table {
    Table::from_value(name, rows).expect("fixture rows should be an object")
}

fn registry() -> TableRegistry {
    TableRegistry::new()
        .with_table(table(
            "BuffValue",
            json!({"9001": {"Id": 9001, "Time": 35000, "Rate": "0.5", "BuffType": 3}}),
        ))
        .with_table(table(
            "EffectValue",
            json!({
                "201011": {"Id": 201011, "Value": 1000},
                "201021": {"Id": 201021, "Value": 1200},
                "201031": {"Id": 201031, "Value": 1400},
                "201051": {"Id": 201051, "Value": 9999}
            }),
        ))
        .with_table(table(
            "OnceAdditionalAttributeValue",
            json!({
                "8811": {"Id": 8811, "Value": 300, "Kind": 3},
                "8821": {"Id": 8821, "Value": 600, "Kind": 3},
                "8801": {"Id": 8801, "Value": 50}
            }),
        ))
        .with_table(table(
            "HitDamage",
            json!({
                "7001": {"Id": 7001, "SkillPercentAmend": [5000, 6000, 7000]},
                "7002": {"Id": 7002, "SkillId": 300, "SkillPercentAmend": [100, 200]},
                "7003": {"Id": 7003, "SkillPercentAmend": [1, 2, 3]}
            }),
        ))
        .with_table(table(
            "Skill",
            json!({
                "300": {"Id": 300, "Param1": "HitDamage,DamageNum,7002"},
                "301": {"Id": 301, "MaxLevel": 3, "Param1": "HitDamage,DamageNum,7003"},
                "302": {"Id": 302, "MaxLevel": 9, "Param2": "HitDamage,DamageNum,7003"}
            }),
        ))
        .with_table(table(
            "EnumDesc",
            json!({"10": {"Id": 10, "EnumName": "BuffType", "Value": 3, "Key": "EnumDesc.10.1"}}),
        ))
        .with_text(TextTable::from_map(
            "EnumDesc",
            json!({"EnumDesc.10.1": "Regen"})
                .as_object()
                .cloned()
                .expect("object literal"),
        ))
}

#[test]
fn resolve_keeps_source_text_and_header_tokens() {
    let registry = registry();
    let resolver = ParamResolver::new(&registry);
    let source = " BuffValue , NoLevel , 9001 , Time , 10K ";
    let out = resolver.resolve(source, None);
    assert_eq!(out.source, source);
    assert_eq!(out.table.as_deref(), Some("BuffValue"));
    assert_eq!(out.mode.as_deref(), Some("NoLevel"));
    assert_eq!(out.identifier.as_deref(), Some("9001"));
    assert!(!out.is_empty());
}

#[test]
fn numeric_transforms_and_enum_text_resolve_together() {
    let registry = registry();
    let resolver = ParamResolver::new(&registry);
    let out = resolver.resolve("BuffValue,NoLevel,9001,Time,10K,Rate,HdPct,BuffType,Enum,BuffType", None);
    let Some(Resolved::Fields(fields)) = out.resolved else {
        panic!("expected field results");
    };
    let names: Vec<&str> = fields.iter().map(FieldResult::field).collect();
    assert_eq!(names, vec!["Time", "Rate", "BuffType"]);
    match &fields[0] {
        FieldResult::Numeric(field) => assert_eq!(field.converted, Some(3.5)),
        other => panic!("unexpected {other:?}"),
    }
    match &fields[1] {
        FieldResult::Numeric(field) => assert_eq!(field.converted, Some(50.0)),
        other => panic!("unexpected {other:?}"),
    }
    match &fields[2] {
        FieldResult::Enum(field) => {
            assert_eq!(field.enum_name, "BuffType");
            assert_eq!(field.text.as_deref(), Some("Regen"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn level_up_stops_at_the_first_gap() {
    let registry = registry();
    let resolver = ParamResolver::new(&registry);
    let out = resolver.resolve("Effect,LevelUp,201001,Value", None);
    let Some(Resolved::Levels(levels)) = out.resolved else {
        panic!("expected level results");
    };
    let ids: Vec<&str> = levels.iter().map(|level| level.id.as_str()).collect();
    assert_eq!(ids, vec!["201011", "201021", "201031"]);
}

#[test]
fn damage_bind_prefers_explicit_skill_id() {
    let registry = registry();
    let resolver = ParamResolver::new(&registry);
    let out = resolver.resolve("HitDamage,DamageNum,7002", None);
    let Some(Resolved::Damage(series)) = out.resolved else {
        panic!("expected damage series");
    };
    assert_eq!(series.bind.method, BindMethod::Explicit);
    assert_eq!(series.bind.skill_id.as_deref(), Some("300"));
    assert_eq!(series.entries[1].converted, Some(0.02));
}

#[test]
fn damage_bind_uses_level_count_to_break_ties() {
    let registry = registry();
    let resolver = ParamResolver::new(&registry);
    let out = resolver.resolve("HitDamage,DamageNum,7003", None);
    let Some(Resolved::Damage(series)) = out.resolved else {
        panic!("expected damage series");
    };
    assert_eq!(series.bind.method, BindMethod::LengthMatched);
    assert_eq!(series.bind.skill_id.as_deref(), Some("301"));
    assert_eq!(series.bind.candidates, vec!["301".to_string(), "302".to_string()]);
}

#[test]
fn unknown_tables_and_short_expressions_resolve_to_nothing() {
    let registry = registry();
    let resolver = ParamResolver::new(&registry);
    assert!(resolver.resolve("Mystery,NoLevel,1,Value", None).is_empty());
    assert!(resolver.resolve("", None).is_empty());
    let expr = ParamExpr::parse("EffectValue,NoLevel,201011,Value");
    assert!(!resolver.resolve_expr(&expr, None).is_empty());
}

#[test]
fn resolving_twice_gives_identical_results() {
    let registry = registry();
    let resolver = ParamResolver::new(&registry);
    for source in [
        "BuffValue,NoLevel,9001,Time,10K",
        "Effect,LevelUp,201001,Value,10KHdPct",
        "HitDamage,DamageNum,7003",
    ] {
        let first = resolver.resolve(source, Some(2));
        let second = resolver.resolve(source, Some(2));
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_value(&first).expect("payload should serialize"),
            serde_json::to_value(&second).expect("payload should serialize")
        );
    }
}

#[test]
fn unknown_table_and_mode_keep_header_with_null_payload() {
    let registry = registry();
    let resolver = ParamResolver::new(&registry);
    let out = resolver.resolve("Foo,Bar,1", None);
    assert_eq!(out.table.as_deref(), Some("Foo"));
    assert_eq!(out.mode.as_deref(), Some("Bar"));
    let value = serde_json::to_value(&out).expect("payload should serialize");
    assert_eq!(value["Table"], json!("Foo"));
    assert_eq!(value["Mode"], json!("Bar"));
    assert_eq!(value["Identifier"], json!("1"));
    assert!(value.get("Resolved").is_some());
    assert_eq!(value["Resolved"], Value::Null);
}

#[test]
fn effect_value_no_level_reads_the_named_record() {
    let registry = registry();
    let resolver = ParamResolver::new(&registry);
    let out = resolver.resolve("EffectValue,NoLevel,201021,Value,10KHdPct", None);
    let Some(Resolved::Fields(fields)) = out.resolved else {
        panic!("expected field results");
    };
    assert_eq!(fields.len(), 1);
    match &fields[0] {
        FieldResult::Numeric(field) => {
            assert_eq!(field.field, "Value");
            assert_eq!(field.raw, json!(1200));
            assert_eq!(field.converted, Some(12.0));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn once_additional_attribute_value_no_level_reads_its_own_table() {
    let registry = registry();
    let resolver = ParamResolver::new(&registry);
    let out = resolver.resolve("OnceAdditionalAttributeValue,NoLevel,8801,Value", None);
    let Some(Resolved::Fields(fields)) = out.resolved else {
        panic!("expected field results");
    };
    match &fields[0] {
        FieldResult::Numeric(field) => assert_eq!(field.converted, Some(50.0)),
        other => panic!("unexpected {other:?}"),
    }
    assert!(resolver.resolve("EffectValue,NoLevel,8801,Value", None).is_empty());
}

#[test]
fn once_additional_attribute_level_up_walks_the_value_table() {
    let registry = registry();
    let resolver = ParamResolver::new(&registry);
    let out = resolver.resolve("OnceAdditionalAttribute,LevelUp,8801,Value,Kind,Enum,BuffType", None);
    let Some(Resolved::Levels(levels)) = out.resolved else {
        panic!("expected level results");
    };
    let ids: Vec<&str> = levels.iter().map(|level| level.id.as_str()).collect();
    assert_eq!(ids, vec!["8811", "8821"]);
    match &levels[1].fields[0] {
        FieldResult::Numeric(field) => assert_eq!(field.converted, Some(600.0)),
        other => panic!("unexpected {other:?}"),
    }
    match &levels[1].fields[1] {
        FieldResult::Enum(field) => assert_eq!(field.text.as_deref(), Some("Regen")),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn zero_level_cap_gives_null_payload_for_every_series() {
    let registry = registry();
    let resolver = ParamResolver::new(&registry);
    assert!(resolver.resolve("HitDamage,DamageNum,7001", Some(0)).is_empty());
    assert!(resolver.resolve("Effect,LevelUp,201001,Value", Some(0)).is_empty());
    assert!(!resolver.resolve("HitDamage,DamageNum,7001", Some(1)).is_empty());
}
