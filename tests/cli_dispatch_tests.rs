use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Value};

fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_datamine")
}

fn unique_temp_dir(name: &str) -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("datamine-{name}-{stamp}"))
}

fn write_json(path: &Path, value: &Value) {
    fs::create_dir_all(path.parent().expect("fixture path has a parent"))
        .expect("fixture dir should be created");
    fs::write(path, serde_json::to_string(value).expect("fixture should serialize"))
        .expect("fixture should be written");
}

/// Minimal JP/ja_JP export covering the resolver, scan and HitDamage tables.
fn write_export(root: &Path) {
    let bin = root.join("JP").join("bin");
    let language = root.join("JP").join("language").join("ja_JP");
    write_json(
        &bin.join("BuffValue.json"),
        &json!({"4021": {"Id": 4021, "Time": 100000}}),
    );
    write_json(
        &bin.join("EffectValue.json"),
        &json!({"144111": {"Id": 144111, "Value": 1500}, "144121": {"Id": 144121, "Value": 2500}}),
    );
    write_json(
        &bin.join("HitDamage.json"),
        &json!({
            "5001": {"Id": 5001, "levelTypeData": 2, "LevelData": 10, "SkillPercentAmend": [10000, 12000]},
            "5002": {"Id": 5002, "LevelData": 3}
        }),
    );
    write_json(&bin.join("OnceAdditionalAttributeValue.json"), &json!({}));
    write_json(&bin.join("EnumDesc.json"), &json!({}));
    write_json(
        &bin.join("Skill.json"),
        &json!({"100": {"Id": 100, "Title": "Slash", "Param1": "HitDamage,DamageNum,5001", "Param2": "BuffValue,NoLevel,4021,Time,10K"}}),
    );
    write_json(&bin.join("Word.json"), &json!({"1": {"Id": 1, "Param1": "Effect,LevelUp,144101,Value,10KHdPct"}}));
    write_json(&bin.join("Potential.json"), &json!({}));
    write_json(&bin.join("Talent.json"), &json!({}));
    write_json(&language.join("EnumDesc.json"), &json!({}));
}

fn run(root: &Path, args: &[&str]) -> Output {
    Command::new(bin())
        .arg("--data-root")
        .arg(root)
        .args(args)
        .env_remove("DATAMINE_DATA_ROOT")
        .env_remove("DATAMINE_REGION")
        .env_remove("DATAMINE_LOCALE")
        .env_remove("DATAMINE_OUTPUT_DIR")
        .output()
        .expect("datamine should run")
}

#[test]
fn resolve_emits_one_json_entry_per_expression() {
    let root = unique_temp_dir("resolve");
    write_export(&root);

    let output = run(
        &root,
        &["resolve", "BuffValue,NoLevel,4021,Time,10K", "HitDamage,DamageNum,5001"],
    );
    assert_eq!(output.status.code(), Some(0));
    let payload: Value =
        serde_json::from_slice(&output.stdout).expect("resolve should emit json");
    let entries = payload.as_array().expect("resolve should emit an array");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["Resolved"][0]["Converted"], json!(10.0));
    assert_eq!(entries[1]["Resolved"]["Bind"]["SkillId"], json!("100"));

    let _ = fs::remove_dir_all(root);
}

#[test]
fn missing_table_file_fails_with_command_name() {
    let root = unique_temp_dir("missing");
    fs::create_dir_all(&root).expect("temp dir should be created");

    let output = run(&root, &["resolve", "BuffValue,NoLevel,4021"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("resolve failed"));
    assert!(stderr.contains("BuffValue.json") || stderr.contains("HitDamage.json"));

    let _ = fs::remove_dir_all(root);
}

#[test]
fn usage_errors_exit_with_two() {
    let output = Command::new(bin())
        .arg("no-such-command")
        .output()
        .expect("datamine should run");
    assert_eq!(output.status.code(), Some(2));

    let help = Command::new(bin())
        .arg("--help")
        .output()
        .expect("datamine should run");
    assert_eq!(help.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&help.stdout).contains("scan-params"));
}

#[test]
fn scan_params_lists_filters_and_exports() {
    let root = unique_temp_dir("scan");
    write_export(&root);
    let csv_path = root.join("out").join("params.csv");

    let output = run(
        &root,
        &[
            "scan-params",
            "--summary",
            "--export-csv",
            csv_path.to_str().expect("utf-8 temp path"),
        ],
    );
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("shown: 3 / total: 3"));
    assert!(stdout.contains("Container x Table"));
    let csv = fs::read_to_string(&csv_path).expect("csv should be written");
    assert!(csv.starts_with("Container,OwnerId,OwnerName,ParamKey,ParamText"));
    assert_eq!(csv.lines().count(), 4);

    let filtered = run(&root, &["scan-params", "--filter-table", "HitDamage"]);
    assert!(String::from_utf8_lossy(&filtered.stdout).contains("shown: 1 / total: 1"));

    let _ = fs::remove_dir_all(root);
}

#[test]
fn hitdamage_combos_reports_and_writes_csv() {
    let root = unique_temp_dir("hitdamage");
    write_export(&root);
    let csv_path = root.join("combos.csv");

    let output = run(
        &root,
        &[
            "hitdamage-combos",
            "--export-csv",
            csv_path.to_str().expect("utf-8 temp path"),
        ],
    );
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("total: 2"));
    assert!(stdout.contains("levelTypeData=None / LevelData=3"));
    let csv = fs::read_to_string(&csv_path).expect("csv should be written");
    assert!(csv.starts_with("levelTypeData,LevelData,count,ratio_percent"));
    assert!(csv.contains("\n2,10,1,50.00,"));

    let _ = fs::remove_dir_all(root);
}
