//! Resolver throughput: expressions resolved per second over a synthetic export.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use datamine::data::{Table, TableRegistry};
use datamine::param::ParamResolver;
use serde_json::{json, Map};

const SKILLS: usize = 2_000;

fn synthetic_registry() -> TableRegistry {
    let mut hit_damage = Map::new();
    let mut skills = Map::new();
    let mut effects = Map::new();
    for index in 0..SKILLS {
        let hit_id = 500_000 + index;
        hit_damage.insert(
            hit_id.to_string(),
            json!({"Id": hit_id, "SkillPercentAmend": [10000, 11000, 12000, 13000, 14000]}),
        );
        skills.insert(
            index.to_string(),
            json!({"Id": index, "MaxLevel": 5, "Param1": format!("HitDamage,DamageNum,{hit_id}")}),
        );
        for level in 1..=5 {
            let id = format!("{}{level}1", 1000 + index);
            effects.insert(id, json!({"Value": level * 500}));
        }
    }
    TableRegistry::new()
        .with_table(Table::new("HitDamage", hit_damage))
        .with_table(Table::new("Skill", skills))
        .with_table(Table::new("EffectValue", effects))
}

fn bench_resolver(c: &mut Criterion) {
    let registry = synthetic_registry();
    let exprs: Vec<String> = (0..SKILLS)
        .flat_map(|index| {
            [
                format!("HitDamage,DamageNum,{}", 500_000 + index),
                format!("Effect,LevelUp,{}01,Value,10KHdPct", 1000 + index),
            ]
        })
        .collect();

    let mut group = c.benchmark_group("param_resolver");
    group.sample_size(30);

    group.bench_function("build_skill_index", |b| {
        b.iter(|| ParamResolver::new(black_box(&registry)))
    });

    let resolver = ParamResolver::new(&registry);
    group.throughput(Throughput::Elements(exprs.len() as u64));
    group.bench_function("resolve_mixed", |b| {
        b.iter(|| {
            exprs
                .iter()
                .filter(|expr| !resolver.resolve(black_box(expr), None).is_empty())
                .count()
        })
    });
    group.finish();
}

criterion_group!(benches, bench_resolver);
criterion_main!(benches);
