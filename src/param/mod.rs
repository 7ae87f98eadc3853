//! The Param expression micro-language: parsing, numeric transforms, enum
//! text lookup, level-series enumeration, HitDamage binding and the resolver
//! that ties them together.

pub mod bind;
pub mod enum_text;
pub mod expr;
pub mod level_series;
pub mod resolver;
pub mod transform;

pub use bind::{BindMethod, BindResult, SkillReferenceIndex};
pub use expr::{Directive, FieldDirective, Mode, ParamExpr, TableFamily};
pub use resolver::{ParamResolver, Resolved, ResolvedParam};
pub use transform::{apply_numeric_transform, Converted, Transform};

/// Tables the resolver reads.
pub const RESOLVER_TABLES: &[&str] = &[
    resolver::HIT_DAMAGE_TABLE,
    resolver::BUFF_VALUE_TABLE,
    resolver::EFFECT_VALUE_TABLE,
    resolver::ONCE_ADDITIONAL_ATTRIBUTE_VALUE_TABLE,
    enum_text::ENUM_DESC_TABLE,
    bind::SKILL_TABLE,
];

/// Text tables the resolver reads.
pub const RESOLVER_TEXTS: &[&str] = &[enum_text::ENUM_DESC_TABLE];
