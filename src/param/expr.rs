//! Parses Param expressions:
//! `Table,Mode,Identifier[,Field[,Transform | ,Enum,<EnumName>]]*`.
//!
//! Parsing never fails. Missing leading tokens stay `None`; unknown table or
//! mode names are kept verbatim so callers can still display them.

use std::fmt;

use crate::param::transform::Transform;

/// Target table family named by the first token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TableFamily {
    HitDamage,
    BuffValue,
    EffectValue,
    Effect,
    OnceAdditionalAttribute,
    OnceAdditionalAttributeValue,
    Other(String),
}

impl TableFamily {
    pub fn parse(token: &str) -> Self {
        match token {
            "HitDamage" => TableFamily::HitDamage,
            "BuffValue" => TableFamily::BuffValue,
            "EffectValue" => TableFamily::EffectValue,
            "Effect" => TableFamily::Effect,
            "OnceAdditionalAttribute" => TableFamily::OnceAdditionalAttribute,
            "OnceAdditionalAttributeValue" => TableFamily::OnceAdditionalAttributeValue,
            other => TableFamily::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TableFamily::HitDamage => "HitDamage",
            TableFamily::BuffValue => "BuffValue",
            TableFamily::EffectValue => "EffectValue",
            TableFamily::Effect => "Effect",
            TableFamily::OnceAdditionalAttribute => "OnceAdditionalAttribute",
            TableFamily::OnceAdditionalAttributeValue => "OnceAdditionalAttributeValue",
            TableFamily::Other(name) => name,
        }
    }
}

impl fmt::Display for TableFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Mode {
    NoLevel,
    LevelUp,
    DamageNum,
    Other(String),
}

impl Mode {
    pub fn parse(token: &str) -> Self {
        match token {
            "NoLevel" => Mode::NoLevel,
            "LevelUp" => Mode::LevelUp,
            "DamageNum" => Mode::DamageNum,
            other => Mode::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Mode::NoLevel => "NoLevel",
            Mode::LevelUp => "LevelUp",
            Mode::DamageNum => "DamageNum",
            Mode::Other(name) => name,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How one trailing field is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Numeric transform; `None` means identity.
    Numeric(Option<Transform>),
    /// Look the raw value up in the named enum family.
    Enum(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDirective {
    pub field: String,
    pub directive: Directive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamExpr {
    source: String,
    tokens: Vec<String>,
    pub table: Option<TableFamily>,
    pub mode: Option<Mode>,
    pub identifier: Option<String>,
    pub fields: Vec<FieldDirective>,
}

impl ParamExpr {
    pub fn parse(source: &str) -> Self {
        let tokens: Vec<String> = source.split(',').map(|t| t.trim().to_string()).collect();
        let non_empty = |index: usize| tokens.get(index).filter(|t| !t.is_empty()).cloned();

        let table = non_empty(0).map(|t| TableFamily::parse(&t));
        let mode = non_empty(1).map(|t| Mode::parse(&t));
        let identifier = non_empty(2);
        let fields = if tokens.len() > 3 {
            parse_field_directives(&tokens[3..])
        } else {
            Vec::new()
        };

        ParamExpr {
            source: source.to_string(),
            tokens,
            table,
            mode,
            identifier,
            fields,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Trimmed comma-separated tokens, empty ones included.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Tokens after the identifier, re-joined as written (trimmed).
    pub fn extras(&self) -> String {
        self.tokens.get(3..).map(|rest| rest.join(",")).unwrap_or_default()
    }

    /// At least `Table,Mode,Identifier` present.
    pub fn is_complete(&self) -> bool {
        self.table.is_some() && self.mode.is_some() && self.identifier.is_some()
    }

    /// True for `HitDamage,DamageNum,<id>`.
    pub fn hit_damage_reference(&self) -> Option<&str> {
        match (&self.table, &self.mode) {
            (Some(TableFamily::HitDamage), Some(Mode::DamageNum)) => self.identifier.as_deref(),
            _ => None,
        }
    }
}

fn parse_field_directives(tokens: &[String]) -> Vec<FieldDirective> {
    let mut fields = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let field = tokens[i].clone();
        i += 1;
        if field.is_empty() {
            continue;
        }
        let next = tokens.get(i).map(String::as_str);
        let directive = match next {
            Some("Enum") => {
                let name = tokens.get(i + 1).cloned().unwrap_or_default();
                i += 2;
                Directive::Enum(name)
            }
            Some(token) => match Transform::parse(token) {
                Some(transform) => {
                    i += 1;
                    Directive::Numeric(Some(transform))
                }
                None => Directive::Numeric(None),
            },
            None => Directive::Numeric(None),
        };
        fields.push(FieldDirective { field, directive });
    }
    fields
}
