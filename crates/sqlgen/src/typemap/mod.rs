//! Column type translation from dialect types to semantic types.
//!
//! Each dialect implements [`ColumnTranslator::base_type`]; the shared
//! [`ColumnTranslator::translate`] template method adds the nullable wrapper
//! and default-value normalization. Translation never fails: unrecognized
//! types become [`SemanticType::Text`].

mod mssql;
mod mysql;
mod postgres;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::schema::Column;

pub use mssql::MssqlTypes;
pub use mysql::MysqlTypes;
pub use postgres::PostgresTypes;

/// Dialect-independent column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SemanticType {
    Bool,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    Text,
    Bytes,
    Time,
    Json,
}

impl SemanticType {
    /// Whether the type is an integer of any width.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            SemanticType::Int8
                | SemanticType::UInt8
                | SemanticType::Int16
                | SemanticType::UInt16
                | SemanticType::Int32
                | SemanticType::UInt32
                | SemanticType::Int64
                | SemanticType::UInt64
        )
    }

    /// Pick the signed or unsigned integer of the given byte width.
    fn integer(bytes: u8, unsigned: bool) -> Self {
        match (bytes, unsigned) {
            (1, false) => SemanticType::Int8,
            (1, true) => SemanticType::UInt8,
            (2, false) => SemanticType::Int16,
            (2, true) => SemanticType::UInt16,
            (4, false) => SemanticType::Int32,
            (4, true) => SemanticType::UInt32,
            (_, false) => SemanticType::Int64,
            (_, true) => SemanticType::UInt64,
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Nullable container for a semantic type. One variant per base type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NullWrapper {
    NullBool,
    NullInt8,
    NullUInt8,
    NullInt16,
    NullUInt16,
    NullInt32,
    NullUInt32,
    NullInt64,
    NullUInt64,
    NullFloat32,
    NullFloat64,
    NullText,
    NullBytes,
    NullTime,
    NullJson,
}

impl NullWrapper {
    /// The wrapper for a base type.
    pub fn for_type(ty: SemanticType) -> Self {
        match ty {
            SemanticType::Bool => NullWrapper::NullBool,
            SemanticType::Int8 => NullWrapper::NullInt8,
            SemanticType::UInt8 => NullWrapper::NullUInt8,
            SemanticType::Int16 => NullWrapper::NullInt16,
            SemanticType::UInt16 => NullWrapper::NullUInt16,
            SemanticType::Int32 => NullWrapper::NullInt32,
            SemanticType::UInt32 => NullWrapper::NullUInt32,
            SemanticType::Int64 => NullWrapper::NullInt64,
            SemanticType::UInt64 => NullWrapper::NullUInt64,
            SemanticType::Float32 => NullWrapper::NullFloat32,
            SemanticType::Float64 => NullWrapper::NullFloat64,
            SemanticType::Text => NullWrapper::NullText,
            SemanticType::Bytes => NullWrapper::NullBytes,
            SemanticType::Time => NullWrapper::NullTime,
            SemanticType::Json => NullWrapper::NullJson,
        }
    }
}

impl fmt::Display for NullWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Run-wide translation switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TypeMapOptions {
    /// Map MySQL `tinyint(1)` to [`SemanticType::Bool`].
    pub tinyint_as_bool: bool,
}

/// Column descriptor as read from a dialect catalog, before translation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawColumn {
    pub name: String,
    /// Bare type name, e.g. "int", "character varying".
    pub db_type: String,
    /// Parameterized type, e.g. "int(10) unsigned".
    pub full_db_type: String,
    pub nullable: bool,
    pub unsigned: bool,
    pub unique: bool,
    /// Raw default expression from the catalog.
    pub default: Option<String>,
}

impl RawColumn {
    /// Descriptor with the full type equal to the bare type.
    pub fn new(name: impl Into<String>, db_type: impl Into<String>) -> Self {
        let db_type = db_type.into();
        Self {
            name: name.into(),
            full_db_type: db_type.clone(),
            db_type,
            ..Default::default()
        }
    }

    pub fn full_type(mut self, full_db_type: impl Into<String>) -> Self {
        self.full_db_type = full_db_type.into();
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// Per-dialect translation of raw column descriptors.
pub trait ColumnTranslator {
    /// Semantic type of a descriptor, ignoring nullability.
    fn base_type(&self, raw: &RawColumn, opts: &TypeMapOptions) -> SemanticType;

    /// Whether a default expression marks a database-generated value.
    fn is_generated_default(&self, _default: &str) -> bool {
        false
    }

    /// Build the normalized column.
    fn translate(&self, raw: RawColumn, opts: &TypeMapOptions) -> Column {
        let semantic_type = self.base_type(&raw, opts);
        let null_wrapper = raw.nullable.then(|| NullWrapper::for_type(semantic_type));
        let default = raw.default.and_then(|d| {
            let trimmed = d.trim();
            if trimmed.is_empty()
                || trimmed.eq_ignore_ascii_case("null")
                || self.is_generated_default(trimmed)
            {
                None
            } else {
                Some(trimmed.to_string())
            }
        });

        Column {
            name: raw.name,
            db_type: raw.db_type,
            full_db_type: raw.full_db_type,
            semantic_type,
            null_wrapper,
            nullable: raw.nullable,
            unsigned: raw.unsigned,
            unique: raw.unique,
            default,
        }
    }
}

/// Lowercased bare type name with any parameter list removed.
fn bare_type(db_type: &str) -> String {
    let lower = db_type.trim().to_lowercase();
    match lower.find('(') {
        Some(idx) => lower[..idx].trim_end().to_string(),
        None => lower,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_type_has_distinct_wrapper() {
        let all = [
            SemanticType::Bool,
            SemanticType::Int8,
            SemanticType::UInt8,
            SemanticType::Int16,
            SemanticType::UInt16,
            SemanticType::Int32,
            SemanticType::UInt32,
            SemanticType::Int64,
            SemanticType::UInt64,
            SemanticType::Float32,
            SemanticType::Float64,
            SemanticType::Text,
            SemanticType::Bytes,
            SemanticType::Time,
            SemanticType::Json,
        ];
        let wrappers: std::collections::HashSet<_> =
            all.iter().map(|t| NullWrapper::for_type(*t)).collect();
        assert_eq!(wrappers.len(), all.len());
        assert_eq!(NullWrapper::for_type(SemanticType::UInt64).to_string(), "NullUInt64");
    }

    #[test]
    fn test_translate_sets_wrapper_only_when_nullable() {
        let opts = TypeMapOptions::default();
        let col = MysqlTypes.translate(RawColumn::new("age", "int"), &opts);
        assert_eq!(col.semantic_type, SemanticType::Int32);
        assert!(col.null_wrapper.is_none());

        let col = MysqlTypes.translate(RawColumn::new("age", "int").nullable(), &opts);
        assert_eq!(col.null_wrapper, Some(NullWrapper::NullInt32));
    }

    #[test]
    fn test_translate_drops_null_and_generated_defaults() {
        let opts = TypeMapOptions::default();
        let col = MysqlTypes.translate(RawColumn::new("a", "int").default_value("NULL"), &opts);
        assert_eq!(col.default, None);

        let col = PostgresTypes.translate(
            RawColumn::new("id", "integer").default_value("nextval('users_id_seq'::regclass)"),
            &opts,
        );
        assert_eq!(col.default, None);

        let col = MysqlTypes.translate(RawColumn::new("n", "int").default_value("0"), &opts);
        assert_eq!(col.default.as_deref(), Some("0"));
    }

    #[test]
    fn test_translator_without_generated_defaults_keeps_expressions() {
        let opts = TypeMapOptions::default();
        assert!(!MssqlTypes.is_generated_default("newid()"));
        let col = MssqlTypes.translate(
            RawColumn::new("token", "uniqueidentifier").default_value("newid()"),
            &opts,
        );
        assert_eq!(col.default.as_deref(), Some("newid()"));
    }

    #[test]
    fn test_bare_type_strips_parameters() {
        assert_eq!(bare_type("VARCHAR(255)"), "varchar");
        assert_eq!(bare_type("double precision"), "double precision");
        assert_eq!(bare_type("float (24)"), "float");
    }
}
