//! PostgreSQL column types.

use super::{bare_type, ColumnTranslator, RawColumn, SemanticType, TypeMapOptions};

/// Translator for PostgreSQL `format_type` / `information_schema` type names.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresTypes;

impl ColumnTranslator for PostgresTypes {
    fn base_type(&self, raw: &RawColumn, _opts: &TypeMapOptions) -> SemanticType {
        match bare_type(&raw.db_type).as_str() {
            "boolean" | "bool" => SemanticType::Bool,

            "smallint" | "int2" | "smallserial" => SemanticType::Int16,
            "integer" | "int" | "int4" | "serial" => SemanticType::Int32,
            "bigint" | "int8" | "bigserial" => SemanticType::Int64,

            "real" | "float4" => SemanticType::Float32,
            "double precision" | "float8" | "numeric" | "decimal" => SemanticType::Float64,

            "date"
            | "time"
            | "timetz"
            | "timestamp"
            | "timestamptz"
            | "time without time zone"
            | "time with time zone"
            | "timestamp without time zone"
            | "timestamp with time zone" => SemanticType::Time,

            "bytea" => SemanticType::Bytes,

            "json" | "jsonb" => SemanticType::Json,

            _ => SemanticType::Text,
        }
    }

    fn is_generated_default(&self, default: &str) -> bool {
        default.to_lowercase().starts_with("nextval(")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(db_type: &str) -> SemanticType {
        PostgresTypes.base_type(&RawColumn::new("c", db_type), &TypeMapOptions::default())
    }

    #[test]
    fn test_integer_types() {
        assert_eq!(base("smallint"), SemanticType::Int16);
        assert_eq!(base("integer"), SemanticType::Int32);
        assert_eq!(base("bigint"), SemanticType::Int64);
    }

    #[test]
    fn test_float_and_numeric() {
        assert_eq!(base("real"), SemanticType::Float32);
        assert_eq!(base("double precision"), SemanticType::Float64);
        assert_eq!(base("numeric(10,2)"), SemanticType::Float64);
    }

    #[test]
    fn test_temporal_with_and_without_zone() {
        assert_eq!(base("timestamp with time zone"), SemanticType::Time);
        assert_eq!(base("timestamp(3) without time zone"), SemanticType::Time);
        assert_eq!(base("date"), SemanticType::Time);
        assert_eq!(base("time without time zone"), SemanticType::Time);
    }

    #[test]
    fn test_bool_bytes_json_text() {
        assert_eq!(base("boolean"), SemanticType::Bool);
        assert_eq!(base("bytea"), SemanticType::Bytes);
        assert_eq!(base("jsonb"), SemanticType::Json);
        assert_eq!(base("character varying(255)"), SemanticType::Text);
        assert_eq!(base("uuid"), SemanticType::Text);
        assert_eq!(base("USER-DEFINED"), SemanticType::Text);
    }
}
