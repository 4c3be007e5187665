//! MySQL/MariaDB column types.

use super::{bare_type, ColumnTranslator, RawColumn, SemanticType, TypeMapOptions};

/// Translator for MySQL and MariaDB `information_schema` types.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlTypes;

impl ColumnTranslator for MysqlTypes {
    fn base_type(&self, raw: &RawColumn, opts: &TypeMapOptions) -> SemanticType {
        // The unsigned flag may only be visible in the full type (e.g. "int(10) unsigned").
        let unsigned = raw.unsigned || raw.full_db_type.to_lowercase().contains("unsigned");

        match bare_type(&raw.db_type).as_str() {
            "tinyint" => {
                if opts.tinyint_as_bool && raw.full_db_type.trim().eq_ignore_ascii_case("tinyint(1)") {
                    SemanticType::Bool
                } else {
                    SemanticType::integer(1, unsigned)
                }
            }
            "bool" | "boolean" => SemanticType::Bool,
            "smallint" => SemanticType::integer(2, unsigned),
            "mediumint" | "int" | "integer" => SemanticType::integer(4, unsigned),
            "bigint" => SemanticType::integer(8, unsigned),

            "float" => SemanticType::Float32,
            "double" | "double precision" | "real" => SemanticType::Float64,

            "date" | "datetime" | "timestamp" | "time" => SemanticType::Time,

            "binary" | "varbinary" | "tinyblob" | "blob" | "mediumblob" | "longblob" => {
                SemanticType::Bytes
            }

            "json" => SemanticType::Json,

            // decimal, char, varchar, text variants, enum, set, year, bit
            _ => SemanticType::Text,
        }
    }

    fn is_generated_default(&self, default: &str) -> bool {
        default.eq_ignore_ascii_case("auto_increment")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(raw: RawColumn, tinyint_as_bool: bool) -> SemanticType {
        MysqlTypes.base_type(&raw, &TypeMapOptions { tinyint_as_bool })
    }

    #[test]
    fn test_integer_widths_and_signedness() {
        assert_eq!(base(RawColumn::new("a", "tinyint"), false), SemanticType::Int8);
        assert_eq!(base(RawColumn::new("a", "tinyint").unsigned(), false), SemanticType::UInt8);
        assert_eq!(base(RawColumn::new("a", "smallint"), false), SemanticType::Int16);
        assert_eq!(base(RawColumn::new("a", "smallint").unsigned(), false), SemanticType::UInt16);
        assert_eq!(base(RawColumn::new("a", "mediumint"), false), SemanticType::Int32);
        assert_eq!(base(RawColumn::new("a", "mediumint").unsigned(), false), SemanticType::UInt32);
        assert_eq!(base(RawColumn::new("a", "int"), false), SemanticType::Int32);
        assert_eq!(base(RawColumn::new("a", "int").unsigned(), false), SemanticType::UInt32);
        assert_eq!(base(RawColumn::new("a", "bigint"), false), SemanticType::Int64);
        assert_eq!(base(RawColumn::new("a", "bigint").unsigned(), false), SemanticType::UInt64);
    }

    #[test]
    fn test_unsigned_read_from_full_type() {
        let raw = RawColumn::new("a", "int").full_type("int(10) unsigned");
        assert_eq!(base(raw, false), SemanticType::UInt32);
    }

    #[test]
    fn test_tinyint_one_respects_switch() {
        let raw = RawColumn::new("active", "tinyint").full_type("tinyint(1)");
        assert_eq!(base(raw.clone(), false), SemanticType::Int8);
        assert_eq!(base(raw, true), SemanticType::Bool);

        let wider = RawColumn::new("level", "tinyint").full_type("tinyint(4)");
        assert_eq!(base(wider, true), SemanticType::Int8);
    }

    #[test]
    fn test_nullable_tinyint_one_as_bool() {
        let raw = RawColumn::new("active", "tinyint")
            .full_type("tinyint(1)")
            .nullable();
        let col = MysqlTypes.translate(raw, &TypeMapOptions { tinyint_as_bool: true });
        assert_eq!(col.semantic_type, SemanticType::Bool);
        assert_eq!(col.type_name(), "NullBool");
    }

    #[test]
    fn test_float_temporal_binary_json() {
        assert_eq!(base(RawColumn::new("a", "float"), false), SemanticType::Float32);
        assert_eq!(base(RawColumn::new("a", "double"), false), SemanticType::Float64);
        assert_eq!(base(RawColumn::new("a", "real"), false), SemanticType::Float64);
        assert_eq!(base(RawColumn::new("a", "datetime"), false), SemanticType::Time);
        assert_eq!(base(RawColumn::new("a", "time"), false), SemanticType::Time);
        assert_eq!(base(RawColumn::new("a", "longblob"), false), SemanticType::Bytes);
        assert_eq!(base(RawColumn::new("a", "varbinary"), false), SemanticType::Bytes);
        assert_eq!(base(RawColumn::new("a", "json"), false), SemanticType::Json);
    }

    #[test]
    fn test_unknown_types_are_text() {
        assert_eq!(base(RawColumn::new("a", "varchar"), false), SemanticType::Text);
        assert_eq!(base(RawColumn::new("a", "decimal"), false), SemanticType::Text);
        assert_eq!(base(RawColumn::new("a", "geometry"), false), SemanticType::Text);
    }

    #[test]
    fn test_translation_is_deterministic() {
        let raw = RawColumn::new("a", "bigint").unsigned().nullable();
        let opts = TypeMapOptions::default();
        assert_eq!(
            MysqlTypes.translate(raw.clone(), &opts),
            MysqlTypes.translate(raw, &opts)
        );
    }
}
