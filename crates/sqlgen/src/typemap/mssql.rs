//! SQL Server column types.

use super::{bare_type, ColumnTranslator, RawColumn, SemanticType, TypeMapOptions};

/// Translator for SQL Server `INFORMATION_SCHEMA` type names.
#[derive(Debug, Clone, Copy, Default)]
pub struct MssqlTypes;

/// Mantissa bits declared in a full type such as "float(24)".
fn float_precision(full_db_type: &str) -> Option<u32> {
    let start = full_db_type.find('(')?;
    let end = full_db_type[start..].find(')')? + start;
    full_db_type[start + 1..end].trim().parse().ok()
}

impl ColumnTranslator for MssqlTypes {
    fn base_type(&self, raw: &RawColumn, _opts: &TypeMapOptions) -> SemanticType {
        match bare_type(&raw.db_type).as_str() {
            "bit" => SemanticType::Bool,

            "tinyint" => SemanticType::UInt8,
            "smallint" => SemanticType::Int16,
            "int" => SemanticType::Int32,
            "bigint" => SemanticType::Int64,

            "real" => SemanticType::Float32,
            "float" => match float_precision(&raw.full_db_type) {
                Some(n) if n <= 24 => SemanticType::Float32,
                _ => SemanticType::Float64,
            },
            "decimal" | "numeric" | "money" | "smallmoney" => SemanticType::Float64,

            "date" | "time" | "datetime" | "datetime2" | "datetimeoffset" | "smalldatetime" => {
                SemanticType::Time
            }

            // timestamp is the legacy name of rowversion, not a date type
            "binary" | "varbinary" | "image" | "rowversion" | "timestamp" => SemanticType::Bytes,

            _ => SemanticType::Text,
        }
    }
}
