//! Reference renderer: one Rust model struct plus SQL constants per table.

use std::io::Write;

use sqlgen::render::RenderError;
use sqlgen::{Column, SemanticType, Table, TableRenderer, TableTestRenderer, TemplateData};

const HEADER: &str = "// Code generated by sqlgen. DO NOT EDIT.";

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "box", "break", "const", "continue", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "static", "struct", "trait", "true", "type", "unsafe", "use",
    "where", "while", "yield",
];

/// Keywords that cannot be written as raw identifiers.
const RESERVED_PATH_KEYWORDS: &[&str] = &["crate", "self", "super", "Self"];

/// Writes `<table>_gen.rs`.
pub struct RustStructRenderer;

/// Writes `<table>_test_gen.rs` exercising the constants of [`RustStructRenderer`].
pub struct RustTestRenderer;

impl TableRenderer for RustStructRenderer {
    fn render(&self, data: &TemplateData<'_>, out: &mut dyn Write) -> Result<(), RenderError> {
        let table = data.table;
        let dialect = data.dialect;
        let pk = table.pk_columns();
        if pk.is_empty() {
            return Err(format!("table {} has no primary key", table.name).into());
        }

        writeln!(out, "{}", HEADER)?;
        writeln!(out, "//! Model for `{}.{}` ({}).", data.schema, table.name, dialect.driver_name)?;
        writeln!(out, "//! Package: {}", data.pkg_name)?;
        writeln!(out)?;
        writeln!(out, "use serde::{{Deserialize, Serialize}};")?;
        writeln!(out)?;
        writeln!(out, "pub const TABLE: &str = {:?};", table.name)?;
        writeln!(
            out,
            "pub const COLUMNS: &[&str] = &[{}];",
            table
                .columns
                .iter()
                .map(|c| format!("{:?}", c.name))
                .collect::<Vec<_>>()
                .join(", ")
        )?;
        writeln!(
            out,
            "pub const PRIMARY_KEY: &[&str] = &[{}];",
            pk.iter().map(|c| format!("{:?}", c)).collect::<Vec<_>>().join(", ")
        )?;
        writeln!(out)?;

        let referenced_by: Vec<String> = data
            .tables
            .iter()
            .flat_map(|t| t.foreign_keys_to(&table.name))
            .map(|fk| format!("{}.{}", fk.table, fk.column))
            .collect();
        if !referenced_by.is_empty() {
            writeln!(out, "/// Referenced by {}.", referenced_by.join(", "))?;
        }
        writeln!(out, "#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]")?;
        writeln!(out, "pub struct {} {{", struct_name(&table.name))?;
        for column in &table.columns {
            if let Some(fk) = table.foreign_keys.iter().find(|fk| fk.column == column.name) {
                writeln!(out, "    /// References `{}.{}`.", fk.foreign_table, fk.foreign_column)?;
            }
            if let Some(default) = &column.default {
                writeln!(out, "    /// Default: `{}`", default)?;
            }
            writeln!(out, "    pub {}: {},", field_name(&column.name), rust_type(column))?;
        }
        writeln!(out, "}}")?;
        writeln!(out)?;

        let quoted_table = dialect.quote(&table.name);
        let where_pk = pk
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{} = {}", dialect.quote(c), dialect.placeholder(i + 1)))
            .collect::<Vec<_>>()
            .join(" AND ");
        let column_list = table
            .columns
            .iter()
            .map(|c| dialect.quote(&c.name))
            .collect::<Vec<_>>()
            .join(", ");
        let values = (1..=table.columns.len())
            .map(|i| dialect.placeholder(i))
            .collect::<Vec<_>>()
            .join(", ");

        let select = if dialect.use_top_clause {
            format!("SELECT TOP 1 {} FROM {} WHERE {}", column_list, quoted_table, where_pk)
        } else {
            format!("SELECT {} FROM {} WHERE {} LIMIT 1", column_list, quoted_table, where_pk)
        };
        writeln!(out, "pub const SELECT_BY_PK: &str = {:?};", select)?;
        writeln!(
            out,
            "pub const INSERT: &str = {:?};",
            format!("INSERT INTO {} ({}) VALUES ({})", quoted_table, column_list, values)
        )?;
        writeln!(
            out,
            "pub const DELETE_BY_PK: &str = {:?};",
            format!("DELETE FROM {} WHERE {}", quoted_table, where_pk)
        )?;
        writeln!(
            out,
            "pub const USES_LAST_INSERT_ID: bool = {};",
            dialect.use_last_insert_id
        )?;
        Ok(())
    }
}

impl TableTestRenderer for RustTestRenderer {
    fn render(&self, data: &TemplateData<'_>, out: &mut dyn Write) -> Result<(), RenderError> {
        let table = data.table;
        writeln!(out, "{}", HEADER)?;
        writeln!(out)?;
        writeln!(out, "#[cfg(test)]")?;
        writeln!(out, "mod tests {{")?;
        writeln!(out, "    use super::*;")?;
        writeln!(out)?;
        writeln!(out, "    #[test]")?;
        writeln!(out, "    fn test_{}_columns() {{", field_name(&table.name))?;
        writeln!(out, "        assert_eq!(TABLE, {:?});", table.name)?;
        writeln!(out, "        assert_eq!(COLUMNS.len(), {});", table.columns.len())?;
        for pk in table.pk_columns() {
            writeln!(out, "        assert!(COLUMNS.contains(&{:?}));", pk)?;
        }
        writeln!(out, "    }}")?;
        writeln!(out)?;
        writeln!(out, "    #[test]")?;
        writeln!(out, "    fn test_{}_statements_bind_primary_key() {{", field_name(&table.name))?;
        for pk in table.pk_columns() {
            let quoted = data.dialect.quote(pk);
            writeln!(out, "        assert!(SELECT_BY_PK.contains({:?}));", quoted)?;
            writeln!(out, "        assert!(DELETE_BY_PK.contains({:?}));", quoted)?;
        }
        writeln!(out, "    }}")?;
        writeln!(out, "}}")?;
        Ok(())
    }
}

/// Rust type for a column: the base type, wrapped in `Option` when nullable.
fn rust_type(column: &Column) -> String {
    let base = match column.semantic_type {
        SemanticType::Bool => "bool",
        SemanticType::Int8 => "i8",
        SemanticType::UInt8 => "u8",
        SemanticType::Int16 => "i16",
        SemanticType::UInt16 => "u16",
        SemanticType::Int32 => "i32",
        SemanticType::UInt32 => "u32",
        SemanticType::Int64 => "i64",
        SemanticType::UInt64 => "u64",
        SemanticType::Float32 => "f32",
        SemanticType::Float64 => "f64",
        SemanticType::Text => "String",
        SemanticType::Bytes => "Vec<u8>",
        SemanticType::Time => "chrono::NaiveDateTime",
        SemanticType::Json => "serde_json::Value",
    };
    if column.null_wrapper.is_some() {
        format!("Option<{}>", base)
    } else {
        base.to_string()
    }
}

fn field_name(name: &str) -> String {
    let snake: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    if snake.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", snake)
    } else if RESERVED_PATH_KEYWORDS.contains(&snake.as_str()) {
        format!("{}_", snake)
    } else if RUST_KEYWORDS.contains(&snake.as_str()) {
        format!("r#{}", snake)
    } else {
        snake
    }
}

fn struct_name(table: &str) -> String {
    let name: String = table
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase(),
                None => String::new(),
            }
        })
        .collect();
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        format!("T{}", name)
    } else if RESERVED_PATH_KEYWORDS.contains(&name.as_str()) {
        format!("{}_", name)
    } else {
        name
    }
}

/// Table summary line for the `tables` command.
pub fn describe(table: &Table) -> String {
    format!(
        "{}: {} columns, pk=[{}], {} foreign keys{}",
        table.name,
        table.columns.len(),
        table.pk_columns().join(", "),
        table.foreign_keys.len(),
        if table.is_join_table { " (join table)" } else { "" }
    )
}
