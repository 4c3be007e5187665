//! Schema and metadata types for tables, columns, and key constraints.
//!
//! These types provide the dialect-independent representation produced by
//! introspection. Tables reference each other by name only, so every table can
//! be built, compared, and serialized on its own.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{GenError, Result};
use crate::typemap::{NullWrapper, SemanticType};

/// Column metadata after type translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Dialect type name (e.g., "tinyint", "character varying").
    pub db_type: String,

    /// Full parameterized type (e.g., "tinyint(1) unsigned", "varchar(255)").
    pub full_db_type: String,

    /// Semantic type assigned by the dialect's translator.
    pub semantic_type: SemanticType,

    /// Nullable container for the semantic type; set iff the column is nullable.
    pub null_wrapper: Option<NullWrapper>,

    /// Whether the column allows NULL.
    pub nullable: bool,

    /// Whether the column is declared unsigned.
    pub unsigned: bool,

    /// Whether the column alone forms a UNIQUE or PRIMARY KEY constraint.
    pub unique: bool,

    /// Default value expression. `None` for no default or generated values.
    pub default: Option<String>,
}

impl Column {
    /// Type name the renderer should emit: the wrapper when nullable, else the base type.
    pub fn type_name(&self) -> String {
        match self.null_wrapper {
            Some(wrapper) => wrapper.to_string(),
            None => self.semantic_type.to_string(),
        }
    }
}

/// Primary key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKey {
    /// Constraint name.
    pub name: String,

    /// Key columns in constraint order.
    pub columns: Vec<String>,
}

/// Single-column foreign key relationship.
///
/// Composite foreign keys are represented as several entries sharing `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Constraint name.
    pub name: String,

    /// Owning table name.
    pub table: String,

    /// Owning column name.
    pub column: String,

    /// Referenced table name.
    pub foreign_table: String,

    /// Referenced column name.
    pub foreign_column: String,
}

/// Table metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,

    /// Columns in dialect-reported order.
    pub columns: Vec<Column>,

    /// Primary key, if the table has one.
    pub primary_key: Option<PrimaryKey>,

    /// Foreign keys owned by this table.
    pub foreign_keys: Vec<ForeignKey>,

    /// Whether the table only links two other tables (many-to-many).
    pub is_join_table: bool,
}

impl Table {
    /// Build a table, deriving the join-table flag.
    pub fn new(
        name: impl Into<String>,
        columns: Vec<Column>,
        primary_key: Option<PrimaryKey>,
        foreign_keys: Vec<ForeignKey>,
    ) -> Self {
        let is_join_table = detect_join_table(&columns, primary_key.as_ref(), &foreign_keys);
        Self {
            name: name.into(),
            columns,
            primary_key,
            foreign_keys,
            is_join_table,
        }
    }

    /// Check if the table has a primary key.
    pub fn has_pk(&self) -> bool {
        self.primary_key.is_some()
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Primary key column names, empty when there is no key.
    pub fn pk_columns(&self) -> &[String] {
        self.primary_key
            .as_ref()
            .map(|pk| pk.columns.as_slice())
            .unwrap_or(&[])
    }

    /// Foreign keys pointing at `table` from this table.
    pub fn foreign_keys_to<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a ForeignKey> {
        self.foreign_keys
            .iter()
            .filter(move |fk| fk.foreign_table == table)
    }
}

/// Decide whether a table is a pure many-to-many link table.
///
/// True when the table's foreign-key entries form exactly two relationships
/// (entries of a composite key share one constraint name), every column
/// belongs to one of them, and the primary key (if any) covers exactly the
/// foreign-key columns.
pub fn detect_join_table(
    columns: &[Column],
    primary_key: Option<&PrimaryKey>,
    foreign_keys: &[ForeignKey],
) -> bool {
    let relationships: HashSet<(&str, &str)> = foreign_keys
        .iter()
        .map(|fk| (fk.name.as_str(), fk.foreign_table.as_str()))
        .collect();
    if relationships.len() != 2 {
        return false;
    }

    let fk_columns: HashSet<&str> = foreign_keys.iter().map(|fk| fk.column.as_str()).collect();
    let table_columns: HashSet<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    if table_columns != fk_columns {
        return false;
    }

    match primary_key {
        Some(pk) => {
            let pk_columns: HashSet<&str> = pk.columns.iter().map(String::as_str).collect();
            pk.columns.len() == pk_columns.len() && pk_columns == fk_columns
        }
        None => true,
    }
}

/// The set of tables produced by one introspection pass.
///
/// Tables are unique by name and keep the order the driver reported them in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaGraph {
    tables: Vec<Table>,
}

impl SchemaGraph {
    /// Build a graph, rejecting duplicate table names.
    pub fn new(tables: Vec<Table>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(tables.len());
        for table in &tables {
            if !seen.insert(table.name.as_str()) {
                return Err(GenError::Schema(format!(
                    "table '{}' reported more than once",
                    table.name
                )));
            }
        }
        Ok(Self { tables })
    }

    /// All tables in driver order.
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Look up a table by name.
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Tables the renderer should produce entities for.
    pub fn entity_tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter().filter(|t| !t.is_join_table)
    }

    /// Tables that reference `name` through a foreign key.
    pub fn referencing(&self, name: &str) -> Vec<&Table> {
        self.tables
            .iter()
            .filter(|t| t.foreign_keys.iter().any(|fk| fk.foreign_table == name))
            .collect()
    }

    /// Number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether the graph holds no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Consume the graph, returning its tables.
    pub fn into_tables(self) -> Vec<Table> {
        self.tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_column(name: &str) -> Column {
        Column {
            name: name.to_string(),
            db_type: "int".to_string(),
            full_db_type: "int(11)".to_string(),
            semantic_type: SemanticType::Int32,
            null_wrapper: None,
            nullable: false,
            unsigned: false,
            unique: false,
            default: None,
        }
    }

    fn make_fk(table: &str, column: &str, foreign_table: &str) -> ForeignKey {
        ForeignKey {
            name: format!("fk_{}_{}_{}", table, column, foreign_table),
            table: table.to_string(),
            column: column.to_string(),
            foreign_table: foreign_table.to_string(),
            foreign_column: "id".to_string(),
        }
    }

    fn make_pk(columns: &[&str]) -> PrimaryKey {
        PrimaryKey {
            name: "pk".to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn link_fks() -> Vec<ForeignKey> {
        vec![
            make_fk("user_roles", "user_id", "users"),
            make_fk("user_roles", "role_id", "roles"),
        ]
    }

    #[test]
    fn test_link_table_is_join_table() {
        let table = Table::new(
            "user_roles",
            vec![make_test_column("user_id"), make_test_column("role_id")],
            Some(make_pk(&["user_id", "role_id"])),
            link_fks(),
        );
        assert!(table.is_join_table);
    }

    #[test]
    fn test_link_table_without_pk_is_join_table() {
        let columns = vec![make_test_column("user_id"), make_test_column("role_id")];
        assert!(detect_join_table(&columns, None, &link_fks()));
    }

    #[test]
    fn test_extra_timestamp_column_is_not_join_table() {
        let mut created_at = make_test_column("created_at");
        created_at.semantic_type = SemanticType::Time;
        let table = Table::new(
            "user_roles",
            vec![
                make_test_column("user_id"),
                make_test_column("role_id"),
                created_at,
            ],
            Some(make_pk(&["user_id", "role_id"])),
            link_fks(),
        );
        assert!(!table.is_join_table);
    }

    #[test]
    fn test_surrogate_pk_is_not_join_table() {
        let columns = vec![make_test_column("user_id"), make_test_column("role_id")];
        assert!(!detect_join_table(
            &columns,
            Some(&make_pk(&["user_id"])),
            &link_fks()
        ));
    }

    #[test]
    fn test_fk_count_boundaries() {
        let columns = vec![make_test_column("user_id"), make_test_column("role_id")];
        let one = vec![make_fk("user_roles", "user_id", "users")];
        assert!(!detect_join_table(&columns, None, &one));

        let mut three = link_fks();
        three.push(make_fk("user_roles", "role_id", "groups"));
        assert!(!detect_join_table(&columns, None, &three));

        // Two entries on the same column are one relationship, not two.
        let same_column = vec![
            make_fk("user_roles", "user_id", "users"),
            make_fk("user_roles", "user_id", "accounts"),
        ];
        assert!(!detect_join_table(&columns, None, &same_column));
    }

    #[test]
    fn test_single_composite_fk_is_not_join_table() {
        let fk = |column: &str| ForeignKey {
            name: "fk_note_item".to_string(),
            table: "item_notes".to_string(),
            column: column.to_string(),
            foreign_table: "order_items".to_string(),
            foreign_column: column.to_string(),
        };
        let table = Table::new(
            "item_notes",
            vec![make_test_column("order_id"), make_test_column("line_no")],
            Some(make_pk(&["order_id", "line_no"])),
            vec![fk("order_id"), fk("line_no")],
        );
        assert!(!table.is_join_table);
    }

    #[test]
    fn test_two_composite_fks_form_join_table() {
        let fk = |name: &str, column: &str, foreign_table: &str| ForeignKey {
            name: name.to_string(),
            table: "shipment_items".to_string(),
            column: column.to_string(),
            foreign_table: foreign_table.to_string(),
            foreign_column: column.to_string(),
        };
        let columns = vec![
            make_test_column("order_id"),
            make_test_column("line_no"),
            make_test_column("shipment_id"),
        ];
        let fks = vec![
            fk("fk_item", "order_id", "order_items"),
            fk("fk_item", "line_no", "order_items"),
            fk("fk_shipment", "shipment_id", "shipments"),
        ];
        assert!(detect_join_table(&columns, None, &fks));
    }

    #[test]
    fn test_table_accessors() {
        let table = Table::new(
            "posts",
            vec![make_test_column("id"), make_test_column("author_id")],
            Some(make_pk(&["id"])),
            vec![make_fk("posts", "author_id", "users")],
        );
        assert!(table.has_pk());
        assert_eq!(table.pk_columns(), &["id".to_string()]);
        assert!(table.column("author_id").is_some());
        assert!(table.column("missing").is_none());
        assert_eq!(table.foreign_keys_to("users").count(), 1);
        assert_eq!(table.foreign_keys_to("roles").count(), 0);
    }

    #[test]
    fn test_column_type_name_prefers_wrapper() {
        let mut col = make_test_column("age");
        assert_eq!(col.type_name(), "Int32");
        col.nullable = true;
        col.null_wrapper = Some(NullWrapper::for_type(SemanticType::Int32));
        assert_eq!(col.type_name(), "NullInt32");
    }

    #[test]
    fn test_schema_graph_rejects_duplicates() {
        let users = Table::new("users", vec![make_test_column("id")], None, vec![]);
        let err = SchemaGraph::new(vec![users.clone(), users]).unwrap_err();
        assert!(matches!(err, GenError::Schema(_)));
    }

    #[test]
    fn test_schema_graph_lookups() {
        let users = Table::new("users", vec![make_test_column("id")], Some(make_pk(&["id"])), vec![]);
        let posts = Table::new(
            "posts",
            vec![make_test_column("id"), make_test_column("author_id")],
            Some(make_pk(&["id"])),
            vec![make_fk("posts", "author_id", "users")],
        );
        let graph = SchemaGraph::new(vec![users, posts]).unwrap();

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.tables()[0].name, "users");
        assert!(graph.get("posts").is_some());
        assert!(graph.get("comments").is_none());
        let referencing: Vec<_> = graph.referencing("users").iter().map(|t| t.name.as_str()).collect();
        assert_eq!(referencing, vec!["posts"]);
        assert_eq!(graph.entity_tables().count(), 2);
    }
}
