use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use thiserror::Error;

static IDENTIFIER: OnceLock<Regex> = OnceLock::new();

fn identifier_regex() -> &'static Regex {
    IDENTIFIER.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
    })
}

pub fn is_valid_identifier(name: &str) -> bool {
    identifier_regex().is_match(name)
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("table `{0}` is already registered")]
    DuplicateTable(String),
    #[error("table `{table}` declares column `{column}` more than once")]
    DuplicateColumn { table: String, column: String },
    #[error("`{0}` is not a valid identifier")]
    InvalidIdentifier(String),
    #[error("table `{0}` has no primary key")]
    MissingPrimaryKey(String),
    #[error("primary key column `{table}.{column}` cannot be nullable")]
    NullablePrimaryKey { table: String, column: String },
    #[error("enum column `{table}.{column}` has no allowed values")]
    EmptyEnum { table: String, column: String },
    #[error("`{table}.{column}` references unknown `{target}`")]
    UnknownReference {
        table: String,
        column: String,
        target: String,
    },
    #[error("`{table}.{column}` references `{target}`, which is neither a primary key nor unique")]
    NonKeyReference {
        table: String,
        column: String,
        target: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Text,
    Enum {
        name: &'static str,
        variants: &'static [&'static str],
    },
}

impl ColumnType {
    pub fn sql_name(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Text => "TEXT",
            ColumnType::Enum { .. } => "ENUM",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: &'static str,
    pub column: &'static str,
}

/// A single column declaration. Columns are non-null unless marked otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub ty: ColumnType,
    pub nullable: bool,
    pub unique: bool,
    pub primary_key: bool,
    pub non_empty: bool,
    pub references: Option<ForeignKey>,
}

impl ColumnDef {
    fn new(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            nullable: false,
            unique: false,
            primary_key: false,
            non_empty: false,
            references: None,
        }
    }

    pub fn integer(name: &'static str) -> Self {
        Self::new(name, ColumnType::Integer)
    }

    pub fn text(name: &'static str) -> Self {
        Self::new(name, ColumnType::Text)
    }

    pub fn enumeration(
        name: &'static str,
        type_name: &'static str,
        variants: &'static [&'static str],
    ) -> Self {
        Self::new(
            name,
            ColumnType::Enum {
                name: type_name,
                variants,
            },
        )
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn non_empty(mut self) -> Self {
        self.non_empty = true;
        self
    }

    pub fn references(mut self, table: &'static str, column: &'static str) -> Self {
        self.references = Some(ForeignKey { table, column });
        self
    }

    pub fn is_key(&self) -> bool {
        self.primary_key || self.unique
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: Vec<ColumnDef>,
}

impl TableDef {
    pub fn new(name: &'static str, columns: Vec<ColumnDef>) -> Self {
        Self { name, columns }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn primary_key(&self) -> Vec<&ColumnDef> {
        self.columns.iter().filter(|c| c.primary_key).collect()
    }

    pub fn foreign_keys(&self) -> impl Iterator<Item = (&ColumnDef, &ForeignKey)> {
        self.columns
            .iter()
            .filter_map(|c| c.references.as_ref().map(|fk| (c, fk)))
    }
}

/// A record type that maps to a persistent table with a primary key.
pub trait Entity {
    const TABLE: &'static str;

    fn columns() -> Vec<ColumnDef>;

    fn table_def() -> TableDef {
        TableDef::new(Self::TABLE, Self::columns())
    }
}

/// Many-to-one edge from a child column to the parent key it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub child_table: &'static str,
    pub child_column: &'static str,
    pub parent_table: &'static str,
    pub parent_column: &'static str,
    pub optional: bool,
}

/// Every declared table, in registration order.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    tables: Vec<TableDef>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<E: Entity>(&mut self) -> Result<(), SchemaError> {
        self.register_table(E::table_def())
    }

    pub fn register_table(&mut self, table: TableDef) -> Result<(), SchemaError> {
        if !is_valid_identifier(table.name) {
            return Err(SchemaError::InvalidIdentifier(table.name.to_string()));
        }
        if self.table(table.name).is_some() {
            return Err(SchemaError::DuplicateTable(table.name.to_string()));
        }

        let mut seen = HashSet::new();
        for column in &table.columns {
            if !is_valid_identifier(column.name) {
                return Err(SchemaError::InvalidIdentifier(format!(
                    "{}.{}",
                    table.name, column.name
                )));
            }
            if !seen.insert(column.name) {
                return Err(SchemaError::DuplicateColumn {
                    table: table.name.to_string(),
                    column: column.name.to_string(),
                });
            }
            if column.primary_key && column.nullable {
                return Err(SchemaError::NullablePrimaryKey {
                    table: table.name.to_string(),
                    column: column.name.to_string(),
                });
            }
            if let ColumnType::Enum { variants, .. } = &column.ty {
                if variants.is_empty() {
                    return Err(SchemaError::EmptyEnum {
                        table: table.name.to_string(),
                        column: column.name.to_string(),
                    });
                }
            }
        }

        if table.primary_key().is_empty() {
            return Err(SchemaError::MissingPrimaryKey(table.name.to_string()));
        }

        tracing::debug!(table = table.name, columns = table.columns.len(), "registered table");
        self.tables.push(table);
        Ok(())
    }

    /// Checks that every foreign key points at a key column of a registered table.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for table in &self.tables {
            for (column, fk) in table.foreign_keys() {
                let target = format!("{}.{}", fk.table, fk.column);
                let parent = self
                    .table(fk.table)
                    .and_then(|t| t.column(fk.column))
                    .ok_or_else(|| SchemaError::UnknownReference {
                        table: table.name.to_string(),
                        column: column.name.to_string(),
                        target: target.clone(),
                    })?;

                if !parent.is_key() {
                    return Err(SchemaError::NonKeyReference {
                        table: table.name.to_string(),
                        column: column.name.to_string(),
                        target,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn tables(&self) -> &[TableDef] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn relationships(&self) -> Vec<Relationship> {
        self.tables
            .iter()
            .flat_map(|table| {
                table.foreign_keys().map(move |(column, fk)| Relationship {
                    child_table: table.name,
                    child_column: column.name,
                    parent_table: fk.table,
                    parent_column: fk.column,
                    optional: column.nullable,
                })
            })
            .collect()
    }
}
