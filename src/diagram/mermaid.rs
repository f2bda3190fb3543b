use super::{write_text, DiagramRenderer, RenderError};
use crate::registry::{ColumnDef, ColumnType, SchemaRegistry};
use std::fmt::Write;
use std::path::Path;

fn attribute(column: &ColumnDef) -> String {
    let mut keys = Vec::new();
    if column.primary_key {
        keys.push("PK");
    }
    if column.references.is_some() {
        keys.push("FK");
    }
    if column.unique {
        keys.push("UK");
    }

    let mut line = format!("{} {}", column.ty.sql_name(), column.name);
    if !keys.is_empty() {
        line.push(' ');
        line.push_str(&keys.join(", "));
    }
    if let ColumnType::Enum { variants, .. } = &column.ty {
        let _ = write!(line, " \"{}\"", variants.join(" | "));
    } else if column.nullable {
        line.push_str(" \"nullable\"");
    }
    line
}

pub fn to_mermaid(schema: &SchemaRegistry) -> String {
    let mut out = String::from("erDiagram\n");

    for table in schema.tables() {
        let _ = writeln!(out, "    {} {{", table.name);
        for column in &table.columns {
            let _ = writeln!(out, "        {}", attribute(column));
        }
        out.push_str("    }\n");
    }

    for rel in schema.relationships() {
        let parent = if rel.optional { "|o" } else { "||" };
        let _ = writeln!(
            out,
            "    {} {}--o{{ {} : \"{}\"",
            rel.parent_table, parent, rel.child_table, rel.child_column
        );
    }

    out
}

pub struct MermaidRenderer;

impl DiagramRenderer for MermaidRenderer {
    fn render(&self, schema: &SchemaRegistry, output: &Path) -> Result<(), RenderError> {
        write_text(output, &to_mermaid(schema))
    }
}
