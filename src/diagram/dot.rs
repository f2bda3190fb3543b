use super::{write_text, DiagramRenderer, RenderError};
use crate::registry::{ColumnDef, ColumnType, SchemaRegistry, TableDef};
use crate::settings::Diagram;
use std::fmt::Write;
use std::path::Path;

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Escapes a value placed inside a double-quoted DOT attribute.
fn escape_quoted(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn column_type(column: &ColumnDef) -> String {
    match &column.ty {
        ColumnType::Enum { name, variants } => {
            format!("ENUM {} ({})", name, variants.join(", "))
        }
        other => other.sql_name().to_string(),
    }
}

fn column_row(column: &ColumnDef) -> String {
    let name = escape_html(column.name);
    let name = if column.primary_key {
        format!("<U>{name}</U>")
    } else if column.nullable {
        format!("<I>{name}</I>")
    } else {
        name
    };

    let mut notes = Vec::new();
    if !column.nullable && !column.primary_key {
        notes.push("NOT NULL");
    }
    if column.unique {
        notes.push("UNIQUE");
    }
    if column.non_empty {
        notes.push("NON-EMPTY");
    }

    let mut detail = format!("[{}]", escape_html(&column_type(column)));
    if !notes.is_empty() {
        detail.push(' ');
        detail.push_str(&notes.join(", "));
    }

    format!(
        "<TR><TD ALIGN=\"LEFT\">{name} <FONT COLOR=\"gray40\">{detail}</FONT></TD></TR>"
    )
}

fn table_node(table: &TableDef) -> String {
    let mut label = String::from(
        "<TABLE BORDER=\"0\" CELLBORDER=\"1\" CELLSPACING=\"0\" CELLPADDING=\"4\">",
    );
    let _ = write!(
        label,
        "<TR><TD BGCOLOR=\"#DDDDDD\"><B><FONT POINT-SIZE=\"16\">{}</FONT></B></TD></TR>",
        escape_html(table.name)
    );
    for column in &table.columns {
        label.push_str(&column_row(column));
    }
    label.push_str("</TABLE>");

    format!("    \"{}\" [label=<{}>];\n", table.name, label)
}

/// Graphviz source for the schema: one HTML-table node per table and one
/// dashed edge per foreign key, parent side first.
pub fn to_dot(schema: &SchemaRegistry, settings: &Diagram) -> String {
    let mut out = String::from("graph {\n");
    let _ = write!(
        out,
        "    graph [rankdir=\"{}\", splines=true, overlap=false, nodesep=0.6, fontname=\"{}\"",
        escape_quoted(&settings.rankdir),
        escape_quoted(&settings.font)
    );
    if let Some(title) = &settings.title {
        let _ = write!(out, ", labelloc=t, label=<<B>{}</B>>", escape_html(title));
    }
    out.push_str("];\n");
    let _ = writeln!(
        out,
        "    node [shape=plaintext, fontname=\"{}\"];",
        escape_quoted(&settings.font)
    );
    out.push_str("    edge [color=\"gray50\", minlen=2, style=dashed];\n\n");

    for table in schema.tables() {
        out.push_str(&table_node(table));
    }
    out.push('\n');

    for rel in schema.relationships() {
        let parent_card = if rel.optional { "0..1" } else { "1" };
        let _ = writeln!(
            out,
            "    \"{}\" -- \"{}\" [taillabel=\"{}\", headlabel=\"0..N\", label=\"{}\"];",
            rel.parent_table, rel.child_table, parent_card, rel.child_column
        );
    }

    out.push_str("}\n");
    out
}

pub struct DotRenderer {
    settings: Diagram,
}

impl DotRenderer {
    pub fn new(settings: Diagram) -> Self {
        Self { settings }
    }
}

impl DiagramRenderer for DotRenderer {
    fn render(&self, schema: &SchemaRegistry, output: &Path) -> Result<(), RenderError> {
        write_text(output, &to_dot(schema, &self.settings))
    }
}
