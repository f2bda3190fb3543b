use console::{measure_text_width, Style};
use std::path::Path;

use crate::db::{SampleRows, SchemaDrift};
use crate::diagram::{OutputFormat, RenderError};
use crate::registry::SchemaRegistry;

pub const TREE_BRANCH: char = '\u{251C}';
pub const TREE_END: char = '\u{2514}';
pub const TREE_HORIZ: char = '\u{2500}';

const TREE_PREFIX_WIDTH: usize = 4;
const VALUE_COLUMN: usize = 20;

fn tree_branch() -> String {
    dim()
        .apply_to(format!("{}{}{} ", TREE_BRANCH, TREE_HORIZ, TREE_HORIZ))
        .to_string()
}

fn tree_end() -> String {
    dim()
        .apply_to(format!("{}{}{} ", TREE_END, TREE_HORIZ, TREE_HORIZ))
        .to_string()
}

fn tree_prefix(is_last: bool) -> String {
    if is_last {
        tree_end()
    } else {
        tree_branch()
    }
}

pub fn dim() -> Style {
    Style::new().dim()
}

fn cyan() -> Style {
    Style::new().cyan()
}

fn green() -> Style {
    Style::new().green()
}

fn red() -> Style {
    Style::new().red()
}

fn yellow() -> Style {
    Style::new().yellow()
}

fn bold() -> Style {
    Style::new().bold()
}

fn schema_prefix() -> String {
    cyan().apply_to("[SCHEMA]").to_string()
}

fn db_prefix() -> String {
    Style::new().blue().apply_to("[DB]").to_string()
}

fn render_prefix() -> String {
    Style::new().magenta().apply_to("[RENDER]").to_string()
}

pub fn pad_label(label: &str, depth: usize) -> String {
    let prefix_width = depth * TREE_PREFIX_WIDTH;
    let target_width = VALUE_COLUMN.saturating_sub(prefix_width);
    let current_width = measure_text_width(label);
    if current_width < target_width {
        format!("{}{}", label, " ".repeat(target_width - current_width))
    } else {
        format!("{} ", label)
    }
}

pub fn log_schema(schema: &SchemaRegistry) {
    println!(
        "{} declared {} tables, {} relationships",
        schema_prefix(),
        bold().apply_to(schema.tables().len()),
        bold().apply_to(schema.relationships().len()),
    );

    let tables = schema.tables();
    for (i, table) in tables.iter().enumerate() {
        let keys: Vec<_> = table.primary_key().iter().map(|c| c.name).collect();
        println!(
            "{}{} {} columns, key ({})",
            tree_prefix(i + 1 == tables.len()),
            pad_label(table.name, 1),
            table.columns.len(),
            dim().apply_to(keys.join(", ")),
        );
    }
}

pub fn log_db_ready(database_url: &str) {
    println!(
        "{} database ready at {}",
        db_prefix(),
        cyan().apply_to(database_url)
    );
}

pub fn log_schema_drift(drift: &[SchemaDrift]) {
    if drift.is_empty() {
        println!("{} schema matches declaration", db_prefix());
        return;
    }

    println!(
        "{} {} differences from declaration",
        db_prefix(),
        yellow().apply_to(drift.len())
    );
    for (i, item) in drift.iter().enumerate() {
        println!(
            "{}{}",
            tree_prefix(i + 1 == drift.len()),
            dim().apply_to(format!("{item:?}"))
        );
    }
}

pub fn log_sample_seeded(sample: &SampleRows) {
    println!("{} seeded sample rows", db_prefix());
    println!(
        "{}{} #{} {}",
        tree_branch(),
        pad_label("user", 1),
        sample.user.id,
        dim().apply_to(&sample.user.username)
    );
    println!("{}{} #{}", tree_branch(), pad_label("post", 1), sample.post.id);
    println!(
        "{}{} #{} {}",
        tree_branch(),
        pad_label("comment", 1),
        sample.comment.id,
        dim().apply_to(&sample.comment.comment_text)
    );
    println!(
        "{}{} #{} {}",
        tree_end(),
        pad_label("media", 1),
        sample.media.id,
        dim().apply_to(sample.media.media_type)
    );
}

pub fn log_render_start(output: &Path, format: Option<OutputFormat>) {
    let format = format
        .map(|f| f.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    println!(
        "{} drawing {} ({})...",
        render_prefix(),
        cyan().apply_to(output.display()),
        dim().apply_to(format)
    );
}

pub fn log_render_success(output: &Path) {
    println!(
        "{} {} check the file {}",
        render_prefix(),
        green().apply_to("success!"),
        bold().apply_to(output.display())
    );
}

pub fn log_render_failure(error: &RenderError) {
    println!(
        "{} {}",
        render_prefix(),
        red().apply_to("something went wrong while generating the diagram")
    );
    println!("{}{}", tree_end(), dim().apply_to(error));
}
