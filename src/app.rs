use crate::db;
use crate::diagram::{render_er, OutputFormat};
use crate::models::declare_schema;
use crate::settings::Settings;
use crate::utils::{
    log_db_ready, log_render_failure, log_render_start, log_render_success, log_sample_seeded,
    log_schema, log_schema_drift,
};
use anyhow::Result;
use std::path::Path;

/// One full pass: declare the schema, prepare the database, draw the diagram.
///
/// A render failure is reported on the console and then returned to the caller.
pub fn run(settings: &Settings) -> Result<OutputFormat> {
    let schema = declare_schema()?;
    log_schema(&schema);

    let mut conn = db::open(&settings.database.url)?;
    log_db_ready(&settings.database.url);
    log_schema_drift(&db::schema_drift(&mut conn, &schema)?);

    if settings.database.seed_sample {
        let sample = db::seed_sample(&mut conn)?;
        log_sample_seeded(&sample);
    }

    let output = Path::new(&settings.diagram.output_path);
    log_render_start(output, OutputFormat::from_path(output).ok());

    match render_er(&schema, output, &settings.diagram) {
        Ok(format) => {
            log_render_success(output);
            Ok(format)
        }
        Err(e) => {
            log_render_failure(&e);
            Err(e.into())
        }
    }
}
