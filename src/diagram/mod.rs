mod dot;
mod graphviz;
mod mermaid;
#[cfg(all(test, unix))]
pub(crate) mod testing;

pub use dot::{to_dot, DotRenderer};
pub use graphviz::GraphvizRenderer;
pub use mermaid::{to_mermaid, MermaidRenderer};

use crate::registry::{SchemaError, SchemaRegistry};
use crate::settings::Diagram;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use strum::Display;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no diagram format matches `{0}` (expected .png, .svg, .pdf, .dot, .gv, .mmd or .md)")]
    UnsupportedFormat(String),
    #[error("invalid schema: {0}")]
    Schema(#[from] SchemaError),
    #[error("failed to write {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not run `{program}`, is Graphviz installed?")]
    RendererUnavailable {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("`{program}` exited with {status}: {stderr}")]
    RendererFailed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Svg,
    Pdf,
    Dot,
    Mermaid,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self, RenderError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("png") => Ok(OutputFormat::Png),
            Some("svg") => Ok(OutputFormat::Svg),
            Some("pdf") => Ok(OutputFormat::Pdf),
            Some("dot") | Some("gv") => Ok(OutputFormat::Dot),
            Some("mmd") | Some("md") => Ok(OutputFormat::Mermaid),
            _ => Err(RenderError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Formats that need Graphviz to lay out the graph.
    pub fn is_image(self) -> bool {
        matches!(
            self,
            OutputFormat::Png | OutputFormat::Svg | OutputFormat::Pdf
        )
    }
}

pub trait DiagramRenderer {
    fn render(&self, schema: &SchemaRegistry, output: &Path) -> Result<(), RenderError>;
}

pub(crate) fn write_text(output: &Path, contents: &str) -> Result<(), RenderError> {
    fs::write(output, contents).map_err(|source| RenderError::Io {
        path: output.to_path_buf(),
        source,
    })
}

/// Draws `schema` to `output`, picking the format from the file extension.
///
/// The schema is validated first. Nothing is retried and a failed render may
/// leave a partial file behind.
pub fn render_er(
    schema: &SchemaRegistry,
    output: &Path,
    settings: &Diagram,
) -> Result<OutputFormat, RenderError> {
    let format = OutputFormat::from_path(output)?;
    schema.validate()?;

    tracing::info!(
        path = %output.display(),
        %format,
        tables = schema.tables().len(),
        "rendering diagram"
    );

    let renderer: Box<dyn DiagramRenderer> = match format {
        OutputFormat::Dot => Box::new(DotRenderer::new(settings.clone())),
        OutputFormat::Mermaid => Box::new(MermaidRenderer),
        OutputFormat::Png | OutputFormat::Svg | OutputFormat::Pdf => {
            Box::new(GraphvizRenderer::new(format, settings.clone()))
        }
    };
    renderer.render(schema, output)?;

    Ok(format)
}
