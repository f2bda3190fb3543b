use super::{to_dot, DiagramRenderer, OutputFormat, RenderError};
use crate::registry::SchemaRegistry;
use crate::settings::Diagram;
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::process::{Command, Stdio};

/// Lays out the DOT source with the Graphviz `dot` program.
pub struct GraphvizRenderer {
    format: OutputFormat,
    settings: Diagram,
}

impl GraphvizRenderer {
    pub fn new(format: OutputFormat, settings: Diagram) -> Self {
        Self { format, settings }
    }
}

impl DiagramRenderer for GraphvizRenderer {
    fn render(&self, schema: &SchemaRegistry, output: &Path) -> Result<(), RenderError> {
        let program = &self.settings.dot_binary;
        let source = to_dot(schema, &self.settings);

        tracing::debug!(%program, format = %self.format, "spawning graphviz");
        let mut child = Command::new(program)
            .arg(format!("-T{}", self.format))
            .arg("-o")
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RenderError::RendererUnavailable {
                program: program.clone(),
                source,
            })?;

        // dot may exit early on bad input; its status and stderr explain why.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(source.as_bytes()),
            None => Ok(()),
        };

        let result = child
            .wait_with_output()
            .map_err(|source| RenderError::RendererUnavailable {
                program: program.clone(),
                source,
            })?;

        if !result.status.success() {
            return Err(RenderError::RendererFailed {
                program: program.clone(),
                status: result.status,
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        match written {
            Err(e) if e.kind() != ErrorKind::BrokenPipe => Err(RenderError::Io {
                path: output.to_path_buf(),
                source: e,
            }),
            _ => Ok(()),
        }
    }
}
