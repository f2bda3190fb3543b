use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

static SETTINGS: OnceLock<Settings> = OnceLock::new();

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    pub diagram: Diagram,
    pub database: Database,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagram {
    pub output_path: String,
    pub dot_binary: String,
    pub rankdir: String,
    pub font: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    pub url: String,
    pub seed_sample: bool,
}

impl Default for Diagram {
    fn default() -> Self {
        Self {
            output_path: "diagram.png".to_string(),
            dot_binary: "dot".to_string(),
            rankdir: "LR".to_string(),
            font: "Helvetica".to_string(),
            title: None,
        }
    }
}

impl Default for Database {
    fn default() -> Self {
        Self {
            url: ":memory:".to_string(),
            seed_sample: true,
        }
    }
}

impl Settings {
    pub fn load() -> &'static Settings {
        SETTINGS.get_or_init(Self::load_from_files)
    }

    fn load_from_files() -> Settings {
        let default_path = Path::new("settings.default.ron");
        let override_path = Path::new("settings.ron");

        let mut settings = if default_path.exists() {
            Self::read(default_path).unwrap_or_default()
        } else {
            Settings::default()
        };

        if override_path.exists() {
            if let Some(overrides) = Self::read(override_path) {
                settings = overrides;
            }
        }

        settings
    }

    fn read(path: &Path) -> Option<Settings> {
        let content = fs::read_to_string(path).ok()?;
        match ron::from_str(&content) {
            Ok(settings) => Some(settings),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable settings file");
                None
            }
        }
    }
}

pub fn settings() -> &'static Settings {
    Settings::load()
}
