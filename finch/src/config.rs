use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use lectern::error::{Chainable, Error, Result};
use lectern::pipeline::MarkupRenderer;
use lectern::Capabilities;

/// Page settings, optionally read from a `config.toml`. Flags override
/// whatever is configured here.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub title: String,
    pub diagram_marker: String,
    pub highlight: bool,
    pub tables: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            title: "Untitled".into(),
            diagram_marker: "mermaid".into(),
            highlight: true,
            tables: true,
        }
    }
}

impl Settings {
    pub fn read(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).chain(lectern::error! {
            "failed to read config",
            "path" => path.display(),
        })?;

        toml::from_str(&raw)
            .map_err(Error::from_std)
            .chain(lectern::error! {
                "failed to parse config",
                "path" => path.display(),
            })
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            markup: Some(MarkupRenderer::default()),
            highlight: self.highlight,
            tables: self.tables,
            diagram_marker: self.diagram_marker.clone(),
            diagrammer: None,
            typesetter: None,
        }
    }
}
