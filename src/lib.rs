// Library exports for rate-report

pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod context;
pub mod continent;
pub mod data;
pub mod error;
pub mod filter;
pub mod graph;
pub mod loader;
pub mod palette;
pub mod render;
pub mod schema;
pub mod template;

pub use catalog::{build_catalog, Artifact, Catalog, ChartKind, ReportDefinition};
pub use config::ReportConfig;
pub use context::ReportContext;
pub use error::{Diagnostic, ReportError, ReportResult};
pub use render::{ArtifactOutput, OutputTarget, Renderer};
pub use schema::{ColumnMap, Variant};

use palette::PaletteName;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub enum OutputFormat {
    #[serde(rename = "png")]
    #[default]
    Png,
    #[serde(rename = "svg")]
    Svg,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RenderOptions {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default, rename = "type")]
    pub format: OutputFormat,
    #[serde(default)]
    pub palette: PaletteName,
}

fn default_width() -> u32 { 1200 }
fn default_height() -> u32 { 600 }

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            format: OutputFormat::Png,
            palette: PaletteName::default(),
        }
    }
}
