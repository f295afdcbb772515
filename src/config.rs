//! `rate-report.toml` configuration.
//!
//! ```toml
//! variant = "static"
//! data = ["data/suicide_rates.csv"]
//! output_dir = "static/images"
//! max_rows = 0          # 0 disables the row cap
//! seed = 42
//!
//! [render]
//! width = 1200
//! height = 600
//! type = "png"
//!
//! [[report]]
//! key = "latest_ages"
//! kind = "pie"
//! group_by = ["agegroup"]
//! measure = "deathrateper100k"
//! filter = "year == max(year)"
//! title = "Suicide Rates by Age Group ($max_year)"
//! ```
//!
//! Anything left out falls back to the variant's defaults.

use crate::catalog::ReportDefinition;
use crate::error::{ReportError, ReportResult};
use crate::render::OutputTarget;
use crate::schema::{ColumnMap, Variant};
use crate::RenderOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub variant: Variant,
    #[serde(default)]
    pub data: Vec<PathBuf>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub max_rows: Option<usize>,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub render: RenderOptions,
    #[serde(default)]
    pub columns: Option<ColumnMap>,
    #[serde(default, rename = "report")]
    pub reports: Vec<ReportDefinition>,
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self::for_variant(Variant::default())
    }
}

impl ReportConfig {
    pub fn for_variant(variant: Variant) -> Self {
        Self {
            variant,
            data: Vec::new(),
            output_dir: None,
            max_rows: None,
            seed: DEFAULT_SEED,
            render: RenderOptions::default(),
            columns: None,
            reports: Vec::new(),
        }
    }

    pub fn from_file(path: &Path) -> ReportResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ReportError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> ReportResult<Self> {
        toml::from_str(text).map_err(|e| ReportError::Config(e.to_string()))
    }

    pub fn data_paths(&self) -> Vec<PathBuf> {
        if self.data.is_empty() {
            vec![self.variant.default_data_path()]
        } else {
            self.data.clone()
        }
    }

    /// Configured directory, else the variant's default.
    pub fn output_dir(&self) -> Option<PathBuf> {
        self.output_dir
            .clone()
            .or_else(|| self.variant.default_output_dir())
    }

    /// Effective row cap. An explicit `0` turns capping off.
    pub fn row_cap(&self) -> Option<usize> {
        match self.max_rows {
            Some(0) => None,
            Some(cap) => Some(cap),
            None => self.variant.default_max_rows(),
        }
    }

    pub fn columns(&self) -> ColumnMap {
        self.columns
            .clone()
            .unwrap_or_else(|| self.variant.columns())
    }

    /// Configured `[[report]]` entries, else the variant's catalog.
    pub fn reports(&self) -> Vec<ReportDefinition> {
        if self.reports.is_empty() {
            self.variant.reports(&self.columns())
        } else {
            self.reports.clone()
        }
    }

    /// Static output is always written to files; interactive output is
    /// kept inline as SVG.
    pub fn output_target(&self) -> OutputTarget {
        match (self.variant, self.output_dir()) {
            (Variant::Static, dir) => OutputTarget::Files {
                dir: dir.unwrap_or_else(|| PathBuf::from(".")),
                format: self.render.format,
            },
            (Variant::Interactive, _) => OutputTarget::Fragments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::RowFilter;
    use crate::OutputFormat;

    #[test]
    fn test_empty_config_uses_static_defaults() {
        let config = ReportConfig::from_toml_str("").unwrap();
        assert_eq!(config, ReportConfig::default());
        assert_eq!(config.seed, 42);
        assert_eq!(config.row_cap(), None);
        assert_eq!(config.data_paths(), vec![PathBuf::from("data/suicide_rates.csv")]);
        assert_eq!(config.reports().len(), 8);
        assert_eq!(
            config.output_target(),
            OutputTarget::Files {
                dir: PathBuf::from("static/images"),
                format: OutputFormat::Png
            }
        );
    }

    #[test]
    fn test_interactive_defaults() {
        let config = ReportConfig::from_toml_str(r#"variant = "interactive""#).unwrap();
        assert_eq!(config.row_cap(), Some(500));
        assert_eq!(config.columns(), ColumnMap::master_export());
        assert_eq!(config.output_target(), OutputTarget::Fragments);
    }

    #[test]
    fn test_zero_disables_row_cap() {
        let config = ReportConfig::from_toml_str("variant = \"interactive\"\nmax_rows = 0").unwrap();
        assert_eq!(config.row_cap(), None);
        let config = ReportConfig::from_toml_str("max_rows = 100").unwrap();
        assert_eq!(config.row_cap(), Some(100));
    }

    #[test]
    fn test_render_section() {
        let config = ReportConfig::from_toml_str(
            r#"
            [render]
            width = 640
            type = "svg"
            palette = "category10"
            "#,
        )
        .unwrap();
        assert_eq!(config.render.width, 640);
        assert_eq!(config.render.height, 600);
        assert_eq!(config.render.format, OutputFormat::Svg);
    }

    #[test]
    fn test_custom_reports() {
        let config = ReportConfig::from_toml_str(
            r#"
            data = ["a.csv", "b.csv"]

            [[report]]
            key = "by_country"
            kind = "bar"
            group_by = ["countryname"]
            measure = "deathrateper100k"
            order = "descending"
            limit = 5
            filter = 'countryname in ["Japan", "Germany"]'
            title = "Top countries"
            "#,
        )
        .unwrap();
        assert_eq!(config.data_paths().len(), 2);
        let reports = config.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].limit, Some(5));
        assert!(matches!(reports[0].filter, Some(RowFilter::In { .. })));
    }

    #[test]
    fn test_bad_filter_is_config_error() {
        let err = ReportConfig::from_toml_str(
            r#"
            [[report]]
            key = "x"
            kind = "bar"
            measure = "rate"
            filter = "year > 2000"
            title = "x"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ReportError::Config(_)));
    }

    #[test]
    fn test_missing_file() {
        assert!(ReportConfig::from_file(Path::new("no/such/rate-report.toml")).is_err());
    }
}
