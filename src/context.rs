use crate::catalog::{build_catalog, Catalog, ReportDefinition};
use crate::config::ReportConfig;
use crate::continent::ContinentLookup;
use crate::data::Dataset;
use crate::error::ReportResult;
use crate::loader::{load, LoadOptions};
use crate::render::Renderer;
use tracing::info;

/// Process-wide state: the loaded dataset, the report definitions and the
/// renderer. Built once at startup, then only read.
pub struct ReportContext {
    dataset: Dataset,
    reports: Vec<ReportDefinition>,
    renderer: Renderer,
}

impl ReportContext {
    /// Rejects malformed definitions up front so they fail startup rather
    /// than each catalog build.
    pub fn new(dataset: Dataset, reports: Vec<ReportDefinition>, renderer: Renderer) -> ReportResult<Self> {
        for report in &reports {
            report.validate()?;
        }
        Ok(Self {
            dataset,
            reports,
            renderer,
        })
    }

    /// Load the dataset described by `config`. A missing or unreadable
    /// source aborts here.
    pub fn load(config: &ReportConfig, lookup: &dyn ContinentLookup) -> ReportResult<Self> {
        let columns = config.columns();
        let options = LoadOptions {
            missing: config.variant.missing_values(&columns),
            max_rows: config.row_cap(),
            seed: config.seed,
            country_column: columns.country.clone(),
            continent_column: columns.continent.clone(),
            lookup,
        };
        let dataset = load(&config.data_paths(), &options)?;

        // Definitions are checked before the renderer creates the output directory.
        let reports = config.reports();
        for report in &reports {
            report.validate()?;
        }
        let renderer = Renderer::new(&config.render, config.output_target())?;

        info!(
            variant = ?config.variant,
            rows = dataset.len(),
            reports = reports.len(),
            "report context ready"
        );
        Ok(Self {
            dataset,
            reports,
            renderer,
        })
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn reports(&self) -> &[ReportDefinition] {
        &self.reports
    }

    /// Recompute and re-render every report.
    pub fn build_catalog(&self) -> Catalog {
        build_catalog(&self.dataset, &self.reports, &self.renderer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ChartKind;
    use crate::continent::CountryTable;
    use crate::error::ReportError;
    use crate::render::OutputTarget;
    use crate::RenderOptions;

    #[test]
    fn test_new_rejects_invalid_report() {
        let dataset = Dataset::new(vec!["rate".into()], vec![vec!["1".into()]]);
        let renderer = Renderer::new(&RenderOptions::default(), OutputTarget::Fragments).unwrap();
        let report = ReportDefinition::new("pie", ChartKind::Pie, "rate", "Pie");
        assert!(ReportContext::new(dataset, vec![report], renderer).is_err());
    }

    #[test]
    fn test_build_catalog_is_repeatable() {
        let dataset = Dataset::new(
            vec!["rate".into()],
            (1..=30).map(|i| vec![i.to_string()]).collect(),
        );
        let renderer = Renderer::new(&RenderOptions::default(), OutputTarget::Fragments).unwrap();
        let report = ReportDefinition::new("hist", ChartKind::Histogram, "rate", "Rates");
        let context = ReportContext::new(dataset, vec![report], renderer).unwrap();

        let first = context.build_catalog();
        assert_eq!(first.keys(), vec!["hist"]);
        assert_eq!(first, context.build_catalog());
    }

    #[test]
    fn test_load_rejects_invalid_report_before_creating_output() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("rates.csv");
        std::fs::write(&data, "rate\n1\n2\n").unwrap();
        let images = dir.path().join("images");

        let mut config = ReportConfig::for_variant(crate::Variant::Static);
        config.data = vec![data];
        config.output_dir = Some(images.clone());
        config.reports = vec![ReportDefinition::new("pie", ChartKind::Pie, "rate", "Pie")];

        let err = ReportContext::load(&config, &CountryTable::builtin()).err().unwrap();
        assert!(matches!(err, ReportError::Config(_)));
        assert!(!images.exists());
    }
}
