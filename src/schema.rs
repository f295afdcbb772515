//! Column schemas and the two pipeline variants.
//!
//! Report definitions never name dataset columns directly; they go through a
//! [`ColumnMap`], so one catalog layout serves both the static export
//! (`suicide_rates.csv`) and the interactive one (`master.csv`).

use crate::catalog::{interactive_reports, static_reports, ReportDefinition};
use crate::loader::MissingValues;
use serde::Deserialize;
use std::path::PathBuf;

/// What a column holds, which decides how it may be used in a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Free-form labels (country, age group, sex).
    Categorical,
    Year,
    /// The rate being averaged.
    Measure,
    /// Population or GDP style magnitudes.
    Quantity,
}

impl ColumnKind {
    pub fn is_numeric(&self) -> bool {
        !matches!(self, ColumnKind::Categorical)
    }
}

/// Dataset column key for every role a report can refer to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnMap {
    pub year: String,
    pub rate: String,
    pub country: String,
    pub age_group: String,
    pub gdp_per_capita: String,
    pub population: String,
    pub continent: String,
    pub sex: String,
    pub generation: String,
}

impl ColumnMap {
    /// Headers of the per-country export used by the static page.
    pub fn static_export() -> Self {
        Self {
            year: "year".into(),
            rate: "deathrateper100k".into(),
            country: "countryname".into(),
            age_group: "agegroup".into(),
            gdp_per_capita: "gdppercapita".into(),
            population: "population".into(),
            continent: "continent".into(),
            sex: "sex".into(),
            generation: "generation".into(),
        }
    }

    /// Headers of the `master.csv` export, after lowercasing.
    pub fn master_export() -> Self {
        Self {
            year: "year".into(),
            rate: "suicides/100k pop".into(),
            country: "country".into(),
            age_group: "age".into(),
            gdp_per_capita: "gdp_per_capita ($)".into(),
            population: "population".into(),
            continent: "continent".into(),
            sex: "sex".into(),
            generation: "generation".into(),
        }
    }

    pub fn fields(&self) -> [(ColumnKind, &str); 9] {
        [
            (ColumnKind::Year, self.year.as_str()),
            (ColumnKind::Measure, self.rate.as_str()),
            (ColumnKind::Categorical, self.country.as_str()),
            (ColumnKind::Categorical, self.age_group.as_str()),
            (ColumnKind::Quantity, self.gdp_per_capita.as_str()),
            (ColumnKind::Quantity, self.population.as_str()),
            (ColumnKind::Categorical, self.continent.as_str()),
            (ColumnKind::Categorical, self.sex.as_str()),
            (ColumnKind::Categorical, self.generation.as_str()),
        ]
    }

    /// Numeric columns a row needs to take part in every chart. The
    /// continent column is derived after filtering, so it is never required.
    pub fn required(&self) -> Vec<String> {
        self.fields()
            .iter()
            .filter(|(kind, _)| kind.is_numeric())
            .map(|(_, name)| name.to_string())
            .chain([self.country.clone()])
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// PNG files on disk, missing values kept, no row cap.
    #[default]
    Static,
    /// Inline SVG fragments, incomplete rows dropped, capped at 500 rows.
    Interactive,
}

impl Variant {
    pub fn columns(&self) -> ColumnMap {
        match self {
            Variant::Static => ColumnMap::static_export(),
            Variant::Interactive => ColumnMap::master_export(),
        }
    }

    pub fn reports(&self, columns: &ColumnMap) -> Vec<ReportDefinition> {
        match self {
            Variant::Static => static_reports(columns),
            Variant::Interactive => interactive_reports(columns),
        }
    }

    pub fn missing_values(&self, columns: &ColumnMap) -> MissingValues {
        match self {
            Variant::Static => MissingValues::Keep,
            Variant::Interactive => MissingValues::DropRequired(columns.required()),
        }
    }

    pub fn default_max_rows(&self) -> Option<usize> {
        match self {
            Variant::Static => None,
            Variant::Interactive => Some(500),
        }
    }

    pub fn default_data_path(&self) -> PathBuf {
        match self {
            Variant::Static => PathBuf::from("data/suicide_rates.csv"),
            Variant::Interactive => PathBuf::from("data/master.csv"),
        }
    }

    /// Static output lands next to the page's images; interactive output
    /// goes to stdout unless a directory is given.
    pub fn default_output_dir(&self) -> Option<PathBuf> {
        match self {
            Variant::Static => Some(PathBuf::from("static/images")),
            Variant::Interactive => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_columns_skip_continent() {
        let cols = ColumnMap::master_export();
        let required = cols.required();
        assert!(required.contains(&"suicides/100k pop".to_string()));
        assert!(required.contains(&"country".to_string()));
        assert!(!required.contains(&"continent".to_string()));
        assert!(!required.contains(&"sex".to_string()));
    }

    #[test]
    fn test_variant_defaults() {
        assert_eq!(Variant::Static.default_max_rows(), None);
        assert_eq!(Variant::Interactive.default_max_rows(), Some(500));
        assert_eq!(Variant::Static.missing_values(&Variant::Static.columns()), MissingValues::Keep);
        assert!(matches!(
            Variant::Interactive.missing_values(&Variant::Interactive.columns()),
            MissingValues::DropRequired(_)
        ));
        assert!(Variant::Interactive.default_output_dir().is_none());
    }

    #[test]
    fn test_each_variant_has_eight_reports() {
        for variant in [Variant::Static, Variant::Interactive] {
            assert_eq!(variant.reports(&variant.columns()).len(), 8);
        }
    }
}
