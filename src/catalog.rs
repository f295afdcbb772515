//! Report definitions and the catalog builder.
//!
//! A catalog is built by walking the definitions in order: validate the
//! columns a report needs, aggregate, render. A report that fails any step is
//! left out with a [`Diagnostic`]; the rest of the catalog is still built.

use crate::aggregate::{
    aggregate, distribution, histogram, points, AggregateSpec, Order, Pivot, RowFilter, Series,
};
use crate::data::{normalize_column_name, Dataset};
use crate::error::{Diagnostic, ReportError, ReportResult};
use crate::graph::{ChartData, ChartStyle};
use crate::render::{ArtifactOutput, Renderer};
use crate::schema::ColumnMap;
use crate::template::{expand_title, TitleVars};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::Path;
use tracing::{info, warn};

pub const DEFAULT_BINS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
    StackedBar,
    Scatter,
    Bubble,
    Box,
    Histogram,
}

/// One chart on the page.
///
/// `group_by` means different things per kind: the category axis for bar,
/// pie and box charts; `[x, series]` for line and stacked bar charts; the x
/// column for scatter and bubble charts. Histograms ignore it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReportDefinition {
    pub key: String,
    pub kind: ChartKind,
    #[serde(default)]
    pub group_by: Vec<String>,
    pub measure: String,
    #[serde(default)]
    pub filter: Option<RowFilter>,
    #[serde(default)]
    pub order: Order,
    #[serde(default)]
    pub limit: Option<usize>,
    /// Bubble size column.
    #[serde(default)]
    pub size: Option<String>,
    /// Column splitting points into coloured groups.
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default = "default_bins")]
    pub bins: usize,
    #[serde(default)]
    pub value_labels: bool,
    /// Catalog title; may reference `$max_<column>` when filtered to a maximum.
    pub title: String,
    /// Title drawn on the chart itself, if it differs from the catalog title.
    #[serde(default)]
    pub chart_title: Option<String>,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub x_label: Option<String>,
    #[serde(default)]
    pub y_label: Option<String>,
}

fn default_bins() -> usize {
    DEFAULT_BINS
}

impl ReportDefinition {
    pub fn new(key: &str, kind: ChartKind, measure: &str, title: &str) -> Self {
        Self {
            key: key.to_string(),
            kind,
            group_by: Vec::new(),
            measure: measure.to_string(),
            filter: None,
            order: Order::Natural,
            limit: None,
            size: None,
            color: None,
            bins: DEFAULT_BINS,
            value_labels: false,
            title: title.to_string(),
            chart_title: None,
            caption: String::new(),
            x_label: None,
            y_label: None,
        }
    }

    /// Every column this report reads, in first-use order.
    pub fn required_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        let candidates = self
            .group_by
            .iter()
            .map(String::as_str)
            .chain([self.measure.as_str()])
            .chain(self.filter.as_ref().map(RowFilter::column))
            .chain(self.size.as_deref())
            .chain(self.color.as_deref());
        for column in candidates {
            let column = normalize_column_name(column);
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
        columns
    }

    /// Check that the definition is well formed for its chart kind.
    pub fn validate(&self) -> ReportResult<()> {
        let keys = self.group_by.len();
        let shape_ok = match self.kind {
            ChartKind::Bar => keys >= 1,
            ChartKind::Line => keys == 1 || keys == 2,
            ChartKind::StackedBar => keys == 2,
            ChartKind::Pie | ChartKind::Scatter | ChartKind::Bubble | ChartKind::Box => keys == 1,
            ChartKind::Histogram => true,
        };
        if !shape_ok {
            return Err(ReportError::Config(format!(
                "report '{}': {:?} chart cannot use {} group_by column(s)",
                self.key, self.kind, keys
            )));
        }
        if self.kind == ChartKind::Bubble && self.size.is_none() {
            return Err(ReportError::Config(format!(
                "report '{}': bubble chart needs a size column",
                self.key
            )));
        }
        if self.kind == ChartKind::Histogram && self.bins == 0 {
            return Err(ReportError::Config(format!(
                "report '{}': histogram needs at least one bin",
                self.key
            )));
        }
        if self.key.is_empty() || self.key.contains(['/', '\\']) {
            return Err(ReportError::Config(format!("invalid report key '{}'", self.key)));
        }
        Ok(())
    }

    fn check_columns(&self, dataset: &Dataset) -> ReportResult<()> {
        match self.required_columns().into_iter().find(|c| !dataset.has_column(c)) {
            Some(column) => Err(ReportError::missing_column(column)),
            None => Ok(()),
        }
    }

    /// Apply the row filter and collect the title variables it resolves.
    fn prepare<'a>(&self, dataset: &'a Dataset) -> ReportResult<(Cow<'a, Dataset>, TitleVars)> {
        let mut vars = TitleVars::new();
        let Some(filter) = &self.filter else {
            return Ok((Cow::Borrowed(dataset), vars));
        };

        let (subset, resolved) = filter.apply(dataset)?;
        if subset.is_empty() {
            return Err(ReportError::empty(format!(
                "filter on '{}' matched no rows",
                filter.column()
            )));
        }
        if let Some(value) = resolved {
            vars.set_max(filter.column(), value);
        }
        Ok((Cow::Owned(subset), vars))
    }

    fn chart_data(&self, dataset: &Dataset) -> ReportResult<ChartData> {
        let grouped = || {
            let spec = AggregateSpec {
                group_by: self.group_by.clone(),
                measure: self.measure.clone(),
                filter: None,
                order: self.order,
                limit: self.limit,
            };
            aggregate(dataset, &spec)
        };
        let first_key = self.group_by.first().map(String::as_str).unwrap_or_default();

        let data = match self.kind {
            ChartKind::Bar => {
                let (categories, values) = grouped()?.labels_and_means();
                ChartData::Bar { categories, values }
            }
            ChartKind::Pie => {
                let (categories, values) = grouped()?.labels_and_means();
                ChartData::Pie { categories, values }
            }
            ChartKind::Line if self.group_by.len() == 1 => {
                let (categories, values) = grouped()?.labels_and_means();
                ChartData::Line(Pivot {
                    categories,
                    series: vec![Series {
                        name: self.y_label.clone().unwrap_or_else(|| self.measure.clone()),
                        values: values.into_iter().map(Some).collect(),
                    }],
                })
            }
            ChartKind::Line => ChartData::Line(grouped()?.pivot()?),
            ChartKind::StackedBar => ChartData::StackedBar(grouped()?.pivot()?),
            ChartKind::Scatter => ChartData::Scatter(points(
                dataset,
                first_key,
                &self.measure,
                None,
                self.color.as_deref(),
            )?),
            ChartKind::Bubble => ChartData::Bubble(points(
                dataset,
                first_key,
                &self.measure,
                self.size.as_deref(),
                self.color.as_deref(),
            )?),
            ChartKind::Box => ChartData::Box(distribution(dataset, first_key, &self.measure)?),
            ChartKind::Histogram => ChartData::Histogram(histogram(dataset, &self.measure, self.bins)?),
        };
        Ok(data)
    }
}

/// A rendered report, ready for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Artifact {
    pub key: String,
    pub title: String,
    pub caption: String,
    pub kind: ChartKind,
    pub output: ArtifactOutput,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Catalog {
    pub artifacts: Vec<Artifact>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Catalog {
    /// `(key, title, caption, output)` per rendered report, in definition order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &str, &ArtifactOutput)> {
        self.artifacts
            .iter()
            .map(|a| (a.key.as_str(), a.title.as_str(), a.caption.as_str(), &a.output))
    }

    pub fn keys(&self) -> Vec<&str> {
        self.artifacts.iter().map(|a| a.key.as_str()).collect()
    }

    pub fn to_json(&self) -> ReportResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ReportError::Render(format!("failed to serialize catalog: {e}")))
    }

    pub fn write_manifest(&self, path: &Path) -> ReportResult<()> {
        std::fs::write(path, self.to_json()?)
            .map_err(|e| ReportError::Render(format!("failed to write {}: {}", path.display(), e)))
    }
}

/// Render every report in order. Failures skip only the report at fault.
pub fn build_catalog(dataset: &Dataset, reports: &[ReportDefinition], renderer: &Renderer) -> Catalog {
    let mut catalog = Catalog::default();

    for report in reports {
        match build_artifact(dataset, report, renderer) {
            Ok(artifact) => {
                info!(key = %report.key, "rendered report");
                catalog.artifacts.push(artifact);
            }
            Err(err) => {
                warn!(key = %report.key, error = %err, "skipping report");
                catalog.diagnostics.push(Diagnostic::new(report.key.as_str(), &err));
            }
        }
    }

    info!(
        rendered = catalog.artifacts.len(),
        skipped = catalog.diagnostics.len(),
        "catalog built"
    );
    catalog
}

fn build_artifact(dataset: &Dataset, report: &ReportDefinition, renderer: &Renderer) -> ReportResult<Artifact> {
    report.check_columns(dataset)?;
    let (data, vars) = report.prepare(dataset)?;
    let chart = report.chart_data(&data)?;

    let title = expand_title(&report.title, &vars)?;
    let chart_title = match &report.chart_title {
        Some(t) => expand_title(t, &vars)?,
        None => title.clone(),
    };
    let style = ChartStyle {
        title: chart_title,
        x_label: report.x_label.clone(),
        y_label: report.y_label.clone(),
        value_labels: report.value_labels,
        palette: renderer.palette().clone(),
    };
    let output = renderer.render(&report.key, &chart, &style)?;

    Ok(Artifact {
        key: report.key.clone(),
        title,
        caption: report.caption.clone(),
        kind: report.kind,
        output,
    })
}

/// The eight charts of the static page, over the per-country export.
pub fn static_reports(cols: &ColumnMap) -> Vec<ReportDefinition> {
    let rate_axis = Some("Suicide Rate per 100k".to_string());

    vec![
        ReportDefinition {
            group_by: vec![cols.year.clone()],
            caption: "The average global suicide rate has been a critical metric for understanding mental health trends over time. A bar chart depicting the average suicide rate by year can provide a clear visual representation of how these rates have fluctuated.".into(),
            x_label: Some("Year".into()),
            y_label: Some("Death Rate per 100k".into()),
            ..ReportDefinition::new("bar_chart", ChartKind::Bar, &cols.rate, "Average Suicide Rate by Year")
        },
        ReportDefinition {
            group_by: vec![cols.year.clone(), cols.country.clone()],
            filter: Some(RowFilter::In {
                column: cols.country.clone(),
                values: vec![
                    "United States".into(),
                    "Japan".into(),
                    "India".into(),
                    "Germany".into(),
                ],
            }),
            chart_title: Some("Suicide Rates Over Time (Selected Countries)".into()),
            caption: "A line chart comparing suicide rates in select countries can offer insights into how different nations have managed mental health issues. For example, the Centers for Disease Control and Prevention (CDC) reports that suicide rates in the United States increased by 37% between 2000 and 2018, then decreased by 5% between 2018 and 2020, only to return to their peak in 2022.".into(),
            x_label: Some("Year".into()),
            y_label: rate_axis.clone(),
            ..ReportDefinition::new("line_chart", ChartKind::Line, &cols.rate, "Suicide Rates Over Time")
        },
        ReportDefinition {
            group_by: vec![cols.age_group.clone()],
            filter: Some(RowFilter::EqualsMax { column: cols.year.clone() }),
            caption: "Proportional suicide rates by age group in the latest year can be visualized using a pie chart. This chart can reveal which age groups are most at risk.".into(),
            ..ReportDefinition::new(
                "pie_chart",
                ChartKind::Pie,
                &cols.rate,
                &format!("Suicide Rates by Age Group ({})", TitleVars::placeholder(&cols.year)),
            )
        },
        ReportDefinition {
            group_by: vec![cols.year.clone(), cols.continent.clone()],
            chart_title: Some("Suicide Rate by Continent Over Time".into()),
            caption: "A stacked bar chart comparing suicide rates across continents can illustrate regional disparities.".into(),
            x_label: Some("Year".into()),
            y_label: rate_axis.clone(),
            ..ReportDefinition::new("stacked_bar", ChartKind::StackedBar, &cols.rate, "Suicide Rate by Continent")
        },
        ReportDefinition {
            group_by: vec![cols.gdp_per_capita.clone()],
            color: Some(cols.continent.clone()),
            chart_title: Some("GDP Per Capita vs. Suicide Rate".into()),
            caption: "A scatter plot showing GDP per capita vs. suicide rate can highlight the economic factors influencing suicide rates. Research indicates that economic downturns, such as the 2008 global financial crisis, have been associated with increased suicide rates, particularly among men in countries with significant job losses.".into(),
            x_label: Some("GDP Per Capita".into()),
            y_label: rate_axis.clone(),
            ..ReportDefinition::new("scatter_plot", ChartKind::Scatter, &cols.rate, "Economic Impact on Suicide Rate")
        },
        ReportDefinition {
            group_by: vec![cols.age_group.clone()],
            chart_title: Some("Suicide Rate Distribution by Age Group".into()),
            caption: "A box plot showing the distribution of suicide rates by age group can provide a detailed view of the variability within each age group.".into(),
            ..ReportDefinition::new("box_plot", ChartKind::Box, &cols.rate, "Suicide Rate by Age")
        },
        ReportDefinition {
            chart_title: Some("Distribution of Suicide Rates".into()),
            caption: "A histogram depicting the distribution of suicide rates can show how these rates are spread across different populations. This type of chart can reveal whether suicide rates are concentrated in specific demographics or more evenly distributed.".into(),
            x_label: rate_axis.clone(),
            ..ReportDefinition::new("histogram", ChartKind::Histogram, &cols.rate, "Suicide Rate Distribution")
        },
        ReportDefinition {
            group_by: vec![cols.gdp_per_capita.clone()],
            size: Some(cols.population.clone()),
            color: Some(cols.continent.clone()),
            chart_title: Some("Suicide Rate vs. GDP Per Capita (Bubble Size = Population)".into()),
            caption: "Bubble chart showing suicide rate vs. GDP per capita, with bubble size representing population.".into(),
            x_label: Some("GDP Per Capita".into()),
            y_label: rate_axis,
            ..ReportDefinition::new("bubble_chart", ChartKind::Bubble, &cols.rate, "Bubble Chart Analysis")
        },
    ]
}

/// The eight charts of the interactive page, over the `master.csv` export.
pub fn interactive_reports(cols: &ColumnMap) -> Vec<ReportDefinition> {
    let rate_axis = Some("Suicides per 100k".to_string());

    vec![
        ReportDefinition {
            group_by: vec![cols.country.clone()],
            order: Order::Descending,
            limit: Some(10),
            value_labels: true,
            caption: "Countries with the highest average suicide rate across all years, sexes and age groups.".into(),
            y_label: rate_axis.clone(),
            ..ReportDefinition::new("top_countries", ChartKind::Bar, &cols.rate, "Top 10 Countries by Suicide Rate")
        },
        ReportDefinition {
            group_by: vec![cols.year.clone(), cols.generation.clone()],
            caption: "Average suicide rate per year for each generation.".into(),
            x_label: Some("Year".into()),
            y_label: rate_axis.clone(),
            ..ReportDefinition::new("generation_trend", ChartKind::Line, &cols.rate, "Suicide Rate Trend by Generation")
        },
        ReportDefinition {
            group_by: vec![cols.sex.clone()],
            caption: "Share of the average suicide rate by sex.".into(),
            ..ReportDefinition::new("sex_share", ChartKind::Pie, &cols.rate, "Suicide Rate by Sex")
        },
        ReportDefinition {
            group_by: vec![cols.year.clone(), cols.age_group.clone()],
            caption: "Average suicide rate per year, stacked by age group.".into(),
            x_label: Some("Year".into()),
            y_label: rate_axis.clone(),
            ..ReportDefinition::new("age_by_year", ChartKind::StackedBar, &cols.rate, "Suicide Rate by Age Group Over Time")
        },
        ReportDefinition {
            group_by: vec![cols.gdp_per_capita.clone()],
            color: Some(cols.continent.clone()),
            caption: "GDP per capita against suicide rate for every sampled row.".into(),
            x_label: Some("GDP Per Capita ($)".into()),
            y_label: rate_axis.clone(),
            ..ReportDefinition::new("gdp_scatter", ChartKind::Scatter, &cols.rate, "GDP Per Capita vs. Suicide Rate")
        },
        ReportDefinition {
            group_by: vec![cols.gdp_per_capita.clone()],
            size: Some(cols.population.clone()),
            color: Some(cols.continent.clone()),
            caption: "Suicide rate against GDP per capita, with bubble size representing population.".into(),
            x_label: Some("GDP Per Capita ($)".into()),
            y_label: rate_axis.clone(),
            ..ReportDefinition::new("population_bubble", ChartKind::Bubble, &cols.rate, "Suicide Rate vs. GDP Per Capita (Bubble Size = Population)")
        },
        ReportDefinition {
            group_by: vec![cols.age_group.clone()],
            caption: "Spread of suicide rates within each age group.".into(),
            y_label: rate_axis.clone(),
            ..ReportDefinition::new("age_distribution", ChartKind::Box, &cols.rate, "Suicide Rate Distribution by Age Group")
        },
        ReportDefinition {
            caption: "How suicide rates are spread across all sampled rows.".into(),
            x_label: rate_axis,
            ..ReportDefinition::new("rate_histogram", ChartKind::Histogram, &cols.rate, "Distribution of Suicide Rates")
        },
    ]
}
