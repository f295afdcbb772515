use crate::data::{is_missing, Dataset};
use crate::error::{ReportError, ReportResult};
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Row restriction applied before grouping.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub enum RowFilter {
    /// Keep rows whose `column` value is one of `values`.
    In { column: String, values: Vec<String> },
    /// Keep rows whose numeric `column` equals that column's maximum.
    EqualsMax { column: String },
}

/// Rows selected by a filter, plus the value it resolved to (if any).
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub indices: Vec<usize>,
    pub resolved: Option<String>,
}

impl RowFilter {
    pub fn column(&self) -> &str {
        match self {
            RowFilter::In { column, .. } | RowFilter::EqualsMax { column } => column,
        }
    }

    pub fn select(&self, dataset: &Dataset) -> ReportResult<Selection> {
        match self {
            RowFilter::In { column, values } => {
                let cells = dataset.categorical(column)?;
                let indices = cells
                    .iter()
                    .enumerate()
                    .filter(|(_, cell)| values.iter().any(|v| v == cell.trim()))
                    .map(|(i, _)| i)
                    .collect();
                Ok(Selection {
                    indices,
                    resolved: None,
                })
            }
            RowFilter::EqualsMax { column } => {
                let Some(max) = dataset.max_numeric(column)? else {
                    return Err(ReportError::empty(format!("no values in column '{column}'")));
                };
                let values = dataset.numeric(column)?;
                let indices = values
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| **v == Some(max))
                    .map(|(i, _)| i)
                    .collect();
                Ok(Selection {
                    indices,
                    resolved: Some(format_number(max)),
                })
            }
        }
    }

    /// Subset of `dataset` this filter keeps.
    pub fn apply(&self, dataset: &Dataset) -> ReportResult<(Dataset, Option<String>)> {
        let selection = self.select(dataset)?;
        Ok((dataset.select_rows(&selection.indices), selection.resolved))
    }
}

impl TryFrom<String> for RowFilter {
    type Error = ReportError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        crate::filter::parse_filter(&value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Order {
    /// Sorted by group key, numerically where every key is a number.
    #[default]
    Natural,
    Descending,
    Ascending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSpec {
    pub group_by: Vec<String>,
    pub measure: String,
    pub filter: Option<RowFilter>,
    pub order: Order,
    pub limit: Option<usize>,
}

impl AggregateSpec {
    pub fn mean_of(measure: &str, group_by: &[&str]) -> Self {
        Self {
            group_by: group_by.iter().map(|s| s.to_string()).collect(),
            measure: measure.to_string(),
            filter: None,
            order: Order::Natural,
            limit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    pub key: Vec<String>,
    pub mean: f64,
    pub count: usize,
}

/// One mean per distinct group key.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedResult {
    pub group_by: Vec<String>,
    pub measure: String,
    pub rows: Vec<GroupRow>,
    /// Value the row filter resolved to, e.g. the latest year.
    pub filter_value: Option<String>,
}

/// Categories along one axis and one series of values per second-key value.
#[derive(Debug, Clone, PartialEq)]
pub struct Pivot {
    pub categories: Vec<String>,
    pub series: Vec<Series>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl GroupedResult {
    /// Single-key view: `(label, mean)` in result order.
    pub fn labels_and_means(&self) -> (Vec<String>, Vec<f64>) {
        self.rows
            .iter()
            .map(|r| (r.key.join(" / "), r.mean))
            .unzip()
    }

    /// Reshape a two-key result: the first key becomes the category axis,
    /// the second key one series each.
    pub fn pivot(&self) -> ReportResult<Pivot> {
        if self.group_by.len() != 2 {
            return Err(ReportError::Config(format!(
                "pivot needs exactly two group keys, got {}",
                self.group_by.len()
            )));
        }
        let categories = sort_labels(self.rows.iter().map(|r| r.key[0].clone()).collect());
        let names = sort_labels(self.rows.iter().map(|r| r.key[1].clone()).collect());

        let cat_index: HashMap<&str, usize> = categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();

        let mut series: Vec<Series> = names
            .into_iter()
            .map(|name| Series {
                name,
                values: vec![None; categories.len()],
            })
            .collect();
        let series_index: HashMap<String, usize> = series
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), i))
            .collect();

        for row in &self.rows {
            let c = cat_index[row.key[0].as_str()];
            let s = series_index[&row.key[1]];
            series[s].values[c] = Some(row.mean);
        }

        Ok(Pivot { categories, series })
    }
}

/// Mean of `spec.measure` per distinct combination of `spec.group_by`.
pub fn aggregate(dataset: &Dataset, spec: &AggregateSpec) -> ReportResult<GroupedResult> {
    let key_cols = spec
        .group_by
        .iter()
        .map(|c| dataset.column_index(c))
        .collect::<ReportResult<Vec<_>>>()?;
    let measure = dataset.numeric(&spec.measure)?;

    let (indices, filter_value) = match &spec.filter {
        Some(filter) => {
            let selection = filter.select(dataset)?;
            (selection.indices, selection.resolved)
        }
        None => ((0..dataset.len()).collect(), None),
    };

    let mut sums: HashMap<Vec<String>, (f64, usize)> = HashMap::new();
    for &row in &indices {
        let Some(value) = measure[row] else { continue };
        let key: Vec<String> = key_cols
            .iter()
            .map(|&c| dataset.cell(row, c).trim().to_string())
            .collect();
        // Rows with a blank group key belong to no group.
        if key.iter().any(|k| is_missing(k)) {
            continue;
        }
        let entry = sums.entry(key).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }

    if sums.is_empty() {
        let filter_column = spec.filter.as_ref().map(RowFilter::column).unwrap_or_default();
        return Err(ReportError::empty(match &filter_value {
            Some(v) => format!("no '{}' values where {} = {}", spec.measure, filter_column, v),
            None => format!("no '{}' values to group", spec.measure),
        }));
    }

    let mut rows: Vec<GroupRow> = sums
        .into_iter()
        .map(|(key, (sum, count))| GroupRow {
            key,
            mean: sum / count as f64,
            count,
        })
        .collect();

    sort_keys(&mut rows);
    match spec.order {
        Order::Natural => {}
        Order::Descending => {
            rows.sort_by(|a, b| b.mean.partial_cmp(&a.mean).unwrap_or(Ordering::Equal))
        }
        Order::Ascending => {
            rows.sort_by(|a, b| a.mean.partial_cmp(&b.mean).unwrap_or(Ordering::Equal))
        }
    }
    if let Some(limit) = spec.limit {
        rows.truncate(limit);
    }

    Ok(GroupedResult {
        group_by: spec.group_by.clone(),
        measure: spec.measure.clone(),
        rows,
        filter_value,
    })
}

/// Sort group rows by key, comparing each key position numerically when
/// every value at that position is a number.
fn sort_keys(rows: &mut [GroupRow]) {
    let width = rows.first().map(|r| r.key.len()).unwrap_or(0);
    let numeric: Vec<bool> = (0..width)
        .map(|i| rows.iter().all(|r| r.key[i].parse::<f64>().is_ok()))
        .collect();
    rows.sort_by(|a, b| {
        for (i, &is_num) in numeric.iter().enumerate() {
            let ord = compare_label(&a.key[i], &b.key[i], is_num);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

/// Deduplicate and sort labels, numerically if they are all numbers.
pub fn sort_labels(labels: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = labels;
    unique.sort();
    unique.dedup();
    let is_num = unique.iter().all(|s| s.parse::<f64>().is_ok());
    unique.sort_by(|a, b| compare_label(a, b, is_num));
    unique
}

fn compare_label(a: &str, b: &str, numeric: bool) -> Ordering {
    if numeric {
        let fa = a.parse::<f64>().unwrap_or(f64::NAN);
        let fb = b.parse::<f64>().unwrap_or(f64::NAN);
        fa.partial_cmp(&fb).unwrap_or(Ordering::Equal)
    } else {
        a.cmp(b)
    }
}

/// Render a number without a trailing `.0` when it is integral.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

// =============================================================================
// Raw-row statistics (not aggregated to a mean)
// =============================================================================

/// One plotted point for scatter and bubble charts.
#[derive(Debug, Clone, PartialEq)]
pub struct PointRow {
    pub x: f64,
    pub y: f64,
    pub size: Option<f64>,
    pub group: Option<String>,
}

/// Rows with a value in every requested numeric column, as points.
pub fn points(
    dataset: &Dataset,
    x: &str,
    y: &str,
    size: Option<&str>,
    group: Option<&str>,
) -> ReportResult<Vec<PointRow>> {
    let xs = dataset.numeric(x)?;
    let ys = dataset.numeric(y)?;
    let sizes = size.map(|c| dataset.numeric(c)).transpose()?;
    let groups = group.map(|c| dataset.categorical(c)).transpose()?;

    let mut out = Vec::new();
    for i in 0..dataset.len() {
        let (Some(xv), Some(yv)) = (xs[i], ys[i]) else { continue };
        let size = match &sizes {
            Some(s) => match s[i] {
                Some(v) => Some(v),
                None => continue,
            },
            None => None,
        };
        out.push(PointRow {
            x: xv,
            y: yv,
            size,
            group: groups.as_ref().map(|g| g[i].trim().to_string()),
        });
    }
    if out.is_empty() {
        return Err(ReportError::empty(format!("no rows with both '{x}' and '{y}'")));
    }
    Ok(out)
}

/// Five-number summary plus outliers for one category.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub category: String,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
    pub count: usize,
}

/// Distribution of `measure` within each `category`, from the raw rows.
/// Whiskers reach the furthest values within 1.5 IQR of the box.
pub fn distribution(dataset: &Dataset, category: &str, measure: &str) -> ReportResult<Vec<BoxStats>> {
    let cats = dataset.categorical(category)?;
    let values = dataset.numeric(measure)?;

    let mut groups: HashMap<String, Vec<f64>> = HashMap::new();
    for (cat, value) in cats.iter().zip(values) {
        if is_missing(cat) {
            continue;
        }
        if let Some(v) = value {
            groups.entry(cat.trim().to_string()).or_default().push(v);
        }
    }
    if groups.is_empty() {
        return Err(ReportError::empty(format!("no '{measure}' values by '{category}'")));
    }

    let order = sort_labels(groups.keys().cloned().collect());
    let mut out = Vec::with_capacity(order.len());
    for cat in order {
        let mut ys = groups.remove(&cat).unwrap_or_default();
        ys.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

        let q1 = percentile(&ys, 0.25);
        let median = percentile(&ys, 0.50);
        let q3 = percentile(&ys, 0.75);
        let iqr = q3 - q1;
        let lower_fence = q1 - 1.5 * iqr;
        let upper_fence = q3 + 1.5 * iqr;

        let lower_whisker = ys.iter().copied().find(|&v| v >= lower_fence).unwrap_or(q1);
        let upper_whisker = ys.iter().rev().copied().find(|&v| v <= upper_fence).unwrap_or(q3);
        let outliers = ys
            .iter()
            .copied()
            .filter(|&v| v < lower_fence || v > upper_fence)
            .collect();

        out.push(BoxStats {
            category: cat,
            q1,
            median,
            q3,
            lower_whisker,
            upper_whisker,
            outliers,
            count: ys.len(),
        });
    }
    Ok(out)
}

/// Linear-interpolated percentile of already sorted data.
pub fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    let n = sorted_data.len();
    if n == 0 { return 0.0; }
    if n == 1 { return sorted_data[0]; }

    let rank = p * (n - 1) as f64;
    let lower_idx = rank.floor() as usize;
    let upper_idx = rank.ceil() as usize;

    if lower_idx == upper_idx {
        sorted_data[lower_idx]
    } else {
        let weight = rank - lower_idx as f64;
        sorted_data[lower_idx] * (1.0 - weight) + sorted_data[upper_idx] * weight
    }
}

/// Equal-width bins spanning the observed range.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub start: f64,
    pub width: f64,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn edges(&self) -> Vec<f64> {
        (0..=self.counts.len())
            .map(|i| self.start + i as f64 * self.width)
            .collect()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Count the raw values of `measure` into `bins` equal-width bins. The last
/// bin is closed so the maximum lands in it.
pub fn histogram(dataset: &Dataset, measure: &str, bins: usize) -> ReportResult<Histogram> {
    if bins == 0 {
        return Err(ReportError::Config("histogram needs at least one bin".to_string()));
    }
    let values: Vec<f64> = dataset.numeric(measure)?.into_iter().flatten().collect();
    if values.is_empty() {
        return Err(ReportError::empty(format!("no '{measure}' values to bin")));
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let (start, end) = if min == max { (min - 0.5, max + 0.5) } else { (min, max) };
    let width = (end - start) / bins as f64;

    let mut counts = vec![0usize; bins];
    for v in values {
        let idx = (((v - start) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }

    Ok(Histogram { start, width, counts })
}
