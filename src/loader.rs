// Dataset loading: CSV ingestion, header normalization, continent synthesis
// and deterministic downsampling.

use crate::continent::{Continent, ContinentLookup};
use crate::data::{is_missing, Dataset};
use crate::error::{ReportError, ReportResult};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// What to do with rows that carry blank cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum MissingValues {
    /// Leave them in place; aggregations skip blank measures.
    #[default]
    Keep,
    /// Drop rows with a blank cell in any of these columns.
    DropRequired(Vec<String>),
}

pub struct LoadOptions<'a> {
    pub missing: MissingValues,
    /// Row cap; `None` disables downsampling.
    pub max_rows: Option<usize>,
    pub seed: u64,
    pub country_column: String,
    pub continent_column: String,
    pub lookup: &'a dyn ContinentLookup,
}

/// Load and concatenate one or more CSV files into a single dataset.
pub fn load<P: AsRef<Path>>(paths: &[P], options: &LoadOptions<'_>) -> ReportResult<Dataset> {
    let mut paths = paths.iter().map(AsRef::as_ref);
    let first = paths.next().ok_or_else(|| ReportError::DataUnavailable {
        path: Default::default(),
        reason: "no input files configured".to_string(),
    })?;

    let mut dataset = read_csv(first)?;
    for path in paths {
        let next = read_csv(path)?;
        if next.headers() != dataset.headers() {
            return Err(ReportError::DataUnavailable {
                path: path.to_path_buf(),
                reason: format!(
                    "header mismatch: expected [{}], found [{}]",
                    dataset.headers().join(", "),
                    next.headers().join(", ")
                ),
            });
        }
        dataset.extend_rows(next.rows().to_vec());
    }
    info!(rows = dataset.len(), columns = dataset.headers().len(), "dataset loaded");

    if let MissingValues::DropRequired(required) = &options.missing {
        drop_incomplete_rows(&mut dataset, required);
    }

    synthesize_continent(
        &mut dataset,
        &options.country_column,
        &options.continent_column,
        options.lookup,
    )?;

    if let Some(cap) = options.max_rows {
        if dataset.len() > cap {
            warn!(
                from = dataset.len(),
                to = cap,
                seed = options.seed,
                "downsampling dataset; distribution charts will reflect the sample"
            );
            dataset = sample(&dataset, cap, options.seed);
        }
    }

    Ok(dataset)
}

pub fn read_csv(path: &Path) -> ReportResult<Dataset> {
    let file = std::fs::File::open(path).map_err(|e| ReportError::DataUnavailable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    read_csv_from_reader(file, path)
}

/// Parse CSV from any reader; `origin` only labels errors.
pub fn read_csv_from_reader<R: Read>(reader: R, origin: &Path) -> ReportResult<Dataset> {
    let unavailable = |reason: String| ReportError::DataUnavailable {
        path: origin.to_path_buf(),
        reason,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| unavailable(e.to_string()))?
        .iter()
        .map(String::from)
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(unavailable("missing header row".to_string()));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| unavailable(e.to_string()))?;
        rows.push(record.iter().map(String::from).collect());
    }

    if rows.is_empty() {
        return Err(unavailable("CSV must contain at least one data row".to_string()));
    }

    debug!(path = %origin.display(), rows = rows.len(), "read csv");
    Ok(Dataset::new(headers, rows))
}

/// Remove rows with a missing value in any required column. Required
/// columns the dataset lacks are ignored here; reports that need them are
/// skipped later with a diagnostic.
pub fn drop_incomplete_rows(dataset: &mut Dataset, required: &[String]) {
    let indices: Vec<usize> = required
        .iter()
        .filter_map(|c| dataset.column_index(c).ok())
        .collect();
    let before = dataset.len();
    dataset.retain_rows(|row| {
        indices
            .iter()
            .all(|&i| row.get(i).map(|cell| !is_missing(cell)).unwrap_or(false))
    });
    if dataset.len() != before {
        info!(dropped = before - dataset.len(), "dropped rows with missing values");
    }
}

/// Derive the continent column from the country column if it is absent.
/// Returns whether a column was added.
pub fn synthesize_continent(
    dataset: &mut Dataset,
    country_column: &str,
    continent_column: &str,
    lookup: &dyn ContinentLookup,
) -> ReportResult<bool> {
    if dataset.has_column(continent_column) {
        return Ok(false);
    }
    let Some((values, unresolved)) = classify_countries(dataset, country_column, lookup) else {
        debug!(column = country_column, "no country column; continent not derived");
        return Ok(false);
    };

    if unresolved > 0 {
        warn!(rows = unresolved, "countries without a continent classified as Unknown");
    }
    dataset.add_column(continent_column, values)?;
    Ok(true)
}

fn classify_countries(
    dataset: &Dataset,
    country_column: &str,
    lookup: &dyn ContinentLookup,
) -> Option<(Vec<String>, usize)> {
    let countries = dataset.categorical(country_column).ok()?;
    let mut memo: HashMap<&str, Continent> = HashMap::new();
    let mut unresolved = 0usize;
    let values = countries
        .iter()
        .map(|&country| {
            let continent = *memo
                .entry(country)
                .or_insert_with(|| lookup.classify(country));
            if continent == Continent::Unknown {
                unresolved += 1;
            }
            continent.name().to_string()
        })
        .collect();
    Some((values, unresolved))
}

/// Deterministic subsample of at most `cap` rows, kept in source order.
pub fn sample(dataset: &Dataset, cap: usize, seed: u64) -> Dataset {
    if dataset.len() <= cap {
        return dataset.clone();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices = rand::seq::index::sample(&mut rng, dataset.len(), cap).into_vec();
    indices.sort_unstable();
    dataset.select_rows(&indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::continent::CountryTable;
    use std::io::Cursor;

    fn parse(csv: &str) -> ReportResult<Dataset> {
        read_csv_from_reader(Cursor::new(csv.to_string()), Path::new("inline.csv"))
    }

    fn numbered(n: usize) -> Dataset {
        Dataset::new(
            vec!["id".to_string()],
            (0..n).map(|i| vec![i.to_string()]).collect(),
        )
    }

    #[test]
    fn test_read_csv_normalizes_headers() {
        let ds = parse(" Year ,CountryName,DeathRatePer100K\n2010,Japan,18.5\n").unwrap();
        assert_eq!(ds.headers(), &["year", "countryname", "deathrateper100k"]);
        assert_eq!(ds.len(), 1);
    }

    #[test]
    fn test_read_csv_requires_rows() {
        let err = parse("year,rate\n").unwrap_err();
        assert!(err.to_string().contains("at least one data row"));
    }

    #[test]
    fn test_read_csv_rejects_ragged_rows() {
        let err = parse("year,rate\n2010,1.0\n2011\n").unwrap_err();
        assert!(matches!(err, ReportError::DataUnavailable { .. }));
    }

    #[test]
    fn test_missing_file_is_data_unavailable() {
        let err = read_csv(Path::new("does/not/exist.csv")).unwrap_err();
        assert!(matches!(err, ReportError::DataUnavailable { .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_drop_incomplete_rows() {
        let mut ds = parse("country,year,rate\nJapan,2010,18.5\nPeru,,3.0\nChile,2011,NA\n").unwrap();
        drop_incomplete_rows(&mut ds, &["year".to_string(), "rate".to_string(), "absent".to_string()]);
        assert_eq!(ds.categorical("country").unwrap(), vec!["Japan"]);
    }

    #[test]
    fn test_synthesize_continent_once() {
        let mut ds = parse("countryname,rate\nJapan,1\nAtlantis,2\nJapan,3\n").unwrap();
        let table = CountryTable::builtin();
        assert!(synthesize_continent(&mut ds, "countryname", "continent", &table).unwrap());
        assert_eq!(
            ds.categorical("continent").unwrap(),
            vec!["Asia", "Unknown", "Asia"]
        );
        // Already present: left untouched.
        assert!(!synthesize_continent(&mut ds, "countryname", "continent", &table).unwrap());
        assert_eq!(ds.headers().len(), 3);
    }

    #[test]
    fn test_synthesize_continent_without_country_column() {
        let mut ds = parse("year,rate\n2010,1\n").unwrap();
        let table = CountryTable::builtin();
        assert!(!synthesize_continent(&mut ds, "countryname", "continent", &table).unwrap());
        assert!(!ds.has_column("continent"));
    }

    #[test]
    fn test_sample_is_deterministic() {
        let ds = numbered(2_000);
        let a = sample(&ds, 500, 42);
        let b = sample(&ds, 500, 42);
        assert_eq!(a.len(), 500);
        assert_eq!(a, b);
    }

    #[test]
    fn test_sample_keeps_source_order() {
        let ds = numbered(100);
        let ids: Vec<f64> = sample(&ds, 10, 7)
            .numeric("id")
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_sample_under_cap_is_identity() {
        let ds = numbered(20);
        assert_eq!(sample(&ds, 500, 1), ds);
    }

    #[test]
    fn test_load_applies_cap() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rates.csv");
        let mut body = String::from("countryname,year,rate\n");
        for i in 0..50 {
            body.push_str(&format!("Japan,{},{}\n", 2000 + i % 10, i));
        }
        std::fs::write(&path, body).unwrap();

        let table = CountryTable::builtin();
        let options = LoadOptions {
            missing: MissingValues::Keep,
            max_rows: Some(20),
            seed: 42,
            country_column: "countryname".to_string(),
            continent_column: "continent".to_string(),
            lookup: &table,
        };
        let ds = load(&[&path], &options).unwrap();
        assert_eq!(ds.len(), 20);
        assert!(ds.has_column("continent"));
        assert_eq!(ds, load(&[&path], &options).unwrap());
    }

    #[test]
    fn test_load_concatenates_and_checks_headers() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");
        let c = dir.path().join("c.csv");
        std::fs::write(&a, "Year,Rate\n2010,1\n").unwrap();
        std::fs::write(&b, "year , rate\n2011,2\n").unwrap();
        std::fs::write(&c, "year,gdp\n2011,2\n").unwrap();

        let table = CountryTable::new();
        let options = LoadOptions {
            missing: MissingValues::Keep,
            max_rows: None,
            seed: 0,
            country_column: "country".to_string(),
            continent_column: "continent".to_string(),
            lookup: &table,
        };
        assert_eq!(load(&[&a, &b], &options).unwrap().len(), 2);
        let err = load(&[&a, &c], &options).unwrap_err();
        assert!(err.to_string().contains("header mismatch"));
    }
}
