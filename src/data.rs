use crate::error::{ReportError, ReportResult};

/// Row-oriented table with normalized column names.
///
/// Cells are kept as the raw strings read from the source; typed views are
/// produced on demand by [`Dataset::numeric`] and [`Dataset::categorical`].
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Trim and case-fold a column name. Every lookup goes through this.
pub fn normalize_column_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Read a cell as a number. Blank and `NA`/`NaN` markers are missing values.
pub fn parse_cell(cell: &str) -> Option<Result<f64, std::num::ParseFloatError>> {
    let trimmed = cell.trim();
    if is_missing(trimmed) {
        return None;
    }
    Some(trimmed.parse::<f64>())
}

pub fn is_missing(cell: &str) -> bool {
    let trimmed = cell.trim();
    trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("na")
        || trimmed.eq_ignore_ascii_case("nan")
        || trimmed.eq_ignore_ascii_case("null")
}

impl Dataset {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let headers = headers.iter().map(|h| normalize_column_name(h)).collect();
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_ok()
    }

    pub fn column_index(&self, name: &str) -> ReportResult<usize> {
        let key = normalize_column_name(name);
        self.headers
            .iter()
            .position(|h| *h == key)
            .ok_or_else(|| ReportError::missing_column(key))
    }

    /// Cell at `(row, col)`; short rows read as blank.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn categorical(&self, name: &str) -> ReportResult<Vec<&str>> {
        let idx = self.column_index(name)?;
        Ok((0..self.rows.len()).map(|r| self.cell(r, idx)).collect())
    }

    /// Numeric view of a column. Missing cells map to `None`; anything else
    /// that does not parse is an error naming the offending row.
    pub fn numeric(&self, name: &str) -> ReportResult<Vec<Option<f64>>> {
        let idx = self.column_index(name)?;
        let column = normalize_column_name(name);
        (0..self.rows.len())
            .map(|r| {
                let raw = self.cell(r, idx);
                match parse_cell(raw) {
                    None => Ok(None),
                    Some(Ok(v)) => Ok(Some(v)),
                    Some(Err(_)) => Err(ReportError::Parse {
                        column: column.clone(),
                        value: raw.to_string(),
                        row: r + 1,
                    }),
                }
            })
            .collect()
    }

    pub fn max_numeric(&self, name: &str) -> ReportResult<Option<f64>> {
        let values = self.numeric(name)?;
        Ok(values.into_iter().flatten().fold(None, |acc, v| match acc {
            Some(m) if m >= v => Some(m),
            _ => Some(v),
        }))
    }

    /// Append a derived column. `values` must have one entry per row.
    pub fn add_column(&mut self, name: &str, values: Vec<String>) -> ReportResult<()> {
        if values.len() != self.rows.len() {
            return Err(ReportError::Config(format!(
                "derived column '{}' has {} values for {} rows",
                name,
                values.len(),
                self.rows.len()
            )));
        }
        self.headers.push(normalize_column_name(name));
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(())
    }

    /// New dataset holding only the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Dataset {
        Dataset {
            headers: self.headers.clone(),
            rows: indices
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
        }
    }

    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[String]) -> bool,
    {
        self.rows.retain(|row| keep(row));
    }

    pub(crate) fn extend_rows(&mut self, rows: Vec<Vec<String>>) {
        self.rows.extend(rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_dataset() -> Dataset {
        Dataset::new(
            vec![" Year ".to_string(), "CountryName".to_string(), "Rate".to_string()],
            vec![
                vec!["2010".to_string(), "Japan".to_string(), "18.5".to_string()],
                vec!["2011".to_string(), "Germany".to_string(), "".to_string()],
                vec!["2012".to_string(), "India".to_string(), "NaN".to_string()],
            ],
        )
    }

    #[test]
    fn test_headers_are_normalized() {
        let ds = make_dataset();
        assert_eq!(ds.headers(), &["year", "countryname", "rate"]);
        assert!(ds.has_column("COUNTRYNAME"));
        assert!(ds.has_column("  year"));
    }

    #[test]
    fn test_missing_column_error() {
        let ds = make_dataset();
        let err = ds.column_index("gdppercapita").unwrap_err();
        assert!(matches!(err, ReportError::MissingColumn { ref column } if column == "gdppercapita"));
    }

    #[test]
    fn test_numeric_treats_blank_and_nan_as_missing() {
        let ds = make_dataset();
        assert_eq!(ds.numeric("rate").unwrap(), vec![Some(18.5), None, None]);
    }

    #[test]
    fn test_numeric_rejects_text() {
        let ds = make_dataset();
        let err = ds.numeric("countryname").unwrap_err();
        assert!(err.to_string().contains("Japan"));
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn test_max_numeric() {
        let ds = make_dataset();
        assert_eq!(ds.max_numeric("year").unwrap(), Some(2012.0));
    }

    #[test]
    fn test_add_column_length_mismatch() {
        let mut ds = make_dataset();
        assert!(ds.add_column("continent", vec!["Asia".to_string()]).is_err());
        ds.add_column("Continent", vec!["Asia".into(), "Europe".into(), "Asia".into()])
            .unwrap();
        assert_eq!(ds.categorical("continent").unwrap(), vec!["Asia", "Europe", "Asia"]);
    }

    #[test]
    fn test_select_rows_keeps_order() {
        let ds = make_dataset();
        let subset = ds.select_rows(&[2, 0]);
        assert_eq!(subset.categorical("year").unwrap(), vec!["2012", "2010"]);
    }
}
