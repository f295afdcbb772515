//! `$max_<column>` placeholders in report titles.
//!
//! A `col == max(col)` filter resolves the latest value of its column, and
//! titles such as "Suicide Rates by Age Group ($max_year)" pick it up here.

use crate::data::normalize_column_name;
use crate::error::{ReportError, ReportResult};
use std::collections::BTreeMap;

const MAX_PREFIX: &str = "max_";

/// Column maxima resolved by a report's filter, keyed by normalized column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TitleVars {
    maxima: BTreeMap<String, String>,
}

impl TitleVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_max(&mut self, column: &str, value: String) {
        self.maxima.insert(normalize_column_name(column), value);
    }

    /// The placeholder text that refers to the maximum of `column`.
    pub fn placeholder(column: &str) -> String {
        format!("${MAX_PREFIX}{}", normalize_column_name(column))
    }

    fn lookup(&self, name: &str) -> Option<&str> {
        let column = name.strip_prefix(MAX_PREFIX)?;
        self.maxima.get(column).map(String::as_str)
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Replace every `$max_<column>` in `title`.
///
/// A `$` that does not start a name is kept, so "GDP per capita ($)" passes
/// through. Any other name, or a maximum the filter did not resolve, is a
/// `Config` error.
pub fn expand_title(title: &str, vars: &TitleVars) -> ReportResult<String> {
    let mut output = String::with_capacity(title.len());
    let mut rest = title;

    while let Some(pos) = rest.find('$') {
        output.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let end = after.find(|c| !is_name_char(c)).unwrap_or(after.len());
        let name = &after[..end];

        if !name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
            output.push('$');
            rest = after;
            continue;
        }

        let value = vars.lookup(name).ok_or_else(|| {
            ReportError::Config(format!(
                "title placeholder '${name}' has no value; only $max_<column> from a max filter is available"
            ))
        })?;
        output.push_str(value);
        rest = &after[end..];
    }

    output.push_str(rest);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latest_year() -> TitleVars {
        let mut vars = TitleVars::new();
        vars.set_max("Year", "2020".to_string());
        vars
    }

    #[test]
    fn test_latest_year_title() {
        let output = expand_title("Suicide Rates by Age Group ($max_year)", &latest_year()).unwrap();
        assert_eq!(output, "Suicide Rates by Age Group (2020)");
    }

    #[test]
    fn test_placeholder_matches_lookup() {
        assert_eq!(TitleVars::placeholder("Year"), "$max_year");
        let title = format!("Latest {}", TitleVars::placeholder("year"));
        assert_eq!(expand_title(&title, &latest_year()).unwrap(), "Latest 2020");
    }

    #[test]
    fn test_plain_title() {
        let output = expand_title("Average Suicide Rate by Year", &TitleVars::new()).unwrap();
        assert_eq!(output, "Average Suicide Rate by Year");
    }

    #[test]
    fn test_dollar_without_name_is_kept() {
        let vars = TitleVars::new();
        assert_eq!(expand_title("GDP per capita ($)", &vars).unwrap(), "GDP per capita ($)");
        assert_eq!(expand_title("$5 and $", &vars).unwrap(), "$5 and $");
    }

    #[test]
    fn test_unresolved_maximum() {
        let err = expand_title("Rates in $max_year", &TitleVars::new()).unwrap_err();
        assert!(err.to_string().contains("max_year"));
    }

    #[test]
    fn test_only_max_names_expand() {
        let err = expand_title("Rates for $year", &latest_year()).unwrap_err();
        assert!(matches!(err, ReportError::Config(_)));
    }
}
