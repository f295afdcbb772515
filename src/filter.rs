// Row filter expressions for configured reports.
//
//   country in ["United States", "Japan"]
//   year == max(year)

use crate::aggregate::RowFilter;
use crate::error::{ReportError, ReportResult};
use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_while1},
    character::complete::{char, multispace0},
    combinator::{all_consuming, map},
    error::ParseError,
    multi::separated_list1,
    sequence::delimited,
    IResult,
};

/// Parse a filter expression.
pub fn parse_filter(input: &str) -> ReportResult<RowFilter> {
    match all_consuming(ws(alt((parse_membership, parse_latest))))(input) {
        Ok((_, filter)) => Ok(filter),
        Err(e) => Err(ReportError::Config(format!("invalid filter '{}': {}", input, e))),
    }
}

/// Format: column in ["a", "b", c]
fn parse_membership(input: &str) -> IResult<&str, RowFilter> {
    let (input, column) = ws(column_name)(input)?;
    let (input, _) = ws(tag("in"))(input)?;
    let (input, values) = delimited(
        ws(char('[')),
        separated_list1(ws(char(',')), ws(alt((string_literal, bare_value)))),
        ws(char(']')),
    )(input)?;

    Ok((input, RowFilter::In { column, values }))
}

/// Format: column == max(column)
fn parse_latest(input: &str) -> IResult<&str, RowFilter> {
    let (input, column) = ws(column_name)(input)?;
    let (input, _) = ws(tag("=="))(input)?;
    let (input, _) = ws(tag("max"))(input)?;
    let (rest, inner) = delimited(ws(char('(')), ws(column_name), ws(char(')')))(input)?;

    if inner != column {
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        )));
    }

    Ok((rest, RowFilter::EqualsMax { column }))
}

fn ws<'a, F, O, E>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O, E>
where
    F: FnMut(&'a str) -> IResult<&'a str, O, E>,
    E: ParseError<&'a str>,
{
    delimited(multispace0, inner, multispace0)
}

/// Bare identifier or quoted name (for columns like "suicides/100k pop").
fn column_name(input: &str) -> IResult<&str, String> {
    alt((string_literal, identifier))(input)
}

fn identifier(input: &str) -> IResult<&str, String> {
    map(
        take_while1(|c: char| c.is_alphanumeric() || c == '_'),
        String::from,
    )(input)
}

fn bare_value(input: &str) -> IResult<&str, String> {
    map(
        take_while1(|c: char| c.is_alphanumeric() || matches!(c, '_' | '.' | '-' | '+')),
        String::from,
    )(input)
}

fn string_literal(input: &str) -> IResult<&str, String> {
    alt((
        map(delimited(char('"'), is_not("\""), char('"')), String::from),
        map(delimited(char('\''), is_not("'"), char('\'')), String::from),
    ))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_membership() {
        let filter = parse_filter(r#"countryname in ["United States", "Japan", India]"#).unwrap();
        assert_eq!(
            filter,
            RowFilter::In {
                column: "countryname".to_string(),
                values: vec!["United States".into(), "Japan".into(), "India".into()],
            }
        );
    }

    #[test]
    fn test_parse_membership_numeric_values() {
        let filter = parse_filter("year in [2019, 2020]").unwrap();
        assert_eq!(
            filter,
            RowFilter::In {
                column: "year".to_string(),
                values: vec!["2019".into(), "2020".into()],
            }
        );
    }

    #[test]
    fn test_parse_latest() {
        let filter = parse_filter("  year == max( year ) ").unwrap();
        assert_eq!(filter, RowFilter::EqualsMax { column: "year".to_string() });
    }

    #[test]
    fn test_parse_quoted_column() {
        let filter = parse_filter(r#""suicides/100k pop" in ['5']"#).unwrap();
        assert_eq!(filter.column(), "suicides/100k pop");
    }

    #[test]
    fn test_latest_requires_same_column() {
        assert!(parse_filter("year == max(population)").is_err());
    }

    #[test]
    fn test_invalid_filters() {
        assert!(parse_filter("").is_err());
        assert!(parse_filter("country in []").is_err());
        assert!(parse_filter("country in [\"Japan\"").is_err());
        assert!(parse_filter("year > 2010").is_err());
        assert!(parse_filter("year == max(year) extra").is_err());
    }
}
