//! Persisted layer state.
//!
//! State is a flat string map keyed by `<prefix>.<name>`, serializable to
//! JSON with `serde_json`. Index orders are stored as comma lists
//! (`"1,2,3,0"`).

use std::collections::BTreeMap;

use crate::coordinate::Index;
use crate::error::{GridError, Result};

/// Flat key/value store holding persisted layer state.
pub type Properties = BTreeMap<String, String>;

/// Build the full property key for `name` under `prefix`.
pub fn property_key(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

/// Join indices into a comma list without a trailing comma.
pub fn format_index_list(indices: &[Index]) -> String {
    indices
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse a comma list of indices; one trailing comma is accepted.
///
/// # Errors
/// Returns [`GridError::InvalidState`] when an element is not a non-negative
/// integer.
pub fn parse_index_list(key: &str, value: &str) -> Result<Vec<Index>> {
    let trimmed = value.trim();
    let trimmed = trimmed.strip_suffix(',').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    trimmed
        .split(',')
        .map(|token| {
            token
                .trim()
                .parse::<Index>()
                .map_err(|e| GridError::invalid_state(key, format!("'{token}': {e}")))
        })
        .collect()
}

/// Serialize properties as pretty JSON.
///
/// # Errors
/// Returns [`GridError::Config`] if serialization fails.
pub fn to_json(properties: &Properties) -> Result<String> {
    Ok(serde_json::to_string_pretty(properties)?)
}

/// Parse properties from a JSON object of strings.
///
/// # Errors
/// Returns [`GridError::Config`] when the document is not a string map.
pub fn from_json(json: &str) -> Result<Properties> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("1,2,3,0", &[1, 2, 3, 0] ; "plain")]
    #[test_case("1,2,3,0,", &[1, 2, 3, 0] ; "trailing comma")]
    #[test_case(" 4 , 5 ", &[4, 5] ; "whitespace")]
    #[test_case("", &[] ; "empty")]
    fn test_parse_index_list(input: &str, expected: &[Index]) {
        assert_eq!(parse_index_list("k", input).unwrap(), expected);
    }

    #[test_case("1,,2" ; "empty element")]
    #[test_case("1,-2" ; "negative")]
    #[test_case("a,b" ; "not a number")]
    fn test_parse_index_list_rejects(input: &str) {
        let err = parse_index_list("grid.columnIndexOrder", input).unwrap_err();
        assert!(err.to_string().contains("grid.columnIndexOrder"));
    }

    #[test]
    fn test_format_has_no_trailing_comma() {
        assert_eq!(format_index_list(&[1, 2, 3, 0]), "1,2,3,0");
        assert_eq!(format_index_list(&[]), "");
    }

    #[test]
    fn test_property_key() {
        assert_eq!(property_key("grid", "rowIndexOrder"), "grid.rowIndexOrder");
        assert_eq!(property_key("", "rowIndexOrder"), "rowIndexOrder");
    }
}
