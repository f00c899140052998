//! Parsing helpers for HTML form input.
//!
//! Every form field arrives as a string. Blank strings mean "not set".

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// A form field could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} must be a valid number")]
    InvalidNumber { field: &'static str },

    #[error("{field} must be a date (YYYY-MM-DD)")]
    InvalidDate { field: &'static str },

    #[error("{field} has an unknown value")]
    InvalidChoice { field: &'static str },
}

/// `Some(trimmed)` unless the value is blank.
#[must_use]
pub fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// A required text field.
///
/// # Errors
///
/// Returns `Required` if the value is blank.
pub fn required(value: &str, field: &'static str) -> Result<String, FormError> {
    non_blank(value).ok_or(FormError::Required { field })
}

/// Split a comma-separated list, dropping blank entries.
#[must_use]
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Split one-item-per-line input, dropping blank lines.
#[must_use]
pub fn split_lines(value: &str) -> Vec<String> {
    value
        .lines()
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

/// An optional `YYYY-MM-DD` date. Blank → `None`.
///
/// # Errors
///
/// Returns `InvalidDate` if the value is set but not a date.
pub fn optional_date(value: &str, field: &'static str) -> Result<Option<NaiveDate>, FormError> {
    non_blank(value)
        .map(|v| NaiveDate::parse_from_str(&v, "%Y-%m-%d"))
        .transpose()
        .map_err(|_| FormError::InvalidDate { field })
}

/// A required decimal amount.
///
/// # Errors
///
/// Returns `Required` if blank and `InvalidNumber` if unparseable.
pub fn decimal(value: &str, field: &'static str) -> Result<Decimal, FormError> {
    required(value, field)?
        .parse()
        .map_err(|_| FormError::InvalidNumber { field })
}

/// An optional decimal amount. Blank → `None`.
///
/// # Errors
///
/// Returns `InvalidNumber` if the value is set but unparseable.
pub fn optional_decimal(value: &str, field: &'static str) -> Result<Option<Decimal>, FormError> {
    non_blank(value)
        .map(|v| v.parse::<Decimal>())
        .transpose()
        .map_err(|_| FormError::InvalidNumber { field })
}

/// An integer, or `default` when blank.
///
/// # Errors
///
/// Returns `InvalidNumber` if the value is set but not an integer.
pub fn integer_or(value: &str, default: i32, field: &'static str) -> Result<i32, FormError> {
    non_blank(value).map_or(Ok(default), |v| {
        v.parse().map_err(|_| FormError::InvalidNumber { field })
    })
}

/// A required integer.
///
/// # Errors
///
/// Returns `Required` when blank and `InvalidNumber` when not an integer.
pub fn integer(value: &str, field: &'static str) -> Result<i32, FormError> {
    required(value, field)?
        .parse()
        .map_err(|_| FormError::InvalidNumber { field })
}

/// An optional integer. Blank → `None`.
///
/// # Errors
///
/// Returns `InvalidNumber` if the value is set but not an integer.
pub fn optional_integer(value: &str, field: &'static str) -> Result<Option<i32>, FormError> {
    non_blank(value)
        .map(|v| v.parse::<i32>())
        .transpose()
        .map_err(|_| FormError::InvalidNumber { field })
}

/// Parse a `snake_case` enum value from a `<select>`.
///
/// # Errors
///
/// Returns `InvalidChoice` if the value names no variant.
pub fn choice<T: std::str::FromStr>(value: &str, field: &'static str) -> Result<T, FormError> {
    value
        .trim()
        .parse()
        .map_err(|_| FormError::InvalidChoice { field })
}

/// HTML checkboxes submit "on" (or "true") when ticked and nothing otherwise.
#[must_use]
pub fn checkbox(value: Option<&str>) -> bool {
    matches!(value, Some("on" | "true" | "1"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pyrowarden_core::ProductStatus;

    use super::*;

    #[test]
    fn test_split_list_drops_blanks() {
        assert_eq!(split_list(" red, blue ,, ,green"), ["red", "blue", "green"]);
        assert!(split_list("   ").is_empty());
    }

    #[test]
    fn test_split_lines_drops_blanks() {
        assert_eq!(
            split_lines("Rust\n\n  Tokio  \r\n\nSQL"),
            ["Rust", "Tokio", "SQL"]
        );
    }

    #[test]
    fn test_integer_requires_value() {
        assert_eq!(integer(" 4 ", "Quantity").unwrap(), 4);
        assert_eq!(
            integer("  ", "Quantity").unwrap_err(),
            FormError::Required { field: "Quantity" }
        );
        assert_eq!(
            integer("four", "Quantity").unwrap_err(),
            FormError::InvalidNumber { field: "Quantity" }
        );
    }

    #[test]
    fn test_optional_date() {
        assert_eq!(optional_date("", "Start").unwrap(), None);
        assert_eq!(
            optional_date("2026-06-01", "Start").unwrap(),
            NaiveDate::from_ymd_opt(2026, 6, 1)
        );
        assert_eq!(
            optional_date("June", "Start").unwrap_err(),
            FormError::InvalidDate { field: "Start" }
        );
    }

    #[test]
    fn test_decimal_fields() {
        assert_eq!(decimal("19.99", "Price").unwrap(), Decimal::new(1999, 2));
        assert_eq!(
            decimal(" ", "Price").unwrap_err(),
            FormError::Required { field: "Price" }
        );
        assert_eq!(optional_decimal("", "Compare").unwrap(), None);
        assert!(optional_decimal("abc", "Compare").is_err());
    }

    #[test]
    fn test_integers_and_choices() {
        assert_eq!(integer_or("", 0, "Stock").unwrap(), 0);
        assert_eq!(integer_or("12", 0, "Stock").unwrap(), 12);
        assert_eq!(optional_integer("", "Max").unwrap(), None);
        assert_eq!(
            choice::<ProductStatus>("out_of_stock", "Status").unwrap(),
            ProductStatus::OutOfStock
        );
        assert!(choice::<ProductStatus>("gone", "Status").is_err());
        assert!(checkbox(Some("on")));
        assert!(!checkbox(None));
    }
}
