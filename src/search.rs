//! Filter normalization and pagination shared by the search endpoints.
//!
//! Every search surface takes its filters as optional raw strings, runs them
//! through the helpers here, and hands the normalized result to the SQL
//! layer. Absent fields never reach the predicate; present fields must parse
//! or the whole request is rejected.

use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::AppError;

//////////////////////////////////////////////// Page ///////////////////////////////////////////////

/// Validated pagination window. Defaults to the first ten rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub from: i64,
    pub size: i64,
}

impl Page {
    /// Normalizes optional `from`/`size` parameters, applying the 0/10
    /// defaults and rejecting negative offsets and non-positive sizes.
    pub fn new(from: Option<i64>, size: Option<i64>) -> Result<Page, AppError> {
        let from = from.unwrap_or(0);
        let size = size.unwrap_or(10);
        if from < 0 {
            return Err(AppError::invalid_input("from must not be negative"));
        }
        if size <= 0 {
            return Err(AppError::invalid_input("size must be positive"));
        }
        Ok(Page { from, size })
    }
}

impl Default for Page {
    fn default() -> Self {
        Page { from: 0, size: 10 }
    }
}

////////////////////////////////////////////// TimeRange /////////////////////////////////////////////

/// Half-open-ended timestamp window. Both bounds are strict when present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// Parses optional RFC 3339 bounds.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<TimeRange, AppError> {
        Ok(TimeRange {
            start: parse_timestamp(start, "startDateTime")?,
            end: parse_timestamp(end, "endDateTime")?,
        })
    }

    /// True when either bound is present, which switches result ordering to
    /// the filtered timestamp field.
    pub fn is_constrained(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }
}

fn parse_timestamp(
    value: Option<&str>,
    field: &str,
) -> Result<Option<DateTime<Utc>>, AppError> {
    match value {
        None => Ok(None),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|ts| Some(ts.with_timezone(&Utc)))
            .map_err(|_| {
                AppError::invalid_input(format!("{} must be an RFC 3339 timestamp", field))
            }),
    }
}

/// Parses an optional enumerated filter value, mapping unrecognized values
/// to `InvalidInput` rather than silently dropping them.
pub fn parse_enum_filter<T>(value: Option<&str>, field: &str) -> Result<Option<T>, AppError>
where
    T: FromStr,
{
    match value {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| AppError::invalid_input(format!("{} is not a recognized {}", raw, field))),
    }
}

/// Validates an optional reference-ID filter as a positive integer.
pub fn parse_id_filter(value: Option<i32>, field: &str) -> Result<Option<i32>, AppError> {
    match value {
        None => Ok(None),
        Some(id) if id > 0 => Ok(Some(id)),
        Some(_) => Err(AppError::invalid_input(format!(
            "{} must be a positive id",
            field
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Gender, LifeStatus};

    #[test]
    fn page_defaults() {
        let page = Page::new(None, None).unwrap();
        assert_eq!(page, Page { from: 0, size: 10 });
        assert_eq!(Page::default(), page);
    }

    #[test]
    fn page_rejects_negative_from() {
        let err = Page::new(Some(-1), None).unwrap_err();
        assert_eq!(err, AppError::invalid_input("from must not be negative"));
    }

    #[test]
    fn page_rejects_zero_size() {
        let err = Page::new(None, Some(0)).unwrap_err();
        assert_eq!(err, AppError::invalid_input("size must be positive"));
        assert!(Page::new(None, Some(-5)).is_err());
    }

    #[test]
    fn page_accepts_explicit_window() {
        let page = Page::new(Some(20), Some(5)).unwrap();
        assert_eq!(page, Page { from: 20, size: 5 });
    }

    #[test]
    fn time_range_parses_rfc3339() {
        let range =
            TimeRange::parse(Some("2023-01-01T00:00:00Z"), Some("2023-06-01T12:30:00+03:00"))
                .unwrap();
        assert!(range.is_constrained());
        assert_eq!(range.start.unwrap().to_rfc3339(), "2023-01-01T00:00:00+00:00");
    }

    #[test]
    fn time_range_rejects_garbage() {
        assert!(TimeRange::parse(Some("yesterday"), None).is_err());
        assert!(TimeRange::parse(None, Some("2023-13-40")).is_err());
    }

    #[test]
    fn empty_time_range_is_unconstrained() {
        let range = TimeRange::parse(None, None).unwrap();
        assert!(!range.is_constrained());
    }

    #[test]
    fn enum_filter_parses_known_values() {
        let gender: Option<Gender> = parse_enum_filter(Some("FEMALE"), "gender").unwrap();
        assert_eq!(gender, Some(Gender::Female));
        let status: Option<LifeStatus> = parse_enum_filter(None, "lifeStatus").unwrap();
        assert_eq!(status, None);
    }

    #[test]
    fn enum_filter_rejects_unknown_values() {
        let err = parse_enum_filter::<Gender>(Some("NEUTRAL"), "gender").unwrap_err();
        assert_eq!(
            err,
            AppError::invalid_input("NEUTRAL is not a recognized gender")
        );
    }

    #[test]
    fn id_filter_requires_positive() {
        assert_eq!(parse_id_filter(Some(3), "chipperId").unwrap(), Some(3));
        assert!(parse_id_filter(Some(0), "chipperId").is_err());
        assert!(parse_id_filter(Some(-2), "chipperId").is_err());
        assert_eq!(parse_id_filter(None, "chipperId").unwrap(), None);
    }
}
