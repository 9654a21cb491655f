use chrono::{DateTime, FixedOffset, ParseError};
use log::debug;
use serde_json::Value;

use crate::error::DataError;
use crate::psdle::{DateField, Item};

/// Format of every date-time in a PSDLE export and on the command line.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Parses `2019-08-23T15:36:12+0000`. A trailing `Z` stands for `+0000`.
pub fn parse_date_time(s: &str) -> Result<DateTime<FixedOffset>, ParseError> {
    match s.strip_suffix('Z') {
        Some(utc) => DateTime::parse_from_str(&format!("{utc}+0000"), DATE_TIME_FORMAT),
        None => DateTime::parse_from_str(s, DATE_TIME_FORMAT),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterCriteria {
    field: DateField,
    since: Option<DateTime<FixedOffset>>,
    before: Option<DateTime<FixedOffset>>,
}

impl FilterCriteria {
    /// Returns `None` unless at least one bound is given.
    pub fn new(
        field: DateField,
        since: Option<DateTime<FixedOffset>>,
        before: Option<DateTime<FixedOffset>>,
    ) -> Option<Self> {
        if since.is_none() && before.is_none() {
            return None;
        }

        Some(Self {
            field,
            since,
            before,
        })
    }

    pub fn field(&self) -> DateField {
        self.field
    }

    /// `since` is inclusive, `before` is exclusive.
    pub fn admits(&self, date: DateTime<FixedOffset>) -> bool {
        if self.since.is_some_and(|since| date < since) {
            return false;
        }

        if self.before.is_some_and(|before| date >= before) {
            return false;
        }

        true
    }
}

/// Decides whether `item` survives the filter.
pub fn keep(item: &Item, criteria: &FilterCriteria) -> Result<bool, DataError> {
    let field = criteria.field();

    let raw = match item.date_value(field) {
        Some(Value::String(raw)) => raw,
        Some(other) => {
            return Err(DataError::NotAString {
                field,
                value: other.clone(),
            })
        }
        None => return Err(DataError::MissingField { field }),
    };

    let date = parse_date_time(raw).map_err(|source| DataError::InvalidDate {
        field,
        value: raw.clone(),
        source,
    })?;

    Ok(criteria.admits(date))
}

/// Filters `items` in place, keeping their order.
///
/// Every item is checked before anything is removed, so on error `items`
/// is left untouched.
pub fn filter_items(items: &mut Vec<Item>, criteria: &FilterCriteria) -> Result<(), DataError> {
    let decisions = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            keep(item, criteria).inspect_err(|e| debug!("item {}: {}", index + 1, e))
        })
        .collect::<Result<Vec<bool>, DataError>>()?;

    let mut decisions = decisions.into_iter();
    items.retain(|_| decisions.next().unwrap_or(false));

    Ok(())
}
