use serde_json::Value;
use thiserror::Error;

use crate::psdle::DateField;

/// Problems with the export's items that make filtering impossible.
///
/// Any of these aborts the whole run: a document with inconsistent dates
/// is never filtered partially.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("JSON data does not contain {} (property \"{}\"). Cannot filter.", .field.label(), .field.key())]
    MissingField { field: DateField },

    #[error("{} \"{value}\" is not a valid date-time (property \"{}\")", .field.label(), .field.key())]
    InvalidDate {
        field: DateField,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("{} is not a string but {value} (property \"{}\")", .field.label(), .field.key())]
    NotAString { field: DateField, value: Value },
}
