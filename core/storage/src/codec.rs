//! Import/export of the portable JSON document.

use serde_json::Value;

use quotesync_common::{Collection, Error, Quote, Result};

/// Base filename used when the collection is exported as a file.
pub const EXPORT_FILE_NAME: &str = "quotes.json";

/// Serialize the full collection as a pretty-printed JSON array.
pub fn export(collection: &Collection) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(collection).map_err(|e| Error::Serialization(e.to_string()))
}

/// Validate and parse an externally supplied document.
///
/// The document must be a JSON array whose every element is a valid quote
/// after trimming. Validation is all-or-nothing: on any error no quote is
/// returned.
///
/// # Errors
/// - `Error::Validation("not a sequence")` if the top level is not an array
/// - `Error::Validation` naming the first invalid element otherwise
pub fn import(bytes: &[u8]) -> Result<Vec<Quote>> {
    let document: Value = serde_json::from_slice(bytes)
        .map_err(|e| Error::Validation(format!("malformed document: {}", e)))?;

    let Value::Array(elements) = document else {
        return Err(Error::Validation("not a sequence".to_string()));
    };

    elements
        .into_iter()
        .enumerate()
        .map(|(index, element)| {
            serde_json::from_value::<Quote>(element)
                .map_err(|e| Error::Validation(format!("element {}: {}", index, e)))
        })
        .collect()
}
