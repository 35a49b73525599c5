//! Manifest validation logic.
//!
//! Validation runs in two stages. The `manifest_version` stage checks
//! presence, type, and range, and stops at the first failure. Only a manifest
//! with version 2 or 3 goes on to the schema stage, which reports every
//! violation it finds.

mod schema;


use serde_json::Value;

use crate::error::{ErrorCode, ValidationError};

pub use schema::ManifestVersion;

/// Field holding the manifest format version.
pub const MANIFEST_VERSION_KEY: &str = "manifest_version";

/// Validates a manifest document.
///
/// # Returns
/// * `None` if the manifest is valid.
/// * `Some(errors)` with every collected error otherwise, in check order.
///
/// # Example
/// ```
/// use serde_json::json;
/// use webext_manifest::validation::validate_manifest;
///
/// let manifest = json!({"name": "n", "version": "0.0.1", "manifest_version": 3});
/// assert!(validate_manifest(&manifest).is_none());
///
/// let errors = validate_manifest(&json!({})).unwrap();
/// assert_eq!(errors[0].path, "manifest_version");
/// ```
pub fn validate_manifest(manifest: &Value) -> Option<Vec<ValidationError>> {
    let errors = match check_manifest_version(manifest) {
        Ok(version) => schema::validate_schema(manifest, version),
        Err(error) => vec![error],
    };

    if errors.is_empty() {
        None
    } else {
        Some(errors)
    }
}

/// Checks `manifest_version` and returns the parsed version.
fn check_manifest_version(manifest: &Value) -> Result<ManifestVersion, ValidationError> {
    let value = match manifest.get(MANIFEST_VERSION_KEY) {
        None | Some(Value::Null) => {
            return Err(ValidationError::new(
                ErrorCode::MissingField,
                "manifest_version is required",
                MANIFEST_VERSION_KEY,
            ));
        }
        Some(value) => value,
    };

    let Some(number) = value.as_f64() else {
        return Err(ValidationError::new(
            ErrorCode::WrongType,
            "manifest_version must be a number",
            MANIFEST_VERSION_KEY,
        ));
    };

    if number == 2.0 {
        Ok(ManifestVersion::V2)
    } else if number == 3.0 {
        Ok(ManifestVersion::V3)
    } else {
        Err(ValidationError::new(
            ErrorCode::OutOfRange,
            format!("manifest_version must be 2 or 3, got {}", value),
            MANIFEST_VERSION_KEY,
        ))
    }
}

/// Reads the manifest version without validating the rest of the document.
pub fn manifest_version(manifest: &Value) -> Option<ManifestVersion> {
    check_manifest_version(manifest).ok()
}
