//! The manifest transformation pipeline.
//!
//! Stages run in a fixed order: parse, merge defaults, resolve vendor keys,
//! substitute environment placeholders, validate. Validation errors never
//! abort the pipeline; the transformed manifest is always returned so the
//! emitted asset reflects the developer's current state.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::env::{substitute_env_with, EnvSource, ProcessEnv};
use crate::error::{ManifestError, ValidationError};
use crate::validation::validate_manifest;
use crate::vendor::{resolve_vendor_keys, Vendor};

/// Name of the manifest file in the context directory and in the output.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Options for [`ManifestPipeline`].
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Vendor whose keys are kept.
    pub vendor: Vendor,
    /// Keys merged under the parsed manifest.
    pub defaults: Map<String, Value>,
    /// Skip the validation stage entirely.
    pub skip_validation: bool,
}

/// Result of running the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOutput {
    /// The transformed manifest.
    pub manifest: Value,
    /// Validation errors, or `None` when valid or validation was skipped.
    pub errors: Option<Vec<ValidationError>>,
}

impl TransformOutput {
    pub fn is_valid(&self) -> bool {
        self.errors.is_none()
    }
}

/// Runs the manifest stages for one vendor.
#[derive(Debug, Clone, Default)]
pub struct ManifestPipeline {
    options: PipelineOptions,
}

impl ManifestPipeline {
    pub fn new(options: PipelineOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Transforms raw manifest bytes using the process environment.
    pub fn transform(&self, raw: &[u8]) -> Result<TransformOutput, ManifestError> {
        self.transform_with_env(raw, &ProcessEnv)
    }

    /// Transforms raw manifest bytes using `env` for placeholder values.
    pub fn transform_with_env<E: EnvSource + ?Sized>(
        &self,
        raw: &[u8],
        env: &E,
    ) -> Result<TransformOutput, ManifestError> {
        let parsed = parse_manifest(raw)?;
        let merged = merge_defaults(&self.options.defaults, parsed);
        let resolved = resolve_vendor_keys(&merged, self.options.vendor);
        let manifest = substitute_env_with(&resolved, env);

        let errors = if self.options.skip_validation {
            debug!("manifest validation skipped");
            None
        } else {
            validate_manifest(&manifest)
        };

        if let Some(ref errors) = errors {
            for error in errors {
                warn!(path = %error.path, code = %error.code, "{}", error.message);
            }
        }

        Ok(TransformOutput { manifest, errors })
    }
}

/// Parses manifest bytes. The root must be a JSON object.
pub fn parse_manifest(raw: &[u8]) -> Result<Map<String, Value>, ManifestError> {
    match serde_json::from_slice::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ManifestError::Parse(
            "manifest root must be an object".to_string(),
        )),
        Err(e) => Err(ManifestError::Parse(e.to_string())),
    }
}

/// Shallow-merges `defaults` under `manifest`; manifest keys win.
pub fn merge_defaults(defaults: &Map<String, Value>, manifest: Map<String, Value>) -> Value {
    let mut merged = defaults.clone();
    for (key, value) in manifest {
        merged.insert(key, value);
    }
    Value::Object(merged)
}

/// Serializes a manifest for the output asset (2-space indent, key order kept).
pub fn to_pretty_json(manifest: &Value) -> Result<String, ManifestError> {
    Ok(serde_json::to_string_pretty(manifest)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashMap;

    fn defaults(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("defaults must be an object"),
        }
    }

    fn no_env() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn test_parse_error_is_fatal() {
        let pipeline = ManifestPipeline::default();
        let err = pipeline.transform(b"{ not json").unwrap_err();
        assert!(matches!(err, ManifestError::Parse(_)));
        assert!(err.to_string().starts_with("could not parse manifest.json"));
    }

    #[test]
    fn test_non_object_root_is_parse_error() {
        let err = ManifestPipeline::default().transform(b"[1, 2]").unwrap_err();
        assert!(matches!(err, ManifestError::Parse(_)));
    }

    #[test]
    fn test_defaults_merge_under_manifest() {
        let pipeline = ManifestPipeline::new(PipelineOptions {
            defaults: defaults(json!({"author": "me", "version": "0.0.0"})),
            ..Default::default()
        });
        let raw = br#"{"name": "n", "version": "1.0.0", "manifest_version": 3}"#;

        let out = pipeline.transform_with_env(raw, &no_env()).unwrap();
        assert_eq!(
            out.manifest,
            json!({"author": "me", "version": "1.0.0", "name": "n", "manifest_version": 3})
        );
        assert!(out.is_valid());
    }

    #[test]
    fn test_vendor_runs_before_env() {
        let pipeline = ManifestPipeline::new(PipelineOptions {
            vendor: Vendor::Firefox,
            ..Default::default()
        });
        let raw = br#"{
            "name": "n",
            "version": "1",
            "manifest_version": 2,
            "__firefox__description": "__DESCRIPTION__",
            "__chrome__homepage_url": "__HOMEPAGE__"
        }"#;
        let env: HashMap<String, String> =
            [("DESCRIPTION".to_string(), "for firefox".to_string())].into();

        let out = pipeline.transform_with_env(raw, &env).unwrap();
        assert_eq!(out.manifest["description"], "for firefox");
        assert!(out.manifest.get("homepage_url").is_none());
    }

    #[test]
    fn test_validation_errors_do_not_abort() {
        let pipeline = ManifestPipeline::default();
        let out = pipeline
            .transform_with_env(br#"{"name": "n"}"#, &no_env())
            .unwrap();
        assert_eq!(out.manifest, json!({"name": "n"}));
        let errors = out.errors.unwrap();
        assert_eq!(errors[0].code, ErrorCode::MissingField);
    }

    #[test]
    fn test_skip_validation() {
        let pipeline = ManifestPipeline::new(PipelineOptions {
            skip_validation: true,
            ..Default::default()
        });
        let out = pipeline.transform_with_env(b"{}", &no_env()).unwrap();
        assert_eq!(out.errors, None);
    }

    #[test]
    fn test_pretty_json_keeps_order() {
        let manifest = json!({"b": 1, "a": {"d": 2, "c": 3}});
        let text = to_pretty_json(&manifest).unwrap();
        assert_eq!(
            text,
            "{\n  \"b\": 1,\n  \"a\": {\n    \"d\": 2,\n    \"c\": 3\n  }\n}"
        );
    }
}
