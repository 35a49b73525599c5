//! Validate command implementation
//!
//! Runs defaults merge, vendor resolution, and environment substitution on a
//! manifest, then reports validation errors.

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;
use webext_manifest::{ManifestPipeline, PipelineOptions, ValidationError};

/// Error codes for failures that happen before validation.
pub mod error_codes {
    /// Manifest file could not be read
    pub const FILE_READ: &str = "CLI_001";
    /// Manifest is not a JSON object
    pub const JSON_PARSE: &str = "CLI_002";
}

/// A structured error in JSON output.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct JsonError {
    /// Stable error code ("V001".."V004" or "CLI_00x")
    pub code: String,
    pub message: String,
    /// JSON path to the problematic field (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl From<&ValidationError> for JsonError {
    fn from(error: &ValidationError) -> Self {
        Self {
            code: error.code.code().to_string(),
            message: error.message.clone(),
            path: Some(error.path.clone()),
        }
    }
}

/// Output of `validate --json`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ValidateOutput {
    pub ok: bool,
    pub vendor: String,
    pub errors: Vec<JsonError>,
}

/// Validates raw manifest bytes.
pub fn validate_bytes(raw: &[u8], options: PipelineOptions) -> ValidateOutput {
    let vendor = options.vendor.to_string();
    let pipeline = ManifestPipeline::new(PipelineOptions {
        skip_validation: false,
        ..options
    });

    match pipeline.transform(raw) {
        Ok(output) => {
            let errors: Vec<JsonError> = output
                .errors
                .iter()
                .flatten()
                .map(JsonError::from)
                .collect();
            ValidateOutput {
                ok: errors.is_empty(),
                vendor,
                errors,
            }
        }
        Err(e) => ValidateOutput {
            ok: false,
            vendor,
            errors: vec![JsonError {
                code: error_codes::JSON_PARSE.to_string(),
                message: e.to_string(),
                path: None,
            }],
        },
    }
}

/// Run the validate command
///
/// # Returns
/// Exit code: 0 if valid, 1 if invalid
pub fn run(manifest_path: &Path, options: PipelineOptions, json_output: bool) -> Result<ExitCode> {
    if json_output {
        run_json(manifest_path, options)
    } else {
        run_human(manifest_path, options)
    }
}

fn run_human(manifest_path: &Path, options: PipelineOptions) -> Result<ExitCode> {
    let start = Instant::now();
    println!(
        "{} {} ({})",
        "Validating:".cyan().bold(),
        manifest_path.display(),
        options.vendor
    );

    let raw = std::fs::read(manifest_path)
        .with_context(|| format!("Failed to read manifest: {}", manifest_path.display()))?;
    let output = validate_bytes(&raw, options);
    let duration_ms = start.elapsed().as_millis() as u64;

    for error in &output.errors {
        let location = error
            .path
            .as_ref()
            .map(|p| format!(" at {}", p))
            .unwrap_or_default();
        println!(
            "  {} [{}]{}: {}",
            "x".red(),
            error.code,
            location.dimmed(),
            error.message
        );
    }

    if output.ok {
        println!(
            "\n{} Manifest is valid ({}ms)",
            "SUCCESS".green().bold(),
            duration_ms
        );
        Ok(ExitCode::SUCCESS)
    } else {
        println!(
            "\n{} Manifest has {} error(s) ({}ms)",
            "FAILED".red().bold(),
            output.errors.len(),
            duration_ms
        );
        Ok(ExitCode::from(1))
    }
}

fn run_json(manifest_path: &Path, options: PipelineOptions) -> Result<ExitCode> {
    let output = match std::fs::read(manifest_path) {
        Ok(raw) => validate_bytes(&raw, options),
        Err(e) => ValidateOutput {
            ok: false,
            vendor: options.vendor.to_string(),
            errors: vec![JsonError {
                code: error_codes::FILE_READ.to_string(),
                message: format!("Failed to read {}: {}", manifest_path.display(), e),
                path: None,
            }],
        },
    };

    let json = serde_json::to_string_pretty(&output).context("Failed to serialize output")?;
    println!("{}", json);

    Ok(if output.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}
