//! Browser extension manifest transforms and validation.
//!
//! This crate rewrites a `manifest.json` document for one browser vendor and
//! the current environment, validates it against the manifest v2/v3 rules,
//! and injects the live-reload client into its background entry point.
//!
//! # Example
//!
//! ```
//! use webext_manifest::{ManifestPipeline, PipelineOptions, Vendor};
//!
//! let pipeline = ManifestPipeline::new(PipelineOptions {
//!     vendor: Vendor::Firefox,
//!     ..Default::default()
//! });
//!
//! let raw = br#"{
//!     "name": "left-pad",
//!     "version": "1.0.0",
//!     "manifest_version": 2,
//!     "__firefox__browser_specific_settings": {"gecko": {"id": "pad@example.org"}},
//!     "__chrome__minimum_chrome_version": "88"
//! }"#;
//!
//! let output = pipeline.transform(raw).unwrap();
//! assert!(output.is_valid());
//! assert!(output.manifest.get("browser_specific_settings").is_some());
//! assert!(output.manifest.get("minimum_chrome_version").is_none());
//! ```
//!
//! # Modules
//!
//! - [`vendor`]: vendor-scoped key resolution
//! - [`env`]: `__NAME__` environment placeholders
//! - [`validation`]: manifest v2/v3 validation
//! - [`pipeline`]: the ordered transform pipeline
//! - [`background`]: live-reload client injection
//! - [`deps`]: files referenced by a manifest
//! - [`host`]: file and asset capabilities supplied by the build host

pub mod background;
pub mod deps;
pub mod env;
pub mod error;
pub mod host;
pub mod pipeline;
pub mod validation;
pub mod vendor;

// Re-export commonly used types at the crate root
pub use background::{
    insert_script_tag, render_bootstrap, BackgroundInjector, BootstrapSettings, Injection,
    CLIENT_ASSET_PATH,
};
pub use deps::manifest_file_deps;
pub use env::{substitute_env, substitute_env_with, EnvSource, ProcessEnv};
pub use error::{ErrorCode, InjectError, ManifestError, ValidationError};
pub use host::AssetHost;
pub use pipeline::{
    merge_defaults, parse_manifest, to_pretty_json, ManifestPipeline, PipelineOptions,
    TransformOutput, MANIFEST_FILE_NAME,
};
pub use validation::{validate_manifest, ManifestVersion};
pub use vendor::{resolve_vendor_keys, UnknownVendor, Vendor};
