//! Build command implementation
//!
//! Runs the manifest pipeline once and writes `manifest.json` to the output
//! directory.

use anyhow::Result;
use colored::Colorize;
use std::process::ExitCode;

use crate::config::Config;
use crate::host::FsHost;
use crate::session::BuildSession;

/// Run the build command
///
/// # Returns
/// Exit code: 0 when the manifest was written (even with validation
/// warnings); errors bubble up for parse and I/O failures
pub fn run(config: Config) -> Result<ExitCode> {
    super::runtime()?.block_on(build(config))
}

async fn build(config: Config) -> Result<ExitCode> {
    let vendor = config.vendor;
    let mut session = BuildSession::new(config);
    let host = FsHost::new(session.out_dir());

    println!(
        "{} {} ({})",
        "Building:".cyan().bold(),
        session.manifest_path().display(),
        vendor
    );

    let output = session.on_before_emit(&host).await?;
    session.on_after_compile(&host);

    let warnings = output
        .as_ref()
        .and_then(|o| o.errors.as_ref())
        .map_or(0, Vec::len);
    let target = session.out_dir().join(webext_manifest::MANIFEST_FILE_NAME);
    if warnings == 0 {
        println!("{} {}", "SUCCESS".green().bold(), target.display());
    } else {
        println!(
            "{} {} ({} validation warning(s))",
            "WROTE".yellow().bold(),
            target.display(),
            warnings
        );
    }

    Ok(ExitCode::SUCCESS)
}
