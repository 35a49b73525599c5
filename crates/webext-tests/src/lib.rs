//! webext End-to-End Test Infrastructure
//!
//! Integration tests live under `tests/`:
//!
//! - `e2e_pipeline`: fixture extension directories built through a
//!   [`BuildSession`](webext_cli::BuildSession) and the filesystem host
//! - `reload_serve`: the reload server and coordinator talking over a real
//!   socket
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p webext-tests
//! ```

pub mod fixtures;
pub mod harness;
