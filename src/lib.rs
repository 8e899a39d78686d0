//! Dropbox Connector Parity Harness
//!
//! Validates an ESB connector mediating between its clients and the
//! Dropbox REST API v2. Every scenario issues a request through the proxy
//! and an equivalent direct API call, then asserts the two responses agree
//! on status codes, body fields, and error tags.
//!
//! # Components
//!
//! - **REST helper**: send one JSON request, wrap the response for
//!   field-level comparison
//! - **Fixtures**: JSON request templates parameterized from a shared
//!   property bag
//! - **Upload helper**: file bytes through the proxy's uploadFile action
//! - **Sequencer**: priority- and dependency-ordered sequential execution,
//!   skipping dependents of failed steps
//! - **Scenarios**: the Dropbox operation corpus (createFolder, uploadFile,
//!   getTemporaryLink, copy, getMetadata, createSharedLinkWithSettings,
//!   listRevisions, search, move, delete, restoreFile)
//!
//! # Example
//!
//! ```no_run
//! use dropbox_connector_harness::config::HarnessConfig;
//! use dropbox_connector_harness::scenarios::{parity_plan, HarnessContext};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = HarnessConfig::load("harness.yaml")?;
//!     let ctx = HarnessContext::new(config)?;
//!     let report = parity_plan()?.run(&ctx).await;
//!     assert!(report.all_passed());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod fixture;
pub mod rest;
pub mod scenarios;
pub mod sequence;
pub mod upload;

// Re-export commonly used types
pub use config::HarnessConfig;
pub use rest::{RestClient, RestResponse};
pub use scenarios::HarnessContext;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
