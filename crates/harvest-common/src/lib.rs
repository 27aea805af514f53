//! Harvest Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the Harvest project.
//!
//! # Overview
//!
//! Functionality shared across the Harvest workspace members:
//!
//! - **error**: the [`HarvestError`] type and [`Result`] alias
//! - **checksum**: content fingerprinting for downloaded payloads
//! - **compress**: gzip sniffing and decompression
//! - **logging**: tracing setup for the binaries
//!
//! # Example
//!
//! ```no_run
//! use harvest_common::Result;
//! use harvest_common::checksum::Checksum;
//!
//! fn fingerprint_file(path: &str) -> Result<()> {
//!     let fingerprint = Checksum::from_file(path)?;
//!     tracing::info!(%fingerprint, "content staged");
//!     Ok(())
//! }
//! ```

pub mod checksum;
pub mod compress;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{HarvestError, Result};
