//! Shared test utilities for geocat tests.
//!
//! This crate provides:
//! - [`MemoryHost`]: In-memory host session with operation recording
//! - [`StaticNetwork`]: Canned capability responses keyed by URL
//! - [`RecordingWriter`]: Offline writer producing real files on disk
//! - [`TestHarness`]: Pre-configured collaborator set
//!
//! # Example
//!
//! ```rust,ignore
//! use geocat_test_utils::{TestHarness, wms_capabilities};
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let harness = TestHarness::new();
//!     harness.network.respond("http://example.org/wms?REQUEST=GetCapabilities&SERVICE=WMS", wms_capabilities());
//!     let mut service = harness.service();
//!     // ... run test ...
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
// Test utilities use expect/unwrap for cleaner test code - panics are acceptable in tests
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

pub mod fixtures;
pub mod host;
pub mod net;
pub mod writer;

pub use fixtures::*;
pub use host::*;
pub use net::*;
pub use writer::*;

/// Initialize test logging (call once per test module).
pub fn init_test_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("geocat=debug".parse().expect("valid directive")),
        )
        .with_test_writer()
        .try_init();
}
