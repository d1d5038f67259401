//! # Hoover Testkit
//!
//! Test utilities for the sticker hoover.
//!
//! This crate provides:
//! - Fixtures wiring a rollover machine or a pipeline to in-memory fakes
//! - A scripted resizer
//! - Property-based test generators using proptest
//! - Stress helpers for concurrent producers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hoover_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn test_with_pipeline() {
//!     let pipeline = TestPipeline::start(test_config(2, 2), PipelineConfig::immediate()).await;
//!     pipeline.handle.submit(sticker("a", MediaKind::Static)).unwrap();
//!     // ... assertions
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
