//! # docsync testkit
//!
//! Test utilities for docsync.
//!
//! This crate provides:
//! - A recording connection provider that counts store calls and injects
//!   failures
//! - Engine and schema fixtures
//! - Property-based test generators using proptest
//! - JSON helpers for building documents
//! - Tracing setup for tests
//!
//! ## Usage
//!
//! ```rust
//! use docsync_testkit::prelude::*;
//! use docsync_core::{doc, SyncOptions};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let engine = TestEngine::new();
//! let mut user = engine.entity(&schemas::users(), doc! { "username" => "me" });
//! user.sync(None, SyncOptions::new()).await.unwrap();
//!
//! assert_eq!(engine.store.count(StoreOp::Insert), 1);
//! # });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod json;
pub mod logging;
pub mod recording;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::json::*;
    pub use crate::logging::*;
    pub use crate::recording::*;
}

pub use fixtures::*;
pub use generators::*;
pub use json::*;
pub use logging::*;
pub use recording::*;
