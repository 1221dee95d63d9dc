//! `campuslens` - A campus activity dashboard API
//!
//! This library provides the store, query layer and HTTP API behind the
//! campus dashboard: profile, activity and Wi-Fi records are bulk-imported
//! from CSV into `SQLite` and served read-only as JSON.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod faces;
pub mod logging;
pub mod model;
pub mod ranking;
pub mod server;
pub mod storage;
pub mod timestamp;
pub mod views;

pub use config::Config;
pub use error::{ApiError, Error, Result};
pub use faces::FaceImages;
pub use logging::init_logging;
pub use storage::{Dataset, ImportSummary, Store, TimelineQuery};
