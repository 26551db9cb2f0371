//! Staged build pipeline that packages an application into per-platform
//! release artifacts.
//!
//! A run reads the repository's `package.json` and `stagehand.json`, then
//! executes a fixed sequence of stages:
//!
//! 1. clean the staging tree;
//! 2. copy the source tree into it, skipping ignored paths;
//! 3. minify the configured targets;
//! 4. install dependencies, seeded from a cached snapshot when present;
//! 5. bump the patch version in memory;
//! 6. package and archive every platform concurrently;
//! 7. persist the manifest, snapshot the dependency cache and clean up.
//!
//! The first failing stage stops the run. The bumped version is written back
//! only after every platform packaged successfully.
//!
//! # Modules
//!
//! - [`archive`] - Zip archiving of packaged output
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - `stagehand.json` loading and defaults
//! - [`confirm`] - Interactive confirmation before a build
//! - [`dependencies`] - Dependency installation and the dependency cache
//! - [`environment`] - Pre-flight repository validation
//! - [`error`] - Error types grouped by when they occur
//! - [`executor`] - External process execution
//! - [`flow`] - The end-to-end flow behind the CLI
//! - [`manifest`] - `package.json` handling and version bumping
//! - [`matcher`] - Exclusion rules and path matching
//! - [`minify`] - Minification of staged sources
//! - [`output`] - Operator-facing output formatting
//! - [`packager`] - Per-platform application packaging
//! - [`pipeline`] - Stage orchestration and per-run state
//! - [`platform`] - Supported packaging targets
//! - [`stage`] - Stage names and the stage runner
//! - [`staging`] - Filesystem work for the staging tree
//! - [`tracker`] - Completion tracking for platform jobs

pub mod archive;
pub mod cli;
pub mod config;
pub mod confirm;
pub mod dependencies;
pub mod environment;
pub mod error;
pub mod executor;
pub mod flow;
pub mod manifest;
pub mod matcher;
pub mod minify;
pub mod output;
pub mod packager;
pub mod pipeline;
pub mod platform;
pub mod stage;
pub mod staging;
pub mod tracker;

#[cfg(test)]
mod test_utils;

pub use error::{PipelineError, Result};
