//! Driveup: one-way mirror of a local video tree into a remote drive.
//!
//! Walks a local directory tree, uploads files that are not already present
//! in the matching remote folder, and moves successfully uploaded files into
//! a parallel "uploaded" tree. Existence checks are name-based only; remote
//! content is never updated or deleted.

pub mod config;
pub mod dedupe;
pub mod dispatcher;
pub mod drive;
pub mod error;
pub mod logging;
pub mod resolver;
pub mod types;
pub mod uploader;
