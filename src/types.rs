//! Core types shared across the upload pipeline.

/// Opaque identifier assigned by the remote store to a folder or file.
pub type ResourceId = String;
