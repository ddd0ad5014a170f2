// In: src/error.rs

//! This module defines the single, unified error type for the entire tambak graph core.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.
//!
//! Every failure maps onto one of three classes (see [`ErrorKind`]):
//! * **invalid input** - a structurally impossible request (bad tag, unresolved stream).
//! * **corruption** - a buffer that disagrees with its own declared shape.
//! * **configuration** - a graph that can never run, rejected at build time.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

//==================================================================================
// I. Error Classification
//==================================================================================

/// The coarse error class a caller can branch on without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    Corruption,
    Configuration,
    Other,
}

//==================================================================================
// II. Build-Time Configuration Errors
//==================================================================================

/// Identifies the configuration entry that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "entry", content = "index", rename_all = "snake_case")]
pub enum ConfigEntry {
    Cluster(usize),
    TypeDefault(usize),
}

impl ConfigEntry {
    fn path_prefix(&self) -> String {
        match self {
            ConfigEntry::Cluster(i) => format!("/clusters/{}", i),
            ConfigEntry::TypeDefault(i) => format!("/type_defaults/{}", i),
        }
    }
}

impl fmt::Display for ConfigEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigEntry::Cluster(i) => write!(f, "Cluster {}", i),
            ConfigEntry::TypeDefault(i) => write!(f, "TypeDefault {}", i),
        }
    }
}

/// Identifies the offending field within a configuration entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigField {
    SuccessorIdx,
    ConcatCodecIdx,
    Width,
    MemberTags,
    StreamType,
}

impl ConfigField {
    fn as_str(&self) -> &'static str {
        match self {
            ConfigField::SuccessorIdx => "successor_idx",
            ConfigField::ConcatCodecIdx => "concat_codec_idx",
            ConfigField::Width => "width",
            ConfigField::MemberTags => "member_tags",
            ConfigField::StreamType => "stream_type",
        }
    }
}

/// A defect in a `ClusterConfig`, detected once while the graph is assembled.
///
/// # Display format
///
/// ```text
/// [/clusters/2/successor_idx] Cluster 2 has invalid successor_idx 3 (max allowed: 1)
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("[{path}] {message}")]
pub struct ConfigError {
    pub entry: ConfigEntry,
    pub field: ConfigField,
    /// JSON pointer into the config identifying the offending field.
    pub path: String,
    pub message: String,
}

impl ConfigError {
    pub fn new(entry: ConfigEntry, field: ConfigField, message: impl Into<String>) -> Self {
        Self {
            entry,
            field,
            path: format!("{}/{}", entry.path_prefix(), field.as_str()),
            message: message.into(),
        }
    }
}

//==================================================================================
// III. The Unified Error Type
//==================================================================================

#[allow(non_camel_case_types)]
#[derive(Error, Debug)]
pub enum tambakError {
    // =========================================================================
    // === High-Level, Semantic Errors (Specific to our library's logic)
    // =========================================================================
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Corrupted input: {0}")]
    Corruption(String),

    #[error("Invalid graph configuration: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Unsupported data type for this operation: {0}")]
    UnsupportedType(String),

    #[error("Frame serialization/deserialization failed: {0}")]
    FrameFormatError(String),

    #[error("Internal logic error (this is a bug): {0}")]
    InternalError(String),

    // =========================================================================
    // === External Error Wrappers (Using #[from] for automatic conversion)
    // =========================================================================
    /// An error originating from the Arrow library.
    #[error("Arrow operation failed: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// An error originating from the underlying I/O subsystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error from the Serde JSON library, typically during config or plan serialization.
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    // =========================================================================
    // === Low-Level Kernel Errors
    // =========================================================================
    #[error("Buffer length mismatch: expected a multiple of {0}, got {1}")]
    BufferMismatch(usize, usize),

    #[error("Zstd operation failed: {0}")]
    ZstdError(String),

    #[error("LEB128 decoding error: {0}")]
    Leb128DecodeError(String),

    #[error("Pipeline execution failed at stage '{stage}': {source}")]
    PipelineError {
        stage: String,
        #[source]
        source: Box<tambakError>,
    },
}

impl tambakError {
    /// Classifies this error. Wrapped pipeline errors report the class of their source.
    pub fn kind(&self) -> ErrorKind {
        match self {
            tambakError::InvalidInput(_) | tambakError::BufferMismatch(..) => ErrorKind::InvalidInput,
            tambakError::Corruption(_)
            | tambakError::FrameFormatError(_)
            | tambakError::Leb128DecodeError(_) => ErrorKind::Corruption,
            tambakError::Configuration(_) => ErrorKind::Configuration,
            tambakError::PipelineError { source, .. } => source.kind(),
            _ => ErrorKind::Other,
        }
    }

    /// Wraps an error with the name of the pipeline stage it escaped from.
    pub fn at_stage(self, stage: &str) -> Self {
        tambakError::PipelineError {
            stage: stage.to_string(),
            source: Box::new(self),
        }
    }
}
