//! Error Types
//!
//! This module defines the error types used throughout the crate.
//!
//! # Overview
//!
//! The main error type [`AnymError`] covers all failure modes including:
//! - Motion document format errors (fatal to the parse call)
//! - Payload validation errors (detected before any mutation or network call)
//! - Remote service and transport errors
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for `std::result::Result<T, AnymError>`.
//!
//! ```rust,ignore
//! use anym_rig::error::{AnymError, Result};
//!
//! fn import() -> Result<()> {
//!     // Operations that may fail return Result
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for the crate.
///
/// Each variant provides specific context about what went wrong.
#[derive(Error, Debug)]
pub enum AnymError {
    // ========================================================================
    // Motion Document Format Errors
    // ========================================================================
    /// The document text is structurally malformed.
    #[error("Malformed motion document: {0}")]
    Format(String),

    /// A joint declares rotation channels in an order that is not one of the
    /// six axis permutations.
    #[error("Invalid rotation channel order for joint '{joint}'")]
    RotationOrder {
        /// Name of the offending joint
        joint: String,
    },

    /// The document declares a frame count other than one.
    #[error("Expected a single-frame motion document, got {declared} frames")]
    FrameCount {
        /// Frame count declared in the document
        declared: usize,
    },

    /// The frame value line does not match the channel sequence (strict mode).
    #[error("Frame value count mismatch: {expected} channels, {actual} values")]
    FrameValueCount {
        /// Number of declared channels
        expected: usize,
        /// Number of values on the frame line
        actual: usize,
    },

    // ========================================================================
    // Skeleton & Rig Errors
    // ========================================================================
    /// A bone required by the operation is missing from the skeleton.
    #[error("Bone not found: {0}")]
    BoneNotFound(String),

    // ========================================================================
    // Request Validation Errors
    // ========================================================================
    /// A request payload failed validation before any state was touched.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Two pose sources claim the same keyframe index.
    #[error("Two or more pose sources have keyframes set on the same frame index ({frame})")]
    DuplicateKeyframe {
        /// The contested frame index
        frame: i32,
    },

    /// No API key configured on the client.
    #[error("No API key set")]
    MissingApiKey,

    // ========================================================================
    // Remote Service Errors
    // ========================================================================
    /// The service returned a non-200 status with a message.
    #[error("Remote service error (status {status}): {message}")]
    Remote {
        /// HTTP status code
        status: u16,
        /// Message extracted from the response body
        message: String,
    },

    /// Nothing is available to fetch yet for this API key.
    #[error(
        "No fetchable animation found. First generate an animation, then unlock it in the Anym previewer."
    )]
    NoExportedAnimation,

    /// The HTTP request never produced a response.
    #[error("Transport error: {0}")]
    Transport(String),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Alias for `Result<T, AnymError>`.
pub type Result<T> = std::result::Result<T, AnymError>;
