//! # Error Handling
//!
//! Provides the unified `AppError` enum used across the workspace.
//! Every variant is terminal: the pipeline aborts on the first one it meets.

use crate::registry::SchemaLocation;
use derive_more::Display;
use std::path::PathBuf;

/// The Global Error Enum.
///
/// Each variant carries enough context (document location, reference text or
/// offending title) to fix the input without re-running with extra logging.
#[derive(Debug, Display)]
pub enum AppError {
    /// The input document could not be read or parsed.
    #[display("Failed to load '{source}': {reason}")]
    Load {
        /// Path of the document, or `<inline>` for in-memory text.
        source: String,
        /// Underlying parser or filesystem message.
        reason: String,
    },

    /// A `$ref` points at something that does not exist in the document.
    #[display("Dangling reference '{reference}': {reason}")]
    DanglingReference {
        /// The raw `$ref` text.
        reference: String,
        /// Why the target could not be reached.
        reason: String,
    },

    /// A reference chain revisits a target that is still being expanded.
    #[display("Circular reference: {}", chain.join(" -> "))]
    CircularReference {
        /// Locators forming the cycle, first and last being the same target.
        chain: Vec<String>,
    },

    /// Strict collection met a schema without a `title`.
    #[display("Schema requires a title under {location}")]
    MissingTitle {
        /// Where the untitled schema was found.
        location: SchemaLocation,
    },

    /// A composite names a source schema that is not in the registry.
    #[display(
        "Unknown schema '{title}' in composite '{composite}' (known: [{}])",
        known.join(", ")
    )]
    UnknownSchema {
        /// The missing source title.
        title: String,
        /// The composite being synthesized.
        composite: String,
        /// Titles present in the registry at composition time.
        known: Vec<String>,
    },

    /// The output location could not be created or written.
    #[display("Failed to write '{}': {source}", path.display())]
    Write {
        /// The directory or file involved.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Write { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Helper type alias for Result using AppError.
pub type AppResult<T> = Result<T, AppError>;
