//! Error types for the resource registry.
//!
//! Most failures inside the registry are recovered locally: a missing or
//! unreadable encoding resource is reported as an absence, and a font that
//! cannot be located falls through to substitution. The variants here are
//! what loaders and resolution steps report upward before that recovery
//! happens, plus the one condition that always reaches the caller:
//! [`Error::FatalFallbackMissing`].

use crate::fonts::sfnt::ExtractError;

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while locating or loading resources.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No file for the resource exists at any known path
    #[error("{kind} resource not found: '{name}'")]
    ResourceNotFound {
        /// Resource namespace
        kind: ResourceKind,
        /// Requested key
        name: String,
    },

    /// The resource file existed but could not be loaded
    #[error("Failed to load {kind} resource '{name}': {reason}")]
    ResourceLoad {
        /// Resource namespace
        kind: ResourceKind,
        /// Requested key
        name: String,
        /// Reason reported by the loader
        reason: String,
    },

    /// The platform font service has no usable font under this name
    #[error("Font not found: '{0}'")]
    FontNotFound(String),

    /// Rebuilding a standalone font file failed
    #[error("Font extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    /// Not even the substitute font could be resolved.
    ///
    /// This is a deployment problem (the fallback family is not installed
    /// or not registered), not a property of the document being rendered.
    #[error("Fallback font '{fallback}' (substitute for '{requested}') could not be resolved")]
    FatalFallbackMissing {
        /// Name originally requested by the document
        requested: String,
        /// Fallback family member that failed to resolve
        fallback: String,
    },

    /// A setting was given a value it does not accept
    #[error("Invalid value '{value}' for setting '{name}'")]
    InvalidSetting {
        /// Setting name
        name: &'static str,
        /// Rejected value
        value: String,
    },
}

/// Namespaces of cached encoding resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Character collection to Unicode
    CidToUnicode,
    /// Unicode-to-Unicode remapping for a font name pattern
    UnicodeToUnicode,
    /// Unicode to output encoding
    UnicodeMap,
    /// Character code to CID
    CMap,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResourceKind::CidToUnicode => "CIDToUnicode",
            ResourceKind::UnicodeToUnicode => "UnicodeToUnicode",
            ResourceKind::UnicodeMap => "UnicodeMap",
            ResourceKind::CMap => "CMap",
        };
        f.write_str(name)
    }
}

impl Error {
    /// True when the error only means "this resource is not there".
    pub fn is_miss(&self) -> bool {
        matches!(self, Error::ResourceNotFound { .. } | Error::FontNotFound(_))
    }
}
