//! Error types for the lens engine.
//!
//! All fallible operations happen at load time: a prescription is validated
//! once when built and a camera configuration is solved once per focus
//! change. Per-ray outcomes (miss, clip, total internal reflection) are
//! ordinary trace results and never surface as errors.

use thiserror::Error;

/// Convenience type alias for results in this crate.
pub type Result<T> = std::result::Result<T, LensError>;

/// Errors that can occur while building a prescription or solving a lens
/// configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LensError {
    /// The prescription itself is malformed (missing or duplicate stop,
    /// radius inconsistent with the surface type, focus-variable surface
    /// that is not an air gap, too many surfaces).
    #[error("invalid prescription: {message}")]
    Configuration { message: String },

    /// The prescription is well formed but has no usable paraxial solution
    /// for the requested configuration (afocal system, degenerate rear
    /// subsystem, focus distance with no real conjugate).
    #[error("degenerate optical configuration: {message}")]
    OpticalConfiguration { message: String },
}

impl LensError {
    /// Shorthand for a `Configuration` error.
    ///
    /// * `message` - Description of the violation.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Shorthand for an `OpticalConfiguration` error.
    ///
    /// * `message` - Description of the degeneracy.
    pub fn optical(message: impl Into<String>) -> Self {
        Self::OpticalConfiguration {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_message() {
        let err = LensError::configuration("two stops");
        assert_eq!(err.to_string(), "invalid prescription: two stops");

        let err = LensError::optical("afocal system");
        assert_eq!(
            err.to_string(),
            "degenerate optical configuration: afocal system"
        );
    }
}
