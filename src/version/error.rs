use thiserror::Error;

/// Why a version string was rejected by [`parse_version`](crate::version::semver::parse_version)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatReason {
    /// More than one `-` in the version string
    MultipleHyphens,
    /// The main part does not have exactly three dot-separated components
    NotThreeComponents,
    /// major, minor or patch contains something other than ASCII digits
    NonDigitComponent,
    /// Two pre-release separators are adjacent, or the tail starts/ends with a dot
    AdjacentDots,
    /// A numeric component does not fit in 64 bits
    Overflow,
}

impl std::fmt::Display for FormatReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            FormatReason::MultipleHyphens => "only one hyphen allowed",
            FormatReason::NotThreeComponents => "must match X.Y.Z",
            FormatReason::NonDigitComponent => "non-digit characters in major.minor.patch",
            FormatReason::AdjacentDots => "adjacent dot separators not allowed",
            FormatReason::Overflow => "numeric component exceeds 64 bits",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid version '{version}': {reason}")]
pub struct VersionFormatError {
    pub version: String,
    pub reason: FormatReason,
}

impl VersionFormatError {
    pub fn new(version: &str, reason: FormatReason) -> Self {
        Self {
            version: version.to_string(),
            reason,
        }
    }
}
