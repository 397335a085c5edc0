//! Version parsing and comparison
//!
//! # Modules
//!
//! - [`semver`]: Parses `major.minor.patch[-preRelease]` strings into [`ParsedVersion`]
//! - [`compare`]: Operator-driven partial-order comparison with configurable
//!   pre-release handling
//! - [`error`]: [`VersionFormatError`] for malformed version strings

pub mod compare;
pub mod error;
pub mod semver;

pub use compare::{
    CompareOutcome, Operator, PreReleasePolicy, PreReleaseSetting, compare_scalar, compare_semver,
};
pub use error::{FormatReason, VersionFormatError};
pub use semver::{ParsedVersion, PreRelease, Segment, parse_version};
