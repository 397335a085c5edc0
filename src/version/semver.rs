//! Relaxed SemVer-like version parsing
//!
//! Accepts `major.minor.patch[-preRelease]` where the main triple is digits only
//! and the pre-release tail is an arbitrary dot-separated list. Unlike SemVer,
//! a leading non-numeric pre-release identifier is split off as a *tag*, and the
//! remaining identifiers are kept as typed segments.

use std::fmt;

use crate::version::error::{FormatReason, VersionFormatError};

/// A single pre-release identifier after coercion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Number(u64),
    Text(String),
}

impl Segment {
    /// Coerce a raw identifier: digits-only becomes a number, anything else stays text.
    fn coerce(raw: &str, version: &str) -> Result<Self, VersionFormatError> {
        if is_digits(raw) {
            parse_number(raw, version).map(Segment::Number)
        } else {
            Ok(Segment::Text(raw.to_string()))
        }
    }

    pub fn as_number(&self) -> Option<u64> {
        match self {
            Segment::Number(n) => Some(*n),
            Segment::Text(_) => None,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Number(n) => write!(f, "{}", n),
            Segment::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for Segment {
    fn from(n: u64) -> Self {
        Segment::Number(n)
    }
}

impl From<&str> for Segment {
    fn from(s: &str) -> Self {
        Segment::Text(s.to_string())
    }
}

/// Pre-release part of a version (everything after the `-`)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PreRelease {
    /// Leading non-numeric identifier, e.g. `beta` in `beta.1`
    pub tag: Option<String>,
    /// Remaining identifiers; `None` when there are none
    pub segments: Option<Vec<Segment>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre_release: Option<PreRelease>,
}

impl ParsedVersion {
    pub fn tag(&self) -> Option<&str> {
        self.pre_release.as_ref().and_then(|p| p.tag.as_deref())
    }

    pub fn segments(&self) -> Option<&[Segment]> {
        self.pre_release
            .as_ref()
            .and_then(|p| p.segments.as_deref())
    }
}

impl std::str::FromStr for ParsedVersion {
    type Err = VersionFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_version(s)
    }
}

/// Parse a version string into its structured form.
///
/// Examples:
/// - "1.5.6" -> 1, 5, 6 without pre-release
/// - "1.5.6-latest.1.2" -> tag "latest", segments [1, 2]
/// - "1.5.6-1.rc" -> no tag, segments [1, "rc"]
pub fn parse_version(version: &str) -> Result<ParsedVersion, VersionFormatError> {
    let mut parts = version.split('-');
    let main = parts.next().unwrap_or_default();
    let pre = parts.next();
    if parts.next().is_some() {
        return Err(VersionFormatError::new(
            version,
            FormatReason::MultipleHyphens,
        ));
    }

    let components: Vec<&str> = main.split('.').collect();
    let [major, minor, patch] = components.as_slice() else {
        return Err(VersionFormatError::new(
            version,
            FormatReason::NotThreeComponents,
        ));
    };
    if ![major, minor, patch].iter().all(|c| is_digits(c)) {
        return Err(VersionFormatError::new(
            version,
            FormatReason::NonDigitComponent,
        ));
    }

    let mut parsed = ParsedVersion {
        major: parse_number(major, version)?,
        minor: parse_number(minor, version)?,
        patch: parse_number(patch, version)?,
        pre_release: None,
    };

    // "1.2.3-" carries no pre-release at all
    let Some(pre) = pre.filter(|p| !p.is_empty()) else {
        return Ok(parsed);
    };

    let identifiers: Vec<&str> = pre.split('.').collect();
    if identifiers.iter().any(|id| id.is_empty()) {
        return Err(VersionFormatError::new(version, FormatReason::AdjacentDots));
    }

    let pre_release = if is_digits(identifiers[0]) {
        PreRelease {
            tag: None,
            segments: Some(coerce_all(&identifiers, version)?),
        }
    } else {
        let rest = &identifiers[1..];
        PreRelease {
            tag: Some(identifiers[0].to_string()),
            segments: if rest.is_empty() {
                None
            } else {
                Some(coerce_all(rest, version)?)
            },
        }
    };
    parsed.pre_release = Some(pre_release);

    Ok(parsed)
}

fn coerce_all(identifiers: &[&str], version: &str) -> Result<Vec<Segment>, VersionFormatError> {
    identifiers
        .iter()
        .map(|id| Segment::coerce(id, version))
        .collect()
}

/// `^[0-9]+$`
pub(crate) fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn parse_number(digits: &str, version: &str) -> Result<u64, VersionFormatError> {
    digits
        .parse()
        .map_err(|_| VersionFormatError::new(version, FormatReason::Overflow))
}
