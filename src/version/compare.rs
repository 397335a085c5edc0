//! Partial-order comparison over relaxed SemVer-like versions
//!
//! The comparison answers "does `target <op> version` hold?" with three
//! outcomes: it holds, it does not, or the two versions cannot be ordered
//! (differing pre-release tags, mismatched text segments).

use std::fmt;

use serde::Deserialize;

use crate::version::error::VersionFormatError;
use crate::version::semver::{ParsedVersion, Segment, parse_version};

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Gt,
    Lt,
    Eq,
    Neq,
    Ge,
    Le,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Gt => "gt",
            Operator::Lt => "lt",
            Operator::Eq => "eq",
            Operator::Neq => "neq",
            Operator::Ge => "ge",
            Operator::Le => "le",
        }
    }

    fn holds<T: PartialOrd>(self, a: &T, b: &T) -> bool {
        match self {
            Operator::Gt => a > b,
            Operator::Lt => a < b,
            Operator::Eq => a == b,
            Operator::Neq => a != b,
            Operator::Ge => a >= b,
            Operator::Le => a <= b,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown comparison operator: {0}")]
pub struct UnknownOperator(pub String);

impl std::str::FromStr for Operator {
    type Err = UnknownOperator;

    /// Accepts both the letter forms and their symbolic aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ">" | "gt" => Ok(Operator::Gt),
            "<" | "lt" => Ok(Operator::Lt),
            "=" | "==" | "eq" => Ok(Operator::Eq),
            "!=" | "neq" => Ok(Operator::Neq),
            ">=" | "ge" => Ok(Operator::Ge),
            "<=" | "le" => Ok(Operator::Le),
            _ => Err(UnknownOperator(s.to_string())),
        }
    }
}

/// Result of a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOutcome {
    /// The relation holds
    Match,
    /// The relation does not hold
    NoMatch,
    /// No order relation can be established
    Incomparable,
}

impl CompareOutcome {
    fn from_bool(holds: bool) -> Self {
        if holds {
            CompareOutcome::Match
        } else {
            CompareOutcome::NoMatch
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, CompareOutcome::Match)
    }

    /// Numeric form: 1, 0, -1
    pub fn as_i8(&self) -> i8 {
        match self {
            CompareOutcome::Match => 1,
            CompareOutcome::NoMatch => 0,
            CompareOutcome::Incomparable => -1,
        }
    }
}

impl From<CompareOutcome> for i8 {
    fn from(outcome: CompareOutcome) -> Self {
        outcome.as_i8()
    }
}

/// Which parts of the pre-release are taken into account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreReleasePolicy {
    pub tag: bool,
    pub segments: bool,
}

impl PreReleasePolicy {
    pub const ALL: Self = Self {
        tag: true,
        segments: true,
    };

    pub const NONE: Self = Self {
        tag: false,
        segments: false,
    };
}

impl Default for PreReleasePolicy {
    fn default() -> Self {
        Self::ALL
    }
}

impl From<bool> for PreReleasePolicy {
    fn from(enabled: bool) -> Self {
        if enabled { Self::ALL } else { Self::NONE }
    }
}

/// Config form: either a single switch or per-part switches defaulting to `true`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PreReleaseSetting {
    Switch(bool),
    Parts {
        #[serde(default)]
        tag: Option<bool>,
        #[serde(default, alias = "version")]
        segments: Option<bool>,
    },
}

impl Default for PreReleaseSetting {
    fn default() -> Self {
        PreReleaseSetting::Switch(true)
    }
}

impl From<PreReleaseSetting> for PreReleasePolicy {
    fn from(setting: PreReleaseSetting) -> Self {
        match setting {
            PreReleaseSetting::Switch(enabled) => enabled.into(),
            PreReleaseSetting::Parts { tag, segments } => Self {
                tag: tag.unwrap_or(true),
                segments: segments.unwrap_or(true),
            },
        }
    }
}

/// Compare two scalars with `op`.
///
/// Ordering is only defined between numbers; text supports `eq`/`neq` by
/// string equality and yields `Incomparable` for any ordering operator.
pub fn compare_scalar(a: &Segment, b: &Segment, op: Operator) -> CompareOutcome {
    match (a, b) {
        (Segment::Number(x), Segment::Number(y)) => CompareOutcome::from_bool(op.holds(x, y)),
        _ => match op {
            Operator::Eq => CompareOutcome::from_bool(a.to_string() == b.to_string()),
            Operator::Neq => CompareOutcome::from_bool(a.to_string() != b.to_string()),
            _ => CompareOutcome::Incomparable,
        },
    }
}

/// Evaluate `target <op> version`.
///
/// # Errors
/// Returns [`VersionFormatError`] when either string fails to parse.
pub fn compare_semver(
    target: &str,
    version: &str,
    op: Operator,
    policy: impl Into<PreReleasePolicy>,
) -> Result<CompareOutcome, VersionFormatError> {
    let left = parse_version(target)?;
    let right = parse_version(version)?;
    Ok(compare_parsed(&left, &right, op, policy.into()))
}

/// Same as [`compare_semver`] over already parsed versions.
pub fn compare_parsed(
    left: &ParsedVersion,
    right: &ParsedVersion,
    op: Operator,
    policy: PreReleasePolicy,
) -> CompareOutcome {
    let mut result = CompareOutcome::Incomparable;
    for (a, b) in [
        (left.major, right.major),
        (left.minor, right.minor),
        (left.patch, right.patch),
    ] {
        result = compare_scalar(&Segment::Number(a), &Segment::Number(b), op);
        if a != b {
            return result;
        }
    }
    if result == CompareOutcome::Incomparable {
        return result;
    }

    if policy.tag && left.tag() != right.tag() {
        return CompareOutcome::Incomparable;
    }

    if !policy.segments {
        return result;
    }

    let (left_segments, right_segments) = match (left.segments(), right.segments()) {
        (None, None) => return result,
        (Some(l), Some(r)) => (l, r),
        _ => return CompareOutcome::Incomparable,
    };

    // A text segment must be matched by the identical text at the same
    // position on the other side, anywhere in the tail.
    if has_unmatched_text(left_segments, right_segments)
        || has_unmatched_text(right_segments, left_segments)
    {
        return CompareOutcome::Incomparable;
    }

    let zero = Segment::Number(0);
    let length = left_segments.len().max(right_segments.len());
    for i in 0..length {
        let (a, b) = match (left_segments.get(i), right_segments.get(i)) {
            (Some(a), Some(b)) => (a, b),
            // Missing tail counts as 0; a trailing 0 on the other side ends the walk as equal.
            (None, Some(b)) => {
                return if *b == zero {
                    result
                } else {
                    compare_scalar(&zero, b, op)
                };
            }
            (Some(a), None) => {
                return if *a == zero {
                    result
                } else {
                    compare_scalar(a, &zero, op)
                };
            }
            (None, None) => break,
        };

        match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => {
                let outcome = compare_scalar(a, b, op);
                if x != y {
                    return outcome;
                }
                result = outcome;
            }
            _ => {
                if a.to_string() != b.to_string() {
                    return CompareOutcome::Incomparable;
                }
            }
        }
    }

    result
}

fn has_unmatched_text(segments: &[Segment], other: &[Segment]) -> bool {
    segments
        .iter()
        .enumerate()
        .any(|(i, segment)| matches!(segment, Segment::Text(_)) && other.get(i) != Some(segment))
}
