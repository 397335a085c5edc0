//! URL template resolution
//!
//! Templates carry `{{name}}` placeholders, replaced by the value of `name`,
//! and `{{=name}}` placeholders, replaced by `name=<value>` so a query
//! parameter can be appended without repeating its key.
//!
//! - [`git`]: builds the package.json URL for a package tag
//! - [`jenkins`]: builds the Jenkins build-trigger URL for a package tag

pub mod git;
pub mod jenkins;

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::{Captures, Regex};

pub use git::resolve_git_url;
pub use jenkins::resolve_jenkins_url;

/// Placeholder name to value
pub type TemplateContext = IndexMap<String, String>;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{(=?)([A-Za-z0-9_]+)\}\}").expect("placeholder pattern is valid")
});

/// Outcome of substituting a context into a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Every placeholder had a non-empty value
    Resolved(String),
    /// At least one placeholder had no value; nothing was substituted
    Unresolved { missing: Vec<String> },
}

impl Resolution {
    pub fn into_url(self) -> Option<String> {
        match self {
            Resolution::Resolved(url) => Some(url),
            Resolution::Unresolved { .. } => None,
        }
    }
}

/// Substitute `context` into `template`.
///
/// All-or-nothing: a missing or empty value for any placeholder yields
/// [`Resolution::Unresolved`] listing the offending names.
pub fn resolve_template(template: &str, context: &TemplateContext) -> Resolution {
    let mut missing = Vec::new();
    let resolved = PLACEHOLDER.replace_all(template, |caps: &Captures| {
        let name = &caps[2];
        match context.get(name).filter(|value| !value.is_empty()) {
            Some(value) if !caps[1].is_empty() => format!("{}={}", name, value),
            Some(value) => value.clone(),
            None => {
                missing.push(name.to_string());
                caps[0].to_string()
            }
        }
    });

    if missing.is_empty() {
        Resolution::Resolved(resolved.into_owned())
    } else {
        Resolution::Unresolved { missing }
    }
}

/// True if `s` still contains a `{{name}}` or `{{=name}}` placeholder.
pub fn is_template(s: &str) -> bool {
    PLACEHOLDER.is_match(s)
}
