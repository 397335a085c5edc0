//! package.json URL resolution

use tracing::debug;

use crate::config::{GitConfig, GitParams};
use crate::template::{Resolution, resolve_template};

/// Resolve the package.json URL for one package tag.
///
/// - no local entry: `None`, the tag is not checked
/// - local string: used as-is
/// - local mapping: substituted into the global template, which is only used
///   when a global cookie is configured as well
pub fn resolve_git_url(global: &GitConfig, local: Option<&GitParams>) -> Option<String> {
    let variables = match local? {
        GitParams::Url(url) if url.is_empty() => return None,
        GitParams::Url(url) => return Some(url.clone()),
        GitParams::Variables(variables) => variables,
    };

    let template = global.template.as_deref().filter(|t| !t.is_empty())?;
    if global.cookie.as_deref().is_none_or(str::is_empty) {
        debug!("Git template ignored: no global git cookie configured");
        return None;
    }

    match resolve_template(template, variables) {
        Resolution::Resolved(url) => Some(url),
        Resolution::Unresolved { missing } => {
            debug!("Git template has unresolved placeholders: {:?}", missing);
            None
        }
    }
}
