//! Jenkins build-trigger URL resolution

use tracing::debug;

use crate::config::{JenkinsConfig, JenkinsParams};
use crate::template::{Resolution, TemplateContext, is_template, resolve_template};

/// Resolve the Jenkins trigger URL for one package tag.
///
/// Precedence:
/// 1. a non-empty local `url`, used as-is
/// 2. the global template filled with the local variables, falling back to
///    the global `token` and `cause`
/// 3. without a local entry, the global template filled from the global
///    config alone
pub fn resolve_jenkins_url(
    global: Option<&JenkinsConfig>,
    local: Option<&JenkinsParams>,
) -> Option<String> {
    let Some(local) = local else {
        let global = global?;
        let template = global_template(Some(global))?;
        return resolve_template(template, &global_context(global))
            .into_url()
            .filter(|url| !is_template(url));
    };

    if let Some(url) = local.url.as_deref().filter(|url| !url.is_empty()) {
        return Some(url.to_string());
    }

    let template = global_template(global)?;
    let mut context = TemplateContext::new();
    if let Some(global) = global {
        insert_some(&mut context, "token", global.token.as_deref());
        insert_some(&mut context, "cause", global.cause.as_deref());
    }
    context.extend(
        local
            .variables
            .iter()
            .map(|(k, v)| (k.clone(), v.clone())),
    );

    match resolve_template(template, &context) {
        Resolution::Resolved(url) => Some(url),
        Resolution::Unresolved { missing } => {
            debug!("Jenkins template has unresolved placeholders: {:?}", missing);
            None
        }
    }
}

fn global_template(global: Option<&JenkinsConfig>) -> Option<&str> {
    global?.template.as_deref().filter(|t| !t.is_empty())
}

/// Every value of the global config that can fill a placeholder
fn global_context(global: &JenkinsConfig) -> TemplateContext {
    let mut context = TemplateContext::new();
    insert_some(&mut context, "token", global.token.as_deref());
    insert_some(&mut context, "cause", global.cause.as_deref());
    insert_some(&mut context, "cookie", global.cookie.as_deref());
    context.extend(
        global
            .variables
            .iter()
            .map(|(k, v)| (k.clone(), v.clone())),
    );
    context
}

fn insert_some(context: &mut TemplateContext, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        context.insert(key.to_string(), value.to_string());
    }
}
