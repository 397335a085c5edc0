use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use tracing::{debug, info};

use crate::parser::{ParseError, parse_jsonc};
use crate::version::PreReleaseSetting;

// =============================================================================
// Constants
// =============================================================================

pub const APP_NAME: &str = "npm-publish-check";

/// Tag checked when the config does not name any
pub const DEFAULT_CHECK_TAG: &str = "latest";

/// Path fragment of the git login page; a redirect there means the cookie is missing or stale
pub const DEFAULT_LOGIN_MARKER: &str = "/users/sign_in";

/// Registry used when a package.json has no `publishConfig.registry`
pub const DEFAULT_NPM_REGISTRY: &str = "https://registry.npmjs.org";

/// Timeout for each HTTP request in milliseconds (30 seconds)
pub const FETCH_TIMEOUT_MS: u64 = 30_000;

/// Delay between starting each fetch request to avoid rate limiting (10ms)
pub const FETCH_STAGGER_DELAY_MS: u64 = 10;

/// Display format of registry publish times (local time)
pub const PUBLISH_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const DEFAULT_CONFIG_FILE: &str = "config.jsonc";

/// Written by `init`
pub const DEFAULT_CONFIG: &str = r#"{
  "checkTags": ["latest"],
  "git": {
    "template": "http://git/{{name}}/-/raw/{{branch}}/package.json",
    "cookie": ""
  },
  "jenkins": {
    "token": "",
    "cookie": "",
    // Two placeholder forms: {{name}} is replaced by the value, {{=name}} by "name=value".
    // "http://jenkins/job/{{name}}/build?{{=cause}}" with name=test, cause=t1
    // becomes http://jenkins/job/test/build?cause=t1
    "template": "http://jenkins/job/{{name}}/build",
    "cause": "npm-publish-check"
  },
  "package": {
    "packageName1": {
      "latest": {
        "git": {
          // every value here fills the placeholder of the same name in git.template
          "name": "git-packagename",
          "branch": "develop"
        },
        "jenkins": {
          // everything except the reserved url/cookie keys fills jenkins.template
          "name": "jenkins-packagename-develop"
        }
      }
    },
    "packageName2": {
      "latest": {
        // a plain string is used as the package.json URL as-is
        "git": "http://git/packageName2/-/raw/develop/package.json",
        "jenkins": {
          // a local url wins and is used as-is
          "url": "http://jenkins/job/jenkins-packageName2-develop/build?token=token"
        }
      },
      "stable": {
        "git": "http://git/packageName2/-/raw/master/package.json",
        "jenkins": {
          "url": "http://jenkins/job/jenkins-packageName2-master/build?token=token"
        }
      }
    },
    "packageName3": {
      "latest": {
        // no jenkins entry: the package is checked but never triggered
        "git": "http://git/packageName3/-/raw/develop/package.json"
      }
    }
  }
}
"#;

// =============================================================================
// Config structures
// =============================================================================

/// Root of the config file
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CheckConfig {
    /// Dist-tags checked when none are given on the command line
    #[serde(deserialize_with = "one_or_many")]
    pub check_tags: Vec<String>,
    pub git: GitConfig,
    pub jenkins: Option<JenkinsConfig>,
    /// Pre-release handling when comparing the git version to the published one
    pub pre_release: PreReleaseSetting,
    /// package name -> dist-tag -> where to find it
    pub package: IndexMap<String, IndexMap<String, TagConfig>>,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            check_tags: vec![DEFAULT_CHECK_TAG.to_string()],
            git: GitConfig::default(),
            jenkins: None,
            pre_release: PreReleaseSetting::default(),
            package: IndexMap::new(),
        }
    }
}

/// Global git settings
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct GitConfig {
    pub cookie: Option<String>,
    /// File holding the cookie, used when `cookie` is empty
    pub cookie_path: Option<PathBuf>,
    /// package.json URL template
    pub template: Option<String>,
    #[serde(rename = "checkLoginURL", alias = "checkLoginUrl")]
    pub check_login_url: Option<String>,
}

impl GitConfig {
    pub fn login_marker(&self) -> &str {
        self.check_login_url
            .as_deref()
            .filter(|marker| !marker.is_empty())
            .unwrap_or(DEFAULT_LOGIN_MARKER)
    }
}

/// Global Jenkins settings
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct JenkinsConfig {
    pub cookie: Option<String>,
    pub cookie_path: Option<PathBuf>,
    /// Build-trigger URL template
    pub template: Option<String>,
    pub token: Option<String>,
    pub cause: Option<String>,
    /// Any other key is available as a template placeholder
    #[serde(flatten)]
    pub variables: IndexMap<String, String>,
}

/// Per package/tag entry
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct TagConfig {
    pub git: Option<GitParams>,
    pub jenkins: Option<JenkinsParams>,
}

/// Local git entry: a literal URL, or values for the global git template
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum GitParams {
    Url(String),
    Variables(IndexMap<String, String>),
}

/// Local Jenkins entry
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct JenkinsParams {
    /// Literal trigger URL; takes precedence over the template
    pub url: Option<String>,
    /// Cookie for this job only
    pub cookie: Option<String>,
    /// Values for the global Jenkins template
    #[serde(flatten)]
    pub variables: IndexMap<String, String>,
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::Many(tags)) => tags,
        Some(OneOrMany::One(tag)) if !tag.is_empty() => vec![tag],
        _ => vec![DEFAULT_CHECK_TAG.to_string()],
    })
}

// =============================================================================
// Loading
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config syntax in {path:?}: {source}")]
    Syntax {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("Invalid config in {path:?}: {source}")]
    Schema {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot read cookie file {path:?}: {source}")]
    CookieFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CheckConfig {
    /// Parse config text without touching the filesystem
    pub fn from_jsonc(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let value = parse_jsonc(content).map_err(|source| ConfigError::Syntax {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_value(value).map_err(|source| ConfigError::Schema {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Fill empty cookies from their `cookiePath` files
    pub fn load_cookie_files(&mut self) -> Result<(), ConfigError> {
        load_cookie(&mut self.git.cookie, self.git.cookie_path.as_deref())?;
        if let Some(jenkins) = self.jenkins.as_mut() {
            load_cookie(&mut jenkins.cookie, jenkins.cookie_path.as_deref())?;
        }
        Ok(())
    }
}

fn load_cookie(cookie: &mut Option<String>, path: Option<&Path>) -> Result<(), ConfigError> {
    if cookie.as_deref().is_some_and(|c| !c.is_empty()) {
        return Ok(());
    }
    let Some(path) = path else {
        return Ok(());
    };

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::CookieFile {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Loaded cookie from {:?}", path);
    *cookie = Some(content.trim_end_matches(['\r', '\n']).to_string());
    Ok(())
}

/// Read, parse and post-process the config file at `path`
pub fn load_config(path: &Path) -> Result<CheckConfig, ConfigError> {
    info!("Loading config from {:?}", path);
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config = CheckConfig::from_jsonc(&content, path)?;
    config.load_cookie_files()?;
    Ok(config)
}

/// Write the default config to `<name>.jsonc` in the current directory.
///
/// Refuses to overwrite an existing file.
pub fn write_default_config(name: Option<&str>) -> Result<PathBuf, ConfigError> {
    let path = match name {
        Some(name) => PathBuf::from(format!("{}.jsonc", name)),
        None => PathBuf::from(DEFAULT_CONFIG_FILE),
    };
    write_default_config_to(&path)?;
    Ok(path)
}

fn write_default_config_to(path: &Path) -> Result<(), ConfigError> {
    let io_error = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(io_error)?;
    file.write_all(DEFAULT_CONFIG.as_bytes()).map_err(io_error)?;
    info!("Wrote default config to {:?}", path);
    Ok(())
}

// =============================================================================
// Paths
// =============================================================================

/// Returns the config file to load.
/// An explicit path always wins; otherwise `./config.jsonc` if it exists,
/// else `$XDG_CONFIG_HOME/npm-publish-check/config.jsonc`
/// (falling back to `~/.config/npm-publish-check/config.jsonc`).
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local.is_file() {
        return local;
    }
    config_dir().join(DEFAULT_CONFIG_FILE)
}

/// Returns the user config directory for npm-publish-check.
pub fn config_dir() -> PathBuf {
    config_dir_with_env(std::env::var("XDG_CONFIG_HOME").ok(), dirs::home_dir())
}

fn config_dir_with_env(xdg_config_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let config_dir = xdg_config_home
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));

    config_dir.join(APP_NAME)
}
