//! Version collection and Jenkins triggering

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use futures::future::join_all;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::check::{CheckError, PackageItem};
use crate::config::FETCH_STAGGER_DELAY_MS;
use crate::remote::{
    FetchError, GitManifest, GitSource, JenkinsTrigger, RegistryDocument, RegistrySource,
};
use crate::version::{Operator, PreReleasePolicy, compare::compare_parsed, parse_version};

/// Drives the remote lookups for a batch of [`PackageItem`]s.
///
/// Errors are recorded on the item they belong to; one failing package never
/// stops the others.
pub struct Checker<'a> {
    git: &'a dyn GitSource,
    registry: &'a dyn RegistrySource,
    jenkins: &'a dyn JenkinsTrigger,
    policy: PreReleasePolicy,
    /// Used when an item has no Jenkins cookie of its own
    jenkins_cookie: Option<String>,
    /// Log item failures as errors instead of debug output
    report_errors: bool,
}

impl<'a> Checker<'a> {
    pub fn new(
        git: &'a dyn GitSource,
        registry: &'a dyn RegistrySource,
        jenkins: &'a dyn JenkinsTrigger,
    ) -> Self {
        Self {
            git,
            registry,
            jenkins,
            policy: PreReleasePolicy::default(),
            jenkins_cookie: None,
            report_errors: false,
        }
    }

    pub fn with_policy(mut self, policy: PreReleasePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_jenkins_cookie(mut self, cookie: Option<String>) -> Self {
        self.jenkins_cookie = cookie.filter(|c| !c.is_empty());
        self
    }

    pub fn with_error_reporting(mut self, enabled: bool) -> Self {
        self.report_errors = enabled;
        self
    }

    /// Fetch git and registry versions for every item and compare them.
    ///
    /// Registry documents are fetched once per registry URL and shared by
    /// every tag of the same package. Requests start staggered to avoid
    /// rate limiting.
    pub async fn collect_versions(&self, mut items: Vec<PackageItem>) -> Vec<PackageItem> {
        let total = items.len();

        let manifests = join_all(items.iter().enumerate().map(|(i, item)| async move {
            sleep(stagger(i)).await;
            info!("({}/{}) {} git package.json", i + 1, total, item.label());
            let Some(url) = item.git_url.as_deref() else {
                return Err(CheckError::MissingGitUrl);
            };
            self.git.fetch_manifest(url).await.map_err(CheckError::Git)
        }))
        .await;

        let documents = self.fetch_documents(&manifests).await;

        for (item, manifest) in items.iter_mut().zip(manifests) {
            let outcome = match manifest {
                Ok(manifest) => self.compare(item, manifest, &documents),
                Err(e) => Err(e),
            };
            if let Err(e) = outcome {
                self.log_failure(item, &e);
                item.error = Some(e);
            }
        }

        items
    }

    async fn fetch_documents(
        &self,
        manifests: &[Result<GitManifest, CheckError>],
    ) -> HashMap<String, Result<RegistryDocument, FetchError>> {
        let mut seen = HashSet::new();
        let urls: Vec<&str> = manifests
            .iter()
            .filter_map(|m| m.as_ref().ok())
            .map(|m| m.registry_url.as_str())
            .filter(|url| seen.insert(*url))
            .collect();

        let documents = join_all(urls.iter().enumerate().map(|(i, url)| async move {
            sleep(stagger(i)).await;
            debug!("Fetching registry document {}", url);
            (url.to_string(), self.registry.fetch_document(url).await)
        }))
        .await;

        documents.into_iter().collect()
    }

    fn compare(
        &self,
        item: &mut PackageItem,
        manifest: GitManifest,
        documents: &HashMap<String, Result<RegistryDocument, FetchError>>,
    ) -> Result<(), CheckError> {
        item.git_version = Some(manifest.version.clone());
        item.registry_url = Some(manifest.registry_url.clone());

        let document = match documents.get(&manifest.registry_url) {
            Some(Ok(document)) => document,
            Some(Err(e)) => return Err(CheckError::Registry(e.clone())),
            None => {
                return Err(CheckError::Registry(FetchError::invalid_response(
                    &manifest.registry_url,
                    "registry document was not fetched",
                )));
            }
        };

        let release = document
            .release(&item.tag)
            .ok_or_else(|| CheckError::TagNotPublished {
                tag: item.tag.clone(),
            })?;
        item.publish_version = Some(release.version.clone());
        item.publish_time = release.published_at;

        let git = parse_version(&manifest.version)?;
        let published = parse_version(&release.version)?;
        item.can_update = Some(compare_parsed(&git, &published, Operator::Gt, self.policy));
        item.anomaly = Some(compare_parsed(&git, &published, Operator::Lt, self.policy));

        debug!(
            "{}: git {} / published {} -> update {:?}, anomaly {:?}",
            item.label(),
            manifest.version,
            release.version,
            item.can_update,
            item.anomaly
        );
        Ok(())
    }

    /// Trigger the Jenkins job of every item, recording each result on the item
    pub async fn trigger_jenkins(&self, mut items: Vec<PackageItem>) -> Vec<PackageItem> {
        let total = items.len();

        let results = join_all(items.iter().enumerate().map(|(i, item)| async move {
            sleep(stagger(i)).await;
            info!("({}/{}) trigger Jenkins {}", i + 1, total, item.label());
            let Some(url) = item.jenkins_url.as_deref() else {
                return Err(CheckError::MissingJenkinsUrl);
            };
            let cookie = item
                .jenkins_cookie
                .clone()
                .or_else(|| self.jenkins_cookie.clone());
            self.jenkins
                .trigger(url, cookie)
                .await
                .map_err(CheckError::Jenkins)
        }))
        .await;

        for (item, result) in items.iter_mut().zip(results) {
            if let Err(e) = &result {
                self.log_failure(item, e);
            }
            item.trigger = Some(result);
        }

        items
    }

    fn log_failure(&self, item: &PackageItem, e: &CheckError) {
        if self.report_errors {
            error!("{} {}", item.label(), e);
        } else {
            debug!("{} {}", item.label(), e);
        }
    }
}

fn stagger(index: usize) -> Duration {
    Duration::from_millis(FETCH_STAGGER_DELAY_MS * index as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{MockGitSource, MockJenkinsTrigger, MockRegistrySource};
    use crate::version::CompareOutcome;
    use mockall::predicate::eq;

    fn manifest(version: &str, registry_url: &str) -> GitManifest {
        GitManifest {
            name: "pkg".to_string(),
            version: version.to_string(),
            description: None,
            registry_url: registry_url.to_string(),
        }
    }

    fn document(tags: &[(&str, &str)]) -> RegistryDocument {
        RegistryDocument {
            name: "pkg".to_string(),
            dist_tags: tags
                .iter()
                .map(|(t, v)| (t.to_string(), v.to_string()))
                .collect(),
            time: HashMap::new(),
        }
    }

    fn item(tag: &str, git_url: Option<&str>) -> PackageItem {
        PackageItem {
            git_url: git_url.map(str::to_string),
            ..PackageItem::new("pkg", tag)
        }
    }

    #[tokio::test]
    async fn collect_versions_marks_newer_git_version_as_updatable() {
        let mut git = MockGitSource::new();
        git.expect_fetch_manifest()
            .with(eq("http://git/pkg"))
            .returning(|_| Ok(manifest("1.2.0", "http://npm/pkg")));
        let mut registry = MockRegistrySource::new();
        registry
            .expect_fetch_document()
            .with(eq("http://npm/pkg"))
            .times(1)
            .returning(|_| Ok(document(&[("latest", "1.1.0")])));
        let jenkins = MockJenkinsTrigger::new();

        let checker = Checker::new(&git, &registry, &jenkins);
        let items = checker
            .collect_versions(vec![item("latest", Some("http://git/pkg"))])
            .await;

        assert_eq!(
            items,
            vec![PackageItem {
                registry_url: Some("http://npm/pkg".to_string()),
                git_version: Some("1.2.0".to_string()),
                publish_version: Some("1.1.0".to_string()),
                can_update: Some(CompareOutcome::Match),
                anomaly: Some(CompareOutcome::NoMatch),
                ..item("latest", Some("http://git/pkg"))
            }]
        );
    }

    #[tokio::test]
    async fn collect_versions_fetches_shared_registry_document_once() {
        let mut git = MockGitSource::new();
        git.expect_fetch_manifest()
            .with(eq("http://git/latest"))
            .returning(|_| Ok(manifest("1.0.0", "http://npm/pkg")));
        git.expect_fetch_manifest()
            .with(eq("http://git/beta"))
            .returning(|_| Ok(manifest("1.1.0-beta.2", "http://npm/pkg")));
        let mut registry = MockRegistrySource::new();
        registry
            .expect_fetch_document()
            .times(1)
            .returning(|_| Ok(document(&[("latest", "1.0.0"), ("beta", "1.1.0-beta.1")])));
        let jenkins = MockJenkinsTrigger::new();

        let checker = Checker::new(&git, &registry, &jenkins);
        let items = checker
            .collect_versions(vec![
                item("latest", Some("http://git/latest")),
                item("beta", Some("http://git/beta")),
            ])
            .await;

        assert_eq!(items[0].publish_version.as_deref(), Some("1.0.0"));
        assert_eq!(items[0].can_update, Some(CompareOutcome::NoMatch));
        assert_eq!(items[0].anomaly, Some(CompareOutcome::NoMatch));
        assert_eq!(items[1].publish_version.as_deref(), Some("1.1.0-beta.1"));
        assert_eq!(items[1].can_update, Some(CompareOutcome::Match));
    }

    #[tokio::test]
    async fn collect_versions_records_errors_per_item() {
        let mut git = MockGitSource::new();
        git.expect_fetch_manifest()
            .with(eq("http://git/broken"))
            .returning(|url| {
                Err(FetchError::Status {
                    url: url.to_string(),
                    status: 500,
                })
            });
        git.expect_fetch_manifest()
            .with(eq("http://git/bad-version"))
            .returning(|_| Ok(manifest("1.0", "http://npm/pkg")));
        git.expect_fetch_manifest()
            .with(eq("http://git/ok"))
            .returning(|_| Ok(manifest("2.0.0", "http://npm/pkg")));
        let mut registry = MockRegistrySource::new();
        registry
            .expect_fetch_document()
            .returning(|_| Ok(document(&[("latest", "1.0.0")])));
        let jenkins = MockJenkinsTrigger::new();

        let checker = Checker::new(&git, &registry, &jenkins);
        let items = checker
            .collect_versions(vec![
                item("latest", None),
                item("latest", Some("http://git/broken")),
                item("latest", Some("http://git/bad-version")),
                item("next", Some("http://git/ok")),
                item("latest", Some("http://git/ok")),
            ])
            .await;

        assert_eq!(items[0].error, Some(CheckError::MissingGitUrl));
        assert!(matches!(
            items[1].error,
            Some(CheckError::Git(FetchError::Status { status: 500, .. }))
        ));
        assert!(matches!(items[2].error, Some(CheckError::Version(_))));
        assert_eq!(items[2].publish_version.as_deref(), Some("1.0.0"));
        assert_eq!(
            items[3].error,
            Some(CheckError::TagNotPublished {
                tag: "next".to_string()
            })
        );
        assert_eq!(items[4].error, None);
        assert_eq!(items[4].can_update, Some(CompareOutcome::Match));
    }

    #[tokio::test]
    async fn collect_versions_shares_registry_failure() {
        let mut git = MockGitSource::new();
        git.expect_fetch_manifest()
            .returning(|_| Ok(manifest("1.0.0", "http://npm/pkg")));
        let mut registry = MockRegistrySource::new();
        registry.expect_fetch_document().times(1).returning(|url| {
            Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
        });
        let jenkins = MockJenkinsTrigger::new();

        let checker = Checker::new(&git, &registry, &jenkins);
        let items = checker
            .collect_versions(vec![
                item("latest", Some("http://git/a")),
                item("beta", Some("http://git/b")),
            ])
            .await;

        for item in &items {
            assert_eq!(
                item.error,
                Some(CheckError::Registry(FetchError::Status {
                    url: "http://npm/pkg".to_string(),
                    status: 404
                }))
            );
            assert_eq!(item.git_version.as_deref(), Some("1.0.0"));
        }
    }

    #[tokio::test]
    async fn collect_versions_applies_pre_release_policy() {
        let mut git = MockGitSource::new();
        git.expect_fetch_manifest()
            .returning(|_| Ok(manifest("1.0.0-test.2", "http://npm/pkg")));
        let mut registry = MockRegistrySource::new();
        registry
            .expect_fetch_document()
            .returning(|_| Ok(document(&[("latest", "1.0.0-noe.1")])));
        let jenkins = MockJenkinsTrigger::new();

        let strict = Checker::new(&git, &registry, &jenkins);
        let relaxed = Checker::new(&git, &registry, &jenkins).with_policy(PreReleasePolicy {
            tag: false,
            segments: true,
        });

        let strict_items = strict
            .collect_versions(vec![item("latest", Some("http://git/pkg"))])
            .await;
        let relaxed_items = relaxed
            .collect_versions(vec![item("latest", Some("http://git/pkg"))])
            .await;

        assert_eq!(strict_items[0].can_update, Some(CompareOutcome::Incomparable));
        assert_eq!(relaxed_items[0].can_update, Some(CompareOutcome::Match));
    }

    #[tokio::test]
    async fn trigger_jenkins_uses_item_cookie_before_global_cookie() {
        let git = MockGitSource::new();
        let registry = MockRegistrySource::new();
        let mut jenkins = MockJenkinsTrigger::new();
        jenkins
            .expect_trigger()
            .with(eq("http://j/a"), eq(Some("item".to_string())))
            .times(1)
            .returning(|_, _| Ok(()));
        jenkins
            .expect_trigger()
            .with(eq("http://j/b"), eq(Some("global".to_string())))
            .times(1)
            .returning(|url, _| {
                Err(FetchError::TokenMismatch {
                    url: url.to_string(),
                })
            });

        let checker = Checker::new(&git, &registry, &jenkins)
            .with_jenkins_cookie(Some("global".to_string()));
        let items = checker
            .trigger_jenkins(vec![
                PackageItem {
                    jenkins_url: Some("http://j/a".to_string()),
                    jenkins_cookie: Some("item".to_string()),
                    ..PackageItem::new("a", "latest")
                },
                PackageItem {
                    jenkins_url: Some("http://j/b".to_string()),
                    ..PackageItem::new("b", "latest")
                },
                PackageItem::new("c", "latest"),
            ])
            .await;

        assert_eq!(items[0].trigger, Some(Ok(())));
        assert_eq!(
            items[1].trigger,
            Some(Err(CheckError::Jenkins(FetchError::TokenMismatch {
                url: "http://j/b".to_string()
            })))
        );
        assert_eq!(items[2].trigger, Some(Err(CheckError::MissingJenkinsUrl)));
    }

    #[tokio::test]
    async fn trigger_jenkins_keeps_empty_item_cookie_over_global_cookie() {
        let git = MockGitSource::new();
        let registry = MockRegistrySource::new();
        let mut jenkins = MockJenkinsTrigger::new();
        jenkins
            .expect_trigger()
            .with(eq("http://j/a"), eq(Some(String::new())))
            .times(1)
            .returning(|_, _| Ok(()));

        let checker = Checker::new(&git, &registry, &jenkins)
            .with_jenkins_cookie(Some("global".to_string()));
        let items = checker
            .trigger_jenkins(vec![PackageItem {
                jenkins_url: Some("http://j/a".to_string()),
                jenkins_cookie: Some(String::new()),
                ..PackageItem::new("a", "latest")
            }])
            .await;

        assert_eq!(items[0].trigger, Some(Ok(())));
    }
}
