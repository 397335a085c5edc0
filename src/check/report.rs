//! Classification and text output of check results

use std::fmt::Write;

use crate::check::PackageItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// git version is ahead of the published one
    Updatable,
    UpToDate,
    /// published version is ahead of git
    Anomaly,
    Failed,
}

impl PackageItem {
    pub fn status(&self) -> Status {
        if self.error.is_some() || self.publish_version.is_none() {
            Status::Failed
        } else if self.can_update.is_some_and(|o| o.is_match()) {
            Status::Updatable
        } else if self.anomaly.is_some_and(|o| o.is_match()) {
            Status::Anomaly
        } else {
            Status::UpToDate
        }
    }
}

/// Items grouped by [`Status`], each group in input order
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Classification<'a> {
    pub updatable: Vec<&'a PackageItem>,
    pub up_to_date: Vec<&'a PackageItem>,
    pub anomalies: Vec<&'a PackageItem>,
    pub failed: Vec<&'a PackageItem>,
}

pub fn classify(items: &[PackageItem]) -> Classification<'_> {
    let mut classification = Classification::default();
    for item in items {
        match item.status() {
            Status::Updatable => classification.updatable.push(item),
            Status::UpToDate => classification.up_to_date.push(item),
            Status::Anomaly => classification.anomalies.push(item),
            Status::Failed => classification.failed.push(item),
        }
    }
    classification
}

fn version_or_dash(version: Option<&str>) -> &str {
    version.unwrap_or("-")
}

fn label_width(items: &[&PackageItem]) -> usize {
    items
        .iter()
        .map(|item| item.label().chars().count())
        .max()
        .unwrap_or(0)
}

fn write_section(
    out: &mut String,
    title: &str,
    items: &[&PackageItem],
    detailed: bool,
    describe: impl Fn(&PackageItem) -> String,
) {
    if items.is_empty() {
        return;
    }
    let width = label_width(items);
    let _ = writeln!(out, "{} ({}):", title, items.len());
    for item in items {
        let _ = writeln!(out, "  {:<width$}  {}", item.label(), describe(item));
        if detailed {
            if let Some(time) = &item.publish_time {
                let _ = writeln!(out, "  {:<width$}    published at {}", "", time);
            }
            if let Some(url) = &item.git_url {
                let _ = writeln!(out, "  {:<width$}    git: {}", "", url);
            }
        }
    }
    out.push('\n');
}

/// Render the result of a check run.
///
/// `detailed` adds publish time and git URL below each entry and the failing
/// request URL for errors.
pub fn render_check_report(items: &[PackageItem], detailed: bool) -> String {
    let classification = classify(items);
    let mut out = String::new();

    write_section(
        &mut out,
        "Updatable",
        &classification.updatable,
        detailed,
        |item| {
            let mut line = format!(
                "({} → {})",
                version_or_dash(item.publish_version.as_deref()),
                version_or_dash(item.git_version.as_deref())
            );
            if item.jenkins_url.is_none() {
                line.push_str(" (no Jenkins job)");
            }
            line
        },
    );
    write_section(
        &mut out,
        "Published ahead of git",
        &classification.anomalies,
        detailed,
        |item| {
            format!(
                "({} > {})",
                version_or_dash(item.publish_version.as_deref()),
                version_or_dash(item.git_version.as_deref())
            )
        },
    );
    write_section(
        &mut out,
        "Up to date",
        &classification.up_to_date,
        detailed,
        |item| format!("({})", version_or_dash(item.publish_version.as_deref())),
    );
    write_section(&mut out, "Failed", &classification.failed, false, |item| {
        match &item.error {
            Some(e) => match e.url().filter(|_| detailed) {
                Some(url) => format!("[{}] {}", e, url),
                None => format!("[{}]", e),
            },
            None => "[no published version]".to_string(),
        }
    });

    let _ = write!(
        out,
        "{} checked: {} updatable, {} up to date, {} anomalies, {} failed",
        items.len(),
        classification.updatable.len(),
        classification.up_to_date.len(),
        classification.anomalies.len(),
        classification.failed.len()
    );
    out
}

/// Render Jenkins trigger results; items never triggered are left out
pub fn render_trigger_report(items: &[PackageItem]) -> String {
    let triggered: Vec<&PackageItem> = items.iter().filter(|i| i.trigger.is_some()).collect();
    let width = label_width(&triggered);

    let mut out = String::new();
    for item in &triggered {
        let versions = format!(
            "({} → {})",
            version_or_dash(item.publish_version.as_deref()),
            version_or_dash(item.git_version.as_deref())
        );
        let result = match &item.trigger {
            Some(Ok(())) => "✔".to_string(),
            Some(Err(e)) => format!("❌ [{}]", e),
            None => continue,
        };
        let _ = writeln!(out, "{:<width$}  {}  {}", item.label(), versions, result);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::CheckError;
    use crate::remote::FetchError;
    use crate::version::CompareOutcome;
    use rstest::rstest;

    fn checked(name: &str, published: &str, git: &str, update: bool, anomaly: bool) -> PackageItem {
        let outcome = |m| {
            Some(if m {
                CompareOutcome::Match
            } else {
                CompareOutcome::NoMatch
            })
        };
        PackageItem {
            git_version: Some(git.to_string()),
            publish_version: Some(published.to_string()),
            can_update: outcome(update),
            anomaly: outcome(anomaly),
            ..PackageItem::new(name, "latest")
        }
    }

    fn failed(name: &str) -> PackageItem {
        PackageItem {
            error: Some(CheckError::Registry(FetchError::Status {
                url: "http://npm/x".to_string(),
                status: 404,
            })),
            ..PackageItem::new(name, "latest")
        }
    }

    #[rstest]
    #[case(checked("a", "1.0.0", "1.1.0", true, false), Status::Updatable)]
    #[case(checked("a", "1.0.0", "1.0.0", false, false), Status::UpToDate)]
    #[case(checked("a", "1.1.0", "1.0.0", false, true), Status::Anomaly)]
    #[case(failed("a"), Status::Failed)]
    #[case(PackageItem::new("a", "latest"), Status::Failed)]
    fn status_buckets(#[case] item: PackageItem, #[case] expected: Status) {
        assert_eq!(item.status(), expected);
    }

    #[test]
    fn status_treats_incomparable_as_up_to_date() {
        let item = PackageItem {
            can_update: Some(CompareOutcome::Incomparable),
            anomaly: Some(CompareOutcome::Incomparable),
            ..checked("a", "1.0.0-a.1", "1.0.0-b.1", false, false)
        };

        assert_eq!(item.status(), Status::UpToDate);
    }

    #[test]
    fn classify_keeps_input_order_within_buckets() {
        let items = vec![
            checked("b", "1.0.0", "1.1.0", true, false),
            failed("c"),
            checked("a", "1.0.0", "2.0.0", true, false),
        ];

        let classification = classify(&items);

        let names: Vec<&str> = classification
            .updatable
            .iter()
            .map(|i| i.name.as_str())
            .collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(classification.failed.len(), 1);
        assert!(classification.up_to_date.is_empty());
        assert!(classification.anomalies.is_empty());
    }

    #[test]
    fn render_check_report_aligns_sections() {
        let items = vec![
            PackageItem {
                jenkins_url: Some("http://j".to_string()),
                ..checked("long-name", "1.0.0", "1.1.0", true, false)
            },
            checked("a", "1.0.0", "1.2.0", true, false),
            checked("b", "2.0.0", "1.0.0", false, true),
            checked("c", "3.0.0", "3.0.0", false, false),
            failed("d"),
        ];

        let report = render_check_report(&items, false);

        assert_eq!(
            report,
            "Updatable (2):\n\
             \x20 long-name [latest]  (1.0.0 → 1.1.0)\n\
             \x20 a [latest]          (1.0.0 → 1.2.0) (no Jenkins job)\n\
             \n\
             Published ahead of git (1):\n\
             \x20 b [latest]  (2.0.0 > 1.0.0)\n\
             \n\
             Up to date (1):\n\
             \x20 c [latest]  (3.0.0)\n\
             \n\
             Failed (1):\n\
             \x20 d [latest]  [Failed to fetch npm registry info: Unexpected status 404 (URL: http://npm/x)]\n\
             \n\
             5 checked: 2 updatable, 1 up to date, 1 anomalies, 1 failed"
        );
    }

    #[test]
    fn render_check_report_detailed_shows_urls_and_time() {
        let items = vec![PackageItem {
            git_url: Some("http://git/a".to_string()),
            publish_time: Some("2024-01-02 03:04:05".to_string()),
            ..checked("a", "1.0.0", "1.0.0", false, false)
        }];

        let report = render_check_report(&items, true);

        assert!(report.contains("published at 2024-01-02 03:04:05"));
        assert!(report.contains("git: http://git/a"));
    }

    #[test]
    fn render_check_report_of_nothing_prints_summary_only() {
        assert_eq!(
            render_check_report(&[], false),
            "0 checked: 0 updatable, 0 up to date, 0 anomalies, 0 failed"
        );
    }

    #[test]
    fn render_trigger_report_lists_only_triggered_items() {
        let items = vec![
            PackageItem {
                trigger: Some(Ok(())),
                ..checked("a", "1.0.0", "1.1.0", true, false)
            },
            PackageItem {
                trigger: Some(Err(CheckError::MissingJenkinsUrl)),
                ..checked("bb", "1.0.0", "1.2.0", true, false)
            },
            checked("c", "1.0.0", "1.3.0", true, false),
        ];

        let report = render_trigger_report(&items);

        assert_eq!(
            report,
            "a [latest]   (1.0.0 → 1.1.0)  ✔\n\
             bb [latest]  (1.0.0 → 1.2.0)  ❌ [No usable Jenkins URL configured]\n"
        );
    }
}
