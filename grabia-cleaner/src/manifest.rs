use std::collections::{BTreeMap, BTreeSet, HashSet};

use futures_util::stream::{self, StreamExt};
use grabia_core::{ArchiveClient, ArchiveError};

use crate::context::RunContext;
use crate::filter::{FilterRules, expected_names};

/// Identifier -> expected relative names. A missing key means no manifest
/// was obtained, which is different from an empty set.
pub type ExpectedFileSet = BTreeMap<String, BTreeSet<String>>;

#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub expected: ExpectedFileSet,
    /// Identifiers whose manifest could not be fetched, first-seen order.
    pub failed: Vec<String>,
}

pub struct ManifestFetcher {
    client: ArchiveClient,
    rules: FilterRules,
    keep_readme: bool,
    concurrency: usize,
}

impl ManifestFetcher {
    pub fn new(client: ArchiveClient, rules: FilterRules, keep_readme: bool) -> Self {
        Self {
            client,
            rules,
            keep_readme,
            concurrency: 1,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn fetch_one(&self, identifier: &str) -> Result<BTreeSet<String>, ArchiveError> {
        let metadata = self.client.get_metadata(identifier).await?;
        Ok(expected_names(
            &metadata.files,
            &self.rules,
            self.keep_readme,
        ))
    }

    /// Fetches every manifest, reporting progress over 0..50. Results are
    /// collected in identifier order; a failed identifier is logged and left
    /// out of the map. Not-yet-started and in-flight fetches stop on cancel.
    pub async fn fetch_all(&self, identifiers: &[String], ctx: &RunContext) -> FetchOutcome {
        let total = identifiers.len();
        let mut outcome = FetchOutcome::default();
        if total == 0 {
            return outcome;
        }

        let results = stream::iter(identifiers.iter().cloned().enumerate())
            .map(|(idx, identifier)| async move {
                if ctx.is_cancelled() {
                    return (identifier, None);
                }
                ctx.info(format!(
                    "fetching manifest [{}/{total}]: {identifier}",
                    idx + 1
                ));
                let result = tokio::select! {
                    _ = ctx.cancelled() => None,
                    result = self.fetch_one(&identifier) => Some(result),
                };
                (identifier, result)
            })
            .buffered(self.concurrency);
        let mut results = std::pin::pin!(results);

        let mut processed = 0usize;
        while let Some((identifier, result)) = results.next().await {
            processed += 1;
            ctx.progress(fetch_progress(processed, total));
            match result {
                None => {}
                Some(Ok(names)) => {
                    ctx.info(format!(
                        "{identifier}: {} expected file(s)",
                        names.len()
                    ));
                    outcome.expected.insert(identifier, names);
                }
                Some(Err(err)) => {
                    if err.is_transport() {
                        ctx.error(format!("error fetching {identifier}: {err}"));
                    } else {
                        ctx.warn(format!("failed to fetch metadata: {identifier} ({err})"));
                    }
                    outcome.failed.push(identifier);
                }
            }
        }

        let mut seen = HashSet::new();
        let expected = &outcome.expected;
        outcome
            .failed
            .retain(|id| !expected.contains_key(id) && seen.insert(id.clone()));
        outcome
    }
}

fn fetch_progress(processed: usize, total: usize) -> u8 {
    ((processed.min(total) * 50) / total.max(1)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::recording_context;
    use crate::events::Level;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    async fn mount_manifest(server: &MockServer, identifier: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(format!("/metadata/{identifier}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    fn fetcher(server: &MockServer, rules: FilterRules, keep_readme: bool) -> ManifestFetcher {
        let client = ArchiveClient::with_base_url(&server.uri()).unwrap();
        ManifestFetcher::new(client, rules, keep_readme)
    }

    #[test]
    fn fetch_progress_spans_first_half() {
        assert_eq!(fetch_progress(0, 4), 0);
        assert_eq!(fetch_progress(1, 4), 12);
        assert_eq!(fetch_progress(4, 4), 50);
        assert_eq!(fetch_progress(9, 4), 50);
    }

    #[tokio::test]
    async fn fetch_all_filters_and_sanitizes() {
        let server = MockServer::start().await;
        mount_manifest(
            &server,
            "item1",
            json!({
                "files": [
                    { "name": "a.txt", "size": "10" },
                    { "name": "item1_meta.xml", "size": "5" },
                    { "name": "sub/b:c.txt", "size": 3 },
                    { "name": "zero.txt", "size": "0" }
                ]
            }),
        )
        .await;

        let (ctx, sink) = recording_context();
        let outcome = fetcher(&server, FilterRules::default(), true)
            .fetch_all(&ids(&["item1"]), &ctx)
            .await;

        let names: Vec<&str> = outcome.expected["item1"].iter().map(String::as_str).collect();
        assert_eq!(names, vec!["README.txt", "a.txt", "sub_b_c.txt"]);
        assert!(outcome.failed.is_empty());
        assert_eq!(sink.progress(), vec![50]);
    }

    #[tokio::test]
    async fn failed_fetch_is_absent_not_empty() {
        let server = MockServer::start().await;
        mount_manifest(&server, "empty", json!({ "files": [] })).await;
        Mock::given(method("GET"))
            .and(path("/metadata/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/metadata/garbled"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let (ctx, sink) = recording_context();
        let outcome = fetcher(&server, FilterRules::default(), false)
            .with_concurrency(2)
            .fetch_all(&ids(&["empty", "gone", "garbled", "gone"]), &ctx)
            .await;

        assert!(outcome.expected["empty"].is_empty());
        assert!(!outcome.expected.contains_key("gone"));
        assert!(!outcome.expected.contains_key("garbled"));
        assert_eq!(outcome.failed, vec!["gone".to_string(), "garbled".to_string()]);
        assert_eq!(sink.messages(Level::Warning).len(), 2);
        assert_eq!(sink.messages(Level::Error).len(), 1);
        assert_eq!(sink.progress(), vec![12, 25, 37, 50]);
    }

    #[tokio::test]
    async fn cancelled_context_issues_no_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "files": [] })))
            .expect(0)
            .mount(&server)
            .await;

        let (ctx, _sink) = recording_context();
        ctx.cancel();
        let outcome = fetcher(&server, FilterRules::default(), true)
            .fetch_all(&ids(&["item1", "item2"]), &ctx)
            .await;

        assert!(outcome.expected.is_empty());
        assert!(outcome.failed.is_empty());
    }
}
