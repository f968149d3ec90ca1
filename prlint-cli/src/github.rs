//! GitHub API access: the pull request change-set query and check-run updates.

use crate::BoxFuture;
use crate::check_run::CheckRunStatus;
use crate::config::{ApiSettings, RepoRef};
use chrono::{DateTime, Utc};
use log::warn;
use prlint_core::{Annotation, ChangeSet, ChangedFile, Conclusion, PrLintError, Result};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

const USER_AGENT: &str = "prlint";
const ACCEPT: &str = "application/vnd.github+json";

/// Upper bound on changed files fetched for one pull request.
pub const MAX_PULL_REQUEST_FILES: u32 = 100;

const PULL_REQUEST_QUERY: &str = r#"query($owner: String!, $name: String!, $number: Int!, $first: Int!) {
  repository(owner: $owner, name: $name) {
    pullRequest(number: $number) {
      files(first: $first) {
        totalCount
        nodes { path }
      }
      commits(last: 1) {
        nodes { commit { oid } }
      }
    }
  }
}"#;

/// Source of pull request change sets.
pub trait PullRequestApi: Sync {
    /// Fetch the files and head commit of a pull request.
    fn change_set<'a>(&'a self, repo: &'a RepoRef, number: u64) -> BoxFuture<'a, ChangeSet>;
}

/// Check-run endpoints.
pub trait CheckRunApi: Sync {
    /// Create a check run and return its id.
    fn create_check_run<'a>(
        &'a self,
        repo: &'a RepoRef,
        request: &'a CreateCheckRun,
    ) -> BoxFuture<'a, u64>;

    /// Update an existing check run.
    fn update_check_run<'a>(
        &'a self,
        repo: &'a RepoRef,
        id: u64,
        request: &'a UpdateCheckRun,
    ) -> BoxFuture<'a, ()>;
}

/// Payload for creating a check run.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreateCheckRun {
    /// Check run name.
    pub name: String,
    /// Commit the check run is attached to.
    pub head_sha: String,
    /// Initial status.
    pub status: CheckRunStatus,
    /// When work started.
    pub started_at: DateTime<Utc>,
}

/// Payload for updating a check run; absent fields are left untouched.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UpdateCheckRun {
    /// Check run name.
    pub name: String,
    /// New status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CheckRunStatus>,
    /// When the run completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Final verdict.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<Conclusion>,
    /// Report output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<CheckRunOutput>,
}

/// Output block attached to a check run.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CheckRunOutput {
    /// Output title.
    pub title: String,
    /// Output summary.
    pub summary: String,
    /// Annotations for this request.
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: PullRequestVariables<'a>,
}

#[derive(Debug, Serialize)]
struct PullRequestVariables<'a> {
    owner: &'a str,
    name: &'a str,
    number: u64,
    first: u32,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct RepositoryData {
    repository: Option<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryNode {
    pull_request: Option<PullRequestNode>,
}

#[derive(Debug, Deserialize)]
struct PullRequestNode {
    files: Option<Connection<FileNode>>,
    commits: Option<Connection<CommitNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Connection<T> {
    total_count: Option<u64>,
    nodes: Option<Vec<T>>,
}

#[derive(Debug, Deserialize)]
struct FileNode {
    path: String,
}

#[derive(Debug, Deserialize)]
struct CommitNode {
    commit: CommitOid,
}

#[derive(Debug, Deserialize)]
struct CommitOid {
    oid: String,
}

#[derive(Debug, Deserialize)]
struct CreatedCheckRun {
    id: u64,
}

/// Turn a change-set query response into a [`ChangeSet`].
fn change_set_from_response(response: GraphQlResponse<RepositoryData>) -> Result<ChangeSet> {
    if !response.errors.is_empty() {
        let messages: Vec<&str> = response
            .errors
            .iter()
            .map(|error| error.message.as_str())
            .collect();
        return Err(PrLintError::transport(format!(
            "graphql query failed: {}",
            messages.join("; ")
        )));
    }
    let pull_request = response
        .data
        .and_then(|data| data.repository)
        .and_then(|repository| repository.pull_request)
        .ok_or_else(|| PrLintError::transport("graphql response missing pull request"))?;
    let connection = pull_request
        .files
        .ok_or_else(|| PrLintError::transport("graphql response missing file nodes"))?;
    let total_count = connection.total_count;
    let files = connection
        .nodes
        .ok_or_else(|| PrLintError::transport("graphql response missing file nodes"))?;
    let omitted = omitted_files(total_count, files.len());
    if omitted > 0 {
        warn!(
            "pull request changes {omitted} more file(s) than the {MAX_PULL_REQUEST_FILES} fetched; \
             they are not linted"
        );
    }
    let head_commit_id = pull_request
        .commits
        .and_then(|commits| commits.nodes)
        .and_then(|nodes| nodes.into_iter().last())
        .map(|node| node.commit.oid)
        .ok_or_else(|| PrLintError::transport("graphql response missing head commit"))?;

    Ok(ChangeSet {
        head_commit_id,
        files: files
            .into_iter()
            .map(|node| ChangedFile::new(node.path))
            .collect(),
    })
}

/// Files the platform reported beyond those returned in the first page.
fn omitted_files(total_count: Option<u64>, fetched: usize) -> u64 {
    total_count.map_or(0, |total| total.saturating_sub(fetched as u64))
}

/// Reqwest-backed GitHub client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    api_url: String,
    graphql_url: String,
    token: String,
}

impl GitHubClient {
    /// Build a client from API settings.
    pub fn new(settings: &ApiSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.timeout)
            .build()
            .map_err(|err| PrLintError::transport(format!("http client setup failed: {err}")))?;
        Ok(Self {
            client,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            graphql_url: settings.graphql_url.clone(),
            token: settings.token.clone(),
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("Accept", ACCEPT).bearer_auth(&self.token)
    }

    fn check_runs_url(&self, repo: &RepoRef) -> String {
        format!(
            "{}/repos/{}/{}/check-runs",
            self.api_url, repo.owner, repo.name
        )
    }

    async fn fetch_change_set(&self, repo: &RepoRef, number: u64) -> Result<ChangeSet> {
        let body = GraphQlRequest {
            query: PULL_REQUEST_QUERY,
            variables: PullRequestVariables {
                owner: &repo.owner,
                name: &repo.name,
                number,
                first: MAX_PULL_REQUEST_FILES,
            },
        };
        let request = self
            .authorized(self.client.post(&self.graphql_url))
            .json(&body);
        let response: GraphQlResponse<RepositoryData> = send_json(request).await?;
        change_set_from_response(response)
    }

    async fn create(&self, repo: &RepoRef, request: &CreateCheckRun) -> Result<u64> {
        let request = self
            .authorized(self.client.post(self.check_runs_url(repo)))
            .json(request);
        let created: CreatedCheckRun = send_json(request).await?;
        Ok(created.id)
    }

    async fn update(&self, repo: &RepoRef, id: u64, request: &UpdateCheckRun) -> Result<()> {
        let url = format!("{}/{id}", self.check_runs_url(repo));
        let request = self.authorized(self.client.patch(url)).json(request);
        send(request).await?;
        Ok(())
    }
}

impl PullRequestApi for GitHubClient {
    fn change_set<'a>(&'a self, repo: &'a RepoRef, number: u64) -> BoxFuture<'a, ChangeSet> {
        Box::pin(self.fetch_change_set(repo, number))
    }
}

impl CheckRunApi for GitHubClient {
    fn create_check_run<'a>(
        &'a self,
        repo: &'a RepoRef,
        request: &'a CreateCheckRun,
    ) -> BoxFuture<'a, u64> {
        Box::pin(self.create(repo, request))
    }

    fn update_check_run<'a>(
        &'a self,
        repo: &'a RepoRef,
        id: u64,
        request: &'a UpdateCheckRun,
    ) -> BoxFuture<'a, ()> {
        Box::pin(self.update(repo, id, request))
    }
}

async fn send(request: RequestBuilder) -> Result<reqwest::Response> {
    let response = request
        .send()
        .await
        .map_err(|err| PrLintError::transport(format!("github request failed: {err}")))?;
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(PrLintError::transport(format!(
            "github api error ({status}): {body}"
        )));
    }
    Ok(response)
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
    send(request)
        .await?
        .json::<T>()
        .await
        .map_err(|err| PrLintError::transport(format!("github response decode failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::PATCH;
    use httpmock::prelude::*;
    use prlint_core::AnnotationLevel;
    use std::time::Duration;

    fn repo() -> RepoRef {
        RepoRef {
            owner: "octo".to_string(),
            name: "widgets".to_string(),
        }
    }

    fn client_for(server: &MockServer) -> GitHubClient {
        GitHubClient::new(&ApiSettings {
            api_url: server.base_url(),
            graphql_url: server.url("/graphql"),
            token: "secret".to_string(),
            timeout: Duration::from_secs(5),
        })
        .expect("client")
    }

    fn parse(json: serde_json::Value) -> GraphQlResponse<RepositoryData> {
        serde_json::from_value(json).expect("response shape")
    }

    #[test]
    fn change_set_keeps_file_order_and_last_commit() {
        let response = parse(serde_json::json!({
            "data": {"repository": {"pullRequest": {
                "files": {"nodes": [{"path": "b.py"}, {"path": "a.js"}]},
                "commits": {"nodes": [{"commit": {"oid": "deadbeef"}}]}
            }}}
        }));
        let change_set = change_set_from_response(response).expect("change set");
        assert_eq!(change_set.head_commit_id, "deadbeef");
        assert_eq!(
            change_set.files,
            vec![ChangedFile::new("b.py"), ChangedFile::new("a.js")]
        );
    }

    #[test]
    fn change_set_counts_files_beyond_first_page() {
        let nodes: Vec<serde_json::Value> = (0..MAX_PULL_REQUEST_FILES)
            .map(|index| serde_json::json!({"path": format!("src/{index}.js")}))
            .collect();
        let response = parse(serde_json::json!({
            "data": {"repository": {"pullRequest": {
                "files": {"totalCount": 130, "nodes": nodes},
                "commits": {"nodes": [{"commit": {"oid": "deadbeef"}}]}
            }}}
        }));
        let change_set = change_set_from_response(response).expect("change set");
        assert_eq!(change_set.files.len(), MAX_PULL_REQUEST_FILES as usize);
        assert_eq!(omitted_files(Some(130), change_set.files.len()), 30);
        assert_eq!(omitted_files(Some(2), 2), 0);
        assert_eq!(omitted_files(None, 100), 0);
    }

    #[test]
    fn change_set_rejects_missing_nodes() {
        let response = parse(serde_json::json!({
            "data": {"repository": {"pullRequest": {
                "files": {},
                "commits": {"nodes": [{"commit": {"oid": "deadbeef"}}]}
            }}}
        }));
        let err = change_set_from_response(response).unwrap_err();
        assert!(matches!(err, PrLintError::Transport(_)));
        assert!(err.to_string().contains("file nodes"));
    }

    #[test]
    fn change_set_rejects_missing_commit() {
        let response = parse(serde_json::json!({
            "data": {"repository": {"pullRequest": {
                "files": {"nodes": []},
                "commits": {"nodes": []}
            }}}
        }));
        let err = change_set_from_response(response).unwrap_err();
        assert!(err.to_string().contains("head commit"));
    }

    #[test]
    fn change_set_surfaces_graphql_errors() {
        let response = parse(serde_json::json!({
            "data": {"repository": null},
            "errors": [{"message": "Could not resolve to a Repository"}]
        }));
        let err = change_set_from_response(response).unwrap_err();
        assert!(err.to_string().contains("Could not resolve"));
    }

    #[test]
    fn update_payload_omits_absent_fields() {
        let request = UpdateCheckRun {
            name: "ESLint".to_string(),
            status: None,
            completed_at: None,
            conclusion: None,
            output: Some(CheckRunOutput {
                title: "ESLint".to_string(),
                summary: "1 error(s), 0 warning(s) found".to_string(),
                annotations: vec![Annotation {
                    path: "a.js".to_string(),
                    start_line: 1,
                    end_line: 1,
                    annotation_level: AnnotationLevel::Failure,
                    message: "[semi] Missing semicolon.".to_string(),
                }],
            }),
        };
        let value = serde_json::to_value(&request).expect("json");
        assert!(value.get("status").is_none());
        assert!(value.get("conclusion").is_none());
        assert_eq!(value["output"]["annotations"][0]["annotation_level"], "failure");
    }

    #[tokio::test]
    async fn fetches_change_set_over_graphql() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/graphql")
                    .header("authorization", "Bearer secret")
                    .body_contains("totalCount")
                    .body_contains("\"owner\":\"octo\"")
                    .body_contains("\"number\":12");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(serde_json::json!({
                        "data": {"repository": {"pullRequest": {
                            "files": {"totalCount": 1, "nodes": [{"path": "src/a.js"}]},
                            "commits": {"nodes": [{"commit": {"oid": "cafe"}}]}
                        }}}
                    }));
            })
            .await;

        let client = client_for(&server);
        let change_set = client.change_set(&repo(), 12).await.expect("change set");
        assert_eq!(change_set.head_commit_id, "cafe");
        assert_eq!(change_set.files, vec![ChangedFile::new("src/a.js")]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn query_failure_is_a_transport_error() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/graphql");
                then.status(502).body("bad gateway");
            })
            .await;

        let client = client_for(&server);
        let err = client.change_set(&repo(), 12).await.unwrap_err();
        assert!(matches!(err, PrLintError::Transport(_)));
        assert!(err.to_string().contains("github api error"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn creates_and_updates_check_runs() {
        let server = MockServer::start_async().await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/repos/octo/widgets/check-runs")
                    .body_contains("\"status\":\"in_progress\"")
                    .body_contains("\"head_sha\":\"cafe\"");
                then.status(201)
                    .header("content-type", "application/json")
                    .json_body(serde_json::json!({"id": 99, "status": "in_progress"}));
            })
            .await;
        let update = server
            .mock_async(|when, then| {
                when.method(PATCH)
                    .path("/repos/octo/widgets/check-runs/99")
                    .body_contains("\"status\":\"completed\"")
                    .body_contains("\"conclusion\":\"failure\"");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(serde_json::json!({"id": 99}));
            })
            .await;

        let client = client_for(&server);
        let id = client
            .create_check_run(
                &repo(),
                &CreateCheckRun {
                    name: "ESLint".to_string(),
                    head_sha: "cafe".to_string(),
                    status: CheckRunStatus::InProgress,
                    started_at: Utc::now(),
                },
            )
            .await
            .expect("create");
        assert_eq!(id, 99);

        client
            .update_check_run(
                &repo(),
                id,
                &UpdateCheckRun {
                    name: "ESLint".to_string(),
                    status: Some(CheckRunStatus::Completed),
                    completed_at: Some(Utc::now()),
                    conclusion: Some(Conclusion::Failure),
                    output: None,
                },
            )
            .await
            .expect("update");

        create.assert_async().await;
        update.assert_async().await;
    }

    #[tokio::test]
    async fn update_rejection_is_a_transport_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PATCH).path("/repos/octo/widgets/check-runs/5");
                then.status(422).body("annotation_level is invalid");
            })
            .await;

        let client = client_for(&server);
        let err = client
            .update_check_run(
                &repo(),
                5,
                &UpdateCheckRun {
                    name: "ESLint".to_string(),
                    status: Some(CheckRunStatus::Completed),
                    completed_at: Some(Utc::now()),
                    conclusion: Some(Conclusion::Failure),
                    output: None,
                },
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("422"));
    }
}
