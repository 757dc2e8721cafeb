//! JIRA board client
//!
//! Talks to JIRA Server/Data Center through REST API v2, where descriptions
//! are plain text and users are addressed by name.

use super::board::BoardClient;
use crate::config::JiraConfig;
use crate::model::BoardIssue;
use crate::reconcile::NewIssue;
use crate::{Result, SyncError};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Per-request timeout for search/query operations (large result sets)
const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);
/// Per-request timeout for single issue fetches
const GET_TIMEOUT: Duration = Duration::from_secs(10);
/// Per-request timeout for create/update operations
const WRITE_TIMEOUT: Duration = Duration::from_secs(15);

/// Page size for searches
const PAGE_SIZE: u32 = 100;

const BASE_FIELDS: &str = "summary,description,status,labels,assignee";

/// JIRA issue representation
#[derive(Debug, Clone, Deserialize)]
pub struct JiraIssue {
    pub key: String,
    pub fields: JiraFields,
}

/// JIRA issue fields
#[derive(Debug, Clone, Deserialize)]
pub struct JiraFields {
    #[serde(default)]
    pub description: Option<String>,
    pub status: JiraStatus,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub assignee: Option<JiraUser>,
    /// Custom fields, including story points
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JiraStatus {
    pub name: String,
    #[serde(rename = "statusCategory", default)]
    pub status_category: Option<JiraStatusCategory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JiraStatusCategory {
    pub key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JiraUser {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(rename = "emailAddress", default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct JiraSearchResponse {
    total: u32,
    #[serde(rename = "startAt")]
    start_at: u32,
    issues: Vec<JiraIssue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JiraTransition {
    pub id: String,
    pub name: String,
    pub to: JiraStatus,
}

#[derive(Debug, Clone, Deserialize)]
struct JiraTransitionsResponse {
    transitions: Vec<JiraTransition>,
}

#[derive(Debug, Clone, Deserialize)]
struct JiraCreatedIssue {
    key: String,
}

#[derive(Debug, Clone, Serialize)]
struct JiraTransitionRequest {
    transition: JiraTransitionId,
}

#[derive(Debug, Clone, Serialize)]
struct JiraTransitionId {
    id: String,
}

/// Quote a value for use in JQL
fn jql_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Find the transition reaching `status`, by target status or transition name
fn find_transition<'a>(transitions: &'a [JiraTransition], status: &str) -> Option<&'a JiraTransition> {
    transitions
        .iter()
        .find(|t| t.to.name.eq_ignore_ascii_case(status))
        .or_else(|| transitions.iter().find(|t| t.name.eq_ignore_ascii_case(status)))
}

/// Error for a create whose POST succeeded but whose follow-up failed
fn created_but_failed(key: &str, error: SyncError) -> SyncError {
    SyncError::Board(format!("created {} but {}", key, error))
}

/// JIRA API client
pub struct JiraBoard {
    client: Client,
    base_url: String,
    project: String,
    issue_type: String,
    story_points_field: Option<String>,
    closed_status: Option<String>,
    auth_token: Option<String>,
}

impl JiraBoard {
    /// Create a new JIRA client
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &JiraConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("jira-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: format!("{}/rest/api/2", config.instance_url.trim_end_matches('/')),
            project: config.project.clone(),
            issue_type: config.default_issue_type.clone(),
            story_points_field: config.story_points_field.clone().filter(|f| !f.is_empty()),
            closed_status: config.statuses.closed.clone().filter(|s| !s.is_empty()),
            auth_token: config.resolve_token(),
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.auth_token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Map a non-success response to a board error
    async fn check(response: Response, what: &str) -> Result<Response> {
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED => {
                Err(SyncError::Board("JIRA authentication failed".to_string()))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                Err(SyncError::Board(format!(
                    "Rate limited while trying to {}, retry after {} seconds",
                    what, retry_after
                )))
            }
            status => {
                let error_body = response.text().await.unwrap_or_default();
                Err(SyncError::Board(format!(
                    "JIRA API error trying to {}: HTTP {}: {}",
                    what, status, error_body
                )))
            }
        }
    }

    fn fields_param(&self) -> String {
        match self.story_points_field {
            Some(ref field) => format!("{},{}", BASE_FIELDS, field),
            None => BASE_FIELDS.to_string(),
        }
    }

    /// JQL selecting the issues of one scope
    fn scope_jql(&self, management_label: &str, repo_label: &str, include_closed: bool) -> String {
        let mut jql = format!(
            "project = {} AND labels = {} AND labels = {}",
            jql_quote(&self.project),
            jql_quote(management_label),
            jql_quote(repo_label)
        );
        if !include_closed {
            jql.push_str(" AND statusCategory != Done");
        }
        jql.push_str(" ORDER BY key ASC");
        jql
    }

    /// Search for issues using JQL, following pagination
    pub async fn search(&self, jql: &str) -> Result<Vec<JiraIssue>> {
        let url = format!("{}/search", self.base_url);
        let fields = self.fields_param();
        let mut issues = Vec::new();

        debug!(jql = %jql, "Searching JIRA issues");

        loop {
            let params = [
                ("jql", jql.to_string()),
                ("startAt", issues.len().to_string()),
                ("maxResults", PAGE_SIZE.to_string()),
                ("fields", fields.clone()),
            ];
            let request = self.authorized(self.client.get(&url).query(&params));
            let response = Self::check(request.timeout(SEARCH_TIMEOUT).send().await?, "search").await?;
            let page: JiraSearchResponse = response.json().await?;

            let returned = page.issues.len();
            issues.extend(page.issues);
            if returned == 0 || page.start_at as usize + returned >= page.total as usize {
                info!(total = page.total, returned = issues.len(), "JIRA search complete");
                return Ok(issues);
            }
        }
    }

    /// Get a single issue by key
    pub async fn get_issue(&self, key: &str) -> Result<JiraIssue> {
        let url = format!("{}/issue/{}", self.base_url, key);

        debug!(key = %key, "Fetching JIRA issue");

        let request = self.authorized(self.client.get(&url).query(&[("fields", self.fields_param())]));
        let response = request.timeout(GET_TIMEOUT).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(SyncError::Board(format!("JIRA issue not found: {}", key)));
        }
        Ok(Self::check(response, "fetch issue").await?.json().await?)
    }

    /// Get available transitions for an issue
    pub async fn get_transitions(&self, key: &str) -> Result<Vec<JiraTransition>> {
        let url = format!("{}/issue/{}/transitions", self.base_url, key);

        let request = self.authorized(self.client.get(&url));
        let response = Self::check(
            request.timeout(GET_TIMEOUT).send().await?,
            "list transitions",
        )
        .await?;
        let result: JiraTransitionsResponse = response.json().await?;
        Ok(result.transitions)
    }

    async fn edit_issue(&self, key: &str, body: &Value, what: &str) -> Result<()> {
        let url = format!("{}/issue/{}", self.base_url, key);
        let request = self.authorized(self.client.put(&url).json(body));
        Self::check(request.timeout(WRITE_TIMEOUT).send().await?, what).await?;
        Ok(())
    }

    /// Convert a JIRA issue to the board view
    pub fn to_board_issue(&self, issue: JiraIssue) -> BoardIssue {
        let fields = issue.fields;
        let open = fields
            .status
            .status_category
            .as_ref()
            .map_or(true, |cat| cat.key != "done");
        let story_points = self
            .story_points_field
            .as_ref()
            .and_then(|field| fields.extra.get(field))
            .and_then(Value::as_f64);

        let mut board_issue = BoardIssue::new(
            issue.key,
            fields.status.name,
            fields.description.unwrap_or_default(),
        )
        .with_labels(fields.labels);
        if let Some(user) = fields.assignee {
            let mut ids = user.name.into_iter().chain(user.key).chain(user.email);
            board_issue.assignee = ids.next();
            board_issue.assignee_aliases.extend(ids);
        }
        board_issue.story_points = story_points;
        board_issue.open = open;
        board_issue
    }

    /// Fetch a freshly created issue and move it to its initial status
    async fn finish_create(&self, key: &str, issue: &NewIssue) -> Result<BoardIssue> {
        let mut board_issue = self.to_board_issue(self.get_issue(key).await?);
        if let Some(ref status) = issue.status {
            if !board_issue.status.eq_ignore_ascii_case(status) {
                self.transition_status(key, status).await?;
                board_issue.status = status.clone();
            }
        }
        Ok(board_issue)
    }

    fn create_fields(&self, issue: &NewIssue) -> Value {
        let mut fields = Map::new();
        fields.insert("project".into(), json!({ "key": self.project }));
        fields.insert("summary".into(), json!(issue.title));
        fields.insert("description".into(), json!(issue.description));
        fields.insert("issuetype".into(), json!({ "name": self.issue_type }));
        fields.insert("labels".into(), json!(issue.labels));
        if let Some(ref assignee) = issue.assignee {
            fields.insert("assignee".into(), json!({ "name": assignee }));
        }
        if let (Some(field), Some(points)) = (&self.story_points_field, issue.story_points) {
            fields.insert(field.clone(), json!(points));
        }
        json!({ "fields": fields })
    }
}

#[async_trait]
impl BoardClient for JiraBoard {
    async fn search_issues(
        &self,
        management_label: &str,
        repo_label: &str,
        include_closed: bool,
    ) -> Result<Vec<BoardIssue>> {
        let jql = self.scope_jql(management_label, repo_label, include_closed);
        let issues = self.search(&jql).await?;
        Ok(issues.into_iter().map(|i| self.to_board_issue(i)).collect())
    }

    async fn create_issue(&self, issue: &NewIssue) -> Result<BoardIssue> {
        let url = format!("{}/issue", self.base_url);
        let body = self.create_fields(issue);

        info!(url = %issue.ticket_url, "Creating JIRA issue");

        let request = self.authorized(self.client.post(&url).json(&body));
        let response = Self::check(request.timeout(WRITE_TIMEOUT).send().await?, "create issue").await?;
        let created: JiraCreatedIssue = response.json().await?;

        let board_issue = self
            .finish_create(&created.key, issue)
            .await
            .map_err(|e| created_but_failed(&created.key, e))?;

        info!(key = %board_issue.key, url = %issue.ticket_url, "Created JIRA issue");
        Ok(board_issue)
    }

    async fn update_labels(&self, key: &str, labels: &[String]) -> Result<()> {
        let adds: Vec<Value> = labels.iter().map(|l| json!({ "add": l })).collect();
        info!(key = %key, labels = ?labels, "Adding labels to JIRA issue");
        self.edit_issue(key, &json!({ "update": { "labels": adds } }), "add labels")
            .await
    }

    async fn update_assignee(&self, key: &str, assignee: Option<&str>) -> Result<()> {
        let url = format!("{}/issue/{}/assignee", self.base_url, key);
        info!(key = %key, assignee = ?assignee, "Changing JIRA assignee");

        let request = self.authorized(self.client.put(&url).json(&json!({ "name": assignee })));
        Self::check(request.timeout(WRITE_TIMEOUT).send().await?, "assign issue").await?;
        Ok(())
    }

    async fn update_story_points(&self, key: &str, points: u32) -> Result<()> {
        let field = self.story_points_field.as_ref().ok_or_else(|| {
            SyncError::Board("No story points field configured".to_string())
        })?;
        info!(key = %key, points, "Setting JIRA story points");

        let mut fields = Map::new();
        fields.insert(field.clone(), json!(points));
        self.edit_issue(key, &json!({ "fields": fields }), "set story points")
            .await
    }

    async fn transition_status(&self, key: &str, status: &str) -> Result<()> {
        let transitions = self.get_transitions(key).await?;
        let Some(transition) = find_transition(&transitions, status) else {
            warn!(
                key = %key,
                target = %status,
                available = ?transitions.iter().map(|t| &t.to.name).collect::<Vec<_>>(),
                "No transition available to target status"
            );
            return Err(SyncError::Board(format!(
                "No transition to '{}' available for {}",
                status, key
            )));
        };

        info!(key = %key, transition_id = %transition.id, status = %status, "Transitioning JIRA issue");

        let url = format!("{}/issue/{}/transitions", self.base_url, key);
        let body = JiraTransitionRequest {
            transition: JiraTransitionId {
                id: transition.id.clone(),
            },
        };
        let request = self.authorized(self.client.post(&url).json(&body));
        Self::check(request.timeout(WRITE_TIMEOUT).send().await?, "transition issue").await?;
        Ok(())
    }

    async fn close_issue(&self, key: &str) -> Result<()> {
        let status = self
            .closed_status
            .clone()
            .ok_or_else(|| SyncError::Board("No closed status configured".to_string()))?;
        self.transition_status(key, &status).await
    }
}
