use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::{OkrError, Result};
use crate::source::ObjectiveSource;
use crate::types::{ActivityItem, ActivityStatus, NewActivity, NewObjective, Objective};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ApiObjective {
    id: String,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    progress: f64,
    #[serde(default)]
    created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiObjectiveList {
    objectives: Vec<ApiObjective>,
}

#[derive(Debug, Deserialize)]
struct ApiKeyResult {
    id: String,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    current_value: Option<f64>,
    #[serde(default)]
    status: String,
    #[serde(default)]
    owner_name: Option<String>,
}

impl From<ApiKeyResult> for ActivityItem {
    fn from(kr: ApiKeyResult) -> Self {
        ActivityItem {
            id: kr.id,
            title: kr.title,
            status: ActivityStatus::from_api_status(&kr.status),
            progress: percent(kr.current_value.unwrap_or_default()),
            assignee: kr.owner_name.unwrap_or_default(),
            due_date: None,
            observation: kr.description,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiKeyResultList {
    key_results: Vec<ApiKeyResult>,
}

#[derive(Debug, Deserialize)]
struct Created {
    id: String,
}

#[derive(Debug, Serialize)]
struct ObjectivePayload<'a> {
    title: &'a str,
    description: &'a str,
}

/// Activities are stored as percentage key results on the backend.
#[derive(Debug, Serialize)]
struct KeyResultPayload<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    target_value: f64,
    current_value: f64,
    start_value: f64,
    unit: &'static str,
    status: &'static str,
}

impl<'a> KeyResultPayload<'a> {
    fn new(title: &'a str, observation: Option<&'a str>, progress: u8, status: &'static str) -> Self {
        Self {
            title,
            description: observation,
            target_value: 100.0,
            current_value: f64::from(progress),
            start_value: 0.0,
            unit: "PERCENTAGE",
            status,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    detail: serde_json::Value,
}

/// Answer of `GET /auth/token-status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerTokenStatus {
    pub valid: bool,
    pub expired: bool,
    #[serde(default)]
    pub expires_soon: Option<bool>,
    #[serde(default)]
    pub expires_in_minutes: Option<f64>,
    #[serde(default)]
    pub message: String,
}

// ---------------------------------------------------------------------------
// RemoteObjectiveStore
// ---------------------------------------------------------------------------

/// [`ObjectiveSource`] backed by the OKR REST API.
#[derive(Debug, Clone)]
pub struct RemoteObjectiveStore {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl RemoteObjectiveStore {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn token_status(&self) -> Result<ServerTokenStatus> {
        let response = self.send(self.request(Method::GET, "/auth/token-status")).await?;
        Ok(response.json().await?)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn list_activities(&self, objective_id: &str) -> Result<Vec<ActivityItem>> {
        let path = format!("/objectives/{objective_id}/key-results");
        let response = self.send(self.request(Method::GET, &path)).await?;
        let list: ApiKeyResultList = response.json().await?;
        Ok(list.key_results.into_iter().map(ActivityItem::from).collect())
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(OkrError::Api {
            status: status.as_u16(),
            message: error_message(&body, status.canonical_reason()),
        })
    }
}

fn percent(value: f64) -> u8 {
    value.clamp(0.0, 100.0).round() as u8
}

/// Prefer the backend's `detail` field; fall back to the raw body.
fn error_message(body: &str, reason: Option<&str>) -> String {
    if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) {
        return match parsed.detail {
            serde_json::Value::String(detail) => detail,
            other => other.to_string(),
        };
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        reason.unwrap_or("request failed").to_string()
    } else {
        trimmed.to_string()
    }
}

#[async_trait]
impl ObjectiveSource for RemoteObjectiveStore {
    async fn list_objectives(&self) -> Result<Vec<Objective>> {
        let response = self.send(self.request(Method::GET, "/objectives/")).await?;
        let list: ApiObjectiveList = response.json().await?;

        let mut objectives = Vec::with_capacity(list.objectives.len());
        for o in list.objectives {
            let activities = self.list_activities(&o.id).await?;
            objectives.push(Objective {
                id: o.id,
                title: o.title,
                description: o.description.unwrap_or_default(),
                progress: percent(o.progress),
                activities,
                created_at: o.created_at,
            });
        }
        Ok(objectives)
    }

    async fn add_objective(&self, data: NewObjective) -> Result<String> {
        data.validate()?;
        let payload = ObjectivePayload {
            title: data.title.trim(),
            description: &data.description,
        };
        let response = self
            .send(self.request(Method::POST, "/objectives/").json(&payload))
            .await?;
        let created: Created = response.json().await?;
        debug!(objective = %created.id, "objective created remotely");
        Ok(created.id)
    }

    async fn add_activity(&self, objective_id: &str, activity: NewActivity) -> Result<String> {
        activity.validate()?;
        let payload = KeyResultPayload::new(
            activity.title.trim(),
            activity.observation.as_deref(),
            activity.progress,
            activity.status.as_api_status(),
        );
        let path = format!("/objectives/{objective_id}/key-results");
        let response = self
            .send(self.request(Method::POST, &path).json(&payload))
            .await?;
        let created: Created = response.json().await?;
        Ok(created.id)
    }

    async fn update_activity(&self, _objective_id: &str, activity: ActivityItem) -> Result<()> {
        activity.validate()?;
        let payload = KeyResultPayload::new(
            activity.title.trim(),
            activity.observation.as_deref(),
            activity.progress,
            activity.status.as_api_status(),
        );
        let path = format!("/objectives/key-results/{}", activity.id);
        self.send(self.request(Method::PUT, &path).json(&payload))
            .await?;
        Ok(())
    }

    async fn delete_activity(&self, _objective_id: &str, activity_id: &str) -> Result<()> {
        let path = format!("/objectives/key-results/{activity_id}");
        self.send(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }

    async fn delete_objective(&self, objective_id: &str) -> Result<()> {
        let path = format!("/objectives/{objective_id}");
        self.send(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }
}
