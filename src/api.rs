//! HTTP client for the remote activity API.
//!
//! The client is an explicit object built from a base URL and a credential
//! provider - no global singleton, no ambient interceptors. Every request
//! carries a bearer token when one is available. There are no retries and no
//! de-duplication of in-flight requests.

use reqwest::{Method, Response, StatusCode};
use std::sync::Arc;
use thiserror::Error;

use crate::models::{
    ActivityDto, CreateActivityRequest, TimerAction, TimerActionRequest, UpdateActivityRequest,
};

/// Supplies the bearer credential attached to every request.
///
/// A missing token simply sends the request unauthenticated; an expired or
/// invalid one surfaces as a [`ApiError::Status`] from the server.
pub trait TokenProvider: Send + Sync {
    fn token(&self) -> Option<String>;
}

/// Token provider backed by a fixed (possibly absent) credential
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: Option<String>) -> Arc<Self> {
        Arc::new(Self(token))
    }
}

impl TokenProvider for StaticToken {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Error at the remote-call boundary
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Status { status: StatusCode, message: String },
}

/// Client for the consumed surface of the activity API
pub struct ActivityClient {
    http: reqwest::Client,
    base_url: String,
    token: Arc<dyn TokenProvider>,
}

impl ActivityClient {
    pub fn new(base_url: impl Into<String>, token: Arc<dyn TokenProvider>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            token,
        }
    }

    /// `GET /activities?skip&limit&tag`
    pub async fn list_activities(
        &self,
        skip: u32,
        limit: u32,
        tag: Option<&str>,
    ) -> Result<Vec<ActivityDto>, ApiError> {
        let mut request = self
            .request(Method::GET, "/activities")
            .query(&[("skip", skip), ("limit", limit)]);
        if let Some(tag) = tag {
            request = request.query(&[("tag", tag)]);
        }

        let response = Self::check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    /// `GET /activities/{id}`
    pub async fn get_activity(&self, id: &str) -> Result<ActivityDto, ApiError> {
        let request = self.request(Method::GET, &format!("/activities/{id}"));
        let response = Self::check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    /// `POST /activities`
    pub async fn create_activity(
        &self,
        body: &CreateActivityRequest,
    ) -> Result<ActivityDto, ApiError> {
        let request = self.request(Method::POST, "/activities").json(body);
        let response = Self::check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    /// `PUT /activities/{id}`
    pub async fn update_activity(
        &self,
        id: &str,
        body: &UpdateActivityRequest,
    ) -> Result<ActivityDto, ApiError> {
        let request = self
            .request(Method::PUT, &format!("/activities/{id}"))
            .json(body);
        let response = Self::check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    /// `DELETE /activities/{id}`
    pub async fn delete_activity(&self, id: &str) -> Result<(), ApiError> {
        let request = self.request(Method::DELETE, &format!("/activities/{id}"));
        Self::check(request.send().await?).await?;
        Ok(())
    }

    /// `POST /activities/{id}/timer`
    pub async fn timer_action(
        &self,
        id: &str,
        action: TimerAction,
    ) -> Result<ActivityDto, ApiError> {
        let request = self
            .request(Method::POST, &format!("/activities/{id}/timer"))
            .json(&TimerActionRequest { action });
        let response = Self::check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(method = %method, url = %url, "sending request");

        let mut request = self.http.request(method, &url);
        if let Some(token) = self.token.token() {
            request = request.bearer_auth(token);
        }
        request
    }

    /// Turn a non-2xx response into a typed error, pulling the message from
    /// the body's `detail`/`error` field when the server sends one.
    async fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|value| {
                value
                    .get("detail")
                    .or_else(|| value.get("error"))
                    .and_then(|m| m.as_str())
                    .map(String::from)
            })
            .unwrap_or(body);

        Err(ApiError::Status { status, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ActivityClient {
        ActivityClient::new(server.uri(), StaticToken::new(Some("secret".to_string())))
    }

    fn activity_json(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "title": "Write report",
            "recorded_time": 120,
            "timer_status": "idle",
            "tags": []
        })
    }

    #[tokio::test]
    async fn attaches_bearer_token_to_every_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/activities"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([activity_json("1")])))
            .expect(1)
            .mount(&server)
            .await;

        let activities = client(&server).list_activities(0, 15, None).await.unwrap();
        assert_eq!(activities.len(), 1);
    }

    #[tokio::test]
    async fn list_passes_pagination_and_tag_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/activities"))
            .and(query_param("skip", "30"))
            .and(query_param("limit", "15"))
            .and(query_param("tag", "urgent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let activities = client(&server)
            .list_activities(30, 15, Some("urgent"))
            .await
            .unwrap();
        assert!(activities.is_empty());
    }

    #[tokio::test]
    async fn timer_action_posts_to_timer_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/activities/1/timer"))
            .and(body_json(json!({"action": "start"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(activity_json("1")))
            .expect(1)
            .mount(&server)
            .await;

        let activity = client(&server)
            .timer_action("1", TimerAction::Start)
            .await
            .unwrap();
        assert_eq!(activity.id, "1");
    }

    #[tokio::test]
    async fn non_2xx_becomes_status_error_with_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/activities/1"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"detail": "Activity not found"})),
            )
            .mount(&server)
            .await;

        let error = client(&server).delete_activity("1").await.unwrap_err();
        match error {
            ApiError::Status { status, message } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(message, "Activity not found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
