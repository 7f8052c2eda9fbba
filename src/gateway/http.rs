//! reqwest-backed [`Gateway`] implementation.
//!
//! Session credentials live in httpOnly cookies, so the client carries a
//! cookie store and never attaches tokens by hand. Backend failures arrive
//! as FastAPI-style `{"detail": "..."}` bodies and are mapped onto the
//! [`GatewayError`] taxonomy by status code.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{AuthSession, Gateway, GatewayError, RefreshedSession, SessionCheck};
use crate::config::Config;
use crate::ideas::model::{Idea, IdeaDraft, IdeaPatch};
use crate::session::store::Profile;

pub struct HttpGateway {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

impl HttpGateway {
    pub fn new(config: &Config) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(config.api.request_timeout_seconds))
            .build()?;

        Ok(Self {
            base_url: config.api.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Map a non-success response onto the error taxonomy, consuming the body.
    async fn into_error(response: reqwest::Response) -> GatewayError {
        let status = response.status();
        let detail = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|b| b.detail)
            .unwrap_or_else(|| status.to_string());

        match status {
            StatusCode::UNAUTHORIZED => GatewayError::Unauthenticated,
            StatusCode::TOO_MANY_REQUESTS => GatewayError::RateLimited,
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                GatewayError::Validation(detail)
            }
            StatusCode::NOT_FOUND => GatewayError::NotFound(detail),
            _ => GatewayError::Server(detail),
        }
    }

    /// Pass a successful response through, or convert it into an error.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::into_error(response).await)
        }
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn check_session(&self) -> Result<Option<SessionCheck>, GatewayError> {
        let response = self.client.get(self.url("/auth/me")).send().await?;

        // No session is an expected absence, not a failure
        if response.status() == StatusCode::UNAUTHORIZED {
            debug!("Session check found no live session");
            return Ok(None);
        }

        let check = Self::check(response).await?.json::<SessionCheck>().await?;
        Ok(Some(check))
    }

    async fn refresh_session(&self) -> Result<RefreshedSession, GatewayError> {
        let response = self.client.post(self.url("/auth/refresh")).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthSession, GatewayError> {
        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn signup(&self, email: &str, password: &str) -> Result<AuthSession, GatewayError> {
        let response = self
            .client
            .post(self.url("/auth/signup"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn logout(&self) -> Result<(), GatewayError> {
        let response = self.client.post(self.url("/auth/logout")).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn fetch_profile(&self) -> Result<Profile, GatewayError> {
        let response = self.client.get(self.url("/auth/me/profile")).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn list_ideas(&self) -> Result<Vec<Idea>, GatewayError> {
        let response = self.client.get(self.url("/ideas")).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn create_idea(&self, draft: &IdeaDraft) -> Result<Idea, GatewayError> {
        let response = self
            .client
            .post(self.url("/ideas"))
            .json(draft)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn update_idea(&self, id: &str, patch: &IdeaPatch) -> Result<Idea, GatewayError> {
        let response = self
            .client
            .patch(self.url(&format!("/ideas/{id}")))
            .json(patch)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn delete_idea(&self, id: &str) -> Result<(), GatewayError> {
        let response = self
            .client
            .delete(self.url(&format!("/ideas/{id}")))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let mut config = Config::default();
        config.api.base_url = "http://localhost:8000/api/".to_string();
        let gateway = HttpGateway::new(&config).unwrap();
        assert_eq!(gateway.url("/ideas"), "http://localhost:8000/api/ideas");
    }
}
