//! services/api/src/adapters/identity.rs
//!
//! Verifies bearer tokens against the identity backend's user endpoint
//! (`GET {auth_url}/auth/v1/user`).

use async_trait::async_trait;
use legal_lens_core::ports::{IdentityService, PortError, PortResult};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

#[derive(Clone)]
pub struct HttpIdentityAdapter {
    client: Client,
    user_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct UserResponse {
    id: Uuid,
}

impl HttpIdentityAdapter {
    pub fn new(auth_url: &str, api_key: Option<String>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(10)).build()?,
            user_url: format!("{}/auth/v1/user", auth_url.trim_end_matches('/')),
            api_key,
        })
    }
}

#[async_trait]
impl IdentityService for HttpIdentityAdapter {
    async fn verify_bearer(&self, token: &str) -> PortResult<Uuid> {
        let mut request = self.client.get(&self.user_url).bearer_auth(token);
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key);
        }

        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "identity backend unreachable");
            PortError::Upstream(e.to_string())
        })?;

        match response.status() {
            s if s.is_success() => {
                let user: UserResponse = response
                    .json()
                    .await
                    .map_err(|e| PortError::Upstream(format!("invalid user response: {}", e)))?;
                Ok(user.id)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(PortError::Unauthorized),
            s => Err(PortError::Upstream(format!("identity backend returned HTTP {}", s))),
        }
    }
}
