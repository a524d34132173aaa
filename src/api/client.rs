use async_trait::async_trait;
use reqwest::{header::ACCEPT, Client, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::{
    models::{BattleLog, ClubInfo, ClubMembers, PlayerProfile},
    ApiError, GameApi,
};
use crate::{config::Config, tag};

/// Bearer tokens used in turn, one per request.
///
/// Each token is throttled separately by the API, so spreading requests over
/// several tokens raises the effective rate limit.
#[derive(Debug)]
pub struct CredentialPool {
    tokens: Vec<String>,
    cursor: AtomicUsize,
}

impl CredentialPool {
    pub fn new(tokens: Vec<String>) -> Result<Self, ApiError> {
        let tokens: Vec<String> = tokens
            .into_iter()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .collect();

        if tokens.is_empty() {
            return Err(ApiError::NoCredentials);
        }

        Ok(Self {
            tokens,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Next token, wrapping around to the first one after the last.
    pub fn next_credential(&self) -> &str {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.tokens.len();
        &self.tokens[index]
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// HTTP client for the Brawl Stars API
pub struct BrawlStarsClient {
    http: Client,
    base_url: String,
    credentials: CredentialPool,
}

impl BrawlStarsClient {
    pub fn new(
        base_url: impl Into<String>,
        credentials: CredentialPool,
        request_timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let credentials = CredentialPool::new(config.api_keys.clone())?;
        Self::new(
            config.api_base_url.clone(),
            credentials,
            config.request_timeout,
        )
    }

    /// GETs `path` and decodes the body. A 404 is `Ok(None)`.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ApiError> {
        let url = format!("{}/{}", self.base_url, path);

        let response = self
            .http
            .get(&url)
            .bearer_auth(self.credentials.next_credential())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ApiError::Transport {
                url: url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(url = %url, "Resource not found");
            return Ok(None);
        }
        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "API request rejected");
            return Err(ApiError::Status {
                url,
                status: status.as_u16(),
            });
        }

        response
            .json::<T>()
            .await
            .map(Some)
            .map_err(|e| ApiError::Decode {
                url,
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl GameApi for BrawlStarsClient {
    #[instrument(skip(self))]
    async fn player_profile(&self, player_tag: &str) -> Result<Option<PlayerProfile>, ApiError> {
        self.get_json(&format!("players/{}", tag::path_segment(player_tag)))
            .await
    }

    #[instrument(skip(self))]
    async fn battle_log(&self, player_tag: &str) -> Result<Option<BattleLog>, ApiError> {
        let log: Option<BattleLog> = self
            .get_json(&format!("players/{}/battlelog", tag::path_segment(player_tag)))
            .await?;

        Ok(log.filter(|log| !log.is_not_found()))
    }

    #[instrument(skip(self))]
    async fn club_info(&self, club_tag: &str) -> Result<Option<ClubInfo>, ApiError> {
        self.get_json(&format!("clubs/{}", tag::path_segment(club_tag)))
            .await
    }

    #[instrument(skip(self))]
    async fn club_members(&self, club_tag: &str) -> Result<Option<ClubMembers>, ApiError> {
        self.get_json(&format!("clubs/{}/members", tag::path_segment(club_tag)))
            .await
    }
}
