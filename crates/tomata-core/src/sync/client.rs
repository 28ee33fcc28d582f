//! Remote session store transport.
//!
//! `RemoteStore` is the seam the reconciler works against; `HttpRemoteStore`
//! is the HTTP implementation talking to the configured backup endpoint.

use reqwest::{Client, RequestBuilder, StatusCode};
use url::Url;
use uuid::Uuid;

use crate::session::Session;
use crate::storage::config::Config;
use crate::sync::types::SyncError;

/// Abstraction over the remote session store.
pub trait RemoteStore {
    /// Fetch every session the remote knows about.
    fn fetch_all(&self) -> Result<Vec<Session>, SyncError>;

    /// Create-or-replace the given sessions remotely, keyed by session id.
    fn upsert(&self, sessions: &[Session]) -> Result<(), SyncError>;

    /// Delete the given sessions remotely. Unknown ids are not an error.
    fn delete(&self, ids: &[Uuid]) -> Result<(), SyncError>;
}

/// HTTP-backed remote store.
///
/// Exposes a blocking facade over reqwest's async client via an embedded
/// current-thread runtime, so callers stay synchronous.
pub struct HttpRemoteStore {
    base: Url,
    token: Option<String>,
    client: Client,
    runtime: tokio::runtime::Runtime,
}

impl HttpRemoteStore {
    pub fn new(base: Url, token: Option<String>) -> Result<Self, SyncError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| SyncError::Remote(format!("failed to create runtime: {}", e)))?;
        Ok(Self {
            base,
            token,
            client: Client::new(),
            runtime,
        })
    }

    /// Build a store from the `[sync]` config section. A missing endpoint
    /// means no backup account is set up.
    pub fn from_config(config: &Config) -> Result<Self, SyncError> {
        let endpoint = config
            .sync
            .endpoint
            .as_deref()
            .ok_or(SyncError::AccountUnavailable)?;
        let base = Url::parse(endpoint)
            .map_err(|e| SyncError::Remote(format!("invalid sync endpoint: {}", e)))?;
        Self::new(base, config.sync.token.clone())
    }

    fn endpoint(&self, path: &str) -> Result<Url, SyncError> {
        let raw = format!("{}/{}", self.base.as_str().trim_end_matches('/'), path);
        Url::parse(&raw).map_err(|e| SyncError::Remote(format!("invalid URL {}: {}", raw, e)))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn check(response: reqwest::Response) -> Result<reqwest::Response, SyncError> {
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SyncError::AccountUnavailable),
            status if !status.is_success() => {
                Err(SyncError::Remote(format!("unexpected status {}", status)))
            }
            _ => Ok(response),
        }
    }
}

impl RemoteStore for HttpRemoteStore {
    fn fetch_all(&self) -> Result<Vec<Session>, SyncError> {
        let url = self.endpoint("sessions")?;
        self.runtime.block_on(async {
            let response = self.authorize(self.client.get(url)).send().await?;
            let response = Self::check(response)?;
            Ok(response.json::<Vec<Session>>().await?)
        })
    }

    fn upsert(&self, sessions: &[Session]) -> Result<(), SyncError> {
        let url = self.endpoint("sessions")?;
        self.runtime.block_on(async {
            let response = self
                .authorize(self.client.put(url).json(sessions))
                .send()
                .await?;
            Self::check(response)?;
            Ok(())
        })
    }

    fn delete(&self, ids: &[Uuid]) -> Result<(), SyncError> {
        let url = self.endpoint("sessions/delete")?;
        let body = serde_json::json!({ "ids": ids });
        self.runtime.block_on(async {
            let response = self
                .authorize(self.client.post(url).json(&body))
                .send()
                .await?;
            Self::check(response)?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample_session() -> Session {
        Session {
            id: Uuid::new_v4(),
            started_at: Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap(),
            ended_at: Utc.with_ymd_and_hms(2025, 3, 3, 9, 25, 0).unwrap(),
            duration_secs: 1500,
            is_completed: true,
        }
    }

    fn store_for(server: &mockito::ServerGuard) -> HttpRemoteStore {
        let base = Url::parse(&server.url()).unwrap();
        HttpRemoteStore::new(base, Some("test-token".into())).unwrap()
    }

    #[test]
    fn fetch_all_parses_sessions() {
        let mut server = mockito::Server::new();
        let session = sample_session();
        let body = serde_json::to_string(&vec![session.clone()]).unwrap();
        let mock = server
            .mock("GET", "/sessions")
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create();

        let store = store_for(&server);
        let fetched = store.fetch_all().unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].id, session.id);
        assert_eq!(fetched[0].duration_secs, 1500);
        mock.assert();
    }

    #[test]
    fn fetch_all_empty_remote() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/sessions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create();

        let store = store_for(&server);
        assert!(store.fetch_all().unwrap().is_empty());
    }

    #[test]
    fn unauthorized_maps_to_account_unavailable() {
        let mut server = mockito::Server::new();
        let _mock = server.mock("GET", "/sessions").with_status(401).create();

        let store = store_for(&server);
        match store.fetch_all() {
            Err(SyncError::AccountUnavailable) => {}
            other => panic!("expected AccountUnavailable, got {:?}", other.map(|v| v.len())),
        }
    }

    #[test]
    fn server_error_maps_to_remote() {
        let mut server = mockito::Server::new();
        let _mock = server.mock("PUT", "/sessions").with_status(500).create();

        let store = store_for(&server);
        match store.upsert(&[sample_session()]) {
            Err(SyncError::Remote(message)) => assert!(message.contains("500")),
            other => panic!("expected Remote error, got {:?}", other),
        }
    }

    #[test]
    fn upsert_sends_sessions() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("PUT", "/sessions")
            .match_header("content-type", "application/json")
            .with_status(200)
            .create();

        let store = store_for(&server);
        store.upsert(&[sample_session()]).unwrap();
        mock.assert();
    }

    #[test]
    fn from_config_without_endpoint_is_account_unavailable() {
        let config = Config::default();
        match HttpRemoteStore::from_config(&config) {
            Err(SyncError::AccountUnavailable) => {}
            _ => panic!("expected AccountUnavailable"),
        }
    }
}
