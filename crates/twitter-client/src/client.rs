//! The client facade
//!
//! Composes the layers explicitly: `Client` → `Recovery` → `Scheduler` →
//! `SessionManager` → `Session`. Endpoint methods, pagination and streaming
//! are built on the `get`/`post` pair defined here.

use serde_json::Value;
use tracing::{debug, info};
use transport::{ApiRequest, ApiResponse, TransportError};
use twitter_auth::Credential;
use twitter_pool::{Clock, CredentialPool};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::options::RequestOptions;
use crate::recovery::Recovery;
use crate::scheduler::{Scheduler, SchedulerPolicy};
use crate::session::{Connect, HttpConnector, SessionManager};

pub struct Client {
    recovery: Recovery,
    config: ClientConfig,
}

impl Client {
    /// Client talking to the real API over reqwest.
    pub fn new(credentials: Vec<Credential>, config: ClientConfig) -> Result<Self> {
        let connector = HttpConnector::new(config.http_settings());
        Self::with_connector(credentials, config, Box::new(connector), Clock::system())
    }

    /// Client with a caller-supplied session factory and clock.
    pub fn with_connector(
        credentials: Vec<Credential>,
        config: ClientConfig,
        connector: Box<dyn Connect>,
        clock: Clock,
    ) -> Result<Self> {
        let pool = CredentialPool::new(credentials)?;
        let policy = SchedulerPolicy {
            slack: config.rate_limit_slack(),
            server_error_ceiling: config.server_error_ceiling,
            server_error_backoff: config.server_error_backoff(),
            rate_limit_fallback: config.rate_limit_fallback(),
        };
        info!(
            credentials = pool.len(),
            api_base = %config.api_base,
            stream_base = %config.stream_base,
            "twitter client initialized"
        );
        let scheduler = Scheduler::new(pool, SessionManager::new(connector), clock, policy);
        let recovery = Recovery::new(
            scheduler,
            config.connection_errors,
            config.not_found_retry_delay(),
        );
        Ok(Self { recovery, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Credential availability snapshot.
    pub fn pool_health(&self) -> Value {
        let scheduler = self.recovery.scheduler();
        scheduler.pool().health(scheduler.clock().now())
    }

    /// GET with rate-limit scheduling and fault recovery. `tweet_mode` is
    /// added to the query. The body is read before returning.
    pub async fn get(&mut self, mut request: ApiRequest, options: RequestOptions) -> Result<ApiResponse> {
        request.set_query("tweet_mode", &self.config.tweet_mode);
        debug!(url = %request.url, query = ?request.query, "getting");
        self.recovery.execute_buffered(&request, options).await
    }

    /// POST with rate-limit scheduling and fault recovery. `tweet_mode` is
    /// added to a non-empty form body. The body is read before returning.
    pub async fn post(&mut self, mut request: ApiRequest, options: RequestOptions) -> Result<ApiResponse> {
        if !request.form.is_empty() {
            request.set_param("tweet_mode", &self.config.tweet_mode);
        }
        debug!(url = %request.url, form = ?request.form, "posting");
        self.recovery.execute_buffered(&request, options).await
    }

    pub(crate) async fn get_json(&mut self, request: ApiRequest, options: RequestOptions) -> Result<Value> {
        read_json(self.get(request, options).await?).await
    }

    pub(crate) async fn post_json(&mut self, request: ApiRequest, options: RequestOptions) -> Result<Value> {
        read_json(self.post(request, options).await?).await
    }

    /// Open a streaming connection. HTTP errors are raised, not retried.
    pub(crate) async fn open_stream(&mut self, request: &ApiRequest) -> Result<ApiResponse> {
        self.recovery.execute(request, RequestOptions::streaming()).await
    }

    /// Close the live session.
    pub fn close(&mut self) {
        self.recovery.close();
    }
}

async fn read_json(response: ApiResponse) -> Result<Value> {
    response.json().await.map_err(|err| match err {
        TransportError::Json(err) => Error::Json(err),
        other => Error::Transport(other),
    })
}
