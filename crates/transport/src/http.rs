//! reqwest-backed session
//!
//! Each session owns its own `reqwest::Client`, and with it its own
//! connection pool. Closing the session drops the client, which closes every
//! idle socket it held; a reconnect therefore starts from fresh connections.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::AUTHORIZATION;
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::request::ApiRequest;
use crate::response::ApiResponse;
use crate::{RequestSigner, Session};

/// Settings applied to every client a session builds.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Maximum gap between two reads on a connection.
    pub read_timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(90),
            connect_timeout: Duration::from_secs(30),
            user_agent: concat!("twitter-harvester/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

pub struct HttpSession {
    client: Option<reqwest::Client>,
    signer: Box<dyn RequestSigner>,
}

impl HttpSession {
    /// Build a session with a fresh connection pool.
    ///
    /// No total request timeout is set: streaming responses stay open for
    /// hours. Only the gap between reads is bounded.
    pub fn new(settings: &HttpSettings, signer: Box<dyn RequestSigner>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .read_timeout(settings.read_timeout)
            .connect_timeout(settings.connect_timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(TransportError::from)?;
        debug!("created http session");
        Ok(Self {
            client: Some(client),
            signer,
        })
    }
}

impl Session for HttpSession {
    fn execute<'a>(
        &'a mut self,
        request: &'a ApiRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ApiResponse>> + Send + 'a>> {
        Box::pin(async move {
            let client = self
                .client
                .as_ref()
                .ok_or_else(|| TransportError::Connect("session is closed".into()))?;

            let authorization = self.signer.authorization(
                request.method.as_str(),
                &request.url,
                &request.signing_params(),
            )?;

            let mut builder = client
                .request(request.method.clone(), &request.url)
                .headers(request.headers.clone())
                .header(AUTHORIZATION, authorization);
            if !request.query.is_empty() {
                builder = builder.query(&request.query);
            }
            if !request.form.is_empty() {
                builder = builder.form(&request.form);
            }

            let response = builder.send().await?;
            let status = response.status().as_u16();
            let headers = response.headers().clone();
            debug!(method = %request.method, url = %request.url, status, "received response");

            let body = response
                .bytes_stream()
                .map(|chunk| chunk.map_err(TransportError::from));
            Ok(ApiResponse::new(status, headers, body))
        })
    }

    fn close(&mut self) {
        if self.client.take().is_some() {
            debug!("closed http session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct StaticSigner;

    impl RequestSigner for StaticSigner {
        fn authorization(
            &self,
            method: &str,
            _url: &str,
            params: &[(String, String)],
        ) -> Result<String> {
            Ok(format!("Test {method} {}", params.len()))
        }
    }

    struct FailingSigner;

    impl RequestSigner for FailingSigner {
        fn authorization(&self, _: &str, _: &str, _: &[(String, String)]) -> Result<String> {
            Err(TransportError::Signing("bad key".into()))
        }
    }

    fn session() -> HttpSession {
        HttpSession::new(&HttpSettings::default(), Box::new(StaticSigner)).unwrap()
    }

    #[tokio::test]
    async fn get_sends_query_and_signed_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1.1/search/tweets.json"))
            .and(query_param("q", "rust lang"))
            .and(query_param("count", "100"))
            .and(header("authorization", "Test GET 2"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"statuses":[]}"#))
            .expect(1)
            .mount(&server)
            .await;

        let request = ApiRequest::get(format!("{}/1.1/search/tweets.json", server.uri()))
            .query("q", "rust lang")
            .query("count", 100);
        let mut session = session();
        let response = session.execute(&request).await.unwrap();
        assert_eq!(response.status(), 200);
        let body: serde_json::Value = response.json().await.unwrap();
        assert!(body["statuses"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn post_sends_form_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1.1/statuses/lookup.json"))
            .and(body_string_contains("id=1%2C2"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(1)
            .mount(&server)
            .await;

        let request = ApiRequest::post(format!("{}/1.1/statuses/lookup.json", server.uri()))
            .form("id", "1,2");
        let response = session().execute(&request).await.unwrap();
        assert!(response.is_success());
    }

    #[tokio::test]
    async fn error_statuses_are_returned_not_raised() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(429).insert_header("x-rate-limit-reset", "1700000900"),
            )
            .mount(&server)
            .await;

        let request = ApiRequest::get(format!("{}/1.1/followers/ids.json", server.uri()));
        let response = session().execute(&request).await.unwrap();
        assert_eq!(response.status(), 429);
        assert_eq!(response.header("x-rate-limit-reset"), Some("1700000900"));
    }

    #[tokio::test]
    async fn streaming_body_reads_lines() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1.1/statuses/filter.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("{\"id_str\":\"1\"}\r\n\r\n{\"id_str\":\"2\"}\r\n"),
            )
            .mount(&server)
            .await;

        let request = ApiRequest::post(format!("{}/1.1/statuses/filter.json", server.uri()))
            .form("track", "rust");
        let response = session().execute(&request).await.unwrap();
        let mut lines = response.lines();
        let mut seen = Vec::new();
        while let Some(line) = lines.next_line().await {
            seen.push(String::from_utf8(line.unwrap()).unwrap());
        }
        assert_eq!(seen, vec!["{\"id_str\":\"1\"}", "", "{\"id_str\":\"2\"}"]);
    }

    #[tokio::test]
    async fn closed_session_refuses_requests() {
        let mut session = session();
        session.close();
        let request = ApiRequest::get("http://127.0.0.1:1/never");
        let err = session.execute(&request).await.unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)));
    }

    #[tokio::test]
    async fn signer_failure_aborts_request() {
        let mut session =
            HttpSession::new(&HttpSettings::default(), Box::new(FailingSigner)).unwrap();
        let request = ApiRequest::get("http://127.0.0.1:1/never");
        let err = session.execute(&request).await.unwrap_err();
        assert!(matches!(err, TransportError::Signing(_)));
    }
}
