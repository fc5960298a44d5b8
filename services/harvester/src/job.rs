//! Harvest jobs
//!
//! Each job drains one client sequence into the output, one line per item,
//! until the sequence ends, the optional limit is reached, or the token is
//! cancelled. Streaming jobs also hand the token to the client so a backoff
//! in progress ends promptly.

use std::fmt::Display;
use std::pin::pin;

use anyhow::{Context, Result};
use futures_util::{Stream, StreamExt};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::info;
use twitter_client::{Client, FilterParams, SearchOptions, UserRef};

use crate::config::JobConfig;
use crate::metrics;

/// Run `job`, returning the number of lines written.
pub async fn run<W>(
    client: &mut Client,
    job: &JobConfig,
    cancel: CancellationToken,
    out: &mut W,
) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let name = job.name();
    info!(job = name, "starting harvest");
    match job {
        JobConfig::Sample { limit } => {
            drain(client.sample(cancel.clone()), name, *limit, &cancel, out).await
        }
        JobConfig::Filter {
            track,
            follow,
            locations,
            limit,
        } => {
            let params = FilterParams {
                track: track.clone(),
                follow: follow.clone(),
                locations: locations.clone(),
            };
            drain(client.filter(params, cancel.clone()), name, *limit, &cancel, out).await
        }
        JobConfig::Search {
            query,
            lang,
            result_type,
            geocode,
            since_id,
            max_id,
            limit,
        } => {
            let options = SearchOptions {
                max_id: max_id.clone(),
                since_id: since_id.clone(),
                lang: lang.clone(),
                result_type: *result_type,
                geocode: geocode.clone(),
            };
            drain(client.search(query, options), name, *limit, &cancel, out).await
        }
        JobConfig::Timeline {
            user,
            since_id,
            max_id,
            limit,
        } => {
            let tweets = client.timeline(UserRef::parse(user), max_id.clone(), since_id.clone());
            drain(tweets, name, *limit, &cancel, out).await
        }
        JobConfig::Followers { user, limit } => {
            drain(client.follower_ids(user), name, *limit, &cancel, out).await
        }
    }
}

async fn drain<S, T, W>(
    items: S,
    job: &'static str,
    limit: Option<u64>,
    cancel: &CancellationToken,
    out: &mut W,
) -> Result<u64>
where
    S: Stream<Item = twitter_client::Result<T>>,
    T: Display,
    W: AsyncWrite + Unpin,
{
    let mut items = pin!(items);
    let mut written = 0u64;
    while let Some(item) = items.next().await {
        let item = item.with_context(|| format!("{job} harvest failed after {written} items"))?;
        out.write_all(format!("{item}\n").as_bytes())
            .await
            .context("failed to write output")?;
        written += 1;
        metrics::record_written(job);

        if limit.is_some_and(|limit| written >= limit) {
            info!(job, written, "limit reached");
            break;
        }
        if cancel.is_cancelled() {
            info!(job, written, "harvest cancelled");
            break;
        }
    }
    out.flush().await.context("failed to flush output")?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use twitter_auth::Credential;
    use twitter_client::{ClientConfig, ResultType};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> Client {
        let config = ClientConfig {
            api_base: format!("{}/1.1", server.uri()),
            stream_base: format!("{}/stream/1.1", server.uri()),
            ..ClientConfig::default()
        };
        Client::new(vec![Credential::new("ck", "cs", "at", "ats")], config).unwrap()
    }

    fn search(limit: Option<u64>) -> JobConfig {
        JobConfig::Search {
            query: "rust".into(),
            lang: None,
            result_type: ResultType::Recent,
            geocode: None,
            since_id: None,
            max_id: None,
            limit,
        }
    }

    fn lines(out: &[u8]) -> Vec<serde_json::Value> {
        String::from_utf8_lossy(out)
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn search_job_writes_every_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1.1/search/tweets.json"))
            .and(query_param("max_id", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"statuses":[]}"#))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/1.1/search/tweets.json"))
            .and(query_param("q", "rust"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"statuses":[{"id_str":"5","text":"a"},{"id_str":"3","text":"b"}]}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = client(&server);
        let mut out = Vec::new();
        let written = run(&mut client, &search(None), CancellationToken::new(), &mut out)
            .await
            .unwrap();

        assert_eq!(written, 2);
        let lines = lines(&out);
        assert_eq!(lines[0]["id_str"], "5");
        assert_eq!(lines[1]["text"], "b");
    }

    #[tokio::test]
    async fn limit_stops_before_next_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1.1/search/tweets.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"statuses":[{"id_str":"9"},{"id_str":"8"},{"id_str":"7"}]}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = client(&server);
        let mut out = Vec::new();
        let written = run(&mut client, &search(Some(2)), CancellationToken::new(), &mut out)
            .await
            .unwrap();
        assert_eq!(written, 2);
    }

    #[tokio::test]
    async fn followers_job_writes_plain_ids() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1.1/followers/ids.json"))
            .and(query_param("screen_name", "jack"))
            .and(query_param("cursor", "-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"ids":[1234567890123456789,12],"next_cursor_str":"0"}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = client(&server);
        let mut out = Vec::new();
        let job = JobConfig::Followers {
            user: "@jack".into(),
            limit: None,
        };
        run(&mut client, &job, CancellationToken::new(), &mut out)
            .await
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1234567890123456789\n12\n");
    }

    #[tokio::test]
    async fn filter_job_reads_stream_lines() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/stream/1.1/statuses/filter.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{\"id\":1}\r\n\r\nnot json\r\n{\"id\":2}\r\n"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut client = client(&server);
        let mut out = Vec::new();
        let job = JobConfig::Filter {
            track: Some("rust".into()),
            follow: None,
            locations: Vec::new(),
            limit: Some(2),
        };
        let written = run(&mut client, &job, CancellationToken::new(), &mut out)
            .await
            .unwrap();

        assert_eq!(written, 2);
        let lines = lines(&out);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[1]["id"], 2);
    }

    #[tokio::test]
    async fn cancelled_stream_job_writes_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut client = client(&server);
        let mut out = Vec::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let written = run(&mut client, &JobConfig::Sample { limit: None }, cancel, &mut out)
            .await
            .unwrap();
        assert_eq!(written, 0);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn fatal_error_reports_progress() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1.1/search/tweets.json"))
            .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"errors":[{"code":32}]}"#))
            .mount(&server)
            .await;

        let mut client = client(&server);
        let mut out = Vec::new();
        let err = run(&mut client, &search(None), CancellationToken::new(), &mut out)
            .await
            .unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("search harvest failed after 0 items"), "{message}");
        assert!(message.contains("HTTP 401"), "{message}");
    }
}
