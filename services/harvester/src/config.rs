//! Configuration types and loading
//!
//! Config precedence: CLI `--config` > `CONFIG_PATH` env var > `harvester.toml`.
//! Credential secrets may be written inline or named by environment variable
//! (`consumer_secret_env = "VAR"`) so they can stay out of the file.

use common::Secret;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use twitter_auth::Credential;
use twitter_client::{ClientConfig, ResultType};

/// Root configuration, with credentials resolved.
#[derive(Debug)]
pub struct Config {
    pub credentials: Vec<Credential>,
    pub client: ClientConfig,
    pub job: JobConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    credentials: Vec<CredentialEntry>,
    #[serde(default)]
    client: ClientConfig,
    job: JobConfig,
    #[serde(default)]
    metrics: MetricsConfig,
}

/// One `[[credentials]]` table as written.
#[derive(Debug, Deserialize)]
struct CredentialEntry {
    consumer_key: String,
    consumer_secret: Option<String>,
    consumer_secret_env: Option<String>,
    access_token: String,
    access_token_secret: Option<String>,
    access_token_secret_env: Option<String>,
}

impl CredentialEntry {
    fn resolve(self, index: usize) -> common::Result<Credential> {
        let consumer_secret = secret(
            index,
            "consumer_secret",
            self.consumer_secret,
            self.consumer_secret_env,
        )?;
        let access_token_secret = secret(
            index,
            "access_token_secret",
            self.access_token_secret,
            self.access_token_secret_env,
        )?;
        let credential = Credential::new(
            self.consumer_key.trim(),
            consumer_secret,
            self.access_token.trim(),
            access_token_secret,
        );
        credential
            .validate()
            .map_err(|e| common::Error::Config(format!("credentials[{index}]: {e}")))?;
        Ok(credential)
    }
}

fn secret(
    index: usize,
    name: &str,
    inline: Option<String>,
    env: Option<String>,
) -> common::Result<Secret<String>> {
    match (inline, env) {
        (Some(_), Some(_)) => Err(common::Error::Config(format!(
            "credentials[{index}]: set either {name} or {name}_env, not both"
        ))),
        (Some(value), None) => Ok(Secret::new(value.trim().to_owned())),
        (None, Some(var)) => Secret::from_env(&var),
        (None, None) => Ok(Secret::new(String::new())),
    }
}

/// What to harvest. Every job writes one JSON document (or id) per line.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum JobConfig {
    Sample {
        limit: Option<u64>,
    },
    Filter {
        track: Option<String>,
        follow: Option<String>,
        #[serde(default)]
        locations: Vec<String>,
        limit: Option<u64>,
    },
    Search {
        query: String,
        lang: Option<String>,
        #[serde(default)]
        result_type: ResultType,
        geocode: Option<String>,
        since_id: Option<String>,
        max_id: Option<String>,
        limit: Option<u64>,
    },
    Timeline {
        user: String,
        since_id: Option<String>,
        max_id: Option<String>,
        limit: Option<u64>,
    },
    Followers {
        user: String,
        limit: Option<u64>,
    },
}

impl JobConfig {
    pub fn name(&self) -> &'static str {
        match self {
            JobConfig::Sample { .. } => "sample",
            JobConfig::Filter { .. } => "filter",
            JobConfig::Search { .. } => "search",
            JobConfig::Timeline { .. } => "timeline",
            JobConfig::Followers { .. } => "followers",
        }
    }

    fn validate(&self) -> common::Result<()> {
        match self {
            JobConfig::Filter {
                track,
                follow,
                locations,
                ..
            } if track.as_deref().is_none_or(str::is_empty)
                && follow.as_deref().is_none_or(str::is_empty)
                && locations.is_empty() =>
            {
                Err(common::Error::Config(
                    "filter job needs track, follow or locations".into(),
                ))
            }
            JobConfig::Search { query, .. } if query.trim().is_empty() => Err(
                common::Error::Config("search job needs a non-empty query".into()),
            ),
            JobConfig::Timeline { user, .. } | JobConfig::Followers { user, .. }
                if user.trim_start_matches('@').trim().is_empty() =>
            {
                Err(common::Error::Config(format!(
                    "{} job needs a user",
                    self.name()
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Prometheus exporter settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsConfig {
    /// Address for the `/metrics` listener; no exporter when unset.
    pub listen_addr: Option<SocketAddr>,
}

impl Config {
    /// Load and validate configuration from a TOML file, resolving any
    /// `*_env` secret references.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    fn parse(contents: &str) -> common::Result<Self> {
        let raw: RawConfig = toml::from_str(contents)?;

        if raw.credentials.is_empty() {
            return Err(common::Error::Config(
                "at least one [[credentials]] entry is required".into(),
            ));
        }
        raw.client.validate()?;
        raw.job.validate()?;

        let credentials = raw
            .credentials
            .into_iter()
            .enumerate()
            .map(|(i, entry)| entry.resolve(i))
            .collect::<common::Result<Vec<_>>>()?;

        Ok(Config {
            credentials,
            client: raw.client,
            job: raw.job,
            metrics: raw.metrics,
        })
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("harvester.toml")
    }
}
