//! Live link probing
//!
//! Local targets are checked on the filesystem, remote ones with an HTTP
//! `HEAD` request (retried as `GET` when the server refuses `HEAD`).

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;

use super::config::ProbeConfig;
use crate::domain::{LinkProbe, LinkTarget, Outcome};

/// Probe backed by the filesystem and, unless offline, the network
pub struct LiveProbe {
    /// `None` when offline
    client: Option<Client>,
}

impl LiveProbe {
    pub fn new(config: &ProbeConfig) -> Result<Self> {
        if config.offline {
            return Ok(Self::offline());
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client: Some(client),
        })
    }

    /// A probe that never touches the network
    pub fn offline() -> Self {
        Self { client: None }
    }

    fn probe_remote(&self, url: &str) -> Outcome {
        let Some(client) = &self.client else {
            return Outcome::Indeterminate("offline".to_string());
        };

        let response = match client.head(url).send() {
            Ok(response) if response.status() == StatusCode::METHOD_NOT_ALLOWED => {
                log::debug!("HEAD refused by {}, retrying with GET", url);
                client.get(url).send()
            }
            other => other,
        };

        match response {
            Ok(response) if response.status().is_success() => Outcome::Passed,
            Ok(response) => Outcome::Failed(format!("{} returned {}", url, response.status())),
            Err(e) if e.is_timeout() => Outcome::Failed(format!("{} timed out", url)),
            Err(e) => Outcome::Failed(format!("{}: {}", url, e)),
        }
    }
}

impl LinkProbe for LiveProbe {
    fn probe(&self, target: &LinkTarget) -> Outcome {
        match target {
            LinkTarget::Local(path) if path.exists() => Outcome::Passed,
            LinkTarget::Local(path) => {
                Outcome::Failed(format!("{} does not exist", path.display()))
            }
            LinkTarget::Remote(url) => self.probe_remote(url),
            LinkTarget::Fragment(fragment) => {
                Outcome::Indeterminate(format!("in-page link '{}' is not checked", fragment))
            }
            LinkTarget::Unsupported(uri) => {
                Outcome::Indeterminate(format!("unsupported scheme in '{}'", uri))
            }
        }
    }
}
