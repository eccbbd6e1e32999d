//! HTTP client for one mediator endpoint.
//!
//! The mediator only knows its own `window.tab` IDs, so outbound requests
//! strip the global prefix and inbound results are re-qualified with it
//! before anything leaves this module. Every failure on the wire becomes
//! `ClientError::Unavailable`, which the aggregator treats as "this
//! endpoint contributes nothing", never as a fatal error.

use std::time::Duration;

use anyhow::Context;
use itertools::Itertools;
use thiserror::Error;
use tracing::{debug, warn};

use crate::address::TabAddress;
use crate::endpoints::EndpointDescriptor;
use crate::model::{MoveCommand, TabRecord};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("endpoint `{prefix}` unavailable: {reason}")]
    Unavailable { prefix: char, reason: String },
}

pub struct MediatorClient {
    endpoint: EndpointDescriptor,
    http: reqwest::Client,
}

impl MediatorClient {
    pub fn new(endpoint: EndpointDescriptor, request_timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("build http client")?;
        Ok(Self { endpoint, http })
    }

    pub fn prefix(&self) -> char {
        self.endpoint.prefix
    }

    pub fn address(&self) -> String {
        self.endpoint.address()
    }

    pub async fn list_tabs(&self) -> Result<Vec<TabRecord>, ClientError> {
        let body = self.get("/list_tabs").await?;
        Ok(self.parse_tab_lines(&body))
    }

    pub async fn get_active_tabs(&self) -> Result<Vec<TabRecord>, ClientError> {
        let body = self.get("/get_active_tabs").await?;
        Ok(self.parse_tab_lines(&body))
    }

    pub async fn close_tabs(&self, tabs: &[TabAddress]) -> Result<(), ClientError> {
        let ids = tabs.iter().map(TabAddress::local_id).join(",");
        self.get(&format!("/close_tabs/{ids}")).await?;
        Ok(())
    }

    pub async fn activate_tab(&self, tab: &TabAddress) -> Result<(), ClientError> {
        self.get(&format!("/activate_tab/{}", tab.local_id())).await?;
        Ok(())
    }

    pub async fn open_urls(
        &self,
        urls: &[String],
        window_id: Option<&str>,
    ) -> Result<(), ClientError> {
        let mut form = vec![("urls".to_string(), urls.join("\n"))];
        if let Some(window_id) = window_id {
            form.push(("window_id".to_string(), window_id.to_string()));
        }
        let response = self
            .http
            .post(self.url("/open_urls"))
            .form(&form)
            .send()
            .await
            .map_err(|err| self.unavailable(err))?;
        self.check_status(response.status())
    }

    pub async fn move_tabs(&self, moves: &[MoveCommand]) -> Result<(), ClientError> {
        let triplets = moves
            .iter()
            .map(|m| format!("{},{},{}", m.address.local_id(), m.window_id, m.index))
            .join(";");
        self.get(&format!("/move_tabs/{triplets}")).await?;
        Ok(())
    }

    /// Extract page text. With no IDs the mediator returns text for all
    /// of its tabs.
    pub async fn get_text(&self, tabs: &[TabAddress]) -> Result<Vec<TabRecord>, ClientError> {
        let body = self.get(&self.path_with_ids("/get_text", tabs)).await?;
        Ok(self.parse_tab_lines(&body))
    }

    /// Page words, one per line. With no IDs the mediator uses its
    /// active tabs.
    pub async fn get_words(&self, tabs: &[TabAddress]) -> Result<Vec<String>, ClientError> {
        let body = self.get(&self.path_with_ids("/get_words", tabs)).await?;
        Ok(body
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn path_with_ids(&self, path: &str, tabs: &[TabAddress]) -> String {
        if tabs.is_empty() {
            path.to_string()
        } else {
            format!("{path}/{}", tabs.iter().map(TabAddress::local_id).join(","))
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.endpoint.address(), path)
    }

    async fn get(&self, path: &str) -> Result<String, ClientError> {
        debug!(prefix = %self.prefix(), path = path, "mediator request");
        let response = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|err| self.unavailable(err))?;
        self.check_status(response.status())?;
        response.text().await.map_err(|err| self.unavailable(err))
    }

    fn check_status(&self, status: reqwest::StatusCode) -> Result<(), ClientError> {
        if status.is_success() {
            Ok(())
        } else {
            Err(ClientError::Unavailable {
                prefix: self.prefix(),
                reason: format!("status {status}"),
            })
        }
    }

    fn unavailable(&self, err: reqwest::Error) -> ClientError {
        ClientError::Unavailable {
            prefix: self.prefix(),
            reason: err.to_string(),
        }
    }

    fn parse_tab_lines(&self, body: &str) -> Vec<TabRecord> {
        body.lines()
            .filter(|line| !line.is_empty())
            .filter_map(|line| match TabRecord::from_mediator_line(self.prefix(), line) {
                Ok(record) => Some(record),
                Err(err) => {
                    warn!(prefix = %self.prefix(), error = %err, "skipping unparseable tab line");
                    None
                }
            })
            .collect()
    }
}
