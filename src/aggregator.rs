//! Fan-out across every discovered endpoint.
//!
//! This is the only layer that sees the full endpoint set. Inputs are
//! partitioned by prefix, one client call per affected endpoint runs
//! concurrently, and partial results are concatenated in endpoint-prefix
//! order with each endpoint's native ordering preserved. A failing
//! endpoint contributes nothing; it never aborts the operation.

use std::time::Duration;

use futures::future::join_all;
use itertools::Itertools;
use tracing::warn;

use crate::address::TabAddress;
use crate::endpoints::EndpointDescriptor;
use crate::mediator::{ClientError, MediatorClient};
use crate::model::{MoveCommand, TabRecord};

pub struct Aggregator {
    clients: Vec<MediatorClient>,
}

impl Aggregator {
    /// `endpoints` must already be in prefix order (discovery returns
    /// them that way); merge order follows client order.
    pub fn new(endpoints: Vec<EndpointDescriptor>, request_timeout: Duration) -> anyhow::Result<Self> {
        let clients = endpoints
            .into_iter()
            .map(|endpoint| MediatorClient::new(endpoint, request_timeout))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self { clients })
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn clients(&self) -> &[MediatorClient] {
        &self.clients
    }

    pub async fn list_tabs(&self) -> Vec<TabRecord> {
        merge_partial(join_all(self.clients.iter().map(|c| c.list_tabs())).await)
    }

    pub async fn get_active_tabs(&self) -> Vec<TabRecord> {
        merge_partial(join_all(self.clients.iter().map(|c| c.get_active_tabs())).await)
    }

    pub async fn close_tabs(&self, ids: &[String]) {
        let buckets = self.partition_ids(ids);
        let calls = buckets
            .iter()
            .map(|(client, tabs)| client.close_tabs(tabs));
        log_failures(join_all(calls).await);
    }

    pub async fn activate_tab(&self, id: &str) {
        let ids = [id.to_string()];
        let Some((client, tabs)) = self.partition_ids(&ids).pop() else {
            return;
        };
        log_failures(vec![client.activate_tab(&tabs[0]).await]);
    }

    /// Open URLs in the endpoint selected by `prefix`, optionally inside
    /// one of its windows.
    pub async fn open_urls(&self, urls: &[String], prefix: char, window_id: Option<&str>) {
        let Some(client) = self.clients.iter().find(|c| c.prefix() == prefix) else {
            warn!(prefix = %prefix, "no endpoint with this prefix, dropping open request");
            return;
        };
        log_failures(vec![client.open_urls(urls, window_id).await]);
    }

    pub async fn move_tabs(&self, moves: Vec<MoveCommand>) {
        let mut buckets: Vec<(&MediatorClient, Vec<MoveCommand>)> = Vec::new();
        for cmd in moves {
            match self.client_for(cmd.address.prefix) {
                Some(client) => match buckets.iter_mut().find(|(c, _)| c.prefix() == client.prefix()) {
                    Some((_, batch)) => batch.push(cmd),
                    None => buckets.push((client, vec![cmd])),
                },
                None => warn!(id = %cmd.address, "no endpoint for prefix, dropping move"),
            }
        }
        buckets.sort_by_key(|(client, _)| client.prefix());
        let calls = buckets.iter().map(|(client, batch)| client.move_tabs(batch));
        log_failures(join_all(calls).await);
    }

    /// Extract text. With no IDs every endpoint reports all of its tabs.
    pub async fn get_text(&self, ids: &[String]) -> Vec<TabRecord> {
        let results = if ids.is_empty() {
            join_all(self.clients.iter().map(|c| c.get_text(&[]))).await
        } else {
            let buckets = self.partition_ids(ids);
            join_all(buckets.iter().map(|(client, tabs)| client.get_text(tabs))).await
        };
        merge_partial(results)
    }

    /// Page words across endpoints, sorted and de-duplicated.
    pub async fn get_words(&self, ids: &[String]) -> Vec<String> {
        let results = if ids.is_empty() {
            join_all(self.clients.iter().map(|c| c.get_words(&[]))).await
        } else {
            let buckets = self.partition_ids(ids);
            join_all(buckets.iter().map(|(client, tabs)| client.get_words(tabs))).await
        };
        merge_partial(results).into_iter().sorted().dedup().collect()
    }

    fn client_for(&self, prefix: char) -> Option<&MediatorClient> {
        self.clients.iter().find(|c| c.prefix() == prefix)
    }

    /// Decode the given global IDs and bucket them per endpoint, in
    /// client (prefix) order. Malformed IDs and IDs whose prefix matches
    /// no discovered endpoint are dropped with a warning.
    fn partition_ids(&self, ids: &[String]) -> Vec<(&MediatorClient, Vec<TabAddress>)> {
        let mut buckets: Vec<(&MediatorClient, Vec<TabAddress>)> =
            self.clients.iter().map(|c| (c, Vec::new())).collect();
        for id in ids {
            let address: TabAddress = match id.parse() {
                Ok(address) => address,
                Err(err) => {
                    warn!(id = %id, error = %err, "dropping malformed tab id");
                    continue;
                }
            };
            match buckets.iter_mut().find(|(c, _)| c.prefix() == address.prefix) {
                Some((_, batch)) => batch.push(address),
                None => warn!(id = %id, "no endpoint for prefix, dropping tab id"),
            }
        }
        buckets.retain(|(_, batch)| !batch.is_empty());
        buckets
    }
}

/// Concatenate per-endpoint results in call order; a failed endpoint
/// contributes nothing.
fn merge_partial<T>(results: Vec<Result<Vec<T>, ClientError>>) -> Vec<T> {
    let mut merged = Vec::new();
    for result in results {
        match result {
            Ok(part) => merged.extend(part),
            Err(err) => warn!(error = %err, "endpoint dropped from merged result"),
        }
    }
    merged
}

fn log_failures(results: Vec<Result<(), ClientError>>) {
    for result in results {
        if let Err(err) = result {
            warn!(error = %err, "endpoint call failed");
        }
    }
}

/// Bucket tabs by `prefix.window_id` and count them, sorted by window key.
pub fn group_windows(tabs: &[TabRecord]) -> Vec<(String, usize)> {
    tabs.iter()
        .map(|tab| tab.address.window_key())
        .sorted()
        .chunk_by(|key| key.clone())
        .into_iter()
        .map(|(key, group)| (key, group.count()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregator_with(prefixes: &[char]) -> Aggregator {
        let endpoints = prefixes
            .iter()
            .enumerate()
            .map(|(i, &prefix)| EndpointDescriptor {
                prefix,
                host: "127.0.0.1".to_string(),
                port: 1024 + i as u16,
            })
            .collect();
        Aggregator::new(endpoints, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn partition_drops_unknown_prefix_and_malformed_ids() {
        let agg = aggregator_with(&['a', 'b']);
        let ids = vec![
            "a.0.1".to_string(),
            "b.0.1".to_string(),
            "c.0.1".to_string(),
            "garbage".to_string(),
        ];
        let buckets = agg.partition_ids(&ids);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].0.prefix(), 'a');
        assert_eq!(buckets[0].1, vec!["a.0.1".parse().unwrap()]);
        assert_eq!(buckets[1].0.prefix(), 'b');
        assert_eq!(buckets[1].1, vec!["b.0.1".parse().unwrap()]);
    }

    #[test]
    fn partition_keeps_client_order_not_input_order() {
        let agg = aggregator_with(&['a', 'b']);
        let ids = vec!["b.1.1".to_string(), "a.1.1".to_string(), "b.1.2".to_string()];
        let buckets = agg.partition_ids(&ids);
        assert_eq!(buckets[0].0.prefix(), 'a');
        assert_eq!(buckets[1].0.prefix(), 'b');
        assert_eq!(buckets[1].1.len(), 2);
    }

    #[test]
    fn merge_length_is_sum_of_successful_parts() {
        let results: Vec<Result<Vec<u32>, ClientError>> = vec![
            Ok(vec![1, 2]),
            Err(ClientError::Unavailable {
                prefix: 'b',
                reason: "connection refused".to_string(),
            }),
            Ok(vec![3]),
        ];
        let merged = merge_partial(results);
        assert_eq!(merged, vec![1, 2, 3]);
    }

    #[test]
    fn merge_of_all_failures_is_empty_not_an_error() {
        let results: Vec<Result<Vec<u32>, ClientError>> = vec![Err(ClientError::Unavailable {
            prefix: 'a',
            reason: "timeout".to_string(),
        })];
        assert!(merge_partial(results).is_empty());
    }

    #[test]
    fn windows_grouped_by_prefix_and_window() {
        let tabs: Vec<TabRecord> = ["a.1.1\tT\tU", "a.1.2\tT\tU", "a.2.1\tT\tU", "b.1.1\tT\tU"]
            .iter()
            .map(|line| TabRecord::from_tsv_line(line).unwrap())
            .collect();
        assert_eq!(
            group_windows(&tabs),
            vec![
                ("a.1".to_string(), 2),
                ("a.2".to_string(), 1),
                ("b.1".to_string(), 1),
            ]
        );
    }
}
