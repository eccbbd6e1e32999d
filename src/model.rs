//! Tab records and the tab-separated line format shared by the CLI
//! output, the mediator responses, and the indexer input.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::address::{AddressError, TabAddress};

static WHITESPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// One tab as reported by a mediator, re-qualified with its endpoint prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TabRecord {
    #[serde(with = "address_as_string")]
    pub address: TabAddress,
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

mod address_as_string {
    use serde::Serializer;

    use crate::address::TabAddress;

    pub fn serialize<S: Serializer>(addr: &TabAddress, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(addr)
    }
}

impl TabRecord {
    /// Parse one mediator response line (`window.tab \t title \t url`,
    /// optionally followed by `\t text`) and qualify it with `prefix`.
    pub fn from_mediator_line(prefix: char, line: &str) -> Result<Self, AddressError> {
        let mut fields = line.splitn(4, '\t');
        let local_id = fields.next().unwrap_or_default();
        let address = TabAddress::from_local(prefix, local_id)?;
        Ok(Self {
            address,
            title: fields.next().unwrap_or_default().to_string(),
            url: fields.next().unwrap_or_default().to_string(),
            text: fields.next().map(str::to_string),
        })
    }

    /// Parse one persisted TSV line (`prefix.window.tab \t title \t url [\t text]`).
    pub fn from_tsv_line(line: &str) -> Result<Self, AddressError> {
        let mut fields = line.splitn(4, '\t');
        let address: TabAddress = fields.next().unwrap_or_default().parse()?;
        Ok(Self {
            address,
            title: fields.next().unwrap_or_default().to_string(),
            url: fields.next().unwrap_or_default().to_string(),
            text: fields.next().map(str::to_string),
        })
    }

    pub fn to_tsv_line(&self) -> String {
        match &self.text {
            Some(text) => format!("{}\t{}\t{}\t{}", self.address, self.title, self.url, text),
            None => format!("{}\t{}\t{}", self.address, self.title, self.url),
        }
    }

    /// Collapse whitespace runs in the extracted text. Must run before
    /// indexing so indexed tokens are stable across rebuilds.
    pub fn cleanup_text(&mut self) {
        if let Some(text) = &self.text {
            self.text = Some(collapse_whitespace(text));
        }
    }
}

/// One tab-move instruction: put `address` at `index` inside
/// `window_id` of its own browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveCommand {
    pub address: TabAddress,
    pub window_id: String,
    pub index: i64,
}

impl MoveCommand {
    /// Parse one `tab_id \t new_window_id \t new_index` line.
    pub fn from_tsv_line(line: &str) -> Result<Self, AddressError> {
        let fields: Vec<&str> = line.split('\t').collect();
        let [id, window_id, index] = fields.as_slice() else {
            return Err(AddressError::Malformed(line.to_string()));
        };
        let index = index
            .trim()
            .parse::<i64>()
            .map_err(|_| AddressError::Malformed(line.to_string()))?;
        Ok(Self {
            address: id.parse()?,
            window_id: window_id.to_string(),
            index,
        })
    }
}

pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUNS.replace_all(text, " ").into_owned()
}
