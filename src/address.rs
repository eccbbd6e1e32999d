//! Global tab addressing.
//!
//! Every tab is addressed as `prefix.window_id.tab_id`, where the single
//! lowercase `prefix` letter selects one mediator endpoint and the
//! `window_id.tab_id` pair is the ID the mediator itself uses. Only this
//! crate ever sees the full triple; mediators only see their local part.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AddressError {
    #[error("malformed tab address `{0}`: expected prefix.window_id.tab_id")]
    Malformed(String),
}

/// One globally-addressable tab: `prefix.window_id.tab_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TabAddress {
    pub prefix: char,
    pub window_id: String,
    pub tab_id: String,
}

impl TabAddress {
    pub fn new(prefix: char, window_id: impl Into<String>, tab_id: impl Into<String>) -> Self {
        Self {
            prefix,
            window_id: window_id.into(),
            tab_id: tab_id.into(),
        }
    }

    /// The ID as the owning mediator knows it, with the prefix stripped.
    pub fn local_id(&self) -> String {
        format!("{}.{}", self.window_id, self.tab_id)
    }

    /// `prefix.window_id`, used to bucket tabs by browser window.
    pub fn window_key(&self) -> String {
        format!("{}.{}", self.prefix, self.window_id)
    }

    /// Re-qualify a mediator-local `window.tab` ID with an endpoint prefix.
    pub fn from_local(prefix: char, local_id: &str) -> Result<Self, AddressError> {
        match local_id.split('.').collect::<Vec<_>>().as_slice() {
            [window_id, tab_id] => Ok(Self::new(prefix, *window_id, *tab_id)),
            _ => Err(AddressError::Malformed(format!("{prefix}.{local_id}"))),
        }
    }
}

impl fmt::Display for TabAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.prefix, self.window_id, self.tab_id)
    }
}

impl FromStr for TabAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split('.').collect();
        let [prefix, window_id, tab_id] = fields.as_slice() else {
            return Err(AddressError::Malformed(s.to_string()));
        };
        let mut chars = prefix.chars();
        match (chars.next(), chars.next()) {
            (Some(p), None) if p.is_ascii_lowercase() => Ok(Self::new(p, *window_id, *tab_id)),
            _ => Err(AddressError::Malformed(s.to_string())),
        }
    }
}
