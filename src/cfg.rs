//! Configuration for both halves: the page's explicit [`PageConfig`] and the
//! collector's environment-driven [`Config`].

#[cfg(not(target_arch = "wasm32"))]
use std::{env, path::PathBuf};

#[cfg(not(target_arch = "wasm32"))]
use anyhow::{Context, Result};
use serde::Deserialize;

use crate::key::decode_application_server_key;

/// Values the hosting page hands to the controller at startup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PageConfig {
    #[serde(rename = "applicationServerKey")]
    pub application_server_key: String,
    #[serde(rename = "subscriptionURL")]
    pub subscription_url: String,
}

impl PageConfig {
    pub fn application_server_key_bytes(&self) -> crate::Result<Vec<u8>> {
        decode_application_server_key(&self.application_server_key)
    }
}

pub const DEFAULT_LISTEN_ADDR: &str = "localhost:8080";
pub const DEFAULT_VAPID_SUBJECT: &str = "mailto:admin@localhost";
pub const DEFAULT_SUBSCRIPTIONS_FILE: &str = "subscriptions.json";

/// Collector settings, read from the environment.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: String,
    pub vapid_private_key: String,
    pub vapid_subject: String,
    pub subscriptions_file: PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl Config {
    /// Reads the environment, after loading `.env` if one is present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Config {
            listen_addr: lookup("LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string()),
            vapid_private_key: lookup("VAPID_PRIVATE_KEY")
                .filter(|key| !key.is_empty())
                .context("VAPID_PRIVATE_KEY must be set")?,
            vapid_subject: lookup("VAPID_SUBJECT")
                .unwrap_or_else(|| DEFAULT_VAPID_SUBJECT.to_string()),
            subscriptions_file: lookup("SUBSCRIPTIONS_FILE")
                .unwrap_or_else(|| DEFAULT_SUBSCRIPTIONS_FILE.to_string())
                .into(),
        })
    }
}
