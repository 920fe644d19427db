use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use thiserror::Error;

pub const CACHE_NAME: &str = "klanginsel-cache-v2";
pub const SHELL_PATHS: &[&str] = &[
    "/",
    "/index.html",
    "/src/main.jsx",
    "/src/App.jsx",
    "/src/App.css",
    "/src/index.css",
    "/favicon.svg",
    "/manifest.json",
    "/icon-192.png",
    "/icon-512.png",
];
pub const BYPASS_HOSTS: &[&str] = &["soundcloud.com", "sndcdn.com"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("network error fetching {0}")]
    Network(String),
    #[error("{0} is neither reachable nor cached")]
    NotCached(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub url: String,
    pub status: u16,
    pub body: Vec<u8>,
}

pub trait Network {
    fn fetch(&mut self, url: &str) -> Result<Response, FetchError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerMessage {
    KeepAlive,
}

#[derive(Debug, Default)]
pub struct ShellCache {
    caches: BTreeMap<String, BTreeMap<String, Response>>,
}

impl ShellCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_names(&self) -> Vec<String> {
        self.caches.keys().cloned().collect()
    }

    pub fn cached(&self, url: &str) -> Option<&Response> {
        self.caches.get(CACHE_NAME)?.get(url)
    }

    pub fn install(&mut self, network: &mut dyn Network) -> Result<usize, FetchError> {
        let mut fetched = BTreeMap::new();
        for path in SHELL_PATHS {
            let response = network.fetch(path)?;
            fetched.insert((*path).to_string(), response);
        }
        let count = fetched.len();
        self.caches
            .entry(CACHE_NAME.to_string())
            .or_default()
            .extend(fetched);
        tracing::info!(cache = CACHE_NAME, entries = count, "shell cache installed");
        Ok(count)
    }

    pub fn activate(&mut self) -> Vec<String> {
        let stale: Vec<String> = self
            .caches
            .keys()
            .filter(|name| name.as_str() != CACHE_NAME)
            .cloned()
            .collect();
        for name in &stale {
            self.caches.remove(name);
            tracing::info!(cache = %name, "deleted stale cache");
        }
        stale
    }

    pub fn fetch(&mut self, network: &mut dyn Network, url: &str) -> Result<Response, FetchError> {
        if bypasses_cache(url) {
            return network.fetch(url);
        }

        match network.fetch(url) {
            Ok(response) => Ok(response),
            Err(err) => {
                tracing::debug!("{err}, trying cache");
                self.cached(url)
                    .cloned()
                    .ok_or_else(|| FetchError::NotCached(url.to_string()))
            }
        }
    }

    pub fn on_message(&self, message: &WorkerMessage) {
        match message {
            WorkerMessage::KeepAlive => {
                tracing::debug!("keep-alive ping for background playback");
            }
        }
    }
}

pub fn bypasses_cache(url: &str) -> bool {
    BYPASS_HOSTS.iter().any(|host| url.contains(host))
}

#[derive(Debug)]
pub struct KeepAlive {
    interval: Duration,
    last_sent: Option<Instant>,
}

impl KeepAlive {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_sent: None,
        }
    }

    pub fn poll(&mut self, now: Instant) -> Option<WorkerMessage> {
        let due = self
            .last_sent
            .is_none_or(|last| now.saturating_duration_since(last) >= self.interval);
        if !due {
            return None;
        }
        self.last_sent = Some(now);
        Some(WorkerMessage::KeepAlive)
    }
}
