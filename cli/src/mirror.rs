use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;
use tokio::task::JoinHandle;

use calorez_core::error::CalorieError;
use calorez_core::sync::{MirrorSink, SyncRequest};

/// Mirrors entries to a spreadsheet script with plain GET requests.
///
/// Each notification runs on its own background task. Responses are dropped
/// unread and failures only reach the log.
pub struct SheetsMirror {
    client: reqwest::Client,
    endpoint: Url,
    rt: tokio::runtime::Handle,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
}

impl SheetsMirror {
    /// Must be called from inside a tokio runtime.
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint =
            Url::parse(endpoint).with_context(|| format!("Invalid mirror endpoint '{endpoint}'"))?;
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "calorez/{} (calorie log)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint,
            rt: tokio::runtime::Handle::current(),
            in_flight: Mutex::new(Vec::new()),
        })
    }

    /// Give outstanding notifications up to `grace` to finish. Whatever is
    /// still running afterwards is abandoned. Returns how many were abandoned.
    pub async fn flush(&self, grace: Duration) -> usize {
        let handles: Vec<JoinHandle<()>> = match self.in_flight.lock() {
            Ok(mut in_flight) => in_flight.drain(..).collect(),
            Err(_) => return 0,
        };

        let deadline = tokio::time::Instant::now() + grace;
        let mut abandoned = 0;
        for handle in handles {
            if tokio::time::timeout_at(deadline, handle).await.is_err() {
                abandoned += 1;
            }
        }
        if abandoned > 0 {
            tracing::warn!(abandoned, "mirror notifications still pending at exit, giving up");
        }
        abandoned
    }
}

/// Hand back `result` only after pending notifications had their grace
/// period. Runs the flush even when the command or its save failed.
pub async fn settle<T>(mirror: Option<&SheetsMirror>, grace: Duration, result: T) -> T {
    if let Some(mirror) = mirror {
        mirror.flush(grace).await;
    }
    result
}

async fn deliver(
    client: &reqwest::Client,
    endpoint: Url,
    request: &SyncRequest,
) -> Result<(), CalorieError> {
    client
        .get(endpoint)
        .query(&request.query_pairs())
        .send()
        .await
        .map(drop)
        .map_err(|err| CalorieError::SyncDelivery {
            action: request.action(),
            id: request.entry_id(),
            reason: err.to_string(),
        })
}

impl MirrorSink for SheetsMirror {
    fn dispatch(&self, request: SyncRequest) {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        tracing::debug!(action = request.action(), id = %request.entry_id(), "dispatching");

        let handle = self.rt.spawn(async move {
            if let Err(err) = deliver(&client, endpoint, &request).await {
                tracing::warn!("{err}");
            }
        });

        if let Ok(mut in_flight) = self.in_flight.lock() {
            in_flight.retain(|h| !h.is_finished());
            in_flight.push(handle);
        }
    }
}
