use anyhow::Context as _;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("GET {url} failed with status {status}")]
    Status { url: Url, status: StatusCode },

    #[error("GET {url}: {source}")]
    Transport {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("GET {url}: invalid JSON body: {source}")]
    Decode {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
}

/// Shared HTTP client. Every request is a single attempt; at most
/// `max_concurrency` requests are in flight at once.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    semaphore: std::sync::Arc<Semaphore>,
}

impl Fetcher {
    pub fn new(user_agent: &str, max_concurrency: usize) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("build reqwest client")?;
        Ok(Self {
            client,
            semaphore: std::sync::Arc::new(Semaphore::new(max_concurrency.max(1))),
        })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, HttpError> {
        // The semaphore is never closed, so acquiring cannot fail.
        let _permit = self.semaphore.acquire().await.ok();

        tracing::debug!(%url, "GET");
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| HttpError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(HttpError::Status { url, status });
        }

        resp.json::<T>()
            .await
            .map_err(|source| HttpError::Decode { url, source })
    }
}
