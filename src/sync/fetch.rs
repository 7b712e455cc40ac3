use anyhow::{Context, Result};
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;

const FETCH_TIMEOUT: Duration = Duration::from_secs(20);
const USER_AGENT: &str = "shiurcast/0.1 (+feed-sync)";

pub fn http_client() -> Result<Client> {
    Client::builder()
        .timeout(FETCH_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .context("building http client")
}

pub async fn fetch_feed(client: &Client, url: &str) -> Result<Bytes> {
    let resp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("fetching feed {url}"))?;
    let resp = resp
        .error_for_status()
        .with_context(|| format!("feed {url} returned an error status"))?;
    let bytes = resp.bytes().await.context("reading feed body")?;
    Ok(bytes)
}
