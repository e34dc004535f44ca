//! Shared HTTP request helpers for CLI commands.

use anyhow::{Context, Result};
use serde::Deserialize;

pub fn base_url(port: u16) -> String {
    format!("http://127.0.0.1:{}", port)
}

pub async fn get_json<T: for<'de> Deserialize<'de>>(url: &str) -> Result<T> {
    reqwest::get(url)
        .await
        .with_context(|| format!("failed to connect to portaged at {}, is it running?", url))?
        .json::<T>()
        .await
        .context("failed to parse response")
}

/// POST a raw body and return the status code with the response text.
pub async fn post_body(url: &str, content_type: &str, body: Vec<u8>) -> Result<(u16, String)> {
    let resp = reqwest::Client::new()
        .post(url)
        .header(reqwest::header::CONTENT_TYPE, content_type)
        .body(body)
        .send()
        .await
        .with_context(|| format!("failed to connect to portaged at {}, is it running?", url))?;
    let status = resp.status().as_u16();
    let text = resp.text().await.context("failed to read response")?;
    Ok((status, text))
}
