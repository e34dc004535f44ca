//! Replay a captured payload against the receive endpoints.

use anyhow::{Context, Result};

use super::http::{base_url, post_body};

pub async fn cmd_deliver(port: u16, path: &str, user: Option<&str>, legacy: bool) -> Result<()> {
    let payload =
        std::fs::read(path).with_context(|| format!("failed to read payload: {}", path))?;

    let url = match user {
        Some(guid) => format!("{}/receive/users/{}", base_url(port), urlencoding::encode(guid)),
        None => format!("{}/receive/public", base_url(port)),
    };

    let (content_type, body) = if legacy {
        let xml = String::from_utf8(payload).context("legacy payload must be UTF-8 XML")?;
        // Legacy peers encode the document once before form-encoding it.
        let field = urlencoding::encode(&urlencoding::encode(&xml)).into_owned();
        ("application/x-www-form-urlencoded", format!("xml={}", field).into_bytes())
    } else {
        ("application/json", payload)
    };

    let (status, text) = post_body(&url, content_type, body).await?;
    let meaning = match status {
        200 => "processed",
        202 => "accepted without action",
        403 => "federation disabled",
        500 => "payload could not be decoded",
        503 => "receiver unavailable, retry later",
        _ => "unexpected status",
    };
    println!("{} {} ({})", status, meaning, url);
    if !text.is_empty() {
        println!("{}", text);
    }

    Ok(())
}
