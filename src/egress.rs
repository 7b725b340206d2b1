//! Outbound egress-IP check through a client's current proxy
//!
//! One absolute-form HTTP GET is dialed through the proxy endpoint and
//! the echoed public IP is extracted from the response. The caller must
//! clone the proxy out of the store guard first; nothing here touches
//! shared state, so a slow upstream never stalls `current`/`rotate`.

use anyhow::{bail, Context};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use url::Url;

use crate::config::EgressConfig;
use crate::error::{CarouselError, Result};
use crate::models::ProxyEndpoint;

/// Fetch the egress IP visible behind `proxy`, bounded by the configured
/// timeout. Timeouts and non-2xx responses both surface as `Upstream`.
pub async fn check_egress_ip(proxy: &ProxyEndpoint, config: &EgressConfig) -> Result<String> {
    match timeout(
        config.check_timeout,
        fetch_ip_via_proxy(proxy, &config.check_url),
    )
    .await
    {
        Ok(Ok(ip)) => Ok(ip),
        Ok(Err(e)) => Err(CarouselError::Upstream(e.to_string())),
        Err(_) => Err(CarouselError::Upstream(format!(
            "IP check timed out after {}s",
            config.check_timeout.as_secs()
        ))),
    }
}

async fn fetch_ip_via_proxy(proxy: &ProxyEndpoint, check_url: &Url) -> anyhow::Result<String> {
    let mut stream = TcpStream::connect(proxy.addr())
        .await
        .with_context(|| format!("connect to proxy {} failed", proxy.addr()))?;

    // Absolute-form request, HTTP/1.0 so the upstream closes the
    // connection after one unchunked response.
    let mut request = format!(
        "GET {} HTTP/1.0\r\nHost: {}\r\nConnection: close\r\nAccept: application/json\r\n",
        check_url,
        host_header(check_url)
    );

    if let Some(username) = &proxy.username {
        let password = proxy.password.as_deref().unwrap_or("");
        let credentials = format!("{}:{}", username, password);
        request.push_str(&format!(
            "Proxy-Authorization: Basic {}\r\n",
            BASE64.encode(credentials.as_bytes())
        ));
    }

    request.push_str("\r\n");
    stream.write_all(request.as_bytes()).await?;

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await?;
    if response.is_empty() {
        bail!("empty response from proxy");
    }

    parse_ip_response(&response)
}

fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// Extract the echoed IP from the response: either `{"ip": "..."}` or a
/// bare-text body, depending on the configured echo endpoint.
fn parse_ip_response(raw: &[u8]) -> anyhow::Result<String> {
    let text = String::from_utf8_lossy(raw);
    let (head, body) = text
        .split_once("\r\n\r\n")
        .context("malformed HTTP response")?;

    let status_line = head.lines().next().unwrap_or_default();
    let code: u16 = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .with_context(|| format!("malformed status line: {}", status_line))?;

    if !(200..300).contains(&code) {
        bail!("upstream returned {}", status_line);
    }

    let body = body.trim();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(ip) = value.get("ip").and_then(|v| v.as_str()) {
            return Ok(ip.to_string());
        }
    }

    match body.lines().next() {
        Some(line) if !line.trim().is_empty() => Ok(line.trim().to_string()),
        _ => bail!("upstream response had no body"),
    }
}
