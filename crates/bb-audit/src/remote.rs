//! C10 remote half: an optional, best-effort POST of the audit entry to a
//! configured HTTPS endpoint. Bounded by a 5s deadline, never awaited by
//! the caller for longer than that, and its failure never changes the
//! allow/deny outcome -- it's fired after the decision is already final.

use std::time::Duration;

use serde::Serialize;

const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Serialize)]
pub struct RemoteViolation {
    #[serde(rename = "type")]
    pub violation_type: String,
    pub rule: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoteAuditPayload {
    pub timestamp: String,
    pub command: String,
    pub allowed: bool,
    pub violations: Vec<RemoteViolation>,
    pub duration: u64,
    pub agent: Option<String>,
}

/// POST the payload to `url`. `url` must be https; failures of any kind
/// (network, non-2xx, timeout) are logged and swallowed.
pub fn send(url: &str, payload: &RemoteAuditPayload) {
    if !url.starts_with("https://") {
        tracing::warn!("refusing to send remote audit entry to non-https url: {url}");
        return;
    }
    let client = match reqwest::blocking::Client::builder().timeout(TIMEOUT).build() {
        Ok(client) => client,
        Err(err) => {
            tracing::warn!("failed building remote audit client: {err}");
            return;
        }
    };
    let user_agent = format!("BashBros/{}", env!("CARGO_PKG_VERSION"));
    match client
        .post(url)
        .header("User-Agent", user_agent)
        .json(payload)
        .send()
    {
        Ok(resp) if !resp.status().is_success() => {
            tracing::warn!("remote audit endpoint returned {}", resp.status());
        }
        Ok(_) => {}
        Err(err) => {
            tracing::warn!("remote audit send failed, dropping silently: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_rejects_non_https_url_without_panicking() {
        send(
            "http://example.com/audit",
            &RemoteAuditPayload {
                timestamp: "2026-01-01T00:00:00Z".into(),
                command: "ls".into(),
                allowed: true,
                violations: vec![],
                duration: 1,
                agent: None,
            },
        );
    }
}
