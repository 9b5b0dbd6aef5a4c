//! Outbound HTTP policy (destination checks, response limits, redaction).
//!
//! The bridge calls whatever base URL the caller hands it, so the default policy is permissive.
//! Deployments reachable from untrusted callers should turn off private-network access.

use crate::error::HttpToolsError;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tokio::net::lookup_host;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutboundPolicy {
    /// Allow loopback/private/link-local/reserved destination IPs.
    pub allow_private_networks: bool,
    /// If non-empty, only these hosts may be called (case-insensitive).
    pub allowed_hosts: Vec<String>,
    /// Maximum response body size in bytes. `None` = unlimited.
    pub max_response_bytes: Option<usize>,
    pub follow_redirects: bool,
}

impl Default for OutboundPolicy {
    fn default() -> Self {
        Self::permissive()
    }
}

impl OutboundPolicy {
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            allow_private_networks: true,
            allowed_hosts: Vec::new(),
            max_response_bytes: None,
            follow_redirects: true,
        }
    }

    #[must_use]
    pub fn restrictive() -> Self {
        Self {
            allow_private_networks: false,
            allowed_hosts: Vec::new(),
            max_response_bytes: Some(1024 * 1024),
            follow_redirects: false,
        }
    }

    pub(crate) fn redirect_policy(&self) -> reqwest::redirect::Policy {
        if self.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        }
    }

    /// Validate a destination before any bytes are sent.
    ///
    /// # Errors
    ///
    /// Returns an error for non-`http(s)` schemes, hosts outside the allowlist, and (when private
    /// networks are disallowed) hosts that are or resolve to a denied address.
    pub async fn check_url(&self, url: &Url) -> Result<(), HttpToolsError> {
        let scheme = url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(HttpToolsError::Http(format!(
                "outbound request blocked: unsupported URL scheme '{scheme}'"
            )));
        }

        let Some(host) = url.host_str() else {
            return Err(HttpToolsError::Http(
                "outbound request blocked: missing URL host".to_string(),
            ));
        };

        if !self.allowed_hosts.is_empty()
            && !self
                .allowed_hosts
                .iter()
                .any(|h| h.eq_ignore_ascii_case(host))
        {
            return Err(HttpToolsError::Http(format!(
                "outbound request blocked: host '{host}' is not allowed"
            )));
        }

        if self.allow_private_networks {
            return Ok(());
        }

        let literal = host.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = literal.parse::<IpAddr>() {
            return deny_if_private(host, ip);
        }

        let port = url.port_or_known_default().unwrap_or(443);
        let addrs = lookup_host((host, port))
            .await
            .map_err(|e| HttpToolsError::Transport(format!("DNS lookup failed for '{host}': {e}")))?;

        let mut resolved = false;
        for addr in addrs {
            resolved = true;
            deny_if_private(host, addr.ip())?;
        }
        if !resolved {
            return Err(HttpToolsError::Transport(format!(
                "DNS lookup returned no addresses for '{host}'"
            )));
        }
        Ok(())
    }
}

fn deny_if_private(host: &str, ip: IpAddr) -> Result<(), HttpToolsError> {
    let denied = match ip {
        IpAddr::V4(v4) => is_denied_ipv4(v4),
        IpAddr::V6(v6) => is_denied_ipv6(v6),
    };
    if denied {
        Err(HttpToolsError::Http(format!(
            "outbound request blocked: '{host}' maps to non-public address {ip}"
        )))
    } else {
        Ok(())
    }
}

fn is_denied_ipv4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_multicast()
        // CGNAT
        || (a == 100 && (64..=127).contains(&b))
        || a >= 240
}

fn is_denied_ipv6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_denied_ipv4(v4);
    }
    ip.is_loopback()
        || ip.is_unspecified()
        || ip.is_multicast()
        || ip.is_unique_local()
        || ip.is_unicast_link_local()
}

/// Drop credentials, query and fragment from a URL before it reaches logs or error text.
#[must_use]
pub fn redact_url(url: &Url) -> String {
    let mut u = url.clone();
    let _ = u.set_username("");
    let _ = u.set_password(None);
    u.set_query(None);
    u.set_fragment(None);
    u.to_string()
}

#[must_use]
pub fn sanitize_reqwest_error(e: &reqwest::Error) -> String {
    let mut msg = e.to_string();
    if let Some(u) = e.url() {
        msg = msg.replace(u.as_str(), &redact_url(u));
    }
    msg
}
