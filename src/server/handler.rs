//! Request routing, format negotiation and body rendering.

use std::net::IpAddr;
use tiny_http::{Method, Request};

use crate::provider::Structure;
use crate::query::{Answer, QueryEngine};

/// Error code for a `/q` request without an address.
pub const MISSING_IP: &str = "missing_ip";

const JSON: &str = "application/json; charset=utf-8";
const PLAIN: &str = "text/plain; charset=utf-8";

/// Response body format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Text,
}

/// Pick the body format from the `f` parameter and the user agent.
///
/// `f=text` selects text and any other `f` value selects JSON. Without `f`,
/// curl gets text and everything else JSON.
pub fn negotiate(format: Option<&str>, user_agent: Option<&str>) -> Format {
    match format {
        Some("text") => Format::Text,
        Some(_) => Format::Json,
        None if user_agent.is_some_and(|ua| ua.to_lowercase().contains("curl")) => Format::Text,
        None => Format::Json,
    }
}

/// Address a `/` request should be answered for.
///
/// With trusted proxy headers this is the first `X-Forwarded-For` entry that
/// is an IP address, then `X-Real-IP` if it is one, then the socket peer.
pub fn client_address(
    peer: Option<IpAddr>,
    forwarded_for: Option<&str>,
    real_ip: Option<&str>,
    trust_proxy: bool,
) -> Option<String> {
    if trust_proxy {
        let forwarded = forwarded_for
            .into_iter()
            .flat_map(|value| value.split(','))
            .find_map(|entry| entry.trim().parse::<IpAddr>().ok());
        if let Some(ip) = forwarded {
            return Some(ip.to_string());
        }
        if let Some(ip) = real_ip.and_then(|value| value.trim().parse::<IpAddr>().ok()) {
            return Some(ip.to_string());
        }
    }
    peer.map(|ip| ip.to_string())
}

/// A rendered response, ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Reply {
    fn plain(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: PLAIN,
            body: body.to_string(),
        }
    }

    pub fn not_found() -> Self {
        Self::plain(404, "404 Not Found\n")
    }

    pub fn method_not_allowed() -> Self {
        Self::plain(405, "405 Method Not Allowed\n")
    }
}

/// Render a successful answer.
pub fn render_answer(answer: &Answer, format: Format) -> Reply {
    match format {
        Format::Text => {
            let asn = answer.asn.map(|n| n.to_string()).unwrap_or_default();
            Reply {
                status: 200,
                content_type: PLAIN,
                body: format!(
                    "IP                 : {}\nASN                : {}\nASN Organization   : {}\n",
                    answer.ip, asn, answer.organization
                ),
            }
        }
        Format::Json => match serde_json::to_string(answer) {
            Ok(body) => Reply {
                status: 200,
                content_type: JSON,
                body,
            },
            Err(e) => {
                log::debug!("Failed to encode answer: {}", e);
                render_error("internal_error", format)
            }
        },
    }
}

/// Render an error code.
pub fn render_error(code: &str, format: Format) -> Reply {
    match format {
        Format::Text => Reply {
            status: 400,
            content_type: PLAIN,
            body: format!("Error: {}\n", code),
        },
        Format::Json => Reply {
            status: 400,
            content_type: JSON,
            body: serde_json::json!({ "error": code }).to_string(),
        },
    }
}

/// Query parameters the adapter cares about.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Params {
    pub ip: Option<String>,
    pub format: Option<String>,
}

impl Params {
    /// Parse a raw query string. The first occurrence of a key wins.
    pub fn parse(query: &str) -> Self {
        let mut params = Params::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "ip" if params.ip.is_none() => params.ip = Some(value.into_owned()),
                "f" if params.format.is_none() => params.format = Some(value.into_owned()),
                _ => {}
            }
        }
        params
    }
}

fn header<'a>(request: &'a Request, name: &'static str) -> Option<&'a str> {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv(name))
        .map(|h| h.value.as_str())
}

fn resolve<S: Structure>(engine: &QueryEngine<S>, raw: &str, format: Format) -> Reply {
    match engine.query(raw) {
        Ok(answer) => render_answer(&answer, format),
        Err(e) => {
            log::debug!("Query {:?} failed: {}", raw, e);
            render_error(e.code(), format)
        }
    }
}

/// Produce the reply for one request.
pub fn handle<S: Structure>(engine: &QueryEngine<S>, request: &Request, trust_proxy: bool) -> Reply {
    if request.method() != &Method::Get {
        return Reply::method_not_allowed();
    }

    let (path, query) = match request.url().split_once('?') {
        Some((path, query)) => (path, query),
        None => (request.url(), ""),
    };
    let params = Params::parse(query);
    let format = negotiate(params.format.as_deref(), header(request, "User-Agent"));

    match path {
        "/" => {
            let client = client_address(
                request.remote_addr().map(|addr| addr.ip()),
                header(request, "X-Forwarded-For"),
                header(request, "X-Real-IP"),
                trust_proxy,
            );
            match client {
                Some(ip) => resolve(engine, &ip, format),
                None => render_error(MISSING_IP, format),
            }
        }
        "/q" => {
            let ip = params.ip.as_deref().map(str::trim).unwrap_or_default();
            if ip.is_empty() {
                return render_error(MISSING_IP, format);
            }
            resolve(engine, ip, format)
        }
        _ => Reply::not_found(),
    }
}
