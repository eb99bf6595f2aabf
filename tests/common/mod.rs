//! Shared helpers for integration tests: request construction and raw
//! HTTP/1.1 response parsing.
#![allow(dead_code)]

use hashserve::http::RequestContext;

pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_str(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub fn parse_response(raw: &[u8]) -> Response {
    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("no header terminator in response");
    let head = std::str::from_utf8(&raw[..split]).expect("non-utf8 response head");
    let body = raw[split + 4..].to_vec();

    let mut lines = head.split("\r\n");
    let status_line = lines.next().expect("empty response");
    let status: u16 = status_line
        .split_whitespace()
        .nth(1)
        .expect("no status code")
        .parse()
        .expect("unparsable status code");

    let headers = lines
        .filter_map(|line| {
            line.split_once(':')
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        })
        .collect();

    Response {
        status,
        headers,
        body,
    }
}

pub fn request(method: &str, target: &str) -> RequestContext {
    RequestContext {
        method: method.to_string(),
        target: target.to_string(),
        host: Some("localhost:12020".to_string()),
        if_none_match: None,
        content_type: None,
    }
}

pub fn conditional(target: &str, etag: &str) -> RequestContext {
    RequestContext {
        if_none_match: Some(etag.to_string()),
        ..request("GET", target)
    }
}
