/*
 * header.rs
 * Copyright (C) 2026 Conduit Contributors
 *
 * This file is part of Conduit, an embeddable HTTP mediation engine.
 *
 * Conduit is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Conduit is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Conduit.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Header storage and the two wire formats: the CRLF request-line block used to parse an incoming
//! request, and the simplified `Key: v1,v2\n` block used for `WHDR` payloads and response parsing.
//!
//! No regex dependency: tokens are scanned by hand, the same way `protocol/http/h1/parser.rs` scans
//! status lines and chunk sizes.

use std::collections::HashMap;

use crate::error::EngineError;
use crate::request::Method;

/// Ordered-enough multimap of HTTP headers. Keys are stored canonicalized
/// (`Content-Type`, not `content-type` or `CONTENT-TYPE`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap(HashMap<String, Vec<String>>);

impl HeaderMap {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Append a value, preserving any existing values under the same canonical key.
    pub fn append(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.0
            .entry(canonicalize(name.as_ref()))
            .or_default()
            .push(value.into());
    }

    /// Replace all values under `name` with the single given value.
    pub fn set(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.0.insert(canonicalize(name.as_ref()), vec![value.into()]);
    }

    /// First value under `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(&canonicalize(name))
            .and_then(|v| v.first())
            .map(|s| s.as_str())
    }

    /// All values under `name`.
    pub fn values(&self, name: &str) -> &[String] {
        self.0
            .get(&canonicalize(name))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Title-case each `-`-separated segment, per RFC 2616 canonical header naming.
fn canonicalize(name: &str) -> String {
    name.split('-')
        .map(|seg| {
            let mut chars = seg.chars();
            match chars.next() {
                Some(first) => {
                    first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_graphic() && !matches!(c, '(' | ')' | '<' | '>' | '@' | ',' | ';' | ':' | '\\' | '"' | '/' | '[' | ']' | '?' | '=' | '{' | '}')
}

fn is_value_char(c: char) -> bool {
    !c.is_control() || c == '\t'
}

/// Result of parsing the wire request-line + header block.
pub struct ParsedRequest {
    pub method: Method,
    pub uri: String,
    pub version: (u8, u8),
    pub headers: HeaderMap,
    pub host: Option<String>,
    pub content_length: Option<u64>,
}

/// Parse a CRLF-separated request block: request line, then `Token: value` lines.
pub fn parse_wire_request(raw: &str) -> Result<ParsedRequest, EngineError> {
    let mut lines = raw.split("\r\n");
    let request_line = lines
        .next()
        .filter(|l| !l.is_empty())
        .ok_or_else(|| EngineError::Parse("empty request block".to_string()))?;
    let (method, uri, version) = parse_request_line(request_line)?;

    let mut headers = HeaderMap::new();
    let mut host = None;
    let mut content_length = None;
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let (name, value) = parse_header_line(line)?;
        let canonical = canonicalize(&name);
        if canonical == "Host" {
            host = Some(value.clone());
        } else if canonical == "Content-Length" {
            content_length = Some(value.trim().parse::<u64>().map_err(|_| {
                EngineError::Parse(format!("invalid Content-Length: \"{}\"", value))
            })?);
        }
        headers.append(&canonical, value);
    }

    Ok(ParsedRequest {
        method,
        uri,
        version,
        headers,
        host,
        content_length,
    })
}

fn parse_request_line(line: &str) -> Result<(Method, String, (u8, u8)), EngineError> {
    let mut parts = line.splitn(3, ' ');
    let (method_str, uri, http_version) = match (parts.next(), parts.next(), parts.next()) {
        (Some(m), Some(u), Some(v)) if !m.is_empty() && !u.is_empty() => (m, u, v),
        _ => return Err(EngineError::Parse(format!("invalid request line: \"{}\"", line))),
    };
    if !method_str.chars().all(is_token_char) {
        return Err(EngineError::Parse(format!("invalid request line: \"{}\"", line)));
    }
    if !uri.chars().all(is_value_char) {
        return Err(EngineError::Parse(format!("invalid request line: \"{}\"", line)));
    }
    let version = parse_http_version(http_version)
        .ok_or_else(|| EngineError::Parse(format!("invalid request line: \"{}\"", line)))?;
    Ok((Method::from_wire(method_str), uri.to_string(), version))
}

fn parse_http_version(s: &str) -> Option<(u8, u8)> {
    let rest = s.strip_prefix("HTTP/")?;
    let (major, minor) = rest.split_once('.')?;
    Some((major.parse().ok()?, minor.parse().ok()?))
}

fn parse_header_line(line: &str) -> Result<(String, String), EngineError> {
    let (name, value) = line
        .split_once(':')
        .ok_or_else(|| EngineError::Parse(format!("invalid header line: \"{}\"", line)))?;
    let name = name.trim();
    let value = value.trim();
    if name.is_empty() || !name.chars().all(is_token_char) {
        return Err(EngineError::Parse(format!("invalid header line: \"{}\"", line)));
    }
    if !value.chars().all(is_value_char) {
        return Err(EngineError::Parse(format!("invalid header line: \"{}\"", line)));
    }
    Ok((name.to_string(), value.to_string()))
}

/// Parse the simplified `Key: v1,v2\n` block (LF-separated, comma-joined multi-values).
pub fn parse_simple_headers(raw: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for line in raw.split('\n') {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let canonical = canonicalize(name);
        let value = value.trim();
        if value.is_empty() {
            headers.0.entry(canonical).or_default();
            continue;
        }
        for v in value.split(',') {
            let v = v.trim();
            if !v.is_empty() {
                headers.append(&canonical, v);
            }
        }
    }
    headers
}

/// Serialize to the simplified block: one `Key: v1,v2\n` line per key, empty values dropped,
/// a key with no values serializes as `Key: \n`.
pub fn serialize_simple_headers(headers: &HeaderMap) -> String {
    let mut out = String::new();
    for (key, values) in headers.iter() {
        let joined = values
            .iter()
            .filter(|v| !v.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(key);
        out.push_str(": ");
        out.push_str(&joined);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_header_names() {
        let mut h = HeaderMap::new();
        h.set("content-type", "text/plain");
        assert_eq!(h.get("Content-Type"), Some("text/plain"));
        assert_eq!(h.get("CONTENT-TYPE"), Some("text/plain"));
    }

    #[test]
    fn parses_request_line_and_extracts_host_and_length() {
        let raw = "POST /readbody HTTP/1.1\r\nHost: example.com\r\nContent-Length: 13\r\nX-Apigee-Test: a,b\r\n";
        let parsed = parse_wire_request(raw).unwrap();
        assert_eq!(parsed.method, Method::Post);
        assert_eq!(parsed.uri, "/readbody");
        assert_eq!(parsed.version, (1, 1));
        assert_eq!(parsed.host.as_deref(), Some("example.com"));
        assert_eq!(parsed.content_length, Some(13));
        assert_eq!(parsed.headers.values("X-Apigee-Test"), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn rejects_malformed_request_line() {
        let err = parse_wire_request("BOGUS\r\n").unwrap_err();
        assert!(matches!(err, EngineError::Parse(_)));
    }

    #[test]
    fn rejects_bad_content_length() {
        let raw = "GET / HTTP/1.1\r\nContent-Length: not-a-number\r\n";
        let err = parse_wire_request(raw).unwrap_err();
        assert!(err.to_string().contains("Content-Length"));
    }

    #[test]
    fn simple_headers_round_trip_and_drop_empties() {
        let mut h = HeaderMap::new();
        h.append("X-Apigee-Test", "a");
        h.append("X-Apigee-Test", "");
        h.append("X-Apigee-Test", "b");
        let wire = serialize_simple_headers(&h);
        assert_eq!(wire, "X-Apigee-Test: a,b\n");
        let parsed = parse_simple_headers(&wire);
        assert_eq!(parsed.values("X-Apigee-Test"), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn empty_list_serializes_with_blank_value() {
        let mut h = HeaderMap::new();
        h.append("X-Empty", "");
        let wire = serialize_simple_headers(&h);
        assert_eq!(wire, "X-Empty: \n");
    }
}
