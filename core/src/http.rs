//! HTTP/1.0 framing for the time service request
//!
//! Just enough HTTP to fetch one small JSON document: a GET with `Host`,
//! `Accept` and `Connection: close`, and a response split into status code and
//! body. The board reads until the server closes the connection, so there is
//! no chunked decoding and no `Content-Length` handling.

use core::fmt::Write;

use heapless::String;

use crate::error::HttpError;

/// Request buffer size
pub const MAX_REQUEST_LEN: usize = 256;

const SCHEME: &str = "http://";
const DEFAULT_PORT: u16 = 80;
const HEAD_END: &[u8] = b"\r\n\r\n";

/// Parts of an `http://` URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Url<'a> {
    pub host: &'a str,
    pub port: u16,
    /// Always starts with `/`
    pub path: &'a str,
}

impl<'a> Url<'a> {
    pub fn parse(url: &'a str) -> Result<Self, HttpError> {
        let rest = url.strip_prefix(SCHEME).ok_or(HttpError::InvalidUrl)?;
        let (authority, path) = match rest.find('/') {
            Some(i) => rest.split_at(i),
            None => (rest, "/"),
        };

        let (host, port) = match authority.split_once(':') {
            Some((host, port)) => (host, port.parse().map_err(|_| HttpError::InvalidUrl)?),
            None => (authority, DEFAULT_PORT),
        };

        if host.is_empty() || port == 0 {
            return Err(HttpError::InvalidUrl);
        }

        Ok(Self { host, port, path })
    }
}

/// Build the GET request for `url`
pub fn get_request(url: &Url<'_>, accept: &str) -> Result<String<MAX_REQUEST_LEN>, HttpError> {
    let mut request = String::new();
    write!(
        request,
        "GET {} HTTP/1.0\r\nHost: {}\r\nAccept: {}\r\nConnection: close\r\n\r\n",
        url.path, url.host, accept
    )
    .map_err(|_| HttpError::RequestTooLong)?;
    Ok(request)
}

/// Split a complete response into status code and body offset
pub fn split_response(response: &[u8]) -> Result<(u16, usize), HttpError> {
    let head_len = response
        .windows(HEAD_END.len())
        .position(|w| w == HEAD_END)
        .ok_or(HttpError::IncompleteHead)?;

    let status_line = response[..head_len]
        .split(|&b| b == b'\r')
        .next()
        .ok_or(HttpError::MalformedStatusLine)?;

    Ok((parse_status(status_line)?, head_len + HEAD_END.len()))
}

fn parse_status(line: &[u8]) -> Result<u16, HttpError> {
    let mut parts = line.split(|&b| b == b' ').filter(|p| !p.is_empty());

    let version = parts.next().ok_or(HttpError::MalformedStatusLine)?;
    if !version.starts_with(b"HTTP/1.") {
        return Err(HttpError::MalformedStatusLine);
    }

    let code = parts.next().ok_or(HttpError::MalformedStatusLine)?;
    if code.len() != 3 || !code.iter().all(u8::is_ascii_digit) {
        return Err(HttpError::MalformedStatusLine);
    }

    Ok(code
        .iter()
        .fold(0u16, |acc, d| acc * 10 + u16::from(d - b'0')))
}
