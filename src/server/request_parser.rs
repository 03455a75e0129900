use log::debug;
use std::io::{self, BufRead, Read};

use super::error::{ServeError, ServeResult};

pub const MAX_LINE_LEN: usize = 65536;
pub const MAX_HEADERS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub target: String,
    pub version: (u8, u8),
    pub headers: Vec<(String, String)>,
}

impl Request {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_head(&self) -> bool {
        self.method == "HEAD"
    }

    pub fn request_line(&self) -> String {
        format!(
            "{} {} HTTP/{}.{}",
            self.method, self.target, self.version.0, self.version.1
        )
    }
}

/// Reads one request head from a buffered stream.
///
/// `Ok(None)` means the peer closed (or sent a blank line) before any request
/// line arrived, in which case nothing should be written back.
pub fn read_request<R: BufRead>(reader: &mut R) -> ServeResult<Option<Request>> {
    let line = match read_line(reader)? {
        Some(line) => line,
        None => return Ok(None),
    };
    if line.len() > MAX_LINE_LEN {
        return Err(ServeError::UriTooLong);
    }

    let line = decode_line(&line)?;
    if line.is_empty() {
        debug!("Blank request line, closing");
        return Ok(None);
    }

    let (method, target, version) = parse_request_line(&line)?;
    let headers = read_headers(reader)?;

    Ok(Some(Request {
        method,
        target,
        version,
        headers,
    }))
}

fn parse_request_line(line: &str) -> ServeResult<(String, String, (u8, u8))> {
    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        [method, target, version] => {
            let version = parse_version(version)?;
            Ok((method.to_string(), target.to_string(), version))
        }
        [_, _] => Err(ServeError::BadRequest(format!(
            "Bad HTTP/0.9 request type ('{}')",
            words[0]
        ))),
        _ => Err(ServeError::BadRequest(format!(
            "Bad request syntax ('{}')",
            line
        ))),
    }
}

fn parse_version(raw: &str) -> ServeResult<(u8, u8)> {
    let bad = || ServeError::BadRequest(format!("Bad request version ('{}')", raw));

    let numbers = raw.strip_prefix("HTTP/").ok_or_else(bad)?;
    let (major, minor) = numbers.split_once('.').ok_or_else(bad)?;
    if major.is_empty()
        || minor.is_empty()
        || !major.bytes().all(|b| b.is_ascii_digit())
        || !minor.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(bad());
    }

    let major: u8 = major.parse().map_err(|_| bad())?;
    let minor: u8 = minor.parse().map_err(|_| bad())?;
    if major >= 2 {
        return Err(ServeError::VersionNotSupported(raw.to_string()));
    }
    Ok((major, minor))
}

fn read_headers<R: BufRead>(reader: &mut R) -> ServeResult<Vec<(String, String)>> {
    let mut headers: Vec<(String, String)> = Vec::new();

    loop {
        let raw = match read_line(reader)? {
            Some(raw) => raw,
            None => break,
        };
        if raw.len() > MAX_LINE_LEN {
            return Err(ServeError::HeaderLineTooLong);
        }

        let line = decode_line(&raw)?;
        if line.is_empty() {
            break;
        }

        if line.starts_with(' ') || line.starts_with('\t') {
            match headers.last_mut() {
                Some((_, value)) => {
                    value.push(' ');
                    value.push_str(line.trim());
                    continue;
                }
                None => {
                    return Err(ServeError::BadRequest(
                        "Header continuation without a header".to_string(),
                    ));
                }
            }
        }

        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| ServeError::BadRequest(format!("Malformed header line ('{}')", line)))?;
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(ServeError::BadRequest(format!("Malformed header name ('{}')", name)));
        }

        headers.push((name.to_string(), value.trim().to_string()));
        if headers.len() > MAX_HEADERS {
            return Err(ServeError::TooManyHeaders);
        }
    }

    Ok(headers)
}

/// Reads up to and including `\n`, capped one byte past the line limit so the
/// caller can tell an over-long line apart.
fn read_line<R: BufRead>(reader: &mut R) -> ServeResult<Option<Vec<u8>>> {
    let mut buf = Vec::new();
    let limit = MAX_LINE_LEN as u64 + 1;

    match reader.by_ref().take(limit).read_until(b'\n', &mut buf) {
        Ok(0) => Ok(None),
        Ok(_) => Ok(Some(buf)),
        Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
            Err(ServeError::Timeout)
        }
        Err(e) => Err(ServeError::Internal(e)),
    }
}

fn decode_line(raw: &[u8]) -> ServeResult<String> {
    let text = std::str::from_utf8(raw)
        .map_err(|_| ServeError::BadRequest("Request is not valid UTF-8".to_string()))?;
    Ok(text.trim_end_matches(['\r', '\n']).to_string())
}
