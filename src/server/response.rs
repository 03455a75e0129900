use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};

use super::dir_listing::escape_html;
use super::http_status::HttpStatus;

pub const SERVER_NAME: &str = concat!("devserve/", env!("CARGO_PKG_VERSION"));

pub enum Body {
    Empty,
    Bytes(Vec<u8>),
    File { file: File, len: u64 },
}

pub struct Response {
    pub status: HttpStatus,
    headers: Vec<(String, String)>,
    body: Body,
}

impl Response {
    pub fn new(status: HttpStatus) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Body::Empty,
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn with_bytes(self, content_type: &str, bytes: Vec<u8>) -> Self {
        let mut response = self.with_header("Content-Type", content_type);
        response.body = Body::Bytes(bytes);
        response
    }

    pub fn with_file(self, content_type: &str, file: File, len: u64) -> Self {
        let mut response = self.with_header("Content-Type", content_type);
        response.body = Body::File { file, len };
        response
    }

    pub fn error(status: HttpStatus, message: &str) -> Self {
        let body = format!(
            "<!DOCTYPE HTML>
<html lang=\"en\">
    <head>
        <meta charset=\"utf-8\">
        <title>Error response</title>
    </head>
    <body>
        <h1>Error response</h1>
        <p>Error code: {code}</p>
        <p>Message: {message}.</p>
        <p>Error code explanation: {code} - {explain}.</p>
    </body>
</html>
",
            code = status.code(),
            message = escape_html(message),
            explain = status.explain(),
        );

        Self::new(status).with_bytes("text/html;charset=utf-8", body.into_bytes())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body_len(&self) -> u64 {
        match &self.body {
            Body::Empty => 0,
            Body::Bytes(bytes) => bytes.len() as u64,
            Body::File { len, .. } => *len,
        }
    }

    pub fn head(&self) -> String {
        let mut head = self.status.as_response_line();
        head.push_str(&format!("Server: {}\r\n", SERVER_NAME));
        head.push_str(&format!("Date: {}\r\n", http_date(Utc::now())));
        for (name, value) in &self.headers {
            head.push_str(&format!("{}: {}\r\n", name, value));
        }
        if !self.status.forbids_body() {
            head.push_str(&format!("Content-Length: {}\r\n", self.body_len()));
        }
        head.push_str("Connection: close\r\n\r\n");
        head
    }

    /// Writes the response and returns the number of body bytes sent.
    pub fn write_to<W: Write>(self, stream: W, head_only: bool) -> io::Result<u64> {
        let mut writer = BufWriter::new(stream);
        writer.write_all(self.head().as_bytes())?;

        let sent = if head_only || self.status.forbids_body() {
            0
        } else {
            match self.body {
                Body::Empty => 0,
                Body::Bytes(bytes) => {
                    writer.write_all(&bytes)?;
                    bytes.len() as u64
                }
                Body::File { file, len } => io::copy(&mut file.take(len), &mut writer)?,
            }
        };

        writer.flush()?;
        Ok(sent)
    }
}

/// IMF-fixdate, as used by `Date` and `Last-Modified`.
pub fn http_date(time: DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
