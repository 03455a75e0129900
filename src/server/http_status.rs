#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpStatus {
    Ok,
    MovedPermanently,
    NotModified,
    BadRequest,
    Forbidden,
    NotFound,
    RequestTimeout,
    UriTooLong,
    HeaderFieldsTooLarge,
    InternalServerError,
    NotImplemented,
    VersionNotSupported,
}

impl HttpStatus {
    pub fn code(&self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::MovedPermanently => 301,
            Self::NotModified => 304,
            Self::BadRequest => 400,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::RequestTimeout => 408,
            Self::UriTooLong => 414,
            Self::HeaderFieldsTooLarge => 431,
            Self::InternalServerError => 500,
            Self::NotImplemented => 501,
            Self::VersionNotSupported => 505,
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::MovedPermanently => "Moved Permanently",
            Self::NotModified => "Not Modified",
            Self::BadRequest => "Bad Request",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "Not Found",
            Self::RequestTimeout => "Request Timeout",
            Self::UriTooLong => "URI Too Long",
            Self::HeaderFieldsTooLarge => "Request Header Fields Too Large",
            Self::InternalServerError => "Internal Server Error",
            Self::NotImplemented => "Not Implemented",
            Self::VersionNotSupported => "HTTP Version Not Supported",
        }
    }

    /// Longer sentence used on error pages.
    pub fn explain(&self) -> &'static str {
        match self {
            Self::Ok => "Request fulfilled, document follows",
            Self::MovedPermanently => "Object moved permanently -- see URI list",
            Self::NotModified => "Document has not changed since given time",
            Self::BadRequest => "Bad request syntax or unsupported method",
            Self::Forbidden => "Request forbidden -- authorization will not help",
            Self::NotFound => "Nothing matches the given URI",
            Self::RequestTimeout => "Request timed out; try again later",
            Self::UriTooLong => "URI is too long",
            Self::HeaderFieldsTooLarge => "The server refused this request because the headers are too large",
            Self::InternalServerError => "Server got itself in trouble",
            Self::NotImplemented => "Server does not support this operation",
            Self::VersionNotSupported => "Cannot fulfill request",
        }
    }

    /// Statuses that must never carry a message body.
    pub fn forbids_body(&self) -> bool {
        matches!(self, Self::NotModified)
    }

    pub fn as_response_line(&self) -> String {
        format!("HTTP/1.1 {} {}\r\n", self.code(), self.text())
    }
}
