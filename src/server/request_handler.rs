use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use super::config::{ServerConfig, SymlinkPolicy};
use super::dir_listing;
use super::error::{ServeError, ServeResult};
use super::http_status::HttpStatus;
use super::mime::MimeTypes;
use super::path_resolver::{self, ResolvedPath};
use super::request_parser::Request;
use super::response::{Response, http_date};

const INDEX_FILES: &[&str] = &["index.html", "index.htm"];
const ALLOWED_METHODS: &str = "GET, HEAD, OPTIONS";

/// Turns a parsed request into a response. Holds only read-only state, so one
/// instance is shared by every worker.
#[derive(Debug, Clone)]
pub struct RequestHandler {
    root: PathBuf,
    mime: MimeTypes,
    symlinks: SymlinkPolicy,
}

impl RequestHandler {
    pub fn new(document_root: &Path, mime: MimeTypes, symlinks: SymlinkPolicy) -> io::Result<Self> {
        let root = fs::canonicalize(document_root)?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("document root {:?} is not a directory", root),
            ));
        }

        Ok(Self {
            root,
            mime,
            symlinks,
        })
    }

    pub fn from_config(config: &ServerConfig) -> io::Result<Self> {
        Self::new(
            &config.document_root,
            MimeTypes::new(&config.mime_overrides),
            config.symlinks,
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn handle(&self, request: &Request) -> Response {
        match self.try_handle(request) {
            Ok(response) => response,
            Err(err) => {
                if let ServeError::Internal(ref e) = err {
                    warn!("Internal error on {}: {}", request.request_line(), e);
                }
                error_response(&err)
            }
        }
    }

    fn try_handle(&self, request: &Request) -> ServeResult<Response> {
        match request.method.as_str() {
            "GET" | "HEAD" => self.serve_path(request),
            "OPTIONS" => Ok(Response::new(HttpStatus::Ok).with_header("Allow", ALLOWED_METHODS)),
            other => Err(ServeError::UnsupportedMethod(other.to_string())),
        }
    }

    fn serve_path(&self, request: &Request) -> ServeResult<Response> {
        let resolved = path_resolver::resolve(&self.root, &request.target, self.symlinks)?;
        let metadata = fs::metadata(&resolved.fs_path).map_err(ServeError::from_fs)?;

        if metadata.is_dir() {
            self.serve_directory(request, &resolved)
        } else {
            if resolved.trailing_slash {
                return Err(ServeError::NotFound("File not found".to_string()));
            }
            self.serve_file(request, &resolved.fs_path)
        }
    }

    fn serve_directory(&self, request: &Request, resolved: &ResolvedPath) -> ServeResult<Response> {
        if !resolved.trailing_slash {
            let mut location = redirect_location(&resolved.url_path);
            if let Some(query) = &resolved.query {
                location.push('?');
                location.push_str(query);
            }
            debug!("Redirecting directory request to {}", location);
            return Ok(Response::new(HttpStatus::MovedPermanently).with_header("Location", location));
        }

        for index in INDEX_FILES {
            let candidate = resolved.fs_path.join(index);
            if candidate.is_file() {
                path_resolver::check_target(&self.root, &candidate, self.symlinks)?;
                return self.serve_file(request, &candidate);
            }
        }

        let page = dir_listing::render(&resolved.fs_path, &resolved.url_path).map_err(|e| {
            match e.kind() {
                io::ErrorKind::PermissionDenied => {
                    ServeError::Forbidden("No permission to list directory".to_string())
                }
                _ => ServeError::from_fs(e),
            }
        })?;

        Ok(Response::new(HttpStatus::Ok).with_bytes("text/html; charset=utf-8", page.into_bytes()))
    }

    fn serve_file(&self, request: &Request, path: &Path) -> ServeResult<Response> {
        let file = File::open(path).map_err(ServeError::from_fs)?;
        let metadata = file.metadata()?;
        if !metadata.is_file() {
            return Err(ServeError::Forbidden("Not a regular file".to_string()));
        }

        let modified = metadata.modified().ok().map(DateTime::<Utc>::from);
        if let Some(modified) = modified {
            if not_modified_since(request, modified) {
                debug!("{:?} not modified since client copy", path);
                return Ok(Response::new(HttpStatus::NotModified)
                    .with_header("Last-Modified", http_date(modified)));
            }
        }

        let content_type = self.mime.content_type(path);
        let mut response = Response::new(HttpStatus::Ok);
        if let Some(modified) = modified {
            response = response.with_header("Last-Modified", http_date(modified));
        }

        debug!("Serving {:?} ({}, {} bytes)", path, content_type, metadata.len());
        Ok(response.with_file(content_type, file, metadata.len()))
    }
}

/// Re-encodes the normalized path so empty segments never survive; a
/// `Location` starting with `//` would name another host.
fn redirect_location(url_path: &str) -> String {
    let mut location = String::from("/");
    for segment in url_path.split('/').filter(|segment| !segment.is_empty()) {
        location.push_str(&urlencoding::encode(segment));
        location.push('/');
    }
    location
}

pub fn error_response(err: &ServeError) -> Response {
    Response::error(err.status(), &err.public_message())
}

/// `If-Modified-Since` only counts when no `If-None-Match` is present.
/// Unparseable dates are ignored.
fn not_modified_since(request: &Request, modified: DateTime<Utc>) -> bool {
    if request.header("If-None-Match").is_some() {
        return false;
    }

    let since = match request
        .header("If-Modified-Since")
        .and_then(|value| DateTime::parse_from_rfc2822(value).ok())
    {
        Some(since) => since,
        None => return false,
    };

    modified.timestamp() <= since.timestamp()
}
