use chrono_tz::Tz;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// How symbolic links inside the document root are treated.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymlinkPolicy {
    /// Serve a link only if its target stays inside the document root
    #[default]
    Contained,
    /// Serve link targets wherever they point
    Follow,
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Serve the current directory over HTTP", long_about = None)]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "DEVSERVE_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind (0 picks an ephemeral port)
    #[arg(short, long, env = "DEVSERVE_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Directory the request paths are resolved against
    #[arg(short, long, env = "DEVSERVE_ROOT", default_value = ".")]
    pub document_root: PathBuf,

    /// Worker threads; 1 serves connections strictly one after another
    #[arg(short, long, env = "DEVSERVE_THREADS", default_value_t = 1)]
    pub threads: usize,

    /// Connections accepted but not yet finished before new ones are dropped
    #[arg(long, env = "DEVSERVE_MAX_CONNECTIONS", default_value_t = 1000)]
    pub max_connections: usize,

    /// Socket read/write timeout in seconds (0 disables)
    #[arg(long = "read-timeout", env = "DEVSERVE_READ_TIMEOUT", default_value_t = 30)]
    pub read_timeout_secs: u64,

    /// Symbolic link policy
    #[arg(long, value_enum, env = "DEVSERVE_SYMLINKS", default_value_t = SymlinkPolicy::Contained)]
    pub symlinks: SymlinkPolicy,

    /// Extra MIME override, e.g. `--mime .wgsl=text/wgsl` (repeatable)
    #[arg(long = "mime", value_name = "EXT=TYPE", value_parser = parse_mime_override)]
    pub mime_overrides: Vec<(String, String)>,

    /// Append log lines to this file as well
    #[arg(long, env = "DEVSERVE_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Timezone used for log timestamps
    #[arg(long, env = "DEVSERVE_LOG_TZ", default_value = "UTC", value_parser = parse_timezone)]
    pub log_timezone: Tz,
}

impl ServerConfig {
    pub fn read_timeout(&self) -> Option<Duration> {
        match self.read_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            document_root: PathBuf::from("."),
            threads: 1,
            max_connections: 1000,
            read_timeout_secs: 30,
            symlinks: SymlinkPolicy::Contained,
            mime_overrides: Vec::new(),
            log_file: None,
            log_timezone: Tz::UTC,
        }
    }
}

fn parse_mime_override(s: &str) -> Result<(String, String), String> {
    let (ext, mime) = s
        .split_once('=')
        .ok_or_else(|| format!("expected EXT=TYPE, got `{}`", s))?;

    let ext = ext.trim();
    let mime = mime.trim();
    if ext.is_empty() || mime.is_empty() {
        return Err(format!("empty extension or type in `{}`", s));
    }

    let ext = if ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{}", ext)
    };

    Ok((ext, mime.to_string()))
}

fn parse_timezone(s: &str) -> Result<Tz, String> {
    s.parse::<Tz>().map_err(|e| e.to_string())
}
