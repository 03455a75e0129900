//! End-to-end tests: a real server on an ephemeral port, raw HTTP over TCP.

use devserve::server::HttpServer;
use devserve::server::config::{ServerConfig, SymlinkPolicy};
use std::fs;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::Path;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

struct Reply {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Reply {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

fn start(root: &Path, configure: impl FnOnce(&mut ServerConfig)) -> SocketAddr {
    let mut config = ServerConfig {
        port: 0,
        document_root: root.to_path_buf(),
        read_timeout_secs: 5,
        ..ServerConfig::default()
    };
    configure(&mut config);

    let server = HttpServer::new(&config).expect("server should bind");
    let addr = server.local_addr().unwrap();
    thread::spawn(move || server.run());
    addr
}

fn send_raw(addr: SocketAddr, raw: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).expect("connect");
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    stream.write_all(raw).unwrap();
    stream.flush().unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).unwrap();
    response
}

fn parse_reply(raw: &[u8]) -> Reply {
    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response head terminator");
    let head = String::from_utf8(raw[..split].to_vec()).unwrap();
    let body = raw[split + 4..].to_vec();

    let mut lines = head.split("\r\n");
    let status_line = lines.next().unwrap();
    let status = status_line
        .split_whitespace()
        .nth(1)
        .unwrap()
        .parse()
        .unwrap();

    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    Reply {
        status,
        headers,
        body,
    }
}

fn request(addr: SocketAddr, method: &str, path: &str) -> Reply {
    let raw = format!("{} {} HTTP/1.0\r\nHost: localhost\r\n\r\n", method, path);
    parse_reply(&send_raw(addr, raw.as_bytes()))
}

fn get(addr: SocketAddr, path: &str) -> Reply {
    request(addr, "GET", path)
}

fn site() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::write(root.join("hello.txt"), b"hello world\n").unwrap();
    fs::write(root.join("script.wasm"), b"\0asm\x01\0\0\0").unwrap();
    fs::write(root.join("module.mjs"), b"export const x = 1;\n").unwrap();
    fs::create_dir(root.join("app")).unwrap();
    fs::write(root.join("app/index.html"), b"<!doctype html><p>app</p>").unwrap();
    fs::create_dir(root.join("assets")).unwrap();
    fs::write(root.join("assets/logo.svg"), b"<svg/>").unwrap();
    fs::write(root.join("assets/data.bin"), b"\x00\x01").unwrap();

    let blob: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    fs::write(root.join("blob.bin"), blob).unwrap();
    dir
}

#[test]
fn get_returns_file_bytes_and_length() {
    let dir = site();
    let addr = start(dir.path(), |_| {});

    for name in ["hello.txt", "blob.bin", "assets/logo.svg"] {
        let expected = fs::read(dir.path().join(name)).unwrap();
        let reply = get(addr, &format!("/{}", name));

        assert_eq!(reply.status, 200, "{}", name);
        assert_eq!(reply.body, expected, "{}", name);
        assert_eq!(
            reply.header("Content-Length"),
            Some(expected.len().to_string().as_str())
        );
        assert!(reply.header("Last-Modified").unwrap().ends_with("GMT"));
        assert_eq!(reply.header("Connection"), Some("close"));
    }
}

#[test]
fn traversal_never_leaks_outside_root() {
    let outer = TempDir::new().unwrap();
    let root = outer.path().join("www");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("index.html"), b"inside").unwrap();
    fs::write(outer.path().join("secret.txt"), b"TOP SECRET").unwrap();

    let addr = start(&root, |_| {});

    for target in [
        "/../secret.txt",
        "/../../etc/passwd",
        "/%2e%2e/secret.txt",
        "/..%2fsecret.txt",
        "/./../secret.txt",
        "//../secret.txt",
    ] {
        let reply = get(addr, target);
        assert!(
            reply.status == 403 || reply.status == 404,
            "{} answered {}",
            target,
            reply.status
        );
        assert!(!String::from_utf8_lossy(&reply.body).contains("TOP SECRET"));
    }
}

#[test]
fn wasm_and_mjs_content_types() {
    let dir = site();
    let addr = start(dir.path(), |_| {});

    assert_eq!(
        get(addr, "/script.wasm").header("Content-Type"),
        Some("application/wasm")
    );
    assert_eq!(
        get(addr, "/module.mjs").header("Content-Type"),
        Some("application/javascript")
    );
    assert_eq!(
        get(addr, "/assets/data.bin").header("Content-Type"),
        Some("application/octet-stream")
    );
}

#[test]
fn extra_mime_override_from_config() {
    let dir = site();
    let addr = start(dir.path(), |config| {
        config
            .mime_overrides
            .push((".bin".to_string(), "application/x-blob".to_string()));
    });

    assert_eq!(
        get(addr, "/blob.bin").header("Content-Type"),
        Some("application/x-blob")
    );
}

#[test]
fn missing_file_then_server_still_serves() {
    let dir = site();
    let addr = start(dir.path(), |_| {});

    let missing = get(addr, "/does-not-exist.xyz");
    assert_eq!(missing.status, 404);
    assert!(String::from_utf8_lossy(&missing.body).contains("Error code: 404"));

    let ok = get(addr, "/hello.txt");
    assert_eq!(ok.status, 200);
    assert_eq!(ok.body, b"hello world\n");
}

#[test]
fn repeated_requests_are_identical() {
    let dir = site();
    let addr = start(dir.path(), |_| {});

    let first = get(addr, "/blob.bin");
    let second = get(addr, "/blob.bin");
    assert_eq!(first.status, 200);
    assert_eq!(first.body, second.body);
}

#[test]
fn head_sends_headers_only() {
    let dir = site();
    let addr = start(dir.path(), |_| {});

    let reply = request(addr, "HEAD", "/hello.txt");
    assert_eq!(reply.status, 200);
    assert_eq!(reply.header("Content-Length"), Some("12"));
    assert_eq!(reply.header("Content-Type"), Some("text/plain"));
    assert!(reply.body.is_empty());
}

#[test]
fn directories_redirect_index_and_list() {
    let dir = site();
    let addr = start(dir.path(), |_| {});

    let redirect = get(addr, "/app?tab=1");
    assert_eq!(redirect.status, 301);
    assert_eq!(redirect.header("Location"), Some("/app/?tab=1"));

    let index = get(addr, "/app/");
    assert_eq!(index.status, 200);
    assert_eq!(index.body, b"<!doctype html><p>app</p>");
    assert_eq!(index.header("Content-Type"), Some("text/html"));

    let listing = get(addr, "/assets/");
    assert_eq!(listing.status, 200);
    let page = String::from_utf8(listing.body).unwrap();
    assert!(page.contains("Directory listing for /assets/"));
    assert!(page.contains("<a href=\"data.bin\">data.bin</a>"));
    assert!(page.contains("<a href=\"logo.svg\">logo.svg</a>"));
}

#[test]
fn unsupported_method_is_501() {
    let dir = site();
    let addr = start(dir.path(), |_| {});

    let reply = request(addr, "POST", "/hello.txt");
    assert_eq!(reply.status, 501);

    let options = request(addr, "OPTIONS", "/hello.txt");
    assert_eq!(options.status, 200);
    assert_eq!(options.header("Allow"), Some("GET, HEAD, OPTIONS"));
}

#[test]
fn malformed_request_gets_400_and_server_survives() {
    let dir = site();
    let addr = start(dir.path(), |_| {});

    let reply = parse_reply(&send_raw(addr, b"THIS IS NOT HTTP AT ALL\r\n\r\n"));
    assert_eq!(reply.status, 400);

    let reply = parse_reply(&send_raw(addr, b"GET / HTTP/3.0\r\n\r\n"));
    assert_eq!(reply.status, 505);

    // A client that connects and leaves without a word.
    drop(TcpStream::connect(addr).unwrap());

    assert_eq!(get(addr, "/hello.txt").status, 200);
}

#[test]
fn conditional_get_returns_304() {
    let dir = site();
    let addr = start(dir.path(), |_| {});

    let first = get(addr, "/hello.txt");
    let last_modified = first.header("Last-Modified").unwrap().to_string();

    let raw = format!(
        "GET /hello.txt HTTP/1.1\r\nHost: localhost\r\nIf-Modified-Since: {}\r\n\r\n",
        last_modified
    );
    let reply = parse_reply(&send_raw(addr, raw.as_bytes()));
    assert_eq!(reply.status, 304);
    assert!(reply.body.is_empty());
}

#[cfg(unix)]
#[test]
fn escaping_symlink_follows_configured_policy() {
    let outside = TempDir::new().unwrap();
    fs::write(outside.path().join("secret.txt"), b"outside").unwrap();

    let dir = site();
    std::os::unix::fs::symlink(outside.path(), dir.path().join("elsewhere")).unwrap();

    let contained = start(dir.path(), |_| {});
    assert_eq!(get(contained, "/elsewhere/secret.txt").status, 403);

    let follow = start(dir.path(), |config| config.symlinks = SymlinkPolicy::Follow);
    let reply = get(follow, "/elsewhere/secret.txt");
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, b"outside");
}

#[test]
fn worker_pool_serves_parallel_clients() {
    let dir = site();
    let addr = start(dir.path(), |config| config.threads = 4);
    let expected = fs::read(dir.path().join("blob.bin")).unwrap();

    let clients: Vec<_> = (0..8)
        .map(|_| thread::spawn(move || get(addr, "/blob.bin")))
        .collect();

    for client in clients {
        let reply = client.join().unwrap();
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body, expected);
    }
}

#[test]
fn directory_redirect_stays_on_host() {
    let dir = site();
    fs::create_dir(dir.path().join("evil.example")).unwrap();
    let addr = start(dir.path(), |_| {});

    for target in ["//evil.example", "///evil.example?x=1"] {
        let reply = get(addr, target);
        assert_eq!(reply.status, 301, "{}", target);
        let location = reply.header("Location").unwrap();
        assert!(location.starts_with("/evil.example/"), "{} -> {}", target, location);
        assert!(!location.starts_with("//"));
    }
}

#[test]
fn slow_client_gets_408_and_server_moves_on() {
    let dir = site();
    let addr = start(dir.path(), |config| config.read_timeout_secs = 1);

    let mut stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
    stream.write_all(b"GET /hello.txt HTTP/1.1\r\n").unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).unwrap();
    let reply = parse_reply(&raw);
    assert_eq!(reply.status, 408);

    let ok = get(addr, "/hello.txt");
    assert_eq!(ok.status, 200);
    assert_eq!(ok.body, b"hello world\n");
}

#[test]
fn connections_beyond_the_cap_are_dropped() {
    let dir = site();
    let addr = start(dir.path(), |config| {
        config.max_connections = 1;
        config.read_timeout_secs = 1;
    });

    // Holds the only worker until its read times out.
    let mut idle = TcpStream::connect(addr).unwrap();
    thread::sleep(Duration::from_millis(300));

    let mut rejected = TcpStream::connect(addr).unwrap();
    rejected.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    let _ = rejected.write_all(b"GET /hello.txt HTTP/1.0\r\n\r\n");
    let mut raw = Vec::new();
    let _ = rejected.read_to_end(&mut raw);
    assert!(raw.is_empty(), "over-cap connection got a reply");

    let mut timed_out = Vec::new();
    idle.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
    idle.read_to_end(&mut timed_out).unwrap();
    assert_eq!(parse_reply(&timed_out).status, 408);

    assert_eq!(get(addr, "/hello.txt").status, 200);
}
