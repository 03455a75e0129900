use log::{debug, info, warn};
use std::io::BufReader;
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use super::error::ServeError;
use super::request_handler::{RequestHandler, error_response};
use super::request_parser::read_request;

/// Serves exactly one request on `stream`, then closes it.
pub fn handle_connection(stream: TcpStream, handler: &RequestHandler, timeout: Option<Duration>) {
    let peer_addr = match stream.peer_addr() {
        Ok(addr) => addr.to_string(),
        Err(_) => "unknown".to_string(),
    };

    debug!(
        "[Thread {:?}] Handling connection from {}",
        std::thread::current().id(),
        peer_addr
    );

    if let Err(e) = stream
        .set_read_timeout(timeout)
        .and_then(|_| stream.set_write_timeout(timeout))
    {
        warn!("Failed to set timeouts for {}: {}", peer_addr, e);
    }

    let mut reader = BufReader::new(&stream);
    let (request_line, head_only, response) = match read_request(&mut reader) {
        Ok(Some(request)) => {
            let response = handler.handle(&request);
            (request.request_line(), request.is_head(), response)
        }
        Ok(None) => {
            debug!("Connection closed by client {} before a request", peer_addr);
            return;
        }
        Err(ServeError::Timeout) => {
            debug!("Timed out waiting for request from {}", peer_addr);
            ("-".to_string(), false, error_response(&ServeError::Timeout))
        }
        Err(err) => {
            warn!("Bad request from {}: {}", peer_addr, err);
            ("-".to_string(), false, error_response(&err))
        }
    };

    let status = response.status;
    match response.write_to(&stream, head_only) {
        Ok(sent) => info!(
            "{} \"{}\" {} {}",
            peer_addr,
            request_line,
            status.code(),
            sent
        ),
        Err(e) => warn!(
            "Error sending {} response to {}: {}",
            status.code(),
            peer_addr,
            e
        ),
    }

    if let Err(e) = stream.shutdown(Shutdown::Write) {
        debug!("Shutdown of {} failed: {}", peer_addr, e);
    }
}
