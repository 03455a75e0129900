pub mod config;
pub mod connection_handler;
pub mod dir_listing;
pub mod error;
pub mod http_status;
pub mod mime;
pub mod path_resolver;
pub mod request_handler;
pub mod request_parser;
pub mod response;

use log::{debug, error, info, warn};
use socket2::{Domain, Protocol, Socket, Type};
use std::any::Any;
use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use threadpool::ThreadPool;

use config::ServerConfig;
use connection_handler::handle_connection;
use request_handler::RequestHandler;

const LISTEN_BACKLOG: i32 = 128;
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

pub struct HttpServer {
    config: ServerConfig,
    listener: TcpListener,
    handler: Arc<RequestHandler>,
    thread_pool: ThreadPool,
}

impl HttpServer {
    pub fn new(config: &ServerConfig) -> io::Result<Self> {
        let handler = Arc::new(RequestHandler::from_config(config)?);
        let listener = bind_listener(&config.host, config.port)?;

        info!(
            "Server started on {}, document root {:?}",
            listener.local_addr()?,
            handler.root()
        );

        let thread_pool = ThreadPool::with_name("devserve-worker".to_string(), config.threads.max(1));

        Ok(Self {
            config: config.clone(),
            listener,
            handler,
            thread_pool,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until the process is killed.
    pub fn run(&self) {
        match self.local_addr() {
            Ok(addr) => println!("serving at port {}", addr.port()),
            Err(_) => println!("serving at port {}", self.config.port),
        }
        info!("Server running with {} threads", self.thread_pool.max_count());

        let timeout = self.config.read_timeout();
        for stream in self.listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    // EMFILE and friends persist until a worker frees a descriptor.
                    error!("Error accepting connection: {}", e);
                    thread::sleep(ACCEPT_ERROR_BACKOFF);
                    continue;
                }
            };

            let peer_addr = match stream.peer_addr() {
                Ok(addr) => addr.to_string(),
                Err(_) => "unknown".to_string(),
            };

            if !self.has_capacity() {
                warn!(
                    "Maximum connections reached, rejecting connection from {}",
                    peer_addr
                );
                continue;
            }
            debug!("New connection from {}", peer_addr);

            let handler = Arc::clone(&self.handler);
            self.thread_pool.execute(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(move || {
                    handle_connection(stream, &handler, timeout)
                }));
                if let Err(payload) = result {
                    error!(
                        "Panic while serving {}: {}",
                        peer_addr,
                        panic_message(payload.as_ref())
                    );
                }
            });
        }
    }

    fn has_capacity(&self) -> bool {
        let in_flight = self.thread_pool.active_count() + self.thread_pool.queued_count();
        in_flight < self.config.max_connections.max(1)
    }
}

fn bind_listener(host: &str, port: u16) -> io::Result<TcpListener> {
    let addr = (host, port).to_socket_addrs()?.next().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("{}:{} did not resolve", host, port),
        )
    })?;

    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;
    Ok(socket.into())
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
