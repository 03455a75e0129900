use clap::Parser;
use devserve::logger;
use devserve::server::HttpServer;
use devserve::server::config::ServerConfig;
use log::info;

fn main() -> std::io::Result<()> {
    let config = ServerConfig::parse();
    logger::init(config.log_file.as_deref(), config.log_timezone)?;

    info!("Starting static HTTP server with config: {:?}", config);

    let server = HttpServer::new(&config)?;
    server.run();

    Ok(())
}
