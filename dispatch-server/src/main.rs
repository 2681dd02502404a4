use dispatch_server::{Config, Server, ServerState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    dispatch_server::init_logger_with_file(Some(&config.log_level), Some(&config.work_dir));

    tracing::info!(
        environment = %config.environment,
        port = config.http_port,
        "Dispatch server starting"
    );

    let state = ServerState::initialize(&config)?;
    let server = Server::with_state(config, state);

    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
