use erp_gateway::modules::config::GatewayConfig;
use erp_gateway::modules::logger;
use erp_gateway::proxy::server::GatewayServer;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::from_env()?;
    logger::init_logger(&config.log_dir);

    info!(
        "Starting ERP gateway on {}:{}",
        config.bind_address, config.port
    );

    let (server, handle) = GatewayServer::start(config).await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping gateway");
    server.stop();
    handle.await?;

    Ok(())
}
