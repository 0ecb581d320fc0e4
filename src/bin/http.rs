#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::net::SocketAddr;

    use cleaning_schedule::{SchedulerConfig, http_api, logging};
    use tracing::info;

    logging::init_tracing();
    let config = SchedulerConfig::from_env()?;

    let addr: SocketAddr = config.http_addr.parse()?;
    let planner = config.planner()?;

    info!(%addr, database = ?config.database_path, "cleaning-schedule HTTP API listening");
    http_api::serve(addr, planner).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
