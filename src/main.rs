mod model;
mod projector;
mod server;
mod source;
mod status;

use crate::server::ServerConfig;
use crate::source::KubeSource;
use kube::Client;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let client = Client::try_default().await?;
    let source = KubeSource::new(client);

    let config = ServerConfig::from_env();

    info!(
        "Binding to {}, serving cluster {}",
        config.bind_addr, config.cluster_name
    );

    server::run(config, source).await
}
