use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "7700".to_string());
    let addr = format!("127.0.0.1:{port}");
    let app = match std::env::var("MEILI_MASTER_KEY") {
        Ok(key) if !key.is_empty() => mock_server::app_with_master_key(&key),
        _ => mock_server::app(),
    };

    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "mock MeiliSearch listening");
    mock_server::run(listener, app).await
}
