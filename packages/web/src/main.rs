use std::net::SocketAddr;
use std::sync::Arc;

use auth_api::{HttpSessionIssuer, Settings};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Arc::new(Settings::load()?);

    for provider in settings.providers() {
        info!(
            provider = %provider.name,
            enabled = provider.enabled,
            redirect_uri = provider.redirect_uri.as_ref().map(|uri| uri.as_str()).unwrap_or("-"),
            auth_url = provider.auth_url.as_ref().map(|url| url.as_str()).unwrap_or("-"),
            token_url = provider.token_url.as_ref().map(|url| url.as_str()).unwrap_or("-"),
            scopes = ?provider.scopes.iter().map(|scope| scope.as_str()).collect::<Vec<_>>(),
            "auth provider"
        );
    }
    info!(issuer = %settings.issuer_url, origins = ?settings.trusted_origins, "session issuer");

    let issuer = Arc::new(HttpSessionIssuer::from_settings(&settings));
    let app = auth_web::app(settings.clone(), issuer);

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
