use std::net::SocketAddr;

use gatekeeper::{app, db, docs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env();
    init_tracing();

    let pool = db::init().await?;
    let router = app::create_app(pool).await?;

    let port: u16 = match std::env::var("APP_PORT") {
        Ok(raw) => raw.parse().unwrap_or(8000),
        Err(_) => 8000,
    };
    let router = router.merge(docs::swagger_routes(docs::build_openapi(port)?));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "authorization resolver listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router.into_make_service()).await?;

    Ok(())
}

fn load_env() {
    // CWD first, then the crate directory (containers run elsewhere).
    if dotenvy::dotenv().is_err() {
        let fallback = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(fallback);
    }
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
