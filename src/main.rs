use notes_backend::{config::Config, create_routes, db, AppState};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info,sqlx=warn".into()),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = ?e, "server exited with error");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let pool = db::connect_to_db(&config).await?;
    db::run_migrations(&pool).await?;

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(pool, config)?;
    let app = create_routes(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
