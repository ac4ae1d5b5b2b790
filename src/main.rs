use mealsnap::{app, config::AppConfig, state::AppState};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "mealsnap=debug,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    // the local UTC offset is only readable while the process is single-threaded
    let config = AppConfig::from_env()?;
    tracing::info!(
        backend = ?config.storage.backend,
        delay_ms = config.classifier.delay.as_millis() as u64,
        utc_offset = %config.utc_offset,
        "configuration loaded"
    );

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(config))
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    let (host, port) = (config.host.clone(), config.port);

    let state = AppState::init(config).await?;
    let session = state.session.clone();
    let router = app::build_app(state);

    app::serve(router, &host, port).await?;
    session.shutdown();
    Ok(())
}
