use talent_api::database::{manager, schema};
use talent_api::routes::{app, AppState};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    // Initialize configuration (this loads the config singleton)
    let config = talent_api::config::config();

    tracing_subscriber::fmt::init();
    tracing::info!("Starting Talent API in {:?} mode", config.environment);

    let pool = manager::connect_from_env()
        .await
        .unwrap_or_else(|e| panic!("failed to open database: {}", e));
    schema::ensure_schema(&pool)
        .await
        .unwrap_or_else(|e| panic!("failed to bootstrap schema: {}", e));

    let app = app(AppState::new(pool));

    // Allow tests or deployments to override port via env
    let port = std::env::var("TALENT_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    println!("🚀 Talent API server listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}
