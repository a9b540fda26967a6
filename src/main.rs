use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use o2paris::config::Config;
use o2paris::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "o2paris=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env();
    print_banner(&config);

    let db = o2paris::db::create_pool(&config.database_url)
        .await
        .expect("failed to create database pool");

    match o2paris::db::config::ensure_default_config(&db).await {
        Ok(true) => tracing::info!("inserted default map config"),
        Ok(false) => {}
        Err(e) => tracing::warn!("failed to ensure default map config: {:?}", e),
    }

    match o2paris::db::auth::purge_expired_tokens(&db).await {
        Ok(0) => {}
        Ok(n) => tracing::info!("purged {n} expired admin session(s)"),
        Err(e) => tracing::warn!("failed to purge admin sessions: {:?}", e),
    }

    let state = AppState {
        db,
        admin_password_hash: config.admin_password_hash.as_deref().map(Arc::from),
        trust_forwarded_for: config.trust_forwarded_for,
        rate_limits: Arc::new(DashMap::new()),
    };

    let app = o2paris::routes::router(state);

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .expect("failed to bind");

    let actual_port = listener
        .local_addr()
        .expect("failed to get local address")
        .port();
    eprintln!("  \x1b[32m→ listening on 0.0.0.0:{actual_port}\x1b[0m");
    eprintln!();

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("server error");
}

fn print_banner(config: &Config) {
    let version = env!("CARGO_PKG_VERSION");
    let admin = if config.admin_password_hash.is_some() {
        "enabled"
    } else {
        "disabled"
    };

    eprintln!();
    eprintln!("  \x1b[1;36mo2paris\x1b[0m \x1b[2mv{version}\x1b[0m");
    eprintln!();
    eprintln!("  \x1b[2mport\x1b[0m         {}", config.port);
    eprintln!("  \x1b[2mdatabase\x1b[0m     {}", config.database_url);
    eprintln!("  \x1b[2madmin\x1b[0m        {admin}");
    if config.trust_forwarded_for {
        eprintln!("  \x1b[2mproxy\x1b[0m        trusting X-Forwarded-For");
    }

    if config.admin_password_hash.is_none() {
        eprintln!();
        eprintln!("  \x1b[33m! set O2PARIS_ADMIN_PASSWORD to enable editing\x1b[0m");
    }

    eprintln!();
}
