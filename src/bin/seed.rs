//! Prepare a database: run migrations, insert the default map config and,
//! when the map is still empty, a handful of demo pinpoints.

use clap::Parser;

use o2paris::db;
use o2paris::models::pinpoint::CreatePinpoint;

#[derive(Debug, Parser)]
#[command(name = "o2paris-seed", about = "Seed an o2paris database", version)]
struct Args {
    /// Database connection URL.
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:o2paris.db?mode=rwc")]
    database_url: String,

    /// Only create the schema and default config.
    #[arg(long)]
    no_demo: bool,
}

const WATER_SOUND: &str = "https://actions.google.com/sounds/v1/water/stream_water.ogg";

fn demo_pinpoints() -> Vec<CreatePinpoint> {
    [
        ("Fontaine Saint-Michel", 48.853_2, 2.343_4, "Place Saint-Michel"),
        ("Fontaine des Innocents", 48.860_7, 2.348_4, "Oldest monumental fountain in Paris"),
        ("Fontaine Stravinsky", 48.859_3, 2.351_3, "Next to the Centre Pompidou"),
        ("Fontaine de Médicis", 48.848_9, 2.338_9, "Jardin du Luxembourg"),
    ]
    .into_iter()
    .map(|(title, latitude, longitude, description)| CreatePinpoint {
        latitude,
        longitude,
        title: title.to_string(),
        description: Some(description.to_string()),
        sound_url: WATER_SOUND.to_string(),
        icon: Some("⛲".to_string()),
    })
    .collect()
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "o2paris=info".into()),
        )
        .init();

    let args = Args::parse();
    let pool = db::create_pool(&args.database_url)
        .await
        .expect("failed to create database pool");

    let inserted = db::config::ensure_default_config(&pool)
        .await
        .expect("failed to write default map config");
    tracing::info!(inserted, "map config ready");

    if args.no_demo {
        return;
    }

    let existing = db::pinpoints::list_pinpoints(&pool)
        .await
        .expect("failed to list pinpoints");
    if !existing.is_empty() {
        tracing::info!(count = existing.len(), "pinpoints already present, skipping demo data");
        return;
    }

    for input in demo_pinpoints() {
        let pinpoint = db::pinpoints::create_pinpoint(&pool, &input)
            .await
            .expect("failed to insert demo pinpoint");
        tracing::info!(id = pinpoint.id, title = %pinpoint.title, "demo pinpoint added");
    }
}
