//! Headless map client: fetches pinpoints from a running server and plays
//! each one through its own player, printing every status change.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::broadcast::error::RecvError;

use o2paris::client::MapClient;
use o2paris::models::pinpoint::Pinpoint;
use o2paris::player::{
    AudioOutput, AudioPlayer, FileOutput, HttpLoader, NullOutput, PlayerConfig, PlayerStatus,
    DEFAULT_FALLBACK_URL,
};

#[derive(Debug, Parser)]
#[command(name = "o2paris-play", about = "Play pinpoint sounds from an o2paris server", version)]
struct Args {
    /// Base URL of the server.
    #[arg(long, env = "O2PARIS_SERVER", default_value = "http://localhost:3000")]
    server: String,

    /// Pinpoint to play. Repeat for several; all pinpoints when omitted.
    #[arg(long = "pinpoint", value_name = "ID")]
    pinpoints: Vec<i64>,

    /// Sound tried when a pinpoint's own sound cannot play.
    #[arg(long, env = "O2PARIS_FALLBACK_URL", default_value = DEFAULT_FALLBACK_URL)]
    fallback_url: String,

    /// Time each network tier gets to become playable.
    #[arg(long, env = "O2PARIS_ATTEMPT_TIMEOUT_MS", default_value_t = 5000)]
    timeout_ms: u64,

    /// Write started clips here, one subdirectory per pinpoint. Without it
    /// clips are only checked, not kept.
    #[arg(long, env = "O2PARIS_OUT_DIR")]
    out_dir: Option<PathBuf>,
}

fn select(pinpoints: Vec<Pinpoint>, ids: &[i64]) -> (Vec<Pinpoint>, Vec<i64>) {
    if ids.is_empty() {
        return (pinpoints, Vec::new());
    }
    let missing = ids
        .iter()
        .copied()
        .filter(|id| !pinpoints.iter().any(|p| p.id == *id))
        .collect();
    let selected = pinpoints
        .into_iter()
        .filter(|p| ids.contains(&p.id))
        .collect();
    (selected, missing)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "o2paris=warn".into()),
        )
        .init();

    let args = Args::parse();

    let client = match MapClient::new(&args.server) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let pinpoints = match client.list_pinpoints().await {
        Ok(pinpoints) => pinpoints,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let (selected, missing) = select(pinpoints, &args.pinpoints);
    for id in &missing {
        eprintln!("warning: no pinpoint with id {id}");
    }
    if selected.is_empty() {
        eprintln!("error: nothing to play");
        return ExitCode::FAILURE;
    }

    let loader = Arc::new(HttpLoader::new(Some(client.base_url().clone())));
    let config = PlayerConfig {
        fallback_url: args.fallback_url,
        attempt_timeout: Duration::from_millis(args.timeout_ms),
        ..PlayerConfig::default()
    };

    let mut outcomes = Vec::with_capacity(selected.len());
    for pinpoint in &selected {
        let output: Arc<dyn AudioOutput> = match &args.out_dir {
            Some(dir) => Arc::new(FileOutput::new(dir.join(pinpoint.id.to_string()))),
            None => Arc::new(NullOutput),
        };
        let player = AudioPlayer::new(Arc::clone(&loader), output, config.clone());
        let mut events = player.subscribe();
        let chain = player.play(pinpoint);
        let label = format!("{} #{} {}", pinpoint.icon, pinpoint.id, pinpoint.title);

        outcomes.push(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) if event.chain == chain => {
                        println!("{label}: {}", event.status);
                        if event.status.is_terminal() {
                            return event.status;
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(_)) => {
                        if let Some(status) = player.wait_for_outcome(chain).await {
                            println!("{label}: {status}");
                            return status;
                        }
                        return player.status();
                    }
                    Err(RecvError::Closed) => return player.status(),
                }
            }
        }));
    }

    let mut failed = 0;
    for outcome in outcomes {
        match outcome.await {
            Ok(PlayerStatus::Failed { .. }) | Err(_) => failed += 1,
            Ok(_) => {}
        }
    }

    if failed > 0 {
        eprintln!("{failed} of {} pinpoint(s) could not be played", selected.len());
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
