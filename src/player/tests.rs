use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::broadcast::Receiver;
use tokio::time::Instant;

use super::*;

const PRIMARY: &str = "/api/sounds?id=7";
const FALLBACK: &str = "https://cdn.example.com/fallback.ogg";

#[derive(Clone)]
enum Behaviour {
    Ok(Duration),
    Fail(Duration),
    Hang,
}

#[derive(Default)]
struct ScriptedLoader {
    script: HashMap<String, Behaviour>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedLoader {
    fn with(mut self, url: &str, behaviour: Behaviour) -> Self {
        self.script.insert(url.to_string(), behaviour);
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl MediaLoader for ScriptedLoader {
    fn load(&self, url: &str) -> impl Future<Output = Result<Clip, MediaError>> + Send {
        self.calls.lock().unwrap().push(url.to_string());
        let behaviour = self.script.get(url).cloned();
        let url = url.to_string();
        async move {
            match behaviour {
                Some(Behaviour::Ok(delay)) => {
                    tokio::time::sleep(delay).await;
                    Ok(Clip {
                        origin: url,
                        mime_type: Some("audio/wav".to_string()),
                        bytes: Vec::new(),
                        duration: None,
                        local_path: None,
                    })
                }
                Some(Behaviour::Fail(delay)) => {
                    tokio::time::sleep(delay).await;
                    Err(MediaError::HttpStatus { url, status: 500 })
                }
                Some(Behaviour::Hang) => std::future::pending().await,
                None => Err(MediaError::NotFound { url }),
            }
        }
    }
}

#[derive(Default)]
struct RecordingOutput {
    started: Mutex<Vec<String>>,
    stops: AtomicUsize,
    broken: bool,
}

impl RecordingOutput {
    fn broken() -> Self {
        Self {
            broken: true,
            ..Default::default()
        }
    }

    fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }
}

impl AudioOutput for RecordingOutput {
    fn start(&self, clip: &Clip) -> Result<(), MediaError> {
        if self.broken {
            return Err(MediaError::OutputUnavailable("no audio device".to_string()));
        }
        self.started.lock().unwrap().push(clip.origin.clone());
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

fn config() -> PlayerConfig {
    PlayerConfig {
        fallback_url: FALLBACK.to_string(),
        attempt_timeout: Duration::from_secs(5),
        beep: BeepConfig::default(),
    }
}

fn target(id: i64, sound_ref: &str) -> PlaybackTarget {
    PlaybackTarget {
        pinpoint_id: Some(id),
        label: format!("pinpoint {id}"),
        sound_ref: sound_ref.to_string(),
    }
}

fn player(
    loader: ScriptedLoader,
    output: RecordingOutput,
) -> (
    AudioPlayer<Arc<ScriptedLoader>, Arc<RecordingOutput>>,
    Arc<ScriptedLoader>,
    Arc<RecordingOutput>,
) {
    let loader = Arc::new(loader);
    let output = Arc::new(output);
    let player = AudioPlayer::new(Arc::clone(&loader), Arc::clone(&output), config());
    (player, loader, output)
}

fn drain(events: &mut Receiver<StatusEvent>, chain: u64) -> Vec<PlayerStatus> {
    let mut statuses = Vec::new();
    loop {
        match events.try_recv() {
            Ok(event) if event.chain == chain => statuses.push(event.status),
            Ok(_) => {}
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return statuses,
            Err(TryRecvError::Lagged(n)) => panic!("lagged by {n} events"),
        }
    }
}

#[tokio::test]
async fn test_starts_idle() {
    let (player, _, _) = player(ScriptedLoader::default(), RecordingOutput::default());
    assert_eq!(player.status(), PlayerStatus::Idle);
    assert_eq!(player.current_chain(), 0);
}

#[tokio::test]
async fn test_reachable_primary_plays_without_fallback() {
    let loader = ScriptedLoader::default().with(PRIMARY, Behaviour::Ok(Duration::ZERO));
    let (player, loader, output) = player(loader, RecordingOutput::default());
    let mut events = player.subscribe();

    let chain = player.play(target(1, PRIMARY));
    let outcome = player.wait_for_outcome(chain).await;

    assert_eq!(outcome, Some(PlayerStatus::Playing(Tier::Primary)));
    assert_eq!(
        drain(&mut events, chain),
        [
            PlayerStatus::Attempting(Tier::Primary),
            PlayerStatus::Playing(Tier::Primary)
        ]
    );
    assert_eq!(loader.calls(), [PRIMARY]);
    assert_eq!(output.started(), [PRIMARY]);
}

#[tokio::test]
async fn test_unreachable_primary_uses_fallback() {
    let loader = ScriptedLoader::default()
        .with(PRIMARY, Behaviour::Fail(Duration::from_millis(5)))
        .with(FALLBACK, Behaviour::Ok(Duration::ZERO));
    let (player, loader, output) = player(loader, RecordingOutput::default());
    let mut events = player.subscribe();

    let chain = player.play(target(1, PRIMARY));
    let outcome = player.wait_for_outcome(chain).await;

    assert_eq!(outcome, Some(PlayerStatus::Playing(Tier::Fallback)));
    assert_eq!(
        drain(&mut events, chain),
        [
            PlayerStatus::Attempting(Tier::Primary),
            PlayerStatus::Attempting(Tier::Fallback),
            PlayerStatus::Playing(Tier::Fallback)
        ]
    );
    assert_eq!(loader.calls(), [PRIMARY, FALLBACK]);
    assert_eq!(output.started(), [FALLBACK]);
}

#[tokio::test]
async fn test_both_unreachable_falls_back_to_beep() {
    // Primary is unknown to the loader (404), fallback errors.
    let loader = ScriptedLoader::default().with(FALLBACK, Behaviour::Fail(Duration::ZERO));
    let (player, _, output) = player(loader, RecordingOutput::default());
    let mut events = player.subscribe();

    let chain = player.play(target(1, PRIMARY));
    let outcome = player.wait_for_outcome(chain).await;

    assert_eq!(outcome, Some(PlayerStatus::Playing(Tier::Beep)));
    assert_eq!(
        drain(&mut events, chain),
        [
            PlayerStatus::Attempting(Tier::Primary),
            PlayerStatus::Attempting(Tier::Fallback),
            PlayerStatus::Attempting(Tier::Beep),
            PlayerStatus::Playing(Tier::Beep)
        ]
    );
    assert_eq!(output.started(), [beep::BEEP_ORIGIN]);
}

#[tokio::test]
async fn test_unavailable_output_ends_failed() {
    let loader = ScriptedLoader::default().with(PRIMARY, Behaviour::Ok(Duration::ZERO));
    let (player, _, _) = player(loader, RecordingOutput::broken());
    let mut events = player.subscribe();

    let chain = player.play(target(3, PRIMARY));
    let outcome = player.wait_for_outcome(chain).await.unwrap();

    match &outcome {
        PlayerStatus::Failed { message } => {
            assert!(message.contains("pinpoint 3"), "{message}");
            assert!(message.contains("no audio device"), "{message}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    let statuses = drain(&mut events, chain);
    assert_eq!(statuses.len(), 4);
    assert_eq!(statuses[2], PlayerStatus::Attempting(Tier::Beep));
    assert_eq!(player.status(), outcome);
}

#[tokio::test]
async fn test_failed_synthesis_ends_failed() {
    let loader = Arc::new(ScriptedLoader::default());
    let output = Arc::new(RecordingOutput::default());
    let config = PlayerConfig {
        beep: BeepConfig {
            frequency_hz: 0.0,
            ..BeepConfig::default()
        },
        ..config()
    };
    let player = AudioPlayer::new(loader, Arc::clone(&output), config);

    let chain = player.play(target(1, PRIMARY));
    let outcome = player.wait_for_outcome(chain).await;

    assert!(matches!(outcome, Some(PlayerStatus::Failed { .. })));
    assert!(output.started().is_empty());
}

#[tokio::test]
async fn test_retry_after_failure_restarts_from_primary() {
    let (player, loader, _) = player(ScriptedLoader::default(), RecordingOutput::broken());

    let first = player.play(target(1, PRIMARY));
    assert!(matches!(
        player.wait_for_outcome(first).await,
        Some(PlayerStatus::Failed { .. })
    ));

    let mut events = player.subscribe();
    let second = player.play(target(1, PRIMARY));
    player.wait_for_outcome(second).await;

    assert_eq!(
        drain(&mut events, second).first(),
        Some(&PlayerStatus::Attempting(Tier::Primary))
    );
    assert_eq!(loader.calls(), [PRIMARY, FALLBACK, PRIMARY, FALLBACK]);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_tiers_time_out_to_beep() {
    let loader = ScriptedLoader::default()
        .with(PRIMARY, Behaviour::Hang)
        .with(FALLBACK, Behaviour::Hang);
    let (player, _, output) = player(loader, RecordingOutput::default());
    let started = Instant::now();

    let chain = player.play(target(1, PRIMARY));
    let outcome = player.wait_for_outcome(chain).await;

    assert_eq!(outcome, Some(PlayerStatus::Playing(Tier::Beep)));
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(10), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(11), "{elapsed:?}");
    assert_eq!(output.started(), [beep::BEEP_ORIGIN]);
}

#[tokio::test(start_paused = true)]
async fn test_slow_primary_counts_as_failure() {
    let loader = ScriptedLoader::default()
        .with(PRIMARY, Behaviour::Ok(Duration::from_secs(6)))
        .with(FALLBACK, Behaviour::Ok(Duration::from_millis(100)));
    let (player, _, output) = player(loader, RecordingOutput::default());

    let chain = player.play(target(1, PRIMARY));
    let outcome = player.wait_for_outcome(chain).await;

    assert_eq!(outcome, Some(PlayerStatus::Playing(Tier::Fallback)));
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(output.started(), [FALLBACK]);
}

#[tokio::test(start_paused = true)]
async fn test_new_request_supersedes_in_flight_chain() {
    let p1 = "https://cdn.example.com/slow.mp3";
    let p2 = "/api/sounds?id=2";
    let loader = ScriptedLoader::default()
        .with(p1, Behaviour::Ok(Duration::from_secs(3)))
        .with(p2, Behaviour::Ok(Duration::from_millis(10)));
    let (player, loader, output) = player(loader, RecordingOutput::default());
    let mut events = player.subscribe();

    let first = player.play(target(1, p1));
    // Let the first chain reach its pending network attempt.
    tokio::task::yield_now().await;
    assert_eq!(loader.calls(), [p1]);

    let second = player.play(target(2, p2));
    assert_eq!(player.wait_for_outcome(first).await, None);
    assert_eq!(
        player.wait_for_outcome(second).await,
        Some(PlayerStatus::Playing(Tier::Primary))
    );

    // Well past the point where the first sound would have loaded.
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(player.status(), PlayerStatus::Playing(Tier::Primary));
    assert_eq!(player.current_chain(), second);
    assert_eq!(output.started(), [p2]);
    assert_eq!(
        drain(&mut events, first),
        [PlayerStatus::Attempting(Tier::Primary)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_supersede_during_fallback_discards_old_chain() {
    let p1 = "https://cdn.example.com/broken.mp3";
    let p2 = "/api/sounds?id=2";
    let loader = ScriptedLoader::default()
        .with(p1, Behaviour::Fail(Duration::ZERO))
        .with(FALLBACK, Behaviour::Ok(Duration::from_secs(2)))
        .with(p2, Behaviour::Ok(Duration::from_secs(1)));
    let (player, _, output) = player(loader, RecordingOutput::default());
    let mut events = player.subscribe();

    let first = player.play(target(1, p1));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(player.status(), PlayerStatus::Attempting(Tier::Fallback));

    let second = player.play(target(2, p2));
    let outcome = player.wait_for_outcome(second).await;
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(outcome, Some(PlayerStatus::Playing(Tier::Primary)));
    assert_eq!(output.started(), [p2]);
    assert_eq!(
        drain(&mut events, first),
        [
            PlayerStatus::Attempting(Tier::Primary),
            PlayerStatus::Attempting(Tier::Fallback)
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancel_returns_to_idle_and_ignores_late_result() {
    let loader = ScriptedLoader::default().with(PRIMARY, Behaviour::Ok(Duration::from_secs(1)));
    let (player, _, output) = player(loader, RecordingOutput::default());

    let chain = player.play(target(1, PRIMARY));
    tokio::task::yield_now().await;
    player.cancel();

    assert_eq!(player.wait_for_outcome(chain).await, None);
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(player.status(), PlayerStatus::Idle);
    assert!(output.started().is_empty());
    assert!(output.stops.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn test_play_stops_previous_playback() {
    let loader = ScriptedLoader::default().with(PRIMARY, Behaviour::Ok(Duration::ZERO));
    let (player, _, output) = player(loader, RecordingOutput::default());

    let first = player.play(target(1, PRIMARY));
    player.wait_for_outcome(first).await;
    let stops_before = output.stops.load(Ordering::SeqCst);

    let second = player.play(target(1, PRIMARY));
    player.wait_for_outcome(second).await;

    assert_eq!(output.stops.load(Ordering::SeqCst), stops_before + 1);
    assert_eq!(output.started(), [PRIMARY, PRIMARY]);
}

#[tokio::test]
async fn test_fallback_identical_to_primary_is_skipped() {
    let (player, loader, _) = player(ScriptedLoader::default(), RecordingOutput::default());
    let mut events = player.subscribe();

    let chain = player.play(target(1, FALLBACK));
    let outcome = player.wait_for_outcome(chain).await;

    assert_eq!(outcome, Some(PlayerStatus::Playing(Tier::Beep)));
    assert_eq!(loader.calls(), [FALLBACK]);
    assert!(!drain(&mut events, chain).contains(&PlayerStatus::Attempting(Tier::Fallback)));
}

#[tokio::test(start_paused = true)]
async fn test_players_are_independent() {
    let slow = "https://cdn.example.com/slow.mp3";
    let fast = "https://cdn.example.com/fast.mp3";
    let loader = Arc::new(
        ScriptedLoader::default()
            .with(slow, Behaviour::Ok(Duration::from_secs(2)))
            .with(fast, Behaviour::Ok(Duration::from_millis(10))),
    );
    let first_output = Arc::new(RecordingOutput::default());
    let second_output = Arc::new(RecordingOutput::default());
    let a = AudioPlayer::new(Arc::clone(&loader), Arc::clone(&first_output), config());
    let b = AudioPlayer::new(Arc::clone(&loader), Arc::clone(&second_output), config());

    let chain_a = a.play(target(1, slow));
    let chain_b = b.play(target(2, fast));

    assert_eq!(
        b.wait_for_outcome(chain_b).await,
        Some(PlayerStatus::Playing(Tier::Primary))
    );
    assert_eq!(a.status(), PlayerStatus::Attempting(Tier::Primary));
    assert_eq!(
        a.wait_for_outcome(chain_a).await,
        Some(PlayerStatus::Playing(Tier::Primary))
    );
    assert_eq!(first_output.started(), [slow]);
    assert_eq!(second_output.started(), [fast]);
}

#[tokio::test]
async fn test_play_accepts_pinpoint() {
    let loader = ScriptedLoader::default().with("/sounds?id=7", Behaviour::Ok(Duration::ZERO));
    let (player, _, _) = player(loader, RecordingOutput::default());
    let pinpoint = Pinpoint {
        id: 9,
        latitude: 48.85,
        longitude: 2.35,
        title: "Fountain".to_string(),
        description: String::new(),
        sound_url: "/sounds?id=7".to_string(),
        icon: "💧".to_string(),
        created_at: "2025-01-01 00:00:00".to_string(),
        updated_at: "2025-01-01 00:00:00".to_string(),
    };
    let mut events = player.subscribe();

    let chain = player.play(&pinpoint);
    player.wait_for_outcome(chain).await;

    let event = events.recv().await.unwrap();
    assert_eq!(event.pinpoint_id, Some(9));
    assert_eq!(player.status(), PlayerStatus::Playing(Tier::Primary));
}
