//! Sound playback with a fallback ladder.
//!
//! Each [`AudioPlayer`] owns at most one chain at a time. A chain tries the
//! pinpoint's own sound, then the configured fallback URL, then a locally
//! synthesized beep, and ends in `Playing(tier)` or `Failed`. Starting a new
//! chain (or calling [`AudioPlayer::cancel`]) supersedes the previous one: its
//! pending attempt is dropped and any result it still produces is discarded,
//! because every state change is committed under the player's lock only if the
//! chain number still matches.
//!
//! Players are cheap to clone and fully independent of each other, so a map
//! can hold one per marker.

pub mod beep;
pub mod error;
pub mod loader;
pub mod output;
pub mod resolver;
pub mod status;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::models::pinpoint::Pinpoint;

pub use beep::BeepConfig;
pub use error::MediaError;
pub use loader::{HttpLoader, MediaLoader};
pub use output::{AudioOutput, Clip, FileOutput, NullOutput};
pub use status::{PlayerStatus, StatusEvent, Tier};

/// How long a network tier may take to become playable.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_FALLBACK_URL: &str = "https://actions.google.com/sounds/v1/alarms/beep_short.ogg";
const STATUS_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct PlayerConfig {
    pub fallback_url: String,
    pub attempt_timeout: Duration,
    pub beep: BeepConfig,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            fallback_url: DEFAULT_FALLBACK_URL.to_string(),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            beep: BeepConfig::default(),
        }
    }
}

/// What to play: a pinpoint's sound reference plus a label for messages.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackTarget {
    pub pinpoint_id: Option<i64>,
    pub label: String,
    pub sound_ref: String,
}

impl From<&Pinpoint> for PlaybackTarget {
    fn from(pinpoint: &Pinpoint) -> Self {
        Self {
            pinpoint_id: Some(pinpoint.id),
            label: pinpoint.title.clone(),
            sound_ref: pinpoint.sound_url.clone(),
        }
    }
}

enum Commit {
    Committed,
    Stale,
}

struct ChainState {
    chain: u64,
    pinpoint_id: Option<i64>,
    status: PlayerStatus,
    token: Option<CancellationToken>,
}

struct Shared<L, O> {
    loader: L,
    output: O,
    config: PlayerConfig,
    state: Mutex<ChainState>,
    events: broadcast::Sender<StatusEvent>,
}

impl<L, O: AudioOutput> Shared<L, O> {
    fn lock(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, state: &mut ChainState, status: PlayerStatus) {
        tracing::debug!(
            chain = state.chain,
            pinpoint = ?state.pinpoint_id,
            status = status.label(),
            "player transition"
        );
        state.status = status.clone();
        if state.status.is_terminal() {
            state.token = None;
        }
        // No subscribers is fine.
        let _ = self.events.send(StatusEvent {
            chain: state.chain,
            pinpoint_id: state.pinpoint_id,
            status,
        });
    }

    /// Commit `status` if `chain` is still the active chain.
    fn commit(&self, chain: u64, status: PlayerStatus) -> Commit {
        let mut state = self.lock();
        if state.chain != chain {
            return Commit::Stale;
        }
        self.transition(&mut state, status);
        Commit::Committed
    }

    /// Start `clip` and commit `Playing(tier)` as one step.
    fn start_clip(&self, chain: u64, tier: Tier, clip: &Clip) -> Result<Commit, MediaError> {
        let mut state = self.lock();
        if state.chain != chain {
            return Ok(Commit::Stale);
        }
        self.output.start(clip)?;
        self.transition(&mut state, PlayerStatus::Playing(tier));
        Ok(Commit::Committed)
    }
}

pub struct AudioPlayer<L, O> {
    shared: Arc<Shared<L, O>>,
}

impl<L, O> Clone for AudioPlayer<L, O> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<L: MediaLoader, O: AudioOutput> AudioPlayer<L, O> {
    pub fn new(loader: L, output: O, config: PlayerConfig) -> Self {
        let (events, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                loader,
                output,
                config,
                state: Mutex::new(ChainState {
                    chain: 0,
                    pinpoint_id: None,
                    status: PlayerStatus::Idle,
                    token: None,
                }),
                events,
            }),
        }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.shared.config
    }

    pub fn status(&self) -> PlayerStatus {
        self.shared.lock().status.clone()
    }

    /// Number of the most recent chain (0 before the first `play`).
    pub fn current_chain(&self) -> u64 {
        self.shared.lock().chain
    }

    /// Subscribe to status transitions. Events of every chain are delivered;
    /// filter on [`StatusEvent::chain`] to follow one request.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.shared.events.subscribe()
    }

    /// Start playing `target`, superseding any chain in flight. Returns the new
    /// chain number. Must be called from within a tokio runtime.
    pub fn play(&self, target: impl Into<PlaybackTarget>) -> u64 {
        let target = target.into();
        let primary_url = resolver::resolve(&target.sound_ref);
        let token = CancellationToken::new();

        let chain = {
            let mut state = self.shared.lock();
            if let Some(previous) = state.token.take() {
                previous.cancel();
                tracing::debug!(chain = state.chain, "superseded in-flight chain");
            }
            self.shared.output.stop();
            state.chain += 1;
            state.pinpoint_id = target.pinpoint_id;
            state.token = Some(token.clone());
            self.shared
                .transition(&mut state, PlayerStatus::Attempting(Tier::Primary));
            state.chain
        };

        tokio::spawn(run_chain(
            Arc::clone(&self.shared),
            chain,
            token,
            target,
            primary_url,
        ));
        chain
    }

    /// Abandon the current chain, stop output and return to `Idle`.
    pub fn cancel(&self) {
        let mut state = self.shared.lock();
        if let Some(token) = state.token.take() {
            token.cancel();
        }
        self.shared.output.stop();
        state.chain += 1;
        state.pinpoint_id = None;
        self.shared.transition(&mut state, PlayerStatus::Idle);
    }

    /// Wait until `chain` reaches a terminal state. Returns `None` if the chain
    /// was superseded before it finished.
    pub async fn wait_for_outcome(&self, chain: u64) -> Option<PlayerStatus> {
        let mut events = self.subscribe();
        {
            let state = self.shared.lock();
            if state.chain != chain {
                return None;
            }
            if state.status.is_terminal() {
                return Some(state.status.clone());
            }
        }

        loop {
            match events.recv().await {
                Ok(event) if event.chain == chain && event.status.is_terminal() => {
                    return Some(event.status);
                }
                Ok(event) if event.chain > chain => return None,
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    let state = self.shared.lock();
                    if state.chain != chain {
                        return None;
                    }
                    if state.status.is_terminal() {
                        return Some(state.status.clone());
                    }
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

async fn run_chain<L: MediaLoader, O: AudioOutput>(
    shared: Arc<Shared<L, O>>,
    chain: u64,
    token: CancellationToken,
    target: PlaybackTarget,
    primary_url: String,
) {
    let timeout = shared.config.attempt_timeout;
    let fallback_url = shared.config.fallback_url.clone();

    for (tier, url) in [(Tier::Primary, &primary_url), (Tier::Fallback, &fallback_url)] {
        if tier == Tier::Fallback {
            if fallback_url.trim() == primary_url.trim() {
                tracing::debug!(chain, "fallback url equals primary, skipping tier");
                continue;
            }
            if let Commit::Stale = shared.commit(chain, PlayerStatus::Attempting(tier)) {
                return;
            }
        }

        let attempt = tokio::time::timeout(timeout, shared.loader.load(url));
        let loaded = tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!(chain, %tier, "attempt abandoned");
                return;
            }
            result = attempt => result.unwrap_or_else(|_| Err(MediaError::Timeout {
                url: url.clone(),
                after: timeout,
            })),
        };

        let staged = match loaded {
            Ok(clip) => shared.output.prepare(clip).await,
            Err(e) => Err(e),
        };

        match staged.and_then(|clip| shared.start_clip(chain, tier, &clip)) {
            Ok(Commit::Committed) => {
                tracing::info!(chain, %tier, label = %target.label, "playback started");
                return;
            }
            Ok(Commit::Stale) => return,
            Err(e) => {
                tracing::warn!(chain, %tier, label = %target.label, "tier failed: {e}");
            }
        }
    }

    if let Commit::Stale = shared.commit(chain, PlayerStatus::Attempting(Tier::Beep)) {
        return;
    }

    let staged = match beep::synthesize(&shared.config.beep) {
        Ok(clip) => shared.output.prepare(clip).await,
        Err(e) => Err(e),
    };
    let started = staged.and_then(|clip| shared.start_clip(chain, Tier::Beep, &clip));
    match started {
        Ok(Commit::Committed) => {
            tracing::info!(chain, label = %target.label, "beep fallback engaged");
        }
        Ok(Commit::Stale) => {}
        Err(e) => {
            tracing::error!(chain, label = %target.label, "all playback tiers failed: {e}");
            let message = format!("Could not play the sound for \"{}\": {e}", target.label);
            let _ = shared.commit(chain, PlayerStatus::Failed { message });
        }
    }
}

#[cfg(test)]
mod tests;
