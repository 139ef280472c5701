//! Periodic reconciliation of the published state against the engine.
//!
//! Speech engines finish, get interrupted by other applications, or drop
//! events without telling anyone. While a view is open this loop reads the
//! raw engine state every tick and overwrites the published state with it.

use super::adapter::SpeechAdapter;
use super::state::PlaybackState;
use super::tracker::publish;
use crate::cancellation::CancellationToken;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// What one tick decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Published state already matches the engine.
    Steady,
    /// Engine disagrees; publish its state instead.
    Corrected { from: PlaybackState, to: PlaybackState },
    /// Engine went idle while playback was believed active.
    EndedExternally { from: PlaybackState },
}

impl Reconciliation {
    pub fn next_state(self, published: PlaybackState) -> PlaybackState {
        match self {
            Reconciliation::Steady => published,
            Reconciliation::Corrected { to, .. } => to,
            Reconciliation::EndedExternally { .. } => PlaybackState::Idle,
        }
    }
}

/// The raw engine state always wins.
pub fn reconcile(raw: PlaybackState, published: PlaybackState) -> Reconciliation {
    match (raw, published) {
        (raw, published) if raw == published => Reconciliation::Steady,
        (PlaybackState::Idle, from) => Reconciliation::EndedExternally { from },
        (to, from) => Reconciliation::Corrected { from, to },
    }
}

/// Run a single reconciliation tick and return the state now published.
pub fn poll_once(adapter: &SpeechAdapter, published: &watch::Sender<PlaybackState>) -> PlaybackState {
    let current = *published.borrow();
    let decision = reconcile(adapter.engine_state(), current);
    match decision {
        Reconciliation::Steady => {}
        Reconciliation::Corrected { from, to } => {
            debug!(%from, %to, "Engine state disagrees with published state; correcting");
        }
        Reconciliation::EndedExternally { from } => {
            info!(%from, "Playback ended outside the app's control");
        }
    }
    let next = decision.next_state(current);
    publish(published, next);
    next
}

/// Owns the running loop. Dropping the handle stops the loop and cancels
/// any active utterance.
pub struct PollerHandle {
    token: CancellationToken,
    adapter: Arc<SpeechAdapter>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop polling, cancel speech and wait for the loop to exit.
    pub async fn shutdown(mut self) {
        self.halt();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                debug!("Reconciliation loop ended abnormally: {err}");
            }
        }
    }

    fn halt(&self) {
        self.token.cancel();
        self.adapter.cancel();
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        if !self.token.is_cancelled() {
            self.halt();
        }
    }
}

/// Start reconciling every `period`. Must be called inside a Tokio runtime.
pub fn spawn_reconciliation(
    adapter: Arc<SpeechAdapter>,
    published: Arc<watch::Sender<PlaybackState>>,
    period: Duration,
) -> PollerHandle {
    let token = CancellationToken::new();
    let task = tokio::spawn(run_loop(
        Arc::clone(&adapter),
        published,
        period,
        token.clone(),
    ));
    debug!(period_ms = period.as_millis() as u64, "Reconciliation loop started");
    PollerHandle {
        token,
        adapter,
        task: Some(task),
    }
}

async fn run_loop(
    adapter: Arc<SpeechAdapter>,
    published: Arc<watch::Sender<PlaybackState>>,
    period: Duration,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                poll_once(&adapter, &published);
            }
        }
    }
    debug!("Reconciliation loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::adapter::UtteranceConfig;
    use crate::speech::testing::FakePlatform;
    use crate::speech::tracker::PlaybackTracker;

    const PERIOD: Duration = Duration::from_millis(150);
    // Slightly past a tick so the loop has run before the test looks.
    const SETTLE: Duration = Duration::from_millis(160);

    struct Rig {
        platform: Arc<FakePlatform>,
        adapter: Arc<SpeechAdapter>,
        published: Arc<watch::Sender<PlaybackState>>,
    }

    fn rig() -> Rig {
        let platform = FakePlatform::new();
        let adapter = Arc::new(SpeechAdapter::new(platform.clone()));
        let (tx, _rx) = watch::channel(PlaybackState::Idle);
        Rig {
            platform,
            adapter,
            published: Arc::new(tx),
        }
    }

    #[test]
    fn reconcile_prefers_raw_state() {
        use PlaybackState::*;
        assert_eq!(reconcile(Speaking, Speaking), Reconciliation::Steady);
        assert_eq!(
            reconcile(Paused, Speaking),
            Reconciliation::Corrected { from: Speaking, to: Paused }
        );
        assert_eq!(
            reconcile(Speaking, Idle),
            Reconciliation::Corrected { from: Idle, to: Speaking }
        );
        assert_eq!(
            reconcile(Idle, Paused),
            Reconciliation::EndedExternally { from: Paused }
        );
        for raw in [Idle, Speaking, Paused] {
            for published in [Idle, Speaking, Paused] {
                assert_eq!(reconcile(raw, published).next_state(published), raw);
            }
        }
    }

    #[test]
    fn external_end_is_corrected_in_one_tick() {
        let rig = rig();
        let _handle = rig
            .adapter
            .start("Some text.", &UtteranceConfig::default())
            .expect("start");
        publish(&rig.published, PlaybackState::Speaking);

        rig.platform.set_raw(false, false);

        assert_eq!(poll_once(&rig.adapter, &rig.published), PlaybackState::Idle);
        assert_eq!(*rig.published.borrow(), PlaybackState::Idle);
    }

    #[test]
    fn optimistic_pause_is_overridden_by_engine() {
        let rig = rig();
        let _handle = rig
            .adapter
            .start("Some text.", &UtteranceConfig::default())
            .expect("start");
        publish(&rig.published, PlaybackState::Paused);

        assert_eq!(poll_once(&rig.adapter, &rig.published), PlaybackState::Speaking);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_is_reflected_within_one_period() {
        let rig = rig();
        let tracker = PlaybackTracker::new(rig.adapter.clone(), rig.published.clone());
        let poller = spawn_reconciliation(rig.adapter.clone(), rig.published.clone(), PERIOD);

        let _task = tracker
            .play("Some text.", &UtteranceConfig::default())
            .expect("play");
        tokio::time::sleep(SETTLE).await;
        assert_eq!(*rig.published.borrow(), PlaybackState::Speaking);

        // Bypass the tracker so only the loop can notice.
        rig.adapter.cancel();
        tokio::time::sleep(SETTLE).await;
        assert_eq!(*rig.published.borrow(), PlaybackState::Idle);

        poller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn engine_drift_is_picked_up_by_the_loop() {
        let rig = rig();
        let tracker = PlaybackTracker::new(rig.adapter.clone(), rig.published.clone());
        let poller = spawn_reconciliation(rig.adapter.clone(), rig.published.clone(), PERIOD);

        let _task = tracker
            .play("Some text.", &UtteranceConfig::default())
            .expect("play");
        rig.platform.set_raw(true, true);
        tokio::time::sleep(SETTLE).await;
        assert_eq!(*rig.published.borrow(), PlaybackState::Paused);

        poller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_loop_and_cancels_speech() {
        let rig = rig();
        let poller = spawn_reconciliation(rig.adapter.clone(), rig.published.clone(), PERIOD);
        let _handle = rig
            .adapter
            .start("Some text.", &UtteranceConfig::default())
            .expect("start");
        assert!(poller.is_running());

        poller.shutdown().await;

        assert!(!rig.adapter.has_current());
        assert_eq!(rig.adapter.engine_state(), PlaybackState::Idle);

        // Nothing polls any more, so a stale value stays put.
        publish(&rig.published, PlaybackState::Speaking);
        tokio::time::sleep(SETTLE * 3).await;
        assert_eq!(*rig.published.borrow(), PlaybackState::Speaking);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_cancels_speech() {
        let rig = rig();
        let poller = spawn_reconciliation(rig.adapter.clone(), rig.published.clone(), PERIOD);
        let _handle = rig
            .adapter
            .start("Some text.", &UtteranceConfig::default())
            .expect("start");

        drop(poller);

        assert!(!rig.adapter.has_current());
    }
}
