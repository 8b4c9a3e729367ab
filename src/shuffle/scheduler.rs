//! Shuffle scheduler
//!
//! Waits for the start signal, then rotates focus between the visible
//! active game windows until every game is completed. Each displayed game
//! gets a random countdown in 0.1 s ticks; operator signals are drained
//! once per tick.

use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::policy::{self, Selection};
use super::SignalFlags;
use crate::config::GeneralConfig;
use crate::desktop::{GameWindow, WindowFocus, WindowLocator};
use crate::games::{ExportSink, GameRegistry};
use crate::obs::{OverlaySync, SourceTransform};

/// Scheduler polling and countdown granularity
pub const TICK: Duration = Duration::from_millis(100);

/// How the scheduler loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every game was completed or no game window is visible
    Exhausted,
    /// Shutdown was requested
    Shutdown,
}

/// Swap timing
#[derive(Debug, Clone)]
pub struct Timing {
    pub min_time: u64,
    pub max_time: u64,
    pub start_countdown_secs: u64,
    pub tick: Duration,
}

impl Timing {
    pub fn from_config(config: &GeneralConfig) -> Self {
        Self {
            min_time: config.min_time,
            max_time: config.max_time,
            start_countdown_secs: config.start_countdown_secs,
            tick: TICK,
        }
    }
}

/// Overlay collaborator plus the scene it drives
pub struct OverlayTarget {
    pub sync: Box<dyn OverlaySync>,
    pub scene: String,
    pub active_transform: Option<SourceTransform>,
}

#[derive(Debug)]
struct ShutdownRequested;

/// The scheduler owns the registry and drives every collaborator
pub struct Scheduler {
    registry: GameRegistry,
    flags: Arc<SignalFlags>,
    locator: Box<dyn WindowLocator>,
    focus: Box<dyn WindowFocus>,
    overlay: Option<OverlayTarget>,
    export: ExportSink,
    timing: Timing,
    rng: StdRng,
    previous: Option<GameWindow>,
}

impl Scheduler {
    pub fn new(
        registry: GameRegistry,
        flags: Arc<SignalFlags>,
        locator: Box<dyn WindowLocator>,
        focus: Box<dyn WindowFocus>,
        export: ExportSink,
        timing: Timing,
        rng: StdRng,
    ) -> Self {
        Self {
            registry,
            flags,
            locator,
            focus,
            overlay: None,
            export,
            timing,
            rng,
            previous: None,
        }
    }

    pub fn with_overlay(mut self, overlay: OverlayTarget) -> Self {
        self.overlay = Some(overlay);
        self
    }

    pub fn registry(&self) -> &GameRegistry {
        &self.registry
    }

    /// Run until no active game remains or shutdown is requested
    pub async fn run(&mut self) -> RunOutcome {
        match self.run_phases().await {
            Ok(()) => RunOutcome::Exhausted,
            Err(ShutdownRequested) => {
                info!("Shuffler stopped");
                RunOutcome::Shutdown
            }
        }
    }

    async fn run_phases(&mut self) -> Result<(), ShutdownRequested> {
        self.await_start().await?;
        self.start_countdown().await?;
        self.hide_all_sources().await;
        self.export.publish(&self.registry);
        self.shuffle().await
    }

    /// Sleep one tick, then check for shutdown
    async fn tick(&self) -> Result<(), ShutdownRequested> {
        tokio::time::sleep(self.timing.tick).await;
        if self.flags.shutdown_requested() {
            return Err(ShutdownRequested);
        }
        Ok(())
    }

    async fn await_start(&self) -> Result<(), ShutdownRequested> {
        info!("Shuffler is waiting. Press the start key to begin.");
        while !self.flags.is_started() {
            self.tick().await?;
        }
        Ok(())
    }

    async fn start_countdown(&self) -> Result<(), ShutdownRequested> {
        for remaining in (1..=self.timing.start_countdown_secs).rev() {
            info!("Starting in {}...", remaining);
            tokio::time::sleep(Duration::from_secs(1)).await;
            if self.flags.shutdown_requested() {
                return Err(ShutdownRequested);
            }
        }
        info!("Shuffler starting!");
        Ok(())
    }

    /// Hide every visible game's source before the first swap
    async fn hide_all_sources(&self) {
        let Some(overlay) = &self.overlay else {
            return;
        };

        let windows = self.locator.enumerate(&self.registry.list_active());
        for window in &windows {
            if let Err(e) = overlay
                .sync
                .set_visible(&overlay.scene, &window.title, false)
                .await
            {
                warn!("Failed to hide OBS source '{}': {}", window.title, e);
            }
        }
    }

    async fn shuffle(&mut self) -> Result<(), ShutdownRequested> {
        loop {
            while self.flags.is_paused() {
                self.tick().await?;
            }

            let candidates = self.locator.enumerate(&self.registry.list_active());

            match policy::select(&candidates, self.previous.as_ref(), &mut self.rng) {
                Selection::NoneRemaining => {
                    info!("No active games remaining.");
                    return Ok(());
                }
                Selection::Repeat => {
                    debug!("Drew the game already showing, polling again");
                }
                Selection::Sole(window) => {
                    if self.previous.as_ref() != Some(&window) {
                        info!("Only one active game remains: {}", window.title);
                        self.transition(&window, &candidates).await;
                    }
                    self.tick().await?;
                    if !self.flags.is_paused() {
                        self.apply_pending(&window.title);
                    }
                }
                Selection::Chosen(window) => {
                    info!("Swapping to: {}", window.title);
                    self.transition(&window, &candidates).await;

                    let ticks = policy::draw_ticks(
                        self.timing.min_time,
                        self.timing.max_time,
                        &mut self.rng,
                    );
                    info!("Switching in {:.1} seconds.", ticks as f64 / 10.0);
                    self.countdown(ticks, &window.title).await?;
                }
            }
        }
    }

    /// Wait `ticks` unpaused ticks, draining signals for the shown game
    async fn countdown(&mut self, ticks: u64, title: &str) -> Result<(), ShutdownRequested> {
        let mut elapsed = 0;
        while elapsed < ticks {
            self.tick().await?;
            if self.flags.is_paused() {
                continue;
            }
            self.apply_pending(title);
            elapsed += 1;
        }
        Ok(())
    }

    /// Apply pending mark-done and undo signals
    fn apply_pending(&mut self, current: &str) {
        if self.flags.take_mark_done() {
            match self.registry.mark_done(current) {
                Ok(()) => {
                    info!(
                        "{} marked as done and removed from the pool ({} left)",
                        current,
                        self.registry.remaining()
                    );
                    self.export.publish(&self.registry);
                }
                Err(e) => warn!("Mark done skipped: {}", e),
            }
        }

        if self.flags.take_undo() {
            match self.registry.undo_last() {
                Ok(title) => {
                    info!("Undo: {} moved back to active games", title);
                    self.export.publish(&self.registry);
                }
                Err(e) => warn!("Undo skipped: {}", e),
            }
        }
    }

    /// Focus the new window, minimize the old one and sync the overlay
    async fn transition(&mut self, window: &GameWindow, candidates: &[GameWindow]) {
        if let Err(e) = self.focus.focus(window.handle) {
            warn!("Failed to focus '{}' ({}): {}", window.title, window.handle, e);
        }

        let previous = self.previous.replace(window.clone());
        if let Some(prev) = &previous {
            if prev.handle != window.handle {
                self.focus.minimize(prev.handle);
            }
        }

        self.sync_overlay(window, candidates, previous.as_ref()).await;
    }

    async fn sync_overlay(
        &self,
        window: &GameWindow,
        candidates: &[GameWindow],
        previous: Option<&GameWindow>,
    ) {
        let Some(overlay) = &self.overlay else {
            return;
        };
        let scene = overlay.scene.as_str();

        if let Err(e) = overlay.sync.set_visible(scene, &window.title, true).await {
            warn!("Failed to show OBS source '{}': {}", window.title, e);
        }

        if let Some(transform) = &overlay.active_transform {
            if let Err(e) = overlay
                .sync
                .set_transform(scene, &window.title, transform)
                .await
            {
                warn!("Failed to place OBS source '{}': {}", window.title, e);
            }
        }

        // A just-completed game is no longer a candidate but may still be shown
        let previous_hidden = previous
            .filter(|prev| prev.title != window.title)
            .filter(|prev| candidates.iter().all(|c| c.title != prev.title));

        let others = candidates
            .iter()
            .filter(|c| c.title != window.title)
            .chain(previous_hidden);

        for other in others {
            if let Err(e) = overlay.sync.set_visible(scene, &other.title, false).await {
                warn!("Failed to hide OBS source '{}': {}", other.title, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desktop::{DesktopError, WindowHandle};
    use crate::obs::OverlayError;
    use crate::shuffle::Signal;
    use async_trait::async_trait;
    use rand::SeedableRng;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct DesktopState {
        windows: Vec<GameWindow>,
        focused: Vec<String>,
        minimized: Vec<String>,
        fail_focus: bool,
    }

    #[derive(Clone, Default)]
    struct FakeDesktop {
        state: Arc<Mutex<DesktopState>>,
    }

    impl FakeDesktop {
        fn with_games(titles: &[&str]) -> Self {
            let desktop = Self::default();
            desktop.state.lock().unwrap().windows = titles
                .iter()
                .enumerate()
                .map(|(i, t)| GameWindow::new(WindowHandle(i as u64 + 1), *t))
                .collect();
            desktop
        }

        fn focused(&self) -> Vec<String> {
            self.state.lock().unwrap().focused.clone()
        }

        fn minimized(&self) -> Vec<String> {
            self.state.lock().unwrap().minimized.clone()
        }

        fn title_of(state: &DesktopState, handle: WindowHandle) -> String {
            state
                .windows
                .iter()
                .find(|w| w.handle == handle)
                .map(|w| w.title.clone())
                .unwrap_or_default()
        }
    }

    impl WindowLocator for FakeDesktop {
        fn enumerate(&self, active_titles: &[String]) -> Vec<GameWindow> {
            self.state
                .lock()
                .unwrap()
                .windows
                .iter()
                .filter(|w| active_titles.contains(&w.title))
                .cloned()
                .collect()
        }
    }

    impl WindowFocus for FakeDesktop {
        fn focus(&self, handle: WindowHandle) -> Result<(), DesktopError> {
            let mut state = self.state.lock().unwrap();
            let title = Self::title_of(&state, handle);
            state.focused.push(title);
            if state.fail_focus {
                return Err(DesktopError::Backend("refused".to_string()));
            }
            Ok(())
        }

        fn minimize(&self, handle: WindowHandle) {
            let mut state = self.state.lock().unwrap();
            let title = Self::title_of(&state, handle);
            state.minimized.push(title);
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum OverlayCall {
        Visible(String, bool),
        Transform(String),
    }

    #[derive(Clone, Default)]
    struct FakeOverlay {
        calls: Arc<Mutex<Vec<OverlayCall>>>,
        fail: bool,
    }

    #[async_trait]
    impl OverlaySync for FakeOverlay {
        async fn set_visible(
            &self,
            scene: &str,
            source: &str,
            visible: bool,
        ) -> Result<(), OverlayError> {
            self.calls
                .lock()
                .unwrap()
                .push(OverlayCall::Visible(source.to_string(), visible));
            if self.fail {
                return Err(OverlayError::SourceNotFound {
                    scene: scene.to_string(),
                    source_name: source.to_string(),
                });
            }
            Ok(())
        }

        async fn set_transform(
            &self,
            _scene: &str,
            source: &str,
            _transform: &SourceTransform,
        ) -> Result<(), OverlayError> {
            self.calls
                .lock()
                .unwrap()
                .push(OverlayCall::Transform(source.to_string()));
            Ok(())
        }
    }

    fn timing() -> Timing {
        Timing {
            min_time: 1,
            max_time: 1,
            start_countdown_secs: 5,
            tick: TICK,
        }
    }

    fn scheduler(
        titles: &[&str],
        desktop: &FakeDesktop,
        flags: &Arc<SignalFlags>,
        export: ExportSink,
    ) -> Scheduler {
        Scheduler::new(
            GameRegistry::new(titles.iter().copied()),
            flags.clone(),
            Box::new(desktop.clone()),
            Box::new(desktop.clone()),
            export,
            timing(),
            StdRng::seed_from_u64(11),
        )
    }

    fn started() -> Arc<SignalFlags> {
        let flags = Arc::new(SignalFlags::new());
        flags.raise(Signal::Start);
        flags
    }

    async fn at_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sole_survivor_is_focused_once() {
        let desktop = FakeDesktop::with_games(&["A"]);
        let flags = started();
        let mut sched = scheduler(&["A"], &desktop, &flags, ExportSink::default());

        let (outcome, _) = tokio::join!(sched.run(), async {
            at_ms(30_000).await;
            flags.raise(Signal::MarkDone);
        });

        assert_eq!(outcome, RunOutcome::Exhausted);
        assert_eq!(desktop.focused(), vec!["A"]);
        assert!(desktop.minimized().is_empty());
        assert_eq!(sched.registry().remaining(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_visible_windows_finishes() {
        let desktop = FakeDesktop::with_games(&[]);
        let flags = started();
        let mut sched = scheduler(&["A", "B"], &desktop, &flags, ExportSink::default());

        assert_eq!(sched.run().await, RunOutcome::Exhausted);
        assert!(desktop.focused().is_empty());
        assert_eq!(sched.registry().remaining(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rotation_never_shows_same_game_twice_in_a_row() {
        let desktop = FakeDesktop::with_games(&["A", "B", "C"]);
        let flags = started();
        let mut sched = scheduler(&["A", "B", "C"], &desktop, &flags, ExportSink::default());

        let (outcome, _) = tokio::join!(sched.run(), async {
            at_ms(20_050).await;
            flags.request_shutdown();
        });

        assert_eq!(outcome, RunOutcome::Shutdown);
        let focused = desktop.focused();
        assert!(focused.len() >= 10, "only {} swaps", focused.len());
        for pair in focused.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
        // Every swap minimizes the game shown before it
        assert_eq!(desktop.minimized(), focused[..focused.len() - 1].to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mark_done_then_sole_then_finished() {
        let dir = tempdir().unwrap();
        let list = dir.path().join("remaining_games.txt");
        let count = dir.path().join("num_remaining.txt");
        let export = ExportSink::new(Some(list.clone()), Some(count.clone()));

        let desktop = FakeDesktop::with_games(&["A", "B"]);
        let flags = started();
        let mut sched = scheduler(&["A", "B"], &desktop, &flags, export);

        let (outcome, _) = tokio::join!(sched.run(), async {
            at_ms(5_500).await;
            flags.raise(Signal::MarkDone);
            at_ms(2_500).await;
            flags.raise(Signal::MarkDone);
        });

        assert_eq!(outcome, RunOutcome::Exhausted);
        let focused = desktop.focused();
        assert_eq!(focused.len(), 2);
        assert_ne!(focused[0], focused[1]);
        assert_eq!(desktop.minimized(), vec![focused[0].clone()]);
        assert_eq!(sched.registry().history(), focused.as_slice());

        assert_eq!(std::fs::read_to_string(&list).unwrap(), "");
        assert_eq!(std::fs::read_to_string(&count).unwrap(), "Games left: 0");
    }

    #[tokio::test(start_paused = true)]
    async fn test_undo_puts_game_back_into_rotation() {
        let desktop = FakeDesktop::with_games(&["A", "B"]);
        let flags = started();
        let mut sched = scheduler(&["A", "B"], &desktop, &flags, ExportSink::default());

        let (outcome, _) = tokio::join!(sched.run(), async {
            at_ms(5_500).await;
            flags.raise(Signal::MarkDone);
            at_ms(1_550).await;
            flags.raise(Signal::Undo);
            at_ms(500).await;
            flags.request_shutdown();
        });

        assert_eq!(outcome, RunOutcome::Shutdown);
        let focused = desktop.focused();
        assert_eq!(focused.len(), 3);
        assert_eq!(focused[0], focused[2]);
        assert_ne!(focused[0], focused[1]);
        assert_eq!(sched.registry().remaining(), 2);
        assert!(sched.registry().history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_freezes_countdown_and_ignores_mark_done() {
        let desktop = FakeDesktop::with_games(&["A", "B"]);
        let flags = started();
        let mut sched = scheduler(&["A", "B"], &desktop, &flags, ExportSink::default());

        let (outcome, _) = tokio::join!(sched.run(), async {
            at_ms(5_550).await;
            flags.raise(Signal::PauseToggle);
            at_ms(4_450).await;
            flags.raise(Signal::MarkDone);
            at_ms(5_000).await;
            flags.raise(Signal::PauseToggle);
            at_ms(250).await;
            flags.request_shutdown();
        });

        assert_eq!(outcome, RunOutcome::Shutdown);
        assert_eq!(desktop.focused().len(), 1);
        assert_eq!(sched.registry().remaining(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_start_signal() {
        let desktop = FakeDesktop::with_games(&["A", "B"]);
        let flags = Arc::new(SignalFlags::new());
        let mut sched = scheduler(&["A", "B"], &desktop, &flags, ExportSink::default());

        let (outcome, _) = tokio::join!(sched.run(), async {
            at_ms(60_000).await;
            flags.request_shutdown();
        });

        assert_eq!(outcome, RunOutcome::Shutdown);
        assert!(desktop.focused().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_while_waiting_for_start() {
        let desktop = FakeDesktop::with_games(&["A"]);
        let flags = Arc::new(SignalFlags::new());
        flags.request_shutdown();
        let mut sched = scheduler(&["A"], &desktop, &flags, ExportSink::default());

        assert_eq!(sched.run().await, RunOutcome::Shutdown);
        assert!(desktop.focused().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_during_sole_display_ignores_mark_done() {
        let desktop = FakeDesktop::with_games(&["A"]);
        let flags = started();
        let mut sched = scheduler(&["A"], &desktop, &flags, ExportSink::default());

        let (outcome, _) = tokio::join!(sched.run(), async {
            at_ms(5_550).await;
            flags.raise(Signal::PauseToggle);
            at_ms(450).await;
            flags.raise(Signal::MarkDone);
            at_ms(1_000).await;
            flags.raise(Signal::PauseToggle);
            at_ms(550).await;
            flags.request_shutdown();
        });

        assert_eq!(outcome, RunOutcome::Shutdown);
        assert_eq!(desktop.focused(), vec!["A"]);
        assert_eq!(sched.registry().remaining(), 1);
        assert!(sched.registry().history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_undo_with_empty_history_keeps_rotating() {
        let desktop = FakeDesktop::with_games(&["A", "B"]);
        let flags = started();
        let mut sched = scheduler(&["A", "B"], &desktop, &flags, ExportSink::default());

        let (outcome, _) = tokio::join!(sched.run(), async {
            at_ms(5_550).await;
            flags.raise(Signal::Undo);
            at_ms(1_500).await;
            flags.request_shutdown();
        });

        assert_eq!(outcome, RunOutcome::Shutdown);
        let focused = desktop.focused();
        assert_eq!(focused.len(), 3);
        assert_ne!(focused[0], focused[1]);
        assert_ne!(focused[1], focused[2]);
        assert_eq!(sched.registry().remaining(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlay_hides_sources_then_shows_chosen() {
        let desktop = FakeDesktop::with_games(&["A", "B", "C"]);
        let flags = started();
        let overlay = FakeOverlay::default();
        let mut sched = scheduler(&["A", "B", "C"], &desktop, &flags, ExportSink::default())
            .with_overlay(OverlayTarget {
                sync: Box::new(overlay.clone()),
                scene: "Race".to_string(),
                active_transform: Some(SourceTransform {
                    position_x: 0.0,
                    position_y: 0.0,
                    bounds_width: 1920.0,
                    bounds_height: 1080.0,
                    rotation: 0.0,
                }),
            });

        let (outcome, _) = tokio::join!(sched.run(), async {
            at_ms(5_550).await;
            flags.request_shutdown();
        });
        assert_eq!(outcome, RunOutcome::Shutdown);

        let chosen = desktop.focused()[0].clone();
        let calls = overlay.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 7);
        for (call, title) in calls[..3].iter().zip(["A", "B", "C"]) {
            assert_eq!(*call, OverlayCall::Visible(title.to_string(), false));
        }
        assert_eq!(calls[3], OverlayCall::Visible(chosen.clone(), true));
        assert_eq!(calls[4], OverlayCall::Transform(chosen.clone()));
        for call in &calls[5..] {
            match call {
                OverlayCall::Visible(title, false) => assert_ne!(*title, chosen),
                other => panic!("unexpected overlay call {:?}", other),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_game_source_is_hidden_on_next_swap() {
        let desktop = FakeDesktop::with_games(&["A", "B"]);
        let flags = started();
        let overlay = FakeOverlay::default();
        let mut sched = scheduler(&["A", "B"], &desktop, &flags, ExportSink::default())
            .with_overlay(OverlayTarget {
                sync: Box::new(overlay.clone()),
                scene: "Race".to_string(),
                active_transform: None,
            });

        let (outcome, _) = tokio::join!(sched.run(), async {
            at_ms(5_500).await;
            flags.raise(Signal::MarkDone);
            at_ms(1_000).await;
            flags.request_shutdown();
        });
        assert_eq!(outcome, RunOutcome::Shutdown);

        let focused = desktop.focused();
        let calls = overlay.calls.lock().unwrap().clone();
        assert_eq!(
            calls.last(),
            Some(&OverlayCall::Visible(focused[0].clone(), false))
        );
        assert!(calls.contains(&OverlayCall::Visible(focused[1].clone(), true)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_failures_do_not_stop_rotation() {
        let desktop = FakeDesktop::with_games(&["A", "B"]);
        desktop.state.lock().unwrap().fail_focus = true;
        let flags = started();
        let overlay = FakeOverlay {
            fail: true,
            ..FakeOverlay::default()
        };
        let mut sched = scheduler(&["A", "B"], &desktop, &flags, ExportSink::default())
            .with_overlay(OverlayTarget {
                sync: Box::new(overlay),
                scene: "Race".to_string(),
                active_transform: None,
            });

        let (outcome, _) = tokio::join!(sched.run(), async {
            at_ms(8_050).await;
            flags.request_shutdown();
        });

        assert_eq!(outcome, RunOutcome::Shutdown);
        assert!(desktop.focused().len() >= 3);
    }
}
