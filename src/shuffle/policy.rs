//! Window selection policy
//!
//! Picks the next game window to show. Never resamples in place: a draw
//! that lands on the window already showing is reported as `Repeat` and
//! the scheduler polls again, which keeps the draw uniform over all
//! candidates.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::desktop::GameWindow;

/// Outcome of one selection round
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// No active game window is visible
    NoneRemaining,
    /// Exactly one candidate is left
    Sole(GameWindow),
    /// Uniform draw over two or more candidates
    Chosen(GameWindow),
    /// The draw matched the window already showing; poll again
    Repeat,
}

pub fn select<R: Rng + ?Sized>(
    candidates: &[GameWindow],
    previous: Option<&GameWindow>,
    rng: &mut R,
) -> Selection {
    match candidates {
        [] => Selection::NoneRemaining,
        [only] => Selection::Sole(only.clone()),
        _ => {
            let Some(drawn) = candidates.choose(rng) else {
                return Selection::NoneRemaining;
            };
            if previous.is_some_and(|prev| prev.handle == drawn.handle) {
                Selection::Repeat
            } else {
                Selection::Chosen(drawn.clone())
            }
        }
    }
}

/// Countdown length in ticks, uniform in `[min*10, max*10)`
pub fn draw_ticks<R: Rng + ?Sized>(min_time: u64, max_time: u64, rng: &mut R) -> u64 {
    let low = min_time.saturating_mul(10);
    let high = max_time.saturating_mul(10);
    if low >= high {
        low
    } else {
        rng.gen_range(low..high)
    }
}
