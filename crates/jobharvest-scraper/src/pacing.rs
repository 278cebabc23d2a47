use rand::Rng;
use std::time::Duration;

/// Delay between cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// `base + index * increment`, capped at `max`; slows down as the run
    /// goes on
    Increasing {
        base: Duration,
        increment: Duration,
        max: Duration,
    },
    /// `base` plus a uniform random extra of up to `jitter`
    Jittered { base: Duration, jitter: Duration },
}

impl Pacing {
    /// Delay after the card at `index`.
    #[must_use]
    pub fn delay(&self, index: usize) -> Duration {
        match *self {
            Pacing::Increasing {
                base,
                increment,
                max,
            } => {
                let steps = u32::try_from(index).unwrap_or(u32::MAX);
                base.saturating_add(increment.saturating_mul(steps)).min(max)
            }
            Pacing::Jittered { base, jitter } => {
                let extra = if jitter.is_zero() {
                    Duration::ZERO
                } else {
                    rand::thread_rng().gen_range(Duration::ZERO..=jitter)
                };
                base + extra
            }
        }
    }

    /// Smallest and largest delay this pacing can produce.
    #[must_use]
    pub fn bounds(&self) -> (Duration, Duration) {
        match *self {
            Pacing::Increasing { base, max, .. } => (base.min(max), max),
            Pacing::Jittered { base, jitter } => (base, base + jitter),
        }
    }
}
