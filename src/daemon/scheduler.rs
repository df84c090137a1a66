use log::warn;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

// Upper bound on one sleep, so a cleared running flag is noticed quickly.
const SLEEP_SLICE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub ticks: u64,
    pub skipped: u64,
}

/// Fixed-period trigger. Ticks run on the calling thread one at a time; firings
/// that fall inside a still-running tick are dropped rather than queued.
pub struct Scheduler {
    period: Duration,
}

impl Scheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Fires immediately, then every period, until `running` is cleared.
    pub fn run(&self, running: &AtomicBool, mut tick: impl FnMut()) -> SchedulerStats {
        let mut stats = SchedulerStats::default();
        let mut next = Instant::now();

        while running.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now < next {
                thread::sleep((next - now).min(SLEEP_SLICE));
                continue;
            }

            tick();
            stats.ticks += 1;
            next += self.period;

            let finished = Instant::now();
            if finished >= next {
                let overrun = finished - next;
                let missed = (overrun.as_nanos() / self.period.as_nanos()) as u64 + 1;
                warn!(
                    "tick took longer than {:?}; skipping {missed} scheduled tick(s)",
                    self.period
                );
                stats.skipped += missed;
                next += self.period * missed as u32;
            }
        }
        stats
    }
}
