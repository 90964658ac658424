use crate::messages;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Renders a duration the way startup timings are logged: `S.mmms`.
pub fn format_duration(duration: Duration) -> String {
    format!("{}.{:03}s", duration.as_secs(), duration.subsec_millis())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseTiming {
    pub phase: String,
    pub duration: Duration,
}

/// Timings of one startup.
#[derive(Debug, Clone, Serialize)]
pub struct StartupReport {
    pub started_at: DateTime<Utc>,
    pub phases: Vec<PhaseTiming>,
    pub total: Duration,
}

impl StartupReport {
    pub fn phase(&self, phase: &str) -> Option<Duration> {
        self.phases
            .iter()
            .find(|timing| timing.phase == phase)
            .map(|timing| timing.duration)
    }

    pub fn sum_of_phases(&self) -> Duration {
        self.phases.iter().map(|timing| timing.duration).sum()
    }
}

/// Splits startup into consecutive phases.
///
/// Each `mark` closes the phase that began at the previous mark, so the
/// phases tile the whole startup and `total` is exactly their sum.
pub struct StartupClock {
    started_at: DateTime<Utc>,
    origin: Instant,
    last: Instant,
    phases: Vec<PhaseTiming>,
}

impl Default for StartupClock {
    fn default() -> Self {
        Self::start()
    }
}

impl StartupClock {
    pub fn start() -> Self {
        let now = Instant::now();
        Self {
            started_at: Utc::now(),
            origin: now,
            last: now,
            phases: Vec::new(),
        }
    }

    /// Closes the current phase under `phase`, logs it, and returns its duration.
    pub fn mark(&mut self, phase: &str) -> Duration {
        let now = Instant::now();
        let duration = now.duration_since(self.last);
        self.last = now;
        messages::timing(phase, duration);
        self.phases.push(PhaseTiming {
            phase: phase.to_string(),
            duration,
        });
        duration
    }

    pub fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }

    pub fn finish(self) -> StartupReport {
        StartupReport {
            started_at: self.started_at,
            total: self.last.duration_since(self.origin),
            phases: self.phases,
        }
    }
}
