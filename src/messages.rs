//! Core log messages.
//!
//! Every message carries a stable `code` so log processing does not depend
//! on the wording.

use crate::logging::format_duration;
use std::time::Duration;

pub const TARGET: &str = "unimbus";

pub fn version_info(version: &str) {
    tracing::info!(target: TARGET, code = "UNIMBUS-0001", version, "uNimbus {}", version);
}

pub fn starting() {
    tracing::info!(target: TARGET, code = "UNIMBUS-0002", "starting");
}

pub fn started(total: Duration) {
    tracing::info!(
        target: TARGET,
        code = "UNIMBUS-0003",
        duration_ms = total.as_millis() as u64,
        "started in {}",
        format_duration(total)
    );
}

pub fn timing(phase: &str, duration: Duration) {
    tracing::info!(
        target: TARGET,
        code = "UNIMBUS-0004",
        phase,
        duration_ms = duration.as_millis() as u64,
        "{}: {}",
        phase,
        format_duration(duration)
    );
}

pub fn stopping() {
    tracing::info!(target: TARGET, code = "UNIMBUS-0005", "stopping");
}

pub fn stopped() {
    tracing::info!(target: TARGET, code = "UNIMBUS-0006", "stopped");
}
