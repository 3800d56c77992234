//! Human-readable epoch and duration rendering.

use std::cmp::Ordering;

use crate::domain::models::ChainEpoch;

const UNITS: [(&str, u64); 6] = [
    ("year", 365 * 86_400),
    ("week", 7 * 86_400),
    ("day", 86_400),
    ("hour", 3_600),
    ("minute", 60),
    ("second", 1),
];

/// Render `secs` as its two largest non-zero units, e.g. `"2 hours 15 minutes"`.
pub fn coarse_duration(secs: u64) -> String {
    let mut remaining = secs;
    let mut parts = Vec::with_capacity(2);

    for (name, size) in UNITS {
        let count = remaining / size;
        remaining %= size;
        if count == 0 {
            continue;
        }
        let plural = if count == 1 { "" } else { "s" };
        parts.push(format!("{count} {name}{plural}"));
        if parts.len() == 2 {
            break;
        }
    }

    if parts.is_empty() {
        "0 seconds".to_string()
    } else {
        parts.join(" ")
    }
}

/// Wall-clock length of `epochs` chain epochs.
pub fn epochs_duration(epochs: u64, block_delay_secs: u64) -> String {
    coarse_duration(epochs.saturating_mul(block_delay_secs))
}

/// Render `epoch` relative to `current`: `"e (now)"`, `"e (X ago)"` or `"e (in X)"`.
pub fn epoch_time(current: ChainEpoch, epoch: ChainEpoch, block_delay_secs: u64) -> String {
    match current.cmp(&epoch) {
        Ordering::Equal => format!("{epoch} (now)"),
        Ordering::Greater => format!(
            "{epoch} ({} ago)",
            epochs_duration(current.abs_diff(epoch), block_delay_secs)
        ),
        Ordering::Less => format!(
            "{epoch} (in {})",
            epochs_duration(epoch.abs_diff(current), block_delay_secs)
        ),
    }
}
