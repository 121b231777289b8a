use crate::models::{IntegrityVerdict, MetricSample};

/// Largest relative change between consecutive samples considered plausible.
pub const DEFAULT_MAX_CHANGE: f64 = 0.5;

/// Compares the newest sample with the previous one.
///
/// Advisory: a failed verdict is meant to be logged, not to stop the run.
pub fn check(samples: &[MetricSample], threshold: f64) -> IntegrityVerdict {
    let [.., previous, latest] = samples else {
        return IntegrityVerdict::pass();
    };

    let fields = [
        ("subscribers", previous.subscribers, latest.subscribers),
        ("views", previous.views, latest.views),
        ("videos", previous.videos, latest.videos),
    ];

    let offending: Vec<String> = fields
        .iter()
        .filter_map(|&(name, before, after)| {
            let ratio = change_ratio(before, after)?;
            (ratio > threshold).then(|| {
                format!(
                    "{name} changed by {:.1}% ({before} -> {after})",
                    ratio * 100.0
                )
            })
        })
        .collect();

    if offending.is_empty() {
        IntegrityVerdict::pass()
    } else {
        IntegrityVerdict::fail(format!(
            "Suspicious change since {}: {}",
            previous.formatted_timestamp(),
            offending.join("; ")
        ))
    }
}

/// `|after - before| / before`; `None` when there is no baseline.
fn change_ratio(before: u64, after: u64) -> Option<f64> {
    if before == 0 {
        return None;
    }
    Some(before.abs_diff(after) as f64 / before as f64)
}
