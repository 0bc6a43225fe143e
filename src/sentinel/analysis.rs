use chrono::{DateTime, Utc};

use super::types::{AntiCheatConfig, CheatIndicator, CheatKind, InteractionEvent, InteractionKind, Position, Severity};

/// Reference screen used to normalize click dispersion (1920x1080 diagonal).
pub const SCREEN_DIAGONAL: f64 = 2202.907;

/// Clicks considered by the dispersion check, unless the threshold asks for more.
const RECENT_CLICK_LIMIT: usize = 20;

fn interval_ms(a: &DateTime<Utc>, b: &DateTime<Utc>) -> f64 {
    let delta = *b - *a;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000.0,
        None => delta.num_milliseconds() as f64,
    }
}

fn intervals<'a>(events: impl Iterator<Item = &'a InteractionEvent>) -> Vec<f64> {
    let stamps: Vec<&DateTime<Utc>> = events.map(|e| &e.timestamp).collect();
    stamps.windows(2).map(|w| interval_ms(w[0], w[1])).collect()
}

fn last_timestamp(events: &[InteractionEvent]) -> DateTime<Utc> {
    events.last().map(|e| e.timestamp).unwrap_or_else(Utc::now)
}

/// Clicks scattered all over the screen instead of on controls.
///
/// Dispersion is the mean distance from the centroid over half the screen
/// diagonal, so clicks spread evenly into all four corners score 1.0.
pub fn detect_random_clicking(
    events: &[InteractionEvent],
    config: &AntiCheatConfig,
) -> Option<CheatIndicator> {
    let threshold = config.random_click_threshold.max(2);
    let clicks: Vec<Position> = events
        .iter()
        .rev()
        .filter(|e| e.kind == InteractionKind::Click)
        .filter_map(|e| e.position)
        .take(RECENT_CLICK_LIMIT.max(threshold))
        .collect();

    if clicks.len() < threshold {
        return None;
    }

    let n = clicks.len() as f64;
    let centroid = Position::new(
        clicks.iter().map(|p| p.x).sum::<f64>() / n,
        clicks.iter().map(|p| p.y).sum::<f64>() / n,
    );
    let mean_distance = clicks.iter().map(|p| p.distance_to(&centroid)).sum::<f64>() / n;
    let dispersion = mean_distance / (SCREEN_DIAGONAL / 2.0);

    if dispersion <= config.dispersion_threshold {
        return None;
    }

    Some(CheatIndicator {
        kind: CheatKind::RandomClicking,
        severity: Severity::Medium,
        timestamp: last_timestamp(events),
        evidence: vec![
            format!("clicks={}", clicks.len()),
            format!("dispersion={dispersion:.3}"),
        ],
    })
}

/// Metronome-like input rhythm over the detection window.
pub fn detect_pattern_automation(
    events: &[InteractionEvent],
    config: &AntiCheatConfig,
) -> Option<CheatIndicator> {
    let window = config.pattern_detection_window.max(3);
    if events.len() < window {
        return None;
    }

    let gaps = intervals(events[events.len() - window..].iter());
    let n = gaps.len() as f64;
    let mean = gaps.iter().sum::<f64>() / n;
    if mean <= 0.0 {
        return None;
    }
    let variance = gaps.iter().map(|g| (g - mean).powi(2)).sum::<f64>() / n;
    let variation = variance.sqrt() / mean;

    if variation >= config.variation_threshold || variance >= config.timing_tolerance.powi(2) {
        return None;
    }

    Some(CheatIndicator {
        kind: CheatKind::PatternAutomation,
        severity: Severity::High,
        timestamp: last_timestamp(events),
        evidence: vec![
            format!("mean_interval_ms={mean:.1}"),
            format!("variance={variance:.2}"),
            format!("coefficient_of_variation={variation:.4}"),
        ],
    })
}

/// Consecutive events closer together than a person can act.
pub fn detect_timing_anomaly(
    events: &[InteractionEvent],
    config: &AntiCheatConfig,
) -> Option<CheatIndicator> {
    let gaps = intervals(events.iter());
    let fastest = gaps.iter().copied().fold(f64::INFINITY, f64::min);
    if !fastest.is_finite() || fastest >= config.min_human_interval_ms {
        return None;
    }

    let offending = gaps.iter().filter(|g| **g < config.min_human_interval_ms).count();
    Some(CheatIndicator {
        kind: CheatKind::TimingAnomaly,
        severity: Severity::Critical,
        timestamp: last_timestamp(events),
        evidence: vec![
            format!("fastest_interval_ms={fastest:.1}"),
            format!("intervals_below_limit={offending}"),
        ],
    })
}
