//! Race incident sampling: safety periods, rain and mechanical failures.

use crate::norm;
use race_core::{Driver, LapRange, LapWindow, SafetyWindows, SimConfig, Team};
use rand::Rng;

/// Independent trials per safety period kind.
const TRIALS_PER_KIND: usize = 2;

/// First lap on which a safety period may begin.
const EARLIEST_START: u32 = 5;

/// Bounds of the whole-race failure probability.
pub const DNF_PROB_MIN: f64 = 0.001;
pub const DNF_PROB_MAX: f64 = 0.30;

fn sample_kind<R: Rng + ?Sized>(
    rng: &mut R,
    total_laps: u32,
    p: f64,
    durations: LapRange,
) -> Vec<LapWindow> {
    let mut out = Vec::new();
    for _ in 0..TRIALS_PER_KIND {
        if rng.gen::<f64>() >= p {
            continue;
        }
        let length = rng.gen_range(durations.min..=durations.max);
        let latest = total_laps.saturating_sub(5).max(EARLIEST_START);
        let start = rng.gen_range(EARLIEST_START..=latest).min(total_laps);
        let end = total_laps.min(start + length);
        out.push(LapWindow(start, end));
    }
    out
}

/// Draw the safety car and virtual safety car windows of a race.
///
/// Each kind gets up to two windows; windows may overlap.
pub fn sample_safety_periods<R: Rng + ?Sized>(
    rng: &mut R,
    cfg: &SimConfig,
    total_laps: u32,
    p_sc: f64,
    p_vsc: f64,
) -> SafetyWindows {
    let sc = sample_kind(rng, total_laps, p_sc, cfg.sc_laps);
    let vsc = sample_kind(rng, total_laps, p_vsc, cfg.vsc_laps);
    SafetyWindows { sc, vsc }
}

/// Single Bernoulli draw for a wet race.
pub fn rain_flag<R: Rng + ?Sized>(rng: &mut R, p_rain: f64) -> bool {
    rng.gen::<f64>() < p_rain
}

/// Probability that a car fails at some point of the race.
pub fn dnf_probability(cfg: &SimConfig, driver: &Driver, team: &Team) -> f64 {
    let p = cfg.base_dnf + cfg.rel_risk * (1.0 - norm(team.reliability))
        + cfg.agg_risk * norm(driver.aggression)
        - cfg.aware_safe * norm(driver.awareness);
    p.clamp(DNF_PROB_MIN, DNF_PROB_MAX)
}

/// Whole-race failure flag, drawn once per driver.
pub fn dnf_flag<R: Rng + ?Sized>(rng: &mut R, cfg: &SimConfig, driver: &Driver, team: &Team) -> bool {
    rng.gen::<f64>() < dnf_probability(cfg, driver, team)
}
