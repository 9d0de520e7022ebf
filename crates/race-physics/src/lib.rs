#![deny(warnings)]

//! Lap time physics for the race simulator.
//!
//! This crate provides the formulas that turn track and entrant ratings into
//! times:
//! - Reference lap time from circuit length
//! - Performance scalar of a driver/team combination
//! - Noisy lap time from performance
//! - Tire stint degradation multiplier and pit stop loss
//!
//! The stochastic event sampler lives in [`events`].

pub mod events;

use race_core::{Compound, Driver, SimConfig, Team, MAX_BOOSTED_PERF};
use rand::Rng;
use rand_distr::StandardNormal;
use thiserror::Error;

/// Errors produced by physics helpers.
#[derive(Debug, Error, PartialEq)]
pub enum PhysicsError {
    /// Noise standard deviation must be finite and >= 0.
    #[error("invalid noise standard deviation: {0}")]
    InvalidNoise(f64),
    /// Track length must be finite and > 0.
    #[error("invalid track length: {0} km")]
    InvalidLength(f64),
}

/// Session context of a performance evaluation. Qualifying is always dry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PerfMode {
    Qualifying,
    Race { wet: bool },
}

#[inline]
pub(crate) fn norm(x: f64) -> f64 {
    x / 100.0
}

/// Reference lap time in seconds: lap length in metres over the reference
/// speed in m/s.
///
/// Example:
/// let s = ref_lap_time(&SimConfig::default(), 5.0).unwrap();
/// assert!((s - 83.72).abs() < 0.01);
pub fn ref_lap_time(cfg: &SimConfig, length_km: f64) -> Result<f64, PhysicsError> {
    if !(length_km.is_finite() && length_km > 0.0) {
        return Err(PhysicsError::InvalidLength(length_km));
    }
    Ok(length_km * 1000.0 / (cfg.vref_kmh / 3.6))
}

/// Composite [0,1] ability of a driver in a given car on a given surface.
pub fn perf_scalar(driver: &Driver, team: &Team, mode: PerfMode, grip_idx: f64) -> f64 {
    let team_perf = 0.5 * norm(team.aero) + 0.5 * norm(team.engine);
    let d_base =
        0.6 * norm(driver.pace) + 0.2 * norm(driver.consistency) + 0.2 * norm(driver.awareness);
    let d_adj = match mode {
        PerfMode::Qualifying => 0.6 * norm(driver.quali) + 0.4 * d_base,
        PerfMode::Race { wet } => {
            let w = if wet { 0.5 } else { 0.2 };
            (1.0 - w) * d_base + w * norm(driver.wet)
        }
    };
    let g_bonus = (grip_idx - 0.5) * 0.2;
    (0.5 * team_perf + 0.5 * d_adj + g_bonus).clamp(0.0, 1.0)
}

/// Apply the pre-race bonus multiplicatively, clamped to [0, 1.2].
pub fn boosted_perf(perf: f64, bonus: f64) -> f64 {
    (perf * (1.0 + bonus)).clamp(0.0, MAX_BOOSTED_PERF)
}

/// Lap time in seconds for a performance level, with Gaussian noise of mean 1
/// and standard deviation `noise_std`. Never negative.
pub fn lap_time_from_perf<R: Rng + ?Sized>(
    rng: &mut R,
    cfg: &SimConfig,
    ref_s: f64,
    perf: f64,
    grip_idx: f64,
    wet: bool,
    noise_std: f64,
) -> Result<f64, PhysicsError> {
    if !(noise_std.is_finite() && noise_std >= 0.0) {
        return Err(PhysicsError::InvalidNoise(noise_std));
    }
    let mut base = ref_s * (1.0 - cfg.alpha_pace * perf + cfg.beta_grip * (1.0 - grip_idx));
    if wet {
        base *= 1.0 + cfg.gamma_wet;
    }
    let z: f64 = rng.sample(StandardNormal);
    base *= 1.0 + noise_std * z;
    Ok(base.max(0.0))
}

/// Average pace multiplier (>= 1) of a stint on `compound`.
pub fn stint_multiplier(cfg: &SimConfig, compound: Compound, abrasion_idx: f64, tire_mgmt: f64) -> f64 {
    let base_deg = cfg.base_deg.rate(compound) * (0.5 + 0.9 * abrasion_idx);
    let mg = (100.0 - tire_mgmt) / 100.0;
    1.0 + base_deg * (1.0 + 0.6 * mg)
}

/// Time lost to a pit stop; discounted under safety car, worse with a weak crew.
pub fn pit_loss_sec(track_pit_loss: f64, sc_active: bool, pit_crew: f64) -> f64 {
    let crew_bonus = (100.0 - pit_crew) / 100.0;
    let sc_discount = if sc_active { 0.75 } else { 1.0 };
    track_pit_loss * sc_discount * (1.0 + 0.06 * crew_bonus)
}
