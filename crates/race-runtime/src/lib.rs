#![deny(warnings)]

//! Round orchestration: qualifying, race and classification.
//!
//! A [`SimContext`] owns the tuning and the random source for one
//! "simulate round" invocation and is threaded by reference through every
//! stochastic step, so a fresh context seeded identically replays the same
//! round bit for bit.

mod qualifying;
mod race;

pub use qualifying::run_qualifying;
pub use race::{classify, incident_factor, run_race, RaceConditions};

use race_core::{
    validate_config, BonusMap, QualifyingResult, RaceResult, RoundData, SimConfig, ValidationError,
};
use race_persistence::{PersistenceError, SaveSlot};
use race_physics::PhysicsError;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Physics(#[from] PhysicsError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Tuning plus the single random source of a simulation run.
pub struct SimContext<R: Rng = ChaCha8Rng> {
    cfg: SimConfig,
    rng: R,
}

impl SimContext<ChaCha8Rng> {
    /// Context seeded from `cfg.rng_seed`.
    pub fn new(cfg: SimConfig) -> Result<Self, SimError> {
        let rng = ChaCha8Rng::seed_from_u64(cfg.rng_seed);
        Self::with_rng(cfg, rng)
    }
}

impl<R: Rng> SimContext<R> {
    /// Context drawing from a caller-supplied random source.
    pub fn with_rng(cfg: SimConfig, rng: R) -> Result<Self, SimError> {
        validate_config(&cfg)?;
        Ok(Self { cfg, rng })
    }

    pub fn config(&self) -> &SimConfig {
        &self.cfg
    }
}

/// Both session tables of a round.
#[derive(Clone, Debug, PartialEq)]
pub struct RoundOutcome {
    pub qualifying: Vec<QualifyingResult>,
    pub race: Vec<RaceResult>,
}

/// Qualifying followed by a race started from its grid.
pub fn simulate_round<R: Rng>(
    ctx: &mut SimContext<R>,
    round: &RoundData,
    bonus: &BonusMap,
) -> Result<RoundOutcome, SimError> {
    let qualifying = run_qualifying(ctx, round, bonus)?;
    let race = run_race(ctx, round, bonus, &qualifying)?;
    Ok(RoundOutcome { qualifying, race })
}

/// Run and persist qualifying for a round of a save slot.
pub fn qualifying_in_slot<R: Rng>(
    ctx: &mut SimContext<R>,
    slot: &SaveSlot,
    round_no: u32,
) -> Result<Vec<QualifyingResult>, SimError> {
    let round = slot.load_round(round_no)?;
    let bonus = slot.load_bonus_map(round_no);
    let rows = run_qualifying(ctx, &round, &bonus)?;
    let path = slot.write_qualifying(round_no, &rows)?;
    info!(round = round_no, path = %path.display(), "qualifying saved");
    Ok(rows)
}

/// Run and persist the race of a round.
///
/// Without an explicit grid the persisted qualifying table is used, and
/// qualifying is run first when none exists yet.
pub fn race_in_slot<R: Rng>(
    ctx: &mut SimContext<R>,
    slot: &SaveSlot,
    round_no: u32,
    grid: Option<Vec<QualifyingResult>>,
) -> Result<Vec<RaceResult>, SimError> {
    let grid = match grid {
        Some(g) => g,
        None => match slot.read_qualifying(round_no)? {
            Some(g) => g,
            None => qualifying_in_slot(ctx, slot, round_no)?,
        },
    };
    let round = slot.load_round(round_no)?;
    let bonus = slot.load_bonus_map(round_no);
    let rows = run_race(ctx, &round, &bonus, &grid)?;
    let path = slot.write_race(round_no, &rows)?;
    info!(round = round_no, path = %path.display(), "race saved");
    Ok(rows)
}

/// Qualifying then race for a save slot round, both persisted.
pub fn simulate_round_in_slot<R: Rng>(
    ctx: &mut SimContext<R>,
    slot: &SaveSlot,
    round_no: u32,
) -> Result<RoundOutcome, SimError> {
    let qualifying = qualifying_in_slot(ctx, slot, round_no)?;
    let race = race_in_slot(ctx, slot, round_no, Some(qualifying.clone()))?;
    Ok(RoundOutcome { qualifying, race })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use race_core::{Driver, DriverId, Pairing, RoundData, Team, TeamId, Track};

    pub fn track(laps: u32, abrasion: f64) -> Track {
        Track {
            round: 4,
            name: "Suzuka".to_string(),
            length_km: 5.807,
            laps,
            grip_index: 0.65,
            abrasion_index: abrasion,
            pit_loss_sec: 22.0,
            rain_base_prob: 0.3,
            sc_base_prob: 0.4,
            vsc_base_prob: 0.4,
        }
    }

    /// `teams` identical-ish teams, two drivers each; ratings fall with the index.
    pub fn round(teams: usize, track: Track) -> RoundData {
        round_with_risk(teams, track, 80.0, 40.0, 75.0)
    }

    /// Like [`round`], with every car sharing the given failure-relevant ratings.
    pub fn round_with_risk(
        teams: usize,
        track: Track,
        reliability: f64,
        aggression: f64,
        awareness: f64,
    ) -> RoundData {
        let mut ts = Vec::new();
        let mut ds = Vec::new();
        let mut ps = Vec::new();
        for i in 0..teams {
            let tid = format!("T{i:02}");
            let rating = 95.0 - 3.0 * i as f64;
            ts.push(Team {
                team_id: TeamId(tid.clone()),
                name: format!("Team {i}"),
                aero: rating,
                engine: rating,
                reliability,
                pit_crew: 75.0,
                strategy: 75.0,
                dev_efficiency: 70.0,
                dev_speed: 1.0,
                team_morale: 70.0,
                budget_musd: 100.0,
            });
            let mut pair = Vec::new();
            for k in 0..2 {
                let did = format!("D{i:02}{k}");
                ds.push(Driver {
                    driver_id: DriverId(did.clone()),
                    team_id: TeamId(tid.clone()),
                    name: did.clone(),
                    skill: rating,
                    pace: rating,
                    consistency: 75.0,
                    awareness,
                    quali: rating,
                    wet: rating - 5.0,
                    tire_mgmt: 70.0,
                    aggression,
                });
                pair.push(DriverId(did));
            }
            ps.push(Pairing {
                team_id: TeamId(tid),
                drivers: [pair[0].clone(), pair[1].clone()],
            });
        }
        RoundData::new(track, ts, ds, ps).unwrap()
    }
}
