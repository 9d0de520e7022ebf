#![deny(warnings)]

//! Between-round side effects on team and driver attributes.
//!
//! Every applier consumes outcomes that are already resolved to numbers
//! (how they were produced is not this crate's concern) and clips the
//! touched attributes to their ranges. The `*_in_slot` functions load the
//! affected tables of a save slot, apply, and write the tables back.

pub mod rd;

pub use rd::{Area, ProjectProposal, ProjectStatus, RdProject};

use race_core::{Driver, DriverId, Team, TeamId};
use race_persistence::{read_table, write_table, PersistenceError, SaveSlot, CREW_LOG_COLUMNS};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

/// Attribute points granted per unit of realised pit gain factor.
pub const PIT_GAIN_POINTS: f64 = 10.0;
/// Morale points per unit of morale delta.
pub const MORALE_POINTS: f64 = 5.0;
pub const DEV_SPEED_MIN: f64 = 0.8;
pub const DEV_SPEED_MAX: f64 = 1.3;
pub const MORALE_MIN: f64 = -50.0;
pub const MORALE_MAX: f64 = 150.0;

#[derive(Debug, Error)]
pub enum EffectError {
    #[error("team_id={0} not found in teams table")]
    UnknownTeam(TeamId),
    #[error("insufficient budget for {team_id}: needs {needed} MUSD, has {available} MUSD")]
    InsufficientBudget {
        team_id: TeamId,
        needed: Decimal,
        available: Decimal,
    },
    #[error("amount is not representable as money: {0}")]
    InvalidAmount(f64),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Fatigue risk of a training or R&D plan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Risk {
    Low,
    #[default]
    Mid,
    High,
}

impl Risk {
    /// Scale applied to training gains.
    pub fn multiplier(self) -> f64 {
        match self {
            Risk::Low => 1.0,
            Risk::Mid => 0.85,
            Risk::High => 0.7,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Risk::Low => "low",
            Risk::Mid => "mid",
            Risk::High => "high",
        }
    }

    /// Case-insensitive; anything unrecognised counts as `Mid`.
    pub fn from_label(s: &str) -> Risk {
        s.parse().unwrap_or_default()
    }
}

impl FromStr for Risk {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Risk::Low),
            "mid" => Ok(Risk::Mid),
            "high" => Ok(Risk::High),
            _ => Err(()),
        }
    }
}

fn clip(x: f64) -> f64 {
    x.clamp(0.0, 100.0)
}

/// Convert a stored amount to money, rejecting NaN and infinities.
pub(crate) fn money(x: f64) -> Result<Decimal, EffectError> {
    Decimal::from_f64(x).ok_or(EffectError::InvalidAmount(x))
}

/// Take `cost` off a team's budget, rounded to cents.
pub fn charge_budget(team: &mut Team, cost: Decimal) -> Result<(), EffectError> {
    let available = money(team.budget_musd)?;
    if cost > available {
        return Err(EffectError::InsufficientBudget {
            team_id: team.team_id.clone(),
            needed: cost,
            available,
        });
    }
    let left = (available - cost).round_dp(2);
    team.budget_musd = left.to_f64().ok_or(EffectError::InvalidAmount(team.budget_musd))?;
    Ok(())
}

pub(crate) fn team_mut<'a>(teams: &'a mut [Team], id: &TeamId) -> Result<&'a mut Team, EffectError> {
    teams
        .iter_mut()
        .find(|t| &t.team_id == id)
        .ok_or_else(|| EffectError::UnknownTeam(id.clone()))
}

/// A planned crew training block.
#[derive(Clone, Debug, PartialEq)]
pub struct CrewPlan {
    pub title: String,
    pub sessions: u32,
    pub risk: Risk,
    pub cost_musd: f64,
}

/// Realised result of a crew training block.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CrewOutcome {
    /// 0..1
    pub pit_gain_factor: f64,
    pub morale_delta: f64,
    pub incidents: Vec<String>,
    pub narrative: String,
}

/// Raise pit crew skill and shift morale; returns the pit crew delta
/// actually applied after clipping.
///
/// Gains shrink as the crew gets better, never below a fifth of the raw
/// gain.
pub fn apply_crew_training(team: &mut Team, plan: &CrewPlan, outcome: &CrewOutcome) -> f64 {
    let diminishing = (1.0 - team.pit_crew / 130.0).max(0.2);
    let base = outcome.pit_gain_factor
        * (0.35 + 0.25 * (f64::from(plan.sessions) - 1.0))
        * plan.risk.multiplier();
    let before = team.pit_crew;
    team.pit_crew = clip(before + base * PIT_GAIN_POINTS * diminishing);
    team.team_morale = (team.team_morale + outcome.morale_delta * MORALE_POINTS)
        .clamp(MORALE_MIN, MORALE_MAX);
    team.pit_crew - before
}

/// One row of `crew_training_log.csv`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrewLogRow {
    pub ts: String,
    pub round: u32,
    pub team_id: String,
    pub title: String,
    pub sessions: u32,
    pub risk: String,
    pub cost_musd: f64,
    pub pit_gain_applied: f64,
    pub morale_delta: f64,
    pub incidents: String,
    pub narrative: String,
}

/// Charge, apply and log a batch of training blocks for one team.
///
/// The whole batch is charged up front; nothing is written when the budget
/// does not cover it.
pub fn crew_training_in_slot(
    slot: &SaveSlot,
    round: u32,
    team_id: &TeamId,
    blocks: &[(CrewPlan, CrewOutcome)],
    ts: &str,
) -> Result<Vec<CrewLogRow>, EffectError> {
    let mut teams = slot.load_teams()?;
    let team = team_mut(&mut teams, team_id)?;
    let mut total = Decimal::ZERO;
    for (plan, _) in blocks {
        total += money(plan.cost_musd)?;
    }
    charge_budget(team, total)?;

    let mut logs = Vec::with_capacity(blocks.len());
    for (plan, outcome) in blocks {
        let applied = apply_crew_training(team, plan, outcome);
        debug!(team = %team_id, title = %plan.title, applied, "crew training applied");
        logs.push(CrewLogRow {
            ts: ts.to_string(),
            round,
            team_id: team_id.0.clone(),
            title: plan.title.clone(),
            sessions: plan.sessions,
            risk: plan.risk.as_str().to_string(),
            cost_musd: plan.cost_musd,
            pit_gain_applied: (applied * 100.0).round() / 100.0,
            morale_delta: outcome.morale_delta,
            incidents: outcome.incidents.join("; "),
            narrative: outcome.narrative.clone(),
        });
    }
    slot.save_teams(&teams)?;

    let path = slot.crew_log_path();
    let mut all: Vec<CrewLogRow> = if path.exists() {
        read_table(&path, "crew_training_log", CREW_LOG_COLUMNS)?
    } else {
        Vec::new()
    };
    all.extend(logs.iter().cloned());
    write_table(&path, CREW_LOG_COLUMNS, &all)?;
    info!(team = %team_id, round, blocks = logs.len(), "crew training logged");
    Ok(logs)
}

/// Realised HR consequences of one plan.
#[derive(Clone, Debug, PartialEq)]
pub struct HrOutcome {
    /// Drivers affected; empty means the whole team.
    pub target_driver_ids: Vec<DriverId>,
    pub skill_delta: f64,
    pub tire_mgmt_delta: f64,
    pub dev_speed_multiplier: f64,
    pub strategy_delta: f64,
    pub reliability_delta: f64,
}

impl Default for HrOutcome {
    fn default() -> Self {
        Self {
            target_driver_ids: Vec::new(),
            skill_delta: 0.0,
            tire_mgmt_delta: 0.0,
            dev_speed_multiplier: 1.0,
            strategy_delta: 0.0,
            reliability_delta: 0.0,
        }
    }
}

/// Team attributes after HR effects.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HrSummary {
    pub dev_speed: f64,
    pub strategy: f64,
    pub reliability: f64,
}

/// Apply HR outcomes to a team and its drivers.
///
/// Team-level values are recomputed from their pre-batch values for every
/// outcome, so the last outcome decides them. Driver deltas accumulate.
pub fn apply_hr_side_effects(
    teams: &mut [Team],
    drivers: &mut [Driver],
    team_id: &TeamId,
    outcomes: &[HrOutcome],
) -> Result<HrSummary, EffectError> {
    let team = team_mut(teams, team_id)?;
    let dev_before = team.dev_speed;
    let strategy_before = team.strategy;
    let reliability_before = team.reliability;

    for o in outcomes {
        team.dev_speed = (dev_before * o.dev_speed_multiplier).clamp(DEV_SPEED_MIN, DEV_SPEED_MAX);
        team.strategy = clip(strategy_before + o.strategy_delta);
        team.reliability = clip(reliability_before + o.reliability_delta);

        let targeted = drivers.iter_mut().filter(|d| {
            &d.team_id == team_id
                && (o.target_driver_ids.is_empty() || o.target_driver_ids.contains(&d.driver_id))
        });
        for d in targeted {
            d.skill = clip(d.skill + o.skill_delta);
            d.tire_mgmt = clip(d.tire_mgmt + o.tire_mgmt_delta);
        }
    }
    Ok(HrSummary {
        dev_speed: team.dev_speed,
        strategy: team.strategy,
        reliability: team.reliability,
    })
}

/// HR effects read from and written back to a save slot.
pub fn hr_side_effects_in_slot(
    slot: &SaveSlot,
    team_id: &TeamId,
    outcomes: &[HrOutcome],
) -> Result<HrSummary, EffectError> {
    let mut teams = slot.load_teams()?;
    let mut drivers = slot.load_drivers()?;
    let summary = apply_hr_side_effects(&mut teams, &mut drivers, team_id, outcomes)?;
    slot.save_teams(&teams)?;
    slot.save_drivers(&drivers)?;
    info!(team = %team_id, ?summary, "hr side effects applied");
    Ok(summary)
}

#[cfg(test)]
pub(crate) mod testutil {
    use race_persistence::SaveSlot;
    use std::fs;
    use std::path::Path;

    pub const TEAMS: &str = "team_id,name,aero,engine,reliability,pit_crew,strategy,dev_efficiency,budget_musd\n\
FER,Ferrari,86,88,75,78,72,80,120\n\
MCL,McLaren,88,84,70,80,76,70,15.5\n";
    pub const DRIVERS: &str = "driver_id,team_id,name,skill,tire_mgmt\n\
LEC,FER,Leclerc,91,80\n\
SAI,FER,Sainz,88,83\n\
NOR,MCL,Norris,90,82\n\
PIA,MCL,Piastri,87,84\n";

    pub fn slot(dir: &Path) -> SaveSlot {
        fs::write(dir.join("teams.csv"), TEAMS).unwrap();
        fs::write(dir.join("drivers.csv"), DRIVERS).unwrap();
        SaveSlot::open(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn team(pit_crew: f64) -> Team {
        Team {
            team_id: TeamId::from("FER"),
            name: "Ferrari".into(),
            aero: 86.0,
            engine: 88.0,
            reliability: 75.0,
            pit_crew,
            strategy: 72.0,
            dev_efficiency: 80.0,
            dev_speed: 1.0,
            team_morale: 70.0,
            budget_musd: 120.0,
        }
    }

    fn plan(sessions: u32, risk: Risk) -> CrewPlan {
        CrewPlan {
            title: "Pit drills".into(),
            sessions,
            risk,
            cost_musd: 2.0,
        }
    }

    #[test]
    fn training_gain_matches_formula() {
        let mut t = team(65.0);
        let outcome = CrewOutcome {
            pit_gain_factor: 0.8,
            morale_delta: 1.5,
            ..CrewOutcome::default()
        };
        let applied = apply_crew_training(&mut t, &plan(3, Risk::Low), &outcome);
        // 0.8 * 0.85 * 1.0 * 10 * 0.5
        assert!((applied - 3.4).abs() < 1e-9);
        assert!((t.pit_crew - 68.4).abs() < 1e-9);
        assert_eq!(t.team_morale, 77.5);
    }

    #[test]
    fn gains_diminish_but_keep_a_floor() {
        let outcome = CrewOutcome {
            pit_gain_factor: 1.0,
            ..CrewOutcome::default()
        };
        let mut strong = team(99.0);
        let mut weak = team(40.0);
        let a = apply_crew_training(&mut strong, &plan(1, Risk::High), &outcome);
        let b = apply_crew_training(&mut weak, &plan(1, Risk::High), &outcome);
        assert!(a < b);
        // floor: 1.0 * 0.35 * 0.7 * 10 * 0.2
        assert!(a > 0.49);
        let mut maxed = team(100.0);
        let c = apply_crew_training(&mut maxed, &plan(1, Risk::High), &outcome);
        assert_eq!(c, 0.0);
        assert_eq!(maxed.pit_crew, 100.0);
    }

    #[test]
    fn risk_labels_fall_back_to_mid() {
        assert_eq!(Risk::from_label("HIGH"), Risk::High);
        assert_eq!(Risk::from_label(" low"), Risk::Low);
        assert_eq!(Risk::from_label("extreme"), Risk::Mid);
        assert_eq!(Risk::from_label("").multiplier(), 0.85);
    }

    #[test]
    fn budget_is_charged_to_the_cent() {
        let mut t = team(70.0);
        t.budget_musd = 10.1;
        charge_budget(&mut t, Decimal::new(333, 2)).unwrap();
        assert_eq!(t.budget_musd, 6.77);
        let err = charge_budget(&mut t, Decimal::new(7, 0)).unwrap_err();
        assert!(matches!(err, EffectError::InsufficientBudget { .. }));
        assert_eq!(t.budget_musd, 6.77);
    }

    #[test]
    fn hr_effects_target_drivers_and_clip() {
        let dir = tempfile::tempdir().unwrap();
        let slot = testutil::slot(dir.path());
        let mut teams = slot.load_teams().unwrap();
        let mut drivers = slot.load_drivers().unwrap();
        let outcomes = vec![
            HrOutcome {
                target_driver_ids: vec![DriverId::from("LEC")],
                skill_delta: 12.0,
                tire_mgmt_delta: -3.0,
                dev_speed_multiplier: 1.5,
                strategy_delta: 4.0,
                ..HrOutcome::default()
            },
            HrOutcome {
                skill_delta: 1.0,
                dev_speed_multiplier: 1.1,
                reliability_delta: 50.0,
                ..HrOutcome::default()
            },
        ];
        let s = apply_hr_side_effects(&mut teams, &mut drivers, &TeamId::from("FER"), &outcomes)
            .unwrap();
        assert!((s.dev_speed - 1.1).abs() < 1e-9);
        assert_eq!(s.strategy, 72.0);
        assert_eq!(s.reliability, 100.0);
        let lec = drivers.iter().find(|d| d.driver_id.0 == "LEC").unwrap();
        let sai = drivers.iter().find(|d| d.driver_id.0 == "SAI").unwrap();
        let nor = drivers.iter().find(|d| d.driver_id.0 == "NOR").unwrap();
        assert_eq!(lec.skill, 100.0);
        assert_eq!(lec.tire_mgmt, 77.0);
        assert_eq!(sai.skill, 89.0);
        assert_eq!(nor.skill, 90.0);
    }

    #[test]
    fn hr_effects_reject_unknown_team() {
        let mut teams = vec![team(70.0)];
        let err = apply_hr_side_effects(&mut teams, &mut [], &TeamId::from("XXX"), &[]).unwrap_err();
        assert!(err.to_string().contains("team_id=XXX"));
    }

    #[test]
    fn crew_training_in_slot_charges_and_logs() {
        let dir = tempfile::tempdir().unwrap();
        let slot = testutil::slot(dir.path());
        let blocks = vec![
            (
                plan(2, Risk::Mid),
                CrewOutcome {
                    pit_gain_factor: 0.5,
                    morale_delta: -1.0,
                    incidents: vec!["sprain".into(), "late jack".into()],
                    narrative: "tough week".into(),
                },
            ),
            (plan(1, Risk::Low), CrewOutcome::default()),
        ];
        let id = TeamId::from("FER");
        let logs = crew_training_in_slot(&slot, 3, &id, &blocks, "2025-04-01T10:00:00").unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].incidents, "sprain; late jack");

        let teams = slot.load_teams().unwrap();
        let fer = teams.iter().find(|t| t.team_id == id).unwrap();
        assert_eq!(fer.budget_musd, 116.0);
        assert!(fer.pit_crew > 78.0);
        assert_eq!(fer.team_morale, 65.0);

        crew_training_in_slot(&slot, 4, &id, &blocks[1..], "2025-04-08T10:00:00").unwrap();
        let all: Vec<CrewLogRow> =
            read_table(&slot.crew_log_path(), "crew_training_log", CREW_LOG_COLUMNS).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].round, 4);
    }

    #[test]
    fn unaffordable_training_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let slot = testutil::slot(dir.path());
        let before = std::fs::read_to_string(slot.teams_path()).unwrap();
        let mut expensive = plan(1, Risk::Low);
        expensive.cost_musd = 50.0;
        let err = crew_training_in_slot(
            &slot,
            1,
            &TeamId::from("MCL"),
            &[(expensive, CrewOutcome::default())],
            "ts",
        )
        .unwrap_err();
        assert!(matches!(err, EffectError::InsufficientBudget { .. }));
        assert_eq!(std::fs::read_to_string(slot.teams_path()).unwrap(), before);
        assert!(!slot.crew_log_path().exists());
    }

    proptest! {
        #[test]
        fn training_stays_in_range(
            pit in 0.0f64..=100.0,
            morale in -50.0f64..=150.0,
            factor in 0.0f64..=1.0,
            morale_delta in -20.0f64..20.0,
            sessions in 1u32..6,
        ) {
            let mut t = team(pit);
            t.team_morale = morale;
            let outcome = CrewOutcome { pit_gain_factor: factor, morale_delta, ..CrewOutcome::default() };
            let applied = apply_crew_training(&mut t, &plan(sessions, Risk::Mid), &outcome);
            prop_assert!(applied >= 0.0);
            prop_assert!((0.0..=100.0).contains(&t.pit_crew));
            prop_assert!((MORALE_MIN..=MORALE_MAX).contains(&t.team_morale));
        }
    }
}
