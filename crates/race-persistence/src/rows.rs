//! Flat CSV row shapes and their mapping onto the canonical domain types.
//!
//! Optional rating columns fall back to defaults here so the simulator only
//! ever sees fully populated entities.

use race_core::{
    Driver, DriverId, Pairing, QualifyingResult, RaceResult, RaceStatus, SafetyWindows, Team,
    TeamId,
};
use serde::{Deserialize, Serialize};

pub const TRACK_COLUMNS: &[&str] = &[
    "round",
    "name",
    "length_km",
    "laps",
    "grip_index",
    "abrasion_index",
    "pit_loss_sec",
    "rain_base_prob",
    "sc_base_prob",
    "vsc_base_prob",
];
pub const TEAM_COLUMNS: &[&str] = &["team_id", "name", "pit_crew"];
pub const DRIVER_COLUMNS: &[&str] = &["driver_id", "team_id", "name", "skill", "tire_mgmt"];
pub const ROSTER_COLUMNS: &[&str] = &["team_id", "driver_slot_1", "driver_slot_2"];
pub const BONUS_COLUMNS: &[&str] = &["driver_id", "bonus_decimal"];
pub const QUALI_COLUMNS: &[&str] = &["round", "team_id", "driver_id", "quali_time_s", "grid_pos"];
pub const RACE_COLUMNS: &[&str] = &[
    "round",
    "team_id",
    "driver_id",
    "grid_pos",
    "total_time_s",
    "fastest_lap_s",
    "pit_stops",
    "status",
    "wet",
    "events_json",
    "pos",
    "points",
];

const DEFAULT_RATING: f64 = 70.0;
const DEFAULT_STRATEGY: f64 = 75.0;
const DEFAULT_AGGRESSION: f64 = 50.0;
const DEFAULT_DEV_SPEED: f64 = 1.0;
const DEFAULT_BUDGET_MUSD: f64 = 120.0;

#[derive(Debug, Deserialize)]
pub(crate) struct TeamRow {
    team_id: String,
    name: String,
    pit_crew: f64,
    #[serde(default)]
    aero: Option<f64>,
    #[serde(default)]
    engine: Option<f64>,
    #[serde(default)]
    reliability: Option<f64>,
    #[serde(default)]
    strategy: Option<f64>,
    #[serde(default)]
    dev_efficiency: Option<f64>,
    #[serde(default)]
    dev_speed: Option<f64>,
    #[serde(default)]
    team_morale: Option<f64>,
    #[serde(default)]
    budget_musd: Option<f64>,
}

impl From<TeamRow> for Team {
    fn from(r: TeamRow) -> Self {
        Team {
            team_id: TeamId(r.team_id.trim().to_string()),
            name: r.name,
            aero: r.aero.unwrap_or(DEFAULT_RATING),
            engine: r.engine.unwrap_or(DEFAULT_RATING),
            reliability: r.reliability.unwrap_or(DEFAULT_RATING),
            pit_crew: r.pit_crew,
            strategy: r.strategy.unwrap_or(DEFAULT_STRATEGY),
            dev_efficiency: r.dev_efficiency.unwrap_or(DEFAULT_RATING),
            dev_speed: r.dev_speed.unwrap_or(DEFAULT_DEV_SPEED),
            team_morale: r.team_morale.unwrap_or(DEFAULT_RATING),
            budget_musd: r.budget_musd.unwrap_or(DEFAULT_BUDGET_MUSD),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DriverRow {
    driver_id: String,
    team_id: String,
    name: String,
    skill: f64,
    tire_mgmt: f64,
    #[serde(default)]
    pace: Option<f64>,
    #[serde(default)]
    consistency: Option<f64>,
    #[serde(default)]
    awareness: Option<f64>,
    #[serde(default)]
    quali: Option<f64>,
    #[serde(default)]
    wet: Option<f64>,
    #[serde(default)]
    aggression: Option<f64>,
}

impl From<DriverRow> for Driver {
    fn from(r: DriverRow) -> Self {
        // pace ratings without a column inherit the overall skill
        Driver {
            driver_id: DriverId(r.driver_id.trim().to_string()),
            team_id: TeamId(r.team_id.trim().to_string()),
            name: r.name,
            skill: r.skill,
            pace: r.pace.unwrap_or(r.skill),
            consistency: r.consistency.unwrap_or(DEFAULT_RATING),
            awareness: r.awareness.unwrap_or(DEFAULT_RATING),
            quali: r.quali.unwrap_or(r.skill),
            wet: r.wet.unwrap_or(r.skill),
            tire_mgmt: r.tire_mgmt,
            aggression: r.aggression.unwrap_or(DEFAULT_AGGRESSION),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RosterRow {
    team_id: String,
    driver_slot_1: String,
    driver_slot_2: String,
}

impl From<RosterRow> for Pairing {
    fn from(r: RosterRow) -> Self {
        Pairing {
            team_id: TeamId(r.team_id.trim().to_string()),
            drivers: [
                DriverId(r.driver_slot_1.trim().to_string()),
                DriverId(r.driver_slot_2.trim().to_string()),
            ],
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct BonusRow {
    // a malformed cell blanks the field instead of failing the file
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub driver_id: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub bonus_decimal: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct QualiRow {
    round: u32,
    team_id: String,
    driver_id: String,
    quali_time_s: f64,
    grid_pos: u32,
}

impl From<&QualifyingResult> for QualiRow {
    fn from(q: &QualifyingResult) -> Self {
        QualiRow {
            round: q.round,
            team_id: q.team_id.0.clone(),
            driver_id: q.driver_id.0.clone(),
            quali_time_s: q.quali_time_s,
            grid_pos: q.grid_pos,
        }
    }
}

impl From<QualiRow> for QualifyingResult {
    fn from(r: QualiRow) -> Self {
        QualifyingResult {
            round: r.round,
            team_id: TeamId(r.team_id),
            driver_id: DriverId(r.driver_id),
            quali_time_s: r.quali_time_s,
            grid_pos: r.grid_pos,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct RaceRow {
    round: u32,
    team_id: String,
    driver_id: String,
    grid_pos: u32,
    total_time_s: Option<f64>,
    fastest_lap_s: Option<f64>,
    pit_stops: u32,
    status: String,
    wet: bool,
    events_json: String,
    pos: u32,
    points: u32,
}

impl RaceRow {
    pub(crate) fn from_result(r: &RaceResult) -> Result<Self, serde_json::Error> {
        Ok(RaceRow {
            round: r.round,
            team_id: r.team_id.0.clone(),
            driver_id: r.driver_id.0.clone(),
            grid_pos: r.grid_pos,
            total_time_s: r.total_time_s,
            fastest_lap_s: r.fastest_lap_s,
            pit_stops: r.pit_stops,
            status: r.status.as_str().to_string(),
            wet: r.wet,
            events_json: r.events.to_json()?,
            pos: r.pos,
            points: r.points,
        })
    }

    pub(crate) fn into_result(self) -> Result<RaceResult, crate::PersistenceError> {
        let status: RaceStatus = self.status.parse()?;
        Ok(RaceResult {
            round: self.round,
            team_id: TeamId(self.team_id),
            driver_id: DriverId(self.driver_id),
            grid_pos: self.grid_pos,
            total_time_s: self.total_time_s,
            fastest_lap_s: self.fastest_lap_s,
            pit_stops: self.pit_stops,
            status,
            wet: self.wet,
            events: SafetyWindows::from_json(&self.events_json)?,
            pos: self.pos,
            points: self.points,
        })
    }
}
