#![deny(warnings)]

//! Core domain model for the Grid Boss race weekend simulator.
//!
//! This crate defines the serializable entities read at the start of a round
//! (tracks, teams, drivers, roster pairings), the result rows produced by the
//! simulation, the tuning configuration, and validation helpers that turn bad
//! inputs into descriptive configuration errors.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Points awarded to the top ten finishers, in classification order.
pub const POINTS_TABLE: [u32; 10] = [25, 18, 15, 12, 10, 8, 6, 4, 2, 1];

/// Upper bound of the pre-race minigame bonus (5%).
pub const MAX_PRE_RACE_BONUS: f64 = 0.05;

/// Upper bound of the bonus-adjusted performance scalar.
pub const MAX_BOOSTED_PERF: f64 = 1.2;

/// Unique identifier for a team, e.g. "RBR".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TeamId(pub String);

/// Unique identifier for a driver, e.g. "VER".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DriverId(pub String);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for DriverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TeamId {
    fn from(s: &str) -> Self {
        TeamId(s.to_string())
    }
}

impl From<&str> for DriverId {
    fn from(s: &str) -> Self {
        DriverId(s.to_string())
    }
}

/// A circuit hosting one round of the championship.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Round number (unique, > 0).
    pub round: u32,
    /// Circuit name.
    pub name: String,
    /// Lap length in km (> 0).
    pub length_km: f64,
    /// Race distance in laps (> 0).
    pub laps: u32,
    /// Grip in [0,1]; higher is faster.
    pub grip_index: f64,
    /// Tire wear severity in [0,1].
    pub abrasion_index: f64,
    /// Fixed pit lane time cost in seconds (>= 0).
    pub pit_loss_sec: f64,
    /// Probability of a wet race.
    pub rain_base_prob: f64,
    /// Per-trial probability of a safety car.
    pub sc_base_prob: f64,
    /// Per-trial probability of a virtual safety car.
    pub vsc_base_prob: f64,
}

/// A constructor with car and operational ratings (0..100 unless noted).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Team {
    /// Unique team id.
    pub team_id: TeamId,
    /// Display name.
    pub name: String,
    /// Aerodynamic performance.
    pub aero: f64,
    /// Power unit performance.
    pub engine: f64,
    /// Mechanical reliability; low values raise the retirement risk.
    pub reliability: f64,
    /// Pit crew quality; scales the stop time.
    pub pit_crew: f64,
    /// Strategy department rating.
    pub strategy: f64,
    /// R&D conversion efficiency (0..100).
    pub dev_efficiency: f64,
    /// Development speed multiplier, nominally [0.8, 1.3].
    pub dev_speed: f64,
    /// Morale, roughly [-50, 150].
    pub team_morale: f64,
    /// Available budget in millions of USD (>= 0).
    pub budget_musd: f64,
}

/// A race driver with skill ratings in [0,100].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    /// Unique driver id.
    pub driver_id: DriverId,
    /// Team the driver races for.
    pub team_id: TeamId,
    /// Display name.
    pub name: String,
    /// Overall rating, used as the fallback for missing pace ratings.
    pub skill: f64,
    /// Raw race pace.
    pub pace: f64,
    /// Lap-to-lap consistency.
    pub consistency: f64,
    /// Racecraft; lowers the retirement risk.
    pub awareness: f64,
    /// Single-lap pace.
    pub quali: f64,
    /// Wet-weather pace.
    pub wet: f64,
    /// Tire management; softens stint degradation.
    pub tire_mgmt: f64,
    /// Aggression; raises the retirement risk.
    pub aggression: f64,
}

/// The two drivers entered by a team for one round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pairing {
    pub team_id: TeamId,
    /// Both race seats, in roster order.
    pub drivers: [DriverId; 2],
}

/// Tire compounds, softest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Compound {
    #[serde(rename = "S")]
    Soft,
    #[serde(rename = "M")]
    Medium,
    #[serde(rename = "H")]
    Hard,
}

impl Compound {
    pub const ALL: [Compound; 3] = [Compound::Soft, Compound::Medium, Compound::Hard];

    /// Single-letter code used in tables.
    pub fn code(self) -> &'static str {
        match self {
            Compound::Soft => "S",
            Compound::Medium => "M",
            Compound::Hard => "H",
        }
    }
}

impl FromStr for Compound {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "S" | "SOFT" => Ok(Compound::Soft),
            "M" | "MEDIUM" => Ok(Compound::Medium),
            "H" | "HARD" => Ok(Compound::Hard),
            other => Err(ValidationError::UnknownCompound(other.to_string())),
        }
    }
}

/// Inclusive lap window `[start, end]` of a safety period.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LapWindow(pub u32, pub u32);

impl LapWindow {
    pub fn start(&self) -> u32 {
        self.0
    }

    pub fn end(&self) -> u32 {
        self.1
    }

    pub fn contains(&self, lap: u32) -> bool {
        self.0 <= lap && lap <= self.1
    }
}

/// True when `lap` falls inside any of the windows.
pub fn is_in_any(lap: u32, windows: &[LapWindow]) -> bool {
    windows.iter().any(|w| w.contains(lap))
}

/// Safety car and virtual safety car windows of one race.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyWindows {
    #[serde(rename = "SC")]
    pub sc: Vec<LapWindow>,
    #[serde(rename = "VSC")]
    pub vsc: Vec<LapWindow>,
}

impl SafetyWindows {
    pub fn sc_active(&self, lap: u32) -> bool {
        is_in_any(lap, &self.sc)
    }

    pub fn vsc_active(&self, lap: u32) -> bool {
        is_in_any(lap, &self.vsc)
    }

    /// Compact JSON form, e.g. `{"SC":[[12,15]],"VSC":[]}`.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Classification status of a race entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceStatus {
    Finished,
    #[serde(rename = "DNF")]
    Dnf,
}

impl RaceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RaceStatus::Finished => "Finished",
            RaceStatus::Dnf => "DNF",
        }
    }
}

impl FromStr for RaceStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Finished" => Ok(RaceStatus::Finished),
            "DNF" => Ok(RaceStatus::Dnf),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

/// One qualifying row; `grid_pos` is 1-based.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QualifyingResult {
    pub round: u32,
    pub team_id: TeamId,
    pub driver_id: DriverId,
    /// Single-lap time in seconds.
    pub quali_time_s: f64,
    /// Starting position, 1 for the fastest lap.
    pub grid_pos: u32,
}

/// One race classification row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    /// Round the row belongs to.
    pub round: u32,
    pub team_id: TeamId,
    pub driver_id: DriverId,
    /// Starting position from qualifying.
    pub grid_pos: u32,
    /// Race time including pit losses; present only for finishers.
    pub total_time_s: Option<f64>,
    /// None when no lap was completed.
    pub fastest_lap_s: Option<f64>,
    /// Stops actually made before finishing or retiring.
    pub pit_stops: u32,
    pub status: RaceStatus,
    /// Whether the race ran in the wet; same for every row.
    pub wet: bool,
    /// Safety periods of the race; same for every row.
    pub events: SafetyWindows,
    /// Classified position, 1-based.
    pub pos: u32,
    /// Championship points; zero outside the top ten finishers.
    pub points: u32,
}

/// Points for a 1-based classified position, given how many cars finished.
pub fn points_for(pos: u32, finishers: usize) -> u32 {
    let idx = pos as usize;
    if idx == 0 || idx > finishers {
        return 0;
    }
    POINTS_TABLE.get(idx - 1).copied().unwrap_or(0)
}

/// Per-driver pre-race bonus, clamped to [0, MAX_PRE_RACE_BONUS] on insert.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BonusMap {
    bonuses: BTreeMap<DriverId, f64>,
}

impl BonusMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-finite values are ignored.
    pub fn insert(&mut self, driver: DriverId, bonus: f64) {
        if bonus.is_finite() {
            self.bonuses
                .insert(driver, bonus.clamp(0.0, MAX_PRE_RACE_BONUS));
        }
    }

    pub fn get(&self, driver: &DriverId) -> f64 {
        self.bonuses.get(driver).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.bonuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bonuses.is_empty()
    }
}

/// Inclusive range of safety period durations, in laps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LapRange {
    pub min: u32,
    pub max: u32,
}

/// Base degradation rate per compound.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DegradationTable {
    pub soft: f64,
    pub medium: f64,
    pub hard: f64,
}

impl DegradationTable {
    pub fn rate(&self, compound: Compound) -> f64 {
        match compound {
            Compound::Soft => self.soft,
            Compound::Medium => self.medium,
            Compound::Hard => self.hard,
        }
    }
}

impl Default for DegradationTable {
    fn default() -> Self {
        Self {
            soft: 0.010,
            medium: 0.006,
            hard: 0.004,
        }
    }
}

/// Tuning knobs of the simulator. Every field falls back to the reference
/// tuning when absent from a config file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed for the deterministic RNG.
    pub rng_seed: u64,
    /// Reference average speed in km/h.
    pub vref_kmh: f64,
    /// Lap time sensitivity to performance.
    pub alpha_pace: f64,
    /// Lap time sensitivity to missing grip.
    pub beta_grip: f64,
    /// Wet lap time penalty.
    pub gamma_wet: f64,
    /// Relative lap noise in qualifying.
    pub quali_noise: f64,
    /// Relative lap noise in the race.
    pub race_noise: f64,
    /// Per-compound degradation rates.
    pub base_deg: DegradationTable,
    /// Abrasion threshold between one-stop and two-stop plans.
    pub abr_split: f64,
    /// Baseline retirement probability.
    pub base_dnf: f64,
    /// Retirement risk removed by full awareness.
    pub aware_safe: f64,
    /// Retirement risk added by full aggression.
    pub agg_risk: f64,
    /// Retirement risk added by zero reliability.
    pub rel_risk: f64,
    /// Pace multiplier under safety car (lap time divided by it).
    pub sc_factor: f64,
    /// Pace multiplier under virtual safety car.
    pub vsc_factor: f64,
    /// Safety car duration bounds.
    pub sc_laps: LapRange,
    /// Virtual safety car duration bounds.
    pub vsc_laps: LapRange,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            rng_seed: 2025,
            vref_kmh: 215.0,
            alpha_pace: 0.22,
            beta_grip: 0.06,
            gamma_wet: 0.05,
            quali_noise: 0.003,
            race_noise: 0.002,
            base_deg: DegradationTable::default(),
            abr_split: 0.65,
            base_dnf: 0.004,
            aware_safe: 0.25,
            agg_risk: 0.20,
            rel_risk: 0.35,
            sc_factor: 0.60,
            vsc_factor: 0.75,
            sc_laps: LapRange { min: 3, max: 5 },
            vsc_laps: LapRange { min: 1, max: 3 },
        }
    }
}

impl SimConfig {
    /// Same tuning with a different seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = seed;
        self
    }
}

/// Validation errors for inputs and configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Requested round is absent from the track table.
    #[error("invalid round={0}: not present in track table")]
    RoundNotFound(u32),
    /// A team needs two resolvable drivers to race.
    #[error("team {team_id}: fewer than two drivers ({found} found)")]
    TeamUnderstaffed { team_id: String, found: usize },
    #[error("unknown team: {0}")]
    UnknownTeam(String),
    #[error("unknown driver: {0}")]
    UnknownDriver(String),
    #[error("duplicate id: {0}")]
    DuplicateId(String),
    #[error("unknown tire compound: {0}")]
    UnknownCompound(String),
    #[error("unknown race status: {0}")]
    UnknownStatus(String),
    /// Numeric field must be finite and within its documented range.
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

fn check_range(field: &'static str, value: f64, lo: f64, hi: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < lo || value > hi {
        return Err(ValidationError::OutOfRange { field, value });
    }
    Ok(())
}

/// Validate a track row.
pub fn validate_track(t: &Track) -> Result<(), ValidationError> {
    if t.round == 0 {
        return Err(ValidationError::OutOfRange {
            field: "round",
            value: 0.0,
        });
    }
    if !(t.length_km.is_finite() && t.length_km > 0.0) {
        return Err(ValidationError::OutOfRange {
            field: "length_km",
            value: t.length_km,
        });
    }
    if t.laps == 0 {
        return Err(ValidationError::OutOfRange {
            field: "laps",
            value: 0.0,
        });
    }
    check_range("grip_index", t.grip_index, 0.0, 1.0)?;
    check_range("abrasion_index", t.abrasion_index, 0.0, 1.0)?;
    check_range("pit_loss_sec", t.pit_loss_sec, 0.0, f64::MAX)?;
    check_range("rain_base_prob", t.rain_base_prob, 0.0, 1.0)?;
    check_range("sc_base_prob", t.sc_base_prob, 0.0, 1.0)?;
    check_range("vsc_base_prob", t.vsc_base_prob, 0.0, 1.0)?;
    Ok(())
}

/// Validate the tuning configuration.
pub fn validate_config(c: &SimConfig) -> Result<(), ValidationError> {
    check_range("vref_kmh", c.vref_kmh, f64::MIN_POSITIVE, f64::MAX)?;
    for (field, v) in [
        ("alpha_pace", c.alpha_pace),
        ("beta_grip", c.beta_grip),
        ("gamma_wet", c.gamma_wet),
        ("quali_noise", c.quali_noise),
        ("race_noise", c.race_noise),
        ("base_deg.soft", c.base_deg.soft),
        ("base_deg.medium", c.base_deg.medium),
        ("base_deg.hard", c.base_deg.hard),
        ("aware_safe", c.aware_safe),
        ("agg_risk", c.agg_risk),
        ("rel_risk", c.rel_risk),
    ] {
        check_range(field, v, 0.0, f64::MAX)?;
    }
    check_range("abr_split", c.abr_split, 0.0, 1.0)?;
    check_range("base_dnf", c.base_dnf, 0.0, 1.0)?;
    // factors divide lap times, so zero is not allowed
    check_range("sc_factor", c.sc_factor, f64::MIN_POSITIVE, 1.0)?;
    check_range("vsc_factor", c.vsc_factor, f64::MIN_POSITIVE, 1.0)?;
    for (field, r) in [("sc_laps", c.sc_laps), ("vsc_laps", c.vsc_laps)] {
        if r.min > r.max {
            return Err(ValidationError::OutOfRange {
                field,
                value: f64::from(r.min),
            });
        }
    }
    Ok(())
}

/// Build the team pairings of a round.
///
/// With an explicit roster every listed driver must exist and belong to no
/// other slot of the same team. Without one, drivers are grouped by team in
/// ascending team order and the first two in input order are taken.
pub fn resolve_pairings(
    drivers: &[Driver],
    roster: Option<&[Pairing]>,
) -> Result<Vec<Pairing>, ValidationError> {
    if let Some(roster) = roster {
        let known: BTreeSet<&DriverId> = drivers.iter().map(|d| &d.driver_id).collect();
        for p in roster {
            let [a, b] = &p.drivers;
            let resolvable = [a, b].iter().filter(|d| known.contains(*d)).count();
            if resolvable < 2 || a == b {
                return Err(ValidationError::TeamUnderstaffed {
                    team_id: p.team_id.0.clone(),
                    found: if a == b { resolvable.min(1) } else { resolvable },
                });
            }
        }
        return Ok(roster.to_vec());
    }

    let mut grouped: BTreeMap<&TeamId, Vec<&DriverId>> = BTreeMap::new();
    for d in drivers {
        grouped.entry(&d.team_id).or_default().push(&d.driver_id);
    }
    let mut pairs = Vec::with_capacity(grouped.len());
    for (team_id, ids) in grouped {
        if ids.len() < 2 {
            return Err(ValidationError::TeamUnderstaffed {
                team_id: team_id.0.clone(),
                found: ids.len(),
            });
        }
        pairs.push(Pairing {
            team_id: team_id.clone(),
            drivers: [ids[0].clone(), ids[1].clone()],
        });
    }
    Ok(pairs)
}

/// Everything a single round's simulation reads: immutable for its duration.
#[derive(Clone, Debug)]
pub struct RoundData {
    pub track: Track,
    teams: BTreeMap<TeamId, Team>,
    drivers: BTreeMap<DriverId, Driver>,
    pub pairings: Vec<Pairing>,
}

impl RoundData {
    /// Index the entities and check that every pairing resolves.
    pub fn new(
        track: Track,
        teams: Vec<Team>,
        drivers: Vec<Driver>,
        pairings: Vec<Pairing>,
    ) -> Result<Self, ValidationError> {
        validate_track(&track)?;
        let mut team_map = BTreeMap::new();
        for t in teams {
            let id = t.team_id.clone();
            if team_map.insert(id.clone(), t).is_some() {
                return Err(ValidationError::DuplicateId(id.0));
            }
        }
        let mut driver_map = BTreeMap::new();
        for d in drivers {
            let id = d.driver_id.clone();
            if driver_map.insert(id.clone(), d).is_some() {
                return Err(ValidationError::DuplicateId(id.0));
            }
        }
        for p in &pairings {
            if !team_map.contains_key(&p.team_id) {
                return Err(ValidationError::UnknownTeam(p.team_id.0.clone()));
            }
            for d in &p.drivers {
                if !driver_map.contains_key(d) {
                    return Err(ValidationError::UnknownDriver(d.0.clone()));
                }
            }
        }
        Ok(Self {
            track,
            teams: team_map,
            drivers: driver_map,
            pairings,
        })
    }

    pub fn team(&self, id: &TeamId) -> Result<&Team, ValidationError> {
        self.teams
            .get(id)
            .ok_or_else(|| ValidationError::UnknownTeam(id.0.clone()))
    }

    pub fn driver(&self, id: &DriverId) -> Result<&Driver, ValidationError> {
        self.drivers
            .get(id)
            .ok_or_else(|| ValidationError::UnknownDriver(id.0.clone()))
    }

    /// Number of cars on the grid.
    pub fn entry_count(&self) -> usize {
        self.pairings.len() * 2
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_pairing_groups_by_team_in_id_order() {
        let drivers = vec![
            driver("D1", "ZED"),
            driver("A1", "ALP"),
            driver("D2", "ZED"),
            driver("A2", "ALP"),
            driver("A3", "ALP"),
        ];
        let pairs = resolve_pairings(&drivers, None).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].team_id, TeamId::from("ALP"));
        assert_eq!(pairs[0].drivers, [DriverId::from("A1"), DriverId::from("A2")]);
        assert_eq!(pairs[1].drivers, [DriverId::from("D1"), DriverId::from("D2")]);
    }

    #[test]
    fn understaffed_team_is_rejected() {
        let drivers = vec![driver("A1", "ALP"), driver("A2", "ALP"), driver("M1", "MCL")];
        let err = resolve_pairings(&drivers, None).unwrap_err();
        assert_eq!(
            err,
            ValidationError::TeamUnderstaffed {
                team_id: "MCL".to_string(),
                found: 1
            }
        );
        assert!(err.to_string().contains("MCL"));
    }

    #[test]
    fn roster_with_unknown_driver_is_rejected() {
        let drivers = vec![driver("A1", "ALP"), driver("A2", "ALP")];
        let roster = vec![Pairing {
            team_id: TeamId::from("ALP"),
            drivers: [DriverId::from("A1"), DriverId::from("GHOST")],
        }];
        assert!(matches!(
            resolve_pairings(&drivers, Some(&roster)),
            Err(ValidationError::TeamUnderstaffed { found: 1, .. })
        ));
    }

    #[test]
    fn roster_overrides_default_grouping() {
        let drivers = vec![driver("A1", "ALP"), driver("A2", "ALP"), driver("A3", "ALP")];
        let roster = vec![Pairing {
            team_id: TeamId::from("ALP"),
            drivers: [DriverId::from("A3"), DriverId::from("A1")],
        }];
        let pairs = resolve_pairings(&drivers, Some(&roster)).unwrap();
        assert_eq!(pairs, roster);
    }

    #[test]
    fn round_data_rejects_pairing_with_unknown_team() {
        let pairs = vec![Pairing {
            team_id: TeamId::from("NOPE"),
            drivers: [DriverId::from("A1"), DriverId::from("A2")],
        }];
        let err = RoundData::new(
            track(1),
            vec![team("ALP")],
            vec![driver("A1", "ALP"), driver("A2", "ALP")],
            pairs,
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::UnknownTeam("NOPE".to_string()));
    }

    #[test]
    fn points_follow_table_and_finisher_count() {
        let awarded: Vec<u32> = (1..=12).map(|p| points_for(p, 20)).collect();
        assert_eq!(&awarded[..10], &POINTS_TABLE);
        assert_eq!(&awarded[10..], &[0, 0]);
        assert_eq!(points_for(4, 3), 0);
        assert_eq!(points_for(0, 20), 0);
    }

    #[test]
    fn safety_windows_json_shape() {
        let w = SafetyWindows {
            sc: vec![LapWindow(12, 15)],
            vsc: vec![],
        };
        let s = w.to_json().unwrap();
        assert_eq!(s, r#"{"SC":[[12,15]],"VSC":[]}"#);
        assert_eq!(SafetyWindows::from_json(&s).unwrap(), w);
        assert!(w.sc_active(12) && w.sc_active(15));
        assert!(!w.sc_active(16) && !w.vsc_active(13));
    }

    #[test]
    fn partial_yaml_config_keeps_defaults() {
        let cfg: SimConfig = serde_yaml::from_str("rng_seed: 7\nsc_factor: 0.5\n").unwrap();
        assert_eq!(cfg.rng_seed, 7);
        assert_eq!(cfg.sc_factor, 0.5);
        assert_eq!(cfg.vref_kmh, 215.0);
        assert_eq!(cfg.base_deg.rate(Compound::Soft), 0.010);
        validate_config(&cfg).unwrap();
    }

    #[test]
    fn config_rejects_zero_sc_factor_and_inverted_ranges() {
        let mut cfg = SimConfig {
            sc_factor: 0.0,
            ..SimConfig::default()
        };
        assert!(validate_config(&cfg).is_err());
        cfg.sc_factor = 0.6;
        cfg.vsc_laps = LapRange { min: 4, max: 2 };
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn compound_codes_parse() {
        for c in Compound::ALL {
            assert_eq!(c.code().parse::<Compound>().unwrap(), c);
        }
        assert!("X".parse::<Compound>().is_err());
    }

    proptest! {
        #[test]
        fn bonus_is_always_clamped(b in -1.0f64..1.0) {
            let mut m = BonusMap::new();
            m.insert(DriverId::from("X"), b);
            let got = m.get(&DriverId::from("X"));
            prop_assert!((0.0..=MAX_PRE_RACE_BONUS).contains(&got));
            prop_assert_eq!(m.get(&DriverId::from("Y")), 0.0);
        }

        #[test]
        fn window_membership_is_inclusive(start in 1u32..100, len in 0u32..10, lap in 0u32..120) {
            let w = LapWindow(start, start + len);
            prop_assert_eq!(w.contains(lap), lap >= start && lap <= start + len);
        }
    }
}
