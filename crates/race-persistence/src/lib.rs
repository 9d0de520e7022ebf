#![deny(warnings)]

//! Persistence layer: save slots holding CSV attribute tables and result tables.
//!
//! A save slot is a directory with `tracks.csv`, `teams.csv`, `drivers.csv`,
//! optional per-round roster files and a `sim/` directory where pre-race
//! bonuses are read from and session results are written to. Required inputs
//! are schema-checked up front; optional bonus files degrade to "no bonus".

mod rows;
pub mod standings;

pub use rows::{
    BONUS_COLUMNS, DRIVER_COLUMNS, QUALI_COLUMNS, RACE_COLUMNS, ROSTER_COLUMNS, TEAM_COLUMNS,
    TRACK_COLUMNS,
};
pub use standings::{DriverStanding, Standings, TeamStanding};

use race_core::{
    resolve_pairings, BonusMap, Driver, DriverId, Pairing, QualifyingResult, RaceResult,
    RoundData, Team, Track, ValidationError,
};
use rows::{BonusRow, DriverRow, QualiRow, RaceRow, RosterRow, TeamRow};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Base tables copied into every new save slot.
pub const BASE_FILES: [&str; 3] = ["teams.csv", "drivers.csv", "tracks.csv"];

/// R&D backlog columns, in file order.
pub const RD_PROJECT_COLUMNS: &[&str] = &[
    "project_id",
    "team_id",
    "planned_round",
    "title",
    "area",
    "cost_musd",
    "eta_rounds",
    "remaining_rounds",
    "risk",
    "efficiency",
    "expected_gain_hint",
    "status",
    "reason",
    "paid",
    "charged_musd",
];

/// Crew training log columns, in file order.
pub const CREW_LOG_COLUMNS: &[&str] = &[
    "ts",
    "round",
    "team_id",
    "title",
    "sessions",
    "risk",
    "cost_musd",
    "pit_gain_applied",
    "morale_delta",
    "incidents",
    "narrative",
];

#[derive(Debug, Error)]
pub enum PersistenceError {
    /// A required table lacks columns; nothing is simulated.
    #[error("{table} CSV missing columns: {missing:?}")]
    Schema {
        table: String,
        missing: Vec<String>,
    },
    #[error("{table} table not found at {}", .path.display())]
    MissingTable { table: String, path: PathBuf },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read a headed CSV table after checking that `required` columns exist.
pub fn read_table<T: DeserializeOwned>(
    path: &Path,
    table: &str,
    required: &[&str],
) -> Result<Vec<T>, PersistenceError> {
    if !path.exists() {
        return Err(PersistenceError::MissingTable {
            table: table.to_string(),
            path: path.to_path_buf(),
        });
    }
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;
    let headers = rdr.headers()?.clone();
    let missing: Vec<String> = required
        .iter()
        .filter(|c| !headers.iter().any(|h| h == **c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(PersistenceError::Schema {
            table: table.to_string(),
            missing,
        });
    }
    let rows = rdr.deserialize().collect::<Result<Vec<T>, csv::Error>>()?;
    Ok(rows)
}

/// Write a full table: rendered in memory, then moved over the target.
pub fn write_table<T: Serialize>(
    path: &Path,
    header: &[&str],
    rows: &[T],
) -> Result<(), PersistenceError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    wtr.write_record(header)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| PersistenceError::Io(e.into_error()))?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("csv.tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Handle to one save slot directory.
#[derive(Clone, Debug)]
pub struct SaveSlot {
    root: PathBuf,
}

impl SaveSlot {
    pub fn open<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Create `saves/run_<timestamp>[_<team>]` under `data_dir`, seeded with
    /// the base tables and empty R&D / crew training skeletons.
    pub fn create<P: AsRef<Path>>(
        data_dir: P,
        team_id: Option<&str>,
    ) -> Result<Self, PersistenceError> {
        let data_dir = data_dir.as_ref();
        let saves = data_dir.join("saves");
        fs::create_dir_all(&saves)?;
        let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let name = match team_id {
            Some(t) => format!("run_{ts}_{t}"),
            None => format!("run_{ts}"),
        };
        let root = saves.join(name);
        fs::create_dir(&root)?;
        for name in BASE_FILES {
            let src = data_dir.join(name);
            let dst = root.join(name);
            if src.exists() {
                fs::copy(&src, &dst)?;
            } else {
                fs::write(&dst, "")?;
            }
        }
        write_table::<()>(&root.join("rd_projects.csv"), RD_PROJECT_COLUMNS, &[])?;
        write_table::<()>(&root.join("crew_training_log.csv"), CREW_LOG_COLUMNS, &[])?;
        info!(slot = %root.display(), "created save slot");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sim_dir(&self) -> PathBuf {
        self.root.join("sim")
    }

    pub fn teams_path(&self) -> PathBuf {
        self.root.join("teams.csv")
    }

    pub fn drivers_path(&self) -> PathBuf {
        self.root.join("drivers.csv")
    }

    pub fn tracks_path(&self) -> PathBuf {
        self.root.join("tracks.csv")
    }

    pub fn rd_projects_path(&self) -> PathBuf {
        self.root.join("rd_projects.csv")
    }

    pub fn crew_log_path(&self) -> PathBuf {
        self.root.join("crew_training_log.csv")
    }

    pub fn roster_path(&self, round: u32) -> PathBuf {
        self.root.join(format!("roster_round_{round:02}.csv"))
    }

    pub fn qualifying_path(&self, round: u32) -> PathBuf {
        self.sim_dir().join(format!("quali_round_{round:02}.csv"))
    }

    pub fn race_path(&self, round: u32) -> PathBuf {
        self.sim_dir().join(format!("race_round_{round:02}.csv"))
    }

    pub fn load_tracks(&self) -> Result<Vec<Track>, PersistenceError> {
        read_table(&self.tracks_path(), "tracks", TRACK_COLUMNS)
    }

    pub fn load_teams(&self) -> Result<Vec<Team>, PersistenceError> {
        let rows: Vec<TeamRow> = read_table(&self.teams_path(), "teams", TEAM_COLUMNS)?;
        Ok(rows.into_iter().map(Team::from).collect())
    }

    /// Drivers in file order.
    pub fn load_drivers(&self) -> Result<Vec<Driver>, PersistenceError> {
        let rows: Vec<DriverRow> = read_table(&self.drivers_path(), "drivers", DRIVER_COLUMNS)?;
        Ok(rows.into_iter().map(Driver::from).collect())
    }

    /// Explicit roster for a round, if a roster file exists.
    pub fn load_roster(&self, round: u32) -> Result<Option<Vec<Pairing>>, PersistenceError> {
        let path = self.roster_path(round);
        if !path.exists() {
            return Ok(None);
        }
        let rows: Vec<RosterRow> = read_table(&path, "roster", ROSTER_COLUMNS)?;
        Ok(Some(rows.into_iter().map(Pairing::from).collect()))
    }

    pub fn save_teams(&self, teams: &[Team]) -> Result<(), PersistenceError> {
        write_table(&self.teams_path(), TEAM_TABLE_HEADER, teams)
    }

    pub fn save_drivers(&self, drivers: &[Driver]) -> Result<(), PersistenceError> {
        write_table(&self.drivers_path(), DRIVER_TABLE_HEADER, drivers)
    }

    /// Load and validate everything a round simulation reads.
    pub fn load_round(&self, round: u32) -> Result<RoundData, PersistenceError> {
        let tracks = self.load_tracks()?;
        let teams = self.load_teams()?;
        let drivers = self.load_drivers()?;
        let track = tracks
            .into_iter()
            .find(|t| t.round == round)
            .ok_or(ValidationError::RoundNotFound(round))?;
        let roster = self.load_roster(round)?;
        let pairings = resolve_pairings(&drivers, roster.as_deref())?;
        debug!(round, teams = pairings.len(), "round loaded");
        Ok(RoundData::new(track, teams, drivers, pairings)?)
    }

    /// Pre-race bonuses from every `sim/pre_bonus_round_RR_*.csv`.
    ///
    /// Files are read in name order; unreadable files and incomplete rows
    /// are skipped with a warning.
    pub fn load_bonus_map(&self, round: u32) -> BonusMap {
        let mut map = BonusMap::new();
        let prefix = format!("pre_bonus_round_{round:02}_");
        let entries = match fs::read_dir(self.sim_dir()) {
            Ok(e) => e,
            Err(_) => return map,
        };
        let mut files: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(".csv"))
            })
            .collect();
        files.sort();
        for path in files {
            match read_table::<BonusRow>(&path, "pre_bonus", BONUS_COLUMNS) {
                Ok(rows) => {
                    for row in rows {
                        match (row.driver_id, row.bonus_decimal) {
                            (Some(id), Some(b)) if !id.trim().is_empty() => {
                                map.insert(DriverId(id.trim().to_string()), b)
                            }
                            _ => warn!(file = %path.display(), "skipping incomplete bonus row"),
                        }
                    }
                }
                Err(e) => warn!(file = %path.display(), error = %e, "ignoring unreadable bonus file"),
            }
        }
        map
    }

    pub fn write_qualifying(
        &self,
        round: u32,
        rows: &[QualifyingResult],
    ) -> Result<PathBuf, PersistenceError> {
        let path = self.qualifying_path(round);
        let flat: Vec<QualiRow> = rows.iter().map(QualiRow::from).collect();
        write_table(&path, QUALI_COLUMNS, &flat)?;
        Ok(path)
    }

    pub fn read_qualifying(
        &self,
        round: u32,
    ) -> Result<Option<Vec<QualifyingResult>>, PersistenceError> {
        let path = self.qualifying_path(round);
        if !path.exists() {
            return Ok(None);
        }
        let rows: Vec<QualiRow> = read_table(&path, "qualifying", QUALI_COLUMNS)?;
        Ok(Some(rows.into_iter().map(QualifyingResult::from).collect()))
    }

    pub fn write_race(&self, round: u32, rows: &[RaceResult]) -> Result<PathBuf, PersistenceError> {
        let path = self.race_path(round);
        let flat = rows
            .iter()
            .map(RaceRow::from_result)
            .collect::<Result<Vec<_>, _>>()?;
        write_table(&path, RACE_COLUMNS, &flat)?;
        Ok(path)
    }

    pub fn read_race(&self, round: u32) -> Result<Option<Vec<RaceResult>>, PersistenceError> {
        let path = self.race_path(round);
        if !path.exists() {
            return Ok(None);
        }
        let rows: Vec<RaceRow> = read_table(&path, "race", RACE_COLUMNS)?;
        rows.into_iter()
            .map(RaceRow::into_result)
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    /// Rounds with a persisted race table, ascending.
    pub fn completed_rounds(&self) -> Result<Vec<u32>, PersistenceError> {
        let dir = self.sim_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut rounds: Vec<u32> = fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let name = e.file_name().into_string().ok()?;
                name.strip_prefix("race_round_")?
                    .strip_suffix(".csv")?
                    .parse()
                    .ok()
            })
            .collect();
        rounds.sort_unstable();
        Ok(rounds)
    }
}

const TEAM_TABLE_HEADER: &[&str] = &[
    "team_id",
    "name",
    "aero",
    "engine",
    "reliability",
    "pit_crew",
    "strategy",
    "dev_efficiency",
    "dev_speed",
    "team_morale",
    "budget_musd",
];

const DRIVER_TABLE_HEADER: &[&str] = &[
    "driver_id",
    "team_id",
    "name",
    "skill",
    "pace",
    "consistency",
    "awareness",
    "quali",
    "wet",
    "tire_mgmt",
    "aggression",
];
