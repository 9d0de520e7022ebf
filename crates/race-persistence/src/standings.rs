//! Championship tables accumulated from persisted race results.

use crate::{PersistenceError, SaveSlot};
use race_core::{DriverId, RaceResult, TeamId};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DriverStanding {
    pub driver_id: DriverId,
    pub team_id: TeamId,
    pub points: u32,
    pub wins: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TeamStanding {
    pub team_id: TeamId,
    pub points: u32,
}

/// Drivers' and constructors' championship, best first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Standings {
    pub drivers: Vec<DriverStanding>,
    pub teams: Vec<TeamStanding>,
}

impl Standings {
    /// Ties on points are broken by id, ascending.
    pub fn from_results<'a, I>(results: I) -> Self
    where
        I: IntoIterator<Item = &'a RaceResult>,
    {
        let mut drivers: BTreeMap<DriverId, DriverStanding> = BTreeMap::new();
        let mut teams: BTreeMap<TeamId, u32> = BTreeMap::new();
        for r in results {
            let entry = drivers
                .entry(r.driver_id.clone())
                .or_insert_with(|| DriverStanding {
                    driver_id: r.driver_id.clone(),
                    team_id: r.team_id.clone(),
                    points: 0,
                    wins: 0,
                });
            entry.points += r.points;
            entry.team_id = r.team_id.clone();
            if r.pos == 1 && r.points > 0 {
                entry.wins += 1;
            }
            *teams.entry(r.team_id.clone()).or_insert(0) += r.points;
        }
        // BTreeMap iteration is id-ascending, so a stable sort keeps that order on ties
        let mut drivers: Vec<DriverStanding> = drivers.into_values().collect();
        drivers.sort_by(|a, b| b.points.cmp(&a.points));
        let mut teams: Vec<TeamStanding> = teams
            .into_iter()
            .map(|(team_id, points)| TeamStanding { team_id, points })
            .collect();
        teams.sort_by(|a, b| b.points.cmp(&a.points));
        Self { drivers, teams }
    }
}

impl SaveSlot {
    /// Standings over every race table persisted in this slot.
    pub fn standings(&self) -> Result<Standings, PersistenceError> {
        let mut all = Vec::new();
        for round in self.completed_rounds()? {
            if let Some(rows) = self.read_race(round)? {
                all.extend(rows);
            }
        }
        Ok(Standings::from_results(&all))
    }
}
