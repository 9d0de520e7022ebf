//! R&D backlog: committed projects, round-by-round progress and
//! application of finished projects to team attributes.

use crate::{charge_budget, clip, money, team_mut, EffectError, Risk};
use race_core::{Team, TeamId};
use race_persistence::{read_table, write_table, SaveSlot, RD_PROJECT_COLUMNS};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Share of the project cost converted into attribute points.
pub const COST_TO_GAIN: f64 = 0.2;

/// Car area a project works on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Area {
    VehicleDesign,
    FrontWing,
    RearWing,
    Brakes,
    Engine,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Attr {
    Aero,
    Engine,
    Reliability,
}

impl Area {
    fn weights(self) -> &'static [(Attr, f64)] {
        match self {
            Area::VehicleDesign => &[(Attr::Aero, 0.8), (Attr::Reliability, 0.4)],
            Area::FrontWing => &[(Attr::Aero, 1.0)],
            Area::RearWing => &[(Attr::Aero, 0.9)],
            Area::Brakes => &[(Attr::Reliability, 0.9)],
            Area::Engine => &[(Attr::Engine, 1.0)],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Area::VehicleDesign => "vehicle_design",
            Area::FrontWing => "front_wing",
            Area::RearWing => "rear_wing",
            Area::Brakes => "brakes",
            Area::Engine => "engine",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    InProgress,
    ReadyToApply,
    Completed,
}

/// A project the team wants to start.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectProposal {
    pub title: String,
    pub area: Area,
    pub cost_musd: f64,
    pub eta_rounds: u32,
    pub risk: Risk,
    pub efficiency: f64,
    pub expected_gain_hint: f64,
    pub reason: String,
}

/// One row of `rd_projects.csv`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RdProject {
    pub project_id: String,
    pub team_id: TeamId,
    pub planned_round: u32,
    pub title: String,
    pub area: Area,
    pub cost_musd: f64,
    pub eta_rounds: u32,
    pub remaining_rounds: u32,
    pub risk: Risk,
    pub efficiency: f64,
    pub expected_gain_hint: f64,
    pub status: ProjectStatus,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub paid: u8,
    #[serde(default)]
    pub charged_musd: f64,
}

impl RdProject {
    /// Attribute points this project is worth to a team with the given
    /// development efficiency (0..100).
    pub fn gain(&self, dev_efficiency: f64) -> f64 {
        self.expected_gain_hint * self.efficiency * (dev_efficiency / 100.0) * self.cost_musd
            * COST_TO_GAIN
    }
}

/// Distribute a finished project's gain over the team's attributes.
pub fn apply_research(team: &mut Team, project: &RdProject) {
    let gain = project.gain(team.dev_efficiency);
    for &(attr, w) in project.area.weights() {
        let slot = match attr {
            Attr::Aero => &mut team.aero,
            Attr::Engine => &mut team.engine,
            Attr::Reliability => &mut team.reliability,
        };
        *slot = clip(*slot + gain * w);
    }
    debug!(project = %project.project_id, gain, "research applied");
}

/// Charge a team for a batch of proposals and turn them into in-progress
/// projects. Fails without side effects when the budget does not cover the
/// whole batch.
pub fn commit_projects(
    team: &mut Team,
    round: u32,
    proposals: &[ProjectProposal],
    next_seq: usize,
) -> Result<Vec<RdProject>, EffectError> {
    let mut total = Decimal::ZERO;
    for p in proposals {
        total += money(p.cost_musd)?;
    }
    charge_budget(team, total)?;
    Ok(proposals
        .iter()
        .enumerate()
        .map(|(i, p)| RdProject {
            project_id: format!(
                "{}-{}-{}-{:04}",
                team.team_id,
                round,
                p.area.as_str(),
                next_seq + i
            ),
            team_id: team.team_id.clone(),
            planned_round: round,
            title: p.title.clone(),
            area: p.area,
            cost_musd: p.cost_musd,
            eta_rounds: p.eta_rounds,
            remaining_rounds: p.eta_rounds,
            risk: p.risk,
            efficiency: p.efficiency,
            expected_gain_hint: p.expected_gain_hint,
            status: ProjectStatus::InProgress,
            reason: p.reason.clone(),
            paid: 1,
            charged_musd: p.cost_musd,
        })
        .collect())
}

/// Tick one round off the team's in-progress projects; returns how many
/// became ready.
pub fn advance_round(projects: &mut [RdProject], team_id: &TeamId) -> usize {
    let mut ready = 0;
    for p in projects
        .iter_mut()
        .filter(|p| &p.team_id == team_id && p.status == ProjectStatus::InProgress)
    {
        p.remaining_rounds = p.remaining_rounds.saturating_sub(1);
        if p.remaining_rounds == 0 {
            p.status = ProjectStatus::ReadyToApply;
            ready += 1;
        }
    }
    ready
}

/// Apply every ready project of the team and mark it completed; returns how
/// many were applied.
pub fn apply_ready(team: &mut Team, projects: &mut [RdProject]) -> usize {
    let team_id = team.team_id.clone();
    let mut applied = 0;
    for p in projects
        .iter_mut()
        .filter(|p| p.team_id == team_id && p.status == ProjectStatus::ReadyToApply)
    {
        apply_research(team, p);
        p.status = ProjectStatus::Completed;
        applied += 1;
    }
    applied
}

/// Backlog of a save slot; a missing file is an empty backlog.
pub fn load_projects(slot: &SaveSlot) -> Result<Vec<RdProject>, EffectError> {
    let path = slot.rd_projects_path();
    if !path.exists() {
        return Ok(Vec::new());
    }
    Ok(read_table(&path, "rd_projects", RD_PROJECT_COLUMNS)?)
}

pub fn save_projects(slot: &SaveSlot, projects: &[RdProject]) -> Result<(), EffectError> {
    write_table(&slot.rd_projects_path(), RD_PROJECT_COLUMNS, projects)?;
    Ok(())
}

/// Commit proposals for a team: budget written to `teams.csv`, projects
/// appended to the backlog.
pub fn commit_in_slot(
    slot: &SaveSlot,
    team_id: &TeamId,
    round: u32,
    proposals: &[ProjectProposal],
) -> Result<Vec<RdProject>, EffectError> {
    let mut teams = slot.load_teams()?;
    let mut backlog = load_projects(slot)?;
    let team = team_mut(&mut teams, team_id)?;
    let new = commit_projects(team, round, proposals, backlog.len() + 1)?;
    slot.save_teams(&teams)?;
    backlog.extend(new.iter().cloned());
    save_projects(slot, &backlog)?;
    info!(team = %team_id, round, projects = new.len(), "r&d committed");
    Ok(new)
}

pub fn advance_in_slot(slot: &SaveSlot, team_id: &TeamId) -> Result<usize, EffectError> {
    let mut backlog = load_projects(slot)?;
    let ready = advance_round(&mut backlog, team_id);
    save_projects(slot, &backlog)?;
    info!(team = %team_id, ready, "r&d advanced");
    Ok(ready)
}

pub fn apply_ready_in_slot(slot: &SaveSlot, team_id: &TeamId) -> Result<usize, EffectError> {
    let mut teams = slot.load_teams()?;
    let mut backlog = load_projects(slot)?;
    let team = team_mut(&mut teams, team_id)?;
    let applied = apply_ready(team, &mut backlog);
    if applied > 0 {
        slot.save_teams(&teams)?;
        save_projects(slot, &backlog)?;
    }
    info!(team = %team_id, applied, "r&d applied");
    Ok(applied)
}
