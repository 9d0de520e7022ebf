use crate::{SimContext, SimError};
use race_core::{
    points_for, BonusMap, Driver, QualifyingResult, RaceResult, RaceStatus, RoundData,
    SafetyWindows, SimConfig, Team, Track,
};
use race_physics::events::{dnf_flag, rain_flag, sample_safety_periods};
use race_physics::{
    boosted_perf, lap_time_from_perf, perf_scalar, pit_loss_sec, ref_lap_time, stint_multiplier,
    PerfMode,
};
use race_strategy::{choose_strategy, planned_stops};
use rand::Rng;
use tracing::{debug, info};

/// Weather and incident windows shared by every car in one race.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RaceConditions {
    pub wet: bool,
    pub windows: SafetyWindows,
}

impl RaceConditions {
    /// Rain is drawn first, then the safety periods.
    pub fn sample<R: Rng + ?Sized>(rng: &mut R, cfg: &SimConfig, track: &Track) -> Self {
        let wet = rain_flag(rng, track.rain_base_prob);
        let windows = sample_safety_periods(
            rng,
            cfg,
            track.laps,
            track.sc_base_prob,
            track.vsc_base_prob,
        );
        Self { wet, windows }
    }
}

/// Lap time inflation on `lap`: the safety car outranks a virtual one.
pub fn incident_factor(cfg: &SimConfig, windows: &SafetyWindows, lap: u32) -> f64 {
    if windows.sc_active(lap) {
        1.0 / cfg.sc_factor
    } else if windows.vsc_active(lap) {
        1.0 / cfg.vsc_factor
    } else {
        1.0
    }
}

/// Mutable state of one car's race; never shared between cars.
#[derive(Debug)]
struct CarRun {
    next_lap: u32,
    total_time: f64,
    fastest_lap: Option<f64>,
    pit_stops: u32,
    retired: bool,
}

impl CarRun {
    fn new() -> Self {
        Self {
            next_lap: 1,
            total_time: 0.0,
            fastest_lap: None,
            pit_stops: 0,
            retired: false,
        }
    }

    fn status(&self) -> RaceStatus {
        if self.retired {
            RaceStatus::Dnf
        } else {
            RaceStatus::Finished
        }
    }

    fn record_lap(&mut self, lap_time: f64) {
        self.total_time += lap_time;
        self.fastest_lap = Some(self.fastest_lap.map_or(lap_time, |f| f.min(lap_time)));
        self.next_lap += 1;
    }
}

struct RaceInputs<'a> {
    track: &'a Track,
    conditions: &'a RaceConditions,
    ref_s: f64,
}

fn drive<R: Rng + ?Sized>(
    rng: &mut R,
    cfg: &SimConfig,
    inputs: &RaceInputs<'_>,
    driver: &Driver,
    team: &Team,
    bonus: f64,
    will_fail: bool,
) -> Result<CarRun, SimError> {
    let track = inputs.track;
    let conditions = inputs.conditions;
    let laps = track.laps;

    let plan = choose_strategy(rng, cfg, laps, track.abrasion_index);
    debug!(
        driver = %driver.driver_id,
        planned_stops = planned_stops(&plan),
        will_fail,
        "strategy"
    );
    let retire_chance = 1.0 / f64::from(laps.max(1));
    let mode = PerfMode::Race {
        wet: conditions.wet,
    };

    let mut run = CarRun::new();
    'stints: for stint in &plan {
        let wear = stint_multiplier(cfg, stint.compound, track.abrasion_index, driver.tire_mgmt);
        for _ in 0..stint.laps {
            let perf = boosted_perf(perf_scalar(driver, team, mode, track.grip_index), bonus);
            let lap = lap_time_from_perf(
                rng,
                cfg,
                inputs.ref_s,
                perf,
                track.grip_index,
                conditions.wet,
                cfg.race_noise,
            )? * wear
                * incident_factor(cfg, &conditions.windows, run.next_lap);
            run.record_lap(lap);
            if will_fail && rng.gen::<f64>() < retire_chance {
                run.retired = true;
                break 'stints;
            }
        }
        if run.next_lap > laps {
            break;
        }
        run.pit_stops += 1;
        run.total_time += pit_loss_sec(
            track.pit_loss_sec,
            conditions.windows.sc_active(run.next_lap),
            team.pit_crew,
        );
    }
    Ok(run)
}

/// Race every car in grid order under one shared set of conditions, then
/// classify.
pub fn run_race<R: Rng>(
    ctx: &mut SimContext<R>,
    round: &RoundData,
    bonus: &BonusMap,
    grid: &[QualifyingResult],
) -> Result<Vec<RaceResult>, SimError> {
    let SimContext { cfg, rng } = ctx;
    let track = &round.track;
    let ref_s = ref_lap_time(cfg, track.length_km)?;
    let conditions = RaceConditions::sample(rng, cfg, track);
    let inputs = RaceInputs {
        track,
        conditions: &conditions,
        ref_s,
    };

    let mut order: Vec<&QualifyingResult> = grid.iter().collect();
    order.sort_by_key(|q| q.grid_pos);

    let mut rows = Vec::with_capacity(order.len());
    for q in order {
        let driver = round.driver(&q.driver_id)?;
        let team = round.team(&q.team_id)?;
        // decided up front; only takes effect if a per-lap check fires
        let will_fail = dnf_flag(rng, cfg, driver, team);
        let run = drive(rng, cfg, &inputs, driver, team, bonus.get(&q.driver_id), will_fail)?;
        let status = run.status();
        debug!(
            driver = %q.driver_id,
            status = status.as_str(),
            laps = run.next_lap - 1,
            stops = run.pit_stops,
            "race run"
        );
        rows.push(RaceResult {
            round: track.round,
            team_id: q.team_id.clone(),
            driver_id: q.driver_id.clone(),
            grid_pos: q.grid_pos,
            total_time_s: (!run.retired).then_some(run.total_time),
            fastest_lap_s: run.fastest_lap,
            pit_stops: run.pit_stops,
            status,
            wet: conditions.wet,
            events: conditions.windows.clone(),
            pos: 0,
            points: 0,
        });
    }

    let rows = classify(rows);
    info!(
        round = track.round,
        wet = conditions.wet,
        sc = conditions.windows.sc.len(),
        vsc = conditions.windows.vsc.len(),
        finishers = rows.iter().filter(|r| r.status == RaceStatus::Finished).count(),
        "race complete"
    );
    Ok(rows)
}

/// Finishers by ascending total time, then retirements in their incoming
/// order; positions 1..N and top-ten points among finishers.
pub fn classify(rows: Vec<RaceResult>) -> Vec<RaceResult> {
    let (mut finished, retired): (Vec<_>, Vec<_>) = rows
        .into_iter()
        .partition(|r| r.status == RaceStatus::Finished);
    finished.sort_by(|a, b| {
        let ta = a.total_time_s.unwrap_or(f64::INFINITY);
        let tb = b.total_time_s.unwrap_or(f64::INFINITY);
        ta.total_cmp(&tb)
    });
    let finishers = finished.len();
    let mut out = finished;
    out.extend(retired);
    for (i, row) in out.iter_mut().enumerate() {
        row.pos = i as u32 + 1;
        row.points = points_for(row.pos, finishers);
    }
    out
}
