#![deny(warnings)]

//! Headless runner: simulate qualifying and races of a save slot and print
//! the result tables.

use anyhow::{bail, Context, Result};
use race_core::{QualifyingResult, RaceResult, RaceStatus, SimConfig};
use race_persistence::{SaveSlot, Standings};
use race_runtime::{qualifying_in_slot, race_in_slot, simulate_round_in_slot, SimContext};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Session {
    Qualifying,
    Race,
    Round,
}

#[derive(Debug, Default)]
struct Args {
    root: Option<PathBuf>,
    round: Option<u32>,
    seed: Option<u64>,
    config: Option<PathBuf>,
    session: Option<Session>,
    new_slot: Option<PathBuf>,
    team: Option<String>,
    standings: bool,
}

const USAGE: &str = "usage: race-cli --root <slot> --round <n> [--seed <u64>] [--config <yaml>] \
[--session quali|race|round] [--new-slot <data_dir>] [--team <id>] [--standings]";

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        let mut value = || it.next().with_context(|| format!("{arg} needs a value\n{USAGE}"));
        match arg.as_str() {
            "--root" => args.root = Some(value()?.into()),
            "--round" => args.round = Some(value()?.parse().context("--round")?),
            "--seed" => args.seed = Some(value()?.parse().context("--seed")?),
            "--config" => args.config = Some(value()?.into()),
            "--session" => {
                args.session = Some(match value()?.as_str() {
                    "quali" => Session::Qualifying,
                    "race" => Session::Race,
                    "round" => Session::Round,
                    other => bail!("unknown session {other:?}\n{USAGE}"),
                })
            }
            "--new-slot" => args.new_slot = Some(value()?.into()),
            "--team" => args.team = Some(value()?),
            "--standings" => args.standings = true,
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            other => bail!("unknown argument {other:?}\n{USAGE}"),
        }
    }
    Ok(args)
}

fn load_config(args: &Args) -> Result<SimConfig> {
    let mut cfg = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => SimConfig::default(),
    };
    if let Some(seed) = args.seed {
        cfg = cfg.with_seed(seed);
    }
    Ok(cfg)
}

fn print_qualifying(rows: &[QualifyingResult]) {
    println!("{:>4}  {:<8} {:<8} {:>10}", "grid", "driver", "team", "time_s");
    for r in rows {
        println!(
            "{:>4}  {:<8} {:<8} {:>10.3}",
            r.grid_pos, r.driver_id.0, r.team_id.0, r.quali_time_s
        );
    }
}

fn print_race(rows: &[RaceResult]) {
    if let Some(first) = rows.first() {
        println!(
            "wet: {} | SC: {:?} | VSC: {:?}",
            first.wet, first.events.sc, first.events.vsc
        );
    }
    println!(
        "{:>3}  {:<8} {:<8} {:>4} {:>11} {:>9} {:>5} {:<8} {:>3}",
        "pos", "driver", "team", "grid", "total_s", "best_s", "stops", "status", "pts"
    );
    for r in rows {
        let total = match (r.status, r.total_time_s) {
            (RaceStatus::Finished, Some(t)) => format!("{t:.3}"),
            _ => "-".to_string(),
        };
        let best = r.fastest_lap_s.map_or_else(|| "-".to_string(), |t| format!("{t:.3}"));
        println!(
            "{:>3}  {:<8} {:<8} {:>4} {:>11} {:>9} {:>5} {:<8} {:>3}",
            r.pos,
            r.driver_id.0,
            r.team_id.0,
            r.grid_pos,
            total,
            best,
            r.pit_stops,
            r.status.as_str(),
            r.points
        );
    }
}

fn print_standings(s: &Standings) {
    println!("drivers");
    for (i, d) in s.drivers.iter().enumerate() {
        println!(
            "{:>3}  {:<8} {:<8} {:>4} pts {:>2} wins",
            i + 1,
            d.driver_id.0,
            d.team_id.0,
            d.points,
            d.wins
        );
    }
    println!("constructors");
    for (i, t) in s.teams.iter().enumerate() {
        println!("{:>3}  {:<8} {:>4} pts", i + 1, t.team_id.0, t.points);
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args()?;
    info!(git_sha = env!("GIT_SHA"), ?args, "starting race-cli");

    let slot = match (&args.new_slot, &args.root) {
        (Some(data_dir), _) => SaveSlot::create(data_dir, args.team.as_deref())?,
        (None, Some(root)) => SaveSlot::open(root),
        (None, None) => bail!("one of --root or --new-slot is required\n{USAGE}"),
    };
    println!("slot: {}", slot.root().display());

    if let Some(round) = args.round {
        let mut ctx = SimContext::new(load_config(&args)?)?;
        info!(round, seed = ctx.config().rng_seed, "simulating");
        match args.session.unwrap_or(Session::Round) {
            Session::Qualifying => print_qualifying(&qualifying_in_slot(&mut ctx, &slot, round)?),
            Session::Race => print_race(&race_in_slot(&mut ctx, &slot, round, None)?),
            Session::Round => {
                let out = simulate_round_in_slot(&mut ctx, &slot, round)?;
                print_qualifying(&out.qualifying);
                println!();
                print_race(&out.race);
            }
        }
    } else if !args.standings && args.new_slot.is_none() {
        bail!("nothing to do: pass --round and/or --standings\n{USAGE}");
    }

    if args.standings {
        print_standings(&slot.standings()?);
    }
    Ok(())
}
