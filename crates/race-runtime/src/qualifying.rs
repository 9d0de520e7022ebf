use crate::{SimContext, SimError};
use race_core::{BonusMap, QualifyingResult, RoundData};
use race_physics::{boosted_perf, lap_time_from_perf, perf_scalar, ref_lap_time, PerfMode};
use rand::Rng;
use tracing::{debug, info};

/// One dry flying lap per driver, ranked into the starting grid.
///
/// Drivers are visited in pairing order; equal times keep that order.
pub fn run_qualifying<R: Rng>(
    ctx: &mut SimContext<R>,
    round: &RoundData,
    bonus: &BonusMap,
) -> Result<Vec<QualifyingResult>, SimError> {
    let SimContext { cfg, rng } = ctx;
    let track = &round.track;
    let ref_s = ref_lap_time(cfg, track.length_km)?;

    let mut rows = Vec::with_capacity(round.entry_count());
    for pairing in &round.pairings {
        let team = round.team(&pairing.team_id)?;
        for driver_id in &pairing.drivers {
            let driver = round.driver(driver_id)?;
            let perf = perf_scalar(driver, team, PerfMode::Qualifying, track.grip_index);
            let perf = boosted_perf(perf, bonus.get(driver_id));
            let lap = lap_time_from_perf(
                rng,
                cfg,
                ref_s,
                perf,
                track.grip_index,
                false,
                cfg.quali_noise,
            )?;
            debug!(driver = %driver_id, perf, lap, "qualifying lap");
            rows.push(QualifyingResult {
                round: track.round,
                team_id: pairing.team_id.clone(),
                driver_id: driver_id.clone(),
                quali_time_s: lap,
                grid_pos: 0,
            });
        }
    }

    rows.sort_by(|a, b| a.quali_time_s.total_cmp(&b.quali_time_s));
    for (i, row) in rows.iter_mut().enumerate() {
        row.grid_pos = i as u32 + 1;
    }
    if let Some(pole) = rows.first() {
        info!(round = track.round, pole = %pole.driver_id, time = pole.quali_time_s, "qualifying complete");
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{round, track};
    use proptest::prelude::*;
    use race_core::{DriverId, SimConfig};

    fn noiseless() -> SimConfig {
        SimConfig {
            quali_noise: 0.0,
            ..SimConfig::default()
        }
    }

    #[test]
    fn stronger_entries_take_the_front_rows() {
        let r = round(5, track(40, 0.3));
        let mut ctx = SimContext::new(noiseless()).unwrap();
        let q = run_qualifying(&mut ctx, &r, &BonusMap::new()).unwrap();
        assert_eq!(q[0].driver_id, DriverId::from("D000"));
        assert_eq!(q[1].driver_id, DriverId::from("D001"));
        assert_eq!(q[9].driver_id, DriverId::from("D041"));
        assert!(q.iter().all(|row| row.quali_time_s > 0.0 && row.round == 4));
    }

    #[test]
    fn equal_times_keep_input_order() {
        // teammates share identical ratings, so without noise they tie
        let r = round(2, track(40, 0.3));
        let mut ctx = SimContext::new(noiseless()).unwrap();
        let q = run_qualifying(&mut ctx, &r, &BonusMap::new()).unwrap();
        assert_eq!(q[0].quali_time_s, q[1].quali_time_s);
        assert_eq!(q[0].driver_id, DriverId::from("D000"));
        assert_eq!(q[1].driver_id, DriverId::from("D001"));
    }

    #[test]
    fn pre_race_bonus_breaks_a_tie() {
        let r = round(2, track(40, 0.3));
        let mut bonus = BonusMap::new();
        bonus.insert(DriverId::from("D001"), 0.03);
        let mut ctx = SimContext::new(noiseless()).unwrap();
        let q = run_qualifying(&mut ctx, &r, &bonus).unwrap();
        assert_eq!(q[0].driver_id, DriverId::from("D001"));
        assert!(q[0].quali_time_s < q[1].quali_time_s);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]
        #[test]
        fn grid_is_a_permutation(seed in any::<u64>(), teams in 1usize..12) {
            let r = round(teams, track(30, 0.5));
            let mut ctx = SimContext::new(SimConfig::default().with_seed(seed)).unwrap();
            let q = run_qualifying(&mut ctx, &r, &BonusMap::new()).unwrap();
            let mut grid: Vec<u32> = q.iter().map(|row| row.grid_pos).collect();
            grid.sort_unstable();
            prop_assert_eq!(grid, (1..=(2 * teams) as u32).collect::<Vec<_>>());
            for w in q.windows(2) {
                prop_assert!(w[0].quali_time_s <= w[1].quali_time_s);
            }
        }
    }
}
