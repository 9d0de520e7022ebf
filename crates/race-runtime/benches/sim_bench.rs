use criterion::{criterion_group, criterion_main, Criterion};
use race_core::{BonusMap, Driver, DriverId, Pairing, RoundData, SimConfig, Team, TeamId, Track};

fn grid_of(teams: usize) -> RoundData {
    let track = Track {
        round: 1,
        name: "Monza".into(),
        length_km: 5.793,
        laps: 53,
        grip_index: 0.55,
        abrasion_index: 0.8,
        pit_loss_sec: 19.5,
        rain_base_prob: 0.2,
        sc_base_prob: 0.4,
        vsc_base_prob: 0.3,
    };
    let mut ts = Vec::new();
    let mut ds = Vec::new();
    let mut ps = Vec::new();
    for i in 0..teams {
        let tid = TeamId(format!("T{i}"));
        let rating = 90.0 - i as f64;
        ts.push(Team {
            team_id: tid.clone(),
            name: format!("Team {i}"),
            aero: rating,
            engine: rating,
            reliability: 75.0,
            pit_crew: 75.0,
            strategy: 75.0,
            dev_efficiency: 70.0,
            dev_speed: 1.0,
            team_morale: 70.0,
            budget_musd: 120.0,
        });
        let ids = [DriverId(format!("D{i}A")), DriverId(format!("D{i}B"))];
        for id in &ids {
            ds.push(Driver {
                driver_id: id.clone(),
                team_id: tid.clone(),
                name: id.0.clone(),
                skill: rating,
                pace: rating,
                consistency: 70.0,
                awareness: 70.0,
                quali: rating,
                wet: rating,
                tire_mgmt: 70.0,
                aggression: 50.0,
            });
        }
        ps.push(Pairing {
            team_id: tid,
            drivers: ids,
        });
    }
    RoundData::new(track, ts, ds, ps).unwrap()
}

fn bench_round(c: &mut Criterion) {
    let round = grid_of(10);
    let bonus = BonusMap::new();
    let mut ctx = race_runtime::SimContext::new(SimConfig::default()).unwrap();
    c.bench_function("simulate_round", |b| {
        b.iter(|| {
            let _ = race_runtime::simulate_round(&mut ctx, &round, &bonus);
        })
    });
}

criterion_group!(benches, bench_round);
criterion_main!(benches);
