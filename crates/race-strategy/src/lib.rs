#![deny(warnings)]

//! Tire strategy selection.

use race_core::{Compound, SimConfig};
use rand::Rng;

/// A block of laps run on one compound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stint {
    pub compound: Compound,
    pub laps: u32,
}

/// Ordered stint plan covering exactly `laps` laps.
///
/// Low-abrasion circuits get a one-stop Medium→Hard plan split at half
/// distance. High-abrasion circuits get a two-stop plan of roughly 30/35/35%
/// where each stint's compound is drawn independently.
pub fn choose_strategy<R: Rng + ?Sized>(
    rng: &mut R,
    cfg: &SimConfig,
    laps: u32,
    abrasion_idx: f64,
) -> Vec<Stint> {
    if abrasion_idx < cfg.abr_split {
        let first = laps / 2;
        return vec![
            Stint {
                compound: Compound::Medium,
                laps: first,
            },
            Stint {
                compound: Compound::Hard,
                laps: laps - first,
            },
        ];
    }
    let s1 = share(laps, 0.30);
    let s2 = share(laps, 0.35).min(laps - s1);
    [s1, s2, laps - s1 - s2]
        .into_iter()
        .map(|len| Stint {
            compound: random_compound(rng),
            laps: len,
        })
        .collect()
}

fn share(laps: u32, frac: f64) -> u32 {
    ((f64::from(laps) * frac).round() as u32).min(laps)
}

fn random_compound<R: Rng + ?Sized>(rng: &mut R) -> Compound {
    Compound::ALL[rng.gen_range(0..Compound::ALL.len())]
}

/// Number of pit stops a plan calls for if run to the flag.
pub fn planned_stops(plan: &[Stint]) -> usize {
    plan.len().saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn low_abrasion_is_medium_then_hard() {
        let cfg = SimConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let plan = choose_strategy(&mut rng, &cfg, 57, 0.3);
        assert_eq!(
            plan,
            vec![
                Stint { compound: Compound::Medium, laps: 28 },
                Stint { compound: Compound::Hard, laps: 29 },
            ]
        );
        assert_eq!(planned_stops(&plan), 1);
    }

    #[test]
    fn high_abrasion_splits_in_three() {
        let cfg = SimConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let plan = choose_strategy(&mut rng, &cfg, 57, 0.65);
        let lens: Vec<u32> = plan.iter().map(|s| s.laps).collect();
        assert_eq!(lens, vec![17, 20, 20]);
    }

    #[test]
    fn high_abrasion_draws_every_compound_eventually() {
        let cfg = SimConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            for s in choose_strategy(&mut rng, &cfg, 50, 0.9) {
                seen.insert(s.compound);
            }
        }
        assert_eq!(seen.len(), 3);
    }

    proptest! {
        #[test]
        fn stints_cover_race_distance(seed in any::<u64>(), laps in 3u32..200, abr in 0.0f64..=1.0) {
            let cfg = SimConfig::default();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let plan = choose_strategy(&mut rng, &cfg, laps, abr);
            prop_assert_eq!(plan.iter().map(|s| s.laps).sum::<u32>(), laps);
            prop_assert_eq!(plan.len(), if abr < cfg.abr_split { 2 } else { 3 });
        }
    }
}
