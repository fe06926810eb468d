//! Entropy for the wander fallback.
//!
//! A wander vector is addressed by `(agent, tick)` rather than drawn from a shared stream,
//! so the result does not depend on the order (or thread) in which agents are processed.

use anyhow::Result;
use flocking_common::Vec2;
use rand::distr::Uniform;
use rand::prelude::*;

/// 64-bit fractional golden-ratio constant for seed mixing.
const AGENT_MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;
/// Odd constant from splitmix64, keeps tick and agent contributions apart.
const TICK_MIXING_CONSTANT: u64 = 0xbf58_476d_1ce4_e5b9;

/// Source of wander vectors with both components in [-1, 1].
pub trait WanderSource: Send + Sync {
    fn wander(&self, agent: usize, tick: u64) -> Vec2;
}

/// Any `Fn(agent, tick) -> Vec2` closure can act as a wander source.
impl<F> WanderSource for F
where
    F: Fn(usize, u64) -> Vec2 + Send + Sync,
{
    fn wander(&self, agent: usize, tick: u64) -> Vec2 {
        self(agent, tick)
    }
}

/// Deterministic wander source: a fresh `StdRng` per `(agent, tick)` derived from one seed.
#[derive(Debug, Clone)]
pub struct SeededWander {
    seed: u64,
    component_dist: Uniform<f32>,
}

impl SeededWander {
    pub fn new(seed: u64) -> Result<Self> {
        Ok(SeededWander {
            seed,
            component_dist: Uniform::new_inclusive(-1.0f32, 1.0f32)?,
        })
    }

    fn rng_for(&self, agent: usize, tick: u64) -> StdRng {
        let mixed = self.seed
            ^ (agent as u64).wrapping_mul(AGENT_MIXING_CONSTANT)
            ^ tick.wrapping_add(1).wrapping_mul(TICK_MIXING_CONSTANT);
        StdRng::seed_from_u64(mixed)
    }
}

impl WanderSource for SeededWander {
    fn wander(&self, agent: usize, tick: u64) -> Vec2 {
        let mut rng = self.rng_for(agent, tick);
        Vec2::new(rng.sample(&self.component_dist), rng.sample(&self.component_dist))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_wander_is_reproducible() {
        let a = SeededWander::new(7).unwrap();
        let b = SeededWander::new(7).unwrap();
        for agent in 0..10 {
            for tick in 0..10 {
                assert_eq!(a.wander(agent, tick), b.wander(agent, tick));
            }
        }
    }

    #[test]
    fn components_stay_in_unit_range() {
        let source = SeededWander::new(42).unwrap();
        for agent in 0..200 {
            let v = source.wander(agent, 3);
            assert!((-1.0..=1.0).contains(&v.x), "{v:?}");
            assert!((-1.0..=1.0).contains(&v.y), "{v:?}");
        }
    }

    #[test]
    fn agents_and_ticks_get_distinct_draws() {
        let source = SeededWander::new(1).unwrap();
        assert_ne!(source.wander(0, 1), source.wander(1, 0));
        assert_ne!(source.wander(0, 0), source.wander(0, 1));
        assert_ne!(SeededWander::new(2).unwrap().wander(0, 0), source.wander(0, 0));
    }

    #[test]
    fn closures_are_sources() {
        let fixed = |_agent: usize, _tick: u64| Vec2::new(0.25, -0.5);
        assert_eq!(fixed.wander(3, 9), Vec2::new(0.25, -0.5));
    }
}
