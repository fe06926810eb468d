//! Initial placement of the flock, done by the host before the first tick.

use crate::flock_state::Agent;
use anyhow::Result;
use flocking_common::{angle_to_vec, FlockingParams, Placement, Vec2};
use rand::distr::Uniform;
use rand::prelude::*;
use rand::seq::SliceRandom;

/// Places `count` agents inside the world rectangle, each heading in a random
/// direction at `movement_speed`.
pub fn place_agents(
    params: &FlockingParams,
    placement: Placement,
    count: usize,
    rng: &mut StdRng,
) -> Result<Vec<Agent>> {
    let positions = match placement {
        Placement::Uniform => uniform_positions(params, count, rng)?,
        Placement::JitteredGrid => jittered_grid_positions(params, count, rng)?,
    };

    let angle_dist = Uniform::new(0.0f32, 2.0 * std::f32::consts::PI)?;
    Ok(positions
        .into_iter()
        .map(|position| {
            let heading = angle_to_vec(rng.sample(&angle_dist));
            Agent::new(position, heading * params.movement_speed)
        })
        .collect())
}

fn uniform_positions(params: &FlockingParams, count: usize, rng: &mut StdRng) -> Result<Vec<Vec2>> {
    let dist_x = Uniform::new(0.0f32, params.world_width)?;
    let dist_y = Uniform::new(0.0f32, params.world_height)?;
    Ok((0..count)
        .map(|_| Vec2::new(rng.sample(&dist_x), rng.sample(&dist_y)))
        .collect())
}

/// One uniformly jittered position per grid bin; bins are shuffled so a partially
/// filled grid does not leave a regular gap.
fn jittered_grid_positions(params: &FlockingParams, count: usize, rng: &mut StdRng) -> Result<Vec<Vec2>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    let width = params.world_width;
    let height = params.world_height;
    let cols = ((count as f32 * width / height).sqrt().floor() as usize).max(1);
    let rows = count.div_ceil(cols).max(1);

    // Create and shuffle grid bins
    let mut bins: Vec<(usize, usize)> = (0..cols)
        .flat_map(|ix| (0..rows).map(move |iy| (ix, iy)))
        .collect();
    bins.shuffle(rng);
    bins.truncate(count);

    let cell_w = width / cols as f32;
    let cell_h = height / rows as f32;
    let mut positions = Vec::with_capacity(count);
    for (ix, iy) in bins {
        let x0 = ix as f32 * cell_w;
        let y0 = iy as f32 * cell_h;
        let dist_x = Uniform::new(x0, x0 + cell_w)?;
        let dist_y = Uniform::new(y0, y0 + cell_h)?;
        positions.push(Vec2::new(rng.sample(&dist_x), rng.sample(&dist_y)));
    }
    Ok(positions)
}
