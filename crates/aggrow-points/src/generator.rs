// crates/aggrow-points/src/generator.rs

//! Seeded synthetic point generators used by the CLI `generate`
//! subcommand.

use crate::format::{sum_duplicates, WeightedPoint};
use aggrow_core::Rect;
use rand::{rngs::StdRng, Rng as _, SeedableRng};

/// Uniformly random points in the interior of `world` with weights drawn
/// from `[1, max_weight]`.
#[must_use]
pub fn uniform(count: usize, world: &Rect, max_weight: u64, seed: u64) -> Vec<WeightedPoint> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut points = Vec::with_capacity(count);
    for _ in 0..count {
        points.push(WeightedPoint::new(
            rng.random_range(world.x0..world.x1),
            rng.random_range(world.y0..world.y1),
            rng.random_range(1..=max_weight.max(1)),
        ));
    }
    sum_duplicates(points)
}

/// Points grouped into Gaussian blobs: `clusters` centers, each
/// surrounded by points offset by a normal deviate with standard
/// deviation `spread` per axis (clamped to the world).
#[must_use]
pub fn clustered(
    count: usize,
    clusters: usize,
    spread: f64,
    world: &Rect,
    max_weight: u64,
    seed: u64,
) -> Vec<WeightedPoint> {
    let clusters = clusters.max(1);
    let mut rng = StdRng::seed_from_u64(seed);
    let centers: Vec<(f64, f64)> = (0..clusters)
        .map(|_| {
            (
                rng.random_range(world.x0..world.x1),
                rng.random_range(world.y0..world.y1),
            )
        })
        .collect();

    let mut points = Vec::with_capacity(count);
    for i in 0..count {
        let (cx, cy) = centers[i % clusters];
        let x = (cx + spread * standard_normal(&mut rng)).clamp(world.x0, world.x1);
        let y = (cy + spread * standard_normal(&mut rng)).clamp(world.y0, world.y1);
        points.push(WeightedPoint::new(
            x,
            y,
            rng.random_range(1..=max_weight.max(1)),
        ));
    }
    sum_duplicates(points)
}

/// Standard normal deviate via the Box-Muller transform.
fn standard_normal(rng: &mut StdRng) -> f64 {
    // u must stay off 0 so the logarithm is finite.
    let u: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let v: f64 = rng.random();
    (-2.0 * u.ln()).sqrt() * (std::f64::consts::TAU * v).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::validate;

    #[test]
    fn uniform_points_stay_inside_and_validate() {
        let world = Rect::new(0.0, 0.0, 128.0, 128.0);
        let pts = uniform(200, &world, 8, 42);
        assert_eq!(pts.len(), 200);
        validate(&pts).unwrap();
        for p in &pts {
            assert!(world.contains(p.x, p.y));
            assert!((1..=8).contains(&p.n));
        }
    }

    #[test]
    fn generation_is_deterministic_per_seed() {
        let world = Rect::new(0.0, 0.0, 64.0, 64.0);
        assert_eq!(uniform(50, &world, 4, 7), uniform(50, &world, 4, 7));
        assert_ne!(uniform(50, &world, 4, 7), uniform(50, &world, 4, 8));
    }

    #[test]
    fn clustered_points_stay_inside() {
        let world = Rect::new(-32.0, -32.0, 32.0, 32.0);
        let pts = clustered(120, 4, 3.0, &world, 5, 13);
        assert_eq!(pts.len(), 120);
        validate(&pts).unwrap();
        for p in &pts {
            assert!(world.contains(p.x, p.y));
        }
    }
}
