//! Cross-validation properties: the event-driven engine against the
//! naive quadratic clusterer, and the big-glyph optimization against the
//! plain engine.
//!
//! Simultaneous merges are tie-broken by event creation order, which the
//! two implementations discover differently, so configurations with
//! coinciding merge times are discarded up front.

use aggrow_core::{
    CompressionEntry, CompressionSchedule, EngineConfig, GrowFunction, MergeTree, Rect, Shape,
    Speed,
};
use aggrow_engine::{naive, ClusterOptions, Engine};
use proptest::prelude::*;
use std::collections::HashSet;

const WORLD: Rect = Rect::new(0.0, 0.0, 256.0, 256.0);

fn run_engine(
    points: &[(f64, f64, u64)],
    shape: Shape,
    speed: Speed,
    cfg: &EngineConfig,
    opts: &ClusterOptions,
) -> MergeTree {
    let mut engine = Engine::new(WORLD, GrowFunction::new(shape, speed), cfg.clone()).unwrap();
    for &(x, y, n) in points {
        engine.insert_point(x, y, n).unwrap();
    }
    engine.cluster(opts).unwrap()
}

/// Drop points sharing a center (the input contract requires pre-summing).
fn dedup(points: Vec<(f64, f64, u64)>) -> Vec<(f64, f64, u64)> {
    let mut seen = HashSet::new();
    points
        .into_iter()
        .filter(|&(x, y, _)| seen.insert((x.to_bits(), y.to_bits())))
        .collect()
}

/// All merge times pairwise distinct, so tie-breaking cannot matter.
fn times_distinct(tree: &MergeTree) -> bool {
    let records = tree.merge_records();
    records
        .windows(2)
        .all(|w| (w[1].0 - w[0].0).abs() > 1e-9)
}

fn assert_same_merges(a: &MergeTree, b: &MergeTree, eps: f64) {
    let ra = a.merge_records();
    let rb = b.merge_records();
    assert_eq!(ra.len(), rb.len(), "different merge counts");
    for ((at_a, n_a, x_a, y_a), (at_b, n_b, x_b, y_b)) in ra.into_iter().zip(rb) {
        assert!(
            (at_a - at_b).abs() <= eps,
            "merge times diverge: {at_a} vs {at_b}"
        );
        assert_eq!(n_a, n_b, "merge weights diverge at t={at_a}");
        assert!(
            (x_a - x_b).abs() <= eps && (y_a - y_b).abs() <= eps,
            "merge positions diverge at t={at_a}"
        );
    }
}

fn shapes() -> impl Strategy<Value = Shape> {
    prop_oneof![Just(Shape::Circles), Just(Shape::Squares)]
}

fn speeds() -> impl Strategy<Value = Speed> {
    prop_oneof![
        Just(Speed::Linear),
        Just(Speed::LinearArea),
        Just(Speed::Logarithmic),
    ]
}

fn point_sets() -> impl Strategy<Value = Vec<(f64, f64, u64)>> {
    prop::collection::vec((1.0..255.0f64, 1.0..255.0f64, 1u64..9), 2..12).prop_map(dedup)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn engine_matches_the_naive_clusterer(
        points in point_sets(),
        shape in shapes(),
        speed in speeds(),
    ) {
        prop_assume!(points.len() >= 2);
        let cfg = EngineConfig::default();
        let reference = naive::cluster(
            &points,
            GrowFunction::new(shape, speed),
            &cfg,
            false,
        ).unwrap();
        prop_assume!(times_distinct(&reference));

        let tree = run_engine(&points, shape, speed, &cfg, &ClusterOptions::default());
        assert_same_merges(&tree, &reference, 1e-6);
    }

    #[test]
    fn merge_tree_structure_is_sound(
        points in point_sets(),
        shape in shapes(),
        speed in speeds(),
    ) {
        let cfg = EngineConfig { max_glyphs_per_cell: 3, ..EngineConfig::default() };
        let tree = run_engine(&points, shape, speed, &cfg, &ClusterOptions::default());

        prop_assert!(tree.is_complete());
        prop_assert_eq!(tree.leaf_count(), points.len());
        prop_assert_eq!(tree.internal_count(), points.len().saturating_sub(1));
        let total: u64 = points.iter().map(|&(_, _, n)| n).sum();
        if let Some(root) = tree.root() {
            prop_assert_eq!(root.n, total, "total weight is conserved");
        }
        tree.validate(1e-6).unwrap();
    }

    #[test]
    fn big_glyph_optimization_is_transparent(
        points in prop::collection::vec(
            (1.0..255.0f64, 1.0..255.0f64, 1u64..30), 2..10
        ).prop_map(dedup),
        shape in shapes(),
    ) {
        prop_assume!(points.len() >= 2);
        let cfg = EngineConfig { big_glyph_threshold: 10, ..EngineConfig::default() };

        let baseline = run_engine(
            &points, shape, Speed::Linear, &cfg, &ClusterOptions::default(),
        );
        prop_assume!(times_distinct(&baseline));

        let opts = ClusterOptions { big_glyphs: true, ..ClusterOptions::default() };
        let optimized = run_engine(&points, shape, Speed::Linear, &cfg, &opts);
        assert_same_merges(&optimized, &baseline, 1e-6);
    }

    #[test]
    fn compression_is_consistent_between_engine_and_naive(
        points in prop::collection::vec(
            (1.0..255.0f64, 1.0..255.0f64, 1u64..40), 2..8
        ).prop_map(dedup),
    ) {
        prop_assume!(points.len() >= 2);
        let cfg = EngineConfig {
            compression: CompressionSchedule::new(vec![CompressionEntry {
                threshold: 10,
                factor: 0.5,
            }]).unwrap(),
            ..EngineConfig::default()
        };
        let reference = naive::cluster(
            &points,
            GrowFunction::new(Shape::Squares, Speed::LinearArea),
            &cfg,
            true,
        ).unwrap();
        prop_assume!(times_distinct(&reference));

        let opts = ClusterOptions { compression: true, ..ClusterOptions::default() };
        let tree = run_engine(&points, Shape::Squares, Speed::LinearArea, &cfg, &opts);
        assert_same_merges(&tree, &reference, 1e-6);
    }
}
