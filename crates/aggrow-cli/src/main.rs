// crates/aggrow-cli/src/main.rs

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use anyhow::{bail, Context, Result};
use aggrow_core::{
    io::write_tree_auto, CompressionEntry, CompressionSchedule, EngineConfig, GrowFunction, Rect,
    Shape, Speed,
};
use aggrow_engine::{naive, ClusterOptions, Engine};
use aggrow_points::io::{read_points_auto, write_points_auto};
use aggrow_points::{format, generator, WeightedPoint};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "aggrow-cli",
    about = "Agglomerative clustering of growing glyphs",
    long_about = "Agglomerative clustering of growing glyphs.\n\nGenerate weighted point sets, cluster them into merge trees, inspect the quadtree, and cross-check the engine against a naive reference.",
    version = env!("CARGO_PKG_VERSION"),
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Generate a synthetic weighted point set (JSON/CBOR/CSV by extension)
    Generate {
        /// Number of points (>0)
        #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u32).range(1..))]
        count: u32,

        /// RNG seed
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Point layout
        #[arg(long, value_enum, default_value_t = LayoutOpt::Uniform)]
        layout: LayoutOpt,

        /// Number of blobs for the clustered layout
        #[arg(long, default_value_t = 8)]
        clusters: usize,

        /// Per-axis standard deviation of the clustered layout's blobs
        #[arg(long, default_value_t = 8.0)]
        spread: f64,

        /// World side length (square world with origin at 0,0)
        #[arg(long, default_value_t = 512.0)]
        world: f64,

        /// Maximum point weight
        #[arg(long, default_value_t = 10)]
        max_weight: u64,

        /// Output path
        #[arg(long, default_value = "points.json")]
        out: PathBuf,
    },

    /// Cluster a point file into a merge tree (JSON/CBOR by extension)
    Cluster {
        /// Input points (.json/.cbor/.csv/.tsv/.txt/.pts)
        #[arg(long)]
        input: PathBuf,

        /// Output merge tree path
        #[arg(long, default_value = "tree.json")]
        out: PathBuf,

        #[command(flatten)]
        run: RunArgs,

        /// Prompt on stdin between events (debugging)
        #[arg(long, default_value_t = false)]
        step: bool,
    },

    /// Cluster with both the engine and the naive reference and compare
    Validate {
        /// Input points (.json/.cbor/.csv/.tsv/.txt/.pts)
        #[arg(long)]
        input: PathBuf,

        #[command(flatten)]
        run: RunArgs,

        /// Comparison tolerance on merge times and positions
        #[arg(long, default_value_t = 1e-6)]
        epsilon: f64,
    },

    /// Print quadtree and engine statistics for a point file
    Stats {
        /// Input points (.json/.cbor/.csv/.tsv/.txt/.pts)
        #[arg(long)]
        input: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },
}

/// Options shared by every clustering run.
#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Glyph shape (distance metric)
    #[arg(long, value_enum, default_value_t = ShapeOpt::Squares)]
    shape: ShapeOpt,

    /// Growth speed
    #[arg(long, value_enum, default_value_t = SpeedOpt::Linear)]
    speed: SpeedOpt,

    /// World as `x0,y0,side`; fitted around the input when omitted
    #[arg(long)]
    world: Option<String>,

    /// Leaf capacity of the quadtree
    #[arg(long, default_value_t = 10)]
    leaf_capacity: usize,

    /// Weight threshold of the big-glyph optimization (0 disables)
    #[arg(long, default_value_t = 0)]
    big_glyphs: u64,

    /// Compression thresholds as `threshold:factor[,threshold:factor...]`
    #[arg(long)]
    compression: Option<String>,

    /// Skip out-of-cell tracking (debugging; merges need shared cells)
    #[arg(long, default_value_t = false)]
    no_out_of_cell: bool,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, ValueEnum)]
enum ShapeOpt {
    /// Disks, Euclidean distance
    Circles,
    /// Axis-aligned squares, Chebyshev distance
    Squares,
}

impl From<ShapeOpt> for Shape {
    fn from(v: ShapeOpt) -> Self {
        match v {
            ShapeOpt::Circles => Self::Circles,
            ShapeOpt::Squares => Self::Squares,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, ValueEnum)]
enum SpeedOpt {
    Linear,
    LinearArea,
    Logarithmic,
}

impl From<SpeedOpt> for Speed {
    fn from(v: SpeedOpt) -> Self {
        match v {
            SpeedOpt::Linear => Self::Linear,
            SpeedOpt::LinearArea => Self::LinearArea,
            SpeedOpt::Logarithmic => Self::Logarithmic,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, ValueEnum)]
enum LayoutOpt {
    Uniform,
    Clustered,
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Generate {
            count,
            seed,
            layout,
            clusters,
            spread,
            world,
            max_weight,
            out,
        } => generate(count, seed, layout, clusters, spread, world, max_weight, out),

        Cmd::Cluster {
            input,
            out,
            run,
            step,
        } => cluster(&input, &out, &run, step),

        Cmd::Validate {
            input,
            run,
            epsilon,
        } => validate(&input, &run, epsilon),

        Cmd::Stats { input, run } => stats(&input, &run),
    }
}

/// Initialize tracing with an env-driven filter (default INFO).
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_target(false).with_level(true).compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

#[allow(clippy::too_many_arguments)]
fn generate(
    count: u32,
    seed: u64,
    layout: LayoutOpt,
    clusters: usize,
    spread: f64,
    world: f64,
    max_weight: u64,
    out: PathBuf,
) -> Result<()> {
    if world <= 0.0 {
        bail!("world side must be positive, got {world}");
    }
    let bounds = Rect::square(0.0, 0.0, world);

    info!(count, seed, ?layout, "generating points");
    let points = match layout {
        LayoutOpt::Uniform => generator::uniform(count as usize, &bounds, max_weight, seed),
        LayoutOpt::Clustered => {
            generator::clustered(count as usize, clusters, spread, &bounds, max_weight, seed)
        }
    };

    write_points_auto(&out, &points)
        .with_context(|| format!("writing points to {}", out.display()))?;
    println!("Generated {} points → {}", points.len(), out.display());
    Ok(())
}

fn cluster(input: &Path, out: &Path, run: &RunArgs, step: bool) -> Result<()> {
    let (points, mut engine, opts) = prepare(input, run)?;

    // Ctrl-C flips the cancel flag; the engine finishes the in-flight
    // event and returns the partial forest.
    let flag = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&flag);
        let _ = ctrlc::set_handler(move || flag.store(true, std::sync::atomic::Ordering::Relaxed));
    }
    engine.set_cancel_flag(flag);

    if step {
        engine.set_step_hook(|event| {
            eprintln!("[step] t={:.6} {:?} (enter to continue)", event.at, event.kind);
            let mut line = String::new();
            let _ = std::io::stdin().lock().read_line(&mut line);
        });
    }

    let opts = ClusterOptions { step, ..opts };
    info!(points = points.len(), "clustering");
    let tree = engine.cluster(&opts)?;

    write_tree_auto(out, &tree).with_context(|| format!("writing tree to {}", out.display()))?;
    println!(
        "Clustered {} points: {} merges → {}",
        points.len(),
        tree.internal_count(),
        out.display()
    );
    if !tree.is_complete() {
        println!("(cancelled: {} roots remain)", tree.roots.len());
    }
    println!("engine: {}", engine.stats());
    println!("tree:   {}", engine.tree().stats());
    Ok(())
}

fn validate(input: &Path, run: &RunArgs, epsilon: f64) -> Result<()> {
    let (points, mut engine, opts) = prepare(input, run)?;

    let tree = engine.cluster(&opts)?;
    let triples: Vec<(f64, f64, u64)> = points.iter().map(|p| (p.x, p.y, p.n)).collect();
    let grow = GrowFunction::new(run.shape.into(), run.speed.into());
    let reference = naive::cluster(&triples, grow, &engine_config(run)?, opts.compression)?;

    let a = tree.merge_records();
    let b = reference.merge_records();
    if a.len() != b.len() {
        bail!(
            "merge counts differ: engine {} vs naive {}",
            a.len(),
            b.len()
        );
    }
    for (i, ((at_a, n_a, x_a, y_a), (at_b, n_b, x_b, y_b))) in
        a.into_iter().zip(b).enumerate()
    {
        if (at_a - at_b).abs() > epsilon
            || n_a != n_b
            || (x_a - x_b).abs() > epsilon
            || (y_a - y_b).abs() > epsilon
        {
            bail!(
                "merge {i} differs: engine ({at_a}, {n_a}, {x_a}, {y_a}) vs naive ({at_b}, {n_b}, {x_b}, {y_b})"
            );
        }
    }
    println!(
        "OK: {} merges match the naive reference within {epsilon}",
        tree.internal_count()
    );
    Ok(())
}

fn stats(input: &Path, run: &RunArgs) -> Result<()> {
    let (points, mut engine, opts) = prepare(input, run)?;

    println!("points: {}", points.len());
    println!("seeded: {}", engine.tree().stats());
    let tree = engine.cluster(&opts)?;
    println!("engine: {}", engine.stats());
    println!("final:  {}", engine.tree().stats());
    if let Some(root) = tree.root() {
        println!(
            "root:   t={:.6} at ({:.3}, {:.3}), weight {}",
            root.at, root.x, root.y, root.n
        );
    }
    Ok(())
}

/// Load points, build the engine and derive the cluster options.
fn prepare(input: &Path, run: &RunArgs) -> Result<(Vec<WeightedPoint>, Engine, ClusterOptions)> {
    let points = read_points_auto(input)
        .with_context(|| format!("reading points from {}", input.display()))?;
    format::validate(&points).context("input contract")?;
    if points.is_empty() {
        bail!("no points in {}", input.display());
    }

    let bounds = match &run.world {
        Some(spec) => parse_world(spec)?,
        None => fit_world(&points),
    };
    let cfg = engine_config(run)?;
    let grow = GrowFunction::new(run.shape.into(), run.speed.into());

    let mut engine = Engine::new(bounds, grow, cfg)?;
    for p in &points {
        engine
            .insert_point(p.x, p.y, p.n)
            .with_context(|| format!("seeding ({}, {})", p.x, p.y))?;
    }

    let opts = ClusterOptions {
        include_out_of_cell: !run.no_out_of_cell,
        step: false,
        big_glyphs: run.big_glyphs > 0,
        compression: run.compression.is_some(),
    };
    Ok((points, engine, opts))
}

fn engine_config(run: &RunArgs) -> Result<EngineConfig> {
    let mut cfg = EngineConfig {
        max_glyphs_per_cell: run.leaf_capacity,
        ..EngineConfig::default()
    };
    if run.big_glyphs > 0 {
        cfg.big_glyph_threshold = run.big_glyphs;
    }
    if let Some(spec) = &run.compression {
        cfg.compression = parse_compression(spec)?;
    }
    cfg.validate()?;
    Ok(cfg)
}

/// Parse `threshold:factor[,threshold:factor...]`.
fn parse_compression(spec: &str) -> Result<CompressionSchedule> {
    let mut entries = Vec::new();
    for part in spec.split(',') {
        let (t, f) = part
            .split_once(':')
            .with_context(|| format!("bad compression entry `{part}` (want threshold:factor)"))?;
        entries.push(CompressionEntry {
            threshold: t.trim().parse().with_context(|| format!("bad threshold `{t}`"))?,
            factor: f.trim().parse().with_context(|| format!("bad factor `{f}`"))?,
        });
    }
    CompressionSchedule::new(entries)
}

/// Parse `x0,y0,side` into a square world.
fn parse_world(spec: &str) -> Result<Rect> {
    let parts: Vec<&str> = spec.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        bail!("world must be `x0,y0,side`, got `{spec}`");
    }
    let x0: f64 = parts[0].parse().context("bad world x0")?;
    let y0: f64 = parts[1].parse().context("bad world y0")?;
    let side: f64 = parts[2].parse().context("bad world side")?;
    if side <= 0.0 || !side.is_finite() {
        bail!("world side must be positive and finite");
    }
    Ok(Rect::square(x0, y0, side))
}

/// Smallest square around the input, padded so boundary points are
/// strictly inside.
fn fit_world(points: &[WeightedPoint]) -> Rect {
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    let side = (max_x - min_x).max(max_y - min_y).max(1.0) + 2.0;
    Rect::square(min_x - 1.0, min_y - 1.0, side)
}
