use anyhow::{bail, Context, Result};
use log::info;
use nav_stokes_projection::{
    max_divergence, FlagField, Grid3, PressureProjector, ProjectionConfig, SplitVelocity3,
    SweepOrder, Vec3,
};

#[derive(Clone, Copy, Debug)]
struct SceneConfig {
    resolution: usize,
    inflow: f64,
}

impl SceneConfig {
    fn from_args() -> Result<Self> {
        let mut config = Self {
            resolution: 8,
            inflow: 1.0,
        };
        let mut args = std::env::args().skip(1);
        if let Some(arg) = args.next() {
            config.resolution = arg
                .parse()
                .with_context(|| format!("invalid resolution {arg:?}"))?;
        }
        if let Some(arg) = args.next() {
            config.inflow = arg
                .parse()
                .with_context(|| format!("invalid inflow speed {arg:?}"))?;
        }
        if config.resolution < 4 {
            bail!("resolution must be at least 4, got {}", config.resolution);
        }
        Ok(config)
    }

    fn block_bounds(self) -> ((usize, usize, usize), (usize, usize, usize)) {
        let half = (self.resolution / 8).max(1);
        let lo = self.resolution / 2 - half;
        let hi = self.resolution / 2 + half;
        ((lo, lo, lo), (hi, hi, hi))
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let scene = SceneConfig::from_args()?;
    let grid = Grid3::cube(scene.resolution);
    let mut flags = FlagField::all_fluid(grid);
    let (min, max) = scene.block_bounds();
    flags.fill_solid_box(min, max);
    let mut velocity = SplitVelocity3::new(grid, Vec3::new(scene.inflow, 0.0, 0.0));
    info!(
        "scene {:?}: solid block {:?}..{:?}, {} fluid cells",
        grid.resolution(),
        min,
        max,
        flags.fluid_count()
    );

    let sweep = if grid.size() >= 1 << 18 {
        SweepOrder::Wavefront
    } else {
        SweepOrder::Lexicographic
    };
    let projector = PressureProjector::new(ProjectionConfig::default().with_sweep(sweep))
        .context("building projector")?;
    let report = projector
        .enforce_incompressibility(&mut velocity, &flags)
        .context("projecting velocity")?;

    println!("status:            {:?}", report.status);
    println!("iterations:        {}", report.iterations());
    println!("converged:         {}", report.converged());
    println!("divergence before: {:.3e}", report.divergence_before);
    println!("divergence after:  {:.3e}", report.divergence_after);
    if let Some(solve) = report.solve {
        println!("final residual:    {:.3e}", solve.max_residual);
        if solve.degenerate_steps > 0 {
            println!("degenerate steps:  {}", solve.degenerate_steps);
        }
    }
    info!(
        "recomputed max divergence {:.3e}",
        max_divergence(&velocity, &flags)
    );
    Ok(())
}
