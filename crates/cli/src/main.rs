use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use fftcell_backend_cpu::CpuFftEngine;
use fftcell_core::{
    cell::Cell,
    io::{JobConfig, ProjectionKind},
    krylov::{KrylovSolverTrustRegionPCG, ResetCG, Verbosity},
    newton::{self, OptimizeResult},
    projection::{Projection, ProjectionDefault, ProjectionFiniteStrainFast},
};

#[derive(Parser, Debug)]
#[command(name = "fftcell", about = "FFT-based homogenisation of periodic cells")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: PathBuf,
    /// Path to CSV output (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Override the CG restart policy
    #[arg(long, value_enum)]
    reset: Option<ResetArg>,
    /// Override the trust-region radius
    #[arg(long)]
    trust_region: Option<f64>,
    /// Suppress progress logs (stderr)
    #[arg(long)]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ResetArg {
    None,
    Fixed,
    Gradient,
    Direction,
}

impl From<ResetArg> for ResetCG {
    fn from(value: ResetArg) -> Self {
        match value {
            ResetArg::None => ResetCG::NoReset,
            ResetArg::Fixed => ResetCG::FixedIterCount,
            ResetArg::Gradient => ResetCG::GradientOrthogonality,
            ResetArg::Direction => ResetCG::ValidDirection,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    if !cli.quiet {
        eprintln!("[cli] loading config {}", cli.config.display());
    }
    let mut config = JobConfig::from_path(&cli.config)?;
    if let Some(reset) = cli.reset {
        config.solver.reset = reset.into();
    }
    if let Some(trust_region) = cli.trust_region {
        config.solver.trust_region = trust_region;
    }
    config.newton.verbosity = if cli.quiet {
        Verbosity::Silent
    } else {
        config.newton.verbosity.max(Verbosity::Some)
    };
    config.validate()?;

    let grid = config.build_grid()?;
    let dim = grid.dim();
    log::info!(
        "{} load steps on {:?} ({}, {:?} projection)",
        config.load_steps.len(),
        grid.nb_domain_grid_pts(),
        config.projection.formulation,
        config.projection.kind
    );
    let engine = CpuFftEngine::new(grid, dim * dim)?;
    let gradient = config.gradient();
    let mut projection: Box<dyn Projection + Send> = match config.projection.kind {
        ProjectionKind::Default => Box::new(ProjectionDefault::new(
            engine,
            gradient,
            config.projection.formulation,
        )?),
        ProjectionKind::Fast => Box::new(ProjectionFiniteStrainFast::with_formulation(
            engine,
            gradient,
            config.projection.formulation,
        )?),
    };
    projection.initialise(config.projection.plan)?;

    let materials = config.build_materials()?;
    let phases = config.phase_map(&grid);
    let cell = Arc::new(Cell::new(projection, materials, phases)?);
    let mut solver = KrylovSolverTrustRegionPCG::new(config.solver.clone());
    let metrics_recorder = config.metrics.build_recorder()?;

    if !cli.quiet {
        if let Some(dest) = &cli.output {
            eprintln!("[cli] writing CSV to {}", dest.display());
        } else {
            eprintln!("[cli] streaming CSV to stdout");
        }
    }
    let results = newton::newton_cg(
        &cell,
        &config.load_steps,
        &mut solver,
        &config.newton,
        metrics_recorder.as_ref(),
    )?;
    emit_csv(&results, dim, cli.output.as_deref())?;
    if !cli.quiet {
        if let Some(path) = cli.output {
            eprintln!("wrote {} rows to {}", results.len(), path.display());
        } else {
            eprintln!("wrote {} rows to stdout", results.len());
        }
    }
    Ok(())
}

fn average(values: &[f64], nb_components: usize) -> Vec<f64> {
    let nb_pixels = (values.len() / nb_components).max(1) as f64;
    let mut sum = vec![0.0; nb_components];
    for pixel in values.chunks_exact(nb_components) {
        for (acc, v) in sum.iter_mut().zip(pixel) {
            *acc += v;
        }
    }
    sum.into_iter().map(|v| v / nb_pixels).collect()
}

fn emit_csv(results: &[OptimizeResult], dim: usize, dest: Option<&Path>) -> io::Result<()> {
    let mut writer: Box<dyn Write> = match dest {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout())),
    };
    write!(writer, "step,newton_iterations,cg_iterations")?;
    for prefix in ["strain", "stress"] {
        for i in 0..dim {
            for j in 0..dim {
                write!(writer, ",{prefix}_{i}{j}")?;
            }
        }
    }
    writeln!(writer)?;

    let nb_components = dim * dim;
    for (step, result) in results.iter().enumerate() {
        write!(writer, "{step},{},{}", result.nb_it, result.cg_iterations)?;
        for value in average(&result.grad, nb_components)
            .into_iter()
            .chain(average(&result.stress, nb_components))
        {
            write!(writer, ",{value}")?;
        }
        writeln!(writer)?;
    }

    writer.flush()
}
