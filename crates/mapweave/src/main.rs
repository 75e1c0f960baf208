//! mapweave: build road maps from a directory of GPS trajectories.
//!
//! Reads every regular file in the input directory as one trajectory,
//! merges them in file-name order into a fresh road graph for each
//! epsilon of the sweep, and writes the graph tables and run diagnostics
//! under `<OUTPUT>/<eps>/`.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin mapweave -- [OPTIONS] --output <DIR> <INPUT_DIR>
//! ```
//!
//! Set `RUST_LOG=debug` to trace individual merge decisions.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use log::{error, info, warn};
use mapweave_core::diagnostics::{Clock, RunDiagnostics, add_trajectory_with_diagnostics};
use mapweave_core::{MapBuilder, MapConfig, Trajectory};
use mapweave_export::{SvgMetadata, TrajectoryFormat};

/// Incremental Fréchet-based road map construction.
///
/// Merges GPS trajectories one by one into a road graph, reusing
/// existing roads wherever a trajectory stays within `eps` of them.
#[derive(Parser)]
#[command(name = "mapweave", version)]
struct Cli {
    /// Directory of trajectory files, one trajectory per file.
    input_dir: PathBuf,

    /// Directory to write results to; one subdirectory per epsilon.
    #[arg(long, short)]
    output: PathBuf,

    /// Layout of the trajectory files.
    #[arg(long, value_enum, default_value_t = Format::Whitespace)]
    format: Format,

    /// Matching tolerance in coordinate units (single run).
    #[arg(long, default_value_t = MapConfig::DEFAULT_EPS, conflicts_with = "eps_start")]
    eps: f64,

    /// First epsilon of a sweep.
    #[arg(long, requires = "eps_end")]
    eps_start: Option<f64>,

    /// Last epsilon of a sweep (inclusive).
    #[arg(long, requires = "eps_start")]
    eps_end: Option<f64>,

    /// Epsilon increment of a sweep.
    #[arg(long, default_value_t = 10.0)]
    eps_step: f64,

    /// Do not add connector edges between trajectories and matched roads.
    #[arg(long)]
    no_connect: bool,

    /// Split trajectories where consecutive samples are further apart
    /// than this many seconds.
    #[arg(long, default_value_t = MapConfig::DEFAULT_TIME_GAP_THRESHOLD)]
    time_gap_threshold: f64,

    /// Longest connector edge, as a multiple of epsilon.
    #[arg(long, default_value_t = MapConfig::DEFAULT_CONNECTOR_FACTOR)]
    connector_factor: f64,

    /// Reject graph edges longer than this.
    #[arg(long, default_value_t = MapConfig::DEFAULT_MAX_EDGE_LENGTH)]
    max_edge_length: f64,

    /// Test every graph edge against every trajectory instead of using
    /// the spatial index.
    #[arg(long)]
    no_spatial_index: bool,

    /// Also write `graph.svg` for each epsilon.
    #[arg(long)]
    svg: bool,

    /// Print diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,

    /// Full map config as a JSON string.
    ///
    /// When provided, all other map parameter flags are ignored; the
    /// sweep flags still override `eps`. The JSON must be a valid
    /// `MapConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,
}

/// Trajectory file layout selection.
#[derive(Clone, Copy, ValueEnum)]
enum Format {
    /// `x y timestamp` per line.
    Whitespace,
    /// `id,x,y,timestamp` per line.
    Benchmark,
}

impl From<Format> for TrajectoryFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Whitespace => Self::Whitespace,
            Format::Benchmark => Self::Benchmark,
        }
    }
}

/// Build a [`MapConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<MapConfig, String> {
    let config = if let Some(ref json) = cli.config_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"))?
    } else {
        MapConfig {
            eps: cli.eps,
            connect: !cli.no_connect,
            time_gap_threshold: cli.time_gap_threshold,
            connector_factor: cli.connector_factor,
            max_edge_length: cli.max_edge_length,
            use_spatial_index: !cli.no_spatial_index,
        }
    };
    config
        .validate()
        .map_err(|e| format!("Invalid configuration: {e}"))?;
    Ok(config)
}

/// The epsilon values to run, in order.
fn eps_sweep(cli: &Cli, base: &MapConfig) -> Result<Vec<f64>, String> {
    let (Some(start), Some(end)) = (cli.eps_start, cli.eps_end) else {
        return Ok(vec![base.eps]);
    };
    if !(cli.eps_step.is_finite() && cli.eps_step > 0.0) {
        return Err(format!("--eps-step must be positive, got {}", cli.eps_step));
    }
    if !(start.is_finite() && end.is_finite() && start <= end) {
        return Err(format!("empty epsilon sweep {start}..={end}"));
    }
    let mut values = Vec::new();
    let mut i = 0.0_f64;
    loop {
        let eps = i.mul_add(cli.eps_step, start);
        // Allow for accumulated rounding at the inclusive end.
        if eps > cli.eps_step.mul_add(1e-9, end) {
            break;
        }
        values.push(eps);
        i += 1.0;
    }
    Ok(values)
}

/// Regular files in `dir`, sorted by file name.
fn list_inputs(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

fn display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

/// A trajectory file that has been read and parsed, or why not.
type Input = (String, Result<Trajectory, String>);

fn read_inputs(files: &[PathBuf], format: TrajectoryFormat) -> Vec<Input> {
    files
        .iter()
        .map(|path| {
            let name = display_name(path);
            let parsed = std::fs::read_to_string(path)
                .map_err(|e| format!("unreadable: {e}"))
                .and_then(|text| {
                    mapweave_export::parse_trajectory(&text, format)
                        .map_err(|e| format!("unparsable: {e}"))
                });
            if let Err(ref reason) = parsed {
                warn!("skipping {}: {reason}", path.display());
            }
            (name, parsed)
        })
        .collect()
}

/// Build one graph over all inputs with `config` and return it with
/// its diagnostics.
fn run(inputs: &[Input], config: &MapConfig) -> Result<(MapBuilder, RunDiagnostics), String> {
    let clock = StdClock;
    let start = clock.now();
    let mut builder =
        MapBuilder::new(config.clone()).map_err(|e| format!("Invalid configuration: {e}"))?;
    let mut diagnostics = RunDiagnostics::new(config.clone());

    for (name, parsed) in inputs {
        match parsed {
            Ok(trajectory) => {
                if let Err(e) = add_trajectory_with_diagnostics(
                    &mut builder,
                    name,
                    trajectory,
                    &clock,
                    &mut diagnostics,
                ) {
                    warn!("{name}: merge stopped: {e}");
                }
            }
            Err(reason) => diagnostics.record_skipped(name.clone(), reason.clone()),
        }
    }

    diagnostics.finish(builder.graph(), builder.stats(), clock.elapsed(&start));
    Ok((builder, diagnostics))
}

/// Write the graph tables, diagnostics, and optional SVG into `dir`.
fn write_outputs(
    dir: &Path,
    builder: &MapBuilder,
    diagnostics: &RunDiagnostics,
    svg: bool,
) -> Result<(), String> {
    let write = |name: &str, contents: &str| {
        let path = dir.join(name);
        std::fs::write(&path, contents).map_err(|e| format!("Error writing {}: {e}", path.display()))
    };

    std::fs::create_dir_all(dir)
        .map_err(|e| format!("Error creating {}: {e}", dir.display()))?;

    let graph = builder.graph();
    write("adjacency.txt", &mapweave_export::to_adjacency_list(graph))?;
    write("vertices.txt", &mapweave_export::to_vertex_table(graph))?;
    write("edges.txt", &mapweave_export::to_edge_table(graph))?;

    let json = serde_json::to_string_pretty(diagnostics)
        .map_err(|e| format!("Error serializing diagnostics: {e}"))?;
    write("diagnostics.json", &json)?;

    if svg {
        let title = format!("eps {}", builder.config().eps);
        let config_json = serde_json::to_string(builder.config())
            .map_err(|e| format!("Error serializing config: {e}"))?;
        let description = format!(
            "{} vertices, {} edges",
            graph.vertex_count(),
            graph.edge_count()
        );
        let metadata = SvgMetadata {
            title: Some(&title),
            description: Some(&description),
            config_json: Some(&config_json),
        };
        write("graph.svg", &mapweave_export::to_svg(graph, &metadata))?;
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let base = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            error!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    let sweep = match eps_sweep(&cli, &base) {
        Ok(s) => s,
        Err(msg) => {
            error!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let files = match list_inputs(&cli.input_dir) {
        Ok(files) => files,
        Err(e) => {
            error!("Error listing {}: {e}", cli.input_dir.display());
            return ExitCode::FAILURE;
        }
    };
    info!(
        "{} trajectory files in {}",
        files.len(),
        cli.input_dir.display()
    );
    let inputs = read_inputs(&files, cli.format.into());

    for eps in sweep {
        info!("processing eps = {eps}");
        let config = MapConfig { eps, ..base.clone() };
        let (builder, diagnostics) = match run(&inputs, &config) {
            Ok(r) => r,
            Err(msg) => {
                error!("{msg}");
                return ExitCode::FAILURE;
            }
        };

        if cli.json {
            match serde_json::to_string_pretty(&diagnostics) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    error!("Error serializing diagnostics: {e}");
                    return ExitCode::FAILURE;
                }
            }
        } else {
            println!("{}", diagnostics.report());
            println!();
        }

        let dir = cli.output.join(eps.to_string());
        if let Err(msg) = write_outputs(&dir, &builder, &diagnostics, cli.svg) {
            error!("{msg}");
            return ExitCode::FAILURE;
        }
        info!("wrote {}", dir.display());
    }

    ExitCode::SUCCESS
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}
