use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use strokefx::{
    Brush, CanvasHistory, EffectRunner, ImageBlock, JobPaths, PixelLayout, Point, PropertySet,
    StrokeFxConfig, StrokeFxError, StrokeOutcome, StrokePipeline, VersionId,
};

#[derive(Parser, Debug)]
#[command(name = "strokefx", version)]
struct Cli {
    /// Pipeline configuration JSON.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Canvas store directory (overrides the config).
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Job exchange directory (overrides the config).
    #[arg(long, global = true)]
    job_dir: Option<PathBuf>,

    /// More logging (-v info, -vv debug, -vvv trace). `STROKEFX_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start a canvas history from an image or a solid color.
    Init(InitArgs),
    /// Apply one brush stroke through an effect and commit the result.
    Stroke(StrokeArgs),
    /// Step the canvas back one version.
    Undo(CanvasArgs),
    /// Step the canvas forward over an undone version.
    Redo(CanvasArgs),
    /// Copy a stored version to a file.
    Export(ExportArgs),
    /// Print the parameters required by brushes and effects.
    Requirements(RequirementsArgs),
    /// Run a built-in effect on a stored job (effect process entry point).
    Effect(EffectArgs),
}

#[derive(Parser, Debug)]
struct CanvasArgs {
    /// Logical canvas name.
    #[arg(long, default_value = "canvas")]
    canvas: String,
}

#[derive(Parser, Debug)]
struct InitArgs {
    #[command(flatten)]
    canvas: CanvasArgs,

    /// Source image for the first version.
    #[arg(long, conflicts_with = "size")]
    from: Option<PathBuf>,

    /// Size of a blank canvas, `WIDTHxHEIGHT`.
    #[arg(long, default_value = "512x512")]
    size: String,

    /// Fill color of a blank canvas.
    #[arg(long, default_value = "#ffffffff")]
    fill: String,
}

#[derive(Parser, Debug)]
struct StrokeArgs {
    #[command(flatten)]
    canvas: CanvasArgs,

    #[arg(long, default_value = "smooth")]
    brush: String,

    #[arg(long)]
    effect: String,

    /// Pointer samples, `x,y x,y ...`.
    #[arg(long)]
    points: String,

    /// Parameter override, `Name=value`. Repeatable.
    #[arg(long = "param", value_name = "NAME=VALUE")]
    params: Vec<String>,

    /// Effect timeout in milliseconds (overrides the config).
    #[arg(long)]
    timeout_ms: Option<u64>,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    #[command(flatten)]
    canvas: CanvasArgs,

    /// Version to export; the current one by default.
    #[arg(long)]
    version: Option<u64>,

    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct RequirementsArgs {
    /// Brush and effect ids.
    #[arg(required = true)]
    ids: Vec<String>,
}

#[derive(Parser, Debug)]
struct EffectArgs {
    /// Built-in effect id.
    id: String,
    /// Job identifier.
    job_id: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut cfg = match &cli.config {
        Some(p) => StrokeFxConfig::load(p)?,
        None => StrokeFxConfig::default(),
    };
    if let Some(store) = &cli.store {
        cfg.store_dir = store.clone();
    }
    if let Some(job_dir) = &cli.job_dir {
        cfg.job_dir = job_dir.clone();
    }

    match cli.cmd {
        Command::Init(args) => cmd_init(&cfg, args),
        Command::Stroke(args) => cmd_stroke(cfg, args),
        Command::Undo(args) => cmd_step(&cfg, &args, CanvasHistory::undo),
        Command::Redo(args) => cmd_step(&cfg, &args, CanvasHistory::redo),
        Command::Export(args) => cmd_export(&cfg, args),
        Command::Requirements(args) => cmd_requirements(&cfg, args),
        Command::Effect(args) => cmd_effect(cli.job_dir, args),
    }
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_env("STROKEFX_LOG").unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn cmd_init(cfg: &StrokeFxConfig, args: InitArgs) -> anyhow::Result<()> {
    let initial = match &args.from {
        Some(path) => ImageBlock::load(path)?,
        None => {
            let (w, h) = parse_size(&args.size)?;
            let color = strokefx::parse_hex_color(&args.fill)?;
            ImageBlock::filled(w, h, PixelLayout::Rgba, &color)?
        }
    };
    let history = CanvasHistory::create(&cfg.store_dir, &args.canvas.canvas, &initial)?;
    let v = history
        .current_version()
        .context("new history has no version")?;
    println!("{}", history.version_path(v).display());
    Ok(())
}

fn cmd_stroke(cfg: StrokeFxConfig, args: StrokeArgs) -> anyhow::Result<()> {
    let registry = Arc::new(cfg.registry()?);

    let mut props = PropertySet::new();
    props.sync(&registry, &[args.brush.as_str(), args.effect.as_str()])?;
    for p in &args.params {
        let (name, value) = p
            .split_once('=')
            .with_context(|| format!("--param '{p}' must be NAME=VALUE"))?;
        props.set_text(name.trim(), value)?;
    }

    let mut brush = Brush::new(args.brush.as_str());
    for pt in parse_points(&args.points)? {
        brush.add_point(pt)?;
    }

    let history = CanvasHistory::open(&cfg.store_dir, &args.canvas.canvas)?;
    let timeout = args
        .timeout_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| cfg.timeout());
    if timeout.is_zero() {
        anyhow::bail!("--timeout-ms must be > 0");
    }
    let pipeline = StrokePipeline::new(
        registry,
        EffectRunner::new(cfg.runner_config()),
        Arc::new(Mutex::new(history)),
        timeout,
    );

    match pipeline.run_stroke(&mut brush, &args.effect, &props.to_params())? {
        StrokeOutcome::Committed(v) => {
            println!("{v}");
            Ok(())
        }
        StrokeOutcome::Skipped => {
            eprintln!("stroke does not touch the canvas; nothing to do");
            Ok(())
        }
        StrokeOutcome::Failed(failure) => Err(StrokeFxError::from(failure).into()),
    }
}

fn cmd_step(
    cfg: &StrokeFxConfig,
    canvas: &CanvasArgs,
    step: fn(&mut CanvasHistory) -> strokefx::StrokeFxResult<VersionId>,
) -> anyhow::Result<()> {
    let mut history = CanvasHistory::open(&cfg.store_dir, &canvas.canvas)?;
    match step(&mut history) {
        Ok(v) => println!("{v}"),
        Err(e @ (StrokeFxError::NothingToUndo | StrokeFxError::NothingToRedo)) => {
            eprintln!("{e}");
            if let Some(v) = history.current_version() {
                println!("{v}");
            }
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn cmd_export(cfg: &StrokeFxConfig, args: ExportArgs) -> anyhow::Result<()> {
    let history = CanvasHistory::open(&cfg.store_dir, &args.canvas.canvas)?;
    let version = match args.version {
        Some(v) => VersionId(v),
        None => history
            .current_version()
            .context("canvas history is empty")?,
    };
    history.export(version, &args.out)?;
    println!("{}", args.out.display());
    Ok(())
}

fn cmd_requirements(cfg: &StrokeFxConfig, args: RequirementsArgs) -> anyhow::Result<()> {
    let registry = cfg.registry()?;
    let ids: Vec<&str> = args.ids.iter().map(String::as_str).collect();
    for decl in registry.merged_requirements(&ids)? {
        let default = serde_json::to_string(&decl.default)
            .with_context(|| format!("encode default of '{}'", decl.name))?;
        println!("{}\t{:?}\t{default}", decl.name, decl.kind);
    }
    Ok(())
}

fn cmd_effect(job_dir: Option<PathBuf>, args: EffectArgs) -> anyhow::Result<()> {
    let effect = strokefx::builtins::lookup(&args.id)
        .with_context(|| format!("unknown built-in effect '{}'", args.id))?;
    let id = strokefx::JobId::parse(&args.job_id)?;
    let dir = job_dir.unwrap_or_else(strokefx::job_dir_from_env);
    strokefx::run_job(effect, &JobPaths::new(dir), id)?;
    Ok(())
}

fn parse_size(s: &str) -> anyhow::Result<(u32, u32)> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .with_context(|| format!("size '{s}' must be WIDTHxHEIGHT"))?;
    let w: u32 = w.trim().parse().with_context(|| format!("bad width in '{s}'"))?;
    let h: u32 = h.trim().parse().with_context(|| format!("bad height in '{s}'"))?;
    Ok((w, h))
}

fn parse_points(s: &str) -> anyhow::Result<Vec<Point>> {
    s.split_whitespace()
        .map(|pair| {
            let (x, y) = pair
                .split_once(',')
                .with_context(|| format!("point '{pair}' must be x,y"))?;
            let x: i32 = x.parse().with_context(|| format!("bad x in '{pair}'"))?;
            let y: i32 = y.parse().with_context(|| format!("bad y in '{pair}'"))?;
            Ok(Point::new(x, y))
        })
        .collect()
}
