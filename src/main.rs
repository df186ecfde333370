use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing::{info, Level};

use stemlab::algo::{binary_search_trace, gcd_trace};
use stemlab::app::{self, HeadlessOptions, Interactive};
use stemlab::config::{self, Config};
use stemlab::graph::{self, spawn_traversal, Algorithm, Graph, TraversalEvent};
use stemlab::params::parse_override;
use stemlab::render::panel::format_param;
use stemlab::sim::{LcCircuit, ModelKind, Pendulum, PvCycle, RlCircuit, Selection, SpringMass};

struct Defaults;

impl Defaults {
    const FRAMES: usize = 600;
    const DT: f64 = 1.0 / 60.0;
    const PRINT_EVERY: usize = 30;
    const HISTORY_SPAN: f64 = 10.0;
    const GRID_WIDTH: usize = 16;
    const GRID_HEIGHT: usize = 10;
    const WALL_DENSITY: f64 = 0.25;
    const GRAPH_SEED: u64 = 1;
}

#[derive(Parser, Debug)]
#[command(name = "stemlab", version, about = "Interactive STEM simulations and algorithm traces")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// YAML config file; missing file means defaults.
    #[arg(long, global = true, default_value = config::DEFAULT_PATH)]
    config: PathBuf,

    #[arg(long, global = true, default_value_t = Level::INFO)]
    log_level: Level,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Damped pendulum (simple or physical)
    Pendulum(RunArgs),
    /// RL circuit step response
    Rl(RunArgs),
    /// LC oscillator
    Lc(RunArgs),
    /// Vertical spring-mass oscillator
    Spring(RunArgs),
    /// Ideal-gas processes on a PV diagram
    Pv(RunArgs),
    /// Natural selection on one trait
    Selection(RunArgs),
    /// List a model's parameters
    Params {
        #[arg(value_enum)]
        model: ModelKind,
    },
    /// Trace a binary search over ascending values
    Search {
        #[arg(allow_negative_numbers = true)]
        target: i64,
        #[arg(required = true, allow_negative_numbers = true)]
        values: Vec<i64>,
    },
    /// Trace Euclid's algorithm
    Gcd { a: u64, b: u64 },
    /// Animate a grid search in the terminal
    Graph(GraphArgs),
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Step without a window and print readouts
    #[arg(long)]
    headless: bool,

    #[arg(long, default_value_t = Defaults::FRAMES)]
    frames: usize,

    /// Fixed dt for headless runs (s)
    #[arg(long, default_value_t = Defaults::DT)]
    dt: f64,

    /// Write history as JSON when the run ends
    #[arg(long)]
    export: Option<PathBuf>,

    /// Parameter override, e.g. --set length=2.0 (repeatable)
    #[arg(long = "set", value_parser = parse_override)]
    set: Vec<(String, f64)>,

    /// Print a readout row every N frames (0 = never)
    #[arg(long, default_value_t = Defaults::PRINT_EVERY)]
    print_every: usize,

    /// Seconds of history shown in the window
    #[arg(long, default_value_t = Defaults::HISTORY_SPAN)]
    span: f64,
}

#[derive(Args, Debug, Clone)]
struct GraphArgs {
    #[arg(long, value_enum, default_value_t = Algorithm::Bfs)]
    algorithm: Algorithm,

    #[arg(long, default_value_t = Defaults::GRID_WIDTH)]
    width: usize,

    #[arg(long, default_value_t = Defaults::GRID_HEIGHT)]
    height: usize,

    /// Fraction of cells turned into walls
    #[arg(long, default_value_t = Defaults::WALL_DENSITY)]
    walls: f64,

    #[arg(long, default_value_t = Defaults::GRAPH_SEED)]
    seed: u64,

    /// Pause between visits (ms)
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,

    /// Only print the final grid
    #[arg(long)]
    quiet: bool,
}

fn run_model<S: Interactive>(args: &RunArgs, cfg: &Config, running: &AtomicBool) -> Result<(), Box<dyn std::error::Error>> {
    let mut sched = app::build_scheduler::<S>(cfg, &args.set)?;
    if args.headless {
        let opts = HeadlessOptions {
            frames: args.frames,
            dt: args.dt,
            export: args.export.clone(),
            print_every: args.print_every,
        };
        let report = app::run_headless(&mut sched, &opts, running)?;
        info!(
            frames = report.frames,
            elapsed = report.elapsed,
            interrupted = report.interrupted,
            exported = ?report.exported,
            "headless run finished"
        );
    } else {
        if args.export.is_some() {
            info!("--export is only used with --headless");
        }
        app::run_window(sched, &cfg.display, args.span, running)?;
    }
    Ok(())
}

fn print_params(model: ModelKind) {
    println!("{} parameters (* = changing it resets the run)", model.name());
    for def in model.param_defs() {
        let mark = if def.policy == stemlab::ChangePolicy::RequiresReset { "*" } else { " " };
        let range = if def.options.is_empty() {
            format!("[{} .. {}] step {}", format_param(def, def.min), format_param(def, def.max), def.step)
        } else {
            def.options.join("|")
        };
        println!(
            "{mark} {:<14} {:>10} {:<6} {:<28} {}",
            def.name,
            format_param(def, def.default),
            def.unit,
            range,
            def.desc
        );
    }
}

fn run_search(target: i64, mut values: Vec<i64>) {
    values.sort_unstable();
    let trace = binary_search_trace(&values, target);
    for (i, s) in trace.steps.iter().enumerate() {
        println!("step {}: lo={} hi={} mid={} value={}", i + 1, s.lo, s.hi, s.mid, s.value);
    }
    match trace.index {
        Some(i) => println!("found {target} at index {i} in {} steps", trace.steps.len()),
        None => println!("{target} not present ({} steps)", trace.steps.len()),
    }
}

fn run_gcd(a: u64, b: u64) {
    let trace = gcd_trace(a, b);
    for s in &trace.steps {
        println!("{} = {} x {} + {}", s.a, s.q, s.b, s.r);
    }
    println!("gcd({a}, {b}) = {}", trace.result);
}

fn run_graph(args: &GraphArgs, running: Arc<AtomicBool>) -> Result<(), Box<dyn std::error::Error>> {
    let (w, h) = (args.width.max(1), args.height.max(1));
    let (start, goal) = (0, w * h - 1);
    let walls = graph::random_walls(w, h, args.walls, args.seed, &[start, goal]);
    let grid = Graph::grid(w, h, &walls);
    info!(algorithm = args.algorithm.name(), width = w, height = h, walls = walls.len(), "graph search");

    let (handle, events) = spawn_traversal(grid, args.algorithm, start, goal, Duration::from_millis(args.delay_ms), running);
    let mut settled = Vec::new();
    let mut path = Vec::new();
    for event in events {
        match event {
            TraversalEvent::Visit { node, frontier, distance } => {
                settled.push(node);
                if !args.quiet {
                    println!("visit ({}, {}) dist={distance} frontier={}", node % w, node / w, frontier.len());
                }
            }
            TraversalEvent::PathFound { path: p, cost } => {
                println!("path found: {} steps, cost {cost}", p.len() - 1);
                path = p;
            }
            TraversalEvent::Unreachable => println!("goal unreachable"),
        }
    }
    let summary = handle.join().map_err(|_| "traversal worker panicked")?;
    if summary.cancelled {
        println!("cancelled after {} events", summary.delivered);
    }
    println!("{}", graph::ascii_grid(w, h, &walls, &settled, &path));
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .init();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let cfg = config::load(&cli.config);

    match &cli.command {
        Command::Pendulum(args) => run_model::<Pendulum>(args, &cfg, &running)?,
        Command::Rl(args) => run_model::<RlCircuit>(args, &cfg, &running)?,
        Command::Lc(args) => run_model::<LcCircuit>(args, &cfg, &running)?,
        Command::Spring(args) => run_model::<SpringMass>(args, &cfg, &running)?,
        Command::Pv(args) => run_model::<PvCycle>(args, &cfg, &running)?,
        Command::Selection(args) => run_model::<Selection>(args, &cfg, &running)?,
        Command::Params { model } => print_params(*model),
        Command::Search { target, values } => run_search(*target, values.clone()),
        Command::Gcd { a, b } => run_gcd(*a, *b),
        Command::Graph(args) => run_graph(args, running.clone())?,
    }
    Ok(())
}
