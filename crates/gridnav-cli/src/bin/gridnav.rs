use anyhow::{Context, Result};
use clap::Parser;
use gridnav_cli::{run_pipeline, write_commands};
use gridnav_core::{read_fix_file, NavConfig};
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Hex-encoded UBX NAV-POSLLH frames, start fix then goal fix
    gps_data_file: PathBuf,

    /// Where to write drive time and total rotation
    output_file: PathBuf,

    /// JSON grid/motion config; built-in field setup when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the occupancy grid before planning
    #[arg(long)]
    print_grid: bool,

    /// Print the full route report as JSON
    #[arg(long)]
    json: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with((!args.log_json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .with(args.log_json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with(EnvFilter::from_default_env().add_directive("gridnav=debug".parse()?))
        .init();

    let mut config = match &args.config {
        Some(path) => NavConfig::from_json_file(path)?,
        None => NavConfig::default(),
    };
    config.apply_env().context("applying GRIDNAV_* overrides")?;
    config.validate().context("invalid navigation config")?;

    let (start, goal) = read_fix_file(&args.gps_data_file)?;
    println!("Start -> Lat: {} Lon: {}", start.lat, start.lon);
    println!("Goal  -> Lat: {} Lon: {}", goal.lat, goal.lon);

    if args.print_grid {
        print!("{}", config.build_grid(start));
    }

    let report = run_pipeline(start, goal, &config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Start (grid) -> {}", report.start_cell);
        println!("Goal  (grid) -> {}", report.goal_cell);
        println!("Fix separation (m): {:.4}", report.fix_separation_m);
        println!("Planned Path:");
        println!("{}", report.path_line());
        if let Some(failure) = report.failure {
            println!("No path: {}", failure.describe());
        }
        println!();
        println!("Odometry Commands");
        println!("Distance (m): {:.4}", report.command.distance_m);
        println!("Time (s): {:.4}", report.command.time_s);
        println!("Total rotation (deg): {:.4}", report.command.rotation_deg);
    }

    write_commands(&args.output_file, &report.command)?;
    Ok(())
}
