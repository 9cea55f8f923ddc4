use clap::Parser;
use sf_flowsheet::{CascadeConfig, Flowsheet, FlowsheetResult};
use sf_graph::{MixingStrategy, Side};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

#[derive(Parser)]
#[command(name = "sf-cli")]
#[command(about = "SepFlow CLI - Membrane diafiltration cascade simulation", long_about = None)]
struct Cli {
    /// Mixing strategy: feed-only or recycle
    mixing: MixingStrategy,
    /// Number of membrane stages
    stages: usize,
    /// Tube elements per stage
    tubes: usize,
    /// Cascade configuration YAML; positional arguments override it
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Volume both precipitators are fixed to after initialization [m^3]
    #[arg(long)]
    precipitator_volume: Option<f64>,
}

fn main() -> FlowsheetResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => CascadeConfig::load_yaml(path)?,
        None => CascadeConfig::default(),
    };
    config.mixing = cli.mixing;
    config.stages = cli.stages;
    config.tubes = cli.tubes;
    let volume = cli
        .precipitator_volume
        .unwrap_or(config.precipitator_volume_m3);

    let start = Instant::now();
    let mut fs = Flowsheet::build(config)?;
    let solver = fs.default_solver();

    let init = fs.initialize(&solver)?;
    info!(
        units = init.order.len(),
        guessed = init.guessed.len(),
        released = init.released,
        "initialized"
    );
    if fs.config().precipitate {
        for side in Side::BOTH {
            fs.fix_precipitator_volume(side, volume)?;
        }
    }

    println!("{}", fs.statistics());
    let outcome = fs.solve(&solver)?;
    println!(
        "Solver status: {} ({} iterations, {:.2} ms)",
        outcome.status,
        outcome.iterations,
        start.elapsed().as_secs_f64() * 1000.0
    );

    if fs.config().precipitate {
        println!("prec_perc_co: {:.4}", fs.prec_perc_co()?);
        println!("prec_perc_li: {:.4}", fs.prec_perc_li()?);
    }
    println!();
    print!("{}", fs.stream_report()?);
    Ok(())
}
