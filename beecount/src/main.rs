use clap::Parser;
use env_logger::{Builder, Env};
use log::{error, info, Level};
use std::io::Write;

use beecount::batch_processing::run_count;
use beecount::color_utils::{colors, init_color_config, symbols};
use beecount::config::{CountCommand, CountConfig, GlobalArgs};

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Estimate the number of bees on the landing pad in each image
    Count(CountCommand),

    /// Show version information
    Version,
}

#[derive(Parser)]
#[command(name = "beecount")]
#[command(about = "Estimate bee counts on hive landing pads from still images")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

fn get_log_level_from_verbosity(
    verbosity: clap_verbosity_flag::Verbosity<clap_verbosity_flag::ErrorLevel>,
) -> log::LevelFilter {
    // -q cannot be told apart from the default through the level alone
    if verbosity.is_silent() {
        return log::LevelFilter::Error;
    }
    match verbosity.log_level_filter() {
        log::LevelFilter::Off => log::LevelFilter::Off,
        log::LevelFilter::Error => log::LevelFilter::Warn, // default
        log::LevelFilter::Warn => log::LevelFilter::Info,  // -v
        log::LevelFilter::Info => log::LevelFilter::Debug, // -vv
        log::LevelFilter::Debug | log::LevelFilter::Trace => log::LevelFilter::Trace,
    }
}

fn init_logger(global: &GlobalArgs) {
    // If user didn't pass -v/-q and RUST_LOG is set, honor the env var.
    let use_env = !global.verbosity.is_present() && std::env::var_os("RUST_LOG").is_some();

    let mut logger = if use_env {
        Builder::from_env(Env::default())
    } else {
        let mut b = Builder::new();
        b.filter_level(get_log_level_from_verbosity(global.verbosity.clone()));
        b
    };

    logger
        .format(|buf, record| {
            let level_str = match record.level() {
                Level::Error => colors::error_level("ERROR"),
                Level::Warn => colors::warning_level("WARN"),
                Level::Info => colors::info_level("INFO"),
                Level::Debug => colors::debug_level("DEBUG"),
                Level::Trace => colors::trace_level("TRACE"),
            };
            writeln!(buf, "[{}] {}", level_str, record.args())
        })
        .init();
}

fn run_count_command(global: &GlobalArgs, count_cmd: &CountCommand) -> anyhow::Result<()> {
    let sources_desc = if count_cmd.sources.len() == 1 {
        count_cmd.sources[0].clone()
    } else {
        format!("{} inputs", count_cmd.sources.len())
    };
    info!(
        "{}Bee count: {} | avg bee area: {} px",
        symbols::counting_start(),
        sources_desc,
        count_cmd.avg_bee_area
    );

    let config =
        CountConfig::from_args(global.clone(), count_cmd.clone()).map_err(anyhow::Error::msg)?;

    let summary = run_count(&config)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for count in &summary.counts {
        writeln!(out, "{}", count.output_line(config.with_names))?;
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    init_color_config(cli.global.no_color);
    init_logger(&cli.global);

    match &cli.command {
        Some(Commands::Count(count_cmd)) => {
            if let Err(e) = run_count_command(&cli.global, count_cmd) {
                error!("{}Bee count failed: {e:#}", symbols::operation_failed());
                std::process::exit(1);
            }
        }
        Some(Commands::Version) => {
            println!("beecount v{}", env!("CARGO_PKG_VERSION"));
            println!("Repository: {}", env!("CARGO_PKG_REPOSITORY"));
        }
        None => {
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            if cmd.print_help().is_err() {
                std::process::exit(2);
            }
        }
    }
}
