//! Fedisample - fediverse instance statistics and sampling
//!
//! The CLI surface around the core engine:
//! - Obtaining per-instance statistics from the network
//! - Correlation analysis to pick stratification statistics
//! - Weighted sampling with probe-driven rejection top-up
//! - Percentile-stratified sampling
//! - Crawling chosen instances' public timelines to a file

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use fedisample_common::{
    write_instance_list, write_rejected_json, write_sample_csv, Config, Dataset, Error, Result,
    StatKey,
};
use fedisample_core::analyze::{assign_weights, correlate};
use fedisample_core::crawl::Poller;
use fedisample_core::exit_codes::ExitCode;
use fedisample_core::load::load;
use fedisample_core::logging::{init_logging, LogFormat};
use fedisample_core::obtain::obtain;
use fedisample_core::probe::HttpTimelineProbe;
use fedisample_core::select::{sample_stratified, sample_weighted};
use fedisample_core::store::{JsonlSink, StatusBuffer};

/// Fedisample - representative instance selection for fediverse crawling
#[derive(Parser)]
#[command(name = "fedisample")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Path to a JSON config file
    #[arg(long, global = true, env = "FEDISAMPLE_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (warnings and errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log output format on stderr
    #[arg(long, global = true, default_value_t = LogFormat::Human)]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch nodeinfo and weekly activity for a list of instances
    Obtain {
        /// JSON array file of instance hostnames (sorted)
        #[arg(long)]
        nodes: PathBuf,
        /// JSONL output file (appended; supports resume)
        #[arg(long)]
        output: PathBuf,
    },

    /// Report the correlation matrix and suggested stratification stats
    Correlate {
        /// Instance statistics JSONL file
        #[arg(long)]
        data: PathBuf,
        /// Primary statistic the suggested pair must be independent of
        #[arg(long, default_value = "total_users")]
        primary: String,
    },

    /// Draw a likelihood-weighted sample with availability probing
    Choose {
        /// Instance statistics JSONL file
        #[arg(long)]
        data: PathBuf,
        /// Prefix for the output artifacts (.csv, .txt, _removed.json)
        #[arg(long)]
        out_prefix: PathBuf,
        /// Target sample size (config default: 1000)
        #[arg(long)]
        sample_size: Option<usize>,
        /// Statistics to weight on, comma separated
        #[arg(long, value_delimiter = ',')]
        stats: Vec<String>,
    },

    /// Draw a percentile-stratified sample
    Stratify {
        /// Instance statistics JSONL file
        #[arg(long)]
        data: PathBuf,
        /// Target sample size (config default: 1000)
        #[arg(long)]
        sample_size: Option<usize>,
        /// Statistics to stratify on, comma separated
        #[arg(long, value_delimiter = ',')]
        stats: Vec<String>,
        /// Write chosen instance ids here instead of stdout
        #[arg(long)]
        sample_file: Option<PathBuf>,
        /// Write the bucket audit structure here as JSON
        #[arg(long)]
        buckets_file: Option<PathBuf>,
    },

    /// Poll an instance's public timeline and append statuses to a file
    Crawl {
        /// Instance base host, e.g. mastodon.cloud
        #[arg(long)]
        instance: String,
        /// JSONL output file for crawled statuses
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.global.verbose, cli.global.quiet, cli.global.log_format);
    let exit_code = match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error[{}]: {}", e.code(), e);
            ExitCode::from(&e)
        }
    };
    std::process::exit(exit_code.as_i32());
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let config = Config::load(cli.global.config.as_deref())?;
    match &cli.command {
        Commands::Obtain { nodes, output } => {
            obtain(nodes, output, &config.probe)?;
            Ok(ExitCode::Clean)
        }
        Commands::Correlate { data, primary } => run_correlate(&config, data, primary),
        Commands::Choose {
            data,
            out_prefix,
            sample_size,
            stats,
        } => run_choose(&config, data, out_prefix, *sample_size, stats),
        Commands::Stratify {
            data,
            sample_size,
            stats,
            sample_file,
            buckets_file,
        } => run_stratify(
            &config,
            data,
            *sample_size,
            stats,
            sample_file.as_deref(),
            buckets_file.as_deref(),
        ),
        Commands::Crawl { instance, output } => run_crawl(&config, instance, output),
    }
}

fn load_dataset(path: &Path, config: &Config) -> Result<Dataset> {
    let file = File::open(path)?;
    let (dataset, _) = load(BufReader::new(file), config)?;
    Ok(dataset)
}

/// Resolve the statistics named on the CLI, falling back to the configured
/// defaults.
fn resolve_stats(named: &[String], config: &Config) -> Result<Vec<StatKey>> {
    let names = if named.is_empty() {
        &config.sample.stats
    } else {
        named
    };
    if names.is_empty() || names.len() > 3 {
        return Err(Error::Config(
            "between 1 and 3 statistics must be chosen".into(),
        ));
    }
    names
        .iter()
        .map(|name| {
            name.parse::<StatKey>()
                .map_err(|_| Error::UnknownStat { name: name.clone() })
        })
        .collect()
}

fn run_correlate(config: &Config, data: &Path, primary: &str) -> Result<ExitCode> {
    let primary: StatKey = primary
        .parse()
        .map_err(|_| Error::UnknownStat {
            name: primary.to_string(),
        })?;
    let dataset = load_dataset(data, config)?;
    let report = correlate(&dataset, primary)?;
    serde_json::to_writer_pretty(std::io::stdout().lock(), &report)?;
    println!();
    Ok(ExitCode::Clean)
}

fn run_choose(
    config: &Config,
    data: &Path,
    out_prefix: &Path,
    sample_size: Option<usize>,
    stats: &[String],
) -> Result<ExitCode> {
    let sample_size = sample_size.unwrap_or(config.sample.size);
    let stats = resolve_stats(stats, config)?;
    let mut dataset = load_dataset(data, config)?;
    assign_weights(&mut dataset, &stats)?;
    let probe = HttpTimelineProbe::new(&config.probe)?;
    let result = sample_weighted(
        &dataset,
        sample_size,
        &probe,
        &config.probe,
        &mut rand::rng(),
    )?;

    let prefix = out_prefix.display();
    write_sample_csv(
        BufWriter::new(File::create(format!("{prefix}.csv"))?),
        &result.kept,
    )?;
    write_instance_list(
        BufWriter::new(File::create(format!("{prefix}.txt"))?),
        &result.kept,
    )?;
    write_rejected_json(
        BufWriter::new(File::create(format!("{prefix}_removed.json"))?),
        &result.rejected,
    )?;
    if result.target_met() {
        Ok(ExitCode::Clean)
    } else {
        Ok(ExitCode::PartialSample)
    }
}

fn run_stratify(
    config: &Config,
    data: &Path,
    sample_size: Option<usize>,
    stats: &[String],
    sample_file: Option<&Path>,
    buckets_file: Option<&Path>,
) -> Result<ExitCode> {
    let sample_size = sample_size.unwrap_or(config.sample.size);
    let stats = resolve_stats(stats, config)?;
    let dataset = load_dataset(data, config)?;
    let sample = sample_stratified(&dataset, &stats, sample_size, &mut rand::rng())?;

    match sample_file {
        Some(path) => write_instance_list(BufWriter::new(File::create(path)?), &sample.chosen)?,
        None => write_instance_list(std::io::stdout().lock(), &sample.chosen)?,
    }
    if let Some(path) = buckets_file {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, &sample.buckets)?;
        writer.flush()?;
    }
    Ok(ExitCode::Clean)
}

fn run_crawl(config: &Config, instance: &str, output: &Path) -> Result<ExitCode> {
    let poller = Poller::new(instance, &config.crawl, &config.probe.user_agent)?;
    let buffer = StatusBuffer::new(&config.store);
    let mut sink = JsonlSink::append(output)?;
    poller.run(&buffer, &mut sink, None, false)?;
    Ok(ExitCode::Clean)
}
