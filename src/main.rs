//! # distance-consensus - CLI Entry Point
//!
//! Thin file wrapper around the library: materialize the inputs from JSON,
//! run the thresholding, write both group networks back out.
//!
//! Commands:
//! - `run`         - Compute group networks from an input file
//! - `summary`     - Print edge counts and per-bin quotas of a saved result
//! - `init-config` - Generate a default configuration file

use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::{Path, PathBuf};

use distance_consensus::threshold::GroupThresholder;
use distance_consensus::{
    ResultFile, ThresholdConfig, ThresholdError, ThresholdInputs, ThresholdResult,
};

/// Distance-dependent consensus thresholding of per-subject networks.
///
/// Builds a group network whose edge-length distribution matches the
/// typical subject, plus a classic consensus network for comparison.
#[derive(Parser, Debug)]
#[command(name = "distance-consensus")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "distance-consensus.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compute the group networks.
    Run {
        /// JSON file with `subjects`, `dist` and `hemiid`.
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the result JSON.
        #[arg(short, long, default_value = "group-networks.json")]
        output: PathBuf,

        /// Override the configured number of distance bins.
        #[arg(long)]
        nbins: Option<usize>,
    },

    /// Summarize a saved result.
    Summary {
        /// Result JSON written by `run`.
        #[arg(short, long, default_value = "group-networks.json")]
        result: PathBuf,
    },

    /// Generate a default configuration file.
    InitConfig,
}

fn main() -> ThresholdResult<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            ref input,
            ref output,
            nbins,
        } => cmd_run(&cli.config, input, output, nbins),
        Commands::Summary { ref result } => cmd_summary(result),
        Commands::InitConfig => cmd_init_config(&cli.config),
    }
}

fn load_config(config_path: &Path) -> ThresholdResult<ThresholdConfig> {
    if config_path.exists() {
        info!("Loading configuration from: {}", config_path.display());
        ThresholdConfig::from_file(config_path)
    } else {
        info!("No config file found, using defaults. Run 'init-config' to generate one.");
        Ok(ThresholdConfig::default())
    }
}

/// Compute both group networks and save them.
///
/// Bin count precedence: `--nbins`, then `nbins` in the input file, then
/// the configuration.
fn cmd_run(
    config_path: &Path,
    input: &Path,
    output: &Path,
    nbins_override: Option<usize>,
) -> ThresholdResult<()> {
    let mut config = load_config(config_path)?;

    info!("Reading inputs from: {}", input.display());
    let inputs = ThresholdInputs::from_file(input)?;
    if let Some(nbins) = nbins_override.or(inputs.nbins) {
        config.binning.nbins = nbins;
    }
    config.validate()?;

    let (subjects, dist, hemiid) = inputs.into_parts()?;
    info!(
        "{} subjects, {} nodes, {} distance bins",
        subjects.subject_count(),
        subjects.node_count(),
        config.binning.nbins,
    );

    let thresholder = GroupThresholder::new(&config.binning);
    let mut networks = thresholder.run(&subjects, &dist, &hemiid)?;

    info!(
        "Distance-matched network: {} edges ({:.1}% density); consensus network: {} edges",
        networks.distance_edge_count(),
        networks.density() * 100.0,
        networks.consensus_edge_count(),
    );

    if !config.output.include_report {
        networks.categories.clear();
    }

    let result = ResultFile {
        computed_at: chrono::Utc::now(),
        input: Some(input.to_path_buf()),
        nbins: config.binning.nbins,
        subjects: subjects.subject_count(),
        networks,
    };
    result.save(output, config.output.pretty)?;
    println!("Group networks written to: {}", output.display());

    Ok(())
}

/// Print a saved result.
fn cmd_summary(result_path: &Path) -> ThresholdResult<()> {
    let result = ResultFile::load(result_path)?;
    let networks = &result.networks;

    println!("Result: {}", result_path.display());
    println!("  Computed at: {}", result.computed_at.to_rfc3339());
    if let Some(ref input) = result.input {
        println!("  Input: {}", input.display());
    }
    println!("  Nodes: {}", networks.distance.n());
    println!("  Subjects: {}", result.subjects);
    println!("  Distance bins: {}", result.nbins);
    println!(
        "  Distance-matched edges: {} ({:.1}% density)",
        networks.distance_edge_count(),
        networks.density() * 100.0
    );
    println!("  Consensus edges: {}", networks.consensus_edge_count());

    if !networks.distance.is_symmetric() || !networks.consensus.is_symmetric() {
        warn!("Stored networks are not symmetric; the file may have been edited");
    }

    if networks.categories.is_empty() {
        println!("  (no per-category report stored)");
        return Ok(());
    }

    for report in &networks.categories {
        println!();
        println!("{}:", report.category);
        println!("  Node pairs: {}", report.available_pairs);
        println!("  Pooled subject edges: {}", report.pooled_edges);
        println!("  Target edges per subject: {:.2}", report.target);
        println!(
            "  Selected: {} distance-matched, {} consensus",
            report.distance_edges, report.consensus_edges
        );
        println!(
            "  {:>4}  {:>20}  {:>7}  {:>6}  {:>10}  {:>8}",
            "bin", "range", "pooled", "quota", "candidates", "selected"
        );
        for bin in &report.bins {
            println!(
                "  {:>4}  [{:>8.3}, {:>8.3})  {:>7}  {:>6}  {:>10}  {:>8}",
                bin.bin, bin.lower, bin.upper, bin.pooled, bin.quota, bin.candidates, bin.selected
            );
        }
    }

    Ok(())
}

/// Generate a default configuration file.
fn cmd_init_config(config_path: &Path) -> ThresholdResult<()> {
    if config_path.exists() {
        return Err(ThresholdError::Config(format!(
            "Configuration file already exists: {}. Remove it first or use a different path.",
            config_path.display()
        )));
    }

    ThresholdConfig::write_default(config_path)?;
    println!("Default configuration written to: {}", config_path.display());
    println!();
    println!("Key settings to configure:");
    println!("  [binning] - nbins (default 10) and the last-edge padding in distance units");
    println!("  [output]  - pretty-printing and whether to store the per-bin report");

    Ok(())
}
