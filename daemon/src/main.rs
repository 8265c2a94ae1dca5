//! Governance daemon — replays stabilized history and reports committee state.

use anyhow::{bail, Context};
use clap::Parser;
use opgov_governance::config::ConfigFile;
use opgov_governance::{
    parse_history, verify_replay, Genesis, GovernanceConfig, GovernanceEngine, StateDigest,
    Subject, TallyEntry,
};
use opgov_store_lmdb::{LmdbEnvironment, LmdbGovernanceStore};
use opgov_types::NetworkId;
use opgov_utils::{format_duration, init_logging, LogFormat};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "opgov-daemon", about = "Order-provider committee governance daemon")]
struct Cli {
    /// Network: "live", "test", or "dev".
    /// When a config file is provided, defaults to the file's network value.
    #[arg(long, env = "OPGOV_NETWORK")]
    network: Option<NetworkId>,

    /// Data directory for the LMDB store.
    #[arg(long, default_value = "./opgov_data", env = "OPGOV_DATA_DIR")]
    data_dir: PathBuf,

    /// LMDB map size in MiB.
    #[arg(long, default_value_t = 256, env = "OPGOV_MAP_SIZE_MB")]
    map_size_mb: usize,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, default_value = "info", env = "OPGOV_LOG_LEVEL")]
    log_level: String,

    /// Log format: "human" or "json".
    #[arg(long, default_value = "human", env = "OPGOV_LOG_FORMAT")]
    log_format: LogFormat,

    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long, env = "OPGOV_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Apply a history file (JSON lines) to the store.
    Replay {
        /// History file to apply.
        #[arg(long)]
        history: PathBuf,

        /// Fail unless the resulting state digest equals this value.
        #[arg(long)]
        expect_digest: Option<StateDigest>,
    },
    /// Print the current vote tally.
    Tally {
        /// Only this subject (e.g. "op_list"); every subject when omitted.
        #[arg(long)]
        subject: Option<Subject>,
    },
    /// Print active values, the committee and pending counts.
    Show,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format, &cli.log_level)
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))?;

    let (config, genesis) = load_config(cli.config.as_deref(), cli.network)?;
    let env = LmdbEnvironment::open(&cli.data_dir, cli.map_size_mb * 1024 * 1024)
        .with_context(|| format!("opening store at {}", cli.data_dir.display()))?;
    let mut engine = open_engine(&env, config, genesis.as_ref())?;

    match cli.command {
        Command::Replay {
            history,
            expect_digest,
        } => {
            let file = File::open(&history)
                .with_context(|| format!("opening history {}", history.display()))?;
            let events = parse_history(BufReader::new(file))?;
            tracing::info!(events = events.len(), file = %history.display(), "replaying history");

            let summary = match expect_digest {
                Some(expected) => verify_replay(&mut engine, &events, &expected)?,
                None => opgov_governance::replay(&mut engine, &events)?,
            };
            println!(
                "votes recorded: {}, stale: {}, refused: {}, already applied: {}",
                summary.votes_recorded,
                summary.votes_stale,
                summary.messages_refused,
                summary.already_applied
            );
            println!(
                "counts submitted: {}, activations: {}, rejections: {}",
                summary.counts_submitted,
                summary.activations.len(),
                summary.rejections
            );
            for record in &summary.activations {
                println!(
                    "  {} = {} (version {}, at {})",
                    record.subject, record.value, record.version, record.activated_at
                );
            }
            println!("digest: {}", engine.digest()?);
        }
        Command::Tally { subject } => {
            let tallies: BTreeMap<Subject, Vec<TallyEntry>> = match subject {
                Some(subject) => [(subject, engine.tally(subject)?)].into_iter().collect(),
                None => engine.tally_all()?,
            };
            for (subject, entries) in tallies {
                println!("{subject}:");
                if entries.is_empty() {
                    println!("  (no votes)");
                }
                for entry in entries {
                    println!(
                        "  {} weight={} voters={} since {}",
                        entry.value,
                        entry.total_weight,
                        entry.voters.len(),
                        entry.earliest_cast_at
                    );
                }
            }
        }
        Command::Show => {
            println!("network: {}", engine.config().network.as_str());
            println!(
                "ordinary gate: quorum {} / age {}",
                engine.config().ordinary.quorum,
                format_duration(engine.config().ordinary.min_vote_age_secs)
            );
            println!(
                "emergency gate: quorum {} / age {}",
                engine.config().emergency.quorum,
                format_duration(engine.config().emergency.min_vote_age_secs)
            );
            for record in engine.state().iter() {
                println!(
                    "{} = {} (version {}, by {})",
                    record.subject, record.value, record.version, record.activated_by
                );
            }
            for trigger in engine.pending_counts() {
                println!(
                    "pending count: {} ({}) at {}",
                    trigger.subject, trigger.path, trigger.point
                );
            }
            match engine.last_applied_index()? {
                Some(index) => println!("last applied index: {index}"),
                None => println!("last applied index: none"),
            }
            println!("digest: {}", engine.digest()?);
        }
    }

    Ok(())
}

/// Layer the optional TOML file under the CLI network flag.
fn load_config(
    path: Option<&Path>,
    network: Option<NetworkId>,
) -> anyhow::Result<(GovernanceConfig, Option<Genesis>)> {
    let mut file = match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            let file: ConfigFile = toml::from_str(&contents)
                .with_context(|| format!("parsing config {}", path.display()))?;
            tracing::info!("loaded config from {}", path.display());
            file
        }
        None => ConfigFile::default(),
    };
    if network.is_some() {
        file.network = network;
    }
    let config = file.resolve();
    config.validate()?;
    Ok((config, file.genesis))
}

fn open_engine(
    env: &LmdbEnvironment,
    config: GovernanceConfig,
    genesis: Option<&Genesis>,
) -> anyhow::Result<GovernanceEngine<LmdbGovernanceStore>> {
    match GovernanceEngine::open(env.governance_store(), config, genesis) {
        Ok(engine) => Ok(engine),
        Err(opgov_governance::GovernanceError::MissingActiveValue(subject)) if genesis.is_none() => {
            bail!("store has no value for {subject} and the configuration has no [genesis] table")
        }
        Err(e) => Err(e.into()),
    }
}
