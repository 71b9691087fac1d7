use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use color_eyre::Result;
use eyre::WrapErr;
use nft_minter::MinterError;
use nft_minter::config::{ConfigLayer, MintConfig, networks};
use nft_minter::minter::{MintAttemptRecord, MintRunner, Minter};
use nft_minter::units::format_time_remaining;

const DEFAULT_ESTIMATE_AMOUNTS: [u64; 4] = [1, 5, 10, 20];
const LOG_DIR: &str = "logs";

#[derive(Parser, Debug)]
#[command(name = "nft-minter")]
#[command(about = "Automated NFT minting on EVM-compatible chains")]
#[command(version)]
struct Cli {
    /// Path to the configuration file (TOML, or JSON with a .json extension)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the network (e.g. ARBITRUM_ONE, BERACHAIN)
    #[arg(short, long, global = true)]
    network: Option<String>,

    /// Override the mint amount; -1 mints the maximum allowed
    #[arg(short, long, global = true, allow_hyphen_values = true)]
    amount: Option<i64>,

    /// Override the group ID
    #[arg(short, long, global = true)]
    group: Option<u64>,

    /// Override the recipient address (default: your wallet)
    #[arg(long, global = true)]
    to_address: Option<String>,

    /// Simulate minting without sending transactions
    #[arg(long, global = true)]
    dry_run: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Do not write a log file under ./logs
    #[arg(long, global = true)]
    no_log_file: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect, wait for the sale to open and mint once (default)
    Mint {
        /// Seconds between mint-live checks
        #[arg(long, default_value_t = 10)]
        check_interval: u64,
        /// Seconds to wait for the sale to open
        #[arg(long, default_value_t = 3600)]
        live_timeout: u64,
    },
    /// Mint with automatic retries
    Retry {
        #[arg(long, default_value_t = 3)]
        attempts: u32,
        /// Seconds between attempts
        #[arg(long, default_value_t = 5)]
        delay: u64,
        /// Write the attempt history as JSON
        #[arg(long)]
        history: Option<PathBuf>,
    },
    /// Mint a large quantity in several transactions
    Batch {
        /// Total number of tokens to mint
        #[arg(long)]
        total: u64,
        #[arg(long, default_value_t = 10)]
        batch_size: u64,
        /// Seconds between batches
        #[arg(long, default_value_t = 2)]
        delay: u64,
        /// Write the attempt history as JSON
        #[arg(long)]
        history: Option<PathBuf>,
    },
    /// Watch the contract and mint as soon as the sale opens
    Monitor {
        /// Seconds between checks
        #[arg(long, default_value_t = 30)]
        interval: u64,
        /// Seconds before giving up
        #[arg(long, default_value_t = 3600)]
        max_wait: u64,
    },
    /// Estimate mint and gas cost for one or more amounts
    Estimate {
        /// Amounts to price (default: 1 5 10 20)
        amounts: Vec<u64>,
    },
    /// Mint at a given time, optionally repeating
    Schedule {
        /// Unix timestamp (seconds) to mint at
        #[arg(long, conflicts_with = "after")]
        at: Option<u64>,
        /// Seconds from now to mint at
        #[arg(long)]
        after: Option<u64>,
        /// Repeat every N seconds instead of minting once
        #[arg(long)]
        every: Option<u64>,
        /// Number of repetitions (default: unlimited)
        #[arg(long, requires = "every")]
        times: Option<u32>,
    },
    /// Write an example configuration file
    InitConfig {
        #[arg(default_value = "config.toml")]
        path: PathBuf,
    },
    /// List supported networks
    Networks,
}

/// A workflow ran to completion without minting
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct WorkflowFailed(&'static str);

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = color_eyre::install() {
        eprintln!("Failed to install error handler: {}", e);
    }

    let cli = Cli::parse();
    init_tracing(cli.verbose, !cli.no_log_file);

    tokio::select! {
        result = run(cli) => exit_code(result),
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Process interrupted by user");
            ExitCode::from(130)
        }
    }
}

fn init_tracing(verbose: bool, to_file: bool) {
    use std::sync::Mutex;
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let default_filter = if verbose {
        "nft_minter=debug"
    } else {
        "nft_minter=info"
    };

    let file_layer = to_file
        .then(|| create_log_file(Path::new(LOG_DIR)))
        .flatten()
        .map(|file| fmt::layer().with_ansi(false).with_writer(Mutex::new(file)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();
}

/// `<dir>/nft_minter_<unix seconds>.log`, one per run
fn create_log_file(dir: &Path) -> Option<fs::File> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let path = dir.join(format!("nft_minter_{}.log", timestamp));

    match fs::create_dir_all(dir).and_then(|_| fs::File::create(&path)) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("Could not create log file {}: {}", path.display(), e);
            None
        }
    }
}

fn exit_code(result: Result<()>) -> ExitCode {
    let err = match result {
        Ok(()) => return ExitCode::SUCCESS,
        Err(err) => err,
    };

    if let Some(minter_err) = err.downcast_ref::<MinterError>() {
        if minter_err.is_configuration() {
            tracing::error!("Configuration error: {}", minter_err);
            return ExitCode::from(1);
        }
        tracing::error!("Minting error: {}", minter_err);
        return ExitCode::from(2);
    }

    if let Some(failed) = err.downcast_ref::<WorkflowFailed>() {
        tracing::error!("Minting error: {}", failed);
        return ExitCode::from(2);
    }

    tracing::error!("Unexpected error: {:?}", err);
    ExitCode::from(3)
}

async fn run(cli: Cli) -> Result<()> {
    let default_command = Command::Mint {
        check_interval: 10,
        live_timeout: 3600,
    };
    let command = cli.command.as_ref().unwrap_or(&default_command);

    match command {
        Command::InitConfig { path } => return init_config(path),
        Command::Networks => {
            print_networks();
            return Ok(());
        }
        _ => {}
    }

    tracing::info!("NFT Minter starting...");
    let config = load_config(&cli)?;
    if cli.dry_run {
        tracing::info!("DRY RUN MODE - No transactions will be executed");
    }

    match command {
        Command::Mint {
            check_interval,
            live_timeout,
        } => {
            mint_once(
                config,
                cli.dry_run,
                Duration::from_secs(*check_interval),
                Duration::from_secs(*live_timeout),
            )
            .await
        }
        Command::Retry {
            attempts,
            delay,
            history,
        } => {
            let mut runner = MintRunner::new(config, cli.dry_run);
            let ok = runner
                .mint_with_retry(*attempts, Duration::from_secs(*delay))
                .await;
            write_history(history.as_deref(), runner.history())?;
            ok.then_some(())
                .ok_or_else(|| WorkflowFailed("All mint attempts failed").into())
        }
        Command::Batch {
            total,
            batch_size,
            delay,
            history,
        } => {
            let mut runner = MintRunner::new(config, cli.dry_run);
            let completed = runner
                .mint_in_batches(*total, *batch_size, Duration::from_secs(*delay))
                .await?;
            write_history(history.as_deref(), runner.history())?;

            println!("Completed {} batch transaction(s)", completed.len());
            for record in &completed {
                match record.tx_hash {
                    Some(hash) => println!("  {}", hash),
                    None => println!("  (dry run)"),
                }
            }

            let minted_all = completed.len() as u64 == total.div_ceil(*batch_size);
            minted_all
                .then_some(())
                .ok_or_else(|| WorkflowFailed("Batch minting stopped early").into())
        }
        Command::Monitor { interval, max_wait } => {
            let mut runner = MintRunner::new(config, cli.dry_run);
            let ok = runner
                .monitor_and_mint(Duration::from_secs(*interval), Duration::from_secs(*max_wait))
                .await;
            ok.then_some(())
                .ok_or_else(|| WorkflowFailed("Monitoring ended without a mint").into())
        }
        Command::Estimate { amounts } => {
            let runner = MintRunner::new(config, cli.dry_run);
            let amounts = if amounts.is_empty() {
                DEFAULT_ESTIMATE_AMOUNTS.to_vec()
            } else {
                amounts.clone()
            };

            for amount in amounts {
                let cost = runner.estimate_total_cost(amount).await?;
                println!("\nMinting {} NFT(s):", cost.amount);
                println!("  Mint cost: {}", cost.mint_cost_eth());
                println!("  Gas cost:  {} ({} gas at {})", cost.gas_cost_eth(), cost.estimated_gas, cost.gas_price_gwei());
                println!("  Total:     {}", cost.total_cost_eth());
            }
            Ok(())
        }
        Command::Schedule {
            at,
            after,
            every,
            times,
        } => {
            let mut runner = MintRunner::new(config, cli.dry_run);

            let target = match (at, after) {
                (Some(at), _) => Some(UNIX_EPOCH + Duration::from_secs(*at)),
                (None, Some(after)) => Some(SystemTime::now() + Duration::from_secs(*after)),
                (None, None) => None,
            };

            if let Some(every) = every {
                if let Some(target) = target {
                    let wait = target
                        .duration_since(SystemTime::now())
                        .unwrap_or_default();
                    tracing::info!("First mint in {}", format_time_remaining(wait.as_secs()));
                    tokio::time::sleep(wait).await;
                }
                let successes = runner
                    .recurring_mint(Duration::from_secs(*every), *times)
                    .await;
                println!("Recurring mint finished with {} success(es)", successes);
                return Ok(());
            }

            let target = target.ok_or_else(|| {
                MinterError::Validation("schedule needs --at, --after or --every".to_string())
            })?;
            runner
                .schedule_mint_at(target)
                .await
                .then_some(())
                .ok_or_else(|| WorkflowFailed("Scheduled mint failed").into())
        }
        Command::InitConfig { .. } | Command::Networks => Ok(()),
    }
}

fn load_config(cli: &Cli) -> Result<MintConfig> {
    let mut overrides = ConfigLayer::default();

    if let Some(network) = &cli.network {
        tracing::info!("Network overridden to: {}", network);
        overrides.network.name = Some(network.clone());
    }
    if let Some(amount) = cli.amount {
        tracing::info!("Mint amount overridden to: {}", amount);
        overrides.minting.amount = Some(amount);
    }
    if let Some(group) = cli.group {
        tracing::info!("Group ID overridden to: {}", group);
        overrides.minting.group_id = Some(group);
    }
    if let Some(to) = &cli.to_address {
        tracing::info!("Recipient address overridden to: {}", to);
        overrides.minting.to_address = Some(to.clone());
    }

    let config = MintConfig::load(cli.config.as_deref(), overrides)?;
    config.validate()?;

    tracing::info!("Network: {}", config.network.name);
    tracing::info!(
        "Contract: {}",
        config.contract.address.as_deref().unwrap_or("N/A")
    );
    tracing::info!("Group ID: {}", config.minting.group_id);
    tracing::info!("Amount: {}", config.minting.amount);

    Ok(config)
}

async fn mint_once(
    config: MintConfig,
    dry_run: bool,
    check_interval: Duration,
    live_timeout: Duration,
) -> Result<()> {
    let mut minter = Minter::new(config, dry_run);

    tracing::info!("Connecting to blockchain network...");
    minter.connect().await?;

    tracing::info!("Loading smart contract...");
    minter.load_contract().await?;

    let info = minter.contract_info().await?;
    tracing::info!("{}", info);
    tracing::info!(
        "Minting status: {}",
        if info.mint_live { "LIVE" } else { "NOT LIVE" }
    );

    let balance = minter.wallet_balance().await?;
    let token = minter.network()?.native_token;
    tracing::info!("Wallet balance: {:.6} {}", balance, token);

    if !dry_run && minter.wallet_balance_wei().await?.is_zero() {
        return Err(MinterError::InsufficientFunds {
            balance: format!("0 {}", token),
            minimum: "any gas".to_string(),
        }
        .into());
    }

    if !info.mint_live {
        tracing::info!("Waiting for minting to go live...");
        minter.wait_for_mint_live(check_interval, live_timeout).await?;
    }

    tracing::info!("Starting minting process...");
    match minter.mint().await? {
        Some(tx_hash) => {
            tracing::info!("Minting successful! Transaction hash: {}", tx_hash);
            tracing::info!("View transaction on block explorer:");
            tracing::info!("{}", minter.transaction_url(&tx_hash));
        }
        None => tracing::warn!("Minting completed but no transaction hash returned"),
    }

    tracing::info!("NFT Minter completed successfully!");
    Ok(())
}

fn write_history(path: Option<&Path>, history: &[MintAttemptRecord]) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };

    let json = serde_json::to_string_pretty(history).wrap_err("Failed to serialize mint history")?;
    fs::write(path, json).wrap_err_with(|| format!("Failed to write mint history to {:?}", path))?;
    tracing::info!("Saved mint history to {:?}", path);
    Ok(())
}

fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(MinterError::Configuration(format!(
            "{:?} already exists; refusing to overwrite",
            path
        ))
        .into());
    }

    MintConfig::save_example(path)?;
    println!("Wrote example configuration to {}", path.display());
    println!("Edit it with your wallet key and contract address, then run `nft-minter mint`.");
    Ok(())
}

fn print_networks() {
    println!(
        "{:<18} {:<28} {:>8}  {:<6} {}",
        "KEY", "NAME", "CHAIN ID", "TOKEN", "RPC"
    );
    for network in networks::supported_networks() {
        let name = if network.is_testnet {
            format!("{} [testnet]", network.name)
        } else {
            network.name.to_string()
        };
        println!(
            "{:<18} {:<28} {:>8}  {:<6} {}",
            network.key, name, network.chain_id, network.native_token, network.rpc_url
        );
    }
}
