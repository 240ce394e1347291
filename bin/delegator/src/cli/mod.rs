// This file is part of Delegator.
//
// Delegator is free software: you can redistribute it and/or modify it under the
// terms of the GNU Lesser General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version.
//
// Delegator is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with Delegator.
// If not, see https://www.gnu.org/licenses/.

use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use alloy_primitives::{utils::format_ether, Address, TxHash};
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use delegator_provider::{new_alloy_evm_provider, EvmProvider, ReceiptPollSettings};
use delegator_session::{
    DelegateTarget, DelegationSession, SessionEvent, SessionPhase, SessionSettings,
    SubmissionOutcome,
};
use delegator_signer::Wallet;
use delegator_utils::emit::{self, EVENT_CHANNEL_CAPACITY};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing_subscriber::filter::LevelFilter;

mod calls;
mod prometheus_exporter;
mod signer;
mod tracing;

use calls::CallInput;
use signer::SignerArgs;

/// Main entry point for the CLI
///
/// Parses the CLI arguments, binds the configured account and runs the
/// requested subcommand against it.
pub async fn run() -> anyhow::Result<()> {
    let opt = Cli::parse();
    let _guard = tracing::configure_logging(&opt.logs)?;
    tracing::info!("Parsed CLI options: {:#?}", opt.command);

    if let Some(port) = opt.metrics.port {
        let addr = SocketAddr::new(opt.metrics.host.parse()?, port);
        prometheus_exporter::initialize(addr).context("metrics server should start")?;
    }

    let provider = new_alloy_evm_provider(&opt.node.rpc_url, opt.node.timeout_seconds)?;
    let chain_id = match opt.node.chain_id {
        Some(chain_id) => chain_id,
        None => provider
            .get_chain_id()
            .await
            .context("should read chain id from node")?,
    };

    let wallet = opt.signer.wallet(provider.clone(), chain_id)?;
    let sponsor = opt.signer.sponsor(provider.clone(), chain_id)?;

    let (event_sender, event_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    let event_logger = emit::receive_and_log_events(event_rx, SessionEvent::level);

    let mut session = DelegationSession::new(
        provider,
        wallet,
        opt.session.settings(chain_id),
        event_sender,
    );
    if let Some(sponsor) = sponsor {
        session = session.with_sponsor(Arc::new(sponsor) as Arc<dyn Wallet>);
    }
    let session = Arc::new(session);
    let watcher = session.spawn_account_watcher();

    let result = run_command(&session, opt.command).await;

    watcher.abort();
    event_logger.abort();
    result
}

async fn run_command<P, W>(
    session: &DelegationSession<P, W>,
    command: Command,
) -> anyhow::Result<()>
where
    P: EvmProvider + Clone,
    W: Wallet,
{
    let SessionPhase::Connected { account, status } = session.connect().await? else {
        anyhow::bail!("wallet did not bind an account");
    };

    match command {
        Command::Status => {
            let balance = session.account_balance().await?;
            print_json(&StatusOutput {
                account,
                status: status.to_string(),
                delegate: status.delegate(),
                balance: format_ether(balance),
            })?;
        }
        Command::Delegate(args) => {
            let target = DelegateTarget::parse(&args.delegate)?;
            let outcome = session.create_delegation(target.address()).await?;
            print_outcome(&outcome)?;
        }
        Command::Execute(args) => {
            let delegate = args
                .delegate
                .as_deref()
                .map(DelegateTarget::parse)
                .transpose()?
                .map(|target| target.address());
            add_calls(session, &args.calls)?;
            let outcome = session.execute_batch(delegate).await?;
            print_outcome(&outcome)?;
        }
        Command::Sponsored(args) => {
            add_calls(session, &args)?;
            let outcome = session.execute_sponsored_batch().await?;
            print_outcome(&outcome)?;
        }
        Command::Revoke => {
            let outcome = session.revoke_delegation().await?;
            print_outcome(&outcome)?;
        }
        Command::Watch => {
            tracing::info!("watching {account}, ctrl-c to exit");
            tokio::signal::ctrl_c().await?;
            let status = session.refresh_status().await?;
            tracing::info!("final status of {account}: {status}");
        }
    }
    Ok(())
}

fn add_calls<P, W>(session: &DelegationSession<P, W>, args: &CallArgs) -> anyhow::Result<()>
where
    P: EvmProvider + Clone,
    W: Wallet,
{
    let mut inputs = args.calls.clone();
    if let Some(path) = &args.calls_file {
        inputs.extend(calls::read_calls_file(path)?);
    }
    for input in inputs {
        session
            .add_call(&input.target, &input.value, &input.data)
            .with_context(|| format!("invalid call to {}", input.target))?;
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusOutput {
    account: Address,
    status: String,
    delegate: Option<Address>,
    balance: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutcomeOutput {
    tx_hash: TxHash,
    block_number: Option<u64>,
    gas_used: u64,
    status: Option<String>,
}

fn print_outcome(outcome: &SubmissionOutcome) -> anyhow::Result<()> {
    print_json(&OutcomeOutput {
        tx_hash: outcome.tx_hash,
        block_number: outcome.receipt.block_number,
        gas_used: outcome.receipt.gas_used,
        status: outcome.status.map(|status| status.to_string()),
    })
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// CLI commands
#[derive(Debug, Subcommand)]
enum Command {
    /// Show the account's delegation status and balance
    #[command(name = "status")]
    Status,

    /// Delegate the account's code to a contract
    #[command(name = "delegate")]
    Delegate(DelegateArgs),

    /// Execute a batch of calls from the account
    ///
    /// An undelegated account is delegated in the same transaction.
    #[command(name = "execute")]
    Execute(ExecuteArgs),

    /// Sign a batch of calls and let the sponsor submit it
    #[command(name = "sponsored")]
    Sponsored(CallArgs),

    /// Clear the account's delegation
    #[command(name = "revoke")]
    Revoke,

    /// Follow account changes and session events until ctrl-c
    #[command(name = "watch")]
    Watch,
}

#[derive(Debug, Args)]
struct DelegateArgs {
    /// Delegate contract address
    #[arg(long = "delegate", name = "delegate", env = "DELEGATE_ADDRESS")]
    delegate: String,
}

#[derive(Debug, Args)]
struct ExecuteArgs {
    /// Delegate contract to bundle when the account is not delegated yet
    #[arg(long = "delegate", name = "delegate", env = "DELEGATE_ADDRESS")]
    delegate: Option<String>,

    #[clap(flatten)]
    calls: CallArgs,
}

#[derive(Debug, Clone, Args)]
struct CallArgs {
    /// Call as `target[,value[,data]]`, value in ether. Repeatable.
    #[arg(long = "call", name = "call")]
    calls: Vec<CallInput>,

    /// JSON file holding `[{"target", "value", "data"}]`
    #[arg(long = "calls_file", name = "calls_file")]
    calls_file: Option<PathBuf>,
}

/// Node options
#[derive(Debug, Args)]
#[command(next_help_heading = "NODE")]
struct NodeArgs {
    /// Node RPC URL
    #[arg(
        long = "node.rpc_url",
        name = "node.rpc_url",
        env = "RPC_URL",
        global = true,
        default_value = "http://localhost:8545"
    )]
    rpc_url: String,

    /// Chain id. Read from the node when unset.
    #[arg(
        long = "node.chain_id",
        name = "node.chain_id",
        env = "CHAIN_ID",
        global = true
    )]
    chain_id: Option<u64>,

    /// Client side timeout of a single RPC request
    #[arg(
        long = "node.timeout_seconds",
        name = "node.timeout_seconds",
        env = "NODE_TIMEOUT_SECONDS",
        global = true,
        default_value = "10"
    )]
    timeout_seconds: u64,
}

/// Session options
#[derive(Debug, Args)]
#[command(next_help_heading = "SESSION")]
struct SessionArgs {
    /// Delay between two receipt queries
    #[arg(
        long = "session.receipt_poll_interval_ms",
        name = "session.receipt_poll_interval_ms",
        env = "SESSION_RECEIPT_POLL_INTERVAL_MS",
        global = true,
        default_value = "2000"
    )]
    receipt_poll_interval_ms: u64,

    /// Receipt queries before a submission is reported as timed out
    #[arg(
        long = "session.receipt_max_polls",
        name = "session.receipt_max_polls",
        env = "SESSION_RECEIPT_MAX_POLLS",
        global = true,
        default_value = "90"
    )]
    receipt_max_polls: u64,
}

impl SessionArgs {
    fn settings(&self, chain_id: u64) -> SessionSettings {
        SessionSettings {
            chain_id: Some(chain_id),
            receipt_poll: ReceiptPollSettings {
                poll_interval: Duration::from_millis(self.receipt_poll_interval_ms),
                max_polls: self.receipt_max_polls,
            },
            default_delegate: None,
        }
    }
}

/// Metrics options
#[derive(Debug, Args)]
#[command(next_help_heading = "METRICS")]
struct MetricsArgs {
    /// Port to serve Prometheus metrics on. Metrics are disabled when unset.
    #[arg(
        long = "metrics.port",
        name = "metrics.port",
        env = "METRICS_PORT",
        global = true
    )]
    port: Option<u16>,

    /// Host to serve Prometheus metrics on
    #[arg(
        long = "metrics.host",
        name = "metrics.host",
        env = "METRICS_HOST",
        global = true,
        default_value = "0.0.0.0"
    )]
    host: String,
}

/// Logging options
#[derive(Debug, Args)]
#[command(next_help_heading = "LOGS")]
pub struct LogsArgs {
    /// Log file
    ///
    /// If not provided, logs will be written to stdout
    #[arg(
        long = "log.file",
        name = "log.file",
        env = "LOG_FILE",
        default_value = None,
        global = true
    )]
    file: Option<String>,

    /// Log JSON
    ///
    /// If set, logs will be written in JSON format
    #[arg(
        long = "log.json",
        name = "log.json",
        env = "LOG_JSON",
        required = false,
        num_args = 0,
        global = true
    )]
    json: bool,

    /// Default log level, overridden by `RUST_LOG`
    #[arg(
        long = "log.level",
        name = "log.level",
        env = "LOG_LEVEL",
        default_value = "info",
        global = true
    )]
    level: LevelFilter,
}

/// CLI options
#[derive(Debug, Parser)]
#[command(name = "delegator", version, about = "EIP-7702 account delegation client")]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    #[clap(flatten)]
    node: NodeArgs,

    #[clap(flatten)]
    signer: SignerArgs,

    #[clap(flatten)]
    session: SessionArgs,

    #[clap(flatten)]
    metrics: MetricsArgs,

    #[clap(flatten)]
    logs: LogsArgs,
}
