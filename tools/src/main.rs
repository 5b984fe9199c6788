//! stellarep: headless session runner for the Stellar reputation client.
//!
//! Usage:
//!   stellarep --public-key GABC... --mode stellar-only
//!   stellarep --public-key GABC... --chain ethereum=0xabc --chain polygon=0xdef
//!   stellarep --config data/client.json --ipc-mode

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::env;
use std::io::{self, Write};
use std::sync::Arc;
use stellarep_core::{
    chain::{AnalysisMode, ChainId},
    command::SessionCommand,
    config::ClientConfig,
    engine::SessionEngine,
    error::ClientError,
    wallet::{WalletError, WalletExtension, WalletResult},
};
use tokio::io::{AsyncBufReadExt, BufReader};

const PUBLIC_KEY_ENV: &str = "STELLAR_PUBLIC_KEY";

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Command { cmd: SessionCommand },
    Quit,
}

/// Stand-in for the browser extension: serves one fixed key.
struct StaticWallet {
    public_key: Option<String>,
}

#[async_trait]
impl WalletExtension for StaticWallet {
    async fn is_connected(&self) -> WalletResult<bool> {
        match &self.public_key {
            Some(_) => Ok(true),
            None => Err(WalletError::NotInstalled),
        }
    }

    async fn request_permission(&self) -> WalletResult<()> {
        Ok(())
    }

    async fn get_public_key(&self) -> WalletResult<Option<String>> {
        Ok(self.public_key.clone())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");

    let mut config = match flag_value(&args, "--config") {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    }
    .with_env_overrides();
    if let Some(url) = flag_value(&args, "--api-url") {
        config.api_base_url = url.to_string();
    }

    let public_key = flag_value(&args, "--public-key")
        .map(str::to_string)
        .or_else(|| env::var(PUBLIC_KEY_ENV).ok())
        .filter(|k| !k.trim().is_empty());
    let chains = parse_chains(&args)?;
    let mode = match flag_value(&args, "--mode") {
        Some(m) => parse_mode(m)?,
        None if chains.is_empty() => AnalysisMode::StellarOnly,
        None => AnalysisMode::CrossChain,
    };

    if !ipc_mode {
        println!("Stellar reputation client");
        println!("  api:       {}", config.api_base_url);
        println!("  mode:      {}", mode_name(mode));
        println!();
    }

    let wallet = Arc::new(StaticWallet { public_key });
    let engine = SessionEngine::build(config, wallet)?;

    if ipc_mode {
        engine.check_wallet().await;
        run_ipc_loop(&engine).await
    } else {
        run_once(&engine, mode, &chains).await
    }
}

async fn run_ipc_loop(engine: &SessionEngine) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&line) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{err_json}")?;
                stdout.flush()?;
                continue;
            }
        };

        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::GetState => {
                writeln!(stdout, "{}", serde_json::to_string(&engine.snapshot())?)?;
            }
            IpcCommand::Command { cmd } => match engine.dispatch(cmd).await {
                Ok(()) => {
                    writeln!(stdout, "{}", serde_json::to_string(&engine.snapshot())?)?;
                }
                Err(e) => {
                    log::debug!("command failed: {e}");
                    let err_json = serde_json::json!({ "error": e.user_message() });
                    writeln!(stdout, "{err_json}")?;
                }
            },
        }
        stdout.flush()?;
    }
    Ok(())
}

async fn run_once(
    engine: &SessionEngine,
    mode: AnalysisMode,
    chains: &[(ChainId, String)],
) -> Result<()> {
    connect(engine).await?;
    engine.select_mode(mode).await.map_err(user_error)?;

    if mode == AnalysisMode::CrossChain {
        for (chain, address) in chains {
            engine.toggle_chain(*chain).map_err(user_error)?;
            engine.set_address(*chain, address).map_err(user_error)?;
        }
        engine.confirm().map_err(user_error)?;
    }

    engine.calculate().await.map_err(user_error)?;
    print_summary(engine)
}

/// The availability check only feeds the warning; the handshake always runs.
async fn connect(engine: &SessionEngine) -> Result<()> {
    if !engine.check_wallet().await {
        log::warn!(
            "wallet not reported available, connecting anyway \
             (pass --public-key or set {PUBLIC_KEY_ENV})"
        );
    }
    engine.connect().await.map_err(user_error)?;
    Ok(())
}

fn print_summary(engine: &SessionEngine) -> Result<()> {
    let snap = engine.snapshot();
    let record = snap.score.ok_or_else(|| anyhow!("no score in session"))?;
    let level = record.level();

    println!("=== REPUTATION SUMMARY ===");
    println!("  account:    {}", snap.account_short.unwrap_or_default());
    println!("  chains:     {}", snap.chains_label.unwrap_or_default());
    println!("  total:      {} ({level})", record.total_score);
    println!("  stellar:    {}", record.stellar_score);
    println!("  ethereum:   {}", record.ethereum_score);
    println!("  social:     {}", record.social_score);
    println!("  on-chain:   {}", if record.on_chain { "yes" } else { "no" });
    if let Some(at) = record.calculated_at {
        println!("  calculated: {at}");
    }

    println!();
    println!("=== BREAKDOWN ===");
    let b = &record.breakdown;
    println!("  account age:     {} days", b.account_age_days);
    println!("  transactions:    {}", b.transaction_count);
    println!("  XLM balance:     {:.2}", b.stellar_balance);
    if b.has_ethereum_history {
        println!("  ETH age:         {} days", b.ethereum_age_days);
        println!("  ETH txns:        {}", b.ethereum_transaction_count);
        println!("  ETH balance:     {:.4}", b.ethereum_balance);
    }
    Ok(())
}

fn user_error(e: ClientError) -> anyhow::Error {
    log::debug!("{e}");
    anyhow!(e.user_message())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

/// Every `--chain chain=address` pair, in the order given.
fn parse_chains(args: &[String]) -> Result<Vec<(ChainId, String)>> {
    args.windows(2)
        .filter(|w| w[0] == "--chain")
        .map(|w| -> Result<(ChainId, String)> {
            let (chain, address) = w[1]
                .split_once('=')
                .ok_or_else(|| anyhow!("--chain expects chain=address, got '{}'", w[1]))?;
            let chain: ChainId = chain.parse().map_err(|e: String| anyhow!(e))?;
            Ok((chain, address.to_string()))
        })
        .collect()
}

fn parse_mode(raw: &str) -> Result<AnalysisMode> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|_| anyhow!("--mode must be stellar-only or cross-chain, got '{raw}'"))
}

fn mode_name(mode: AnalysisMode) -> &'static str {
    match mode {
        AnalysisMode::StellarOnly => "stellar-only",
        AnalysisMode::CrossChain  => "cross-chain",
    }
}
