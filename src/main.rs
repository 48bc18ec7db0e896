// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! `relational-wc` command-line entry point.

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use relational_wc_signer::{
    blockchain::AlloySubmitter,
    config::{LogFormat, SignerConfig},
    confirm::TerminalConfirmer,
    logging::init_tracing,
    walletconnect::{Dispatcher, PairingUri, Session, WsRelay},
    WalletConnectError,
};

#[derive(Parser)]
#[command(name = "relational-wc")]
#[command(about = "WalletConnect v1 signer for the Relational wallet")]
#[command(version)]
struct Cli {
    /// Enable debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Pair with a dApp and serve its requests until the session ends
    Connect {
        /// Pairing URI shown by the dApp (wc:<topic>@1?bridge=..&key=..)
        uri: String,

        /// EVM JSON-RPC endpoint (overrides WC_RPC_URL)
        #[arg(long)]
        rpc_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Install the ring crypto provider for rustls before any wss:// connection.
    // Err only means a provider is already installed.
    let _ = rustls::crypto::ring::default_provider().install_default();

    init_tracing(LogFormat::from_env(), cli.debug);

    let result = match cli.command {
        Command::Connect { uri, rpc_url } => connect(&uri, rpc_url).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "wc connect failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Composition root for `connect`: every collaborator is built here.
async fn connect(raw_uri: &str, rpc_url: Option<String>) -> Result<(), WalletConnectError> {
    let uri = PairingUri::parse(raw_uri)?;

    let mut config = SignerConfig::from_env()?;
    if let Some(rpc_url) = rpc_url {
        config = config.with_rpc_url(rpc_url);
    }

    let account = config.key.load()?;
    let submitter = AlloySubmitter::new(config.network.clone(), config.gas)?;
    let chain_id = submitter.chain_id().await;

    let mut dispatcher = Dispatcher::new(account, Arc::new(submitter), Arc::new(TerminalConfirmer));
    match chain_id {
        Ok(id) => dispatcher = dispatcher.with_chain_id(id),
        Err(e) => warn!(error = %e, "Couldn't query chain id"),
    }
    info!(
        address = %dispatcher.account().address(),
        network = %config.network.name,
        "Signer ready"
    );

    let relay = WsRelay::connect(&uri.relay_url()?).await?;
    let mut session = Session::new(relay, &uri, dispatcher);
    session.open().await?;
    session.run().await?;

    info!(topic = %session.topic(), "Session finished");
    session.into_relay().close().await;
    Ok(())
}
