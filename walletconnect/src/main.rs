use clap::{Args, Parser, Subcommand};
use std::io::{self, stdin, stdout};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use walletconnect_signer::cli::{
    forward_signals, return_error, run_cli, run_hardware_tx, set_panic_hook,
};
use walletconnect_signer::config::SignerConfig;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize one WalletConnect JSON-RPC request read from stdin
    Call,
    /// Drive a hardware-signed transaction from device signals read from stdin
    HardwareTx(HardwareTxArgs),
}

#[derive(Args)]
struct HardwareTxArgs {
    /// Device to poll, falls back to HARDWARE_DEVICE_ID
    #[clap(long, short = 'd')]
    device_id: Option<String>,
    /// Flag store file, falls back to HARDWARE_TX_STORE
    #[clap(long, short = 's')]
    store: Option<PathBuf>,
}

fn init_tracing() {
    // stdout carries JSON-RPC, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Call => {
            // TODO id should come from the request once it has been parsed
            set_panic_hook(0);
            let buf_reader = io::BufReader::new(stdin());

            match run_cli(buf_reader) {
                Ok(result) => println!("{result}"),
                Err((e, id)) => return_error(&e, id),
            }
            Ok(())
        }
        Commands::HardwareTx(args) => {
            let config = SignerConfig::resolve(args.store, args.device_id);
            let (sender, receiver) = mpsc::channel(16);

            // A plain thread so a pending stdin read never holds up shutdown
            std::thread::spawn(move || {
                if let Err(e) = forward_signals(io::BufReader::new(stdin()), sender) {
                    warn!(error = %e, "device signal reader stopped");
                }
            });

            run_hardware_tx(&config, receiver, stdout()).await?;
            Ok(())
        }
    }
}
