//! `chainops account ...`

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::accounts::{self, OutputSpec};
use crate::cli::{confirmer, Context, KeyArgs};
use crate::error::Result;
use crate::transfer::TransferOptions;

#[derive(Debug, Subcommand)]
pub enum AccountCommand {
    /// Generate random accounts
    Generate(GenerateArgs),

    /// Print the address of a private key
    Address {
        /// Private key in hex, with or without `0x`
        private_key: String,
    },

    /// Generate and fund accounts for the blob test
    SetupBlobTest(SetupArgs),
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Number of accounts
    #[arg(short, long, default_value_t = 1)]
    pub num_accounts: usize,

    /// Directory for the JSON (and public .txt) output
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Output file name prefix
    #[arg(short, long, default_value = "eth_accounts")]
    pub prefix: String,

    /// Do not print the accounts
    #[arg(long)]
    pub no_print: bool,

    /// Also write the addresses to a .txt file
    #[arg(long)]
    pub save_public: bool,
}

#[derive(Debug, Args)]
pub struct SetupArgs {
    /// Accounts to create
    #[arg(long)]
    pub num_users: usize,

    /// ETH sent to each account
    #[arg(long, default_value = "1.0")]
    pub eth_amount: String,

    #[command(flatten)]
    pub key: KeyArgs,

    /// Directory that receives `accounts/`
    #[arg(long, default_value = ".")]
    pub base_dir: PathBuf,

    /// Skip the low-amount confirmation
    #[arg(short, long)]
    pub yes: bool,
}

pub async fn run(cmd: AccountCommand, ctx: &Context) -> Result<()> {
    match cmd {
        AccountCommand::Generate(args) => generate(args),
        AccountCommand::Address { private_key } => {
            let address = accounts::address_of(&private_key)?;
            println!("Ethereum Address: {}", address.to_checksum(None));
            Ok(())
        }
        AccountCommand::SetupBlobTest(args) => setup(args, ctx).await,
    }
}

fn generate(args: GenerateArgs) -> Result<()> {
    let spec = args.output_dir.map(|dir| OutputSpec {
        dir,
        prefix: args.prefix,
        save_public: args.save_public,
    });
    let generated = accounts::generate_accounts(args.num_accounts, spec.as_ref())?;

    if let Some(path) = &generated.json_path {
        println!("\nAccounts saved to: {}", path.display());
    }
    if let Some(path) = &generated.public_path {
        println!("Public keys saved to: {}", path.display());
    }
    if !args.no_print {
        println!("\nGenerated Accounts Summary:");
        for (i, account) in generated.accounts.iter().enumerate() {
            println!("\nAccount {}:", i + 1);
            println!("Private Key: {}", account.private_key);
            println!("Public Key (Address): {}", account.public_key);
        }
    }
    Ok(())
}

async fn setup(args: SetupArgs, ctx: &Context) -> Result<()> {
    let sender = ctx.sender(args.key.wallet()?).await?;
    let options = TransferOptions::from_config(&ctx.config.transactions, None);
    let confirm = confirmer(args.yes);

    let (config_path, setup) = accounts::setup_blob_test(
        &sender,
        &args.base_dir,
        args.num_users,
        &args.eth_amount,
        &options,
        &confirm,
    )
    .await?;

    println!("\nSetup complete!");
    println!("Accounts file: {}", setup.accounts_file);
    println!("Test configuration: {}", config_path.display());
    println!("Funded {} accounts with {} ETH each", setup.num_users, args.eth_amount);
    Ok(())
}
