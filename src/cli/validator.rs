//! `chainops validator consolidate|withdraw|exit`

use std::path::PathBuf;

use alloy::primitives::Address;
use clap::{Args, Subcommand};

use crate::blockchain::units::format_eth;
use crate::blockchain::{ReceiptSummary, Wallet};
use crate::cli::{confirmer, Context, KeyArgs};
use crate::console;
use crate::error::{Error, Result};
use crate::validator::{
    funding_info, send_consolidation, send_voluntary_exit, send_withdrawal, KeySource, Pubkey,
    VoluntaryExit, WithdrawalRequest, WITHDRAWAL_CONTRACT,
};

#[derive(Debug, Subcommand)]
pub enum ValidatorCommand {
    /// EIP-7251 consolidation of a source validator into a target
    Consolidate(ConsolidateArgs),

    /// EIP-7002 partial withdrawal, or full exit with amount 0
    Withdraw(WithdrawArgs),

    /// Voluntary exit message through an exit contract
    Exit(ExitArgs),
}

/// Private key or keystore, plus `--fund-account`.
#[derive(Debug, Args)]
pub struct SignerArgs {
    #[command(flatten)]
    pub key: KeyArgs,

    /// Encrypted JSON keystore, used when no private key is given
    #[arg(long)]
    pub keystore_path: Option<PathBuf>,

    /// Keystore password; prompted for when missing
    #[arg(long, env = "CHAINOPS_KEYSTORE_PASSWORD", hide_env_values = true)]
    pub keystore_password: Option<String>,

    /// Only show the signing address and its balance
    #[arg(long)]
    pub fund_account: bool,

    /// Answer yes to confirmation prompts
    #[arg(short, long)]
    pub yes: bool,
}

impl SignerArgs {
    fn wallet(&self) -> Result<Wallet> {
        let password = self.keystore_password.clone();
        let source = KeySource::from_args(
            self.key.private_key.clone(),
            self.keystore_path.clone(),
            move || match password {
                Some(password) => Ok(password),
                None => console::prompt_password("Enter keystore password: "),
            },
        )?;
        Ok(source.load()?)
    }
}

#[derive(Debug, Args)]
pub struct ConsolidateArgs {
    #[command(flatten)]
    pub key: KeyArgs,

    /// Source validator pubkey (48-byte hex)
    #[arg(long)]
    pub source_validator: Pubkey,

    /// Target validator pubkey (48-byte hex)
    #[arg(long)]
    pub target_validator: Pubkey,

    /// Do not send the target → target compounding switch first
    #[arg(long)]
    pub skip_switch: bool,
}

#[derive(Debug, Args)]
pub struct WithdrawArgs {
    #[command(flatten)]
    pub signer: SignerArgs,

    /// Validator pubkey (48-byte hex)
    #[arg(long, required_unless_present = "fund_account")]
    pub pubkey: Option<Pubkey>,

    /// ETH to withdraw; 0 requests a full exit
    #[arg(long, required_unless_present = "fund_account")]
    pub amount: Option<String>,

    /// Withdrawal request contract
    #[arg(long, default_value_t = WITHDRAWAL_CONTRACT)]
    pub contract_address: Address,
}

#[derive(Debug, Args)]
pub struct ExitArgs {
    #[command(flatten)]
    pub signer: SignerArgs,

    /// Validator pubkey (48-byte hex)
    #[arg(long, required_unless_present = "fund_account")]
    pub pubkey: Option<Pubkey>,

    /// Beacon chain validator index
    #[arg(long, required_unless_present = "fund_account")]
    pub validator_index: Option<u32>,

    /// Exit contract
    #[arg(long, required_unless_present = "fund_account")]
    pub contract_address: Option<Address>,
}

pub async fn run(cmd: ValidatorCommand, ctx: &Context) -> Result<()> {
    match cmd {
        ValidatorCommand::Consolidate(args) => consolidate(args, ctx).await,
        ValidatorCommand::Withdraw(args) => withdraw(args, ctx).await,
        ValidatorCommand::Exit(args) => exit(args, ctx).await,
    }
}

async fn consolidate(args: ConsolidateArgs, ctx: &Context) -> Result<()> {
    let sender = ctx.sender(args.key.wallet()?).await?;
    let outcome = send_consolidation(
        &sender,
        &args.source_validator,
        &args.target_validator,
        args.skip_switch,
        ctx.receipt_timeout(),
    )
    .await?;

    println!("Consolidation fee: {} wei", outcome.fee);
    if let Some(switch) = &outcome.switch {
        print_receipt("Switch to compounding", switch);
    }
    print_receipt("Consolidation", &outcome.consolidation);
    Ok(())
}

/// Print the funding block when `--fund-account` is set. Returns whether it did.
async fn show_funding(signer: &SignerArgs, wallet: &Wallet, ctx: &Context) -> Result<bool> {
    if !signer.fund_account {
        return Ok(false);
    }
    let client = ctx.client().await?;
    let info = funding_info(&client, wallet.address()).await?;
    println!("\n=== FUNDING INFORMATION ===");
    println!("Account address: {}", info.address);
    println!("Current balance: {} ETH", format_eth(info.balance));
    println!("\nPlease send a small amount of ETH (0.001 ETH should be more than enough)");
    println!("to this address to cover the transaction fee.");
    println!("\nAfter funding, run the command again without --fund-account to perform the action.");
    Ok(true)
}

async fn withdraw(args: WithdrawArgs, ctx: &Context) -> Result<()> {
    let wallet = args.signer.wallet()?;
    if show_funding(&args.signer, &wallet, ctx).await? {
        return Ok(());
    }
    let (Some(pubkey), Some(amount)) = (args.pubkey, args.amount.as_deref()) else {
        return Err(Error::Usage(
            "--pubkey and --amount are required".to_string(),
        ));
    };
    let request = WithdrawalRequest::from_eth(pubkey, amount)?;

    let sender = ctx.sender(wallet).await?;
    let confirm = confirmer(args.signer.yes);
    let receipt = send_withdrawal(
        &sender,
        args.contract_address,
        &request,
        &confirm,
        ctx.receipt_timeout(),
    )
    .await?;
    let label = if request.is_exit() { "Full exit" } else { "Withdrawal" };
    print_receipt(label, &receipt);
    Ok(())
}

async fn exit(args: ExitArgs, ctx: &Context) -> Result<()> {
    let wallet = args.signer.wallet()?;
    if show_funding(&args.signer, &wallet, ctx).await? {
        return Ok(());
    }
    let (Some(pubkey), Some(validator_index), Some(contract)) =
        (args.pubkey, args.validator_index, args.contract_address)
    else {
        return Err(Error::Usage(
            "--pubkey, --validator-index and --contract-address are required".to_string(),
        ));
    };

    let sender = ctx.sender(wallet).await?;
    let confirm = confirmer(args.signer.yes);
    let exit = VoluntaryExit {
        pubkey,
        validator_index,
    };
    let receipt =
        send_voluntary_exit(&sender, contract, &exit, &confirm, ctx.receipt_timeout()).await?;
    print_receipt("Voluntary exit", &receipt);
    Ok(())
}

fn print_receipt(label: &str, receipt: &ReceiptSummary) {
    println!("{} transaction: {}", label, receipt.hash);
    println!(
        "Transaction included in block {}, status: {}",
        receipt.block_number,
        receipt.status_code()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};
    use clap::Parser;

    const PUBKEY: &str = "0xa1d1ad0714035353258038e964ae9675dc0252ee22cea896825c01458e1807bfad2f9969338798548d9858a571f7425c";

    #[test]
    fn test_withdraw_defaults_to_system_contract() {
        let cli = Cli::try_parse_from([
            "chainops", "validator", "withdraw", "--pubkey", PUBKEY, "--amount", "0",
        ])
        .unwrap();
        let Command::Validator(ValidatorCommand::Withdraw(args)) = cli.command else {
            panic!("expected withdraw");
        };
        assert_eq!(args.contract_address, WITHDRAWAL_CONTRACT);
        assert_eq!(args.amount.as_deref(), Some("0"));
    }

    #[test]
    fn test_fund_account_needs_no_pubkey() {
        let cli = Cli::try_parse_from([
            "chainops",
            "validator",
            "exit",
            "--fund-account",
            "--private-key",
            "0x01",
        ])
        .unwrap();
        let Command::Validator(ValidatorCommand::Exit(args)) = cli.command else {
            panic!("expected exit");
        };
        assert!(args.signer.fund_account);
        assert!(args.pubkey.is_none());
    }

    #[test]
    fn test_keystore_password_flag_skips_prompt() {
        let cli = Cli::try_parse_from([
            "chainops",
            "validator",
            "exit",
            "--fund-account",
            "--keystore-path",
            "/nonexistent/keystore.json",
            "--keystore-password",
            "secret",
        ])
        .unwrap();
        let Command::Validator(ValidatorCommand::Exit(args)) = cli.command else {
            panic!("expected exit");
        };
        let err = args.signer.wallet().unwrap_err();
        assert!(err.to_string().contains("Failed to decrypt keystore"));
    }

    #[test]
    fn test_exit_requires_contract() {
        assert!(Cli::try_parse_from([
            "chainops",
            "validator",
            "exit",
            "--pubkey",
            PUBKEY,
            "--validator-index",
            "7",
        ])
        .is_err());
    }

    #[test]
    fn test_bad_pubkey_rejected_at_parse() {
        assert!(Cli::try_parse_from([
            "chainops",
            "validator",
            "consolidate",
            "--source-validator",
            "0x1234",
            "--target-validator",
            PUBKEY,
        ])
        .is_err());
    }
}
