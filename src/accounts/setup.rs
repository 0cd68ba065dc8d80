//! Blob test account provisioning.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::accounts::generate::{generate_accounts, OutputSpec};
use crate::accounts::{AccountsError, AccountsResult};
use crate::blockchain::units::parse_eth;
use crate::blockchain::TxSender;
use crate::transfer::{self, TransferOptions};

/// Recommended minimum funding per account for blob transactions.
pub const MIN_ETH_AMOUNT: &str = "0.5";
pub const ACCOUNTS_PREFIX: &str = "blob_test_accounts";
pub const TEST_CONFIG_FILE: &str = "current_test_config.json";

/// Contents of `accounts/current_test_config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobTestSetup {
    pub accounts_file: String,
    pub rpc_url: String,
    pub num_users: usize,
}

/// Generate `num_users` accounts under `<base>/accounts`, fund each with
/// `eth_amount`, and record the setup for the blob test.
///
/// `confirm` is asked before proceeding with less than the recommended amount.
pub async fn setup_blob_test(
    funder: &TxSender,
    base: &Path,
    num_users: usize,
    eth_amount: &str,
    options: &TransferOptions,
    confirm: &dyn Fn(&str) -> bool,
) -> AccountsResult<(PathBuf, BlobTestSetup)> {
    let amount = parse_eth(eth_amount)?;
    if amount < parse_eth(MIN_ETH_AMOUNT)? {
        tracing::warn!(
            amount_eth = eth_amount,
            recommended_eth = MIN_ETH_AMOUNT,
            "Funding amount might be insufficient for blob transactions"
        );
        if !confirm("Do you want to continue?") {
            return Err(AccountsError::Aborted("funding amount below recommendation".into()));
        }
    }

    let accounts_dir = base.join("accounts");
    let spec = OutputSpec {
        dir: accounts_dir.clone(),
        prefix: ACCOUNTS_PREFIX.to_string(),
        save_public: false,
    };
    let generated = generate_accounts(num_users, Some(&spec))?;
    let accounts_file = generated
        .json_path
        .ok_or_else(|| AccountsError::Aborted("no account file written".into()))?;
    tracing::info!(path = %accounts_file.display(), "Accounts generated");

    let recipients = transfer::Recipients::File(accounts_file.clone())
        .resolve()
        .map_err(|e| AccountsError::Aborted(e.to_string()))?;
    tracing::info!(accounts = recipients.len(), amount_eth = eth_amount, "Funding accounts");
    transfer::transfer_eth(funder, &recipients, amount, options, &|_| false)
        .await
        .map_err(|e| AccountsError::Aborted(format!("funding failed: {}", e)))?;

    let setup = BlobTestSetup {
        accounts_file: accounts_file.display().to_string(),
        rpc_url: funder.client().url().to_string(),
        num_users,
    };
    let config_path = accounts_dir.join(TEST_CONFIG_FILE);
    let body = serde_json::to_string_pretty(&setup).map_err(|e| AccountsError::Json {
        path: config_path.clone(),
        source: e,
    })?;
    fs::write(&config_path, body).map_err(|e| AccountsError::io(&config_path, e))?;
    tracing::info!(path = %config_path.display(), "Test configuration saved");

    Ok((config_path, setup))
}
