//! Random account generation.

use std::fs;
use std::path::{Path, PathBuf};

use alloy::signers::local::PrivateKeySigner;
use serde::{Deserialize, Serialize};

use crate::accounts::{AccountsError, AccountsResult};

/// A generated key pair.
///
/// `public_key` holds the checksummed address; the field names match the
/// account files other tooling already reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedAccount {
    pub private_key: String,
    pub public_key: String,
}

/// Where generated accounts are written.
#[derive(Debug, Clone)]
pub struct OutputSpec {
    pub dir: PathBuf,
    pub prefix: String,
    /// Also write a `.txt` with one address per line.
    pub save_public: bool,
}

/// Accounts plus the files they were written to.
#[derive(Debug, Clone)]
pub struct Generated {
    pub accounts: Vec<GeneratedAccount>,
    pub json_path: Option<PathBuf>,
    pub public_path: Option<PathBuf>,
}

/// Create a random account.
pub fn generate_account() -> GeneratedAccount {
    let signer = PrivateKeySigner::random();
    GeneratedAccount {
        private_key: signer.to_bytes().to_string(),
        public_key: signer.address().to_checksum(None),
    }
}

/// Create `count` accounts and optionally persist them.
///
/// Files are named `<prefix>_<YYYYmmdd_HHMMSS>.json` and
/// `<prefix>_public_<YYYYmmdd_HHMMSS>.txt`.
pub fn generate_accounts(count: usize, output: Option<&OutputSpec>) -> AccountsResult<Generated> {
    let accounts: Vec<_> = (0..count).map(|_| generate_account()).collect();

    let mut generated = Generated {
        accounts,
        json_path: None,
        public_path: None,
    };

    if let Some(spec) = output {
        fs::create_dir_all(&spec.dir).map_err(|e| AccountsError::io(&spec.dir, e))?;
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();

        let json_path = spec.dir.join(format!("{}_{}.json", spec.prefix, timestamp));
        write_json(&json_path, &generated.accounts)?;
        tracing::info!(path = %json_path.display(), "Accounts saved");
        generated.json_path = Some(json_path);

        if spec.save_public {
            let txt_path = spec
                .dir
                .join(format!("{}_public_{}.txt", spec.prefix, timestamp));
            let mut lines = String::new();
            for account in &generated.accounts {
                lines.push_str(&account.public_key);
                lines.push('\n');
            }
            fs::write(&txt_path, lines).map_err(|e| AccountsError::io(&txt_path, e))?;
            tracing::info!(path = %txt_path.display(), "Public keys saved");
            generated.public_path = Some(txt_path);
        }
    }

    Ok(generated)
}

fn write_json(path: &Path, accounts: &[GeneratedAccount]) -> AccountsResult<()> {
    let body = serde_json::to_string_pretty(accounts).map_err(|e| AccountsError::Json {
        path: path.to_path_buf(),
        source: e,
    })?;
    fs::write(path, body).map_err(|e| AccountsError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::address_of;

    #[test]
    fn test_generated_key_matches_address() {
        let account = generate_account();
        assert!(account.private_key.starts_with("0x"));
        assert_eq!(account.private_key.len(), 66);
        let derived = address_of(&account.private_key).unwrap();
        assert_eq!(derived.to_checksum(None), account.public_key);
    }

    #[test]
    fn test_generate_without_output() {
        let generated = generate_accounts(3, None).unwrap();
        assert_eq!(generated.accounts.len(), 3);
        assert!(generated.json_path.is_none());
    }

    #[test]
    fn test_generate_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let spec = OutputSpec {
            dir: dir.path().join("accounts"),
            prefix: "blob_test_accounts".into(),
            save_public: true,
        };
        let generated = generate_accounts(2, Some(&spec)).unwrap();

        let json_path = generated.json_path.unwrap();
        let name = json_path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("blob_test_accounts_"));
        assert!(name.ends_with(".json"));

        let saved: Vec<GeneratedAccount> =
            serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(saved, generated.accounts);

        let public = fs::read_to_string(generated.public_path.unwrap()).unwrap();
        assert_eq!(public.lines().count(), 2);
        assert_eq!(public.lines().next().unwrap(), saved[0].public_key);
    }
}
