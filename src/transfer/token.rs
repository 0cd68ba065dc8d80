//! ERC-20 token transfers.

use alloy::eips::BlockId;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::blockchain::transaction::eip1559_max_fee;
use crate::blockchain::units::{format_eth, format_gwei, format_token, parse_token_amount, WEI_PER_GWEI};
use crate::blockchain::{BlockchainError, BlockchainResult, ReceiptSummary, RpcClient, TxSender};
use crate::transfer::nonce::resolve_start_nonce;
use crate::transfer::{
    send_with_retry, submit_and_wait, AttemptFailure, TransferError, TransferOptions,
    TransferResult,
};

sol! {
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function decimals() external view returns (uint8);
        function symbol() external view returns (string);
        function transfer(address to, uint256 value) external returns (bool);
    }
}

const TOKEN_TRANSFER_GAS: u64 = 100_000;
const MAX_PRIORITY_FEE: u128 = 2 * WEI_PER_GWEI;

/// Token metadata read from the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

impl TokenInfo {
    pub async fn fetch(client: &RpcClient, address: Address) -> BlockchainResult<Self> {
        let symbol = view_call::<IERC20::symbolCall>(client, address, IERC20::symbolCall {}).await?;
        let decimals =
            view_call::<IERC20::decimalsCall>(client, address, IERC20::decimalsCall {}).await?;
        Ok(Self {
            address,
            symbol,
            decimals,
        })
    }

    pub async fn balance_of(&self, client: &RpcClient, owner: Address) -> BlockchainResult<U256> {
        view_call::<IERC20::balanceOfCall>(client, self.address, IERC20::balanceOfCall { owner })
            .await
    }

    pub fn format(&self, amount: U256) -> String {
        format!("{} {}", format_token(amount, self.decimals), self.symbol)
    }
}

async fn view_call<C: SolCall>(
    client: &RpcClient,
    contract: Address,
    call: C,
) -> BlockchainResult<C::Return> {
    let tx = TransactionRequest::default()
        .with_to(contract)
        .with_input(Bytes::from(call.abi_encode()));
    let output = client.call(&tx, BlockId::latest()).await?;
    C::abi_decode_returns(&output).map_err(|e| {
        BlockchainError::Rpc(format!("Failed to decode {} result: {}", C::SIGNATURE, e))
    })
}

/// EIP-1559 fees for the fallback attempt.
///
/// With an explicit gas price the cap is that price and the tip is the
/// smaller of it and 2 gwei. Otherwise the tip is 2 gwei on top of twice the
/// base fee (the gas price stands in for a missing base fee).
async fn fallback_fees(sender: &TxSender, explicit: Option<u128>) -> BlockchainResult<(u128, u128)> {
    match explicit {
        Some(price) => Ok((price, price.min(MAX_PRIORITY_FEE))),
        None => {
            let client = sender.client();
            let base_fee = match client.base_fee().await {
                Ok(fee) => fee,
                Err(_) => client.gas_price().await?,
            };
            Ok((eip1559_max_fee(base_fee, MAX_PRIORITY_FEE), MAX_PRIORITY_FEE))
        }
    }
}

/// Send `amount` tokens (decimal string, token units) to every recipient.
///
/// `confirm_low_gas` is asked whether to continue when the ETH balance looks
/// too small to pay for gas.
pub async fn transfer_tokens(
    sender: &TxSender,
    token_address: Address,
    recipients: &[Address],
    amount: &str,
    options: &TransferOptions,
    should_cancel: &dyn Fn(u64) -> bool,
    confirm_low_gas: &dyn Fn(&str) -> bool,
) -> TransferResult<Vec<ReceiptSummary>> {
    let client = sender.client();
    let token = TokenInfo::fetch(client, token_address).await?;
    tracing::info!(symbol = %token.symbol, decimals = token.decimals, "Token loaded");

    let amount = parse_token_amount(amount, token.decimals)?;
    let count = U256::from(recipients.len());
    let needed = amount.saturating_mul(count);
    let balance = token.balance_of(client, sender.address()).await?;

    tracing::info!(
        sender = %sender.address(),
        balance = %token.format(balance),
        needed = %token.format(needed),
        recipients = recipients.len(),
        "Checked token balance"
    );
    if balance < needed {
        return Err(TransferError::InsufficientBalance {
            needed: token.format(needed),
            available: token.format(balance),
        });
    }

    let eth_balance = client.balance(sender.address()).await?;
    let gas_estimate = U256::from(client.gas_price().await?)
        .saturating_mul(U256::from(TOKEN_TRANSFER_GAS))
        .saturating_mul(count);
    if eth_balance < gas_estimate {
        let message = format!(
            "ETH balance {} might be too low for gas fees (estimated {} ETH). Continue anyway?",
            format_eth(eth_balance),
            format_eth(gas_estimate)
        );
        if !confirm_low_gas(&message) {
            return Err(TransferError::Aborted("insufficient ETH for gas".to_string()));
        }
    }

    let chain_id = client.chain_id().await?.0;
    let mut receipts = Vec::with_capacity(recipients.len());

    for (i, &recipient) in recipients.iter().enumerate() {
        tracing::info!(
            index = i + 1,
            total = recipients.len(),
            to = %recipient,
            "Starting token transfer"
        );
        let start = resolve_start_nonce(sender, options.cancel_gas_price_multiplier, should_cancel)
            .await?;
        let data = Bytes::from(
            IERC20::transferCall {
                to: recipient,
                value: amount,
            }
            .abi_encode(),
        );
        let base = TransactionRequest::default()
            .with_to(token_address)
            .with_input(data)
            .with_gas_limit(TOKEN_TRANSFER_GAS)
            .with_chain_id(chain_id);
        let token = &token;
        let base = &base;

        let receipt = send_with_retry(sender, recipient, options, start, move |nonce| async move {
            tracing::info!(
                to = %recipient,
                value = %token.format(amount),
                nonce = nonce,
                "Trying legacy transaction"
            );
            let legacy = match options.legacy_gas_price(sender).await {
                Ok(gas_price) => {
                    let tx = base.clone().with_nonce(nonce).with_gas_price(gas_price);
                    submit_and_wait(sender, tx, options.receipt_timeout).await
                }
                Err(error) => Err(AttemptFailure { error, sent: None }),
            };
            let legacy_failure = match legacy {
                Ok(receipt) => return Ok(receipt),
                Err(failure) => failure,
            };

            tracing::warn!(error = %legacy_failure.error, "Legacy transaction failed, trying EIP-1559");
            let (max_fee, priority) = fallback_fees(sender, options.gas_price)
                .await
                .map_err(|error| AttemptFailure {
                    error,
                    sent: legacy_failure.sent,
                })?;
            tracing::info!(
                max_fee_gwei = %format_gwei(max_fee),
                priority_fee_gwei = %format_gwei(priority),
                nonce = nonce,
                "Transaction details"
            );
            let tx = base
                .clone()
                .with_nonce(nonce)
                .with_max_fee_per_gas(max_fee)
                .with_max_priority_fee_per_gas(priority);
            submit_and_wait(sender, tx, options.receipt_timeout)
                .await
                .map_err(|failure| AttemptFailure {
                    sent: failure.sent.or(legacy_failure.sent),
                    error: failure.error,
                })
        })
        .await?;

        tracing::info!(tx_hash = %receipt.hash, "Token transfer succeeded");
        receipts.push(receipt);
    }

    Ok(receipts)
}
