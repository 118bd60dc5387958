//! Shared fixtures for strategy/swap `execute()` tests. `cfg(test)`-only,
//! declared once here instead of duplicated per strategy module.

#![cfg(test)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

use crate::chain_client::ChainClient;
use crate::error::Result;
use crate::guard::SpendingLimits;
use crate::keystore;
use crate::send::{Commitment, ConfirmationStatus, RpcClient, SendConfig, SignatureStatusReport, SimulationReport, SubmitOutcome, TxStatus};
use crate::swap::{Quote, SwapAdapter, SwapResult, finish_swap};
use crate::wallet_client::{WalletClient, WalletConfig};

pub(crate) struct FakeChain {
    pub token_balance: AtomicU64,
}

impl FakeChain {
    pub fn new() -> Self {
        FakeChain {
            token_balance: AtomicU64::new(0),
        }
    }
}

impl RpcClient for FakeChain {
    fn get_latest_blockhash(&self, _commitment: Commitment) -> Result<Hash> {
        Ok(Hash::default())
    }
    fn simulate_transaction(&self, _tx: &Transaction) -> Result<SimulationReport> {
        Ok(SimulationReport {
            success: true,
            error: None,
            compute_units_consumed: None,
        })
    }
    fn submit_transaction(&self, _tx: &Transaction) -> SubmitOutcome {
        SubmitOutcome::Submitted(Signature::default())
    }
    fn get_signature_status(&self, _signature: &Signature) -> Result<SignatureStatusReport> {
        Ok(SignatureStatusReport {
            status: ConfirmationStatus::Reached(Commitment::Confirmed),
            slot: Some(1),
            err: None,
        })
    }
}

impl ChainClient for FakeChain {
    fn rpc(&self) -> &dyn RpcClient {
        self
    }
    fn get_sol_balance(&self, _owner: &Pubkey) -> Result<u64> {
        Ok(5_000_000_000)
    }
    fn get_token_account(&self, _owner: &Pubkey, _mint: &Pubkey) -> Result<Option<Pubkey>> {
        Ok(Some(Pubkey::default()))
    }
    fn get_token_balance(&self, _token_account: &Pubkey) -> Result<u64> {
        Ok(self.token_balance.load(Ordering::SeqCst))
    }
    fn get_token_decimals(&self, _mint: &Pubkey) -> Result<u8> {
        Ok(6)
    }
    fn build_create_ata_transaction(&self, _owner: &Pubkey, _mint: &Pubkey) -> Result<Transaction> {
        Ok(Transaction::default())
    }
    fn build_transfer_transaction(&self, _from: &Pubkey, _to: &Pubkey, _lamports: u64) -> Result<Transaction> {
        Ok(Transaction::default())
    }
    fn build_transfer_checked_transaction(
        &self,
        _owner: &Pubkey,
        _mint: &Pubkey,
        _source_ata: &Pubkey,
        _dest_ata: &Pubkey,
        _create_dest_ata: bool,
        _amount: u64,
        _decimals: u8,
    ) -> Result<Transaction> {
        Ok(Transaction::default())
    }
}

/// An adapter whose `swap` drives the real §4.5 assembly path
/// (`finish_swap`) off a chain balance it bumps itself — standing in for
/// the post-confirmation balance read a real DEX adapter would make.
pub(crate) struct WorkingAdapter {
    pub chain: Arc<FakeChain>,
}

impl SwapAdapter for WorkingAdapter {
    fn name(&self) -> &str {
        "working"
    }

    fn quote(&self, input_mint: &Pubkey, output_mint: &Pubkey, amount_in: u64) -> Result<Quote> {
        Ok(Quote {
            input_mint: *input_mint,
            output_mint: *output_mint,
            in_amount: amount_in,
            out_amount: amount_in,
            other_amount_threshold: amount_in - amount_in / 100,
            price_impact_pct: 0.1,
            provider: "working".to_string(),
            raw_opaque: serde_json::Value::Null,
        })
    }

    fn swap(&self, wallet: &WalletClient, quote: &Quote, _slippage_bps: u16) -> Result<SwapResult> {
        let pre = wallet.get_token_balance(&quote.output_mint)?;
        self.chain.token_balance.fetch_add(quote.out_amount, Ordering::SeqCst);
        let post = wallet.get_token_balance(&quote.output_mint)?;
        Ok(finish_swap(
            wallet,
            quote.clone(),
            pre,
            post,
            TxStatus::Confirmed,
            Some("fakesig".to_string()),
            None,
        ))
    }
}

pub(crate) fn test_wallet(chain: Arc<FakeChain>) -> WalletClient {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("k.json");
    let mut secret = [7u8; 64];
    secret[32..].copy_from_slice(&[8u8; 32]);
    keystore::create(secret, "correcthorsebattery", &path).unwrap();
    let identity = keystore::open(&path, "correcthorsebattery").unwrap();
    let limits = SpendingLimits::new(100_000_000_000, 500_000_000_000, None).unwrap();
    let config = WalletConfig {
        rpc_url: "https://api.devnet.solana.com".to_string(),
        limits,
        send_config: SendConfig::default(),
    };
    WalletClient::new(identity, chain, config).unwrap()
}
