//! The capability object (§4.4). Grounded on `sdk.rs`'s private-signer-field
//! pattern and `node.rs`'s practice of never deriving `Debug`/`Serialize`
//! on anything that would let the secret escape.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::transaction::Transaction;

use crate::chain_client::ChainClient;
use crate::error::{Error, Result};
use crate::guard::{SpendingLimitGuard, SpendingLimitStatus, SpendingLimits};
use crate::keystore::SigningIdentity;
use crate::network::is_mainnet_url;
use crate::send::{self, SendConfig, SignerCallback, TxResult};

const RENT_EXEMPT_ATA_ESTIMATE_LAMPORTS: u64 = 5_000;

pub struct WalletConfig {
    pub rpc_url: String,
    pub limits: SpendingLimits,
    pub send_config: SendConfig,
}

/// The signing secret lives only here, in a private field with no public
/// accessor. Every other component — strategies, adapters, the audit
/// path, the logger — can hold a `&WalletClient` and never reach it.
pub struct WalletClient {
    identity: SigningIdentity,
    chain: Arc<dyn ChainClient>,
    guard: Mutex<SpendingLimitGuard>,
    send_config: SendConfig,
}

impl WalletClient {
    /// Rejects any RPC endpoint whose host matches the mainnet pattern
    /// before anything else happens (§4.4, §4.10).
    pub fn new(identity: SigningIdentity, chain: Arc<dyn ChainClient>, config: WalletConfig) -> Result<Self> {
        if is_mainnet_url(&config.rpc_url) {
            return Err(Error::MainnetBlocked);
        }
        Ok(WalletClient {
            identity,
            chain,
            guard: Mutex::new(SpendingLimitGuard::new(config.limits)),
            send_config: config.send_config,
        })
    }

    pub fn public_key(&self) -> &str {
        self.identity.public_key()
    }

    fn pubkey(&self) -> Result<Pubkey> {
        self.identity
            .public_key()
            .parse()
            .map_err(|_| Error::InvalidConfig("stored public key is not a valid pubkey".to_string()))
    }

    fn keypair(&self) -> Result<Keypair> {
        Keypair::from_bytes(self.identity.secret_bytes()).map_err(|e| Error::SigningFailed(e.to_string()))
    }

    pub fn get_sol_balance(&self) -> Result<u64> {
        self.chain.get_sol_balance(&self.pubkey()?)
    }

    pub fn get_token_balance(&self, mint: &Pubkey) -> Result<u64> {
        let owner = self.pubkey()?;
        match self.chain.get_token_account(&owner, mint)? {
            Some(ata) => self.chain.get_token_balance(&ata),
            None => Ok(0),
        }
    }

    /// Idempotent: returns the existing associated token account, or
    /// builds and sends a single create instruction.
    pub async fn get_or_create_token_account(&self, mint: &Pubkey) -> Result<Pubkey> {
        let owner = self.pubkey()?;
        if let Some(ata) = self.chain.get_token_account(&owner, mint)? {
            return Ok(ata);
        }
        let tx = self.chain.build_create_ata_transaction(&owner, mint)?;
        self.sign_and_send(tx, RENT_EXEMPT_ATA_ESTIMATE_LAMPORTS, None).await?;
        self.chain
            .get_token_account(&owner, mint)?
            .ok_or_else(|| Error::RpcError("associated token account creation did not land".to_string()))
    }

    pub async fn send_sol(&self, to: &Pubkey, lamports: u64) -> Result<TxResult> {
        if lamports == 0 {
            return Err(Error::InvalidConfig("sendSol amount must be positive".to_string()));
        }
        let balance = self.get_sol_balance()?;
        if balance < lamports {
            return Err(Error::InsufficientFunds {
                balance,
                requested: lamports,
            });
        }
        let owner = self.pubkey()?;
        let tx = self.chain.build_transfer_transaction(&owner, to, lamports)?;
        self.sign_and_send(tx, lamports, Some(&to.to_string())).await
    }

    pub async fn send_token(&self, mint: &Pubkey, to: &Pubkey, amount: u64) -> Result<TxResult> {
        let owner = self.pubkey()?;
        let decimals = self.chain.get_token_decimals(mint)?;
        let source_ata = self.get_or_create_token_account(mint).await?;
        let dest_ata = self.chain.get_token_account(to, mint)?;
        let create_dest_ata = dest_ata.is_none();
        let dest_ata = dest_ata.unwrap_or_else(|| {
            spl_associated_token_account::get_associated_token_address(to, mint)
        });
        let tx = self.chain.build_transfer_checked_transaction(
            &owner,
            mint,
            &source_ata,
            &dest_ata,
            create_dest_ata,
            amount,
            decimals,
        )?;
        self.sign_and_send(tx, 0, Some(&to.to_string())).await
    }

    /// Signs without a guard check. Only for adapter pre-submission
    /// signing paths that will be re-submitted via [`sign_and_send`]
    /// (§4.5 swap flow).
    pub fn sign_transaction(&self, tx: &mut Transaction) -> Result<()> {
        let keypair = self.keypair()?;
        tx.try_sign(&[&keypair], tx.message.recent_blockhash)
            .map_err(|e| Error::SigningFailed(e.to_string()))
    }

    /// If `estimated_lamports > 0`, the guard is checked BEFORE the signer
    /// is invoked. On `confirmed`, the guard records the spend. This is
    /// the sole crossing point between every send path and the guard
    /// (§4.4, §5 ordering guarantee).
    pub async fn sign_and_send(
        &self,
        tx: Transaction,
        estimated_lamports: u64,
        destination: Option<&str>,
    ) -> Result<TxResult> {
        if estimated_lamports > 0 {
            self.guard.lock().unwrap().check(estimated_lamports, destination)?;
        }
        let signer = WalletSigner { wallet: self };
        let result = send::send_and_confirm(tx, &signer, self.chain.rpc(), &self.send_config).await?;
        if result.status == send::TxStatus::Confirmed {
            self.guard.lock().unwrap().record(estimated_lamports)?;
        }
        Ok(result)
    }

    pub fn get_spending_limit_status(&self) -> SpendingLimitStatus {
        self.guard.lock().unwrap().get_status()
    }
}

struct WalletSigner<'a> {
    wallet: &'a WalletClient,
}

impl SignerCallback for WalletSigner<'_> {
    fn sign(&self, tx: &mut Transaction) -> Result<()> {
        self.wallet.sign_transaction(tx)
    }
}

impl std::fmt::Display for WalletClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.identity.public_key())
    }
}

impl std::fmt::Debug for WalletClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WalletClient({})", self.identity.public_key())
    }
}

impl Serialize for WalletClient {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.identity.public_key())
    }
}
