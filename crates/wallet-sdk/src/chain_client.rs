//! The chain-access boundary the WalletClient reads and writes through.
//! Transaction serialization and ATA derivation are chain-library
//! internals and explicitly out of scope (§1); this trait is the seam an
//! external collaborator implements with a real RPC client.

use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::Transaction;

use crate::error::Result;
use crate::send::RpcClient;

pub trait ChainClient: RpcClient {
    /// Upcast helper: trait object upcasting to a supertrait is not relied
    /// on here, so implementers just return `self`.
    fn rpc(&self) -> &dyn RpcClient;

    fn get_sol_balance(&self, owner: &Pubkey) -> Result<u64>;

    /// `None` when no associated token account exists yet for `owner`/`mint`.
    fn get_token_account(&self, owner: &Pubkey, mint: &Pubkey) -> Result<Option<Pubkey>>;

    /// Missing token account yields zero (§4.4).
    fn get_token_balance(&self, token_account: &Pubkey) -> Result<u64>;

    fn get_token_decimals(&self, mint: &Pubkey) -> Result<u8>;

    fn build_create_ata_transaction(&self, owner: &Pubkey, mint: &Pubkey) -> Result<Transaction>;

    fn build_transfer_transaction(&self, from: &Pubkey, to: &Pubkey, lamports: u64) -> Result<Transaction>;

    #[allow(clippy::too_many_arguments)]
    fn build_transfer_checked_transaction(
        &self,
        owner: &Pubkey,
        mint: &Pubkey,
        source_ata: &Pubkey,
        dest_ata: &Pubkey,
        create_dest_ata: bool,
        amount: u64,
        decimals: u8,
    ) -> Result<Transaction>;
}
