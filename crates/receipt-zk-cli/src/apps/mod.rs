//! Demo application circuits shipped with the CLI.

pub mod trading_volume;
pub mod uniswap_prime;

use alloy_primitives::{Address, Bytes, B256};

use receipt_zk_core::circuit::{AppCircuit, Assignment};
use receipt_zk_core::error::Result;
use receipt_zk_core::receipt::ReceiptRecord;
use receipt_zk_core::source::{Fixture, FixtureLog};

/// An application circuit the CLI knows how to query, assign and demo.
pub trait DemoApp: AppCircuit + Send + Sync {
    /// Constant values every proof of this app is made against.
    fn assignment(&self) -> Assignment;

    /// Receipt queries proving over transaction `tx_hash`.
    fn queries(&self, tx_hash: B256) -> Result<Vec<ReceiptRecord>>;

    /// Transaction covered by [`DemoApp::sample_fixture`].
    fn sample_tx(&self) -> B256;

    /// Recorded receipts `init` writes next to the session config.
    fn sample_fixture(&self) -> Fixture;
}

/// An indexed topic holding an address.
pub(crate) fn address_topic(address: Address) -> B256 {
    address.into_word()
}

/// A log whose data is the concatenation of `words`.
pub(crate) fn log(address: Address, topics: Vec<B256>, words: &[B256]) -> FixtureLog {
    let data: Vec<u8> = words.iter().flat_map(|w| w.0).collect();
    FixtureLog {
        address,
        topics,
        data: Bytes::from(data),
    }
}

/// A big-endian word holding `value`.
pub(crate) fn amount(value: u64) -> B256 {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    B256::from(word)
}
