use crate::error::TxBuildError;
use crate::params::ProtocolParams;
use crate::primitives::{Address, ExUnits, Input, RedeemerTag, RewardAccount, Transaction, Utxo};

/// Execution units reported for one redeemer by an evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedeemerEval {
    pub tag: RedeemerTag,
    pub index: u32,
    pub ex_units: ExUnits,
}

/// Well-known network magics, used to convert wall-clock times to slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkMagic {
    Mainnet,
    Preprod,
    Preview,
}

impl NetworkMagic {
    pub fn value(self) -> u32 {
        match self {
            NetworkMagic::Mainnet => 764_824_073,
            NetworkMagic::Preprod => 1,
            NetworkMagic::Preview => 2,
        }
    }

    /// (unix seconds at the reference point, slot number at that point).
    /// Slot length is one second on every post-Shelley network.
    fn slot_reference(self) -> (u64, u64) {
        match self {
            NetworkMagic::Mainnet => (1_596_059_091, 4_492_800),
            NetworkMagic::Preprod => (1_655_769_600, 86_400),
            NetworkMagic::Preview => (1_666_656_000, 0),
        }
    }

    /// Converts a unix timestamp (seconds) to the enclosing slot.
    pub fn slot_from_unix_time(self, unix_time: u64) -> u64 {
        let (zero_time, zero_slot) = self.slot_reference();
        zero_slot + unix_time.saturating_sub(zero_time)
    }

    /// Converts a slot number back to unix seconds.
    pub fn unix_time_from_slot(self, slot: u64) -> u64 {
        let (zero_time, zero_slot) = self.slot_reference();
        zero_time + slot.saturating_sub(zero_slot)
    }
}

/// Chain access as the builder consumes it.
///
/// Implementations may block on I/O; the builder calls them synchronously
/// and imposes no timeout. Errors are surfaced unwrapped through
/// [`TxBuildError::ProviderError`].
pub trait Provider {
    fn network_magic(&self) -> NetworkMagic;

    fn get_parameters(&self) -> Result<ProtocolParams, TxBuildError>;

    /// All UTxOs currently held by an address.
    fn get_unspent_outputs(&self, address: &Address) -> Result<Vec<Utxo>, TxBuildError>;

    /// Resolves input references to full UTxOs.
    fn resolve_unspent_outputs(&self, inputs: &[Input]) -> Result<Vec<Utxo>, TxBuildError>;

    /// Runs the Plutus scripts of `tx` and reports per-redeemer budgets.
    fn evaluate_transaction(
        &self,
        tx: &Transaction,
        resolved_inputs: &[Utxo],
    ) -> Result<Vec<RedeemerEval>, TxBuildError>;

    /// Rewards currently withdrawable from the account.
    fn get_rewards_balance(&self, account: &RewardAccount) -> Result<u64, TxBuildError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mainnet_slot_conversion_round_trips() {
        let magic = NetworkMagic::Mainnet;
        // one hour past the Shelley reference point
        let unix = 1_596_059_091 + 3_600;
        let slot = magic.slot_from_unix_time(unix);
        assert_eq!(slot, 4_492_800 + 3_600);
        assert_eq!(magic.unix_time_from_slot(slot), unix);
    }

    #[test]
    fn preview_slots_start_at_zero() {
        let magic = NetworkMagic::Preview;
        assert_eq!(magic.slot_from_unix_time(1_666_656_000), 0);
        assert_eq!(magic.slot_from_unix_time(1_666_656_010), 10);
    }
}
