use num::rational::Rational64;

use crate::primitives::{ExUnits, ScriptKind};

/// Plutus cost models, one integer vector per language version.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CostModels {
    pub plutus_v1: Option<Vec<i64>>,
    pub plutus_v2: Option<Vec<i64>>,
    pub plutus_v3: Option<Vec<i64>>,
}

impl CostModels {
    pub fn get(&self, kind: ScriptKind) -> Option<&Vec<i64>> {
        match kind {
            ScriptKind::Native => None,
            ScriptKind::PlutusV1 => self.plutus_v1.as_ref(),
            ScriptKind::PlutusV2 => self.plutus_v2.as_ref(),
            ScriptKind::PlutusV3 => self.plutus_v3.as_ref(),
        }
    }

    pub fn set(&mut self, kind: ScriptKind, model: Vec<i64>) {
        match kind {
            ScriptKind::Native => {}
            ScriptKind::PlutusV1 => self.plutus_v1 = Some(model),
            ScriptKind::PlutusV2 => self.plutus_v2 = Some(model),
            ScriptKind::PlutusV3 => self.plutus_v3 = Some(model),
        }
    }
}

/// The ledger parameters the builder consumes. Providers fill this from
/// their protocol-parameter query; [`ProtocolParams::mainnet`] carries the
/// current mainnet constants for offline use and tests (cost models are
/// network data and stay empty until supplied).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolParams {
    /// Linear fee coefficient (lovelace per byte).
    pub min_fee_a: u64,
    /// Constant fee term (lovelace).
    pub min_fee_b: u64,
    pub max_tx_size: u64,
    /// Min-ada coefficient (lovelace per serialized output byte).
    pub coins_per_utxo_byte: u64,
    pub key_deposit: u64,
    pub pool_deposit: u64,
    pub drep_deposit: u64,
    pub gov_action_deposit: u64,
    pub max_value_size: u64,
    /// Percentage of the fee that collateral must cover (e.g. 150).
    pub collateral_percentage: u64,
    pub max_collateral_inputs: u64,
    /// Price per Plutus memory unit.
    pub price_mem: Rational64,
    /// Price per Plutus cpu step.
    pub price_steps: Rational64,
    /// Price per reference-script byte.
    pub min_fee_ref_script_cost_per_byte: Rational64,
    pub max_tx_ex_units: ExUnits,
    pub cost_models: CostModels,
}

impl ProtocolParams {
    pub fn mainnet() -> Self {
        Self {
            min_fee_a: 44,
            min_fee_b: 155_381,
            max_tx_size: 16_384,
            coins_per_utxo_byte: 4_310,
            key_deposit: 2_000_000,
            pool_deposit: 500_000_000,
            drep_deposit: 500_000_000,
            gov_action_deposit: 100_000_000_000,
            max_value_size: 5_000,
            collateral_percentage: 150,
            max_collateral_inputs: 3,
            price_mem: Rational64::new(577, 10_000),
            price_steps: Rational64::new(721, 10_000_000),
            min_fee_ref_script_cost_per_byte: Rational64::new(15, 1),
            max_tx_ex_units: ExUnits::new(14_000_000, 10_000_000_000),
            cost_models: CostModels::default(),
        }
    }
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self::mainnet()
    }
}
