use std::rc::Rc;

use crate::error::TxBuildError;
use crate::provider::{Provider, RedeemerEval};
use crate::primitives::{ExUnits, Transaction, Utxo};

/// Pluggable Plutus evaluation: given a candidate transaction and its
/// resolved inputs, report the execution units every redeemer consumed.
pub trait TxEvaluator {
    fn evaluate(
        &self,
        tx: &Transaction,
        resolved_inputs: &[Utxo],
    ) -> Result<Vec<RedeemerEval>, TxBuildError>;
}

/// The default evaluator: forwards to the provider's evaluation endpoint.
pub struct ProviderTxEvaluator {
    provider: Rc<dyn Provider>,
}

impl ProviderTxEvaluator {
    pub fn new(provider: Rc<dyn Provider>) -> Self {
        Self { provider }
    }
}

impl TxEvaluator for ProviderTxEvaluator {
    fn evaluate(
        &self,
        tx: &Transaction,
        resolved_inputs: &[Utxo],
    ) -> Result<Vec<RedeemerEval>, TxBuildError> {
        self.provider.evaluate_transaction(tx, resolved_inputs)
    }
}

/// A provider-free evaluator that bills every redeemer the same fixed
/// budget. Useful in tests and for offline fee estimation.
#[derive(Debug, Clone)]
pub struct FixedTxEvaluator {
    pub ex_units: ExUnits,
}

impl FixedTxEvaluator {
    pub fn new(ex_units: ExUnits) -> Self {
        Self { ex_units }
    }
}

impl TxEvaluator for FixedTxEvaluator {
    fn evaluate(
        &self,
        tx: &Transaction,
        _resolved_inputs: &[Utxo],
    ) -> Result<Vec<RedeemerEval>, TxBuildError> {
        Ok(tx
            .witness_set
            .redeemers
            .iter()
            .map(|redeemer| RedeemerEval {
                tag: redeemer.tag,
                index: redeemer.index,
                ex_units: self.ex_units,
            })
            .collect())
    }
}
