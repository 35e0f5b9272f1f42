use std::collections::BTreeSet;

use num::ToPrimitive;
use num::rational::Rational64;
use tracing::trace;

use crate::params::ProtocolParams;
use crate::primitives::{Hash28, Transaction, Utxo, VKeyWitness};

/// Rounds a non-negative rational up to the next integer.
fn ceil_to_u64(value: Rational64) -> u64 {
    value.ceil().to_integer().to_u64().unwrap_or(0)
}

/// Estimates how many vkey witnesses the signed transaction will carry:
/// one per distinct payment key hash across spent and collateral inputs,
/// plus the required signers, plus the caller's padding. Never less than
/// one, since someone has to sign.
pub fn estimate_signer_count(
    tx: &Transaction,
    resolved_inputs: &[Utxo],
    collateral_utxos: &[Utxo],
    additional_signers: usize,
) -> usize {
    let mut signers: BTreeSet<Hash28> = BTreeSet::new();
    for utxo in resolved_inputs.iter().chain(collateral_utxos.iter()) {
        if let Some(key_hash) = utxo.output.address.payment_key_hash() {
            signers.insert(key_hash);
        }
    }
    for signer in &tx.body.required_signers {
        signers.insert(*signer);
    }
    signers.len().max(1) + additional_signers
}

/// Clones the transaction with zeroed vkey witnesses of the declared
/// count, so that the sized bytes match what the signed transaction will
/// occupy.
pub fn with_placeholder_witnesses(tx: &Transaction, signer_count: usize) -> Transaction {
    let mut padded = tx.clone();
    padded.witness_set.vkey_witnesses =
        (0..signer_count).map(|_| VKeyWitness::placeholder()).collect();
    padded
}

/// The minimum fee of a transaction:
///
/// ```text
/// size · minFeeA + minFeeB
///   + ceil(Σ mem · priceMem + Σ steps · priceSteps)
///   + ceil(refScriptBytes · refScriptCostPerByte)
/// ```
///
/// `tx` must already carry everything that reaches the wire (placeholder
/// witnesses included) because the size term reads the canonical encoding.
pub fn min_fee(tx: &Transaction, params: &ProtocolParams, ref_script_bytes: u64) -> u64 {
    let size = tx.size() as u64;
    let size_fee = size * params.min_fee_a + params.min_fee_b;

    let mut script_cost = Rational64::new(0, 1);
    for redeemer in tx.witness_set.redeemers.iter() {
        script_cost += Rational64::from_integer(redeemer.ex_units.mem as i64) * params.price_mem;
        script_cost +=
            Rational64::from_integer(redeemer.ex_units.steps as i64) * params.price_steps;
    }
    let script_fee = ceil_to_u64(script_cost);

    let ref_script_fee = ceil_to_u64(
        Rational64::from_integer(ref_script_bytes as i64)
            * params.min_fee_ref_script_cost_per_byte,
    );

    let fee = size_fee + script_fee + ref_script_fee;
    trace!(size, size_fee, script_fee, ref_script_fee, fee, "computed min fee");
    fee
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{
        Address, ExUnits, Hash, Input, NetworkId, PlutusData, Redeemer, RedeemerTag,
        TransactionOutput, Value,
    };

    fn key_address(byte: u8) -> Address {
        Address::enterprise_key(NetworkId::Testnet, Hash::new([byte; 28]))
    }

    fn simple_tx() -> Transaction {
        let mut tx = Transaction::default();
        tx.body.inputs.insert(Input::new(Hash::new([1u8; 32]), 0));
        tx.body
            .outputs
            .push(TransactionOutput::new(key_address(2), Value::coin(5_000_000)));
        tx.body.fee = 170_000;
        tx
    }

    #[test]
    fn fee_is_linear_in_size() {
        let params = ProtocolParams::mainnet();
        let tx = simple_tx();
        let fee = min_fee(&tx, &params, 0);
        assert_eq!(fee, tx.size() as u64 * params.min_fee_a + params.min_fee_b);
    }

    #[test]
    fn ex_units_raise_the_fee() {
        let params = ProtocolParams::mainnet();
        let mut tx = simple_tx();
        let base = min_fee(&tx, &params, 0);
        let mut redeemer = Redeemer::new(RedeemerTag::Spend, PlutusData::int(0));
        redeemer.ex_units = ExUnits::new(1_000_000, 500_000_000);
        tx.witness_set.redeemers.0.push(redeemer);
        let with_scripts = min_fee(&tx, &params, 0);
        // 1e6 * 577/1e4 + 5e8 * 721/1e7 = 57_700 + 36_050
        assert!(with_scripts >= base + 57_700 + 36_050);
    }

    #[test]
    fn reference_script_bytes_are_priced() {
        let params = ProtocolParams::mainnet();
        let tx = simple_tx();
        let base = min_fee(&tx, &params, 0);
        assert_eq!(min_fee(&tx, &params, 1_000), base + 15_000);
    }

    #[test]
    fn placeholder_witnesses_grow_the_size() {
        let tx = simple_tx();
        let padded = with_placeholder_witnesses(&tx, 2);
        // two witnesses at ~100 bytes each
        assert!(padded.size() > tx.size() + 190);
    }

    #[test]
    fn signer_estimate_deduplicates_addresses() {
        let tx = simple_tx();
        let utxos = vec![
            Utxo::new(
                Input::new(Hash::new([1u8; 32]), 0),
                TransactionOutput::new(key_address(7), Value::coin(1)),
            ),
            Utxo::new(
                Input::new(Hash::new([2u8; 32]), 0),
                TransactionOutput::new(key_address(7), Value::coin(1)),
            ),
        ];
        assert_eq!(estimate_signer_count(&tx, &utxos, &[], 0), 1);
        assert_eq!(estimate_signer_count(&tx, &utxos, &[], 2), 3);
    }
}
