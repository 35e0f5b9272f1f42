use std::cmp::Reverse;

use num::ToPrimitive;
use num::rational::Rational64;

use crate::error::TxBuildError;
use crate::params::ProtocolParams;
use crate::primitives::Utxo;

/// Lovelace the collateral must cover: `ceil(fee · percentage / 100)`.
pub fn required_collateral(fee: u64, params: &ProtocolParams) -> u64 {
    let required = Rational64::new(
        (fee * params.collateral_percentage) as i64,
        100,
    );
    required.ceil().to_integer().to_u64().unwrap_or(u64::MAX)
}

/// Picks collateral from ADA-only, script-free UTxOs.
///
/// Prefers the smallest single UTxO that covers the requirement; failing
/// that, accumulates largest-first up to `max_collateral_inputs`.
pub fn select_collateral(
    utxos: &[Utxo],
    required_lovelace: u64,
    max_inputs: usize,
) -> Result<Vec<Utxo>, TxBuildError> {
    let candidates: Vec<&Utxo> = utxos
        .iter()
        .filter(|utxo| {
            utxo.output.value.assets.is_empty() && utxo.output.script_ref.is_none()
        })
        .collect();

    // smallest-is-enough
    let mut single: Vec<&&Utxo> = candidates
        .iter()
        .filter(|utxo| utxo.output.value.coin >= required_lovelace)
        .collect();
    single.sort_unstable_by_key(|utxo| utxo.output.value.coin);
    if let Some(utxo) = single.first() {
        return Ok(vec![(***utxo).clone()]);
    }

    // accumulate largest-first
    let mut pool = candidates;
    pool.sort_unstable_by_key(|utxo| Reverse(utxo.output.value.coin));

    let mut selected = Vec::new();
    let mut accumulated = 0u64;
    for utxo in &pool {
        selected.push((**utxo).clone());
        accumulated += utxo.output.value.coin;
        if accumulated >= required_lovelace {
            return Ok(selected);
        }
        if selected.len() >= max_inputs {
            break;
        }
    }

    if selected.len() >= max_inputs && pool.len() > selected.len() {
        return Err(TxBuildError::MaximumInputCountExceeded);
    }
    Err(TxBuildError::BalanceInsufficient)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{
        Address, AssetName, Assets, Hash, Input, NetworkId, TransactionOutput, Value,
    };

    fn utxo(byte: u8, coin: u64) -> Utxo {
        let address = Address::enterprise_key(NetworkId::Testnet, Hash::new([1u8; 28]));
        Utxo::new(
            Input::new(Hash::new([byte; 32]), 0),
            TransactionOutput::new(address, Value::coin(coin)),
        )
    }

    #[test]
    fn requirement_rounds_up() {
        let params = ProtocolParams::mainnet();
        // 170_001 * 150 / 100 = 255_001.5 → 255_002
        assert_eq!(required_collateral(170_001, &params), 255_002);
    }

    #[test]
    fn prefers_smallest_sufficient_single() {
        let utxos = vec![utxo(1, 100), utxo(2, 200), utxo(3, 400)];
        let selected = select_collateral(&utxos, 150, 3).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].output.value.coin, 200);
    }

    #[test]
    fn accumulates_when_no_single_suffices() {
        let utxos = vec![utxo(1, 100), utxo(2, 100), utxo(3, 100)];
        let selected = select_collateral(&utxos, 250, 3).unwrap();
        assert_eq!(selected.len(), 3);
    }

    #[test]
    fn insufficient_pool_fails() {
        let utxos = vec![utxo(1, 100)];
        let err = select_collateral(&utxos, 150, 3).unwrap_err();
        assert_eq!(err, TxBuildError::BalanceInsufficient);
    }

    #[test]
    fn input_cap_is_enforced() {
        let utxos = vec![utxo(1, 100), utxo(2, 100), utxo(3, 100), utxo(4, 100)];
        let err = select_collateral(&utxos, 1_000, 3).unwrap_err();
        assert_eq!(err, TxBuildError::MaximumInputCountExceeded);
    }

    #[test]
    fn asset_bearing_utxos_are_skipped() {
        let mut assets = Assets::new();
        assets.set(
            Hash::new([7u8; 28]),
            AssetName::from_str_utf8("TK").unwrap(),
            1,
        );
        let address = Address::enterprise_key(NetworkId::Testnet, Hash::new([1u8; 28]));
        let with_assets = Utxo::new(
            Input::new(Hash::new([9u8; 32]), 0),
            TransactionOutput::new(address, Value::with_assets(1_000_000, assets)),
        );
        let err = select_collateral(&[with_assets], 100, 3).unwrap_err();
        assert_eq!(err, TxBuildError::BalanceInsufficient);
    }
}
