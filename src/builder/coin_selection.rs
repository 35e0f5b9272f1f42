use std::cmp::Reverse;

use tracing::trace;

use crate::error::TxBuildError;
use crate::primitives::{Utxo, Value, total_utxo_value};

/// Outcome of a selection round: the inputs to spend and the UTxOs left
/// over, which the balancer treats as the change pool.
#[derive(Debug, Clone)]
pub struct Selection {
    pub selected: Vec<Utxo>,
    pub remaining: Vec<Utxo>,
}

/// Pluggable input-selection strategy.
pub trait CoinSelector {
    /// Picks UTxOs from `available` so that, together with `pre_selected`,
    /// the selection covers `target`. Pre-selected UTxOs are non-removable
    /// and always part of the result.
    fn select(
        &self,
        available: &[Utxo],
        pre_selected: &[Utxo],
        target: &Value,
    ) -> Result<Selection, TxBuildError>;
}

/// Largest-first selection: cover each missing asset from the largest
/// holders down, then cover lovelace the same way.
#[derive(Debug, Clone)]
pub struct LargestFirstSelector {
    /// Upper bound on the total number of selected inputs.
    pub max_inputs: usize,
}

impl Default for LargestFirstSelector {
    fn default() -> Self {
        Self { max_inputs: 128 }
    }
}

impl CoinSelector for LargestFirstSelector {
    fn select(
        &self,
        available: &[Utxo],
        pre_selected: &[Utxo],
        target: &Value,
    ) -> Result<Selection, TxBuildError> {
        let mut selected: Vec<Utxo> = pre_selected.to_vec();
        let mut pool: Vec<&Utxo> = available
            .iter()
            .filter(|utxo| !pre_selected.iter().any(|p| p.input == utxo.input))
            .collect();

        let mut covered = total_utxo_value(&selected);

        // Cover assets first, largest holder of each missing asset first.
        loop {
            let missing = target.assets.saturating_sub(&covered.assets);
            let Some((policy, name, _)) = missing.iter().next() else {
                break;
            };
            let (policy, name) = (*policy, name.clone());
            pool.sort_by_key(|utxo| Reverse(utxo.output.value.assets.get(&policy, &name)));
            let Some(candidate) = pool.first() else {
                return Err(TxBuildError::BalanceInsufficient);
            };
            if candidate.output.value.assets.get(&policy, &name) == 0 {
                return Err(TxBuildError::BalanceInsufficient);
            }
            let utxo = pool.remove(0);
            covered = covered
                .checked_add(&utxo.output.value)
                .ok_or(TxBuildError::BalanceInsufficient)?;
            selected.push(utxo.clone());
        }

        // Then cover lovelace.
        pool.sort_by_key(|utxo| Reverse(utxo.output.value.coin));
        while covered.coin < target.coin {
            let Some(utxo) = pool.first() else {
                return Err(TxBuildError::BalanceInsufficient);
            };
            let utxo = (*utxo).clone();
            pool.remove(0);
            covered = covered
                .checked_add(&utxo.output.value)
                .ok_or(TxBuildError::BalanceInsufficient)?;
            selected.push(utxo);
        }

        if selected.len() > self.max_inputs {
            return Err(TxBuildError::InputLimitExceeded);
        }

        trace!(
            selected = selected.len(),
            remaining = pool.len(),
            covered_coin = covered.coin,
            target_coin = target.coin,
            "coin selection complete"
        );

        Ok(Selection {
            selected,
            remaining: pool.into_iter().cloned().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{
        Address, AssetName, Assets, Hash, Input, NetworkId, TransactionOutput,
    };

    fn address() -> Address {
        Address::enterprise_key(NetworkId::Testnet, Hash::new([1u8; 28]))
    }

    fn utxo(byte: u8, coin: u64) -> Utxo {
        Utxo::new(
            Input::new(Hash::new([byte; 32]), 0),
            TransactionOutput::new(address(), Value::coin(coin)),
        )
    }

    fn utxo_with_asset(byte: u8, coin: u64, policy: u8, quantity: u64) -> Utxo {
        let mut assets = Assets::new();
        assets.set(
            Hash::new([policy; 28]),
            AssetName::from_str_utf8("TK").unwrap(),
            quantity,
        );
        Utxo::new(
            Input::new(Hash::new([byte; 32]), 0),
            TransactionOutput::new(address(), Value::with_assets(coin, assets)),
        )
    }

    #[test]
    fn picks_largest_lovelace_first() {
        let available = vec![utxo(1, 2_000_000), utxo(2, 100_000_000), utxo(3, 3_000_000)];
        let selector = LargestFirstSelector::default();
        let selection = selector
            .select(&available, &[], &Value::coin(50_000_000))
            .unwrap();
        assert_eq!(selection.selected.len(), 1);
        assert_eq!(selection.selected[0].output.value.coin, 100_000_000);
        assert_eq!(selection.remaining.len(), 2);
    }

    #[test]
    fn pre_selected_counts_toward_coverage() {
        let available = vec![utxo(1, 2_000_000)];
        let pre = vec![utxo(9, 50_000_000)];
        let selector = LargestFirstSelector::default();
        let selection = selector
            .select(&available, &pre, &Value::coin(40_000_000))
            .unwrap();
        // pre-selected already covers the target; nothing picked
        assert_eq!(selection.selected.len(), 1);
        assert_eq!(selection.selected[0].input, pre[0].input);
    }

    #[test]
    fn covers_assets_before_lovelace() {
        let available = vec![
            utxo(1, 50_000_000),
            utxo_with_asset(2, 2_000_000, 7, 10),
            utxo_with_asset(3, 2_000_000, 7, 100),
        ];
        let mut wanted = Assets::new();
        wanted.set(Hash::new([7u8; 28]), AssetName::from_str_utf8("TK").unwrap(), 50);
        let selector = LargestFirstSelector::default();
        let selection = selector
            .select(&available, &[], &Value::with_assets(1_000_000, wanted))
            .unwrap();
        // the 100-token holder alone covers both the asset and the coin
        assert_eq!(selection.selected.len(), 1);
        assert_eq!(selection.selected[0].input, available[2].input);
    }

    #[test]
    fn insufficient_coin_fails() {
        let available = vec![utxo(1, 1_000_000)];
        let selector = LargestFirstSelector::default();
        let err = selector
            .select(&available, &[], &Value::coin(10_000_000))
            .unwrap_err();
        assert_eq!(err, TxBuildError::BalanceInsufficient);
    }

    #[test]
    fn missing_asset_fails() {
        let available = vec![utxo(1, 10_000_000)];
        let mut wanted = Assets::new();
        wanted.set(Hash::new([7u8; 28]), AssetName::from_str_utf8("TK").unwrap(), 1);
        let selector = LargestFirstSelector::default();
        let err = selector
            .select(&available, &[], &Value::with_assets(0, wanted))
            .unwrap_err();
        assert_eq!(err, TxBuildError::BalanceInsufficient);
    }

    #[test]
    fn input_limit_is_enforced() {
        let available = vec![utxo(1, 1_000_000), utxo(2, 1_000_000), utxo(3, 1_000_000)];
        let selector = LargestFirstSelector { max_inputs: 2 };
        let err = selector
            .select(&available, &[], &Value::coin(3_000_000))
            .unwrap_err();
        assert_eq!(err, TxBuildError::InputLimitExceeded);
    }
}
