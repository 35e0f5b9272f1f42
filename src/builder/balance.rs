use std::collections::BTreeSet;

use tracing::debug;

use crate::builder::coin_selection::CoinSelector;
use crate::builder::collateral::{required_collateral, select_collateral};
use crate::builder::evaluation::TxEvaluator;
use crate::builder::fee::{estimate_signer_count, min_fee, with_placeholder_witnesses};
use crate::builder::redeemer_map::RedeemerMap;
use crate::error::TxBuildError;
use crate::params::ProtocolParams;
use crate::primitives::{
    Address, Assets, Hash28, Hash32, Input, PolicyId, Redeemer, Redeemers, Transaction,
    TransactionBody, TransactionOutput, Utxo, Value, Voter, total_utxo_value,
};
use crate::provider::RedeemerEval;

/// The balancing fixpoint runs selection → change → evaluation → fee at
/// most this many times before giving up.
pub const MAX_BALANCE_ITERATIONS: usize = 3;

/// Redeemers staged per positional domain. The witness-set container is
/// derived from this structure after every reindex, so a single copy of
/// each redeemer exists and index updates are visible everywhere.
#[derive(Debug, Clone, Default)]
pub struct StagedRedeemers {
    pub spend: RedeemerMap<Input>,
    pub mint: RedeemerMap<PolicyId>,
    pub reward: RedeemerMap<Hash28>,
    pub cert: Vec<(Hash28, Redeemer)>,
    pub vote: Vec<(Voter, Redeemer)>,
}

impl StagedRedeemers {
    pub fn is_empty(&self) -> bool {
        self.spend.is_empty()
            && self.mint.is_empty()
            && self.reward.is_empty()
            && self.cert.is_empty()
            && self.vote.is_empty()
    }

    /// Re-derives every redeemer index from its key's position in the
    /// matching body container.
    pub fn reindex(&mut self, body: &TransactionBody) -> Result<(), TxBuildError> {
        let inputs: Vec<Input> = body.inputs.iter().copied().collect();
        self.spend.reindex(|key| inputs.iter().position(|i| i == key))?;

        let policies: Vec<PolicyId> = body.mint.policies().copied().collect();
        self.mint.reindex(|key| policies.iter().position(|p| p == key))?;

        let reward_credentials: Vec<Hash28> =
            body.withdrawals.keys().map(|a| a.credential_hash()).collect();
        self.reward
            .reindex(|key| reward_credentials.iter().position(|c| c == key))?;

        for (script_hash, redeemer) in &mut self.cert {
            let position = body
                .certificates
                .iter()
                .position(|c| c.script_hash() == Some(*script_hash))
                .ok_or(TxBuildError::ElementNotFound)?;
            redeemer.index = position as u32;
        }

        for (voter, redeemer) in &mut self.vote {
            let position = body
                .voting_procedures
                .voters()
                .position(|v| v == voter)
                .ok_or(TxBuildError::ElementNotFound)?;
            redeemer.index = position as u32;
        }
        Ok(())
    }

    /// Materializes the witness-set redeemer container.
    pub fn to_redeemers(&self) -> Redeemers {
        let mut out: Vec<Redeemer> = Vec::new();
        out.extend(self.spend.iter().map(|(_, r)| r.clone()));
        out.extend(self.mint.iter().map(|(_, r)| r.clone()));
        out.extend(self.reward.iter().map(|(_, r)| r.clone()));
        out.extend(self.cert.iter().map(|(_, r)| r.clone()));
        out.extend(self.vote.iter().map(|(_, r)| r.clone()));
        out.sort_by_key(|r| (r.tag.value(), r.index));
        Redeemers(out)
    }

    /// Writes evaluator-reported budgets back into the staged redeemers,
    /// matching on (tag, index).
    pub fn apply_evaluations(&mut self, evals: &[RedeemerEval]) -> Result<(), TxBuildError> {
        for eval in evals {
            let found = self
                .all_mut()
                .find(|r| r.tag == eval.tag && r.index == eval.index);
            match found {
                Some(redeemer) => redeemer.ex_units = eval.ex_units,
                None => return Err(TxBuildError::ElementNotFound),
            }
        }
        Ok(())
    }

    fn all_mut(&mut self) -> impl Iterator<Item = &mut Redeemer> {
        self.spend
            .values_mut()
            .chain(self.mint.values_mut())
            .chain(self.reward.values_mut())
            .chain(self.cert.iter_mut().map(|(_, r)| r))
            .chain(self.vote.iter_mut().map(|(_, r)| r))
    }
}

/// Lovelace that flows without appearing in inputs or outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImplicitCoin {
    pub withdrawals: u64,
    pub deposits: u64,
    pub reclaim: u64,
}

/// Withdrawals add to the spendable side; certificate and proposal
/// deposits consume it; deregistrations give deposits back.
pub fn compute_implicit_coin(tx: &Transaction, params: &ProtocolParams) -> ImplicitCoin {
    let withdrawals = tx.body.total_withdrawals();
    let mut deposits = 0u64;
    let mut reclaim = 0u64;
    for cert in &tx.body.certificates {
        deposits += cert.deposit(params);
        reclaim += cert.refund(params);
    }
    for proposal in &tx.body.proposal_procedures {
        deposits += proposal.deposit;
    }
    ImplicitCoin { withdrawals, deposits, reclaim }
}

/// Everything the balancer needs besides the transaction itself.
pub struct BalanceContext<'a> {
    pub params: &'a ProtocolParams,
    pub additional_signers: usize,
    pub minimum_fee: Option<u64>,
    /// Resolved UTxOs behind the body's reference inputs.
    pub reference_utxos: &'a [Utxo],
    /// UTxOs the user staged explicitly; always spent.
    pub pre_selected: &'a [Utxo],
    pub available: &'a [Utxo],
    pub selector: &'a dyn CoinSelector,
    pub change_address: &'a Address,
    pub collateral_utxos: &'a [Utxo],
    pub collateral_address: Option<&'a Address>,
    pub evaluator: &'a dyn TxEvaluator,
}

/// Splits a surplus value into change outputs.
///
/// Assets are packed greedily in canonical order, opening a new output
/// whenever the serialized value would exceed `max_value_size`. Every
/// output is topped up to its min-ada; a pure-coin surplus too small for
/// an output of its own is folded into the fee (second tuple element).
pub fn build_change_outputs(
    surplus: &Value,
    change_address: &Address,
    params: &ProtocolParams,
) -> Result<(Vec<TransactionOutput>, u64), TxBuildError> {
    if surplus.is_zero() {
        return Ok((Vec::new(), 0));
    }

    if surplus.assets.is_empty() {
        let output = TransactionOutput::new(change_address.clone(), Value::coin(surplus.coin));
        if surplus.coin >= output.min_coin(params) {
            return Ok((vec![output], 0));
        }
        return Ok((Vec::new(), surplus.coin));
    }

    if surplus.coin == 0 {
        return Err(TxBuildError::FullyDepleted);
    }

    // Pack assets into groups bounded by the value-size limit. The size
    // probe uses a max-width coin so a later top-up cannot overflow it.
    let mut groups: Vec<Assets> = vec![Assets::new()];
    for (policy, name, quantity) in surplus.assets.iter() {
        let mut candidate = groups.last().expect("non-empty").clone();
        candidate.set(*policy, name.clone(), quantity);
        let probe = Value::with_assets(u64::MAX, candidate.clone());
        let size = minicbor::to_vec(&probe).expect("vec write").len() as u64;
        if size > params.max_value_size && !groups.last().expect("non-empty").is_empty() {
            let mut fresh = Assets::new();
            fresh.set(*policy, name.clone(), quantity);
            groups.push(fresh);
        } else {
            *groups.last_mut().expect("non-empty") = candidate;
        }
    }

    let mut outputs: Vec<TransactionOutput> = Vec::with_capacity(groups.len());
    let mut required_coin = 0u64;
    for assets in groups {
        let mut output =
            TransactionOutput::new(change_address.clone(), Value::with_assets(0, assets));
        let min = output.min_coin(params);
        output.value.coin = min;
        required_coin += min;
        outputs.push(output);
    }

    if surplus.coin < required_coin {
        return Err(TxBuildError::UtxoNotFragmentedEnough);
    }
    let leftover = surplus.coin - required_coin;
    if let Some(last) = outputs.last_mut() {
        last.value.coin += leftover;
    }
    Ok((outputs, 0))
}

fn dummy_collateral_sized(tx: &Transaction, ctx: &BalanceContext<'_>) -> Transaction {
    let mut sized = tx.clone();
    let slots = (ctx.params.max_collateral_inputs as usize)
        .min(ctx.collateral_utxos.len())
        .max(1);
    for i in 0..slots {
        let input = ctx
            .collateral_utxos
            .get(i)
            .map(|u| u.input)
            .unwrap_or_else(|| Input::new(Hash32::new([0u8; 32]), i as u64));
        sized.body.collateral_inputs.insert(input);
    }
    let return_address = ctx.collateral_address.unwrap_or(ctx.change_address);
    sized.body.collateral_return = Some(TransactionOutput::new(
        return_address.clone(),
        Value::coin(u64::MAX),
    ));
    sized.body.total_collateral = Some(u64::MAX);
    sized
}

/// Runs the balancing fixpoint (selection, change, evaluation, fee),
/// then collateral selection. Returns the resolved inputs that back the
/// final input set so the caller can hash script data against them.
pub fn balance_transaction(
    tx: &mut Transaction,
    staged: &mut StagedRedeemers,
    ctx: &BalanceContext<'_>,
) -> Result<Vec<Utxo>, TxBuildError> {
    let params = ctx.params;

    for output in &tx.body.outputs {
        output.check_min_coin(params)?;
    }

    let implicit = compute_implicit_coin(tx, params);
    let base_output_count = tx.body.outputs.len();
    let has_plutus = tx.witness_set.has_plutus_scripts() || !staged.is_empty();
    let change_floor = TransactionOutput::new(ctx.change_address.clone(), Value::coin(0))
        .min_coin(params);
    let fee_floor = ctx.minimum_fee.unwrap_or(0);
    let reference_script_bytes = tx.reference_script_bytes(ctx.reference_utxos);

    // Initial fee guess from the staged transaction alone; the loop only
    // ever raises it.
    let mut fee = {
        let signer_count = estimate_signer_count(
            tx,
            ctx.pre_selected,
            ctx.collateral_utxos,
            ctx.additional_signers,
        );
        let sized = with_placeholder_witnesses(tx, signer_count);
        min_fee(&sized, params, reference_script_bytes).max(fee_floor)
    };

    let minted = Value::with_assets(0, tx.body.mint.minted());
    let burned = Value::with_assets(0, tx.body.mint.burned());

    let mut previous_inputs: BTreeSet<Input> = BTreeSet::new();
    let mut resolved_inputs: Vec<Utxo> = Vec::new();
    let mut converged = false;

    for iteration in 1..=MAX_BALANCE_ITERATIONS {
        // Step 2: the value the inputs must provide.
        let user_outputs: Value = tx.body.outputs[..base_output_count]
            .iter()
            .fold(Value::coin(0), |acc, o| {
                acc.checked_add(&o.value).unwrap_or_else(|| Value::coin(u64::MAX))
            });
        let mut target = user_outputs
            .checked_add(&Value::coin(fee + implicit.deposits))
            .ok_or(TxBuildError::BalanceInsufficient)?
            .checked_add(&burned)
            .ok_or(TxBuildError::BalanceInsufficient)?;
        target = target.saturating_sub(&minted);
        target.coin = target
            .coin
            .saturating_sub(implicit.withdrawals + implicit.reclaim);

        // Step 3: selection, preferring headroom for a min-ada change
        // output but settling for an exact cover.
        let mut padded_target = target.clone();
        padded_target.coin += change_floor;
        let selection = match ctx.selector.select(ctx.available, ctx.pre_selected, &padded_target)
        {
            Ok(selection) => selection,
            Err(TxBuildError::BalanceInsufficient) => {
                ctx.selector.select(ctx.available, ctx.pre_selected, &target)?
            }
            Err(e) => return Err(e),
        };
        tx.body.inputs = selection.selected.iter().map(|u| u.input).collect();
        resolved_inputs = selection.selected;

        // Step 4: change.
        tx.body.outputs.truncate(base_output_count);
        let mut consumed = total_utxo_value(&resolved_inputs)
            .checked_add(&minted)
            .ok_or(TxBuildError::BalanceInsufficient)?;
        consumed.coin = consumed
            .coin
            .checked_add(implicit.withdrawals + implicit.reclaim)
            .ok_or(TxBuildError::BalanceInsufficient)?;
        let mut produced = user_outputs
            .checked_add(&burned)
            .ok_or(TxBuildError::BalanceInsufficient)?;
        produced.coin = produced
            .coin
            .checked_add(fee + implicit.deposits)
            .ok_or(TxBuildError::BalanceInsufficient)?;
        if !consumed.contains(&produced) {
            return Err(TxBuildError::BalanceInsufficient);
        }
        let surplus = consumed.saturating_sub(&produced);
        let (change_outputs, folded) =
            build_change_outputs(&surplus, ctx.change_address, params)?;
        tx.body.outputs.extend(change_outputs);
        tx.body.fee = fee + folded;

        // Step 5: the canonical sort may have moved redeemer targets.
        staged.reindex(&tx.body)?;
        tx.witness_set.redeemers = staged.to_redeemers();

        // Step 7: evaluation feeds real budgets back into the redeemers.
        if !tx.witness_set.redeemers.is_empty() {
            let mut resolved = resolved_inputs.clone();
            resolved.extend_from_slice(ctx.reference_utxos);
            let evals = ctx.evaluator.evaluate(tx, &resolved)?;
            staged.apply_evaluations(&evals)?;
            tx.witness_set.redeemers = staged.to_redeemers();
        }

        // Step 8: re-price. Collateral fields are dummied in so the size
        // does not grow behind the fee's back in step 9.
        let signer_count = estimate_signer_count(
            tx,
            &resolved_inputs,
            ctx.collateral_utxos,
            ctx.additional_signers,
        );
        let mut sized = with_placeholder_witnesses(tx, signer_count);
        if has_plutus {
            sized = dummy_collateral_sized(&sized, ctx);
        }
        let new_fee = min_fee(&sized, params, reference_script_bytes).max(fee_floor);

        let inputs_stable = previous_inputs == tx.body.inputs;
        previous_inputs = tx.body.inputs.clone();

        debug!(iteration, fee, new_fee, inputs_stable, "balance iteration");

        if new_fee <= fee && inputs_stable {
            converged = true;
            break;
        }
        // The fee never decreases between iterations, and the tx size is
        // bounded by maxTxSize, so this ascent terminates.
        fee = new_fee.max(fee);
    }

    if !converged {
        return Err(TxBuildError::BalancingDidNotConverge);
    }

    // Step 9: collateral.
    if has_plutus {
        let required = required_collateral(tx.body.fee, params);
        let collateral = select_collateral(
            ctx.collateral_utxos,
            required,
            params.max_collateral_inputs as usize,
        )?;
        tx.body.collateral_inputs = collateral.iter().map(|u| u.input).collect();
        let total: u64 = collateral.iter().map(|u| u.output.value.coin).sum();
        let return_amount = total - required;
        let return_address = ctx.collateral_address.unwrap_or(ctx.change_address);
        let return_output =
            TransactionOutput::new(return_address.clone(), Value::coin(return_amount));
        if return_amount > 0 && return_amount >= return_output.min_coin(params) {
            tx.body.collateral_return = Some(return_output);
            tx.body.total_collateral = Some(required);
        } else {
            // the whole selection is at stake
            tx.body.collateral_return = None;
            tx.body.total_collateral = Some(total);
        }
    }

    Ok(resolved_inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{
        AssetName, Certificate, Credential, Hash, NetworkId, PlutusData, RedeemerTag,
    };

    fn change_address() -> Address {
        Address::enterprise_key(NetworkId::Testnet, Hash::new([9u8; 28]))
    }

    #[test]
    fn implicit_coin_accounts_for_certificates() {
        let mut params = ProtocolParams::mainnet();
        params.key_deposit = 2;
        params.pool_deposit = 3;
        params.drep_deposit = 5;

        let mut tx = Transaction::default();
        tx.body.certificates.push(Certificate::StakeRegistration {
            credential: Credential::Key(Hash::new([1u8; 28])),
        });
        tx.body.certificates.push(Certificate::Reg {
            credential: Credential::Key(Hash::new([2u8; 28])),
            deposit: 5,
        });
        tx.body.certificates.push(Certificate::StakeDeregistration {
            credential: Credential::Key(Hash::new([3u8; 28])),
        });
        tx.body.certificates.push(Certificate::PoolRetirement {
            pool: Hash::new([4u8; 28]),
            epoch: 100,
        });
        let account = crate::primitives::RewardAccount::from_key_hash(
            NetworkId::Testnet,
            Hash::new([5u8; 28]),
        );
        tx.body.withdrawals.insert(account, 10);

        let implicit = compute_implicit_coin(&tx, &params);
        assert_eq!(implicit.withdrawals, 10);
        assert_eq!(implicit.deposits, 2 + 5);
        assert_eq!(implicit.reclaim, 2 + 3);
    }

    #[test]
    fn small_coin_surplus_folds_into_fee() {
        let params = ProtocolParams::mainnet();
        let (outputs, folded) =
            build_change_outputs(&Value::coin(10_000), &change_address(), &params).unwrap();
        assert!(outputs.is_empty());
        assert_eq!(folded, 10_000);
    }

    #[test]
    fn coin_surplus_becomes_one_output() {
        let params = ProtocolParams::mainnet();
        let (outputs, folded) =
            build_change_outputs(&Value::coin(5_000_000), &change_address(), &params).unwrap();
        assert_eq!(folded, 0);
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].value.coin, 5_000_000);
    }

    #[test]
    fn asset_surplus_is_packed_above_min_ada() {
        let params = ProtocolParams::mainnet();
        let mut assets = Assets::new();
        assets.set(
            Hash::new([7u8; 28]),
            AssetName::from_str_utf8("TK").unwrap(),
            42,
        );
        let (outputs, folded) = build_change_outputs(
            &Value::with_assets(5_000_000, assets.clone()),
            &change_address(),
            &params,
        )
        .unwrap();
        assert_eq!(folded, 0);
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].value.assets, assets);
        assert_eq!(outputs[0].value.coin, 5_000_000);
        assert!(outputs[0].check_min_coin(&params).is_ok());
    }

    #[test]
    fn asset_surplus_without_coin_is_depleted() {
        let params = ProtocolParams::mainnet();
        let mut assets = Assets::new();
        assets.set(
            Hash::new([7u8; 28]),
            AssetName::from_str_utf8("TK").unwrap(),
            1,
        );
        let err = build_change_outputs(
            &Value::with_assets(0, assets),
            &change_address(),
            &params,
        )
        .unwrap_err();
        assert_eq!(err, TxBuildError::FullyDepleted);
    }

    #[test]
    fn asset_surplus_below_min_ada_is_not_fragmented_enough() {
        let params = ProtocolParams::mainnet();
        let mut assets = Assets::new();
        assets.set(
            Hash::new([7u8; 28]),
            AssetName::from_str_utf8("TK").unwrap(),
            1,
        );
        let err = build_change_outputs(
            &Value::with_assets(10_000, assets),
            &change_address(),
            &params,
        )
        .unwrap_err();
        assert_eq!(err, TxBuildError::UtxoNotFragmentedEnough);
    }

    #[test]
    fn staged_redeemers_derive_witness_container() {
        let mut staged = StagedRedeemers::default();
        staged
            .spend
            .insert(
                Input::new(Hash::new([2u8; 32]), 0),
                Redeemer::new(RedeemerTag::Spend, PlutusData::int(1)),
            )
            .unwrap();
        staged
            .mint
            .insert(
                Hash::new([1u8; 28]),
                Redeemer::new(RedeemerTag::Mint, PlutusData::int(2)),
            )
            .unwrap();
        let redeemers = staged.to_redeemers();
        assert_eq!(redeemers.len(), 2);
        assert_eq!(redeemers.0[0].tag, RedeemerTag::Spend);
        assert_eq!(redeemers.0[1].tag, RedeemerTag::Mint);
    }

    #[test]
    fn evaluations_write_back_by_tag_and_index() {
        let mut staged = StagedRedeemers::default();
        staged
            .spend
            .insert(
                Input::new(Hash::new([2u8; 32]), 0),
                Redeemer::new(RedeemerTag::Spend, PlutusData::int(1)),
            )
            .unwrap();
        staged
            .apply_evaluations(&[RedeemerEval {
                tag: RedeemerTag::Spend,
                index: 0,
                ex_units: crate::primitives::ExUnits::new(1024, 500_000),
            }])
            .unwrap();
        let redeemer = staged.to_redeemers().0[0].clone();
        assert_eq!(redeemer.ex_units.mem, 1024);
        assert_eq!(redeemer.ex_units.steps, 500_000);
    }

    #[test]
    fn unknown_evaluation_target_is_an_error() {
        let mut staged = StagedRedeemers::default();
        let err = staged
            .apply_evaluations(&[RedeemerEval {
                tag: RedeemerTag::Mint,
                index: 3,
                ex_units: crate::primitives::ExUnits::new(1, 1),
            }])
            .unwrap_err();
        assert_eq!(err, TxBuildError::ElementNotFound);
    }
}
