//! The transaction-builder façade: staged mutators with a sticky first
//! error, and a consuming `build` that selects, balances, and hashes.

use std::collections::BTreeSet;
use std::rc::Rc;

use tracing::debug;

use crate::error::TxBuildError;
use crate::params::ProtocolParams;
use crate::primitives::{
    Address, Anchor, AssetName, Certificate, Credential, DRep, DatumOption, GovAction,
    GovActionId, Hash28, Hash32, Metadatum, NetworkId, PlutusData, PolicyId, Redeemer,
    RedeemerTag, RewardAccount, Script, ScriptKind, Transaction, TransactionOutput, Utxo, Value,
    Voter, VotingProcedure, check_certificate,
};
use crate::provider::Provider;

pub mod balance;
pub mod coin_selection;
pub mod collateral;
pub mod evaluation;
pub mod fee;
pub mod redeemer_map;
pub mod script_data;

pub use balance::{BalanceContext, ImplicitCoin, StagedRedeemers, compute_implicit_coin};
pub use coin_selection::{CoinSelector, LargestFirstSelector, Selection};
pub use evaluation::{FixedTxEvaluator, ProviderTxEvaluator, TxEvaluator};
pub use redeemer_map::RedeemerMap;

use balance::balance_transaction;
use script_data::{encode_language_views, script_data_hash};

const LAST_ERROR_CAP: usize = 1023;

/// Builder lifecycle: mutators only run while `Fresh`; the first failure
/// parks the builder in `Failed` and every later call is a no-op; a
/// successful `build` is terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
enum BuilderState {
    Fresh,
    Failed(TxBuildError),
    Built,
}

/// Staged, fail-fast transaction assembly.
///
/// The builder owns the in-progress [`Transaction`]; user-supplied values
/// are captured by clone. Mutators return `&mut Self` for chaining and
/// never fail loudly: the first error is recorded and `build` returns it
/// verbatim.
pub struct TxBuilder {
    state: BuilderState,
    last_error_message: String,
    tx: Transaction,
    params: ProtocolParams,
    provider: Rc<dyn Provider>,
    coin_selector: Box<dyn CoinSelector>,
    evaluator: Box<dyn TxEvaluator>,
    change_address: Option<Address>,
    collateral_address: Option<Address>,
    available_utxos: Option<Vec<Utxo>>,
    collateral_utxos: Option<Vec<Utxo>>,
    pre_selected: Vec<Utxo>,
    reference_utxos: Vec<Utxo>,
    staged_redeemers: StagedRedeemers,
    plutus_languages: BTreeSet<ScriptKind>,
    additional_signers: usize,
    minimum_fee: Option<u64>,
}

impl TxBuilder {
    pub fn new(params: ProtocolParams, provider: Rc<dyn Provider>) -> Self {
        let evaluator = ProviderTxEvaluator::new(provider.clone());
        Self {
            state: BuilderState::Fresh,
            last_error_message: String::new(),
            tx: Transaction::default(),
            params,
            provider,
            coin_selector: Box::new(LargestFirstSelector::default()),
            evaluator: Box::new(evaluator),
            change_address: None,
            collateral_address: None,
            available_utxos: None,
            collateral_utxos: None,
            pre_selected: Vec::new(),
            reference_utxos: Vec::new(),
            staged_redeemers: StagedRedeemers::default(),
            plutus_languages: BTreeSet::new(),
            additional_signers: 0,
            minimum_fee: None,
        }
    }

    /// The human-readable message of the most recent failure.
    pub fn last_error_message(&self) -> &str {
        &self.last_error_message
    }

    /// A read-only view of the staged transaction.
    pub fn staged_transaction(&self) -> &Transaction {
        &self.tx
    }

    fn fresh(&self) -> bool {
        self.state == BuilderState::Fresh
    }

    fn fail(&mut self, error: TxBuildError, message: &str) {
        let mut message = message.to_string();
        message.truncate(LAST_ERROR_CAP);
        self.last_error_message = message;
        self.state = BuilderState::Failed(error);
    }

    // --- configuration -----------------------------------------------------

    pub fn set_coin_selector(&mut self, selector: Box<dyn CoinSelector>) -> &mut Self {
        if self.fresh() {
            self.coin_selector = selector;
        }
        self
    }

    pub fn set_tx_evaluator(&mut self, evaluator: Box<dyn TxEvaluator>) -> &mut Self {
        if self.fresh() {
            self.evaluator = evaluator;
        }
        self
    }

    pub fn set_network_id(&mut self, network_id: NetworkId) -> &mut Self {
        if self.fresh() {
            self.tx.body.network_id = Some(network_id.value());
        }
        self
    }

    pub fn set_change_address(&mut self, address: Address) -> &mut Self {
        if self.fresh() {
            self.change_address = Some(address);
        }
        self
    }

    /// Parses and sets the change address from bech32 text.
    pub fn set_change_address_bech32(&mut self, address: &str) -> &mut Self {
        if !self.fresh() {
            return self;
        }
        match Address::from_bech32(address) {
            Ok(address) => self.change_address = Some(address),
            Err(e) => self.fail(e, "Failed to parse change address."),
        }
        self
    }

    pub fn set_collateral_change_address(&mut self, address: Address) -> &mut Self {
        if self.fresh() {
            self.collateral_address = Some(address);
        }
        self
    }

    /// Overrides the computed fee floor; the balancer never goes below it.
    pub fn set_minimum_fee(&mut self, fee: u64) -> &mut Self {
        if self.fresh() {
            self.minimum_fee = Some(fee);
        }
        self
    }

    pub fn set_utxos(&mut self, utxos: Vec<Utxo>) -> &mut Self {
        if self.fresh() {
            self.available_utxos = Some(utxos);
        }
        self
    }

    pub fn set_collateral_utxos(&mut self, utxos: Vec<Utxo>) -> &mut Self {
        if self.fresh() {
            self.collateral_utxos = Some(utxos);
        }
        self
    }

    /// Last slot (exclusive) at which the transaction validates.
    pub fn set_invalid_after(&mut self, slot: u64) -> &mut Self {
        if self.fresh() {
            self.tx.body.ttl = Some(slot);
        }
        self
    }

    /// As [`Self::set_invalid_after`], from a unix timestamp in seconds.
    pub fn set_invalid_after_from_unix_time(&mut self, unix_time: u64) -> &mut Self {
        if self.fresh() {
            let slot = self.provider.network_magic().slot_from_unix_time(unix_time);
            self.tx.body.ttl = Some(slot);
        }
        self
    }

    /// First slot at which the transaction validates.
    pub fn set_invalid_before(&mut self, slot: u64) -> &mut Self {
        if self.fresh() {
            self.tx.body.validity_start = Some(slot);
        }
        self
    }

    /// As [`Self::set_invalid_before`], from a unix timestamp in seconds.
    pub fn set_invalid_before_from_unix_time(&mut self, unix_time: u64) -> &mut Self {
        if self.fresh() {
            let slot = self.provider.network_magic().slot_from_unix_time(unix_time);
            self.tx.body.validity_start = Some(slot);
        }
        self
    }

    /// Accounts for signatures that will be added later, so the fee covers
    /// their bytes before they exist.
    pub fn pad_signer_count(&mut self, count: usize) -> &mut Self {
        if self.fresh() {
            self.additional_signers = count;
        }
        self
    }

    // --- staging mutators --------------------------------------------------

    /// Adds a read-only input visible to scripts. A Plutus script carried
    /// in the referenced output flags its language for the script-data
    /// hash.
    pub fn add_reference_input(&mut self, utxo: Utxo) -> &mut Self {
        if !self.fresh() {
            return self;
        }
        if let Some(script) = &utxo.output.script_ref {
            if script.is_plutus() {
                self.plutus_languages.insert(script.kind);
            }
        }
        self.tx.body.reference_inputs.insert(utxo.input);
        self.reference_utxos.push(utxo);
        self
    }

    /// Sends plain lovelace to an address.
    pub fn send_lovelace(&mut self, address: &Address, amount: u64) -> &mut Self {
        self.send_value(address, Value::coin(amount))
    }

    /// Sends a value (lovelace plus assets) to an address.
    pub fn send_value(&mut self, address: &Address, value: Value) -> &mut Self {
        if self.fresh() {
            self.tx
                .body
                .outputs
                .push(TransactionOutput::new(address.clone(), value));
        }
        self
    }

    /// Locks lovelace at a script address under a datum.
    pub fn lock_lovelace(
        &mut self,
        address: &Address,
        amount: u64,
        datum: DatumOption,
    ) -> &mut Self {
        self.lock_value(address, Value::coin(amount), datum)
    }

    /// Locks a value at a script address under a datum.
    pub fn lock_value(&mut self, address: &Address, value: Value, datum: DatumOption) -> &mut Self {
        if self.fresh() {
            let output = TransactionOutput::new(address.clone(), value).with_datum(datum);
            self.tx.body.outputs.push(output);
        }
        self
    }

    /// Stages a UTxO for spending. Spending from a script address requires
    /// a redeemer; a supplied datum joins the witness-set datum set (for
    /// outputs locked under a datum hash).
    pub fn add_input(
        &mut self,
        utxo: Utxo,
        redeemer: Option<PlutusData>,
        datum: Option<PlutusData>,
    ) -> &mut Self {
        if !self.fresh() {
            return self;
        }
        if utxo.output.address.payment_is_script() && redeemer.is_none() {
            self.fail(
                TxBuildError::RedeemerRequired,
                "Redeemer is required for script address inputs.",
            );
            return self;
        }
        if let Some(data) = redeemer {
            let staged = Redeemer::new(RedeemerTag::Spend, data);
            if let Err(e) = self.staged_redeemers.spend.insert(utxo.input, staged) {
                self.fail(e, "A redeemer is already staged for this input.");
                return self;
            }
        }
        if let Some(datum) = datum {
            self.tx.witness_set.add_plutus_data(datum);
        }
        self.pre_selected.push(utxo);
        self
    }

    /// Appends a pre-built output verbatim.
    pub fn add_output(&mut self, output: TransactionOutput) -> &mut Self {
        if self.fresh() {
            self.tx.body.outputs.push(output);
        }
        self
    }

    /// Inserts a metadata entry and refreshes the auxiliary-data hash.
    pub fn set_metadata(&mut self, label: u64, value: Metadatum) -> &mut Self {
        if !self.fresh() {
            return self;
        }
        let aux = self.tx.auxiliary_data.get_or_insert_with(Default::default);
        aux.set_metadata(label, value);
        self.tx.body.auxiliary_data_hash = Some(aux.hash());
        self
    }

    /// Merges a signed mint quantity. The first redeemer staged for a
    /// policy sticks; re-minting under the same policy reuses it.
    pub fn mint_token(
        &mut self,
        policy: PolicyId,
        name: AssetName,
        amount: i64,
        redeemer: Option<PlutusData>,
    ) -> &mut Self {
        if !self.fresh() {
            return self;
        }
        self.tx.body.mint.add(policy, name, amount);
        if let Some(data) = redeemer {
            let staged = Redeemer::new(RedeemerTag::Mint, data);
            match self.staged_redeemers.mint.insert(policy, staged) {
                Ok(()) | Err(TxBuildError::DuplicatedKey) => {}
                Err(e) => {
                    self.fail(e, "Failed to stage mint redeemer.");
                }
            }
        }
        self
    }

    /// Requires a signature from the given key hash.
    pub fn add_signer(&mut self, pub_key_hash: Hash28) -> &mut Self {
        if self.fresh() {
            self.tx.body.required_signers.insert(pub_key_hash);
        }
        self
    }

    /// Stages a datum in the witness set without tying it to an input.
    pub fn add_datum(&mut self, datum: PlutusData) -> &mut Self {
        if self.fresh() {
            self.tx.witness_set.add_plutus_data(datum);
        }
        self
    }

    /// Attaches a script witness and flags its language.
    pub fn add_script(&mut self, script: Script) -> &mut Self {
        if !self.fresh() {
            return self;
        }
        match script.kind {
            ScriptKind::Native => self.tx.witness_set.native_scripts.push(script.bytes),
            ScriptKind::PlutusV1 => {
                self.plutus_languages.insert(script.kind);
                self.tx.witness_set.plutus_v1_scripts.push(script.bytes);
            }
            ScriptKind::PlutusV2 => {
                self.plutus_languages.insert(script.kind);
                self.tx.witness_set.plutus_v2_scripts.push(script.bytes);
            }
            ScriptKind::PlutusV3 => {
                self.plutus_languages.insert(script.kind);
                self.tx.witness_set.plutus_v3_scripts.push(script.bytes);
            }
        }
        self
    }

    /// Withdraws rewards from an account. Script-credentialed accounts
    /// take a redeemer, staged in the reward redeemer map.
    pub fn withdraw_rewards(
        &mut self,
        account: RewardAccount,
        amount: u64,
        redeemer: Option<PlutusData>,
    ) -> &mut Self {
        if !self.fresh() {
            return self;
        }
        if account.credential_is_script() && redeemer.is_none() {
            self.fail(
                TxBuildError::RedeemerRequired,
                "Withdrawals from script reward accounts require a redeemer.",
            );
            return self;
        }
        if let Some(data) = redeemer {
            let staged = Redeemer::new(RedeemerTag::Reward, data);
            if let Err(e) = self
                .staged_redeemers
                .reward
                .insert(account.credential_hash(), staged)
            {
                self.fail(e, "A redeemer is already staged for this reward account.");
                return self;
            }
        }
        self.tx.body.withdrawals.insert(account, amount);
        self
    }

    /// Registers a reward account, locking the key deposit.
    pub fn register_reward_address(
        &mut self,
        account: &RewardAccount,
        redeemer: Option<PlutusData>,
    ) -> &mut Self {
        let deposit = self.params.key_deposit;
        let credential = credential_of(account);
        self.add_certificate(Certificate::Reg { credential, deposit }, redeemer)
    }

    /// Deregisters a reward account, reclaiming the key deposit.
    pub fn deregister_reward_address(
        &mut self,
        account: &RewardAccount,
        redeemer: Option<PlutusData>,
    ) -> &mut Self {
        let deposit = self.params.key_deposit;
        let credential = credential_of(account);
        self.add_certificate(Certificate::UnReg { credential, deposit }, redeemer)
    }

    /// Delegates an account's stake to a pool.
    pub fn delegate_stake(
        &mut self,
        account: &RewardAccount,
        pool: Hash28,
        redeemer: Option<PlutusData>,
    ) -> &mut Self {
        let credential = credential_of(account);
        self.add_certificate(Certificate::StakeDelegation { credential, pool }, redeemer)
    }

    /// Delegates an account's voting power to a DRep.
    pub fn delegate_voting_power(
        &mut self,
        account: &RewardAccount,
        drep: DRep,
        redeemer: Option<PlutusData>,
    ) -> &mut Self {
        let credential = credential_of(account);
        self.add_certificate(Certificate::VoteDeleg { credential, drep }, redeemer)
    }

    /// Registers a DRep, locking the DRep deposit.
    pub fn register_drep(
        &mut self,
        credential: Credential,
        anchor: Option<Anchor>,
        redeemer: Option<PlutusData>,
    ) -> &mut Self {
        let deposit = self.params.drep_deposit;
        self.add_certificate(Certificate::RegDrep { credential, deposit, anchor }, redeemer)
    }

    /// Deregisters a DRep, reclaiming its deposit.
    pub fn deregister_drep(
        &mut self,
        credential: Credential,
        redeemer: Option<PlutusData>,
    ) -> &mut Self {
        let deposit = self.params.drep_deposit;
        self.add_certificate(Certificate::UnregDrep { credential, deposit }, redeemer)
    }

    /// Updates a DRep's anchor.
    pub fn update_drep(
        &mut self,
        credential: Credential,
        anchor: Option<Anchor>,
        redeemer: Option<PlutusData>,
    ) -> &mut Self {
        self.add_certificate(Certificate::UpdateDrep { credential, anchor }, redeemer)
    }

    /// Appends a certificate; a redeemer witnesses its script credential.
    pub fn add_certificate(
        &mut self,
        certificate: Certificate,
        redeemer: Option<PlutusData>,
    ) -> &mut Self {
        if !self.fresh() {
            return self;
        }
        if let Err(e) = check_certificate(&certificate) {
            self.fail(e, "Certificate is malformed.");
            return self;
        }
        if let Some(data) = redeemer {
            let Some(script_hash) = certificate.script_hash() else {
                self.fail(
                    TxBuildError::RedeemerRequired,
                    "Certificate redeemers require a script credential.",
                );
                return self;
            };
            let already_staged = self
                .staged_redeemers
                .cert
                .iter()
                .any(|(hash, _)| *hash == script_hash);
            if !already_staged {
                self.staged_redeemers
                    .cert
                    .push((script_hash, Redeemer::new(RedeemerTag::Cert, data)));
            }
        }
        self.tx.body.certificates.push(certificate);
        self
    }

    /// Casts a governance vote. Script-credentialed voters take a
    /// redeemer.
    pub fn vote(
        &mut self,
        voter: Voter,
        action: GovActionId,
        procedure: VotingProcedure,
        redeemer: Option<PlutusData>,
    ) -> &mut Self {
        if !self.fresh() {
            return self;
        }
        if voter.is_script() && redeemer.is_none() {
            self.fail(
                TxBuildError::RedeemerRequired,
                "Votes by script credentials require a redeemer.",
            );
            return self;
        }
        if let Some(data) = redeemer {
            let already_staged = self
                .staged_redeemers
                .vote
                .iter()
                .any(|(staged, _)| *staged == voter);
            if !already_staged {
                self.staged_redeemers
                    .vote
                    .push((voter, Redeemer::new(RedeemerTag::Vote, data)));
            }
        }
        self.tx.body.voting_procedures.insert(voter, action, procedure);
        self
    }

    /// Submits a governance proposal, locking the action deposit.
    pub fn propose(
        &mut self,
        action: GovAction,
        deposit_return: RewardAccount,
        anchor: Anchor,
    ) -> &mut Self {
        if !self.fresh() {
            return self;
        }
        let proposal = crate::primitives::ProposalProcedure {
            deposit: self.params.gov_action_deposit,
            reward_account: deposit_return,
            action,
            anchor,
        };
        self.tx.body.proposal_procedures.push(proposal);
        self
    }

    // --- build -------------------------------------------------------------

    /// Balances and finalizes the transaction. Terminal: a second call
    /// returns [`TxBuildError::IllegalState`], and after any recorded
    /// failure the stored error is returned verbatim.
    pub fn build(&mut self) -> Result<Transaction, TxBuildError> {
        match &self.state {
            BuilderState::Built => {
                self.last_error_message = "Build can only be called once.".into();
                return Err(TxBuildError::IllegalState);
            }
            BuilderState::Failed(e) => return Err(e.clone()),
            BuilderState::Fresh => {}
        }

        match self.try_build() {
            Ok(tx) => {
                self.state = BuilderState::Built;
                Ok(tx)
            }
            Err(e) => {
                if self.fresh() {
                    self.fail(e.clone(), &e.to_string());
                }
                Err(e)
            }
        }
    }

    fn try_build(&mut self) -> Result<Transaction, TxBuildError> {
        let change_address = self
            .change_address
            .clone()
            .ok_or(TxBuildError::MissingChangeAddress)?;
        let available = self
            .available_utxos
            .clone()
            .ok_or(TxBuildError::MissingUtxos)?;

        // Witness redeemers materialize before the Plutus checks so that
        // spend/mint/reward staging counts.
        self.tx.witness_set.redeemers = self.staged_redeemers.to_redeemers();
        let has_script_data = self.tx.has_plutus_witnesses();
        let needs_collateral = self.tx.witness_set.has_plutus_scripts();

        let collateral_utxos = if needs_collateral {
            if self.collateral_address.is_none() {
                return Err(TxBuildError::MissingCollateralAddress);
            }
            self.collateral_utxos
                .clone()
                .ok_or(TxBuildError::MissingCollateralUtxos)?
        } else {
            self.collateral_utxos.clone().unwrap_or_default()
        };

        // A zeroed hash keeps the size estimate honest until the real one
        // is computed after balancing.
        if has_script_data {
            self.tx.body.script_data_hash = Some(Hash32::new([0u8; 32]));
        }

        let mut tx = self.tx.clone();
        let mut staged = self.staged_redeemers.clone();
        let ctx = BalanceContext {
            params: &self.params,
            additional_signers: self.additional_signers,
            minimum_fee: self.minimum_fee,
            reference_utxos: &self.reference_utxos,
            pre_selected: &self.pre_selected,
            available: &available,
            selector: self.coin_selector.as_ref(),
            change_address: &change_address,
            collateral_utxos: &collateral_utxos,
            collateral_address: self.collateral_address.as_ref(),
            evaluator: self.evaluator.as_ref(),
        };
        balance_transaction(&mut tx, &mut staged, &ctx)?;

        if has_script_data {
            let views = encode_language_views(&self.params.cost_models, &self.plutus_languages);
            let hash = script_data_hash(
                &tx.witness_set.redeemers,
                &tx.witness_set.plutus_data,
                &views,
            );
            tx.body.script_data_hash = Some(hash);
        }

        debug!(
            tx_id = %tx.id(),
            fee = tx.body.fee,
            inputs = tx.body.inputs.len(),
            outputs = tx.body.outputs.len(),
            "transaction built"
        );

        self.tx = tx.clone();
        self.staged_redeemers = staged;
        Ok(tx)
    }
}

fn credential_of(account: &RewardAccount) -> Credential {
    if account.credential_is_script() {
        Credential::Script(account.credential_hash())
    } else {
        Credential::Key(account.credential_hash())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{NetworkMagic, RedeemerEval};

    struct NullProvider;

    impl Provider for NullProvider {
        fn network_magic(&self) -> NetworkMagic {
            NetworkMagic::Preview
        }
        fn get_parameters(&self) -> Result<ProtocolParams, TxBuildError> {
            Ok(ProtocolParams::mainnet())
        }
        fn get_unspent_outputs(&self, _address: &Address) -> Result<Vec<Utxo>, TxBuildError> {
            Ok(Vec::new())
        }
        fn resolve_unspent_outputs(
            &self,
            _inputs: &[crate::primitives::Input],
        ) -> Result<Vec<Utxo>, TxBuildError> {
            Ok(Vec::new())
        }
        fn evaluate_transaction(
            &self,
            _tx: &Transaction,
            _resolved: &[Utxo],
        ) -> Result<Vec<RedeemerEval>, TxBuildError> {
            Ok(Vec::new())
        }
        fn get_rewards_balance(&self, _account: &RewardAccount) -> Result<u64, TxBuildError> {
            Ok(0)
        }
    }

    fn builder() -> TxBuilder {
        TxBuilder::new(ProtocolParams::mainnet(), Rc::new(NullProvider))
    }

    fn address(byte: u8) -> Address {
        Address::enterprise_key(NetworkId::Testnet, crate::primitives::Hash::new([byte; 28]))
    }

    #[test]
    fn build_without_change_address_fails() {
        let mut b = builder();
        b.set_utxos(Vec::new());
        assert_eq!(b.build(), Err(TxBuildError::MissingChangeAddress));
    }

    #[test]
    fn build_without_utxos_fails() {
        let mut b = builder();
        b.set_change_address(address(1));
        assert_eq!(b.build(), Err(TxBuildError::MissingUtxos));
        assert!(!b.last_error_message().is_empty());
    }

    #[test]
    fn errors_are_sticky_and_mutators_go_inert() {
        let mut b = builder();
        let script_input = Utxo::new(
            crate::primitives::Input::new(crate::primitives::Hash::new([1u8; 32]), 0),
            TransactionOutput::new(
                Address::enterprise_script(
                    NetworkId::Testnet,
                    crate::primitives::Hash::new([2u8; 28]),
                ),
                Value::coin(1_000_000),
            ),
        );
        // script input without redeemer records the first error
        b.add_input(script_input, None, None);
        // subsequent mutators are no-ops
        b.send_lovelace(&address(1), 5_000_000);
        assert!(b.staged_transaction().body.outputs.is_empty());
        assert_eq!(b.build(), Err(TxBuildError::RedeemerRequired));
        // and build keeps returning the recorded error
        assert_eq!(b.build(), Err(TxBuildError::RedeemerRequired));
    }

    #[test]
    fn script_voter_requires_redeemer() {
        let mut b = builder();
        b.vote(
            Voter::DRepScript(crate::primitives::Hash::new([1u8; 28])),
            GovActionId { tx_id: crate::primitives::Hash::new([2u8; 32]), index: 0 },
            VotingProcedure { vote: crate::primitives::Vote::Yes, anchor: None },
            None,
        );
        assert_eq!(b.build(), Err(TxBuildError::RedeemerRequired));
    }

    #[test]
    fn metadata_updates_aux_hash() {
        let mut b = builder();
        b.set_metadata(674, Metadatum::Text("hello".into()));
        let aux = b.staged_transaction().auxiliary_data.clone().unwrap();
        assert_eq!(
            b.staged_transaction().body.auxiliary_data_hash,
            Some(aux.hash())
        );
    }

    #[test]
    fn mint_merges_and_keeps_first_redeemer() {
        let mut b = builder();
        let policy = crate::primitives::Hash::new([7u8; 28]);
        let name = AssetName::from_str_utf8("TK").unwrap();
        b.mint_token(policy, name.clone(), 40, Some(PlutusData::int(1)));
        b.mint_token(policy, name.clone(), 2, Some(PlutusData::int(2)));
        assert_eq!(b.staged_transaction().body.mint.get(&policy, &name), 42);
        assert_eq!(b.staged_redeemers.mint.len(), 1);
        assert_eq!(
            b.staged_redeemers.mint.get(&policy).unwrap().data,
            PlutusData::int(1)
        );
    }

    #[test]
    fn reward_address_registration_records_deposit() {
        let mut b = builder();
        let account = RewardAccount::from_key_hash(
            NetworkId::Testnet,
            crate::primitives::Hash::new([1u8; 28]),
        );
        b.register_reward_address(&account, None);
        let cert = &b.staged_transaction().body.certificates[0];
        assert_eq!(
            *cert,
            Certificate::Reg {
                credential: Credential::Key(crate::primitives::Hash::new([1u8; 28])),
                deposit: ProtocolParams::mainnet().key_deposit,
            }
        );
    }
}
