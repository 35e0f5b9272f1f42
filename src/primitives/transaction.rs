use std::collections::{BTreeMap, BTreeSet};

use minicbor::data::Type;

use crate::cbor;
use crate::error::TxBuildError;
use crate::primitives::address::RewardAccount;
use crate::primitives::certificate::Certificate;
use crate::primitives::governance::{ProposalProcedure, VotingProcedures};
use crate::primitives::hash::{Hash28, Hash32, TxHash};
use crate::primitives::input::Input;
use crate::primitives::metadata::AuxiliaryData;
use crate::primitives::output::TransactionOutput;
use crate::primitives::value::{Assets, AssetsDelta, Value};
use crate::primitives::witness::WitnessSet;

/// An unspent transaction output: the reference and the output it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    pub input: Input,
    pub output: TransactionOutput,
}

impl Utxo {
    pub fn new(input: Input, output: TransactionOutput) -> Self {
        Self { input, output }
    }
}

/// The transaction body: an integer-keyed map with keys emitted in
/// ascending order and only present fields encoded.
///
/// Input-flavoured sets are `BTreeSet`s, so iteration is already the
/// canonical (tx id, index) order; withdrawals likewise iterate in
/// reward-account byte order. Output and certificate order is positional
/// and preserved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransactionBody {
    pub inputs: BTreeSet<Input>,
    pub outputs: Vec<TransactionOutput>,
    pub fee: u64,
    pub ttl: Option<u64>,
    pub certificates: Vec<Certificate>,
    pub withdrawals: BTreeMap<RewardAccount, u64>,
    pub auxiliary_data_hash: Option<Hash32>,
    pub validity_start: Option<u64>,
    pub mint: AssetsDelta,
    pub script_data_hash: Option<Hash32>,
    pub collateral_inputs: BTreeSet<Input>,
    pub required_signers: BTreeSet<Hash28>,
    pub network_id: Option<u8>,
    pub collateral_return: Option<TransactionOutput>,
    pub total_collateral: Option<u64>,
    pub reference_inputs: BTreeSet<Input>,
    pub voting_procedures: VotingProcedures,
    pub proposal_procedures: Vec<ProposalProcedure>,
    pub current_treasury: Option<u64>,
    pub donation: Option<u64>,
}

impl TransactionBody {
    /// The transaction id: BLAKE2b-256 of the canonical body encoding.
    pub fn hash(&self) -> TxHash {
        Hash32::digest(&minicbor::to_vec(self).expect("vec write"))
    }

    /// Position of an input in the canonically sorted input set.
    pub fn input_position(&self, input: &Input) -> Option<usize> {
        self.inputs.iter().position(|i| i == input)
    }

    /// Sum of all output values (excluding the collateral return).
    pub fn total_output_value(&self) -> Value {
        let mut total = Value::coin(0);
        for output in &self.outputs {
            total = total
                .checked_add(&output.value)
                .unwrap_or_else(|| Value::coin(u64::MAX));
        }
        total
    }

    /// Sum of all withdrawal amounts.
    pub fn total_withdrawals(&self) -> u64 {
        self.withdrawals.values().sum()
    }

    fn count_fields(&self) -> u64 {
        let mut n = 3; // inputs, outputs, fee
        n += u64::from(self.ttl.is_some());
        n += u64::from(!self.certificates.is_empty());
        n += u64::from(!self.withdrawals.is_empty());
        n += u64::from(self.auxiliary_data_hash.is_some());
        n += u64::from(self.validity_start.is_some());
        n += u64::from(!self.mint.is_empty());
        n += u64::from(self.script_data_hash.is_some());
        n += u64::from(!self.collateral_inputs.is_empty());
        n += u64::from(!self.required_signers.is_empty());
        n += u64::from(self.network_id.is_some());
        n += u64::from(self.collateral_return.is_some());
        n += u64::from(self.total_collateral.is_some());
        n += u64::from(!self.reference_inputs.is_empty());
        n += u64::from(!self.voting_procedures.is_empty());
        n += u64::from(!self.proposal_procedures.is_empty());
        n += u64::from(self.current_treasury.is_some());
        n += u64::from(self.donation.is_some());
        n
    }
}

impl<C> minicbor::encode::Encode<C> for TransactionBody {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.map(self.count_fields())?;

        e.u8(0)?;
        cbor::encode_set_header(e, self.inputs.len() as u64)?;
        for input in &self.inputs {
            input.encode(e, ctx)?;
        }

        e.u8(1)?;
        e.array(self.outputs.len() as u64)?;
        for output in &self.outputs {
            output.encode(e, ctx)?;
        }

        e.u8(2)?;
        e.u64(self.fee)?;

        if let Some(ttl) = self.ttl {
            e.u8(3)?;
            e.u64(ttl)?;
        }
        if !self.certificates.is_empty() {
            e.u8(4)?;
            cbor::encode_set_header(e, self.certificates.len() as u64)?;
            for cert in &self.certificates {
                cert.encode(e, ctx)?;
            }
        }
        if !self.withdrawals.is_empty() {
            e.u8(5)?;
            e.map(self.withdrawals.len() as u64)?;
            for (account, amount) in &self.withdrawals {
                account.encode(e, ctx)?;
                e.u64(*amount)?;
            }
        }
        if let Some(hash) = &self.auxiliary_data_hash {
            e.u8(7)?;
            hash.encode(e, ctx)?;
        }
        if let Some(start) = self.validity_start {
            e.u8(8)?;
            e.u64(start)?;
        }
        if !self.mint.is_empty() {
            e.u8(9)?;
            self.mint.encode(e, ctx)?;
        }
        if let Some(hash) = &self.script_data_hash {
            e.u8(11)?;
            hash.encode(e, ctx)?;
        }
        if !self.collateral_inputs.is_empty() {
            e.u8(13)?;
            cbor::encode_set_header(e, self.collateral_inputs.len() as u64)?;
            for input in &self.collateral_inputs {
                input.encode(e, ctx)?;
            }
        }
        if !self.required_signers.is_empty() {
            e.u8(14)?;
            cbor::encode_set_header(e, self.required_signers.len() as u64)?;
            for signer in &self.required_signers {
                signer.encode(e, ctx)?;
            }
        }
        if let Some(network_id) = self.network_id {
            e.u8(15)?;
            e.u8(network_id)?;
        }
        if let Some(output) = &self.collateral_return {
            e.u8(16)?;
            output.encode(e, ctx)?;
        }
        if let Some(total) = self.total_collateral {
            e.u8(17)?;
            e.u64(total)?;
        }
        if !self.reference_inputs.is_empty() {
            e.u8(18)?;
            cbor::encode_set_header(e, self.reference_inputs.len() as u64)?;
            for input in &self.reference_inputs {
                input.encode(e, ctx)?;
            }
        }
        if !self.voting_procedures.is_empty() {
            e.u8(19)?;
            self.voting_procedures.encode(e, ctx)?;
        }
        if !self.proposal_procedures.is_empty() {
            e.u8(20)?;
            cbor::encode_set_header(e, self.proposal_procedures.len() as u64)?;
            for proposal in &self.proposal_procedures {
                proposal.encode(e, ctx)?;
            }
        }
        if let Some(treasury) = self.current_treasury {
            e.u8(21)?;
            e.u64(treasury)?;
        }
        if let Some(donation) = self.donation {
            e.u8(22)?;
            e.u64(donation)?;
        }
        Ok(())
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for TransactionBody {
    fn decode(
        d: &mut minicbor::decode::Decoder<'b>,
        ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        let mut body = TransactionBody::default();
        let fields = d
            .map()?
            .ok_or_else(|| minicbor::decode::Error::message("indefinite body"))?;
        for _ in 0..fields {
            match d.u8()? {
                0 => {
                    let len = cbor::decode_set_header(d)?;
                    for _ in 0..len {
                        body.inputs.insert(Input::decode(d, ctx)?);
                    }
                }
                1 => {
                    let len = d
                        .array()?
                        .ok_or_else(|| minicbor::decode::Error::message("indefinite outputs"))?;
                    for _ in 0..len {
                        body.outputs.push(TransactionOutput::decode(d, ctx)?);
                    }
                }
                2 => body.fee = d.u64()?,
                3 => body.ttl = Some(d.u64()?),
                4 => {
                    let len = cbor::decode_set_header(d)?;
                    for _ in 0..len {
                        body.certificates.push(Certificate::decode(d, ctx)?);
                    }
                }
                5 => {
                    let len = d
                        .map()?
                        .ok_or_else(|| minicbor::decode::Error::message("indefinite withdrawals"))?;
                    for _ in 0..len {
                        let account = RewardAccount::decode(d, ctx)?;
                        let amount = d.u64()?;
                        body.withdrawals.insert(account, amount);
                    }
                }
                7 => body.auxiliary_data_hash = Some(Hash32::decode(d, ctx)?),
                8 => body.validity_start = Some(d.u64()?),
                9 => body.mint = AssetsDelta::decode(d, ctx)?,
                11 => body.script_data_hash = Some(Hash32::decode(d, ctx)?),
                13 => {
                    let len = cbor::decode_set_header(d)?;
                    for _ in 0..len {
                        body.collateral_inputs.insert(Input::decode(d, ctx)?);
                    }
                }
                14 => {
                    let len = cbor::decode_set_header(d)?;
                    for _ in 0..len {
                        body.required_signers.insert(Hash28::decode(d, ctx)?);
                    }
                }
                15 => body.network_id = Some(d.u8()?),
                16 => body.collateral_return = Some(TransactionOutput::decode(d, ctx)?),
                17 => body.total_collateral = Some(d.u64()?),
                18 => {
                    let len = cbor::decode_set_header(d)?;
                    for _ in 0..len {
                        body.reference_inputs.insert(Input::decode(d, ctx)?);
                    }
                }
                19 => body.voting_procedures = VotingProcedures::decode(d, ctx)?,
                20 => {
                    let len = cbor::decode_set_header(d)?;
                    for _ in 0..len {
                        body.proposal_procedures.push(ProposalProcedure::decode(d, ctx)?);
                    }
                }
                21 => body.current_treasury = Some(d.u64()?),
                22 => body.donation = Some(d.u64()?),
                _ => return Err(minicbor::decode::Error::message("unknown body field")),
            }
        }
        Ok(body)
    }
}

/// A complete transaction: `[body, witness_set, is_valid, auxiliary_data?]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub body: TransactionBody,
    pub witness_set: WitnessSet,
    pub is_valid: bool,
    pub auxiliary_data: Option<AuxiliaryData>,
}

impl Default for Transaction {
    fn default() -> Self {
        Self {
            body: TransactionBody::default(),
            witness_set: WitnessSet::default(),
            is_valid: true,
            auxiliary_data: None,
        }
    }
}

impl Transaction {
    pub fn id(&self) -> TxHash {
        self.body.hash()
    }

    pub fn to_cbor(&self) -> Vec<u8> {
        minicbor::to_vec(self).expect("vec write")
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, TxBuildError> {
        Ok(minicbor::decode(bytes)?)
    }

    /// Serialized size in bytes, the quantity the size fee prices.
    pub fn size(&self) -> usize {
        self.to_cbor().len()
    }

    /// True when the witness set carries anything Plutus-flavoured, which
    /// obligates collateral and a script-data hash.
    pub fn has_plutus_witnesses(&self) -> bool {
        self.witness_set.has_plutus()
    }

    /// Reference-script bytes counted by the min-fee reference script term.
    pub fn reference_script_bytes(&self, resolved_reference_inputs: &[Utxo]) -> u64 {
        resolved_reference_inputs
            .iter()
            .filter_map(|utxo| utxo.output.script_ref.as_ref())
            .map(|script| script.len() as u64)
            .sum()
    }

    /// Sum of resolved input values plus minted assets; the left side of
    /// the balance equation.
    pub fn consumed_value(&self, resolved_inputs: &[Utxo]) -> Value {
        let mut total = Value::coin(0);
        for utxo in resolved_inputs {
            total = total
                .checked_add(&utxo.output.value)
                .unwrap_or_else(|| Value::coin(u64::MAX));
        }
        total = total
            .checked_add(&Value::with_assets(0, self.body.mint.minted()))
            .unwrap_or_else(|| Value::coin(u64::MAX));
        total
    }

    /// Sum of outputs plus burned assets; the right side of the balance
    /// equation, fee excluded.
    pub fn produced_value(&self) -> Value {
        let mut total = self.body.total_output_value();
        total = total
            .checked_add(&Value::with_assets(0, self.body.mint.burned()))
            .unwrap_or_else(|| Value::coin(u64::MAX));
        total
    }
}

impl<C> minicbor::encode::Encode<C> for Transaction {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(4)?;
        self.body.encode(e, ctx)?;
        self.witness_set.encode(e, ctx)?;
        e.bool(self.is_valid)?;
        match &self.auxiliary_data {
            Some(aux) => aux.encode(e, ctx)?,
            None => {
                e.null()?;
            }
        }
        Ok(())
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for Transaction {
    fn decode(
        d: &mut minicbor::decode::Decoder<'b>,
        ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        let len = d.array()?;
        if len != Some(4) {
            return Err(minicbor::decode::Error::message("transaction is a 4-tuple"));
        }
        let body = TransactionBody::decode(d, ctx)?;
        let witness_set = WitnessSet::decode(d, ctx)?;
        let is_valid = d.bool()?;
        let auxiliary_data = if d.datatype()? == Type::Null {
            d.null()?;
            None
        } else {
            Some(AuxiliaryData::decode(d, ctx)?)
        };
        Ok(Transaction { body, witness_set, is_valid, auxiliary_data })
    }
}

/// Sums the values of a UTxO slice.
pub fn total_utxo_value(utxos: &[Utxo]) -> Value {
    let mut total = Value::coin(0);
    for utxo in utxos {
        total = total
            .checked_add(&utxo.output.value)
            .unwrap_or_else(|| Value::with_assets(u64::MAX, Assets::new()));
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::address::{Address, NetworkId};
    use crate::primitives::hash::Hash;
    use crate::primitives::value::Value;

    fn address() -> Address {
        Address::enterprise_key(NetworkId::Testnet, Hash::new([1u8; 28]))
    }

    fn simple_tx() -> Transaction {
        let mut tx = Transaction::default();
        tx.body.inputs.insert(Input::new(Hash::new([5u8; 32]), 0));
        tx.body
            .outputs
            .push(TransactionOutput::new(address(), Value::coin(5_000_000)));
        tx.body.fee = 170_000;
        tx
    }

    #[test]
    fn round_trip_simple() {
        let tx = simple_tx();
        let bytes = tx.to_cbor();
        let back = Transaction::from_cbor(&bytes).unwrap();
        assert_eq!(tx, back);
    }

    #[test]
    fn body_keys_ascend() {
        let mut tx = simple_tx();
        tx.body.ttl = Some(100);
        tx.body.network_id = Some(0);
        let bytes = minicbor::to_vec(&tx.body).unwrap();
        let mut d = minicbor::Decoder::new(&bytes);
        let fields = d.map().unwrap().unwrap();
        let mut keys = Vec::new();
        for _ in 0..fields {
            keys.push(d.u8().unwrap());
            d.skip().unwrap();
        }
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn inputs_iterate_in_canonical_order() {
        let mut tx = Transaction::default();
        tx.body.inputs.insert(Input::new(Hash::new([9u8; 32]), 0));
        tx.body.inputs.insert(Input::new(Hash::new([1u8; 32]), 7));
        tx.body.inputs.insert(Input::new(Hash::new([1u8; 32]), 2));
        let ordered: Vec<Input> = tx.body.inputs.iter().copied().collect();
        assert_eq!(ordered[0], Input::new(Hash::new([1u8; 32]), 2));
        assert_eq!(ordered[1], Input::new(Hash::new([1u8; 32]), 7));
        assert_eq!(ordered[2], Input::new(Hash::new([9u8; 32]), 0));
    }

    #[test]
    fn tx_id_depends_only_on_body() {
        let tx_a = simple_tx();
        let mut tx_b = simple_tx();
        tx_b.witness_set.vkey_witnesses.push(crate::primitives::witness::VKeyWitness::placeholder());
        assert_eq!(tx_a.id(), tx_b.id());
    }

    #[test]
    fn mutator_order_does_not_change_encoding() {
        let mut tx_a = Transaction::default();
        tx_a.body.inputs.insert(Input::new(Hash::new([2u8; 32]), 0));
        tx_a.body.inputs.insert(Input::new(Hash::new([1u8; 32]), 0));
        let mut tx_b = Transaction::default();
        tx_b.body.inputs.insert(Input::new(Hash::new([1u8; 32]), 0));
        tx_b.body.inputs.insert(Input::new(Hash::new([2u8; 32]), 0));
        assert_eq!(tx_a.to_cbor(), tx_b.to_cbor());
    }
}
