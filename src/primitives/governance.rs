use std::collections::BTreeMap;


use crate::primitives::address::RewardAccount;
use crate::primitives::certificate::Anchor;
use crate::primitives::hash::{Hash28, TxHash};

/// Who casts a governance vote. The derived ordering (wire tag, then hash)
/// is the canonical key order of the voting-procedures map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Voter {
    ConstitutionalCommitteeKey(Hash28),
    ConstitutionalCommitteeScript(Hash28),
    DRepKey(Hash28),
    DRepScript(Hash28),
    StakePool(Hash28),
}

impl Voter {
    fn tag(&self) -> u8 {
        match self {
            Voter::ConstitutionalCommitteeKey(_) => 0,
            Voter::ConstitutionalCommitteeScript(_) => 1,
            Voter::DRepKey(_) => 2,
            Voter::DRepScript(_) => 3,
            Voter::StakePool(_) => 4,
        }
    }

    pub fn credential_hash(&self) -> Hash28 {
        match self {
            Voter::ConstitutionalCommitteeKey(h)
            | Voter::ConstitutionalCommitteeScript(h)
            | Voter::DRepKey(h)
            | Voter::DRepScript(h)
            | Voter::StakePool(h) => *h,
        }
    }

    pub fn is_script(&self) -> bool {
        matches!(
            self,
            Voter::ConstitutionalCommitteeScript(_) | Voter::DRepScript(_)
        )
    }
}

impl<C> minicbor::encode::Encode<C> for Voter {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(2)?;
        e.u8(self.tag())?;
        self.credential_hash().encode(e, ctx)?;
        Ok(())
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for Voter {
    fn decode(
        d: &mut minicbor::decode::Decoder<'b>,
        ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        let len = d.array()?;
        if len != Some(2) {
            return Err(minicbor::decode::Error::message("voter is [tag, hash]"));
        }
        let tag = d.u8()?;
        let hash = Hash28::decode(d, ctx)?;
        match tag {
            0 => Ok(Voter::ConstitutionalCommitteeKey(hash)),
            1 => Ok(Voter::ConstitutionalCommitteeScript(hash)),
            2 => Ok(Voter::DRepKey(hash)),
            3 => Ok(Voter::DRepScript(hash)),
            4 => Ok(Voter::StakePool(hash)),
            _ => Err(minicbor::decode::Error::message("unknown voter tag")),
        }
    }
}

/// Identifies the governance action a vote refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GovActionId {
    pub tx_id: TxHash,
    pub index: u16,
}

impl<C> minicbor::encode::Encode<C> for GovActionId {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(2)?;
        self.tx_id.encode(e, ctx)?;
        e.u16(self.index)?;
        Ok(())
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for GovActionId {
    fn decode(
        d: &mut minicbor::decode::Decoder<'b>,
        ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        let len = d.array()?;
        if len != Some(2) {
            return Err(minicbor::decode::Error::message("action id is [tx, index]"));
        }
        Ok(GovActionId { tx_id: TxHash::decode(d, ctx)?, index: d.u16()? })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    No,
    Yes,
    Abstain,
}

/// One vote plus its optional rationale anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VotingProcedure {
    pub vote: Vote,
    pub anchor: Option<Anchor>,
}

impl<C> minicbor::encode::Encode<C> for VotingProcedure {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(2)?;
        e.u8(match self.vote {
            Vote::No => 0,
            Vote::Yes => 1,
            Vote::Abstain => 2,
        })?;
        match &self.anchor {
            Some(a) => a.encode(e, ctx)?,
            None => {
                e.null()?;
            }
        }
        Ok(())
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for VotingProcedure {
    fn decode(
        d: &mut minicbor::decode::Decoder<'b>,
        ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        let len = d.array()?;
        if len != Some(2) {
            return Err(minicbor::decode::Error::message("voting procedure is [vote, anchor]"));
        }
        let vote = match d.u8()? {
            0 => Vote::No,
            1 => Vote::Yes,
            2 => Vote::Abstain,
            _ => return Err(minicbor::decode::Error::message("unknown vote")),
        };
        let anchor = if d.datatype()? == minicbor::data::Type::Null {
            d.null()?;
            None
        } else {
            Some(Anchor::decode(d, ctx)?)
        };
        Ok(VotingProcedure { vote, anchor })
    }
}

/// voter → (governance action id → vote), both levels canonically ordered.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VotingProcedures(pub BTreeMap<Voter, BTreeMap<GovActionId, VotingProcedure>>);

impl VotingProcedures {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(&mut self, voter: Voter, action: GovActionId, procedure: VotingProcedure) {
        self.0.entry(voter).or_default().insert(action, procedure);
    }

    /// Voters in canonical order; a vote redeemer's index is its voter's
    /// position in this sequence.
    pub fn voters(&self) -> impl Iterator<Item = &Voter> {
        self.0.keys()
    }
}

impl<C> minicbor::encode::Encode<C> for VotingProcedures {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.map(self.0.len() as u64)?;
        for (voter, votes) in &self.0 {
            voter.encode(e, ctx)?;
            e.map(votes.len() as u64)?;
            for (action, procedure) in votes {
                action.encode(e, ctx)?;
                procedure.encode(e, ctx)?;
            }
        }
        Ok(())
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for VotingProcedures {
    fn decode(
        d: &mut minicbor::decode::Decoder<'b>,
        ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        let mut out = VotingProcedures::default();
        let outer = d
            .map()?
            .ok_or_else(|| minicbor::decode::Error::message("indefinite voting procedures"))?;
        for _ in 0..outer {
            let voter = Voter::decode(d, ctx)?;
            let inner = d
                .map()?
                .ok_or_else(|| minicbor::decode::Error::message("indefinite voting procedures"))?;
            for _ in 0..inner {
                let action = GovActionId::decode(d, ctx)?;
                let procedure = VotingProcedure::decode(d, ctx)?;
                out.insert(voter, action, procedure);
            }
        }
        Ok(out)
    }
}

/// Governance actions this builder can propose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GovAction {
    /// Withdraw from the treasury into reward accounts, optionally guarded
    /// by a constitution script.
    TreasuryWithdrawals {
        withdrawals: BTreeMap<RewardAccount, u64>,
        policy: Option<Hash28>,
    },
    Info,
}

impl<C> minicbor::encode::Encode<C> for GovAction {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            GovAction::TreasuryWithdrawals { withdrawals, policy } => {
                e.array(3)?;
                e.u8(2)?;
                e.map(withdrawals.len() as u64)?;
                for (account, coin) in withdrawals {
                    account.encode(e, ctx)?;
                    e.u64(*coin)?;
                }
                match policy {
                    Some(h) => h.encode(e, ctx)?,
                    None => {
                        e.null()?;
                    }
                }
            }
            GovAction::Info => {
                e.array(1)?;
                e.u8(6)?;
            }
        }
        Ok(())
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for GovAction {
    fn decode(
        d: &mut minicbor::decode::Decoder<'b>,
        ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        let _len = d.array()?;
        match d.u8()? {
            2 => {
                let mut withdrawals = BTreeMap::new();
                let len = d
                    .map()?
                    .ok_or_else(|| minicbor::decode::Error::message("indefinite withdrawals"))?;
                for _ in 0..len {
                    let account = RewardAccount::decode(d, ctx)?;
                    let coin = d.u64()?;
                    withdrawals.insert(account, coin);
                }
                let policy = if d.datatype()? == minicbor::data::Type::Null {
                    d.null()?;
                    None
                } else {
                    Some(Hash28::decode(d, ctx)?)
                };
                Ok(GovAction::TreasuryWithdrawals { withdrawals, policy })
            }
            6 => Ok(GovAction::Info),
            _ => Err(minicbor::decode::Error::message("unsupported governance action")),
        }
    }
}

/// A proposal: deposit, return account, the action itself, and its anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalProcedure {
    pub deposit: u64,
    pub reward_account: RewardAccount,
    pub action: GovAction,
    pub anchor: Anchor,
}

impl<C> minicbor::encode::Encode<C> for ProposalProcedure {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(4)?;
        e.u64(self.deposit)?;
        self.reward_account.encode(e, ctx)?;
        self.action.encode(e, ctx)?;
        self.anchor.encode(e, ctx)?;
        Ok(())
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for ProposalProcedure {
    fn decode(
        d: &mut minicbor::decode::Decoder<'b>,
        ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        let len = d.array()?;
        if len != Some(4) {
            return Err(minicbor::decode::Error::message("proposal is a 4-tuple"));
        }
        Ok(ProposalProcedure {
            deposit: d.u64()?,
            reward_account: RewardAccount::decode(d, ctx)?,
            action: GovAction::decode(d, ctx)?,
            anchor: Anchor::decode(d, ctx)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::address::NetworkId;
    use crate::primitives::hash::Hash;

    #[test]
    fn voter_order_follows_wire_tag() {
        let drep = Voter::DRepKey(Hash::new([0u8; 28]));
        let cc = Voter::ConstitutionalCommitteeKey(Hash::new([9u8; 28]));
        assert!(cc < drep);
    }

    #[test]
    fn voting_procedures_round_trip() {
        let mut procedures = VotingProcedures::default();
        procedures.insert(
            Voter::DRepKey(Hash::new([1u8; 28])),
            GovActionId { tx_id: Hash::new([2u8; 32]), index: 0 },
            VotingProcedure { vote: Vote::Yes, anchor: None },
        );
        let bytes = minicbor::to_vec(&procedures).unwrap();
        let back: VotingProcedures = minicbor::decode(&bytes).unwrap();
        assert_eq!(procedures, back);
    }

    #[test]
    fn proposal_round_trip() {
        let proposal = ProposalProcedure {
            deposit: 100_000_000,
            reward_account: RewardAccount::from_key_hash(NetworkId::Testnet, Hash::new([1u8; 28])),
            action: GovAction::Info,
            anchor: Anchor { url: "https://example.com".into(), data_hash: Hash::new([2u8; 32]) },
        };
        let bytes = minicbor::to_vec(&proposal).unwrap();
        let back: ProposalProcedure = minicbor::decode(&bytes).unwrap();
        assert_eq!(proposal, back);
    }
}
