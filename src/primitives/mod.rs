//! The Conway-era data model: hashes, addresses, values, scripts, datums,
//! redeemers, certificates, governance artifacts, witness sets and the
//! transaction itself, each with its canonical CBOR encoding.

mod address;
mod certificate;
mod data;
mod governance;
mod hash;
mod input;
mod metadata;
mod output;
mod redeemer;
mod script;
mod transaction;
mod value;
mod witness;

pub use address::{Address, NetworkId, RewardAccount};
pub use certificate::{Anchor, Certificate, Credential, DRep, PoolParams, Relay, check_certificate};
pub use data::{DatumOption, PlutusData};
pub use governance::{
    GovAction, GovActionId, ProposalProcedure, Vote, Voter, VotingProcedure, VotingProcedures,
};
pub use hash::{
    DatumHash, Hash, Hash28, Hash32, PolicyId, PoolKeyHash, PubKeyHash, ScriptHash, TxHash,
};
pub use input::Input;
pub use metadata::{AuxiliaryData, Metadatum};
pub use output::TransactionOutput;
pub use redeemer::{ExUnits, Redeemer, RedeemerTag, Redeemers};
pub use script::{Script, ScriptKind};
pub use transaction::{Transaction, TransactionBody, Utxo, total_utxo_value};
pub use value::{AssetName, Assets, AssetsDelta, Value};
pub use witness::{BootstrapWitness, VKeyWitness, WitnessSet};
