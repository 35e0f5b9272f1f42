//! Conway-era Cardano transaction construction and balancing.
//!
//! The entry point is [`builder::TxBuilder`]: a staged, fail-fast assembly
//! engine. Mutators accumulate intent (inputs, outputs, mints, certificates,
//! withdrawals, votes, metadata); `build` runs coin selection, the fee
//! fixpoint, collateral selection and script-data hashing, and emits a
//! [`primitives::Transaction`] whose canonical CBOR round-trips bit-exactly.
//!
//! Chain access is abstracted behind [`provider::Provider`]; coin selection
//! and script evaluation are pluggable through [`builder::CoinSelector`] and
//! [`builder::TxEvaluator`].

pub mod builder;
pub mod cbor;
pub mod error;
pub mod params;
pub mod primitives;
pub mod provider;

pub use builder::TxBuilder;
pub use error::TxBuildError;
pub use params::ProtocolParams;
pub use provider::Provider;
