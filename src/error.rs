/// Errors produced while staging or building a transaction.
///
/// Errors are values: every fallible operation returns one, nothing panics.
/// The builder records the first error it sees and goes inert; `build`
/// returns that error verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TxBuildError {
    /// Build called twice, or a terminal builder was mutated
    #[error("Builder is in a terminal state")]
    IllegalState,
    /// Lookup miss in an ordered container
    #[error("Element not found")]
    ElementNotFound,
    /// Map insert with a key that is already present
    #[error("Duplicated key")]
    DuplicatedKey,
    /// Positional access out of range
    #[error("Index out of bounds")]
    IndexOutOfBounds,
    /// External bytes could not be decoded
    #[error("Decoding failed: {0}")]
    Decoding(String),
    /// A CBOR item of an unexpected major type was encountered
    #[error("Unexpected CBOR type")]
    UnexpectedCborType,
    /// A CBOR item carried a value outside its valid domain
    #[error("Invalid CBOR value")]
    InvalidCborValue,

    /// Available UTxOs cannot cover the target value
    #[error("Insufficient balance in available UTxOs")]
    BalanceInsufficient,
    /// UTxO set too coarse to cover lovelace given per-output minimums
    #[error("UTxO set is not fragmented enough to balance the transaction")]
    UtxoNotFragmentedEnough,
    /// Selection would exceed the selector's input bound
    #[error("Coin selection exceeded the maximum input count")]
    InputLimitExceeded,
    /// Collateral selection exceeded maxCollateralInputs
    #[error("Maximum collateral input count exceeded")]
    MaximumInputCountExceeded,
    /// The change pool ran dry while splitting change outputs
    #[error("UTxO pool fully depleted")]
    FullyDepleted,
    /// The fee/selection fixpoint did not stabilize within the iteration cap
    #[error("Transaction balancing did not converge")]
    BalancingDidNotConverge,

    /// The evaluator rejected the transaction
    #[error("Script evaluation failed: {0}")]
    ScriptEvaluationFailed(String),
    /// Recomputed integrity hash disagrees with the one on the body
    #[error("Script data hash mismatch")]
    IntegrityHashMismatch,
    /// Intentionally stubbed operation
    #[error("Not implemented")]
    NotImplemented,

    /// Change address was not configured before build
    #[error("You must set a change address before calling `build`")]
    MissingChangeAddress,
    /// Available UTxOs were not configured before build
    #[error("You must set the available UTxOs for input selection before calling `build`")]
    MissingUtxos,
    /// Plutus witnesses present but no collateral return address configured
    #[error("Transaction interacts with Plutus validators; a collateral change address is required")]
    MissingCollateralAddress,
    /// Plutus witnesses present but no collateral UTxOs configured
    #[error("Transaction interacts with Plutus validators; collateral UTxOs are required")]
    MissingCollateralUtxos,
    /// Spending from a script address requires a redeemer
    #[error("Redeemer is required for script address inputs")]
    RedeemerRequired,
    /// Asset names are at most 32 bytes
    #[error("Asset name must be 32 bytes or less")]
    AssetNameTooLong,
    /// Network id must be 0 or 1
    #[error("Invalid network ID")]
    InvalidNetworkId,
    /// Provided bytes are not a script of the declared kind
    #[error("Malformed script bytes")]
    MalformedScript,
    /// Provided bytes are not valid plutus data
    #[error("Malformed datum bytes")]
    MalformedDatum,
    /// Address bytes or bech32 text could not be parsed
    #[error("Invalid address")]
    InvalidAddress,
    /// A collaborator (provider) failed; surfaced unwrapped
    #[error("Provider error: {0}")]
    ProviderError(String),
}

impl From<minicbor::decode::Error> for TxBuildError {
    fn from(e: minicbor::decode::Error) -> Self {
        TxBuildError::Decoding(e.to_string())
    }
}
