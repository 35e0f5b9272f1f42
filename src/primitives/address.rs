use std::fmt;

use bech32::{Bech32, Hrp};

use crate::error::TxBuildError;
use crate::primitives::hash::Hash28;

/// Network discriminant carried in the low nibble of Shelley address headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkId {
    Testnet,
    Mainnet,
}

impl NetworkId {
    pub fn value(self) -> u8 {
        match self {
            NetworkId::Testnet => 0,
            NetworkId::Mainnet => 1,
        }
    }
}

impl TryFrom<u8> for NetworkId {
    type Error = TxBuildError;

    fn try_from(v: u8) -> Result<Self, TxBuildError> {
        match v {
            0 => Ok(NetworkId::Testnet),
            1 => Ok(NetworkId::Mainnet),
            _ => Err(TxBuildError::InvalidNetworkId),
        }
    }
}

/// A Shelley payment address, kept in raw serialized form.
///
/// Header (1 byte): type in the high nibble, network in the low nibble.
/// Types 0, 2, 4 and 6 carry a payment key hash at bytes 1..29; types
/// 1, 3, 5 and 7 carry a payment script hash there instead.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address {
    bytes: Vec<u8>,
}

impl Address {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, TxBuildError> {
        if bytes.is_empty() || bytes.len() < 29 {
            return Err(TxBuildError::InvalidAddress);
        }
        if (bytes[0] >> 4) > 7 {
            return Err(TxBuildError::InvalidAddress);
        }
        Ok(Self { bytes })
    }

    pub fn from_bech32(s: &str) -> Result<Self, TxBuildError> {
        let (hrp, data) = bech32::decode(s).map_err(|_| TxBuildError::InvalidAddress)?;
        let hrp = hrp.as_str();
        if hrp != "addr" && hrp != "addr_test" {
            return Err(TxBuildError::InvalidAddress);
        }
        Self::from_bytes(data)
    }

    /// Enterprise (payment-only) address holding a key hash.
    pub fn enterprise_key(network: NetworkId, payment: Hash28) -> Self {
        let mut bytes = Vec::with_capacity(29);
        bytes.push(0x60 | network.value());
        bytes.extend_from_slice(payment.as_bytes());
        Self { bytes }
    }

    /// Enterprise (payment-only) address holding a script hash.
    pub fn enterprise_script(network: NetworkId, payment: Hash28) -> Self {
        let mut bytes = Vec::with_capacity(29);
        bytes.push(0x70 | network.value());
        bytes.extend_from_slice(payment.as_bytes());
        Self { bytes }
    }

    /// Base address: payment key hash plus stake key hash.
    pub fn base_key_key(network: NetworkId, payment: Hash28, stake: Hash28) -> Self {
        let mut bytes = Vec::with_capacity(57);
        bytes.push(network.value());
        bytes.extend_from_slice(payment.as_bytes());
        bytes.extend_from_slice(stake.as_bytes());
        Self { bytes }
    }

    fn header_type(&self) -> u8 {
        self.bytes[0] >> 4
    }

    pub fn network_id(&self) -> u8 {
        self.bytes[0] & 0x0F
    }

    /// True when the payment part is a script hash (types 1, 3, 5, 7).
    pub fn payment_is_script(&self) -> bool {
        self.header_type() % 2 == 1
    }

    /// Payment key hash for key-typed addresses.
    pub fn payment_key_hash(&self) -> Option<Hash28> {
        if self.payment_is_script() || self.bytes.len() < 29 {
            return None;
        }
        Hash28::from_slice(&self.bytes[1..29]).ok()
    }

    /// Payment script hash for script-typed addresses.
    pub fn payment_script_hash(&self) -> Option<Hash28> {
        if !self.payment_is_script() || self.bytes.len() < 29 {
            return None;
        }
        Hash28::from_slice(&self.bytes[1..29]).ok()
    }

    pub fn to_bech32(&self) -> Result<String, TxBuildError> {
        let hrp = if self.network_id() == 1 { "addr" } else { "addr_test" };
        let hrp = Hrp::parse(hrp).map_err(|_| TxBuildError::InvalidAddress)?;
        bech32::encode::<Bech32>(hrp, &self.bytes).map_err(|_| TxBuildError::InvalidAddress)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.clone()
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", hex::encode(&self.bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_bech32() {
            Ok(s) => f.write_str(&s),
            Err(_) => f.write_str(&hex::encode(self.as_bytes())),
        }
    }
}

impl<C> minicbor::encode::Encode<C> for Address {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.bytes(&self.bytes)?;
        Ok(())
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for Address {
    fn decode(
        d: &mut minicbor::decode::Decoder<'b>,
        _ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        let bytes = d.bytes()?.to_vec();
        Address::from_bytes(bytes).map_err(|_| minicbor::decode::Error::message("bad address"))
    }
}

/// A reward (stake) account: 29 bytes, header 0xE* for key credentials and
/// 0xF* for script credentials. Ordered by raw bytes, which is the canonical
/// withdrawal-map order.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RewardAccount {
    bytes: Vec<u8>,
}

impl RewardAccount {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, TxBuildError> {
        if bytes.len() != 29 || (bytes[0] & 0xE0) != 0xE0 {
            return Err(TxBuildError::InvalidAddress);
        }
        Ok(Self { bytes })
    }

    pub fn from_bech32(s: &str) -> Result<Self, TxBuildError> {
        let (hrp, data) = bech32::decode(s).map_err(|_| TxBuildError::InvalidAddress)?;
        let hrp = hrp.as_str();
        if hrp != "stake" && hrp != "stake_test" {
            return Err(TxBuildError::InvalidAddress);
        }
        Self::from_bytes(data)
    }

    pub fn from_key_hash(network: NetworkId, hash: Hash28) -> Self {
        let mut bytes = Vec::with_capacity(29);
        bytes.push(0xE0 | network.value());
        bytes.extend_from_slice(hash.as_bytes());
        Self { bytes }
    }

    pub fn from_script_hash(network: NetworkId, hash: Hash28) -> Self {
        let mut bytes = Vec::with_capacity(29);
        bytes.push(0xF0 | network.value());
        bytes.extend_from_slice(hash.as_bytes());
        Self { bytes }
    }

    pub fn credential_is_script(&self) -> bool {
        (self.bytes[0] & 0xF0) == 0xF0
    }

    /// The key or script hash backing this account.
    pub fn credential_hash(&self) -> Hash28 {
        Hash28::from_slice(&self.bytes[1..29]).expect("reward account is 29 bytes")
    }

    pub fn network_id(&self) -> u8 {
        self.bytes[0] & 0x0F
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_bech32(&self) -> Result<String, TxBuildError> {
        let hrp = if self.network_id() == 1 { "stake" } else { "stake_test" };
        let hrp = Hrp::parse(hrp).map_err(|_| TxBuildError::InvalidAddress)?;
        bech32::encode::<Bech32>(hrp, &self.bytes).map_err(|_| TxBuildError::InvalidAddress)
    }
}

impl fmt::Debug for RewardAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RewardAccount({})", hex::encode(&self.bytes))
    }
}

impl<C> minicbor::encode::Encode<C> for RewardAccount {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.bytes(&self.bytes)?;
        Ok(())
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for RewardAccount {
    fn decode(
        d: &mut minicbor::decode::Decoder<'b>,
        _ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        let bytes = d.bytes()?.to_vec();
        RewardAccount::from_bytes(bytes)
            .map_err(|_| minicbor::decode::Error::message("bad reward account"))
    }
}
