use std::fmt;
use std::ops::Deref;

use cryptoxide::blake2b::Blake2b;
use cryptoxide::digest::Digest as _;

use crate::error::TxBuildError;

/// Fixed-width hash, ordered by raw byte comparison.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash<const N: usize>(pub [u8; N]);

pub type Hash28 = Hash<28>;
pub type Hash32 = Hash<32>;

pub type PolicyId = Hash<28>;
pub type PubKeyHash = Hash<28>;
pub type ScriptHash = Hash<28>;
pub type PoolKeyHash = Hash<28>;
pub type TxHash = Hash<32>;
pub type DatumHash = Hash<32>;

impl<const N: usize> Hash<N> {
    pub fn new(bytes: [u8; N]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, TxBuildError> {
        let arr: [u8; N] = bytes.try_into().map_err(|_| TxBuildError::InvalidCborValue)?;
        Ok(Self(arr))
    }

    pub fn from_hex(s: &str) -> Result<Self, TxBuildError> {
        let bytes = hex::decode(s).map_err(|e| TxBuildError::Decoding(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// BLAKE2b digest of `data` at this hash width.
    pub fn digest(data: &[u8]) -> Self {
        let mut out = [0u8; N];
        let mut context = Blake2b::new(N);
        context.input(data);
        context.result(&mut out);
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl<const N: usize> Deref for Hash<N> {
    type Target = [u8; N];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<const N: usize> AsRef<[u8]> for Hash<N> {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl<const N: usize> From<[u8; N]> for Hash<N> {
    fn from(bytes: [u8; N]) -> Self {
        Self(bytes)
    }
}

impl<const N: usize> fmt::Display for Hash<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl<const N: usize> fmt::Debug for Hash<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash<{}>({})", N, hex::encode(self.0))
    }
}

impl<C, const N: usize> minicbor::encode::Encode<C> for Hash<N> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.bytes(&self.0)?;
        Ok(())
    }
}

impl<'b, C, const N: usize> minicbor::decode::Decode<'b, C> for Hash<N> {
    fn decode(
        d: &mut minicbor::decode::Decoder<'b>,
        _ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        let bytes = d.bytes()?;
        Self::from_slice(bytes)
            .map_err(|_| minicbor::decode::Error::message("hash of unexpected length"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_256_of_empty_matches_blake2b() {
        // blake2b-256("")
        let h = Hash::<32>::digest(b"");
        assert_eq!(
            h.to_string(),
            "0e5751c026e543b2e8ab2eb06099daa1d1e5df47778f7787faab45cdf12fe3a8"
        );
    }

    #[test]
    fn hex_round_trip() {
        let h = Hash::<28>::digest(b"policy");
        let parsed = Hash::<28>::from_hex(&h.to_string()).unwrap();
        assert_eq!(h, parsed);
    }

    #[test]
    fn cbor_round_trip() {
        let h = Hash::<32>::digest(b"tx");
        let bytes = minicbor::to_vec(h).unwrap();
        assert_eq!(bytes[0], 0x58);
        assert_eq!(bytes[1], 32);
        let back: Hash<32> = minicbor::decode(&bytes).unwrap();
        assert_eq!(h, back);
    }

    #[test]
    fn ordering_is_bytewise() {
        let a = Hash::<28>::new([0u8; 28]);
        let mut high = [0u8; 28];
        high[0] = 1;
        let b = Hash::<28>::new(high);
        assert!(a < b);
    }
}
