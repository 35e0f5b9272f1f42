use std::fmt;


use crate::cbor;
use crate::error::TxBuildError;
use crate::primitives::hash::{DatumHash, Hash32};

/// Opaque Plutus data, stored as the canonical CBOR the user supplied.
///
/// The builder never interprets plutus data; it validates that the bytes
/// are one well-formed CBOR item, splices them verbatim into the witness
/// set, and hashes them for datum-hash outputs.
#[derive(Clone, PartialEq, Eq)]
pub struct PlutusData {
    bytes: Vec<u8>,
}

impl PlutusData {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, TxBuildError> {
        let mut d = minicbor::Decoder::new(&bytes);
        d.skip().map_err(|_| TxBuildError::MalformedDatum)?;
        if d.position() != bytes.len() {
            return Err(TxBuildError::MalformedDatum);
        }
        Ok(Self { bytes })
    }

    pub fn from_hex(s: &str) -> Result<Self, TxBuildError> {
        let bytes = hex::decode(s).map_err(|e| TxBuildError::Decoding(e.to_string()))?;
        Self::from_bytes(bytes)
    }

    /// An integer datum, handy as a unit-ish redeemer in tests.
    pub fn int(value: i64) -> Self {
        let mut bytes = Vec::new();
        let mut e = minicbor::Encoder::new(&mut bytes);
        e.i64(value).expect("vec write");
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn hash(&self) -> DatumHash {
        Hash32::digest(&self.bytes)
    }
}

impl fmt::Debug for PlutusData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlutusData({})", hex::encode(&self.bytes))
    }
}

impl<C> minicbor::encode::Encode<C> for PlutusData {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        cbor::encode_raw(e, &self.bytes)
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for PlutusData {
    fn decode(
        d: &mut minicbor::decode::Decoder<'b>,
        _ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        let raw = cbor::decode_raw_item(d)?;
        Ok(Self { bytes: raw.to_vec() })
    }
}

/// Datum attachment of a transaction output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatumOption {
    Hash(DatumHash),
    Inline(PlutusData),
}

impl<C> minicbor::encode::Encode<C> for DatumOption {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(2)?;
        match self {
            DatumOption::Hash(h) => {
                e.u8(0)?;
                h.encode(e, ctx)?;
            }
            DatumOption::Inline(data) => {
                e.u8(1)?;
                cbor::encode_tag24(e, data.as_bytes())?;
            }
        }
        Ok(())
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for DatumOption {
    fn decode(
        d: &mut minicbor::decode::Decoder<'b>,
        ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        let len = d.array()?;
        if len != Some(2) {
            return Err(minicbor::decode::Error::message("datum option is [tag, value]"));
        }
        match d.u8()? {
            0 => Ok(DatumOption::Hash(DatumHash::decode(d, ctx)?)),
            1 => {
                let inner = cbor::decode_tag24(d)?;
                let data = PlutusData::from_bytes(inner.to_vec())
                    .map_err(|_| minicbor::decode::Error::message("malformed inline datum"))?;
                Ok(DatumOption::Inline(data))
            }
            _ => Err(minicbor::decode::Error::message("unknown datum option tag")),
        }
    }
}
