use std::collections::BTreeMap;

use minicbor::data::{Tag, Type};

use crate::cbor;
use crate::primitives::hash::Hash32;

/// Transaction metadata value tree.
///
/// Maps are stored as pair lists and emitted sorted by the canonical bytes
/// of their encoded keys, so identical trees always serialize identically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Metadatum {
    Int(i64),
    Bytes(Vec<u8>),
    Text(String),
    List(Vec<Metadatum>),
    Map(Vec<(Metadatum, Metadatum)>),
}

impl Metadatum {
    fn encoded(&self) -> Vec<u8> {
        minicbor::to_vec(self).expect("vec write")
    }
}

impl<C> minicbor::encode::Encode<C> for Metadatum {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            Metadatum::Int(i) => {
                e.i64(*i)?;
            }
            Metadatum::Bytes(b) => {
                e.bytes(b)?;
            }
            Metadatum::Text(t) => {
                e.str(t)?;
            }
            Metadatum::List(items) => {
                e.array(items.len() as u64)?;
                for item in items {
                    item.encode(e, ctx)?;
                }
            }
            Metadatum::Map(pairs) => {
                let mut sorted: Vec<&(Metadatum, Metadatum)> = pairs.iter().collect();
                sorted.sort_by(|a, b| a.0.encoded().cmp(&b.0.encoded()));
                e.map(sorted.len() as u64)?;
                for (k, v) in sorted {
                    k.encode(e, ctx)?;
                    v.encode(e, ctx)?;
                }
            }
        }
        Ok(())
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for Metadatum {
    fn decode(
        d: &mut minicbor::decode::Decoder<'b>,
        ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        match d.datatype()? {
            Type::U8 | Type::U16 | Type::U32 | Type::U64 | Type::I8 | Type::I16 | Type::I32
            | Type::I64 => Ok(Metadatum::Int(d.i64()?)),
            Type::Bytes => Ok(Metadatum::Bytes(d.bytes()?.to_vec())),
            Type::String => Ok(Metadatum::Text(d.str()?.to_string())),
            Type::Array => {
                let len = d
                    .array()?
                    .ok_or_else(|| minicbor::decode::Error::message("indefinite metadatum list"))?;
                let mut items = Vec::with_capacity(len as usize);
                for _ in 0..len {
                    items.push(Metadatum::decode(d, ctx)?);
                }
                Ok(Metadatum::List(items))
            }
            Type::Map => {
                let len = d
                    .map()?
                    .ok_or_else(|| minicbor::decode::Error::message("indefinite metadatum map"))?;
                let mut pairs = Vec::with_capacity(len as usize);
                for _ in 0..len {
                    let k = Metadatum::decode(d, ctx)?;
                    let v = Metadatum::decode(d, ctx)?;
                    pairs.push((k, v));
                }
                Ok(Metadatum::Map(pairs))
            }
            _ => Err(minicbor::decode::Error::message("unexpected metadatum type")),
        }
    }
}

/// Auxiliary data in the Conway (alonzo-era) format: tag 259 wrapping a map
/// of optional sections. Only present sections are encoded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuxiliaryData {
    pub metadata: BTreeMap<u64, Metadatum>,
    pub native_scripts: Vec<Vec<u8>>,
    pub plutus_v1_scripts: Vec<Vec<u8>>,
    pub plutus_v2_scripts: Vec<Vec<u8>>,
    pub plutus_v3_scripts: Vec<Vec<u8>>,
}

const AUX_DATA_TAG: u64 = 259;

impl AuxiliaryData {
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
            && self.native_scripts.is_empty()
            && self.plutus_v1_scripts.is_empty()
            && self.plutus_v2_scripts.is_empty()
            && self.plutus_v3_scripts.is_empty()
    }

    /// Inserts a metadata entry at the given label, replacing any previous
    /// value under that label.
    pub fn set_metadata(&mut self, label: u64, value: Metadatum) {
        self.metadata.insert(label, value);
    }

    /// BLAKE2b-256 of the canonical encoding; this is the body's
    /// auxiliary-data hash.
    pub fn hash(&self) -> Hash32 {
        Hash32::digest(&minicbor::to_vec(self).expect("vec write"))
    }
}

impl<C> minicbor::encode::Encode<C> for AuxiliaryData {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.tag(Tag::new(AUX_DATA_TAG))?;
        let mut sections = 0u64;
        if !self.metadata.is_empty() {
            sections += 1;
        }
        if !self.native_scripts.is_empty() {
            sections += 1;
        }
        if !self.plutus_v1_scripts.is_empty() {
            sections += 1;
        }
        if !self.plutus_v2_scripts.is_empty() {
            sections += 1;
        }
        if !self.plutus_v3_scripts.is_empty() {
            sections += 1;
        }
        e.map(sections)?;
        if !self.metadata.is_empty() {
            e.u8(0)?;
            e.map(self.metadata.len() as u64)?;
            for (label, value) in &self.metadata {
                e.u64(*label)?;
                value.encode(e, ctx)?;
            }
        }
        if !self.native_scripts.is_empty() {
            e.u8(1)?;
            e.array(self.native_scripts.len() as u64)?;
            for script in &self.native_scripts {
                cbor::encode_raw(e, script)?;
            }
        }
        if !self.plutus_v1_scripts.is_empty() {
            e.u8(2)?;
            e.array(self.plutus_v1_scripts.len() as u64)?;
            for script in &self.plutus_v1_scripts {
                e.bytes(script)?;
            }
        }
        if !self.plutus_v2_scripts.is_empty() {
            e.u8(3)?;
            e.array(self.plutus_v2_scripts.len() as u64)?;
            for script in &self.plutus_v2_scripts {
                e.bytes(script)?;
            }
        }
        if !self.plutus_v3_scripts.is_empty() {
            e.u8(4)?;
            e.array(self.plutus_v3_scripts.len() as u64)?;
            for script in &self.plutus_v3_scripts {
                e.bytes(script)?;
            }
        }
        Ok(())
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for AuxiliaryData {
    fn decode(
        d: &mut minicbor::decode::Decoder<'b>,
        ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        let mut out = AuxiliaryData::default();
        let tag = d.tag()?;
        if tag.as_u64() != AUX_DATA_TAG {
            return Err(minicbor::decode::Error::message("expected tag 259"));
        }
        let sections = d
            .map()?
            .ok_or_else(|| minicbor::decode::Error::message("indefinite auxiliary data"))?;
        for _ in 0..sections {
            match d.u64()? {
                0 => {
                    let len = d
                        .map()?
                        .ok_or_else(|| minicbor::decode::Error::message("indefinite metadata"))?;
                    for _ in 0..len {
                        let label = d.u64()?;
                        let value = Metadatum::decode(d, ctx)?;
                        out.metadata.insert(label, value);
                    }
                }
                1 => {
                    let len = d
                        .array()?
                        .ok_or_else(|| minicbor::decode::Error::message("indefinite scripts"))?;
                    for _ in 0..len {
                        out.native_scripts.push(cbor::decode_raw_item(d)?.to_vec());
                    }
                }
                2 => {
                    let len = d
                        .array()?
                        .ok_or_else(|| minicbor::decode::Error::message("indefinite scripts"))?;
                    for _ in 0..len {
                        out.plutus_v1_scripts.push(d.bytes()?.to_vec());
                    }
                }
                3 => {
                    let len = d
                        .array()?
                        .ok_or_else(|| minicbor::decode::Error::message("indefinite scripts"))?;
                    for _ in 0..len {
                        out.plutus_v2_scripts.push(d.bytes()?.to_vec());
                    }
                }
                4 => {
                    let len = d
                        .array()?
                        .ok_or_else(|| minicbor::decode::Error::message("indefinite scripts"))?;
                    for _ in 0..len {
                        out.plutus_v3_scripts.push(d.bytes()?.to_vec());
                    }
                }
                _ => return Err(minicbor::decode::Error::message("unknown auxiliary section")),
            }
        }
        Ok(out)
    }
}
