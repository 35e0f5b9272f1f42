use crate::cbor;
use crate::error::TxBuildError;
use crate::primitives::hash::{Hash28, ScriptHash};

/// Script language discriminant. The numeric value is both the wire tag in
/// script references and the prefix byte hashed into the script hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScriptKind {
    Native,
    PlutusV1,
    PlutusV2,
    PlutusV3,
}

impl ScriptKind {
    pub fn tag(self) -> u8 {
        match self {
            ScriptKind::Native => 0,
            ScriptKind::PlutusV1 => 1,
            ScriptKind::PlutusV2 => 2,
            ScriptKind::PlutusV3 => 3,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self, TxBuildError> {
        match tag {
            0 => Ok(ScriptKind::Native),
            1 => Ok(ScriptKind::PlutusV1),
            2 => Ok(ScriptKind::PlutusV2),
            3 => Ok(ScriptKind::PlutusV3),
            _ => Err(TxBuildError::MalformedScript),
        }
    }
}

/// A script: language plus its canonical body bytes.
///
/// Native scripts keep their CBOR-encoded form; Plutus scripts keep the
/// flat-encoded program bytes (the byte string the witness set carries).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub kind: ScriptKind,
    pub bytes: Vec<u8>,
}

impl Script {
    pub fn new(kind: ScriptKind, bytes: Vec<u8>) -> Self {
        Self { kind, bytes }
    }

    /// BLAKE2b-224 over the era tag byte followed by the script body.
    pub fn hash(&self) -> ScriptHash {
        let mut preimage = Vec::with_capacity(1 + self.bytes.len());
        preimage.push(self.kind.tag());
        preimage.extend_from_slice(&self.bytes);
        Hash28::digest(&preimage)
    }

    pub fn is_plutus(&self) -> bool {
        self.kind != ScriptKind::Native
    }

    /// Byte length counted by the reference-script fee.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Encodes the `[tag, body]` pair used inside script references.
    fn encode_inner(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut e = minicbor::Encoder::new(&mut buf);
        e.array(2).expect("vec write");
        e.u8(self.kind.tag()).expect("vec write");
        match self.kind {
            // native scripts are themselves CBOR; splice them in verbatim
            ScriptKind::Native => {
                cbor::encode_raw(&mut e, &self.bytes).expect("vec write");
            }
            _ => {
                e.bytes(&self.bytes).expect("vec write");
            }
        }
        buf
    }
}

/// Script references are tag-24 wrapped: #6.24(bytes .cbor [tag, body]).
impl<C> minicbor::encode::Encode<C> for Script {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        cbor::encode_tag24(e, &self.encode_inner())
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for Script {
    fn decode(
        d: &mut minicbor::decode::Decoder<'b>,
        _ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        let inner = cbor::decode_tag24(d)?;
        let mut id = minicbor::Decoder::new(inner);
        let len = id.array()?;
        if len != Some(2) {
            return Err(minicbor::decode::Error::message("script ref is [tag, body]"));
        }
        let kind = ScriptKind::from_tag(id.u8()?)
            .map_err(|_| minicbor::decode::Error::message("unknown script tag"))?;
        let bytes = match kind {
            ScriptKind::Native => cbor::decode_raw_item(&mut id)?.to_vec(),
            _ => id.bytes()?.to_vec(),
        };
        Ok(Script { kind, bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plutus_hash_uses_language_prefix() {
        let body = vec![0x4d, 0x01];
        let v2 = Script::new(ScriptKind::PlutusV2, body.clone());
        let v3 = Script::new(ScriptKind::PlutusV3, body);
        assert_ne!(v2.hash(), v3.hash());
    }

    #[test]
    fn script_ref_round_trip() {
        let script = Script::new(ScriptKind::PlutusV2, vec![0xAA, 0xBB, 0xCC]);
        let bytes = minicbor::to_vec(&script).unwrap();
        let back: Script = minicbor::decode(&bytes).unwrap();
        assert_eq!(script, back);
    }

    #[test]
    fn native_script_body_spliced_verbatim() {
        // invalid-before(0): [4, 0]
        let native_body = hex::decode("820400").unwrap();
        let script = Script::new(ScriptKind::Native, native_body.clone());
        let bytes = minicbor::to_vec(&script).unwrap();
        let back: Script = minicbor::decode(&bytes).unwrap();
        assert_eq!(back.bytes, native_body);
        assert_eq!(back.kind, ScriptKind::Native);
    }
}
