
use crate::cbor;
use crate::primitives::data::PlutusData;
use crate::primitives::redeemer::Redeemers;

/// An Ed25519 verification-key witness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VKeyWitness {
    pub vkey: [u8; 32],
    pub signature: [u8; 64],
}

impl VKeyWitness {
    /// Zeroed placeholder used while sizing the transaction before real
    /// signatures exist.
    pub fn placeholder() -> Self {
        Self { vkey: [0u8; 32], signature: [0u8; 64] }
    }
}

impl<C> minicbor::encode::Encode<C> for VKeyWitness {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(2)?;
        e.bytes(&self.vkey)?;
        e.bytes(&self.signature)?;
        Ok(())
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for VKeyWitness {
    fn decode(
        d: &mut minicbor::decode::Decoder<'b>,
        _ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        let len = d.array()?;
        if len != Some(2) {
            return Err(minicbor::decode::Error::message("vkey witness is [vkey, sig]"));
        }
        let vkey: [u8; 32] = d
            .bytes()?
            .try_into()
            .map_err(|_| minicbor::decode::Error::message("vkey is 32 bytes"))?;
        let signature: [u8; 64] = d
            .bytes()?
            .try_into()
            .map_err(|_| minicbor::decode::Error::message("signature is 64 bytes"))?;
        Ok(VKeyWitness { vkey, signature })
    }
}

/// A Byron-era bootstrap witness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapWitness {
    pub vkey: [u8; 32],
    pub signature: [u8; 64],
    pub chain_code: [u8; 32],
    pub attributes: Vec<u8>,
}

impl<C> minicbor::encode::Encode<C> for BootstrapWitness {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(4)?;
        e.bytes(&self.vkey)?;
        e.bytes(&self.signature)?;
        e.bytes(&self.chain_code)?;
        e.bytes(&self.attributes)?;
        Ok(())
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for BootstrapWitness {
    fn decode(
        d: &mut minicbor::decode::Decoder<'b>,
        _ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        let len = d.array()?;
        if len != Some(4) {
            return Err(minicbor::decode::Error::message("bootstrap witness is a 4-tuple"));
        }
        let vkey: [u8; 32] = d
            .bytes()?
            .try_into()
            .map_err(|_| minicbor::decode::Error::message("vkey is 32 bytes"))?;
        let signature: [u8; 64] = d
            .bytes()?
            .try_into()
            .map_err(|_| minicbor::decode::Error::message("signature is 64 bytes"))?;
        let chain_code: [u8; 32] = d
            .bytes()?
            .try_into()
            .map_err(|_| minicbor::decode::Error::message("chain code is 32 bytes"))?;
        let attributes = d.bytes()?.to_vec();
        Ok(BootstrapWitness { vkey, signature, chain_code, attributes })
    }
}

/// The transaction witness set. All containers preserve insertion order;
/// sets are encoded with tag 258 and only present sections are emitted.
///
/// Native scripts are kept as their raw CBOR encodings, Plutus scripts as
/// flat program bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WitnessSet {
    pub vkey_witnesses: Vec<VKeyWitness>,
    pub native_scripts: Vec<Vec<u8>>,
    pub bootstrap_witnesses: Vec<BootstrapWitness>,
    pub plutus_v1_scripts: Vec<Vec<u8>>,
    pub plutus_data: Vec<PlutusData>,
    pub redeemers: Redeemers,
    pub plutus_v2_scripts: Vec<Vec<u8>>,
    pub plutus_v3_scripts: Vec<Vec<u8>>,
}

impl WitnessSet {
    /// True when anything Plutus-flavoured is present; drives the
    /// script-data hash requirement.
    pub fn has_plutus(&self) -> bool {
        self.has_plutus_scripts() || !self.plutus_data.is_empty()
    }

    /// True when Plutus scripts will actually run (scripts or redeemers
    /// present); drives the collateral requirement. A datum-only witness
    /// set needs a script-data hash but no collateral.
    pub fn has_plutus_scripts(&self) -> bool {
        !self.plutus_v1_scripts.is_empty()
            || !self.plutus_v2_scripts.is_empty()
            || !self.plutus_v3_scripts.is_empty()
            || !self.redeemers.is_empty()
    }

    /// Appends a datum unless an identical one is already staged.
    pub fn add_plutus_data(&mut self, data: PlutusData) {
        if !self.plutus_data.contains(&data) {
            self.plutus_data.push(data);
        }
    }

    fn section_count(&self) -> u64 {
        [
            !self.vkey_witnesses.is_empty(),
            !self.native_scripts.is_empty(),
            !self.bootstrap_witnesses.is_empty(),
            !self.plutus_v1_scripts.is_empty(),
            !self.plutus_data.is_empty(),
            !self.redeemers.is_empty(),
            !self.plutus_v2_scripts.is_empty(),
            !self.plutus_v3_scripts.is_empty(),
        ]
        .iter()
        .filter(|present| **present)
        .count() as u64
    }
}

impl<C> minicbor::encode::Encode<C> for WitnessSet {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.map(self.section_count())?;
        if !self.vkey_witnesses.is_empty() {
            e.u8(0)?;
            cbor::encode_set_header(e, self.vkey_witnesses.len() as u64)?;
            for witness in &self.vkey_witnesses {
                witness.encode(e, ctx)?;
            }
        }
        if !self.native_scripts.is_empty() {
            e.u8(1)?;
            cbor::encode_set_header(e, self.native_scripts.len() as u64)?;
            for script in &self.native_scripts {
                cbor::encode_raw(e, script)?;
            }
        }
        if !self.bootstrap_witnesses.is_empty() {
            e.u8(2)?;
            cbor::encode_set_header(e, self.bootstrap_witnesses.len() as u64)?;
            for witness in &self.bootstrap_witnesses {
                witness.encode(e, ctx)?;
            }
        }
        if !self.plutus_v1_scripts.is_empty() {
            e.u8(3)?;
            cbor::encode_set_header(e, self.plutus_v1_scripts.len() as u64)?;
            for script in &self.plutus_v1_scripts {
                e.bytes(script)?;
            }
        }
        if !self.plutus_data.is_empty() {
            e.u8(4)?;
            cbor::encode_set_header(e, self.plutus_data.len() as u64)?;
            for data in &self.plutus_data {
                data.encode(e, ctx)?;
            }
        }
        if !self.redeemers.is_empty() {
            e.u8(5)?;
            self.redeemers.encode(e, ctx)?;
        }
        if !self.plutus_v2_scripts.is_empty() {
            e.u8(6)?;
            cbor::encode_set_header(e, self.plutus_v2_scripts.len() as u64)?;
            for script in &self.plutus_v2_scripts {
                e.bytes(script)?;
            }
        }
        if !self.plutus_v3_scripts.is_empty() {
            e.u8(7)?;
            cbor::encode_set_header(e, self.plutus_v3_scripts.len() as u64)?;
            for script in &self.plutus_v3_scripts {
                e.bytes(script)?;
            }
        }
        Ok(())
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for WitnessSet {
    fn decode(
        d: &mut minicbor::decode::Decoder<'b>,
        ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        let mut out = WitnessSet::default();
        let sections = d
            .map()?
            .ok_or_else(|| minicbor::decode::Error::message("indefinite witness set"))?;
        for _ in 0..sections {
            match d.u8()? {
                0 => {
                    let len = cbor::decode_set_header(d)?;
                    for _ in 0..len {
                        out.vkey_witnesses.push(VKeyWitness::decode(d, ctx)?);
                    }
                }
                1 => {
                    let len = cbor::decode_set_header(d)?;
                    for _ in 0..len {
                        out.native_scripts.push(cbor::decode_raw_item(d)?.to_vec());
                    }
                }
                2 => {
                    let len = cbor::decode_set_header(d)?;
                    for _ in 0..len {
                        out.bootstrap_witnesses.push(BootstrapWitness::decode(d, ctx)?);
                    }
                }
                3 => {
                    let len = cbor::decode_set_header(d)?;
                    for _ in 0..len {
                        out.plutus_v1_scripts.push(d.bytes()?.to_vec());
                    }
                }
                4 => {
                    let len = cbor::decode_set_header(d)?;
                    for _ in 0..len {
                        out.plutus_data.push(PlutusData::decode(d, ctx)?);
                    }
                }
                5 => {
                    out.redeemers = Redeemers::decode(d, ctx)?;
                }
                6 => {
                    let len = cbor::decode_set_header(d)?;
                    for _ in 0..len {
                        out.plutus_v2_scripts.push(d.bytes()?.to_vec());
                    }
                }
                7 => {
                    let len = cbor::decode_set_header(d)?;
                    for _ in 0..len {
                        out.plutus_v3_scripts.push(d.bytes()?.to_vec());
                    }
                }
                _ => return Err(minicbor::decode::Error::message("unknown witness section")),
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::redeemer::{Redeemer, RedeemerTag};

    #[test]
    fn empty_witness_set_is_an_empty_map() {
        let ws = WitnessSet::default();
        assert_eq!(hex::encode(minicbor::to_vec(&ws).unwrap()), "a0");
        assert!(!ws.has_plutus());
    }

    #[test]
    fn plutus_presence_is_detected() {
        let mut ws = WitnessSet::default();
        assert!(!ws.has_plutus());
        ws.redeemers.0.push(Redeemer::new(RedeemerTag::Spend, PlutusData::int(0)));
        assert!(ws.has_plutus());
    }

    #[test]
    fn duplicate_datums_are_elided() {
        let mut ws = WitnessSet::default();
        ws.add_plutus_data(PlutusData::int(7));
        ws.add_plutus_data(PlutusData::int(7));
        assert_eq!(ws.plutus_data.len(), 1);
    }

    #[test]
    fn round_trip_with_scripts_and_redeemers() {
        let mut ws = WitnessSet::default();
        ws.vkey_witnesses.push(VKeyWitness::placeholder());
        ws.plutus_v2_scripts.push(vec![0x01, 0x02]);
        ws.add_plutus_data(PlutusData::int(1));
        let mut r = Redeemer::new(RedeemerTag::Spend, PlutusData::int(2));
        r.ex_units.mem = 10;
        ws.redeemers.0.push(r);
        let bytes = minicbor::to_vec(&ws).unwrap();
        let back: WitnessSet = minicbor::decode(&bytes).unwrap();
        assert_eq!(ws, back);
    }
}
