
use crate::error::TxBuildError;
use crate::primitives::data::PlutusData;

/// Which positional container a redeemer points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RedeemerTag {
    Spend,
    Mint,
    Cert,
    Reward,
    Vote,
    Propose,
}

impl RedeemerTag {
    pub fn value(self) -> u8 {
        match self {
            RedeemerTag::Spend => 0,
            RedeemerTag::Mint => 1,
            RedeemerTag::Cert => 2,
            RedeemerTag::Reward => 3,
            RedeemerTag::Vote => 4,
            RedeemerTag::Propose => 5,
        }
    }

    pub fn from_value(v: u8) -> Result<Self, TxBuildError> {
        match v {
            0 => Ok(RedeemerTag::Spend),
            1 => Ok(RedeemerTag::Mint),
            2 => Ok(RedeemerTag::Cert),
            3 => Ok(RedeemerTag::Reward),
            4 => Ok(RedeemerTag::Vote),
            5 => Ok(RedeemerTag::Propose),
            _ => Err(TxBuildError::InvalidCborValue),
        }
    }
}

/// Execution budget: memory units and cpu steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExUnits {
    pub mem: u64,
    pub steps: u64,
}

impl ExUnits {
    pub fn new(mem: u64, steps: u64) -> Self {
        Self { mem, steps }
    }
}

impl<C> minicbor::encode::Encode<C> for ExUnits {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(2)?;
        e.u64(self.mem)?;
        e.u64(self.steps)?;
        Ok(())
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for ExUnits {
    fn decode(
        d: &mut minicbor::decode::Decoder<'b>,
        _ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        let len = d.array()?;
        if len != Some(2) {
            return Err(minicbor::decode::Error::message("ex units are [mem, steps]"));
        }
        Ok(ExUnits { mem: d.u64()?, steps: d.u64()? })
    }
}

/// A redeemer: the script argument plus its budget, addressed by
/// (tag, positional index). The index is derived, never user-supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redeemer {
    pub tag: RedeemerTag,
    pub index: u32,
    pub data: PlutusData,
    pub ex_units: ExUnits,
}

impl Redeemer {
    pub fn new(tag: RedeemerTag, data: PlutusData) -> Self {
        Self { tag, index: 0, data, ex_units: ExUnits::default() }
    }
}

/// The witness-set redeemer container, encoded in the Conway map form:
/// `{ [tag, index] => [data, ex_units] }` with entries sorted by key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Redeemers(pub Vec<Redeemer>);

impl Redeemers {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Redeemer> {
        self.0.iter()
    }

    /// Entries in canonical (tag, index) order.
    fn sorted(&self) -> Vec<&Redeemer> {
        let mut entries: Vec<&Redeemer> = self.0.iter().collect();
        entries.sort_by_key(|r| (r.tag.value(), r.index));
        entries
    }
}

impl<C> minicbor::encode::Encode<C> for Redeemers {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        let entries = self.sorted();
        e.map(entries.len() as u64)?;
        for r in entries {
            e.array(2)?;
            e.u8(r.tag.value())?;
            e.u32(r.index)?;
            e.array(2)?;
            r.data.encode(e, ctx)?;
            r.ex_units.encode(e, ctx)?;
        }
        Ok(())
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for Redeemers {
    fn decode(
        d: &mut minicbor::decode::Decoder<'b>,
        ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        let mut out = Vec::new();
        match d.datatype()? {
            minicbor::data::Type::Map => {
                let len = d
                    .map()?
                    .ok_or_else(|| minicbor::decode::Error::message("indefinite redeemer map"))?;
                for _ in 0..len {
                    let klen = d.array()?;
                    if klen != Some(2) {
                        return Err(minicbor::decode::Error::message("redeemer key is [tag, index]"));
                    }
                    let tag = RedeemerTag::from_value(d.u8()?)
                        .map_err(|_| minicbor::decode::Error::message("bad redeemer tag"))?;
                    let index = d.u32()?;
                    let vlen = d.array()?;
                    if vlen != Some(2) {
                        return Err(minicbor::decode::Error::message(
                            "redeemer value is [data, ex_units]",
                        ));
                    }
                    let data = PlutusData::decode(d, ctx)?;
                    let ex_units = ExUnits::decode(d, ctx)?;
                    out.push(Redeemer { tag, index, data, ex_units });
                }
            }
            // legacy array form: [[tag, index, data, ex_units], ...]
            minicbor::data::Type::Array => {
                let len = d
                    .array()?
                    .ok_or_else(|| minicbor::decode::Error::message("indefinite redeemer list"))?;
                for _ in 0..len {
                    let rlen = d.array()?;
                    if rlen != Some(4) {
                        return Err(minicbor::decode::Error::message("redeemer is a 4-tuple"));
                    }
                    let tag = RedeemerTag::from_value(d.u8()?)
                        .map_err(|_| minicbor::decode::Error::message("bad redeemer tag"))?;
                    let index = d.u32()?;
                    let data = PlutusData::decode(d, ctx)?;
                    let ex_units = ExUnits::decode(d, ctx)?;
                    out.push(Redeemer { tag, index, data, ex_units });
                }
            }
            _ => return Err(minicbor::decode::Error::message("unexpected redeemer container")),
        }
        Ok(Redeemers(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_form_sorted_by_tag_then_index() {
        let mut mint = Redeemer::new(RedeemerTag::Mint, PlutusData::int(1));
        mint.index = 0;
        let mut spend = Redeemer::new(RedeemerTag::Spend, PlutusData::int(2));
        spend.index = 1;
        let rs = Redeemers(vec![mint, spend]);
        let bytes = minicbor::to_vec(&rs).unwrap();
        // spend (tag 0) must precede mint (tag 1)
        assert_eq!(
            hex::encode(&bytes),
            "a282000182028200008201008201820000"
        );
    }

    #[test]
    fn round_trip_map_form() {
        let mut r = Redeemer::new(RedeemerTag::Spend, PlutusData::from_hex("d87980").unwrap());
        r.ex_units = ExUnits::new(1024, 500_000);
        let rs = Redeemers(vec![r]);
        let bytes = minicbor::to_vec(&rs).unwrap();
        let back: Redeemers = minicbor::decode(&bytes).unwrap();
        assert_eq!(rs, back);
    }
}
