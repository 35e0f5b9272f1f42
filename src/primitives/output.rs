use minicbor::data::Type;

use crate::error::TxBuildError;
use crate::params::ProtocolParams;
use crate::primitives::address::Address;
use crate::primitives::data::DatumOption;
use crate::primitives::hash::DatumHash;
use crate::primitives::script::Script;
use crate::primitives::value::Value;

/// A transaction output in the post-Alonzo (map) format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOutput {
    pub address: Address,
    pub value: Value,
    pub datum: Option<DatumOption>,
    pub script_ref: Option<Script>,
}

impl TransactionOutput {
    pub fn new(address: Address, value: Value) -> Self {
        Self { address, value, datum: None, script_ref: None }
    }

    pub fn with_datum(mut self, datum: DatumOption) -> Self {
        self.datum = Some(datum);
        self
    }

    pub fn with_script_ref(mut self, script: Script) -> Self {
        self.script_ref = Some(script);
        self
    }

    /// Serialized size in bytes.
    pub fn size(&self) -> usize {
        minicbor::to_vec(self).expect("vec write").len()
    }

    /// Minimum lovelace this output must hold.
    ///
    /// The requirement depends on the serialized size, which depends on the
    /// lovelace amount itself (CBOR integers are variable-width), so the
    /// bound is computed as a fixed point: re-measure with the candidate
    /// amount until the requirement stops moving. The amount never shrinks
    /// between iterations, so the loop terminates within the handful of
    /// CBOR width steps.
    pub fn min_coin(&self, params: &ProtocolParams) -> u64 {
        let mut sized = self.clone();
        let mut previous = 0u64;
        loop {
            let required =
                params.coins_per_utxo_byte * (sized.size() as u64 + 160);
            if required == previous {
                return required;
            }
            previous = required;
            sized.value.coin = sized.value.coin.max(required);
        }
    }

    /// Checks the min-ada bound, surfacing the required amount on failure.
    pub fn check_min_coin(&self, params: &ProtocolParams) -> Result<(), TxBuildError> {
        let required = self.min_coin(params);
        if self.value.coin < required {
            return Err(TxBuildError::BalanceInsufficient);
        }
        Ok(())
    }
}

impl<C> minicbor::encode::Encode<C> for TransactionOutput {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        let mut fields = 2u64;
        if self.datum.is_some() {
            fields += 1;
        }
        if self.script_ref.is_some() {
            fields += 1;
        }
        e.map(fields)?;
        e.u8(0)?;
        self.address.encode(e, ctx)?;
        e.u8(1)?;
        self.value.encode(e, ctx)?;
        if let Some(datum) = &self.datum {
            e.u8(2)?;
            datum.encode(e, ctx)?;
        }
        if let Some(script) = &self.script_ref {
            e.u8(3)?;
            script.encode(e, ctx)?;
        }
        Ok(())
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for TransactionOutput {
    fn decode(
        d: &mut minicbor::decode::Decoder<'b>,
        ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        match d.datatype()? {
            Type::Map => {
                let fields = d
                    .map()?
                    .ok_or_else(|| minicbor::decode::Error::message("indefinite output"))?;
                let mut address = None;
                let mut value = None;
                let mut datum = None;
                let mut script_ref = None;
                for _ in 0..fields {
                    match d.u8()? {
                        0 => address = Some(Address::decode(d, ctx)?),
                        1 => value = Some(Value::decode(d, ctx)?),
                        2 => datum = Some(DatumOption::decode(d, ctx)?),
                        3 => script_ref = Some(Script::decode(d, ctx)?),
                        _ => return Err(minicbor::decode::Error::message("unknown output field")),
                    }
                }
                Ok(TransactionOutput {
                    address: address
                        .ok_or_else(|| minicbor::decode::Error::message("output missing address"))?,
                    value: value
                        .ok_or_else(|| minicbor::decode::Error::message("output missing value"))?,
                    datum,
                    script_ref,
                })
            }
            // legacy array form: [address, value, ? datum_hash]
            Type::Array => {
                let len = d
                    .array()?
                    .ok_or_else(|| minicbor::decode::Error::message("indefinite output"))?;
                if !(2..=3).contains(&len) {
                    return Err(minicbor::decode::Error::message("legacy output arity"));
                }
                let address = Address::decode(d, ctx)?;
                let value = Value::decode(d, ctx)?;
                let datum = if len == 3 {
                    Some(DatumOption::Hash(DatumHash::decode(d, ctx)?))
                } else {
                    None
                };
                Ok(TransactionOutput { address, value, datum, script_ref: None })
            }
            _ => Err(minicbor::decode::Error::message("unexpected output type")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::address::NetworkId;
    use crate::primitives::data::{DatumOption, PlutusData};
    use crate::primitives::hash::Hash;
    use crate::primitives::script::{Script, ScriptKind};

    fn address() -> Address {
        Address::enterprise_key(NetworkId::Testnet, Hash::new([1u8; 28]))
    }

    #[test]
    fn plain_output_round_trip() {
        let out = TransactionOutput::new(address(), Value::coin(5_000_000));
        let bytes = minicbor::to_vec(&out).unwrap();
        let back: TransactionOutput = minicbor::decode(&bytes).unwrap();
        assert_eq!(out, back);
    }

    #[test]
    fn datum_and_script_ref_round_trip() {
        let out = TransactionOutput::new(address(), Value::coin(2_000_000))
            .with_datum(DatumOption::Inline(PlutusData::int(42)))
            .with_script_ref(Script::new(ScriptKind::PlutusV2, vec![0xAB; 16]));
        let bytes = minicbor::to_vec(&out).unwrap();
        let back: TransactionOutput = minicbor::decode(&bytes).unwrap();
        assert_eq!(out, back);
    }

    #[test]
    fn min_coin_reaches_a_fixed_point() {
        let params = ProtocolParams::mainnet();
        let out = TransactionOutput::new(address(), Value::coin(0));
        let min = out.min_coin(&params);
        assert!(min > 0);
        // re-checking with the computed amount changes nothing
        let mut funded = out.clone();
        funded.value.coin = min;
        assert_eq!(funded.min_coin(&params), min);
        assert!(funded.check_min_coin(&params).is_ok());
    }

    #[test]
    fn legacy_array_output_decodes() {
        // [address, 1000000]
        let mut buf = Vec::new();
        let mut e = minicbor::Encoder::new(&mut buf);
        e.array(2).unwrap();
        e.bytes(address().as_bytes()).unwrap();
        e.u64(1_000_000).unwrap();
        let out: TransactionOutput = minicbor::decode(&buf).unwrap();
        assert_eq!(out.value.coin, 1_000_000);
        assert!(out.datum.is_none());
    }
}
