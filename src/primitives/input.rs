
use crate::primitives::hash::TxHash;

/// Reference to a transaction output: (transaction id, output index).
///
/// The derived ordering — transaction id bytes first, then index — is the
/// canonical input-set order, so a `BTreeSet<Input>` iterates exactly in
/// wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Input {
    pub tx_id: TxHash,
    pub index: u64,
}

impl Input {
    pub fn new(tx_id: TxHash, index: u64) -> Self {
        Self { tx_id, index }
    }
}

impl<C> minicbor::encode::Encode<C> for Input {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(2)?;
        self.tx_id.encode(e, ctx)?;
        e.u64(self.index)?;
        Ok(())
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for Input {
    fn decode(
        d: &mut minicbor::decode::Decoder<'b>,
        ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        let len = d.array()?;
        if len != Some(2) {
            return Err(minicbor::decode::Error::message("input is a 2-element array"));
        }
        let tx_id = TxHash::decode(d, ctx)?;
        let index = d.u64()?;
        Ok(Self { tx_id, index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::hash::Hash;

    #[test]
    fn ordering_is_tx_id_then_index() {
        let a = Input::new(Hash::new([0u8; 32]), 5);
        let b = Input::new(Hash::new([0u8; 32]), 6);
        let mut high = [0u8; 32];
        high[0] = 1;
        let c = Input::new(Hash::new(high), 0);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn cbor_round_trip() {
        let input = Input::new(Hash::digest(b"tx"), 3);
        let bytes = minicbor::to_vec(input).unwrap();
        let back: Input = minicbor::decode(&bytes).unwrap();
        assert_eq!(input, back);
    }
}
