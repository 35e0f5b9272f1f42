//! Canonical-CBOR helpers shared by the wire types.
//!
//! Everything consensus-visible is encoded with definite lengths and
//! minimal-width integers (minicbor's defaults), maps emitted in ascending
//! key order, and sets wrapped in tag 258 as the Conway era mandates.

use minicbor::data::{Tag, Type};
use minicbor::decode::Decoder;
use minicbor::encode::{Encoder, Error as EncodeError, Write};

/// CBOR tag wrapping every Conway set (inputs, signers, certificates, ...).
pub const SET_TAG: u64 = 258;

/// CBOR tag for encoded-CBOR-in-bytes (script references).
pub const ENCODED_CBOR_TAG: u64 = 24;

/// Rational numbers (unit intervals, pool margins) carry tag 30.
pub const RATIONAL_TAG: u64 = 30;

/// Emits a tag-258 set header: tag followed by a definite-length array.
pub fn encode_set_header<W: Write>(
    e: &mut Encoder<W>,
    len: u64,
) -> Result<(), EncodeError<W::Error>> {
    e.tag(Tag::new(SET_TAG))?;
    e.array(len)?;
    Ok(())
}

/// Reads a set header, tolerating the missing tag of pre-Conway encoders.
/// Returns the definite element count.
pub fn decode_set_header(d: &mut Decoder<'_>) -> Result<u64, minicbor::decode::Error> {
    if d.datatype()? == Type::Tag {
        let tag = d.tag()?;
        if tag.as_u64() != SET_TAG {
            return Err(minicbor::decode::Error::message("expected set tag 258"));
        }
    }
    d.array()?
        .ok_or_else(|| minicbor::decode::Error::message("indefinite-length set"))
}

/// Copies pre-encoded canonical CBOR straight into the output stream.
pub fn encode_raw<W: Write>(
    e: &mut Encoder<W>,
    bytes: &[u8],
) -> Result<(), EncodeError<W::Error>> {
    e.writer_mut()
        .write_all(bytes)
        .map_err(EncodeError::write)?;
    Ok(())
}

/// Skips one data item and returns the raw bytes it occupied.
pub fn decode_raw_item<'b>(d: &mut Decoder<'b>) -> Result<&'b [u8], minicbor::decode::Error> {
    let start = d.position();
    d.skip()?;
    let end = d.position();
    Ok(&d.input()[start..end])
}

/// Wraps pre-encoded CBOR in tag 24 as a byte string.
pub fn encode_tag24<W: Write>(
    e: &mut Encoder<W>,
    inner: &[u8],
) -> Result<(), EncodeError<W::Error>> {
    e.tag(Tag::new(ENCODED_CBOR_TAG))?;
    e.bytes(inner)?;
    Ok(())
}

/// Reads a tag-24 wrapped byte string and returns the embedded encoding.
pub fn decode_tag24<'b>(d: &mut Decoder<'b>) -> Result<&'b [u8], minicbor::decode::Error> {
    let tag = d.tag()?;
    if tag.as_u64() != ENCODED_CBOR_TAG {
        return Err(minicbor::decode::Error::message("expected tag 24"));
    }
    d.bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_header_emits_tag_258() {
        let mut buf = Vec::new();
        let mut e = Encoder::new(&mut buf);
        encode_set_header(&mut e, 1).unwrap();
        e.u8(7).unwrap();
        assert_eq!(hex::encode(buf), "d9010281 07".replace(' ', ""));
    }

    #[test]
    fn set_header_decodes_with_and_without_tag() {
        let tagged = hex::decode("d901028107").unwrap();
        let mut d = Decoder::new(&tagged);
        assert_eq!(decode_set_header(&mut d).unwrap(), 1);
        assert_eq!(d.u8().unwrap(), 7);

        let untagged = hex::decode("8107").unwrap();
        let mut d = Decoder::new(&untagged);
        assert_eq!(decode_set_header(&mut d).unwrap(), 1);
        assert_eq!(d.u8().unwrap(), 7);
    }

    #[test]
    fn raw_item_round_trip() {
        let payload = hex::decode("a1616b820102").unwrap();
        let mut d = Decoder::new(&payload);
        let raw = decode_raw_item(&mut d).unwrap();
        assert_eq!(raw, payload.as_slice());

        let mut buf = Vec::new();
        let mut e = Encoder::new(&mut buf);
        encode_raw(&mut e, raw).unwrap();
        assert_eq!(buf, payload);
    }

    #[test]
    fn tag24_round_trip() {
        let inner = hex::decode("820102").unwrap();
        let mut buf = Vec::new();
        let mut e = Encoder::new(&mut buf);
        encode_tag24(&mut e, &inner).unwrap();
        assert_eq!(hex::encode(&buf), "d81843820102");

        let mut d = Decoder::new(&buf);
        assert_eq!(decode_tag24(&mut d).unwrap(), inner.as_slice());
    }
}
