use std::collections::BTreeSet;

use crate::cbor;
use crate::params::CostModels;
use crate::primitives::{Hash32, PlutusData, Redeemers, ScriptKind};

/// Canonical encoding of the language-views map for the given languages.
///
/// PlutusV2/V3 entries are plain: integer key (1 or 2), definite array of
/// cost-model integers. PlutusV1 keeps its historical double-bagged form:
/// the key is a byte string containing the encoding of `0`, and the value
/// is a byte string containing an indefinite-length list. Entries are
/// ordered by the bytes of their encoded keys, which puts the V1 entry
/// (major type 2) after the integer keys.
pub fn encode_language_views(cost_models: &CostModels, used: &BTreeSet<ScriptKind>) -> Vec<u8> {
    let mut entries: Vec<(Vec<u8>, Vec<u8>)> = Vec::new();

    for kind in used {
        let Some(model) = cost_models.get(*kind) else {
            continue;
        };
        match kind {
            ScriptKind::Native => {}
            ScriptKind::PlutusV1 => {
                let mut key = Vec::new();
                let mut ke = minicbor::Encoder::new(&mut key);
                ke.bytes(&[0x00]).expect("vec write");

                let mut inner = Vec::new();
                let mut ie = minicbor::Encoder::new(&mut inner);
                ie.begin_array().expect("vec write");
                for entry in model {
                    ie.i64(*entry).expect("vec write");
                }
                ie.end().expect("vec write");

                let mut value = Vec::new();
                let mut ve = minicbor::Encoder::new(&mut value);
                ve.bytes(&inner).expect("vec write");

                entries.push((key, value));
            }
            ScriptKind::PlutusV2 | ScriptKind::PlutusV3 => {
                let mut key = Vec::new();
                let mut ke = minicbor::Encoder::new(&mut key);
                ke.u8(kind.tag() - 1).expect("vec write");

                let mut value = Vec::new();
                let mut ve = minicbor::Encoder::new(&mut value);
                ve.array(model.len() as u64).expect("vec write");
                for entry in model {
                    ve.i64(*entry).expect("vec write");
                }

                entries.push((key, value));
            }
        }
    }

    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut out = Vec::new();
    let mut e = minicbor::Encoder::new(&mut out);
    e.map(entries.len() as u64).expect("vec write");
    for (key, value) in entries {
        cbor::encode_raw(&mut e, &key).expect("vec write");
        cbor::encode_raw(&mut e, &value).expect("vec write");
    }
    out
}

/// The script-data (script integrity) hash:
///
/// ```text
/// blake2b-256( canonical(redeemers) ‖ canonical(datums) ‖ language_views )
/// ```
///
/// The datums segment is a tag-258 set and is omitted entirely when no
/// datums are staged. A transaction with datums but no redeemers hashes
/// the degenerate preimage `A0 ‖ datums ‖ A0` instead.
pub fn script_data_hash(
    redeemers: &Redeemers,
    datums: &[PlutusData],
    language_views: &[u8],
) -> Hash32 {
    let mut preimage = Vec::new();

    if redeemers.is_empty() && !datums.is_empty() {
        preimage.push(0xA0);
        encode_datums(&mut preimage, datums);
        preimage.push(0xA0);
        return Hash32::digest(&preimage);
    }

    preimage.extend_from_slice(&minicbor::to_vec(redeemers).expect("vec write"));
    if !datums.is_empty() {
        encode_datums(&mut preimage, datums);
    }
    preimage.extend_from_slice(language_views);
    Hash32::digest(&preimage)
}

fn encode_datums(buf: &mut Vec<u8>, datums: &[PlutusData]) {
    let mut e = minicbor::Encoder::new(buf);
    cbor::encode_set_header(&mut e, datums.len() as u64).expect("vec write");
    for datum in datums {
        e.encode(datum).expect("vec write");
    }
}
