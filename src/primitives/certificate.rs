use minicbor::decode::Decode;
use minicbor::encode::Encode;

use crate::cbor;
use crate::error::TxBuildError;
use crate::params::ProtocolParams;
use crate::primitives::address::RewardAccount;
use crate::primitives::hash::{Hash28, Hash32, PoolKeyHash};

/// A stake or DRep credential: key hash or script hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Credential {
    Key(Hash28),
    Script(Hash28),
}

impl Credential {
    pub fn hash(&self) -> Hash28 {
        match self {
            Credential::Key(h) | Credential::Script(h) => *h,
        }
    }

    pub fn is_script(&self) -> bool {
        matches!(self, Credential::Script(_))
    }
}

impl<C> minicbor::encode::Encode<C> for Credential {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(2)?;
        match self {
            Credential::Key(h) => {
                e.u8(0)?;
                h.encode(e, ctx)?;
            }
            Credential::Script(h) => {
                e.u8(1)?;
                h.encode(e, ctx)?;
            }
        }
        Ok(())
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for Credential {
    fn decode(
        d: &mut minicbor::decode::Decoder<'b>,
        ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        let len = d.array()?;
        if len != Some(2) {
            return Err(minicbor::decode::Error::message("credential is [tag, hash]"));
        }
        match d.u8()? {
            0 => Ok(Credential::Key(Hash28::decode(d, ctx)?)),
            1 => Ok(Credential::Script(Hash28::decode(d, ctx)?)),
            _ => Err(minicbor::decode::Error::message("unknown credential tag")),
        }
    }
}

/// A delegation target for voting power.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DRep {
    Key(Hash28),
    Script(Hash28),
    Abstain,
    NoConfidence,
}

impl<C> minicbor::encode::Encode<C> for DRep {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            DRep::Key(h) => {
                e.array(2)?;
                e.u8(0)?;
                h.encode(e, ctx)?;
            }
            DRep::Script(h) => {
                e.array(2)?;
                e.u8(1)?;
                h.encode(e, ctx)?;
            }
            DRep::Abstain => {
                e.array(1)?;
                e.u8(2)?;
            }
            DRep::NoConfidence => {
                e.array(1)?;
                e.u8(3)?;
            }
        }
        Ok(())
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for DRep {
    fn decode(
        d: &mut minicbor::decode::Decoder<'b>,
        ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        match d.array()? {
            Some(2) => match d.u8()? {
                0 => Ok(DRep::Key(Hash28::decode(d, ctx)?)),
                1 => Ok(DRep::Script(Hash28::decode(d, ctx)?)),
                _ => Err(minicbor::decode::Error::message("unknown drep tag")),
            },
            Some(1) => match d.u8()? {
                2 => Ok(DRep::Abstain),
                3 => Ok(DRep::NoConfidence),
                _ => Err(minicbor::decode::Error::message("unknown drep tag")),
            },
            _ => Err(minicbor::decode::Error::message("drep is a 1- or 2-element array")),
        }
    }
}

/// Off-chain metadata pointer: url plus content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub url: String,
    pub data_hash: Hash32,
}

impl<C> minicbor::encode::Encode<C> for Anchor {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(2)?;
        e.str(&self.url)?;
        self.data_hash.encode(e, ctx)?;
        Ok(())
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for Anchor {
    fn decode(
        d: &mut minicbor::decode::Decoder<'b>,
        ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        let len = d.array()?;
        if len != Some(2) {
            return Err(minicbor::decode::Error::message("anchor is [url, hash]"));
        }
        let url = d.str()?.to_string();
        let data_hash = Hash32::decode(d, ctx)?;
        Ok(Anchor { url, data_hash })
    }
}

/// Pool relay endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relay {
    SingleHostAddr { port: Option<u16>, ipv4: Option<[u8; 4]> },
    SingleHostName { port: Option<u16>, dns: String },
    MultiHostName { dns: String },
}

impl<C> minicbor::encode::Encode<C> for Relay {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            Relay::SingleHostAddr { port, ipv4 } => {
                e.array(4)?;
                e.u8(0)?;
                match port {
                    Some(p) => e.u16(*p)?,
                    None => e.null()?,
                };
                match ipv4 {
                    Some(ip) => e.bytes(ip)?,
                    None => e.null()?,
                };
                e.null()?;
            }
            Relay::SingleHostName { port, dns } => {
                e.array(3)?;
                e.u8(1)?;
                match port {
                    Some(p) => e.u16(*p)?,
                    None => e.null()?,
                };
                e.str(dns)?;
            }
            Relay::MultiHostName { dns } => {
                e.array(2)?;
                e.u8(2)?;
                e.str(dns)?;
            }
        }
        Ok(())
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for Relay {
    fn decode(
        d: &mut minicbor::decode::Decoder<'b>,
        _ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        let _len = d.array()?;
        match d.u8()? {
            0 => {
                let port = decode_opt_u16(d)?;
                let ipv4 = if d.datatype()? == minicbor::data::Type::Null {
                    d.null()?;
                    None
                } else {
                    let raw = d.bytes()?;
                    let ip: [u8; 4] = raw
                        .try_into()
                        .map_err(|_| minicbor::decode::Error::message("ipv4 is 4 bytes"))?;
                    Some(ip)
                };
                // ipv6 slot, unsupported but tolerated
                if d.datatype()? == minicbor::data::Type::Null {
                    d.null()?;
                } else {
                    d.skip()?;
                }
                Ok(Relay::SingleHostAddr { port, ipv4 })
            }
            1 => {
                let port = decode_opt_u16(d)?;
                let dns = d.str()?.to_string();
                Ok(Relay::SingleHostName { port, dns })
            }
            2 => {
                let dns = d.str()?.to_string();
                Ok(Relay::MultiHostName { dns })
            }
            _ => Err(minicbor::decode::Error::message("unknown relay tag")),
        }
    }
}

fn decode_opt_u16(d: &mut minicbor::decode::Decoder<'_>) -> Result<Option<u16>, minicbor::decode::Error> {
    if d.datatype()? == minicbor::data::Type::Null {
        d.null()?;
        Ok(None)
    } else {
        Ok(Some(d.u16()?))
    }
}

/// Stake-pool registration parameters, flattened into the certificate array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolParams {
    pub operator: PoolKeyHash,
    pub vrf_key_hash: Hash32,
    pub pledge: u64,
    pub cost: u64,
    /// margin numerator/denominator (a unit interval, tag 30 on the wire)
    pub margin: (u64, u64),
    pub reward_account: RewardAccount,
    pub owners: Vec<Hash28>,
    pub relays: Vec<Relay>,
    pub metadata: Option<(String, Hash32)>,
}

/// Certificates carried in the transaction body, insertion-ordered.
///
/// Legacy registrations (tags 0/1) carry no deposit; the Conway forms
/// (tags 7/8) carry it explicitly. Deposit and reclaim accounting for the
/// balancer lives in [`Certificate::deposit`] and [`Certificate::refund`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Certificate {
    StakeRegistration { credential: Credential },
    StakeDeregistration { credential: Credential },
    StakeDelegation { credential: Credential, pool: PoolKeyHash },
    PoolRegistration { params: PoolParams },
    PoolRetirement { pool: PoolKeyHash, epoch: u64 },
    Reg { credential: Credential, deposit: u64 },
    UnReg { credential: Credential, deposit: u64 },
    VoteDeleg { credential: Credential, drep: DRep },
    RegDrep { credential: Credential, deposit: u64, anchor: Option<Anchor> },
    UnregDrep { credential: Credential, deposit: u64 },
    UpdateDrep { credential: Credential, anchor: Option<Anchor> },
}

impl Certificate {
    /// Lovelace this certificate locks when included.
    pub fn deposit(&self, params: &ProtocolParams) -> u64 {
        match self {
            Certificate::StakeRegistration { .. } => params.key_deposit,
            Certificate::Reg { deposit, .. } => *deposit,
            Certificate::PoolRegistration { .. } => params.pool_deposit,
            Certificate::RegDrep { deposit, .. } => *deposit,
            _ => 0,
        }
    }

    /// Lovelace this certificate returns when included.
    pub fn refund(&self, params: &ProtocolParams) -> u64 {
        match self {
            Certificate::StakeDeregistration { .. } => params.key_deposit,
            Certificate::UnReg { deposit, .. } => *deposit,
            Certificate::PoolRetirement { .. } => params.pool_deposit,
            Certificate::UnregDrep { deposit, .. } => *deposit,
            _ => 0,
        }
    }

    /// The script credential a certifying redeemer would witness, if any.
    pub fn script_hash(&self) -> Option<Hash28> {
        let credential = match self {
            Certificate::StakeRegistration { credential }
            | Certificate::StakeDeregistration { credential }
            | Certificate::StakeDelegation { credential, .. }
            | Certificate::Reg { credential, .. }
            | Certificate::UnReg { credential, .. }
            | Certificate::VoteDeleg { credential, .. }
            | Certificate::RegDrep { credential, .. }
            | Certificate::UnregDrep { credential, .. }
            | Certificate::UpdateDrep { credential, .. } => credential,
            Certificate::PoolRegistration { .. } | Certificate::PoolRetirement { .. } => {
                return None;
            }
        };
        match credential {
            Credential::Script(h) => Some(*h),
            Credential::Key(_) => None,
        }
    }
}

fn encode_opt_anchor<W: minicbor::encode::Write, C>(
    e: &mut minicbor::Encoder<W>,
    ctx: &mut C,
    anchor: &Option<Anchor>,
) -> Result<(), minicbor::encode::Error<W::Error>> {
    match anchor {
        Some(a) => a.encode(e, ctx)?,
        None => {
            e.null()?;
        }
    }
    Ok(())
}

fn decode_opt_anchor(
    d: &mut minicbor::decode::Decoder<'_>,
) -> Result<Option<Anchor>, minicbor::decode::Error> {
    if d.datatype()? == minicbor::data::Type::Null {
        d.null()?;
        Ok(None)
    } else {
        Ok(Some(Anchor::decode(d, &mut ())?))
    }
}

impl<C> minicbor::encode::Encode<C> for Certificate {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            Certificate::StakeRegistration { credential } => {
                e.array(2)?;
                e.u8(0)?;
                credential.encode(e, ctx)?;
            }
            Certificate::StakeDeregistration { credential } => {
                e.array(2)?;
                e.u8(1)?;
                credential.encode(e, ctx)?;
            }
            Certificate::StakeDelegation { credential, pool } => {
                e.array(3)?;
                e.u8(2)?;
                credential.encode(e, ctx)?;
                pool.encode(e, ctx)?;
            }
            Certificate::PoolRegistration { params } => {
                e.array(10)?;
                e.u8(3)?;
                params.operator.encode(e, ctx)?;
                params.vrf_key_hash.encode(e, ctx)?;
                e.u64(params.pledge)?;
                e.u64(params.cost)?;
                e.tag(minicbor::data::Tag::new(cbor::RATIONAL_TAG))?;
                e.array(2)?;
                e.u64(params.margin.0)?;
                e.u64(params.margin.1)?;
                params.reward_account.encode(e, ctx)?;
                cbor::encode_set_header(e, params.owners.len() as u64)?;
                for owner in &params.owners {
                    owner.encode(e, ctx)?;
                }
                e.array(params.relays.len() as u64)?;
                for relay in &params.relays {
                    relay.encode(e, ctx)?;
                }
                match &params.metadata {
                    Some((url, hash)) => {
                        e.array(2)?;
                        e.str(url)?;
                        hash.encode(e, ctx)?;
                    }
                    None => {
                        e.null()?;
                    }
                }
            }
            Certificate::PoolRetirement { pool, epoch } => {
                e.array(3)?;
                e.u8(4)?;
                pool.encode(e, ctx)?;
                e.u64(*epoch)?;
            }
            Certificate::Reg { credential, deposit } => {
                e.array(3)?;
                e.u8(7)?;
                credential.encode(e, ctx)?;
                e.u64(*deposit)?;
            }
            Certificate::UnReg { credential, deposit } => {
                e.array(3)?;
                e.u8(8)?;
                credential.encode(e, ctx)?;
                e.u64(*deposit)?;
            }
            Certificate::VoteDeleg { credential, drep } => {
                e.array(3)?;
                e.u8(9)?;
                credential.encode(e, ctx)?;
                drep.encode(e, ctx)?;
            }
            Certificate::RegDrep { credential, deposit, anchor } => {
                e.array(4)?;
                e.u8(16)?;
                credential.encode(e, ctx)?;
                e.u64(*deposit)?;
                encode_opt_anchor(e, ctx, anchor)?;
            }
            Certificate::UnregDrep { credential, deposit } => {
                e.array(3)?;
                e.u8(17)?;
                credential.encode(e, ctx)?;
                e.u64(*deposit)?;
            }
            Certificate::UpdateDrep { credential, anchor } => {
                e.array(3)?;
                e.u8(18)?;
                credential.encode(e, ctx)?;
                encode_opt_anchor(e, ctx, anchor)?;
            }
        }
        Ok(())
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for Certificate {
    fn decode(
        d: &mut minicbor::decode::Decoder<'b>,
        ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        let _len = d.array()?;
        match d.u8()? {
            0 => Ok(Certificate::StakeRegistration { credential: Credential::decode(d, ctx)? }),
            1 => Ok(Certificate::StakeDeregistration { credential: Credential::decode(d, ctx)? }),
            2 => Ok(Certificate::StakeDelegation {
                credential: Credential::decode(d, ctx)?,
                pool: PoolKeyHash::decode(d, ctx)?,
            }),
            3 => {
                let operator = PoolKeyHash::decode(d, ctx)?;
                let vrf_key_hash = Hash32::decode(d, ctx)?;
                let pledge = d.u64()?;
                let cost = d.u64()?;
                let tag = d.tag()?;
                if tag.as_u64() != cbor::RATIONAL_TAG {
                    return Err(minicbor::decode::Error::message("margin carries tag 30"));
                }
                let mlen = d.array()?;
                if mlen != Some(2) {
                    return Err(minicbor::decode::Error::message("margin is [num, den]"));
                }
                let margin = (d.u64()?, d.u64()?);
                let reward_account = RewardAccount::decode(d, ctx)?;
                let owner_count = cbor::decode_set_header(d)?;
                let mut owners = Vec::with_capacity(owner_count as usize);
                for _ in 0..owner_count {
                    owners.push(Hash28::decode(d, ctx)?);
                }
                let relay_count = d
                    .array()?
                    .ok_or_else(|| minicbor::decode::Error::message("indefinite relay list"))?;
                let mut relays = Vec::with_capacity(relay_count as usize);
                for _ in 0..relay_count {
                    relays.push(Relay::decode(d, ctx)?);
                }
                let metadata = if d.datatype()? == minicbor::data::Type::Null {
                    d.null()?;
                    None
                } else {
                    let plen = d.array()?;
                    if plen != Some(2) {
                        return Err(minicbor::decode::Error::message("pool metadata is [url, hash]"));
                    }
                    let url = d.str()?.to_string();
                    let hash = Hash32::decode(d, ctx)?;
                    Some((url, hash))
                };
                Ok(Certificate::PoolRegistration {
                    params: PoolParams {
                        operator,
                        vrf_key_hash,
                        pledge,
                        cost,
                        margin,
                        reward_account,
                        owners,
                        relays,
                        metadata,
                    },
                })
            }
            4 => Ok(Certificate::PoolRetirement {
                pool: PoolKeyHash::decode(d, ctx)?,
                epoch: d.u64()?,
            }),
            7 => Ok(Certificate::Reg {
                credential: Credential::decode(d, ctx)?,
                deposit: d.u64()?,
            }),
            8 => Ok(Certificate::UnReg {
                credential: Credential::decode(d, ctx)?,
                deposit: d.u64()?,
            }),
            9 => Ok(Certificate::VoteDeleg {
                credential: Credential::decode(d, ctx)?,
                drep: DRep::decode(d, ctx)?,
            }),
            16 => Ok(Certificate::RegDrep {
                credential: Credential::decode(d, ctx)?,
                deposit: d.u64()?,
                anchor: decode_opt_anchor(d)?,
            }),
            17 => Ok(Certificate::UnregDrep {
                credential: Credential::decode(d, ctx)?,
                deposit: d.u64()?,
            }),
            18 => Ok(Certificate::UpdateDrep {
                credential: Credential::decode(d, ctx)?,
                anchor: decode_opt_anchor(d)?,
            }),
            _ => Err(minicbor::decode::Error::message("unsupported certificate tag")),
        }
    }
}

/// Validates a certificate argument before staging it.
pub fn check_certificate(cert: &Certificate) -> Result<(), TxBuildError> {
    if let Certificate::PoolRegistration { params } = cert {
        if params.margin.1 == 0 || params.margin.0 > params.margin.1 {
            return Err(TxBuildError::InvalidCborValue);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::address::NetworkId;
    use crate::primitives::hash::Hash;

    #[test]
    fn stake_registration_wire_shape() {
        let cert = Certificate::StakeRegistration {
            credential: Credential::Key(Hash::new([0x13; 28])),
        };
        let bytes = minicbor::to_vec(&cert).unwrap();
        assert_eq!(
            hex::encode(&bytes),
            format!("82008200581c{}", hex::encode([0x13u8; 28]))
        );
        let back: Certificate = minicbor::decode(&bytes).unwrap();
        assert_eq!(cert, back);
    }

    #[test]
    fn conway_reg_carries_deposit() {
        let cert = Certificate::Reg {
            credential: Credential::Script(Hash::new([3u8; 28])),
            deposit: 2_000_000,
        };
        let bytes = minicbor::to_vec(&cert).unwrap();
        let back: Certificate = minicbor::decode(&bytes).unwrap();
        assert_eq!(cert, back);
        assert_eq!(cert.script_hash(), Some(Hash::new([3u8; 28])));
    }

    #[test]
    fn deposit_accounting() {
        let params = ProtocolParams::mainnet();
        let reg = Certificate::StakeRegistration {
            credential: Credential::Key(Hash::new([1u8; 28])),
        };
        let unreg = Certificate::StakeDeregistration {
            credential: Credential::Key(Hash::new([1u8; 28])),
        };
        assert_eq!(reg.deposit(&params), params.key_deposit);
        assert_eq!(reg.refund(&params), 0);
        assert_eq!(unreg.deposit(&params), 0);
        assert_eq!(unreg.refund(&params), params.key_deposit);
    }

    #[test]
    fn pool_registration_round_trip() {
        let cert = Certificate::PoolRegistration {
            params: PoolParams {
                operator: Hash::new([1u8; 28]),
                vrf_key_hash: Hash::new([2u8; 32]),
                pledge: 100,
                cost: 340_000_000,
                margin: (1, 20),
                reward_account: RewardAccount::from_key_hash(NetworkId::Mainnet, Hash::new([3u8; 28])),
                owners: vec![Hash::new([3u8; 28])],
                relays: vec![Relay::SingleHostName { port: Some(3001), dns: "relay.example.com".into() }],
                metadata: Some(("https://example.com/pool.json".into(), Hash::new([4u8; 32]))),
            },
        };
        let bytes = minicbor::to_vec(&cert).unwrap();
        let back: Certificate = minicbor::decode(&bytes).unwrap();
        assert_eq!(cert, back);
    }

    #[test]
    fn drep_round_trips() {
        for drep in [
            DRep::Key(Hash::new([1u8; 28])),
            DRep::Script(Hash::new([2u8; 28])),
            DRep::Abstain,
            DRep::NoConfidence,
        ] {
            let bytes = minicbor::to_vec(&drep).unwrap();
            let back: DRep = minicbor::decode(&bytes).unwrap();
            assert_eq!(drep, back);
        }
    }
}
