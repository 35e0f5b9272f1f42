use std::collections::BTreeMap;
use std::fmt;


use crate::error::TxBuildError;
use crate::primitives::hash::PolicyId;

/// Asset name: at most 32 bytes, ordered by raw byte comparison.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetName(Vec<u8>);

impl AssetName {
    pub fn new(bytes: Vec<u8>) -> Result<Self, TxBuildError> {
        if bytes.len() > 32 {
            return Err(TxBuildError::AssetNameTooLong);
        }
        Ok(Self(bytes))
    }

    pub fn from_str_utf8(name: &str) -> Result<Self, TxBuildError> {
        Self::new(name.as_bytes().to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for AssetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetName({})", hex::encode(&self.0))
    }
}

impl<C> minicbor::encode::Encode<C> for AssetName {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.bytes(&self.0)?;
        Ok(())
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for AssetName {
    fn decode(
        d: &mut minicbor::decode::Decoder<'b>,
        _ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        AssetName::new(d.bytes()?.to_vec())
            .map_err(|_| minicbor::decode::Error::message("asset name longer than 32 bytes"))
    }
}

/// Unsigned multi-asset bundle: policy id → asset name → quantity.
///
/// Both map levels are `BTreeMap`s over byte-ordered keys, so iteration is
/// already the canonical wire order. Zero-quantity leaves and empty inner
/// maps are normalized away on every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Assets(BTreeMap<PolicyId, BTreeMap<AssetName, u64>>);

impl Assets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, policy: &PolicyId, name: &AssetName) -> u64 {
        self.0
            .get(policy)
            .and_then(|inner| inner.get(name))
            .copied()
            .unwrap_or(0)
    }

    pub fn set(&mut self, policy: PolicyId, name: AssetName, amount: u64) {
        if amount == 0 {
            if let Some(inner) = self.0.get_mut(&policy) {
                inner.remove(&name);
                if inner.is_empty() {
                    self.0.remove(&policy);
                }
            }
        } else {
            self.0.entry(policy).or_default().insert(name, amount);
        }
    }

    pub fn add(&mut self, policy: PolicyId, name: AssetName, amount: u64) {
        let current = self.get(&policy, &name);
        self.set(policy, name, current + amount);
    }

    /// Iterates `(policy, name, quantity)` in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&PolicyId, &AssetName, u64)> {
        self.0
            .iter()
            .flat_map(|(p, inner)| inner.iter().map(move |(n, q)| (p, n, *q)))
    }

    pub fn policies(&self) -> impl Iterator<Item = &PolicyId> {
        self.0.keys()
    }

    pub fn policy_count(&self) -> usize {
        self.0.len()
    }

    /// True when every quantity in `other` is covered by `self`.
    pub fn contains(&self, other: &Assets) -> bool {
        other.iter().all(|(p, n, q)| self.get(p, n) >= q)
    }

    pub fn checked_add(&self, other: &Assets) -> Option<Assets> {
        let mut out = self.clone();
        for (p, n, q) in other.iter() {
            let current = out.get(p, n);
            out.set(*p, n.clone(), current.checked_add(q)?);
        }
        Some(out)
    }

    /// Subtracts `other`, clamping each leaf at zero.
    pub fn saturating_sub(&self, other: &Assets) -> Assets {
        let mut out = self.clone();
        for (p, n, q) in other.iter() {
            let current = out.get(p, n);
            out.set(*p, n.clone(), current.saturating_sub(q));
        }
        out
    }

    fn map(&self) -> &BTreeMap<PolicyId, BTreeMap<AssetName, u64>> {
        &self.0
    }
}

/// Signed multi-asset bundle used for the mint field: positive quantities
/// mint, negative quantities burn. Zero entries are elided.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssetsDelta(BTreeMap<PolicyId, BTreeMap<AssetName, i64>>);

impl AssetsDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, policy: &PolicyId, name: &AssetName) -> i64 {
        self.0
            .get(policy)
            .and_then(|inner| inner.get(name))
            .copied()
            .unwrap_or(0)
    }

    pub fn set(&mut self, policy: PolicyId, name: AssetName, amount: i64) {
        if amount == 0 {
            if let Some(inner) = self.0.get_mut(&policy) {
                inner.remove(&name);
                if inner.is_empty() {
                    self.0.remove(&policy);
                }
            }
        } else {
            self.0.entry(policy).or_default().insert(name, amount);
        }
    }

    /// Merges a signed quantity into the bundle.
    pub fn add(&mut self, policy: PolicyId, name: AssetName, amount: i64) {
        let current = self.get(&policy, &name);
        self.set(policy, name, current + amount);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PolicyId, &AssetName, i64)> {
        self.0
            .iter()
            .flat_map(|(p, inner)| inner.iter().map(move |(n, q)| (p, n, *q)))
    }

    /// Policies in canonical order; a mint redeemer's index is its policy's
    /// position in this sequence.
    pub fn policies(&self) -> impl Iterator<Item = &PolicyId> {
        self.0.keys()
    }

    /// The minted (positive) side as unsigned assets.
    pub fn minted(&self) -> Assets {
        let mut out = Assets::new();
        for (p, n, q) in self.iter() {
            if q > 0 {
                out.set(*p, n.clone(), q as u64);
            }
        }
        out
    }

    /// The burned (negative) side as unsigned assets.
    pub fn burned(&self) -> Assets {
        let mut out = Assets::new();
        for (p, n, q) in self.iter() {
            if q < 0 {
                out.set(*p, n.clone(), q.unsigned_abs());
            }
        }
        out
    }
}

impl<C> minicbor::encode::Encode<C> for AssetsDelta {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.map(self.0.len() as u64)?;
        for (policy, inner) in &self.0 {
            policy.encode(e, ctx)?;
            e.map(inner.len() as u64)?;
            for (name, quantity) in inner {
                name.encode(e, ctx)?;
                e.i64(*quantity)?;
            }
        }
        Ok(())
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for AssetsDelta {
    fn decode(
        d: &mut minicbor::decode::Decoder<'b>,
        ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        let mut out = AssetsDelta::new();
        let outer = d
            .map()?
            .ok_or_else(|| minicbor::decode::Error::message("indefinite multiasset"))?;
        for _ in 0..outer {
            let policy = PolicyId::decode(d, ctx)?;
            let inner = d
                .map()?
                .ok_or_else(|| minicbor::decode::Error::message("indefinite multiasset"))?;
            for _ in 0..inner {
                let name = AssetName::decode(d, ctx)?;
                let quantity = d.i64()?;
                out.set(policy, name, quantity);
            }
        }
        Ok(out)
    }
}

/// A transaction value: lovelace plus an optional multi-asset bundle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Value {
    pub coin: u64,
    pub assets: Assets,
}

impl Value {
    pub fn coin(coin: u64) -> Self {
        Self { coin, assets: Assets::new() }
    }

    pub fn with_assets(coin: u64, assets: Assets) -> Self {
        Self { coin, assets }
    }

    pub fn is_zero(&self) -> bool {
        self.coin == 0 && self.assets.is_empty()
    }

    pub fn checked_add(&self, other: &Value) -> Option<Value> {
        Some(Value {
            coin: self.coin.checked_add(other.coin)?,
            assets: self.assets.checked_add(&other.assets)?,
        })
    }

    /// Component-wise subtraction clamped at zero.
    pub fn saturating_sub(&self, other: &Value) -> Value {
        Value {
            coin: self.coin.saturating_sub(other.coin),
            assets: self.assets.saturating_sub(&other.assets),
        }
    }

    /// True when `self` covers `other` in every component.
    pub fn contains(&self, other: &Value) -> bool {
        self.coin >= other.coin && self.assets.contains(&other.assets)
    }
}

impl<C> minicbor::encode::Encode<C> for Value {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if self.assets.is_empty() {
            e.u64(self.coin)?;
            return Ok(());
        }
        e.array(2)?;
        e.u64(self.coin)?;
        let map = self.assets.map();
        e.map(map.len() as u64)?;
        for (policy, inner) in map {
            policy.encode(e, ctx)?;
            e.map(inner.len() as u64)?;
            for (name, quantity) in inner {
                name.encode(e, ctx)?;
                e.u64(*quantity)?;
            }
        }
        Ok(())
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for Value {
    fn decode(
        d: &mut minicbor::decode::Decoder<'b>,
        ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        match d.datatype()? {
            minicbor::data::Type::Array => {
                let len = d.array()?;
                if len != Some(2) {
                    return Err(minicbor::decode::Error::message("value is [coin, assets]"));
                }
                let coin = d.u64()?;
                let mut assets = Assets::new();
                let outer = d
                    .map()?
                    .ok_or_else(|| minicbor::decode::Error::message("indefinite multiasset"))?;
                for _ in 0..outer {
                    let policy = PolicyId::decode(d, ctx)?;
                    let inner = d
                        .map()?
                        .ok_or_else(|| minicbor::decode::Error::message("indefinite multiasset"))?;
                    for _ in 0..inner {
                        let name = AssetName::decode(d, ctx)?;
                        let quantity = d.u64()?;
                        assets.set(policy, name, quantity);
                    }
                }
                Ok(Value::with_assets(coin, assets))
            }
            _ => Ok(Value::coin(d.u64()?)),
        }
    }
}
