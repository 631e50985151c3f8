use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use cid::Cid;
use fvm_ipld_blockstore::Block;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::tuple::*;
use fvm_ipld_encoding::DAG_CBOR;
use multihash_codetable::Code;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StateError {
    #[error("missing state at cid: {0}")]
    MissingState(Cid),
    #[error("underlying serialization error: {0}")]
    Serialization(String),
    #[error("insufficient balance: cannot decrease {owner:?}'s balance of {balance} by {delta}")]
    InsufficientBalance { owner: String, balance: u64, delta: u64 },
    #[error("{spender:?} attempted to utilise {delta} of allowance {allowance} set by {owner:?}")]
    InsufficientAllowance { owner: String, spender: String, allowance: u64, delta: u64 },
    #[error("balance of {owner:?} would overflow when increasing {balance} by {delta}")]
    BalanceOverflow { owner: String, balance: u64, delta: u64 },
    #[error("allowance between {owner:?} and {spender:?} would overflow when increasing {allowance} by {delta}")]
    AllowanceOverflow { owner: String, spender: String, allowance: u64, delta: u64 },
    #[error("decoded ledger breaks its invariants: {0:?}")]
    InvalidState(Vec<StateInvariantError>),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum StateInvariantError {
    #[error("the total supply {supply} does not match the sum of all balances {balance_sum}")]
    BalanceSupplyMismatch { supply: u64, balance_sum: u128 },
    #[error("stored a zero balance which should have been removed for {0:?}")]
    ExplicitZeroBalance(String),
    #[error("stored a zero allowance which should have been removed between {owner:?} and {spender:?}")]
    ExplicitZeroAllowance { owner: String, spender: String },
    #[error("stored an allowance map for {0:?} though they have specified no allowances")]
    ExplicitEmptyAllowance(String),
    #[error("stored an entry under an empty account identifier")]
    EmptyAccount,
}

type Result<T> = std::result::Result<T, StateError>;

/// Descriptive data about the token, fixed when the actor is constructed
#[derive(Serialize_tuple, Deserialize_tuple, PartialEq, Eq, Clone, Debug, Default)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Must always equal the sum of all balances
    pub total_supply: u64,
}

/// A string keyed map that refuses to decode when a key appears more than once
struct UniqueKeys<V>(HashMap<String, V>);

impl<'de, V: Deserialize<'de>> Deserialize<'de> for UniqueKeys<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct UniqueKeysVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for UniqueKeysVisitor<V> {
            type Value = UniqueKeys<V>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map with unique string keys")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut map = HashMap::with_capacity(access.size_hint().unwrap_or(0).min(4096));
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    match map.entry(key) {
                        Entry::Occupied(entry) => {
                            return Err(de::Error::custom(format!(
                                "duplicate map key {:?}",
                                entry.key()
                            )))
                        }
                        Entry::Vacant(entry) => {
                            entry.insert(value);
                        }
                    }
                }
                Ok(UniqueKeys(map))
            }
        }

        deserializer.deserialize_map(UniqueKeysVisitor(PhantomData))
    }
}

/// Account balances. An account without an entry holds zero tokens and zero is never stored.
#[derive(Serialize, PartialEq, Eq, Clone, Debug, Default)]
#[serde(transparent)]
pub struct Balances(HashMap<String, u64>);

impl<'de> Deserialize<'de> for Balances {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let UniqueKeys(balances) = UniqueKeys::deserialize(deserializer)?;
        Ok(Self(balances))
    }
}

impl Balances {
    pub fn get(&self, owner: &str) -> u64 {
        self.0.get(owner).copied().unwrap_or_default()
    }

    /// Adds `delta` to the owner's balance, returning the new balance
    pub fn credit(&mut self, owner: &str, delta: u64) -> Result<u64> {
        let balance = self.get(owner);
        let new_balance = balance.checked_add(delta).ok_or_else(|| {
            StateError::BalanceOverflow { owner: owner.to_owned(), balance, delta }
        })?;
        self.store(owner, new_balance);
        Ok(new_balance)
    }

    /// Subtracts `delta` from the owner's balance, returning the new balance
    ///
    /// Fails without modifying the balance if it is smaller than `delta`.
    pub fn debit(&mut self, owner: &str, delta: u64) -> Result<u64> {
        let balance = self.get(owner);
        let new_balance = balance.checked_sub(delta).ok_or_else(|| {
            StateError::InsufficientBalance { owner: owner.to_owned(), balance, delta }
        })?;
        self.store(owner, new_balance);
        Ok(new_balance)
    }

    /// Number of accounts holding a non-zero balance
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates the stored balances in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(owner, amount)| (owner.as_str(), *amount))
    }

    fn store(&mut self, owner: &str, amount: u64) {
        if amount == 0 {
            self.0.remove(owner);
        } else {
            self.0.insert(owner.to_owned(), amount);
        }
    }
}

/// Allowances stored as allowances[owner][spender]
///
/// Keeping the owner and spender as separate map levels means no two distinct pairs can share an
/// entry. Zero allowances and empty owner maps are never stored.
#[derive(Serialize, PartialEq, Eq, Clone, Debug, Default)]
#[serde(transparent)]
pub struct Allowances(HashMap<String, HashMap<String, u64>>);

impl<'de> Deserialize<'de> for Allowances {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let UniqueKeys(owners) = UniqueKeys::<UniqueKeys<u64>>::deserialize(deserializer)?;
        let owners = owners.into_iter().map(|(owner, UniqueKeys(spenders))| (owner, spenders));
        Ok(Self(owners.collect()))
    }
}

impl Allowances {
    pub fn get(&self, owner: &str, spender: &str) -> u64 {
        self.0
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or_default()
    }

    /// Raises the allowance by `delta`, returning the new allowance
    pub fn increase(&mut self, owner: &str, spender: &str, delta: u64) -> Result<u64> {
        let allowance = self.get(owner, spender);
        let new_allowance =
            allowance.checked_add(delta).ok_or_else(|| StateError::AllowanceOverflow {
                owner: owner.to_owned(),
                spender: spender.to_owned(),
                allowance,
                delta,
            })?;
        self.store(owner, spender, new_allowance);
        Ok(new_allowance)
    }

    /// Lowers the allowance by `delta`, returning the remaining allowance
    ///
    /// Fails without modifying the allowance if it is smaller than `delta`.
    pub fn decrease(&mut self, owner: &str, spender: &str, delta: u64) -> Result<u64> {
        let allowance = self.get(owner, spender);
        let new_allowance =
            allowance.checked_sub(delta).ok_or_else(|| StateError::InsufficientAllowance {
                owner: owner.to_owned(),
                spender: spender.to_owned(),
                allowance,
                delta,
            })?;
        self.store(owner, spender, new_allowance);
        Ok(new_allowance)
    }

    /// Number of non-zero (owner, spender) allowances
    pub fn len(&self) -> usize {
        self.0.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates (owner, spender, allowance) triples in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, u64)> {
        self.0.iter().flat_map(|(owner, spenders)| {
            spenders
                .iter()
                .map(move |(spender, amount)| (owner.as_str(), spender.as_str(), *amount))
        })
    }

    fn store(&mut self, owner: &str, spender: &str, amount: u64) {
        if amount == 0 {
            if let Some(spenders) = self.0.get_mut(owner) {
                spenders.remove(spender);
                if spenders.is_empty() {
                    self.0.remove(owner);
                }
            }
        } else {
            self.0.entry(owner.to_owned()).or_default().insert(spender.to_owned(), amount);
        }
    }
}

/// The complete persisted ledger of a token actor
///
/// This is a plain data structure and does not apply token protocol rules such as requiring a
/// positive transfer amount; that is left to [`crate::token::Token`]. It does refuse to let
/// balances or allowances underflow or overflow.
#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct LedgerState {
    pub metadata: TokenMetadata,
    balances: Balances,
    allowances: Allowances,
}

impl LedgerState {
    /// Creates a ledger holding the whole supply in the initial owner's account
    pub fn new(metadata: TokenMetadata, initial_owner: &str) -> Result<Self> {
        let mut balances = Balances::default();
        balances.credit(initial_owner, metadata.total_supply)?;
        Ok(Self { metadata, balances, allowances: Allowances::default() })
    }

    /// Encodes the ledger as a DAG-CBOR array of
    /// `[name, symbol, decimals, total_supply, balances, allowances]`
    pub fn encode(&self) -> Result<Vec<u8>> {
        fvm_ipld_encoding::to_vec(self).map_err(|err| StateError::Serialization(err.to_string()))
    }

    /// Decodes a ledger produced by [`LedgerState::encode`]
    ///
    /// Anything other than a six element array with correctly typed fields is rejected, as are
    /// repeated map keys and ledgers that break [`LedgerState::check_invariants`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let state: Self = fvm_ipld_encoding::from_slice(bytes)
            .map_err(|err| StateError::Serialization(err.to_string()))?;
        let (_, errors) = state.check_invariants();
        if !errors.is_empty() {
            return Err(StateError::InvalidState(errors));
        }
        Ok(state)
    }

    /// Loads a fresh copy of the state from a blockstore from a given cid
    pub fn load<BS: Blockstore>(bs: &BS, cid: &Cid) -> Result<Self> {
        match bs.get(cid) {
            Ok(Some(bytes)) => Self::decode(&bytes),
            Ok(None) => Err(StateError::MissingState(*cid)),
            Err(err) => Err(StateError::Serialization(err.to_string())),
        }
    }

    /// Saves the current state to the blockstore, returning the cid
    pub fn save<BS: Blockstore>(&self, bs: &BS) -> Result<Cid> {
        let block = Block { codec: DAG_CBOR, data: self.encode()? };
        let cid = bs
            .put(Code::Blake2b256, &block)
            .map_err(|err| StateError::Serialization(err.to_string()))?;
        debug!(%cid, holders = self.balances.len(), "saved ledger state");
        Ok(cid)
    }

    pub fn get_balance(&self, owner: &str) -> u64 {
        self.balances.get(owner)
    }

    pub fn credit_balance(&mut self, owner: &str, delta: u64) -> Result<u64> {
        self.balances.credit(owner, delta)
    }

    pub fn debit_balance(&mut self, owner: &str, delta: u64) -> Result<u64> {
        self.balances.debit(owner, delta)
    }

    /// Get the allowance that an owner has approved for a spender
    pub fn get_allowance(&self, owner: &str, spender: &str) -> u64 {
        self.allowances.get(owner, spender)
    }

    pub fn increase_allowance(&mut self, owner: &str, spender: &str, delta: u64) -> Result<u64> {
        self.allowances.increase(owner, spender, delta)
    }

    pub fn decrease_allowance(&mut self, owner: &str, spender: &str, delta: u64) -> Result<u64> {
        self.allowances.decrease(owner, spender, delta)
    }

    pub fn balances(&self) -> &Balances {
        &self.balances
    }

    pub fn allowances(&self) -> &Allowances {
        &self.allowances
    }

    /// Retrieve the number of token holders
    pub fn count_balances(&self) -> usize {
        self.balances.len()
    }

    /// Checks the ledger against every invariant, collecting all violations
    ///
    /// The sum of balances must equal the total supply, and no zero balance, zero allowance, empty
    /// owner allowance map or empty account identifier may be stored.
    pub fn check_invariants(&self) -> (StateSummary, Vec<StateInvariantError>) {
        let mut errors = Vec::new();

        let mut balance_sum: u128 = 0;
        for (owner, balance) in self.balances.iter() {
            if owner.is_empty() {
                errors.push(StateInvariantError::EmptyAccount);
            }
            if balance == 0 {
                errors.push(StateInvariantError::ExplicitZeroBalance(owner.to_owned()));
            }
            balance_sum += u128::from(balance);
        }
        if balance_sum != u128::from(self.metadata.total_supply) {
            errors.push(StateInvariantError::BalanceSupplyMismatch {
                supply: self.metadata.total_supply,
                balance_sum,
            });
        }

        for (owner, spenders) in self.allowances.0.iter() {
            if spenders.is_empty() {
                errors.push(StateInvariantError::ExplicitEmptyAllowance(owner.clone()));
            }
            for (spender, allowance) in spenders.iter() {
                if owner.is_empty() || spender.is_empty() {
                    errors.push(StateInvariantError::EmptyAccount);
                }
                if *allowance == 0 {
                    errors.push(StateInvariantError::ExplicitZeroAllowance {
                        owner: owner.clone(),
                        spender: spender.clone(),
                    });
                }
            }
        }

        let summary = StateSummary {
            holders: self.balances.len(),
            allowances: self.allowances.len(),
            total_supply: self.metadata.total_supply,
        };
        (summary, errors)
    }
}

impl Serialize for LedgerState {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let TokenMetadata { name, symbol, decimals, total_supply } = &self.metadata;
        (name, symbol, decimals, total_supply, &self.balances, &self.allowances)
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for LedgerState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let (name, symbol, decimals, total_supply, balances, allowances) =
            <(String, String, u8, u64, Balances, Allowances)>::deserialize(deserializer)?;
        Ok(Self {
            metadata: TokenMetadata { name, symbol, decimals, total_supply },
            balances,
            allowances,
        })
    }
}

/// A summary of the current state to allow checking application specific invariants
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateSummary {
    pub holders: usize,
    pub allowances: usize,
    pub total_supply: u64,
}
