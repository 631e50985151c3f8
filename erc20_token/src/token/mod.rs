use cid::Cid;
pub use error::TokenError;
use fvm_ipld_blockstore::Blockstore;
use tracing::debug;

pub use self::state::StateError as TokenStateError;
use self::state::{LedgerState, StateInvariantError, StateSummary, TokenMetadata};
use self::types::{AllowanceReturn, ApprovalReturn, TransferFromReturn, TransferReturn};

mod error;
pub mod state;
pub mod types;

type Result<T> = std::result::Result<T, TokenError>;

/// Library functions that implement the core ERC20-style ledger rules
///
/// Holds the blockstore used to persist the ledger and a mutable reference to the state being
/// operated on.
pub struct Token<'st, BS>
where
    BS: Blockstore,
{
    /// Blockstore the ledger is loaded from and flushed to
    bs: BS,
    /// Reference to token state that will be inspected/mutated
    state: &'st mut LedgerState,
}

impl<'st, BS> Token<'st, BS>
where
    BS: Blockstore,
{
    /// Creates a new token state holding the entire supply in the initial owner's account
    ///
    /// This should be wrapped in a Token handle for convenience. Must be flushed to the blockstore
    /// explicitly to persist changes
    pub fn create_state(metadata: TokenMetadata, initial_owner: &str) -> Result<LedgerState> {
        validate_identifier(&metadata.name, "name")?;
        validate_identifier(&metadata.symbol, "symbol")?;
        validate_identifier(initial_owner, "initial owner")?;
        if metadata.decimals == 0 {
            return Err(TokenError::ZeroParameter { name: "decimals" });
        }
        if metadata.total_supply == 0 {
            return Err(TokenError::ZeroParameter { name: "total supply" });
        }
        Ok(LedgerState::new(metadata, initial_owner)?)
    }

    /// Wrap an existing token state
    pub fn wrap(bs: BS, state: &'st mut LedgerState) -> Self {
        Self { bs, state }
    }

    /// Flush state and return Cid for root
    pub fn flush(&mut self) -> Result<Cid> {
        Ok(self.state.save(&self.bs)?)
    }

    /// Get a reference to the wrapped state
    pub fn state(&self) -> &LedgerState {
        self.state
    }

    /// Opens an atomic transaction on LedgerState which allows a closure to make multiple
    /// modifications to the ledger.
    ///
    /// If the closure returns an error, the transaction is dropped atomically and no change is
    /// observed on token state.
    fn transaction<F, Res>(&mut self, f: F) -> Result<Res>
    where
        F: FnOnce(&mut LedgerState) -> Result<Res>,
    {
        let mut mutable_state = self.state.clone();
        let res = f(&mut mutable_state)?;
        // if closure didn't error, save state
        *self.state = mutable_state;
        Ok(res)
    }
}

impl<'st, BS> Token<'st, BS>
where
    BS: Blockstore,
{
    pub fn name(&self) -> &str {
        &self.state.metadata.name
    }

    pub fn symbol(&self) -> &str {
        &self.state.metadata.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.state.metadata.decimals
    }

    /// Gets the total number of tokens in existence
    ///
    /// This equals the sum of `balance_of` called on all accounts.
    pub fn total_supply(&self) -> u64 {
        self.state.metadata.total_supply
    }

    /// Returns the balance associated with a particular account
    ///
    /// Accounts that have never received tokens have a balance of zero
    pub fn balance_of(&self, owner: &str) -> u64 {
        self.state.get_balance(owner)
    }

    /// Gets the allowance between owner and spender
    ///
    /// The allowance is the amount that the spender can transfer on the owner's behalf
    pub fn allowance(&self, owner: &str, spender: &str) -> AllowanceReturn {
        AllowanceReturn {
            owner: owner.to_owned(),
            spender: spender.to_owned(),
            allowance: self.state.get_allowance(owner, spender),
        }
    }

    /// Increase the allowance that a spender controls of the owner's balance by the requested
    /// delta
    ///
    /// Approvals accumulate: the delta is added to whatever was approved before. Returns an error
    /// if the delta is zero or the resulting allowance would overflow. Else returns the new
    /// allowance.
    pub fn increase_allowance(
        &mut self,
        owner: &str,
        spender: &str,
        delta: u64,
    ) -> Result<ApprovalReturn> {
        validate_identifier(owner, "owner")?;
        validate_identifier(spender, "spender")?;
        validate_amount(delta, "approval delta")?;

        let allowance =
            self.transaction(|state| Ok(state.increase_allowance(owner, spender, delta)?))?;
        debug!(owner, spender, delta, allowance, "increased allowance");

        Ok(ApprovalReturn { owner: owner.to_owned(), spender: spender.to_owned(), allowance })
    }

    /// Transfers an amount from the sender's account to the receiver's account
    ///
    /// The amount must be positive and no greater than the sender's balance. Sending to oneself is
    /// a valid transfer that leaves the balance unchanged. Returns the new balances of both
    /// accounts.
    pub fn transfer(&mut self, from: &str, to: &str, amount: u64) -> Result<TransferReturn> {
        validate_identifier(from, "sender")?;
        validate_identifier(to, "receiver")?;
        validate_amount(amount, "transfer amount")?;

        let (from_balance, to_balance) = self.transaction(|state| {
            // debit first so a self-transfer can never create tokens
            state.debit_balance(from, amount)?;
            state.credit_balance(to, amount)?;
            Ok((state.get_balance(from), state.get_balance(to)))
        })?;
        debug!(from, to, amount, "transferred tokens");

        Ok(TransferReturn {
            from: from.to_owned(),
            to: to.to_owned(),
            amount,
            from_balance,
            to_balance,
        })
    }

    /// Transfers an amount from the owner's account to the receiver's account, consuming the
    /// spender's allowance on the owner
    ///
    /// Checked in order: the amount is positive, the spender holds a non-zero allowance, the
    /// owner's balance covers the amount and the allowance covers the amount. Any failure leaves
    /// the ledger untouched.
    pub fn transfer_from(
        &mut self,
        spender: &str,
        owner: &str,
        to: &str,
        amount: u64,
    ) -> Result<TransferFromReturn> {
        validate_identifier(spender, "spender")?;
        validate_identifier(owner, "owner")?;
        validate_identifier(to, "receiver")?;
        validate_amount(amount, "transfer amount")?;

        let allowance = self.transaction(|state| {
            let approved = state.get_allowance(owner, spender);
            if approved == 0 {
                return Err(TokenStateError::InsufficientAllowance {
                    owner: owner.to_owned(),
                    spender: spender.to_owned(),
                    allowance: approved,
                    delta: amount,
                }
                .into());
            }
            state.debit_balance(owner, amount)?;
            state.credit_balance(to, amount)?;
            Ok(state.decrease_allowance(owner, spender, amount)?)
        })?;
        debug!(spender, owner, to, amount, allowance, "transferred tokens on allowance");

        Ok(TransferFromReturn {
            spender: spender.to_owned(),
            owner: owner.to_owned(),
            to: to.to_owned(),
            amount,
            allowance,
        })
    }

    /// Checks the state invariants, returning a summary of the ledger if they hold
    pub fn check_invariants(&self) -> (StateSummary, Vec<StateInvariantError>) {
        self.state.check_invariants()
    }

    /// Checks the state invariants, returning the first violation as an error
    pub fn assert_invariants(&self) -> Result<StateSummary> {
        let (summary, mut errors) = self.check_invariants();
        if errors.is_empty() {
            Ok(summary)
        } else {
            Err(errors.swap_remove(0).into())
        }
    }
}

/// Validates that a token amount for transfer or approval is strictly positive
///
/// Returns the argument, or an error.
pub fn validate_amount(amount: u64, name: &'static str) -> Result<u64> {
    if amount == 0 {
        return Err(TokenError::ZeroAmount { name });
    }
    Ok(amount)
}

/// Validates that an account identifier or token descriptor is not empty
pub fn validate_identifier<'a>(value: &'a str, name: &'static str) -> Result<&'a str> {
    if value.is_empty() {
        return Err(TokenError::EmptyIdentifier { name });
    }
    Ok(value)
}
