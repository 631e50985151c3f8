use std::fmt;

use fvm_ipld_encoding::tuple::{Deserialize_tuple, Serialize_tuple};

/// A standard ERC20-style fungible token interface allowing for on-chain transactions. This
/// represents the external interface exposed to other on-chain actors
///
/// Accounts are identified by their address string. The calling account is supplied by the
/// implementation, never by the params.
pub trait ERC20Token {
    type TokenError;
    /// Returns the name of the token
    ///
    /// Must not be empty
    fn name(&self) -> String;

    /// Returns the ticker symbol of the token
    ///
    /// Must not be empty
    fn symbol(&self) -> String;

    /// Returns the number of decimal places used to display token amounts
    fn decimals(&self) -> u8;

    /// Returns the total amount of the token in existence
    ///
    /// The total supply must equal the balances of all accounts and never changes.
    fn total_supply(&self) -> u64;

    /// Returns the balance of an account
    ///
    /// Accounts that have never held tokens have an implicit zero balance.
    fn balance_of(&mut self, params: BalanceOfParams) -> Result<u64, Self::TokenError>;

    /// Returns the allowance approved for a spender on an owner's balance
    fn allowance(&mut self, params: AllowanceParams) -> Result<AllowanceReturn, Self::TokenError>;

    /// Transfers tokens from the caller to another account
    ///
    /// Amount must be positive. Transferring to the caller's own account is treated as a normal
    /// transfer and leaves its balance unchanged.
    fn transfer(&mut self, params: TransferParams) -> Result<TransferReturn, Self::TokenError>;

    /// Transfers tokens out of an owner's account on the authority of the caller's allowance
    ///
    /// The caller must have previously been approved to move at least the sent amount. If
    /// successful, the amount transferred is deducted from the caller's allowance.
    fn transfer_from(
        &mut self,
        params: TransferFromParams,
    ) -> Result<TransferFromReturn, Self::TokenError>;

    /// Atomically increases the allowance that a spender can transfer from the caller's balance
    ///
    /// The increase must be positive. Returns the new total allowance approved for that
    /// owner-spender pair.
    fn approval(&mut self, params: ApprovalParams) -> Result<ApprovalReturn, Self::TokenError>;
}

#[derive(Serialize_tuple, Deserialize_tuple, Clone, Debug, PartialEq, Eq)]
pub struct BalanceOfParams {
    pub addr: String,
}

/// Instruction to transfer tokens from the caller to another account
#[derive(Serialize_tuple, Deserialize_tuple, Clone, Debug, PartialEq, Eq)]
pub struct TransferParams {
    pub receiver: String,
    pub amount: u64,
}

#[derive(Serialize_tuple, Deserialize_tuple, Clone, Debug, PartialEq, Eq)]
pub struct AllowanceParams {
    pub owner: String,
    pub spender: String,
}

/// Instruction to transfer tokens out of another account using the caller's allowance
#[derive(Serialize_tuple, Deserialize_tuple, Clone, Debug, PartialEq, Eq)]
pub struct TransferFromParams {
    pub owner: String,
    pub receiver: String,
    pub amount: u64,
}

/// Instruction to increase the allowance of a spender on the caller's balance
#[derive(Serialize_tuple, Deserialize_tuple, Clone, Debug, PartialEq, Eq)]
pub struct ApprovalParams {
    pub spender: String,
    pub delta: u64,
}

#[derive(Serialize_tuple, Deserialize_tuple, Clone, Debug, PartialEq, Eq)]
pub struct AllowanceReturn {
    pub owner: String,
    pub spender: String,
    pub allowance: u64,
}

impl fmt::Display for AllowanceReturn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Allowance for {} by {}: {}", self.spender, self.owner, self.allowance)
    }
}

/// Return value after a successful transfer
#[derive(Serialize_tuple, Deserialize_tuple, Clone, Debug, PartialEq, Eq)]
pub struct TransferReturn {
    pub from: String,
    pub to: String,
    pub amount: u64,
    /// The new balance of the `from` account
    pub from_balance: u64,
    /// The new balance of the `to` account
    pub to_balance: u64,
}

impl fmt::Display for TransferReturn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "from {} to {} amount {}", self.from, self.to, self.amount)
    }
}

/// Return value after a successful delegated transfer
#[derive(Serialize_tuple, Deserialize_tuple, Clone, Debug, PartialEq, Eq)]
pub struct TransferFromReturn {
    pub spender: String,
    pub owner: String,
    pub to: String,
    pub amount: u64,
    /// The allowance the spender has left on the owner's balance
    pub allowance: u64,
}

impl fmt::Display for TransferFromReturn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} moved {} from {} to {}, remaining allowance {}",
            self.spender, self.amount, self.owner, self.to, self.allowance
        )
    }
}

/// Return value after a successful approval
#[derive(Serialize_tuple, Deserialize_tuple, Clone, Debug, PartialEq, Eq)]
pub struct ApprovalReturn {
    pub owner: String,
    pub spender: String,
    /// The new cumulative allowance
    pub allowance: u64,
}

impl fmt::Display for ApprovalReturn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "approval {} -> {} for {}", self.owner, self.spender, self.allowance)
    }
}
