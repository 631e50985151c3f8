use cid::Cid;
use erc20_token::token::{
    state::{LedgerState, StateError, TokenMetadata},
    types::{
        AllowanceParams, AllowanceReturn, ApprovalParams, ApprovalReturn, BalanceOfParams,
        ERC20Token, TransferFromParams, TransferFromReturn, TransferParams, TransferReturn,
    },
    validate_identifier, Token, TokenError,
};
use fvm_actor_utils::{
    syscalls::Syscalls,
    util::{ActorError, ActorRuntime},
};
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::{
    ipld_block::IpldBlock,
    tuple::{Deserialize_tuple, Serialize_tuple},
};
use fvm_shared::error::ExitCode;
use fvm_shared::ActorID;
use serde::{de::DeserializeOwned, ser::Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur during the execution of this actor
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Error from the underlying token library
    #[error("error in token: {0}")]
    Token(#[from] TokenError),
    #[error("underlying state error {0}")]
    State(#[from] StateError),
    /// Error from serialising a return value
    #[error("ipld encoding error: {0}")]
    Encoding(#[from] fvm_ipld_encoding::Error),
    #[error("actor runtime error {0}")]
    Actor(#[from] ActorError),
    #[error("missing parameters")]
    MissingParams,
    #[error("failed to deserialize params {0}")]
    InvalidParams(String),
    #[error("unknown method number {0}")]
    UnknownMethod(u64),
    #[error("constructor called by {0}, only the init actor may construct")]
    ConstructorCaller(ActorID),
    #[error("token already constructed at {0}")]
    AlreadyConstructed(Cid),
}

impl From<&RuntimeError> for ExitCode {
    fn from(error: &RuntimeError) -> Self {
        match error {
            RuntimeError::Token(e) => e.into(),
            RuntimeError::State(e) => e.into(),
            RuntimeError::Encoding(_)
            | RuntimeError::MissingParams
            | RuntimeError::InvalidParams(_) => ExitCode::USR_ILLEGAL_ARGUMENT,
            RuntimeError::Actor(ActorError::NoState(_)) => ExitCode::USR_NOT_FOUND,
            RuntimeError::UnknownMethod(_) => ExitCode::USR_UNHANDLED_MESSAGE,
            RuntimeError::ConstructorCaller(_) => ExitCode::USR_FORBIDDEN,
            RuntimeError::AlreadyConstructed(_) => ExitCode::USR_ILLEGAL_STATE,
        }
    }
}

type Result<T> = std::result::Result<T, RuntimeError>;

/// The system actor that deploys new actors and runs their constructors
pub const INIT_ACTOR_ID: ActorID = 1;

/// Method numbers exported by the token actor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum Method {
    Constructor = 1,
    GetName = 2,
    GetSymbol = 3,
    GetDecimal = 4,
    GetTotalSupply = 5,
    GetBalanceOf = 6,
    Transfer = 7,
    Allowance = 8,
    TransferFrom = 9,
    Approval = 10,
}

impl TryFrom<u64> for Method {
    type Error = RuntimeError;

    fn try_from(method_num: u64) -> Result<Self> {
        Ok(match method_num {
            1 => Method::Constructor,
            2 => Method::GetName,
            3 => Method::GetSymbol,
            4 => Method::GetDecimal,
            5 => Method::GetTotalSupply,
            6 => Method::GetBalanceOf,
            7 => Method::Transfer,
            8 => Method::Allowance,
            9 => Method::TransferFrom,
            10 => Method::Approval,
            _ => return Err(RuntimeError::UnknownMethod(method_num)),
        })
    }
}

#[derive(Serialize_tuple, Deserialize_tuple, Clone, Debug)]
pub struct ConstructorParams {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: u64,
    /// Account credited with the entire supply
    pub initial_owner: String,
}

/// Creates the ledger and commits it as the actor's first state root
///
/// Only the init actor may construct, and only while the actor has no state root.
pub fn construct_token<S: Syscalls, BS: Blockstore>(
    runtime: ActorRuntime<S, BS>,
    params: ConstructorParams,
) -> Result<Cid> {
    let caller = runtime.caller_id();
    if caller != INIT_ACTOR_ID {
        return Err(RuntimeError::ConstructorCaller(caller));
    }
    if let Ok(existing) = runtime.root_cid() {
        return Err(RuntimeError::AlreadyConstructed(existing));
    }

    let metadata = TokenMetadata {
        name: params.name,
        symbol: params.symbol,
        decimals: params.decimals,
        total_supply: params.total_supply,
    };
    let state = Token::<BS>::create_state(metadata, &params.initial_owner)?;
    let mut actor = Erc20Actor { runtime, state };
    let cid = actor.save()?;
    debug!(%cid, initial_owner = %params.initial_owner, "constructed token");
    Ok(cid)
}

/// The token actor: the ledger loaded for a single invocation plus the runtime it runs in
pub struct Erc20Actor<S: Syscalls, BS: Blockstore> {
    runtime: ActorRuntime<S, BS>,
    state: LedgerState,
}

impl<S: Syscalls, BS: Blockstore> Erc20Actor<S, BS> {
    /// Loads the ledger committed at the actor's current state root
    pub fn load(runtime: ActorRuntime<S, BS>) -> Result<Self> {
        let root_cid = runtime.root_cid()?;
        let state = LedgerState::load(runtime.bs(), &root_cid)?;
        Ok(Self { runtime, state })
    }

    /// Writes the ledger to the blockstore and commits it as the new state root
    pub fn save(&mut self) -> Result<Cid> {
        let cid = self.token().flush()?;
        self.runtime.set_root(&cid)?;
        Ok(cid)
    }

    pub fn token(&mut self) -> Token<'_, &BS> {
        Token::wrap(self.runtime.bs(), &mut self.state)
    }

    /// The calling account, as an ID address string
    fn caller(&self) -> String {
        self.runtime.caller_address().to_string()
    }
}

/// Implementation of the token API in a FVM actor
///
/// Here the Ipld parameter structs are marshalled and passed to the underlying library functions
impl<S: Syscalls, BS: Blockstore> ERC20Token for Erc20Actor<S, BS> {
    type TokenError = RuntimeError;

    fn name(&self) -> String {
        self.state.metadata.name.clone()
    }

    fn symbol(&self) -> String {
        self.state.metadata.symbol.clone()
    }

    fn decimals(&self) -> u8 {
        self.state.metadata.decimals
    }

    fn total_supply(&self) -> u64 {
        self.state.metadata.total_supply
    }

    fn balance_of(&mut self, params: BalanceOfParams) -> Result<u64> {
        validate_identifier(&params.addr, "addr")?;
        Ok(self.token().balance_of(&params.addr))
    }

    fn allowance(&mut self, params: AllowanceParams) -> Result<AllowanceReturn> {
        validate_identifier(&params.owner, "owner")?;
        validate_identifier(&params.spender, "spender")?;
        Ok(self.token().allowance(&params.owner, &params.spender))
    }

    fn transfer(&mut self, params: TransferParams) -> Result<TransferReturn> {
        let sender = self.caller();
        let ret = self.token().transfer(&sender, &params.receiver, params.amount)?;
        self.save()?;
        Ok(ret)
    }

    fn transfer_from(&mut self, params: TransferFromParams) -> Result<TransferFromReturn> {
        let spender = self.caller();
        let ret =
            self.token().transfer_from(&spender, &params.owner, &params.receiver, params.amount)?;
        self.save()?;
        Ok(ret)
    }

    fn approval(&mut self, params: ApprovalParams) -> Result<ApprovalReturn> {
        let owner = self.caller();
        let ret = self.token().increase_allowance(&owner, &params.spender, params.delta)?;
        self.save()?;
        Ok(ret)
    }
}

/// Invokes a method of the token actor
///
/// Possible returns:
/// - Ok(None) - the method has no return value (the constructor)
/// - Ok(Some(block)) - CBOR encoded confirmation string
/// - Err(error) - nothing was committed; the caller should abort with `ExitCode::from(&error)`
pub fn invoke_method<S: Syscalls, BS: Blockstore>(
    runtime: ActorRuntime<S, BS>,
    method_num: u64,
    params: Option<IpldBlock>,
) -> Result<Option<IpldBlock>> {
    dispatch(runtime, method_num, params).inspect_err(|err| {
        warn!(method_num, exit_code = ExitCode::from(err).value(), %err, "invocation rejected");
    })
}

fn dispatch<S: Syscalls, BS: Blockstore>(
    runtime: ActorRuntime<S, BS>,
    method_num: u64,
    params: Option<IpldBlock>,
) -> Result<Option<IpldBlock>> {
    let method = Method::try_from(method_num)?;
    if method == Method::Constructor {
        construct_token(runtime, unpack_params(params)?)?;
        return Ok(None);
    }

    let mut token_actor = Erc20Actor::load(runtime)?;
    let message = match method {
        Method::GetName => format!("Token name: {}", token_actor.name()),
        Method::GetSymbol => format!("Token symbol: {}", token_actor.symbol()),
        Method::GetDecimal => format!("Token decimal: {}", token_actor.decimals()),
        Method::GetTotalSupply => format!("Token total supply: {}", token_actor.total_supply()),
        Method::GetBalanceOf => {
            let balance = token_actor.balance_of(unpack_params(params)?)?;
            format!("Balance: {balance}")
        }
        Method::Allowance => token_actor.allowance(unpack_params(params)?)?.to_string(),
        Method::Transfer => token_actor.transfer(unpack_params(params)?)?.to_string(),
        Method::TransferFrom => token_actor.transfer_from(unpack_params(params)?)?.to_string(),
        Method::Approval => token_actor.approval(unpack_params(params)?)?.to_string(),
        Method::Constructor => return Err(RuntimeError::UnknownMethod(method_num)),
    };
    return_ipld(&message)
}

/// Deserialises the params block of a call into the method's tuple struct
pub fn unpack_params<O: DeserializeOwned>(params: Option<IpldBlock>) -> Result<O> {
    let params = params.ok_or(RuntimeError::MissingParams)?;
    params.deserialize().map_err(|e| RuntimeError::InvalidParams(e.to_string()))
}

/// Serialises a return value into a DAG-CBOR block
pub fn return_ipld<T>(value: &T) -> Result<Option<IpldBlock>>
where
    T: Serialize + ?Sized,
{
    Ok(IpldBlock::serialize_cbor(value)?)
}
