use fvm_shared::error::ExitCode;
use thiserror::Error;

use crate::token::state::StateError as TokenStateError;
use crate::token::state::StateInvariantError;

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("error in underlying state {0}")]
    TokenState(#[from] TokenStateError),
    #[error("value for {name:?} must be greater than zero")]
    ZeroAmount { name: &'static str },
    #[error("constructor parameter {name:?} must not be zero")]
    ZeroParameter { name: &'static str },
    #[error("identifier for {name:?} must not be empty")]
    EmptyIdentifier { name: &'static str },
    #[error("error in state invariants {0}")]
    StateInvariant(#[from] StateInvariantError),
}

impl From<&TokenError> for ExitCode {
    fn from(error: &TokenError) -> Self {
        match error {
            TokenError::ZeroAmount { name: _ } => ExitCode::USR_ASSERTION_FAILED,
            TokenError::EmptyIdentifier { name: _ } | TokenError::ZeroParameter { name: _ } => {
                ExitCode::USR_ILLEGAL_ARGUMENT
            }
            TokenError::StateInvariant(_) => ExitCode::USR_ILLEGAL_STATE,
            TokenError::TokenState(state_error) => ExitCode::from(state_error),
        }
    }
}

impl From<&TokenStateError> for ExitCode {
    fn from(error: &TokenStateError) -> Self {
        match error {
            TokenStateError::MissingState(_) | TokenStateError::Serialization(_) => {
                ExitCode::USR_ILLEGAL_ARGUMENT
            }
            TokenStateError::InvalidState(_) => ExitCode::USR_ILLEGAL_STATE,
            TokenStateError::InsufficientBalance { owner: _, balance: _, delta: _ }
            | TokenStateError::InsufficientAllowance {
                owner: _,
                spender: _,
                allowance: _,
                delta: _,
            }
            | TokenStateError::BalanceOverflow { owner: _, balance: _, delta: _ }
            | TokenStateError::AllowanceOverflow { owner: _, spender: _, allowance: _, delta: _ } => {
                ExitCode::USR_ASSERTION_FAILED
            }
        }
    }
}
