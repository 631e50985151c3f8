use cid::Cid;
use fvm_shared::ActorID;
use thiserror::Error;

pub mod fake_syscalls;
pub mod fvm_syscalls;

/// Mirrors `fvm_sdk::error::NoStateError` so non-WASM code need not depend on the sdk error types
#[derive(Copy, Clone, Debug, Error)]
#[error("actor does not exist in state-tree")]
pub struct NoStateError;

/// The Syscalls trait defines the parts of the execution environment a single-state actor uses.
///
/// The methods available are a subset of the methods exported by `fvm_sdk`
pub trait Syscalls {
    /// Get the IPLD root CID. Fails if the actor doesn't have state (before the first call to
    /// `set_root` and after actor deletion).
    fn root(&self) -> Result<Cid, NoStateError>;

    /// Replace the IPLD root CID, committing a new state for the actor
    fn set_root(&self, cid: &Cid) -> Result<(), NoStateError>;

    /// Returns the ID address of the account that sent the current message
    fn caller(&self) -> ActorID;
}
