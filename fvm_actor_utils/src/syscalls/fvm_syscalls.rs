use fvm_ipld_blockstore::Blockstore;
use fvm_sdk;

use super::{NoStateError, Syscalls};
use crate::util::ActorRuntime;

/// Runtime that delegates to fvm_sdk allowing actors to be deployed on-chain
#[derive(Default, Debug, Clone, Copy)]
pub struct FvmSyscalls {}

impl Syscalls for FvmSyscalls {
    fn root(&self) -> Result<cid::Cid, NoStateError> {
        fvm_sdk::sself::root().map_err(|_| NoStateError)
    }

    fn set_root(&self, cid: &cid::Cid) -> Result<(), NoStateError> {
        fvm_sdk::sself::set_root(cid).map_err(|_| NoStateError)
    }

    fn caller(&self) -> fvm_shared::ActorID {
        fvm_sdk::message::caller()
    }
}

impl<S: Syscalls, BS: Blockstore> ActorRuntime<S, BS> {
    pub fn new_fvm_runtime() -> ActorRuntime<FvmSyscalls, crate::blockstore::SyscallBlockstore> {
        ActorRuntime {
            syscalls: FvmSyscalls::default(),
            blockstore: crate::blockstore::SyscallBlockstore::default(),
        }
    }
}
