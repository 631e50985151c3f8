use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use fvm_shared::address::Address;
use fvm_shared::ActorID;
use thiserror::Error;

use crate::syscalls::NoStateError;
use crate::syscalls::Syscalls;

#[derive(Error, Clone, Debug)]
pub enum ActorError {
    #[error("root state not found {0}")]
    NoState(#[from] NoStateError),
}

type ActorResult<T> = std::result::Result<T, ActorError>;

/// ActorRuntime bundles the services an actor needs from its execution environment: syscalls for
/// message context and the state root, and a blockstore to persist state blocks.
///
/// Swapping `FvmSyscalls` for `FakeSyscalls` (and the syscall blockstore for a memory one) is all
/// it takes to run actor logic natively under test.
#[derive(Clone, Debug)]
pub struct ActorRuntime<S: Syscalls, BS: Blockstore> {
    pub syscalls: S,
    pub blockstore: BS,
}

impl<S: Syscalls, BS: Blockstore> ActorRuntime<S, BS> {
    pub fn new(syscalls: S, blockstore: BS) -> Self {
        Self { syscalls, blockstore }
    }

    /// Returns the ActorID of the account that sent the current message
    pub fn caller_id(&self) -> ActorID {
        self.syscalls.caller()
    }

    /// Returns the caller as an ID address
    pub fn caller_address(&self) -> Address {
        Address::new_id(self.caller_id())
    }

    /// Get the root cid of the actor's state
    pub fn root_cid(&self) -> ActorResult<Cid> {
        Ok(self.syscalls.root()?)
    }

    /// Commit a new root cid for the actor's state
    pub fn set_root(&self, cid: &Cid) -> ActorResult<()> {
        Ok(self.syscalls.set_root(cid)?)
    }

    pub fn bs(&self) -> &BS {
        &self.blockstore
    }
}

#[cfg(test)]
mod test {
    use fvm_ipld_blockstore::MemoryBlockstore;
    use fvm_shared::address::Address;

    use crate::syscalls::fake_syscalls::FakeSyscalls;
    use crate::util::ActorRuntime;

    #[test]
    fn it_renders_the_caller_as_an_id_address() {
        let runtime = ActorRuntime::<FakeSyscalls, MemoryBlockstore>::new_test_runtime();
        runtime.syscalls.set_caller(1234);
        assert_eq!(runtime.caller_address(), Address::new_id(1234));
        assert_eq!(runtime.caller_address().id().unwrap(), 1234);
    }

    #[test]
    fn it_tracks_the_state_root() {
        let runtime = ActorRuntime::<FakeSyscalls, MemoryBlockstore>::new_test_runtime();
        let cid = cid::Cid::default();
        runtime.set_root(&cid).unwrap();
        assert_eq!(runtime.root_cid().unwrap(), cid);
    }
}
