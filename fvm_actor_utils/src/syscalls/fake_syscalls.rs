use std::cell::RefCell;
use std::rc::Rc;

use cid::Cid;
use fvm_ipld_blockstore::{Blockstore, MemoryBlockstore};
use fvm_shared::ActorID;

use super::{NoStateError, Syscalls};
use crate::util::ActorRuntime;

/// A fake execution environment that can be twiddled for testing
///
/// Clones share the state root, so a clone handed to each simulated invocation sees the root
/// committed by the previous one. The caller is per clone.
#[derive(Clone, Default, Debug)]
pub struct FakeSyscalls {
    /// The state root of the actor, `None` until the first `set_root`
    pub root: Rc<RefCell<Option<Cid>>>,
    /// The f0 ID reported as the sender of the current message
    pub caller: RefCell<ActorID>,
}

impl FakeSyscalls {
    /// Make subsequent calls appear to come from `caller`
    pub fn set_caller(&self, caller: ActorID) {
        self.caller.replace(caller);
    }
}

impl Syscalls for FakeSyscalls {
    fn root(&self) -> Result<Cid, NoStateError> {
        self.root.borrow().ok_or(NoStateError)
    }

    fn set_root(&self, cid: &Cid) -> Result<(), NoStateError> {
        self.root.replace(Some(*cid));
        Ok(())
    }

    fn caller(&self) -> ActorID {
        *self.caller.borrow()
    }
}

impl<BS: Blockstore> ActorRuntime<FakeSyscalls, BS> {
    pub fn new_test_runtime() -> ActorRuntime<FakeSyscalls, MemoryBlockstore> {
        ActorRuntime { syscalls: FakeSyscalls::default(), blockstore: MemoryBlockstore::default() }
    }
}
