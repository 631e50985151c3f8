use std::rc::Rc;

use anyhow::Result;
use cid::Cid;
use fvm_ipld_blockstore::{Blockstore, MemoryBlockstore};

/// An in-memory blockstore whose clones all see the same blocks.
///
/// Each simulated invocation of an actor builds a fresh runtime. Handing every runtime a clone of
/// one `SharedMemoryBlockstore` lets state saved by one invocation be loaded by the next, which is
/// what the host's persistent storage does on chain.
#[derive(Debug, Clone, Default)]
pub struct SharedMemoryBlockstore {
    store: Rc<MemoryBlockstore>,
}

impl SharedMemoryBlockstore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Blockstore for SharedMemoryBlockstore {
    fn get(&self, k: &Cid) -> Result<Option<Vec<u8>>> {
        self.store.get(k)
    }

    fn put_keyed(&self, k: &Cid, block: &[u8]) -> Result<()> {
        self.store.put_keyed(k, block)
    }

    fn has(&self, k: &Cid) -> Result<bool> {
        self.store.has(k)
    }
}
