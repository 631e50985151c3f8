use anyhow::{bail, Context, Result};
use cid::Cid;
use fvm_ipld_blockstore::{Block, Blockstore};
use fvm_sdk::ipld;
use multihash_codetable::Code;

/// Ledger blocks are keyed by Blake2b-256, a 32 byte digest
const LEDGER_DIGEST_LEN: u32 = 32;

/// Block storage backed by the IPLD syscalls of the running actor.
///
/// Blocks written here are only reachable once the actor commits a root that links them.
#[derive(Default, Debug, Copy, Clone)]
pub struct SyscallBlockstore;

impl Blockstore for SyscallBlockstore {
    fn get(&self, cid: &Cid) -> Result<Option<Vec<u8>>> {
        match ipld::get(cid) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(code) => bail!("ipld::get of {cid} returned {code:?}"),
        }
    }

    fn put_keyed(&self, cid: &Cid, bytes: &[u8]) -> Result<()> {
        let hasher = Code::try_from(cid.hash().code())
            .with_context(|| format!("unsupported multihash in {cid}"))?;
        let stored = self.put(hasher, &Block::new(cid.codec(), bytes))?;
        if stored != *cid {
            bail!("block expected at {cid} was stored at {stored}");
        }
        Ok(())
    }

    fn put<D>(&self, hasher: Code, block: &Block<D>) -> Result<Cid>
    where
        D: AsRef<[u8]>,
    {
        let data = block.data.as_ref();
        ipld::put(hasher.into(), LEDGER_DIGEST_LEN, block.codec, data)
            .map_err(|code| anyhow::anyhow!("ipld::put of {} bytes returned {code:?}", data.len()))
    }
}
