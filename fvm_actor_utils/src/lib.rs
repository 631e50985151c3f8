pub mod blockstore;
pub mod shared_blockstore;
pub mod syscalls;
pub mod util;
