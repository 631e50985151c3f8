use erc20_impl::invoke_method;
use fvm_actor_utils::{
    blockstore::SyscallBlockstore, syscalls::fvm_syscalls::FvmSyscalls, util::ActorRuntime,
};
use fvm_sdk::NO_DATA_BLOCK_ID;
use fvm_shared::error::ExitCode;

#[no_mangle]
pub fn invoke(params: u32) -> u32 {
    std::panic::set_hook(Box::new(|info| {
        fvm_sdk::vm::abort(ExitCode::USR_ASSERTION_FAILED.value(), Some(&format!("{info}")))
    }));

    let method_num = fvm_sdk::message::method_number();
    let params = match fvm_sdk::message::params_raw(params) {
        Ok(params) => params,
        Err(e) => fvm_sdk::vm::abort(
            ExitCode::USR_ILLEGAL_ARGUMENT.value(),
            Some(&format!("failed to get raw params {e}")),
        ),
    };

    let runtime = ActorRuntime::<FvmSyscalls, SyscallBlockstore>::new_fvm_runtime();
    match invoke_method(runtime, method_num, params) {
        Ok(Some(ret)) => match fvm_sdk::ipld::put_block(ret.codec, ret.data.as_slice()) {
            Ok(block_id) => block_id,
            Err(e) => fvm_sdk::vm::abort(
                ExitCode::USR_SERIALIZATION.value(),
                Some(&format!("failed to store return data {e}")),
            ),
        },
        Ok(None) => NO_DATA_BLOCK_ID,
        Err(err) => fvm_sdk::vm::abort(ExitCode::from(&err).value(), Some(&err.to_string())),
    }
}
