use cid::Cid;
use erc20_impl::{invoke_method, ConstructorParams, Method, RuntimeError, INIT_ACTOR_ID};
use erc20_token::token::state::LedgerState;
use erc20_token::token::types::{
    AllowanceParams, ApprovalParams, BalanceOfParams, TransferFromParams, TransferParams,
};
use fvm_actor_utils::shared_blockstore::SharedMemoryBlockstore;
use fvm_actor_utils::syscalls::fake_syscalls::FakeSyscalls;
use fvm_actor_utils::syscalls::Syscalls;
use fvm_actor_utils::util::ActorRuntime;
use fvm_ipld_encoding::ipld_block::IpldBlock;
use fvm_shared::address::Address;
use fvm_shared::error::ExitCode;
use fvm_shared::ActorID;
use serde::Serialize;

const ADDR_A: ActorID = 100;
const ADDR_B: ActorID = 101;
const ADDR_C: ActorID = 102;
const ADDR_D: ActorID = 103;

/// Simulates successive invocations of one deployed token actor
struct TestEnv {
    syscalls: FakeSyscalls,
    bs: SharedMemoryBlockstore,
}

impl TestEnv {
    fn new() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
        Self { syscalls: FakeSyscalls::default(), bs: SharedMemoryBlockstore::new() }
    }

    fn call<P: Serialize>(
        &self,
        caller: ActorID,
        method: Method,
        params: Option<P>,
    ) -> Result<Option<IpldBlock>, RuntimeError> {
        let syscalls = self.syscalls.clone();
        syscalls.set_caller(caller);
        let runtime = ActorRuntime::new(syscalls, self.bs.clone());
        let params = match params {
            Some(p) => IpldBlock::serialize_cbor(&p).unwrap(),
            None => None,
        };
        invoke_method(runtime, method as u64, params)
    }

    fn call_ok<P: Serialize>(&self, caller: ActorID, method: Method, params: Option<P>) -> String {
        let ret = self.call(caller, method, params).unwrap().unwrap();
        ret.deserialize::<String>().unwrap()
    }

    fn expect_exit_code<P: Serialize>(
        &self,
        caller: ActorID,
        method: Method,
        params: Option<P>,
        expected: ExitCode,
    ) {
        let root = self.root();
        let err = self.call(caller, method, params).unwrap_err();
        assert_eq!(ExitCode::from(&err), expected, "{err}");
        // a failed invocation commits nothing
        assert_eq!(self.root(), root);
    }

    fn root(&self) -> Option<Cid> {
        self.syscalls.root().ok()
    }

    fn state(&self) -> LedgerState {
        LedgerState::load(&self.bs, &self.syscalls.root().unwrap()).unwrap()
    }

    fn construct(&self, total_supply: u64) {
        let ret = self
            .call(INIT_ACTOR_ID, Method::Constructor, Some(constructor_params(total_supply)))
            .unwrap();
        assert!(ret.is_none());
    }

    fn balance(&self, account: ActorID) -> String {
        self.call_ok(ADDR_A, Method::GetBalanceOf, Some(BalanceOfParams { addr: addr(account) }))
    }
}

fn addr(id: ActorID) -> String {
    Address::new_id(id).to_string()
}

fn constructor_params(total_supply: u64) -> ConstructorParams {
    ConstructorParams {
        name: "Zondax Coin".into(),
        symbol: "ZDX".into(),
        decimals: 18,
        total_supply,
        initial_owner: addr(ADDR_A),
    }
}

const NO_PARAMS: Option<()> = None;

#[test]
fn it_runs_the_zondax_scenario() {
    let env = TestEnv::new();
    env.construct(1_000_000);

    assert_eq!(env.call_ok(ADDR_A, Method::GetName, NO_PARAMS), "Token name: Zondax Coin");
    assert_eq!(env.call_ok(ADDR_A, Method::GetSymbol, NO_PARAMS), "Token symbol: ZDX");
    assert_eq!(env.call_ok(ADDR_A, Method::GetDecimal, NO_PARAMS), "Token decimal: 18");
    assert_eq!(
        env.call_ok(ADDR_A, Method::GetTotalSupply, NO_PARAMS),
        "Token total supply: 1000000"
    );
    assert_eq!(env.balance(ADDR_A), "Balance: 1000000");

    let ret = env.call_ok(
        ADDR_A,
        Method::Transfer,
        Some(TransferParams { receiver: addr(ADDR_B), amount: 500 }),
    );
    assert_eq!(ret, format!("from {} to {} amount 500", addr(ADDR_A), addr(ADDR_B)));
    assert_eq!(env.balance(ADDR_A), "Balance: 999500");
    assert_eq!(env.balance(ADDR_B), "Balance: 500");

    let ret = env.call_ok(
        ADDR_A,
        Method::Approval,
        Some(ApprovalParams { spender: addr(ADDR_C), delta: 1_000 }),
    );
    assert_eq!(ret, format!("approval {} -> {} for 1000", addr(ADDR_A), addr(ADDR_C)));
    let allowance_params = AllowanceParams { owner: addr(ADDR_A), spender: addr(ADDR_C) };
    assert_eq!(
        env.call_ok(ADDR_B, Method::Allowance, Some(allowance_params.clone())),
        format!("Allowance for {} by {}: 1000", addr(ADDR_C), addr(ADDR_A))
    );

    let transfer_from =
        TransferFromParams { owner: addr(ADDR_A), receiver: addr(ADDR_D), amount: 500 };
    let ret = env.call_ok(ADDR_C, Method::TransferFrom, Some(transfer_from.clone()));
    assert_eq!(
        ret,
        format!(
            "{} moved 500 from {} to {}, remaining allowance 500",
            addr(ADDR_C),
            addr(ADDR_A),
            addr(ADDR_D)
        )
    );
    assert_eq!(
        env.call_ok(ADDR_B, Method::Allowance, Some(allowance_params)),
        format!("Allowance for {} by {}: 500", addr(ADDR_C), addr(ADDR_A))
    );
    assert_eq!(env.balance(ADDR_D), "Balance: 500");

    // exceeds the remaining allowance
    env.expect_exit_code(
        ADDR_C,
        Method::TransferFrom,
        Some(TransferFromParams { amount: 600, ..transfer_from }),
        ExitCode::USR_ASSERTION_FAILED,
    );
    assert_eq!(env.balance(ADDR_D), "Balance: 500");

    let state = env.state();
    assert_eq!(state.count_balances(), 3);
    let (summary, errors) = state.check_invariants();
    assert!(errors.is_empty(), "{errors:?}");
    assert_eq!(summary.total_supply, 1_000_000);
}

#[test]
fn failed_calls_leave_the_root_unchanged() {
    let env = TestEnv::new();
    env.construct(100);
    let root = env.root();
    assert!(root.is_some());

    env.expect_exit_code(
        ADDR_A,
        Method::Transfer,
        Some(TransferParams { receiver: addr(ADDR_B), amount: 0 }),
        ExitCode::USR_ASSERTION_FAILED,
    );
    env.expect_exit_code(
        ADDR_A,
        Method::Transfer,
        Some(TransferParams { receiver: addr(ADDR_B), amount: 101 }),
        ExitCode::USR_ASSERTION_FAILED,
    );
    env.expect_exit_code(
        ADDR_B,
        Method::Transfer,
        Some(TransferParams { receiver: addr(ADDR_A), amount: 1 }),
        ExitCode::USR_ASSERTION_FAILED,
    );
    env.expect_exit_code(
        ADDR_A,
        Method::Approval,
        Some(ApprovalParams { spender: addr(ADDR_B), delta: 0 }),
        ExitCode::USR_ASSERTION_FAILED,
    );
    // no allowance was ever granted
    env.expect_exit_code(
        ADDR_B,
        Method::TransferFrom,
        Some(TransferFromParams { owner: addr(ADDR_A), receiver: addr(ADDR_B), amount: 1 }),
        ExitCode::USR_ASSERTION_FAILED,
    );

    assert_eq!(env.root(), root);
    assert_eq!(env.balance(ADDR_A), "Balance: 100");
}

#[test]
fn transfer_from_needs_both_balance_and_allowance() {
    let env = TestEnv::new();
    env.construct(100);

    let params = TransferParams { receiver: addr(ADDR_B), amount: 50 };
    env.call_ok(ADDR_A, Method::Transfer, Some(params));
    let params = ApprovalParams { spender: addr(ADDR_C), delta: 10 };
    env.call_ok(ADDR_B, Method::Approval, Some(params));

    // within the owner's balance but over the allowance
    env.expect_exit_code(
        ADDR_C,
        Method::TransferFrom,
        Some(TransferFromParams { owner: addr(ADDR_B), receiver: addr(ADDR_C), amount: 20 }),
        ExitCode::USR_ASSERTION_FAILED,
    );

    // within the allowance but over the owner's balance
    let params = ApprovalParams { spender: addr(ADDR_C), delta: 100 };
    env.call_ok(ADDR_B, Method::Approval, Some(params));
    env.expect_exit_code(
        ADDR_C,
        Method::TransferFrom,
        Some(TransferFromParams { owner: addr(ADDR_B), receiver: addr(ADDR_C), amount: 60 }),
        ExitCode::USR_ASSERTION_FAILED,
    );

    env.call_ok(
        ADDR_C,
        Method::TransferFrom,
        Some(TransferFromParams { owner: addr(ADDR_B), receiver: addr(ADDR_C), amount: 50 }),
    );
    assert_eq!(env.balance(ADDR_B), "Balance: 0");
    assert_eq!(env.balance(ADDR_C), "Balance: 50");
    assert_eq!(env.state().get_allowance(&addr(ADDR_B), &addr(ADDR_C)), 60);
}

#[test]
fn it_rejects_malformed_invocations() {
    let env = TestEnv::new();

    // nothing to query before construction
    env.expect_exit_code(ADDR_A, Method::GetName, NO_PARAMS, ExitCode::USR_NOT_FOUND);

    // constructor validation
    env.expect_exit_code(
        INIT_ACTOR_ID,
        Method::Constructor,
        Some(ConstructorParams { name: String::new(), ..constructor_params(1) }),
        ExitCode::USR_ILLEGAL_ARGUMENT,
    );
    env.expect_exit_code(
        INIT_ACTOR_ID,
        Method::Constructor,
        Some(constructor_params(0)),
        ExitCode::USR_ILLEGAL_ARGUMENT,
    );
    env.expect_exit_code(
        INIT_ACTOR_ID,
        Method::Constructor,
        Some(ConstructorParams { decimals: 0, ..constructor_params(1) }),
        ExitCode::USR_ILLEGAL_ARGUMENT,
    );
    env.expect_exit_code(
        INIT_ACTOR_ID,
        Method::Constructor,
        NO_PARAMS,
        ExitCode::USR_ILLEGAL_ARGUMENT,
    );
    assert!(env.root().is_none());

    env.construct(100);

    let runtime = ActorRuntime::new(env.syscalls.clone(), env.bs.clone());
    let err = invoke_method(runtime, 42, None).unwrap_err();
    assert_eq!(ExitCode::from(&err), ExitCode::USR_UNHANDLED_MESSAGE);

    // missing params
    env.expect_exit_code(ADDR_A, Method::Transfer, NO_PARAMS, ExitCode::USR_ILLEGAL_ARGUMENT);
    // wrong arity
    env.expect_exit_code(
        ADDR_A,
        Method::Transfer,
        Some((addr(ADDR_B),)),
        ExitCode::USR_ILLEGAL_ARGUMENT,
    );
    // wrong types
    env.expect_exit_code(
        ADDR_A,
        Method::Transfer,
        Some((addr(ADDR_B), "10")),
        ExitCode::USR_ILLEGAL_ARGUMENT,
    );
    // empty identifiers
    env.expect_exit_code(
        ADDR_A,
        Method::Transfer,
        Some(TransferParams { receiver: String::new(), amount: 1 }),
        ExitCode::USR_ILLEGAL_ARGUMENT,
    );
    env.expect_exit_code(
        ADDR_A,
        Method::GetBalanceOf,
        Some(BalanceOfParams { addr: String::new() }),
        ExitCode::USR_ILLEGAL_ARGUMENT,
    );
}

#[test]
fn it_can_only_be_constructed_once() {
    let env = TestEnv::new();

    // only the init actor runs the constructor
    env.expect_exit_code(
        ADDR_A,
        Method::Constructor,
        Some(constructor_params(10)),
        ExitCode::USR_FORBIDDEN,
    );
    assert!(env.root().is_none());

    env.construct(100);
    let root = env.root();
    let params = TransferParams { receiver: addr(ADDR_B), amount: 40 };
    env.call_ok(ADDR_A, Method::Transfer, Some(params));
    assert_ne!(env.root(), root);
    let root = env.root();

    env.expect_exit_code(
        INIT_ACTOR_ID,
        Method::Constructor,
        Some(constructor_params(100)),
        ExitCode::USR_ILLEGAL_STATE,
    );
    let hijack = ConstructorParams { initial_owner: addr(666), ..constructor_params(u64::MAX) };
    env.expect_exit_code(666, Method::Constructor, Some(hijack), ExitCode::USR_FORBIDDEN);

    assert_eq!(env.root(), root);
    assert_eq!(env.balance(ADDR_A), "Balance: 60");
    assert_eq!(env.balance(ADDR_B), "Balance: 40");
    assert_eq!(env.balance(666), "Balance: 0");
    assert_eq!(env.call_ok(ADDR_A, Method::GetTotalSupply, NO_PARAMS), "Token total supply: 100");
}

#[test]
fn approvals_accumulate_across_invocations() {
    let env = TestEnv::new();
    env.construct(10);

    let params = ApprovalParams { spender: addr(ADDR_B), delta: 3 };
    env.call_ok(ADDR_A, Method::Approval, Some(params));
    let ret = env.call_ok(
        ADDR_A,
        Method::Approval,
        Some(ApprovalParams { spender: addr(ADDR_B), delta: 4 }),
    );
    assert_eq!(ret, format!("approval {} -> {} for 7", addr(ADDR_A), addr(ADDR_B)));

    // the reverse direction is a different allowance
    assert_eq!(
        env.call_ok(
            ADDR_A,
            Method::Allowance,
            Some(AllowanceParams { owner: addr(ADDR_B), spender: addr(ADDR_A) })
        ),
        format!("Allowance for {} by {}: 0", addr(ADDR_A), addr(ADDR_B))
    );

    env.call_ok(
        ADDR_A,
        Method::Approval,
        Some(ApprovalParams { spender: addr(ADDR_C), delta: u64::MAX }),
    );
    env.expect_exit_code(
        ADDR_A,
        Method::Approval,
        Some(ApprovalParams { spender: addr(ADDR_C), delta: 1 }),
        ExitCode::USR_ASSERTION_FAILED,
    );
}

#[test]
fn self_transfers_do_not_create_tokens() {
    let env = TestEnv::new();
    env.construct(10);

    let params = TransferParams { receiver: addr(ADDR_A), amount: 10 };
    env.call_ok(ADDR_A, Method::Transfer, Some(params));
    assert_eq!(env.balance(ADDR_A), "Balance: 10");
    env.expect_exit_code(
        ADDR_A,
        Method::Transfer,
        Some(TransferParams { receiver: addr(ADDR_A), amount: 11 }),
        ExitCode::USR_ASSERTION_FAILED,
    );
    assert!(env.state().check_invariants().1.is_empty());
}
