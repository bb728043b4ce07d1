use cosmwasm_std::{
    entry_point, to_json_binary, BankMsg, Binary, Coin, Deps, DepsMut, Env, Event, MessageInfo,
    Reply, Response, StdError, StdResult, Storage, SubMsg, SubMsgResult, Uint128, WasmMsg,
};
use cw2::set_contract_version;

use automation_registry::msg::{ExecuteMsg as RegistryExecuteMsg, TASK_CREATED_EVENT};
use recurring_shared::{
    attribute_value, paid_amount, PlanParams, CONTRACT_ADDRESS_ATTR, MIN_INTERVAL,
};

use crate::error::ContractError;
use crate::msg::{
    CheckPaymentResponse, ExecuteMsg, InstantiateMsg, NextPaymentTimeResponse, PlanResponse,
    QueryMsg, StatusResponse,
};
use crate::state::{AutomationTask, Config, Plan, PlanStatus, CONFIG, PLAN, TASK};

const CONTRACT_NAME: &str = "crates.io:payment-plan";
const CONTRACT_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const REGISTER_TASK_REPLY_ID: u64 = 1;

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn instantiate(
    deps: DepsMut,
    _env: Env,
    info: MessageInfo,
    msg: InstantiateMsg,
) -> Result<Response, ContractError> {
    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;

    let config = Config {
        factory: info.sender,
        automation: deps.api.addr_validate(&msg.automation)?,
        denom: msg.denom,
    };
    CONFIG.save(deps.storage, &config)?;

    Ok(Response::new()
        .add_attribute("method", "instantiate")
        .add_attribute("factory", config.factory)
        .add_attribute("automation", config.automation)
        .add_attribute("denom", config.denom))
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn execute(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    msg: ExecuteMsg,
) -> Result<Response, ContractError> {
    match msg {
        ExecuteMsg::Initialize {
            payer,
            recipient,
            amount,
            interval,
            start_time,
            title,
        } => {
            let params = PlanParams {
                recipient,
                amount,
                interval,
                start_time,
                title,
            };
            execute_initialize(deps, env, info, payer, params)
        }
        ExecuteMsg::AddFunds {} => execute_add_funds(deps, env, info),
        ExecuteMsg::Deposit {} => execute_deposit(deps, env, info),
        ExecuteMsg::ExecutePayment {} => execute_payment(deps, env, info),
        ExecuteMsg::SetAmount { amount } => execute_set_amount(deps, env, info, amount),
        ExecuteMsg::SetInterval { interval } => execute_set_interval(deps, env, info, interval),
        ExecuteMsg::PausePlan {} => execute_pause_plan(deps, env, info),
        ExecuteMsg::ResumePlan {} => execute_resume_plan(deps, env, info),
        ExecuteMsg::CancelPlan {} => execute_cancel_plan(deps, env, info),
    }
}

fn load_plan(storage: &dyn Storage) -> Result<Plan, ContractError> {
    PLAN.may_load(storage)?.ok_or(ContractError::NotInitialized {})
}

fn ensure_payer(plan: &Plan, info: &MessageInfo) -> Result<(), ContractError> {
    if info.sender != plan.payer {
        return Err(ContractError::Unauthorized {});
    }
    Ok(())
}

pub fn execute_initialize(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    payer: String,
    params: PlanParams,
) -> Result<Response, ContractError> {
    if PLAN.may_load(deps.storage)?.is_some() {
        return Err(ContractError::AlreadyInitialized {});
    }

    let config = CONFIG.load(deps.storage)?;
    let payer = deps.api.addr_validate(&payer)?;
    let funding = paid_amount(&info.funds, &config.denom)?;
    let recipient = params.validate(deps.api, env.block.time.seconds(), funding)?;

    let plan = Plan {
        payer,
        recipient,
        amount: params.amount,
        interval: params.interval,
        start_time: params.start_time,
        last_paid: 0,
        total_payments: 0,
        status: PlanStatus::Active,
        title: params.title,
        balance: funding,
    };
    PLAN.save(deps.storage, &plan)?;

    let register = WasmMsg::Execute {
        contract_addr: config.automation.to_string(),
        msg: to_json_binary(&RegistryExecuteMsg::CreateTask {
            target: env.contract.address.to_string(),
            exec_msg: to_json_binary(&ExecuteMsg::ExecutePayment {})?,
        })?,
        funds: vec![],
    };

    Ok(Response::new()
        .add_submessage(SubMsg::reply_on_success(register, REGISTER_TASK_REPLY_ID))
        .add_attribute("method", "initialize")
        .add_attribute("payer", plan.payer)
        .add_attribute("recipient", plan.recipient)
        .add_attribute("amount", plan.amount)
        .add_attribute("interval", plan.interval.to_string())
        .add_attribute("start_time", plan.start_time.to_string())
        .add_attribute("balance", plan.balance))
}

/// Credits the attached funds to the plan escrow
fn credit_funds(deps: DepsMut, info: &MessageInfo) -> Result<(Plan, Uint128), ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let mut plan = load_plan(deps.storage)?;

    let amount = paid_amount(&info.funds, &config.denom)?;
    if amount.is_zero() {
        return Err(ContractError::NoFunds {});
    }
    plan.ensure_not_canceled()?;

    plan.balance = plan.balance.checked_add(amount)?;
    PLAN.save(deps.storage, &plan)?;
    Ok((plan, amount))
}

fn funding_event(
    ty: &str,
    env: &Env,
    info: &MessageInfo,
    plan: &Plan,
    amount: Uint128,
) -> Event {
    let event = Event::new(ty)
        .add_attribute("plan", env.contract.address.clone())
        .add_attribute("payer", plan.payer.clone())
        .add_attribute("sender", info.sender.clone())
        .add_attribute("amount", amount)
        .add_attribute("timestamp", env.block.time.seconds().to_string());

    // Attribute values must not be empty
    if plan.title.is_empty() {
        event
    } else {
        event.add_attribute("title", plan.title.clone())
    }
}

pub fn execute_add_funds(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
) -> Result<Response, ContractError> {
    let (plan, amount) = credit_funds(deps, &info)?;

    Ok(Response::new()
        .add_attribute("method", "add_funds")
        .add_attribute("balance", plan.balance)
        .add_event(funding_event("funds_added", &env, &info, &plan, amount)))
}

pub fn execute_deposit(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
) -> Result<Response, ContractError> {
    let (plan, amount) = credit_funds(deps, &info)?;

    Ok(Response::new()
        .add_attribute("method", "deposit")
        .add_attribute("balance", plan.balance)
        .add_event(funding_event("funds_received", &env, &info, &plan, amount)))
}

pub fn execute_payment(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
) -> Result<Response, ContractError> {
    let task = TASK.may_load(deps.storage)?;
    if task.map(|task| task.dedicated_caller) != Some(info.sender) {
        return Err(ContractError::NotDedicatedCaller {});
    }

    let config = CONFIG.load(deps.storage)?;
    let mut plan = load_plan(deps.storage)?;
    let now = env.block.time.seconds();
    plan.ensure_payable(now)?;

    plan.balance = plan.balance.checked_sub(plan.amount)?;
    plan.last_paid = now;
    plan.total_payments += 1;
    PLAN.save(deps.storage, &plan)?;

    let payment = BankMsg::Send {
        to_address: plan.recipient.to_string(),
        amount: vec![Coin {
            denom: config.denom,
            amount: plan.amount,
        }],
    };

    Ok(Response::new()
        .add_message(payment)
        .add_attribute("method", "execute_payment")
        .add_attribute("total_payments", plan.total_payments.to_string())
        .add_attribute("balance", plan.balance)
        .add_event(
            Event::new("payment_executed")
                .add_attribute("plan", env.contract.address)
                .add_attribute("payer", plan.payer)
                .add_attribute("recipient", plan.recipient)
                .add_attribute("amount", plan.amount)
                .add_attribute("timestamp", now.to_string()),
        ))
}

pub fn execute_set_amount(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    amount: Uint128,
) -> Result<Response, ContractError> {
    let mut plan = load_plan(deps.storage)?;
    ensure_payer(&plan, &info)?;
    plan.ensure_not_canceled()?;

    if amount.is_zero() {
        return Err(ContractError::InvalidAmount {});
    }

    let old_amount = plan.amount;
    plan.amount = amount;
    PLAN.save(deps.storage, &plan)?;

    Ok(Response::new()
        .add_attribute("method", "set_amount")
        .add_event(
            Event::new("amount_updated")
                .add_attribute("plan", env.contract.address)
                .add_attribute("old_amount", old_amount)
                .add_attribute("new_amount", amount),
        ))
}

pub fn execute_set_interval(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    interval: u64,
) -> Result<Response, ContractError> {
    let mut plan = load_plan(deps.storage)?;
    ensure_payer(&plan, &info)?;
    plan.ensure_not_canceled()?;

    if interval < MIN_INTERVAL {
        return Err(ContractError::InvalidInterval {});
    }

    let old_interval = plan.interval;
    plan.interval = interval;
    PLAN.save(deps.storage, &plan)?;

    Ok(Response::new()
        .add_attribute("method", "set_interval")
        .add_event(
            Event::new("interval_updated")
                .add_attribute("plan", env.contract.address)
                .add_attribute("old_interval", old_interval.to_string())
                .add_attribute("new_interval", interval.to_string()),
        ))
}

pub fn execute_pause_plan(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
) -> Result<Response, ContractError> {
    let mut plan = load_plan(deps.storage)?;
    ensure_payer(&plan, &info)?;

    match plan.status {
        PlanStatus::Active => plan.status = PlanStatus::Paused,
        PlanStatus::Paused => return Err(ContractError::AlreadyPaused {}),
        PlanStatus::Canceled => return Err(ContractError::Canceled {}),
    }
    PLAN.save(deps.storage, &plan)?;

    Ok(Response::new()
        .add_attribute("method", "pause_plan")
        .add_event(Event::new("plan_paused").add_attribute("plan", env.contract.address)))
}

pub fn execute_resume_plan(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
) -> Result<Response, ContractError> {
    let mut plan = load_plan(deps.storage)?;
    ensure_payer(&plan, &info)?;

    if plan.status != PlanStatus::Paused {
        return Err(ContractError::NotPaused {});
    }
    plan.status = PlanStatus::Active;
    PLAN.save(deps.storage, &plan)?;

    Ok(Response::new()
        .add_attribute("method", "resume_plan")
        .add_event(Event::new("plan_unpaused").add_attribute("plan", env.contract.address)))
}

pub fn execute_cancel_plan(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let mut plan = load_plan(deps.storage)?;
    ensure_payer(&plan, &info)?;

    if plan.status == PlanStatus::Canceled {
        return Err(ContractError::AlreadyCanceled {});
    }

    let refund = plan.balance;
    plan.balance = Uint128::zero();
    plan.status = PlanStatus::Canceled;
    PLAN.save(deps.storage, &plan)?;

    let mut response = Response::new();
    if !refund.is_zero() {
        response = response.add_message(BankMsg::Send {
            to_address: plan.payer.to_string(),
            amount: vec![Coin {
                denom: config.denom,
                amount: refund,
            }],
        });
    }
    if let Some(task) = TASK.may_load(deps.storage)? {
        response = response.add_message(WasmMsg::Execute {
            contract_addr: config.automation.to_string(),
            msg: to_json_binary(&RegistryExecuteMsg::CancelTask {
                task_id: task.task_id,
            })?,
            funds: vec![],
        });
    }

    Ok(response
        .add_attribute("method", "cancel_plan")
        .add_event(
            Event::new("plan_cancelled")
                .add_attribute("plan", env.contract.address)
                .add_attribute("payer", plan.payer)
                .add_attribute("refunded_amount", refund)
                .add_attribute("timestamp", env.block.time.seconds().to_string()),
        ))
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn reply(deps: DepsMut, env: Env, msg: Reply) -> Result<Response, ContractError> {
    match msg.id {
        REGISTER_TASK_REPLY_ID => reply_register_task(deps, env, msg.result),
        id => Err(ContractError::UnknownReplyId { id }),
    }
}

fn reply_register_task(
    deps: DepsMut,
    env: Env,
    result: SubMsgResult,
) -> Result<Response, ContractError> {
    let response = result.into_result().map_err(StdError::generic_err)?;
    let config = CONFIG.load(deps.storage)?;

    // Only trust the event emitted by our registry
    let event_type = format!("wasm-{TASK_CREATED_EVENT}");
    let event = response
        .events
        .iter()
        .find(|event| {
            event.ty == event_type
                && attribute_value(event, CONTRACT_ADDRESS_ATTR) == Some(config.automation.as_str())
        })
        .ok_or(ContractError::MissingTask {})?;
    let task_id = attribute_value(event, "task_id").ok_or(ContractError::MissingTask {})?;
    let dedicated_caller =
        attribute_value(event, "dedicated_caller").ok_or(ContractError::MissingTask {})?;

    let task = AutomationTask {
        task_id: task_id.to_string(),
        dedicated_caller: deps.api.addr_validate(dedicated_caller)?,
    };
    TASK.save(deps.storage, &task)?;

    let plan = load_plan(deps.storage)?;
    deps.api.debug(&format!(
        "payment task {} registered, dedicated caller {}",
        task.task_id, task.dedicated_caller
    ));

    Ok(Response::new()
        .add_attribute("method", "register_task")
        .add_event(
            Event::new("payment_task_created")
                .add_attribute("task_id", task.task_id)
                .add_attribute("payer", plan.payer)
                .add_attribute("plan", env.contract.address)
                .add_attribute("dedicated_caller", task.dedicated_caller),
        ))
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn query(deps: Deps, env: Env, msg: QueryMsg) -> StdResult<Binary> {
    match msg {
        QueryMsg::Plan {} => to_json_binary(&query_plan(deps)?),
        QueryMsg::Status {} => to_json_binary(&query_status(deps)?),
        QueryMsg::NextPaymentTime {} => to_json_binary(&query_next_payment_time(deps)?),
        QueryMsg::CheckPayment {} => to_json_binary(&query_check_payment(deps, env)?),
    }
}

fn query_plan(deps: Deps) -> StdResult<PlanResponse> {
    let config = CONFIG.load(deps.storage)?;
    let plan = PLAN.load(deps.storage)?;
    let task = TASK.may_load(deps.storage)?;

    Ok(PlanResponse {
        factory: config.factory,
        automation: config.automation,
        denom: config.denom,
        payer: plan.payer,
        recipient: plan.recipient,
        amount: plan.amount,
        interval: plan.interval,
        start_time: plan.start_time,
        last_paid: plan.last_paid,
        total_payments: plan.total_payments,
        status: plan.status,
        title: plan.title,
        balance: plan.balance,
        task_id: task.as_ref().map(|task| task.task_id.clone()),
        dedicated_caller: task.map(|task| task.dedicated_caller),
    })
}

fn query_status(deps: Deps) -> StdResult<StatusResponse> {
    let plan = PLAN.load(deps.storage)?;
    Ok(StatusResponse {
        status: plan.status,
    })
}

fn query_next_payment_time(deps: Deps) -> StdResult<NextPaymentTimeResponse> {
    let plan = PLAN.load(deps.storage)?;
    Ok(NextPaymentTimeResponse {
        next_payment_time: plan.next_payment_time(),
    })
}

fn query_check_payment(deps: Deps, env: Env) -> StdResult<CheckPaymentResponse> {
    let plan = PLAN.load(deps.storage)?;
    let reason = plan
        .ensure_payable(env.block.time.seconds())
        .err()
        .map(|err| err.to_string());

    Ok(CheckPaymentResponse {
        can_exec: reason.is_none(),
        exec_msg: to_json_binary(&ExecuteMsg::ExecutePayment {})?,
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosmwasm_std::testing::{
        mock_dependencies, mock_env, mock_info, MockApi, MockQuerier, MockStorage,
    };
    use cosmwasm_std::{coins, from_json, Addr, CosmosMsg, OwnedDeps, SubMsgResponse, Timestamp};

    const DENOM: &str = "uatom";

    type TestDeps = OwnedDeps<MockStorage, MockApi, MockQuerier>;

    fn now() -> u64 {
        mock_env().block.time.seconds()
    }

    fn start_time() -> u64 {
        now() + 30
    }

    fn env_at(seconds: u64) -> Env {
        let mut env = mock_env();
        env.block.time = Timestamp::from_seconds(seconds);
        env
    }

    fn init_msg() -> ExecuteMsg {
        ExecuteMsg::Initialize {
            payer: "alice".to_string(),
            recipient: "bob".to_string(),
            amount: Uint128::new(100),
            interval: 120,
            start_time: start_time(),
            title: "Rent".to_string(),
        }
    }

    fn task_registered(emitter: &str) -> Reply {
        Reply {
            id: REGISTER_TASK_REPLY_ID,
            result: SubMsgResult::Ok(SubMsgResponse {
                events: vec![
                    Event::new("execute").add_attribute(CONTRACT_ADDRESS_ATTR, emitter),
                    Event::new(format!("wasm-{TASK_CREATED_EVENT}"))
                        .add_attribute(CONTRACT_ADDRESS_ATTR, emitter)
                        .add_attribute("task_id", "task-1")
                        .add_attribute("owner", "cosmos2contract")
                        .add_attribute("dedicated_caller", "proxy"),
                ],
                data: None,
            }),
        }
    }

    fn instantiated() -> TestDeps {
        let mut deps = mock_dependencies();
        let msg = InstantiateMsg {
            automation: "automation".to_string(),
            denom: DENOM.to_string(),
        };
        instantiate(deps.as_mut(), mock_env(), mock_info("factory", &[]), msg).unwrap();
        deps
    }

    fn initialized(funding: u128) -> TestDeps {
        let mut deps = instantiated();
        execute(
            deps.as_mut(),
            mock_env(),
            mock_info("factory", &coins(funding, DENOM)),
            init_msg(),
        )
        .unwrap();
        reply(deps.as_mut(), mock_env(), task_registered("automation")).unwrap();
        deps
    }

    fn plan(deps: &TestDeps) -> PlanResponse {
        from_json(query(deps.as_ref(), mock_env(), QueryMsg::Plan {}).unwrap()).unwrap()
    }

    fn pay(deps: &mut TestDeps, at: u64) -> Result<Response, ContractError> {
        execute(
            deps.as_mut(),
            env_at(at),
            mock_info("proxy", &[]),
            ExecuteMsg::ExecutePayment {},
        )
    }

    fn as_payer(deps: &mut TestDeps, msg: ExecuteMsg) -> Result<Response, ContractError> {
        execute(deps.as_mut(), mock_env(), mock_info("alice", &[]), msg)
    }

    fn attr<'a>(event: &'a Event, key: &str) -> &'a str {
        attribute_value(event, key).unwrap()
    }

    #[test]
    fn initialize_registers_payment_task() {
        let mut deps = instantiated();
        let res = execute(
            deps.as_mut(),
            mock_env(),
            mock_info("factory", &coins(500, DENOM)),
            init_msg(),
        )
        .unwrap();

        assert_eq!(res.messages.len(), 1);
        assert_eq!(res.messages[0].id, REGISTER_TASK_REPLY_ID);
        assert_eq!(
            res.messages[0].msg,
            CosmosMsg::Wasm(WasmMsg::Execute {
                contract_addr: "automation".to_string(),
                msg: to_json_binary(&RegistryExecuteMsg::CreateTask {
                    target: "cosmos2contract".to_string(),
                    exec_msg: to_json_binary(&ExecuteMsg::ExecutePayment {}).unwrap(),
                })
                .unwrap(),
                funds: vec![],
            })
        );

        let res = reply(deps.as_mut(), mock_env(), task_registered("automation")).unwrap();
        assert_eq!(res.events[0].ty, "payment_task_created");
        assert_eq!(attr(&res.events[0], "task_id"), "task-1");
        assert_eq!(attr(&res.events[0], "payer"), "alice");

        let plan = plan(&deps);
        assert_eq!(plan.factory, "factory");
        assert_eq!(plan.payer, "alice");
        assert_eq!(plan.recipient, "bob");
        assert_eq!(plan.amount, Uint128::new(100));
        assert_eq!(plan.interval, 120);
        assert_eq!(plan.start_time, start_time());
        assert_eq!(plan.status, PlanStatus::Active);
        assert_eq!(plan.balance, Uint128::new(500));
        assert_eq!(plan.last_paid, 0);
        assert_eq!(plan.total_payments, 0);
        assert_eq!(plan.task_id, Some("task-1".to_string()));
        assert_eq!(plan.dedicated_caller, Some(Addr::unchecked("proxy")));
    }

    #[test]
    fn initialize_only_once() {
        let mut deps = initialized(500);
        let err = execute(
            deps.as_mut(),
            mock_env(),
            mock_info("alice", &coins(500, DENOM)),
            init_msg(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Already initialized");
    }

    #[test]
    fn initialize_validates_params() {
        let mut deps = instantiated();

        let err = execute(
            deps.as_mut(),
            mock_env(),
            mock_info("factory", &coins(99, DENOM)),
            init_msg(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Insufficient initial funding");

        let msg = ExecuteMsg::Initialize {
            payer: "alice".to_string(),
            recipient: "bob".to_string(),
            amount: Uint128::new(100),
            interval: 120,
            start_time: now(),
            title: "Rent".to_string(),
        };
        let err = execute(
            deps.as_mut(),
            mock_env(),
            mock_info("factory", &coins(500, DENOM)),
            msg,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Start time must be in the future");

        let err = execute(
            deps.as_mut(),
            mock_env(),
            mock_info("factory", &coins(500, "uosmo")),
            init_msg(),
        )
        .unwrap_err();
        assert!(matches!(err, ContractError::Funds(_)));

        // Nothing was stored by the failed attempts
        assert!(PLAN.may_load(&deps.storage).unwrap().is_none());
    }

    #[test]
    fn reply_ignores_foreign_task_events() {
        let mut deps = instantiated();
        execute(
            deps.as_mut(),
            mock_env(),
            mock_info("factory", &coins(500, DENOM)),
            init_msg(),
        )
        .unwrap();

        let err = reply(deps.as_mut(), mock_env(), task_registered("impostor")).unwrap_err();
        assert!(matches!(err, ContractError::MissingTask {}));
    }

    #[test]
    fn only_dedicated_caller_executes() {
        let mut deps = initialized(500);
        let err = execute(
            deps.as_mut(),
            env_at(start_time()),
            mock_info("alice", &[]),
            ExecuteMsg::ExecutePayment {},
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Only dedicated msg.sender");
    }

    #[test]
    fn payment_schedule() {
        let mut deps = initialized(500);
        let start = start_time();

        let err = pay(&mut deps, start - 1).unwrap_err();
        assert_eq!(err.to_string(), "Payment not due yet");

        let res = pay(&mut deps, start).unwrap();
        assert_eq!(
            res.messages[0].msg,
            CosmosMsg::Bank(BankMsg::Send {
                to_address: "bob".to_string(),
                amount: coins(100, DENOM),
            })
        );
        let event = &res.events[0];
        assert_eq!(event.ty, "payment_executed");
        assert_eq!(attr(event, "recipient"), "bob");
        assert_eq!(attr(event, "amount"), "100");
        assert_eq!(attr(event, "timestamp"), start.to_string());

        let state = plan(&deps);
        assert_eq!(state.balance, Uint128::new(400));
        assert_eq!(state.total_payments, 1);
        assert_eq!(state.last_paid, start);

        // Same block: at most one payment
        let err = pay(&mut deps, start).unwrap_err();
        assert!(matches!(err, ContractError::PaymentNotDue {}));
        let err = pay(&mut deps, start + 119).unwrap_err();
        assert!(matches!(err, ContractError::PaymentNotDue {}));

        pay(&mut deps, start + 120).unwrap();
        let state = plan(&deps);
        assert_eq!(state.balance, Uint128::new(300));
        assert_eq!(state.total_payments, 2);
        assert_eq!(state.last_paid, start + 120);
    }

    #[test]
    fn no_catch_up_after_missed_intervals() {
        let mut deps = initialized(1_000);
        let start = start_time();
        pay(&mut deps, start).unwrap();

        as_payer(&mut deps, ExecuteMsg::PausePlan {}).unwrap();
        let err = pay(&mut deps, start + 120).unwrap_err();
        assert_eq!(err.to_string(), "Plan not active");
        as_payer(&mut deps, ExecuteMsg::ResumePlan {}).unwrap();

        // Ten intervals later a single payment is released
        let late = start + 10 * 120;
        pay(&mut deps, late).unwrap();
        let err = pay(&mut deps, late).unwrap_err();
        assert!(matches!(err, ContractError::PaymentNotDue {}));

        let state = plan(&deps);
        assert_eq!(state.total_payments, 2);
        assert_eq!(state.balance, Uint128::new(800));
        assert_eq!(state.last_paid, late);
    }

    #[test]
    fn insufficient_balance_leaves_state_untouched() {
        let mut deps = initialized(150);
        let start = start_time();
        pay(&mut deps, start).unwrap();

        let err = pay(&mut deps, start + 120).unwrap_err();
        assert_eq!(err.to_string(), "Insufficient user funds");

        let state = plan(&deps);
        assert_eq!(state.balance, Uint128::new(50));
        assert_eq!(state.total_payments, 1);
        assert_eq!(state.last_paid, start);
    }

    #[test]
    fn set_amount() {
        let mut deps = initialized(500);

        let err = execute(
            deps.as_mut(),
            mock_env(),
            mock_info("bob", &[]),
            ExecuteMsg::SetAmount {
                amount: Uint128::new(200),
            },
        )
        .unwrap_err();
        assert!(matches!(err, ContractError::Unauthorized {}));

        let err = as_payer(
            &mut deps,
            ExecuteMsg::SetAmount {
                amount: Uint128::zero(),
            },
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Amount must be greater than zero");

        // No minimum beyond zero once the plan exists
        let res = as_payer(
            &mut deps,
            ExecuteMsg::SetAmount {
                amount: Uint128::new(5),
            },
        )
        .unwrap();
        let event = &res.events[0];
        assert_eq!(event.ty, "amount_updated");
        assert_eq!(attr(event, "old_amount"), "100");
        assert_eq!(attr(event, "new_amount"), "5");
        assert_eq!(plan(&deps).amount, Uint128::new(5));
    }

    #[test]
    fn set_interval() {
        let mut deps = initialized(500);

        let err = as_payer(&mut deps, ExecuteMsg::SetInterval { interval: 59 }).unwrap_err();
        assert_eq!(err.to_string(), "Interval must be at least 60 seconds");

        let res = as_payer(&mut deps, ExecuteMsg::SetInterval { interval: 60 }).unwrap();
        let event = &res.events[0];
        assert_eq!(event.ty, "interval_updated");
        assert_eq!(attr(event, "old_interval"), "120");
        assert_eq!(attr(event, "new_interval"), "60");
        assert_eq!(plan(&deps).interval, 60);
    }

    #[test]
    fn pause_and_resume() {
        let mut deps = initialized(500);

        let err = as_payer(&mut deps, ExecuteMsg::ResumePlan {}).unwrap_err();
        assert_eq!(err.to_string(), "Plan not paused");

        let err = execute(
            deps.as_mut(),
            mock_env(),
            mock_info("bob", &[]),
            ExecuteMsg::PausePlan {},
        )
        .unwrap_err();
        assert!(matches!(err, ContractError::Unauthorized {}));

        let res = as_payer(&mut deps, ExecuteMsg::PausePlan {}).unwrap();
        assert_eq!(res.events[0].ty, "plan_paused");
        assert_eq!(plan(&deps).status, PlanStatus::Paused);

        let err = as_payer(&mut deps, ExecuteMsg::PausePlan {}).unwrap_err();
        assert_eq!(err.to_string(), "Plan already paused");

        let res = as_payer(&mut deps, ExecuteMsg::ResumePlan {}).unwrap();
        assert_eq!(res.events[0].ty, "plan_unpaused");
        let status: StatusResponse =
            from_json(query(deps.as_ref(), mock_env(), QueryMsg::Status {}).unwrap()).unwrap();
        assert_eq!(status.status, PlanStatus::Active);
    }

    #[test]
    fn cancel_refunds_and_deregisters() {
        let mut deps = initialized(500);
        pay(&mut deps, start_time()).unwrap();

        let err = execute(
            deps.as_mut(),
            mock_env(),
            mock_info("bob", &[]),
            ExecuteMsg::CancelPlan {},
        )
        .unwrap_err();
        assert!(matches!(err, ContractError::Unauthorized {}));

        let res = as_payer(&mut deps, ExecuteMsg::CancelPlan {}).unwrap();
        assert_eq!(res.messages.len(), 2);
        assert_eq!(
            res.messages[0].msg,
            CosmosMsg::Bank(BankMsg::Send {
                to_address: "alice".to_string(),
                amount: coins(400, DENOM),
            })
        );
        assert_eq!(
            res.messages[1].msg,
            CosmosMsg::Wasm(WasmMsg::Execute {
                contract_addr: "automation".to_string(),
                msg: to_json_binary(&RegistryExecuteMsg::CancelTask {
                    task_id: "task-1".to_string(),
                })
                .unwrap(),
                funds: vec![],
            })
        );
        let event = &res.events[0];
        assert_eq!(event.ty, "plan_cancelled");
        assert_eq!(attr(event, "refunded_amount"), "400");

        let state = plan(&deps);
        assert_eq!(state.status, PlanStatus::Canceled);
        assert_eq!(state.balance, Uint128::zero());

        let err = as_payer(&mut deps, ExecuteMsg::CancelPlan {}).unwrap_err();
        assert_eq!(err.to_string(), "Already canceled");
    }

    #[test]
    fn canceled_is_terminal() {
        let mut deps = initialized(500);
        as_payer(&mut deps, ExecuteMsg::PausePlan {}).unwrap();
        as_payer(&mut deps, ExecuteMsg::CancelPlan {}).unwrap();

        let err = pay(&mut deps, start_time() + 1_000).unwrap_err();
        assert_eq!(err.to_string(), "Plan not active");

        let err = as_payer(&mut deps, ExecuteMsg::PausePlan {}).unwrap_err();
        assert_eq!(err.to_string(), "Plan is canceled");
        let err = as_payer(&mut deps, ExecuteMsg::ResumePlan {}).unwrap_err();
        assert_eq!(err.to_string(), "Plan not paused");
        let err = as_payer(
            &mut deps,
            ExecuteMsg::SetAmount {
                amount: Uint128::new(10),
            },
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Plan is canceled");
        let err = as_payer(&mut deps, ExecuteMsg::SetInterval { interval: 600 }).unwrap_err();
        assert_eq!(err.to_string(), "Plan is canceled");

        let err = execute(
            deps.as_mut(),
            mock_env(),
            mock_info("alice", &coins(10, DENOM)),
            ExecuteMsg::AddFunds {},
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Plan is canceled");
    }

    #[test]
    fn cancel_with_empty_balance_sends_no_refund() {
        let mut deps = initialized(100);
        pay(&mut deps, start_time()).unwrap();

        let res = as_payer(&mut deps, ExecuteMsg::CancelPlan {}).unwrap();
        assert_eq!(res.messages.len(), 1);
        assert!(matches!(res.messages[0].msg, CosmosMsg::Wasm(_)));
        assert_eq!(attr(&res.events[0], "refunded_amount"), "0");
    }

    #[test]
    fn funding() {
        let mut deps = initialized(500);

        let err = execute(
            deps.as_mut(),
            mock_env(),
            mock_info("carol", &[]),
            ExecuteMsg::AddFunds {},
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "No funding was provided");

        let res = execute(
            deps.as_mut(),
            mock_env(),
            mock_info("carol", &coins(50, DENOM)),
            ExecuteMsg::AddFunds {},
        )
        .unwrap();
        let event = &res.events[0];
        assert_eq!(event.ty, "funds_added");
        assert_eq!(attr(event, "payer"), "alice");
        assert_eq!(attr(event, "amount"), "50");
        assert_eq!(attr(event, "title"), "Rent");

        let res = execute(
            deps.as_mut(),
            mock_env(),
            mock_info("carol", &coins(25, DENOM)),
            ExecuteMsg::Deposit {},
        )
        .unwrap();
        let event = &res.events[0];
        assert_eq!(event.ty, "funds_received");
        assert_eq!(attr(event, "payer"), "alice");
        assert_eq!(attr(event, "sender"), "carol");
        assert_eq!(attr(event, "amount"), "25");

        assert_eq!(plan(&deps).balance, Uint128::new(575));
    }

    #[test]
    fn funding_plan_without_title() {
        let mut deps = instantiated();
        let msg = ExecuteMsg::Initialize {
            payer: "alice".to_string(),
            recipient: "bob".to_string(),
            amount: Uint128::new(100),
            interval: 120,
            start_time: start_time(),
            title: String::new(),
        };
        execute(
            deps.as_mut(),
            mock_env(),
            mock_info("factory", &coins(100, DENOM)),
            msg,
        )
        .unwrap();
        reply(deps.as_mut(), mock_env(), task_registered("automation")).unwrap();

        for msg in [ExecuteMsg::AddFunds {}, ExecuteMsg::Deposit {}] {
            let res = execute(
                deps.as_mut(),
                mock_env(),
                mock_info("carol", &coins(50, DENOM)),
                msg,
            )
            .unwrap();
            let event = &res.events[0];
            assert_eq!(attr(event, "amount"), "50");
            assert!(event.attributes.iter().all(|a| !a.value.is_empty()));
            assert!(attribute_value(event, "title").is_none());
        }

        let state = plan(&deps);
        assert_eq!(state.title, "");
        assert_eq!(state.balance, Uint128::new(200));
    }

    #[test]
    fn check_payment_resolver() {
        let mut deps = initialized(500);
        let start = start_time();

        let check: CheckPaymentResponse = from_json(
            query(deps.as_ref(), env_at(start - 1), QueryMsg::CheckPayment {}).unwrap(),
        )
        .unwrap();
        assert!(!check.can_exec);
        assert_eq!(check.reason, Some("Payment not due yet".to_string()));

        let check: CheckPaymentResponse =
            from_json(query(deps.as_ref(), env_at(start), QueryMsg::CheckPayment {}).unwrap())
                .unwrap();
        assert!(check.can_exec);
        assert_eq!(check.reason, None);
        assert_eq!(
            check.exec_msg,
            to_json_binary(&ExecuteMsg::ExecutePayment {}).unwrap()
        );

        pay(&mut deps, start).unwrap();
        let next: NextPaymentTimeResponse = from_json(
            query(deps.as_ref(), mock_env(), QueryMsg::NextPaymentTime {}).unwrap(),
        )
        .unwrap();
        assert_eq!(next.next_payment_time, start + 120);
    }

    #[test]
    fn admin_ops_require_initialization() {
        let mut deps = instantiated();
        let err = as_payer(&mut deps, ExecuteMsg::PausePlan {}).unwrap_err();
        assert_eq!(err.to_string(), "Plan not initialized");
    }
}
