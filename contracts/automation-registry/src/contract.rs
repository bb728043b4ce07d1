use cosmwasm_std::{
    entry_point, to_json_binary, Addr, Binary, Deps, DepsMut, Env, Event, MessageInfo, Reply,
    Response, StdError, StdResult, SubMsg, SubMsgResult, WasmMsg,
};
use cw2::set_contract_version;
use sha2::{Digest, Sha256};

use automation_proxy::msg::{
    ExecuteMsg as ProxyExecuteMsg, InstantiateMsg as ProxyInstantiateMsg,
};
use recurring_shared::instantiated_address;

use crate::error::ContractError;
use crate::msg::{
    ConfigResponse, DedicatedCallerResponse, ExecuteMsg, InstantiateMsg, QueryMsg, TaskResponse,
    TASK_CREATED_EVENT,
};
use crate::state::{Config, PendingTask, Task, CONFIG, PENDING_TASK, PROXIES, TASKS};

const CONTRACT_NAME: &str = "crates.io:automation-registry";
const CONTRACT_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const INSTANTIATE_PROXY_REPLY_ID: u64 = 1;

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn instantiate(
    deps: DepsMut,
    _env: Env,
    info: MessageInfo,
    msg: InstantiateMsg,
) -> Result<Response, ContractError> {
    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;

    let executors = msg
        .executors
        .iter()
        .map(|addr| deps.api.addr_validate(addr))
        .collect::<StdResult<Vec<_>>>()?;

    let config = Config {
        owner: info.sender,
        proxy_code_id: msg.proxy_code_id,
        executors,
    };
    CONFIG.save(deps.storage, &config)?;

    Ok(Response::new()
        .add_attribute("method", "instantiate")
        .add_attribute("owner", config.owner)
        .add_attribute("proxy_code_id", config.proxy_code_id.to_string())
        .add_attribute("executors", config.executors.len().to_string()))
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn execute(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    msg: ExecuteMsg,
) -> Result<Response, ContractError> {
    match msg {
        ExecuteMsg::CreateTask { target, exec_msg } => {
            execute_create_task(deps, env, info, target, exec_msg)
        }
        ExecuteMsg::CancelTask { task_id } => execute_cancel_task(deps, info, task_id),
        ExecuteMsg::ExecTask { task_id } => execute_exec_task(deps, info, task_id),
        ExecuteMsg::UpdateExecutors { add, remove } => {
            execute_update_executors(deps, info, add, remove)
        }
    }
}

/// Deterministic task id, so the same owner cannot register the same call twice
pub fn task_id(owner: &Addr, target: &Addr, exec_msg: &Binary) -> String {
    let mut hasher = Sha256::new();
    hasher.update(owner.as_bytes());
    hasher.update([0u8]);
    hasher.update(target.as_bytes());
    hasher.update([0u8]);
    hasher.update(exec_msg.as_slice());
    hex::encode(hasher.finalize())
}

pub fn execute_create_task(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    target: String,
    exec_msg: Binary,
) -> Result<Response, ContractError> {
    let target = deps.api.addr_validate(&target)?;
    let id = task_id(&info.sender, &target, &exec_msg);

    if TASKS.has(deps.storage, &id) {
        return Err(ContractError::TaskExists {});
    }

    let pending = PendingTask {
        id,
        owner: info.sender,
        target,
        exec_msg,
        created_at: env.block.time.seconds(),
    };

    if let Some(proxy) = PROXIES.may_load(deps.storage, &pending.owner)? {
        let task = pending.into_task(proxy);
        TASKS.save(deps.storage, &task.id, &task)?;
        return Ok(Response::new()
            .add_attribute("method", "create_task")
            .add_event(task_created_event(&task)));
    }

    // First task of this owner: its proxy has to exist before the task does
    let config = CONFIG.load(deps.storage)?;
    let instantiate_proxy = WasmMsg::Instantiate {
        admin: None,
        code_id: config.proxy_code_id,
        msg: to_json_binary(&ProxyInstantiateMsg {
            owner: pending.owner.to_string(),
        })?,
        funds: vec![],
        label: format!("automation proxy for {}", pending.owner),
    };
    PENDING_TASK.save(deps.storage, &pending)?;

    Ok(Response::new()
        .add_submessage(SubMsg::reply_on_success(
            instantiate_proxy,
            INSTANTIATE_PROXY_REPLY_ID,
        ))
        .add_attribute("method", "create_task")
        .add_attribute("task_id", pending.id)
        .add_attribute("owner", pending.owner))
}

pub fn execute_cancel_task(
    deps: DepsMut,
    info: MessageInfo,
    task_id: String,
) -> Result<Response, ContractError> {
    let task = TASKS
        .may_load(deps.storage, &task_id)?
        .ok_or(ContractError::TaskNotFound {})?;

    if info.sender != task.owner {
        return Err(ContractError::NotTaskOwner {});
    }

    TASKS.remove(deps.storage, &task_id);

    Ok(Response::new()
        .add_attribute("method", "cancel_task")
        .add_event(
            Event::new("task_cancelled")
                .add_attribute("task_id", task.id)
                .add_attribute("owner", task.owner),
        ))
}

pub fn execute_exec_task(
    deps: DepsMut,
    info: MessageInfo,
    task_id: String,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    if !config.executors.contains(&info.sender) {
        return Err(ContractError::NotExecutor {});
    }

    let task = TASKS
        .may_load(deps.storage, &task_id)?
        .ok_or(ContractError::TaskNotFound {})?;

    let forward = WasmMsg::Execute {
        contract_addr: task.dedicated_caller.to_string(),
        msg: to_json_binary(&ProxyExecuteMsg::Forward {
            contract: task.target.to_string(),
            msg: task.exec_msg,
        })?,
        funds: vec![],
    };

    Ok(Response::new()
        .add_message(forward)
        .add_attribute("method", "exec_task")
        .add_event(
            Event::new("task_executed")
                .add_attribute("task_id", task.id)
                .add_attribute("executor", info.sender)
                .add_attribute("dedicated_caller", task.dedicated_caller),
        ))
}

pub fn execute_update_executors(
    deps: DepsMut,
    info: MessageInfo,
    add: Vec<String>,
    remove: Vec<String>,
) -> Result<Response, ContractError> {
    let mut config = CONFIG.load(deps.storage)?;
    if info.sender != config.owner {
        return Err(ContractError::Unauthorized {});
    }

    for addr in add {
        let addr = deps.api.addr_validate(&addr)?;
        if !config.executors.contains(&addr) {
            config.executors.push(addr);
        }
    }
    for addr in remove {
        let addr = deps.api.addr_validate(&addr)?;
        config.executors.retain(|executor| *executor != addr);
    }
    CONFIG.save(deps.storage, &config)?;

    Ok(Response::new()
        .add_attribute("method", "update_executors")
        .add_attribute("executors", config.executors.len().to_string()))
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn reply(deps: DepsMut, _env: Env, msg: Reply) -> Result<Response, ContractError> {
    match msg.id {
        INSTANTIATE_PROXY_REPLY_ID => reply_instantiate_proxy(deps, msg.result),
        id => Err(ContractError::UnknownReplyId { id }),
    }
}

fn reply_instantiate_proxy(
    deps: DepsMut,
    result: SubMsgResult,
) -> Result<Response, ContractError> {
    let response = result.into_result().map_err(StdError::generic_err)?;
    let proxy = instantiated_address(&response.events)
        .ok_or(ContractError::MissingProxyAddress {})?;
    let proxy = deps.api.addr_validate(&proxy)?;

    let pending = PENDING_TASK.load(deps.storage)?;
    PENDING_TASK.remove(deps.storage);
    deps.api
        .debug(&format!("automation proxy {proxy} created for {}", pending.owner));

    PROXIES.save(deps.storage, &pending.owner, &proxy)?;
    let task = pending.into_task(proxy);
    TASKS.save(deps.storage, &task.id, &task)?;

    Ok(Response::new()
        .add_attribute("method", "instantiate_proxy")
        .add_event(task_created_event(&task)))
}

fn task_created_event(task: &Task) -> Event {
    Event::new(TASK_CREATED_EVENT)
        .add_attribute("task_id", task.id.clone())
        .add_attribute("owner", task.owner.clone())
        .add_attribute("target", task.target.clone())
        .add_attribute("dedicated_caller", task.dedicated_caller.clone())
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn query(deps: Deps, _env: Env, msg: QueryMsg) -> StdResult<Binary> {
    match msg {
        QueryMsg::Config {} => to_json_binary(&query_config(deps)?),
        QueryMsg::Task { task_id } => to_json_binary(&query_task(deps, task_id)?),
        QueryMsg::DedicatedCaller { owner } => {
            to_json_binary(&query_dedicated_caller(deps, owner)?)
        }
    }
}

fn query_config(deps: Deps) -> StdResult<ConfigResponse> {
    let config = CONFIG.load(deps.storage)?;
    Ok(ConfigResponse {
        owner: config.owner,
        proxy_code_id: config.proxy_code_id,
        executors: config.executors,
    })
}

fn query_task(deps: Deps, task_id: String) -> StdResult<TaskResponse> {
    let task = TASKS.load(deps.storage, &task_id)?;
    Ok(TaskResponse {
        id: task.id,
        owner: task.owner,
        target: task.target,
        exec_msg: task.exec_msg,
        dedicated_caller: task.dedicated_caller,
        created_at: task.created_at,
    })
}

fn query_dedicated_caller(deps: Deps, owner: String) -> StdResult<DedicatedCallerResponse> {
    let owner = deps.api.addr_validate(&owner)?;
    Ok(DedicatedCallerResponse {
        dedicated_caller: PROXIES.may_load(deps.storage, &owner)?,
    })
}
