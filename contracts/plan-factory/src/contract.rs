use cosmwasm_std::{
    entry_point, to_json_binary, Addr, Binary, Coin, Deps, DepsMut, Env, Event, MessageInfo,
    Order, Reply, Response, StdError, StdResult, Storage, SubMsg, SubMsgResult, Uint128, WasmMsg,
};
use cw2::set_contract_version;
use cw_storage_plus::{Bound, Map};

use payment_plan::msg::{ExecuteMsg as PlanExecuteMsg, InstantiateMsg as PlanInstantiateMsg};
use recurring_shared::{instantiated_address, paid_amount, PlanParams};

use crate::error::ContractError;
use crate::msg::{
    ConfigResponse, CreatePlanResponse, ExecuteMsg, InstantiateMsg, PlanRecordResponse,
    PlansResponse, QueryMsg,
};
use crate::state::{
    Config, PendingPlan, PlanRecord, CONFIG, NEXT_PLAN_ID, PAYER_PLANS, PENDING_PLAN, PLANS,
    RECIPIENT_PLANS,
};

const CONTRACT_NAME: &str = "crates.io:plan-factory";
const CONTRACT_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const INSTANTIATE_PLAN_REPLY_ID: u64 = 1;

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn instantiate(
    deps: DepsMut,
    _env: Env,
    info: MessageInfo,
    msg: InstantiateMsg,
) -> Result<Response, ContractError> {
    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;

    let config = Config {
        owner: info.sender,
        plan_code_id: msg.plan_code_id,
        automation: deps.api.addr_validate(&msg.automation)?,
        denom: msg.denom,
    };
    CONFIG.save(deps.storage, &config)?;

    NEXT_PLAN_ID.save(deps.storage, &1u64)?;

    Ok(Response::new()
        .add_attribute("method", "instantiate")
        .add_attribute("owner", config.owner)
        .add_attribute("plan_code_id", config.plan_code_id.to_string())
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
        ExecuteMsg::CreatePlan {
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
            execute_create_plan(deps, env, info, params)
        }
    }
}

pub fn execute_create_plan(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    params: PlanParams,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;

    // Fail before anything is instantiated
    let funding = paid_amount(&info.funds, &config.denom)?;
    let recipient = params.validate(deps.api, env.block.time.seconds(), funding)?;

    let plan_id = NEXT_PLAN_ID.load(deps.storage)?;
    NEXT_PLAN_ID.save(deps.storage, &(plan_id + 1))?;

    let instantiate_plan = WasmMsg::Instantiate {
        admin: None,
        code_id: config.plan_code_id,
        msg: to_json_binary(&PlanInstantiateMsg {
            automation: config.automation.to_string(),
            denom: config.denom,
        })?,
        funds: vec![],
        label: format!("payment plan {plan_id}"),
    };

    PENDING_PLAN.save(
        deps.storage,
        &PendingPlan {
            id: plan_id,
            payer: info.sender.clone(),
            recipient: recipient.clone(),
            params,
            funding,
        },
    )?;

    Ok(Response::new()
        .add_submessage(SubMsg::reply_on_success(
            instantiate_plan,
            INSTANTIATE_PLAN_REPLY_ID,
        ))
        .add_attribute("method", "create_plan")
        .add_attribute("plan_id", plan_id.to_string())
        .add_attribute("payer", info.sender)
        .add_attribute("recipient", recipient)
        .add_attribute("funding", funding))
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn reply(deps: DepsMut, env: Env, msg: Reply) -> Result<Response, ContractError> {
    match msg.id {
        INSTANTIATE_PLAN_REPLY_ID => reply_instantiate_plan(deps, env, msg.result),
        id => Err(ContractError::UnknownReplyId { id }),
    }
}

fn reply_instantiate_plan(
    deps: DepsMut,
    env: Env,
    result: SubMsgResult,
) -> Result<Response, ContractError> {
    let response = result.into_result().map_err(StdError::generic_err)?;
    let plan =
        instantiated_address(&response.events).ok_or(ContractError::MissingPlanAddress {})?;
    let plan = deps.api.addr_validate(&plan)?;

    let pending = PENDING_PLAN.load(deps.storage)?;
    PENDING_PLAN.remove(deps.storage);
    let config = CONFIG.load(deps.storage)?;

    let record = PlanRecord {
        id: pending.id,
        payer: pending.payer.clone(),
        recipient: pending.recipient.clone(),
        created_at: env.block.time.seconds(),
    };
    PLANS.save(deps.storage, &plan, &record)?;
    PAYER_PLANS.save(deps.storage, (&pending.payer, pending.id), &plan)?;
    RECIPIENT_PLANS.save(deps.storage, (&pending.recipient, pending.id), &plan)?;

    deps.api.debug(&format!("plan {} instantiated at {plan}", pending.id));

    let params = pending.params;
    let initialize = WasmMsg::Execute {
        contract_addr: plan.to_string(),
        msg: to_json_binary(&PlanExecuteMsg::Initialize {
            payer: pending.payer.to_string(),
            recipient: pending.recipient.to_string(),
            amount: params.amount,
            interval: params.interval,
            start_time: params.start_time,
            title: params.title.clone(),
        })?,
        funds: vec![Coin {
            denom: config.denom,
            amount: pending.funding,
        }],
    };

    Ok(Response::new()
        .add_message(initialize)
        .set_data(to_json_binary(&CreatePlanResponse { plan: plan.clone() })?)
        .add_attribute("method", "instantiate_plan")
        .add_attribute("plan_id", pending.id.to_string())
        .add_event(plan_created_event(
            &plan,
            &pending.payer,
            &pending.recipient,
            params.amount,
            params.interval,
            params.start_time,
            params.title,
        )))
}

fn plan_created_event(
    plan: &Addr,
    payer: &Addr,
    recipient: &Addr,
    amount: Uint128,
    interval: u64,
    start_time: u64,
    title: String,
) -> Event {
    let event = Event::new("plan_created")
        .add_attribute("plan", plan.clone())
        .add_attribute("payer", payer.clone())
        .add_attribute("recipient", recipient.clone())
        .add_attribute("amount", amount)
        .add_attribute("interval", interval.to_string())
        .add_attribute("start_time", start_time.to_string());

    // Attribute values must not be empty
    if title.is_empty() {
        event
    } else {
        event.add_attribute("title", title)
    }
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn query(deps: Deps, _env: Env, msg: QueryMsg) -> StdResult<Binary> {
    match msg {
        QueryMsg::Config {} => to_json_binary(&query_config(deps)?),
        QueryMsg::PayerPlans {
            payer,
            start_after,
            limit,
        } => to_json_binary(&query_payer_plans(deps, payer, start_after, limit)?),
        QueryMsg::RecipientPlans {
            recipient,
            start_after,
            limit,
        } => to_json_binary(&query_recipient_plans(
            deps,
            recipient,
            start_after,
            limit,
        )?),
        QueryMsg::Plan { address } => to_json_binary(&query_plan(deps, address)?),
    }
}

fn query_config(deps: Deps) -> StdResult<ConfigResponse> {
    let config = CONFIG.load(deps.storage)?;
    Ok(ConfigResponse {
        owner: config.owner,
        plan_code_id: config.plan_code_id,
        automation: config.automation,
        denom: config.denom,
    })
}

fn query_payer_plans(
    deps: Deps,
    payer: String,
    start_after: Option<String>,
    limit: Option<u32>,
) -> StdResult<PlansResponse> {
    // Malformed addresses simply have no plans
    let payer_addr = Addr::unchecked(payer);
    let plans = match start_bound(deps, start_after)? {
        Some(start) => indexed_plans(deps.storage, &PAYER_PLANS, &payer_addr, start, limit)?,
        None => vec![],
    };
    Ok(PlansResponse { plans })
}

fn query_recipient_plans(
    deps: Deps,
    recipient: String,
    start_after: Option<String>,
    limit: Option<u32>,
) -> StdResult<PlansResponse> {
    let recipient_addr = Addr::unchecked(recipient);
    let plans = match start_bound(deps, start_after)? {
        Some(start) => {
            indexed_plans(deps.storage, &RECIPIENT_PLANS, &recipient_addr, start, limit)?
        }
        None => vec![],
    };
    Ok(PlansResponse { plans })
}

/// Pages continue after the plan with the given address. Returns `None` when
/// that address is not a plan of this factory, so the page is empty.
fn start_bound(deps: Deps, start_after: Option<String>) -> StdResult<Option<Option<u64>>> {
    match start_after {
        None => Ok(Some(None)),
        Some(address) => {
            let record = PLANS.may_load(deps.storage, &Addr::unchecked(address))?;
            Ok(record.map(|record| Some(record.id)))
        }
    }
}

/// Without a limit the whole list is returned
fn indexed_plans<'a>(
    storage: &dyn Storage,
    index: &Map<'a, (&'a Addr, u64), Addr>,
    owner: &'a Addr,
    start_after: Option<u64>,
    limit: Option<u32>,
) -> StdResult<Vec<Addr>> {
    let plans = index
        .prefix(owner)
        .range(
            storage,
            start_after.map(Bound::exclusive),
            None,
            Order::Ascending,
        )
        .map(|item| item.map(|(_, plan)| plan));

    match limit {
        Some(limit) => plans.take(limit as usize).collect(),
        None => plans.collect(),
    }
}

fn query_plan(deps: Deps, address: String) -> StdResult<PlanRecordResponse> {
    let plan = deps.api.addr_validate(&address)?;
    let record = PLANS.load(deps.storage, &plan)?;

    Ok(PlanRecordResponse {
        id: record.id,
        plan,
        payer: record.payer,
        recipient: record.recipient,
        created_at: record.created_at,
    })
}
