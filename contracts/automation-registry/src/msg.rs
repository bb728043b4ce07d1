use cosmwasm_schema::{cw_serde, QueryResponses};
use cosmwasm_std::{Addr, Binary};

/// Custom event emitted once a task is registered. On chain it is reported
/// with the `wasm-` prefix.
pub const TASK_CREATED_EVENT: &str = "task_created";

#[cw_serde]
pub struct InstantiateMsg {
    pub proxy_code_id: u64,
    pub executors: Vec<String>,
}

#[cw_serde]
pub enum ExecuteMsg {
    /// Register a recurring call of `exec_msg` on `target`, owned by the sender
    CreateTask { target: String, exec_msg: Binary },
    /// Remove a task (task owner only)
    CancelTask { task_id: String },
    /// Run a task through its dedicated proxy (executors only)
    ExecTask { task_id: String },
    /// Change the executor set (registry owner only)
    UpdateExecutors {
        add: Vec<String>,
        remove: Vec<String>,
    },
}

#[cw_serde]
#[derive(QueryResponses)]
pub enum QueryMsg {
    #[returns(ConfigResponse)]
    Config {},

    #[returns(TaskResponse)]
    Task { task_id: String },

    /// Proxy that calls on behalf of `owner`, if one was created
    #[returns(DedicatedCallerResponse)]
    DedicatedCaller { owner: String },
}

#[cw_serde]
pub struct ConfigResponse {
    pub owner: Addr,
    pub proxy_code_id: u64,
    pub executors: Vec<Addr>,
}

#[cw_serde]
pub struct TaskResponse {
    pub id: String,
    pub owner: Addr,
    pub target: Addr,
    pub exec_msg: Binary,
    pub dedicated_caller: Addr,
    pub created_at: u64,
}

#[cw_serde]
pub struct DedicatedCallerResponse {
    pub dedicated_caller: Option<Addr>,
}
