use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Binary};
use cw_storage_plus::{Item, Map};

#[cw_serde]
pub struct Config {
    /// Can change the executor set
    pub owner: Addr,
    /// Code used to instantiate dedicated proxies
    pub proxy_code_id: u64,
    /// Keepers allowed to trigger task execution
    pub executors: Vec<Addr>,
}

#[cw_serde]
pub struct Task {
    /// Hex SHA-256 of owner, target and message
    pub id: String,
    /// Contract that registered the task
    pub owner: Addr,
    /// Contract the message is sent to
    pub target: Addr,
    /// JSON execute message sent on every run
    pub exec_msg: Binary,
    /// Proxy the message is sent from
    pub dedicated_caller: Addr,
    pub created_at: u64,
}

/// Task waiting for its owner's proxy to be instantiated
#[cw_serde]
pub struct PendingTask {
    pub id: String,
    pub owner: Addr,
    pub target: Addr,
    pub exec_msg: Binary,
    pub created_at: u64,
}

impl PendingTask {
    pub fn into_task(self, dedicated_caller: Addr) -> Task {
        Task {
            id: self.id,
            owner: self.owner,
            target: self.target,
            exec_msg: self.exec_msg,
            dedicated_caller,
            created_at: self.created_at,
        }
    }
}

pub const CONFIG: Item<Config> = Item::new("config");

/// Tasks indexed by ID
pub const TASKS: Map<&str, Task> = Map::new("tasks");

/// Dedicated proxy of each task owner
pub const PROXIES: Map<&Addr, Addr> = Map::new("proxies");

pub const PENDING_TASK: Item<PendingTask> = Item::new("pending_task");
