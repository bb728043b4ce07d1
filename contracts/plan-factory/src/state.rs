use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Uint128};
use cw_storage_plus::{Item, Map};
use recurring_shared::PlanParams;

#[cw_serde]
pub struct Config {
    /// Account that deployed the factory
    pub owner: Addr,
    /// Code every new plan is instantiated from
    pub plan_code_id: u64,
    /// Automation registry handed to every plan
    pub automation: Addr,
    /// Native denom plans are funded in
    pub denom: String,
}

#[cw_serde]
pub struct PlanRecord {
    /// Creation sequence number, orders the indices
    pub id: u64,
    pub payer: Addr,
    pub recipient: Addr,
    pub created_at: u64,
}

/// Creation request parked while the plan contract is instantiated
#[cw_serde]
pub struct PendingPlan {
    pub id: u64,
    pub payer: Addr,
    pub recipient: Addr,
    pub params: PlanParams,
    pub funding: Uint128,
}

/// Configuration storage
pub const CONFIG: Item<Config> = Item::new("config");

/// Next plan ID
pub const NEXT_PLAN_ID: Item<u64> = Item::new("next_plan_id");

/// Every plan created by the factory
pub const PLANS: Map<&Addr, PlanRecord> = Map::new("plans");

/// Plans by payer, in creation order
pub const PAYER_PLANS: Map<(&Addr, u64), Addr> = Map::new("payer_plans");

/// Plans by recipient, in creation order
pub const RECIPIENT_PLANS: Map<(&Addr, u64), Addr> = Map::new("recipient_plans");

pub const PENDING_PLAN: Item<PendingPlan> = Item::new("pending_plan");
