use cosmwasm_schema::{cw_serde, QueryResponses};
use cosmwasm_std::{Addr, Uint128};

#[cw_serde]
pub struct InstantiateMsg {
    /// Code id of the payment plan contract
    pub plan_code_id: u64,
    /// Automation registry plans register with
    pub automation: String,
    /// Native denom plans are funded in
    pub denom: String,
}

#[cw_serde]
pub enum ExecuteMsg {
    /// Create and fund a plan paying `recipient`; the sender becomes the payer
    CreatePlan {
        recipient: String,
        amount: Uint128,
        interval: u64,
        start_time: u64,
        title: String,
    },
}

#[cw_serde]
#[derive(QueryResponses)]
pub enum QueryMsg {
    #[returns(ConfigResponse)]
    Config {},

    /// Plans created by a payer, oldest first
    #[returns(PlansResponse)]
    PayerPlans {
        payer: String,
        start_after: Option<String>,
        limit: Option<u32>,
    },

    /// Plans paying a recipient, oldest first
    #[returns(PlansResponse)]
    RecipientPlans {
        recipient: String,
        start_after: Option<String>,
        limit: Option<u32>,
    },

    #[returns(PlanRecordResponse)]
    Plan { address: String },
}

// Response types

#[cw_serde]
pub struct ConfigResponse {
    pub owner: Addr,
    pub plan_code_id: u64,
    pub automation: Addr,
    pub denom: String,
}

#[cw_serde]
pub struct PlansResponse {
    pub plans: Vec<Addr>,
}

#[cw_serde]
pub struct PlanRecordResponse {
    pub id: u64,
    pub plan: Addr,
    pub payer: Addr,
    pub recipient: Addr,
    pub created_at: u64,
}

/// Data returned by `CreatePlan`
#[cw_serde]
pub struct CreatePlanResponse {
    pub plan: Addr,
}
