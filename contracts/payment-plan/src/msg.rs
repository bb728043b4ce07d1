use cosmwasm_schema::{cw_serde, QueryResponses};
use cosmwasm_std::{Addr, Binary, Uint128};

use crate::state::PlanStatus;

#[cw_serde]
pub struct InstantiateMsg {
    /// Automation registry to register the payment task with
    pub automation: String,
    /// Native denom the plan escrows
    pub denom: String,
}

#[cw_serde]
pub enum ExecuteMsg {
    /// One-time setup; attached funds become the initial balance
    Initialize {
        payer: String,
        recipient: String,
        amount: Uint128,
        interval: u64,
        start_time: u64,
        title: String,
    },
    /// Top up the escrow
    AddFunds {},
    /// Plain transfer into the plan from any sender
    Deposit {},
    /// Release one payment to the recipient (dedicated caller only)
    ExecutePayment {},
    SetAmount { amount: Uint128 },
    SetInterval { interval: u64 },
    PausePlan {},
    ResumePlan {},
    /// Stop the plan for good and refund the balance to the payer
    CancelPlan {},
}

#[cw_serde]
#[derive(QueryResponses)]
pub enum QueryMsg {
    #[returns(PlanResponse)]
    Plan {},

    #[returns(StatusResponse)]
    Status {},

    #[returns(NextPaymentTimeResponse)]
    NextPaymentTime {},

    /// Whether a payment could be executed right now, for keepers
    #[returns(CheckPaymentResponse)]
    CheckPayment {},
}

#[cw_serde]
pub struct PlanResponse {
    pub factory: Addr,
    pub automation: Addr,
    pub denom: String,
    pub payer: Addr,
    pub recipient: Addr,
    pub amount: Uint128,
    pub interval: u64,
    pub start_time: u64,
    pub last_paid: u64,
    pub total_payments: u64,
    pub status: PlanStatus,
    pub title: String,
    pub balance: Uint128,
    pub task_id: Option<String>,
    pub dedicated_caller: Option<Addr>,
}

#[cw_serde]
pub struct StatusResponse {
    pub status: PlanStatus,
}

#[cw_serde]
pub struct NextPaymentTimeResponse {
    pub next_payment_time: u64,
}

#[cw_serde]
pub struct CheckPaymentResponse {
    pub can_exec: bool,
    /// Message the dedicated caller should send
    pub exec_msg: Binary,
    /// Why a payment cannot be made yet
    pub reason: Option<String>,
}
