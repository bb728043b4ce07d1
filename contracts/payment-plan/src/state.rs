use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Uint128};
use cw_storage_plus::Item;

use crate::error::ContractError;

#[cw_serde]
pub enum PlanStatus {
    Active = 0,
    Paused = 1,
    Canceled = 2,
}

#[cw_serde]
pub struct Plan {
    /// Owner of the plan, funds it and receives refunds
    pub payer: Addr,
    /// Receives every scheduled payment
    pub recipient: Addr,
    /// Released per interval
    pub amount: Uint128,
    /// Seconds between payments
    pub interval: u64,
    /// First eligible payment time
    pub start_time: u64,
    /// Time of the last executed payment (0 = never paid)
    pub last_paid: u64,
    pub total_payments: u64,
    pub status: PlanStatus,
    pub title: String,
    /// Escrow held for the plan
    pub balance: Uint128,
}

impl Plan {
    /// Earliest time the next payment may be executed. Missed intervals do
    /// not accumulate.
    pub fn next_payment_time(&self) -> u64 {
        if self.total_payments == 0 {
            self.start_time
        } else {
            self.last_paid.saturating_add(self.interval)
        }
    }

    /// Everything `ExecutePayment` requires apart from the caller
    pub fn ensure_payable(&self, now: u64) -> Result<(), ContractError> {
        if self.status != PlanStatus::Active {
            return Err(ContractError::NotActive {});
        }
        if now < self.next_payment_time() {
            return Err(ContractError::PaymentNotDue {});
        }
        if self.balance < self.amount {
            return Err(ContractError::InsufficientFunds {});
        }
        Ok(())
    }

    pub fn ensure_not_canceled(&self) -> Result<(), ContractError> {
        match self.status {
            PlanStatus::Canceled => Err(ContractError::Canceled {}),
            _ => Ok(()),
        }
    }
}

#[cw_serde]
pub struct Config {
    /// Instantiator, kept for provenance only
    pub factory: Addr,
    /// Automation registry the plan registers with
    pub automation: Addr,
    /// Native denom held in escrow
    pub denom: String,
}

#[cw_serde]
pub struct AutomationTask {
    pub task_id: String,
    /// The only address allowed to execute payments
    pub dedicated_caller: Addr,
}

pub const CONFIG: Item<Config> = Item::new("config");

pub const PLAN: Item<Plan> = Item::new("plan");

pub const TASK: Item<AutomationTask> = Item::new("task");
