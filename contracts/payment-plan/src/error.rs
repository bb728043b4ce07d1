use cosmwasm_std::{OverflowError, StdError};
use recurring_shared::{FundsError, ValidationError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContractError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("{0}")]
    Overflow(#[from] OverflowError),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Funds(#[from] FundsError),

    #[error("Caller is not the plan owner")]
    Unauthorized {},

    #[error("Only dedicated msg.sender")]
    NotDedicatedCaller {},

    #[error("Already initialized")]
    AlreadyInitialized {},

    #[error("Plan not initialized")]
    NotInitialized {},

    #[error("No funding was provided")]
    NoFunds {},

    #[error("Plan not active")]
    NotActive {},

    #[error("Payment not due yet")]
    PaymentNotDue {},

    #[error("Insufficient user funds")]
    InsufficientFunds {},

    #[error("Amount must be greater than zero")]
    InvalidAmount {},

    #[error("Interval must be at least 60 seconds")]
    InvalidInterval {},

    #[error("Plan already paused")]
    AlreadyPaused {},

    #[error("Plan not paused")]
    NotPaused {},

    #[error("Plan is canceled")]
    Canceled {},

    #[error("Already canceled")]
    AlreadyCanceled {},

    #[error("Automation registry did not report the task")]
    MissingTask {},

    #[error("Unknown reply id {id}")]
    UnknownReplyId { id: u64 },
}
