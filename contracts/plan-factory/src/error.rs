use cosmwasm_std::StdError;
use recurring_shared::{FundsError, ValidationError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContractError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Funds(#[from] FundsError),

    #[error("Plan instantiation did not report an address")]
    MissingPlanAddress {},

    #[error("Unknown reply id {id}")]
    UnknownReplyId { id: u64 },
}
