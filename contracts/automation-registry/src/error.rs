use cosmwasm_std::StdError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContractError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("Unauthorized")]
    Unauthorized {},

    #[error("Caller is not an automation executor")]
    NotExecutor {},

    #[error("Only the task owner can cancel a task")]
    NotTaskOwner {},

    #[error("Task already exists")]
    TaskExists {},

    #[error("Task not found")]
    TaskNotFound {},

    #[error("Proxy instantiation did not report an address")]
    MissingProxyAddress {},

    #[error("Unknown reply id {id}")]
    UnknownReplyId { id: u64 },
}
