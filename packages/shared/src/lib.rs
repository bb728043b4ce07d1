// Plan rules and helpers shared by the recurring payment contracts

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Api, Coin, Event, OverflowError, Uint128};
use thiserror::Error;

/// Smallest per-interval payment a plan can be created with
pub const MIN_PAYMENT_AMOUNT: Uint128 = Uint128::new(10);
/// Shortest payment interval (seconds)
pub const MIN_INTERVAL: u64 = 60;
/// Longest plan title (characters)
pub const MAX_TITLE_LENGTH: usize = 60;

/// Event type the chain emits for every contract instantiation
pub const INSTANTIATE_EVENT: &str = "instantiate";
/// Attribute carrying the emitting (or instantiated) contract address
pub const CONTRACT_ADDRESS_ATTR: &str = "_contract_address";

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Invalid recipient")]
    InvalidRecipient {},

    #[error("Payment amount must be at least 10 wei")]
    AmountTooSmall {},

    #[error("Payment interval must be at least 1 minute")]
    IntervalTooShort {},

    #[error("Start time must be in the future")]
    StartTimeNotInFuture {},

    #[error("Insufficient initial funding")]
    InsufficientFunding {},

    #[error("Title too long")]
    TitleTooLong {},
}

#[derive(Error, Debug, PartialEq)]
pub enum FundsError {
    #[error("Unsupported denom {denom} (plan escrows {expected})")]
    UnsupportedDenom { denom: String, expected: String },

    #[error("{0}")]
    Overflow(#[from] OverflowError),
}

/// Parameters of a plan as supplied by its payer
#[cw_serde]
pub struct PlanParams {
    pub recipient: String,
    pub amount: Uint128,
    pub interval: u64,
    pub start_time: u64,
    pub title: String,
}

impl PlanParams {
    /// Checks the creation rules in their fixed order; the first broken rule
    /// is reported. Returns the validated recipient.
    pub fn validate(
        &self,
        api: &dyn Api,
        now: u64,
        funding: Uint128,
    ) -> Result<Addr, ValidationError> {
        let recipient = api
            .addr_validate(&self.recipient)
            .map_err(|_| ValidationError::InvalidRecipient {})?;

        if self.amount < MIN_PAYMENT_AMOUNT {
            return Err(ValidationError::AmountTooSmall {});
        }

        if self.interval < MIN_INTERVAL {
            return Err(ValidationError::IntervalTooShort {});
        }

        if self.start_time <= now {
            return Err(ValidationError::StartTimeNotInFuture {});
        }

        if funding < self.amount {
            return Err(ValidationError::InsufficientFunding {});
        }

        if self.title.chars().count() > MAX_TITLE_LENGTH {
            return Err(ValidationError::TitleTooLong {});
        }

        Ok(recipient)
    }
}

/// Total of `denom` attached to a call. Coins of any other denom are rejected
/// so nothing ends up in a contract without being accounted for.
pub fn paid_amount(funds: &[Coin], denom: &str) -> Result<Uint128, FundsError> {
    funds
        .iter()
        .try_fold(Uint128::zero(), |total, coin| -> Result<Uint128, FundsError> {
            if coin.denom != denom {
                return Err(FundsError::UnsupportedDenom {
                    denom: coin.denom.clone(),
                    expected: denom.to_string(),
                });
            }
            Ok(total.checked_add(coin.amount)?)
        })
}

pub fn attribute_value<'a>(event: &'a Event, key: &str) -> Option<&'a str> {
    event
        .attributes
        .iter()
        .find(|attr| attr.key == key)
        .map(|attr| attr.value.as_str())
}

/// Address of the first contract instantiated among `events`
pub fn instantiated_address(events: &[Event]) -> Option<String> {
    events
        .iter()
        .filter(|event| event.ty == INSTANTIATE_EVENT)
        .find_map(|event| attribute_value(event, CONTRACT_ADDRESS_ATTR))
        .map(str::to_string)
}
