use cosmwasm_schema::cw_serde;
use cosmwasm_std::Addr;
use cw_storage_plus::Item;

#[cw_serde]
pub struct Config {
    /// Task owner this proxy calls on behalf of
    pub owner: Addr,
    /// Registry that instantiated the proxy
    pub registry: Addr,
}

pub const CONFIG: Item<Config> = Item::new("config");
