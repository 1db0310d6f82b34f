pub mod buyers;
pub mod config;
pub mod persistence;

pub use {
    buyers::{BuyerApi, HttpBuyerApi},
    persistence::Persistence,
};
