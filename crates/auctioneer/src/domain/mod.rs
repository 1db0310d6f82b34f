pub mod auction;
pub mod delivery;
pub mod eligibility;
pub mod mapping;
pub mod registry;

pub use {
    auction::{Bid, Coordinator, Outcome},
    delivery::Dispatcher,
    eligibility::Candidate,
    registry::Registry,
};
