//! Data model shared between the auction engine and the surrounding
//! services (intake, admin, reporting).

pub mod buyer;
pub mod coverage;
pub mod lead;
pub mod mapping;
pub mod transaction;

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(
            Clone,
            Copy,
            Debug,
            Default,
            Deserialize,
            Eq,
            Hash,
            Ord,
            PartialEq,
            PartialOrd,
            Serialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

id_type!(
    /// Identifier of a lead, assigned by the intake layer.
    LeadId
);
id_type!(
    /// Identifier of a buyer (contractor or network).
    BuyerId
);
id_type!(
    /// Identifier of a service vertical (roofing, windows, ...).
    ServiceTypeId
);
id_type!(
    /// Identifier of a ledger row, assigned on insert.
    TransactionId
);
