//! Wire types for buyer endpoints. Buyer panels are not uniform about
//! casing, so the deserializers accept both snake_case and camelCase.

use {rust_decimal::Decimal, serde::Deserialize};

/// Expected reply to a bid request.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct PingResponse {
    #[serde(default)]
    pub accepted: bool,
    #[serde(default, alias = "bidAmount", alias = "bid")]
    pub bid_amount: Option<Decimal>,
    #[serde(default, alias = "rejectionReason")]
    pub rejection_reason: Option<String>,
}

/// Expected reply to a delivery.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct PostResponse {
    #[serde(default)]
    pub success: bool,
    /// The id the buyer's CRM assigned to the lead, when reported.
    #[serde(default, alias = "buyerLeadId", alias = "lead_id", alias = "leadId")]
    pub buyer_lead_id: Option<String>,
    #[serde(default, alias = "errorMessage")]
    pub error: Option<String>,
}
