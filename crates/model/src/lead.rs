use {
    crate::{BuyerId, LeadId, ServiceTypeId},
    rust_decimal::Decimal,
    serde::{Deserialize, Serialize},
};

/// Attribute key under which the intake layer stores the TrustedForm
/// certificate URL, when one was captured.
pub const TRUSTED_FORM_FIELD: &str = "trusted_form_cert_url";
/// Attribute key under which the intake layer stores the Jornaya lead id.
pub const JORNAYA_FIELD: &str = "jornaya_lead_id";

/// A customer service request handed to the engine by the intake layer.
///
/// Immutable once created except for `status`, `winning_buyer_id` and
/// `winning_bid`, which only the engine writes.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Lead {
    pub id: LeadId,
    pub service_type_id: ServiceTypeId,
    pub zip_code: String,
    /// Form data plus already-captured compliance tokens. Always a JSON
    /// object; nested objects are addressed with dot paths by the field
    /// mapping engine.
    pub attributes: serde_json::Value,
    pub status: LeadStatus,
    pub winning_buyer_id: Option<BuyerId>,
    pub winning_bid: Option<Decimal>,
}

impl Lead {
    /// Whether the given compliance attribute was captured as a non-empty
    /// string.
    pub fn has_compliance_token(&self, field: &str) -> bool {
        matches!(self.attributes.get(field), Some(serde_json::Value::String(s)) if !s.is_empty())
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "reason")]
pub enum LeadStatus {
    Pending,
    Processing,
    Completed,
    Failed(FailureReason),
}

/// Why a lead ended up `Failed`. Detailed per-attempt failures live in the
/// transaction ledger, not here.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// No eligible buyer returned a valid bid.
    NoBids,
    /// Every ranked bidder refused or failed delivery.
    PostExhausted,
}
