use {
    crate::{mapping::FieldMappingConfig, BuyerId, ServiceTypeId},
    rust_decimal::Decimal,
    serde::{Deserialize, Serialize},
};

/// Per buyer and service vertical: bid bounds, compliance requirements and
/// the payload mapping. Unique per `(buyer_id, service_type_id)`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct BuyerServiceConfig {
    pub buyer_id: BuyerId,
    pub service_type_id: ServiceTypeId,
    pub active: bool,
    pub min_bid: Decimal,
    pub max_bid: Decimal,
    #[serde(default)]
    pub requires_trusted_form: bool,
    #[serde(default)]
    pub requires_jornaya: bool,
    pub mapping: FieldMappingConfig,
}

/// A row of the ZIP coverage table, populated by the bulk import job.
/// Unique per `(buyer_id, service_type_id, zip_code)`. Bid bounds and
/// priority set here override the service-level config for this ZIP.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct BuyerServiceZipCode {
    pub buyer_id: BuyerId,
    pub service_type_id: ServiceTypeId,
    pub zip_code: String,
    pub active: bool,
    #[serde(default)]
    pub priority: i32,
    pub max_leads_per_day: Option<u32>,
    pub min_bid: Option<Decimal>,
    pub max_bid: Option<Decimal>,
}
