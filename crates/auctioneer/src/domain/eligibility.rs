use {
    crate::domain::registry::Registry,
    itertools::Itertools,
    model::{
        buyer::{Buyer, BuyerKind},
        coverage::BuyerServiceConfig,
        lead::{Lead, JORNAYA_FIELD, TRUSTED_FORM_FIELD},
        BuyerId,
    },
    rust_decimal::Decimal,
    std::{collections::HashMap, sync::Arc},
};

/// One buyer admitted to an auction, with the bid bounds and priority in
/// effect for the lead's ZIP (ZIP row overrides win over the service
/// config).
#[derive(Clone)]
pub struct Candidate {
    pub buyer: Arc<Buyer>,
    pub service: Arc<BuyerServiceConfig>,
    pub min_bid: Decimal,
    pub max_bid: Decimal,
    pub priority: i32,
    pub max_leads_per_day: Option<u32>,
}

/// Computes the ordered candidate list for a lead. Read-only; an empty
/// result is the no-bids precondition, not an error.
///
/// A buyer qualifies when it is active, has an active service config for
/// the lead's vertical, has an active coverage row for the lead's ZIP,
/// has not hit its daily cap, and its compliance requirements are
/// satisfied by the lead's captured tokens.
pub fn resolve(
    lead: &Lead,
    registry: &Registry,
    delivered_today: &HashMap<BuyerId, u32>,
) -> Vec<Candidate> {
    registry
        .services_for(lead.service_type_id)
        .filter_map(|service| {
            let buyer = registry.buyer(service.buyer_id)?;
            if !buyer.active || !service.active {
                return None;
            }
            let row = registry.coverage(service.buyer_id, service.service_type_id, &lead.zip_code)?;
            if !row.active {
                return None;
            }
            if service.requires_trusted_form && !lead.has_compliance_token(TRUSTED_FORM_FIELD) {
                return None;
            }
            if service.requires_jornaya && !lead.has_compliance_token(JORNAYA_FIELD) {
                return None;
            }
            if let Some(cap) = row.max_leads_per_day {
                let delivered = delivered_today.get(&buyer.id).copied().unwrap_or(0);
                if delivered >= cap {
                    tracing::debug!(buyer = %buyer.id, %cap, "daily cap reached, excluding");
                    return None;
                }
            }
            let min_bid = row.min_bid.unwrap_or(service.min_bid);
            let max_bid = row.max_bid.unwrap_or(service.max_bid);
            if min_bid > max_bid {
                // A ZIP override crossing the service bounds is an admin
                // data problem; exclude rather than clamp backwards.
                tracing::warn!(
                    buyer = %buyer.id,
                    zip = %lead.zip_code,
                    %min_bid,
                    %max_bid,
                    "effective bid bounds crossed, excluding"
                );
                return None;
            }
            Some(Candidate {
                buyer: buyer.clone(),
                service: service.clone(),
                min_bid,
                max_bid,
                priority: row.priority,
                max_leads_per_day: row.max_leads_per_day,
            })
        })
        .sorted_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| kind_rank(a.buyer.kind).cmp(&kind_rank(b.buyer.kind)))
                .then_with(|| a.buyer.id.cmp(&b.buyer.id))
        })
        .collect()
}

/// Networks outrank contractors at equal priority.
fn kind_rank(kind: BuyerKind) -> u8 {
    match kind {
        BuyerKind::Network => 0,
        BuyerKind::Contractor => 1,
    }
}
