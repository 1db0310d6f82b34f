use {
    crate::domain::mapping::transforms,
    model::{
        buyer::Buyer,
        coverage::{BuyerServiceConfig, BuyerServiceZipCode},
        mapping::MappingConfigError,
        BuyerId, ServiceTypeId,
    },
    std::{collections::HashMap, sync::Arc},
    thiserror::Error,
};

/// Immutable snapshot of the buyer panel: buyers, their per-service
/// configs and their ZIP coverage. Written by the admin layer, read-only
/// here; a fresh snapshot requires a restart, which also makes the
/// "candidate set is fixed per auction" rule trivially true.
pub struct Registry {
    buyers: HashMap<BuyerId, Arc<Buyer>>,
    services: Vec<Arc<BuyerServiceConfig>>,
    coverage: HashMap<(BuyerId, ServiceTypeId, String), BuyerServiceZipCode>,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("duplicate buyer id {0}")]
    DuplicateBuyer(BuyerId),
    #[error("duplicate service config for buyer {buyer} and service type {service_type}")]
    DuplicateService {
        buyer: BuyerId,
        service_type: ServiceTypeId,
    },
    #[error("duplicate coverage row for buyer {buyer}, service type {service_type}, zip {zip}")]
    DuplicateCoverage {
        buyer: BuyerId,
        service_type: ServiceTypeId,
        zip: String,
    },
    #[error("config references unknown buyer {0}")]
    UnknownBuyer(BuyerId),
    #[error("buyer {buyer} service type {service_type}: min_bid exceeds max_bid")]
    InvalidBidBounds {
        buyer: BuyerId,
        service_type: ServiceTypeId,
    },
    #[error("mapping config of buyer {buyer} service type {service_type}: {source}")]
    Mapping {
        buyer: BuyerId,
        service_type: ServiceTypeId,
        source: MappingConfigError,
    },
}

impl Registry {
    /// Builds and validates a snapshot. Every mapping config is checked
    /// against the transform registry here so a malformed admin edit
    /// fails at startup instead of mid-auction.
    pub fn new(
        buyers: Vec<Buyer>,
        services: Vec<BuyerServiceConfig>,
        coverage: Vec<BuyerServiceZipCode>,
    ) -> Result<Self, Error> {
        let mut buyer_index = HashMap::new();
        for buyer in buyers {
            let id = buyer.id;
            if buyer_index.insert(id, Arc::new(buyer)).is_some() {
                return Err(Error::DuplicateBuyer(id));
            }
        }

        let mut service_index: Vec<Arc<BuyerServiceConfig>> = Vec::new();
        for service in services {
            if !buyer_index.contains_key(&service.buyer_id) {
                return Err(Error::UnknownBuyer(service.buyer_id));
            }
            if service_index.iter().any(|existing| {
                existing.buyer_id == service.buyer_id
                    && existing.service_type_id == service.service_type_id
            }) {
                return Err(Error::DuplicateService {
                    buyer: service.buyer_id,
                    service_type: service.service_type_id,
                });
            }
            if service.min_bid > service.max_bid {
                return Err(Error::InvalidBidBounds {
                    buyer: service.buyer_id,
                    service_type: service.service_type_id,
                });
            }
            service
                .mapping
                .validate(transforms::is_known)
                .map_err(|source| Error::Mapping {
                    buyer: service.buyer_id,
                    service_type: service.service_type_id,
                    source,
                })?;
            for warning in service.mapping.warnings() {
                tracing::debug!(
                    buyer = %service.buyer_id,
                    service_type = %service.service_type_id,
                    warning,
                    "mapping config advisory"
                );
            }
            service_index.push(Arc::new(service));
        }

        let mut coverage_index = HashMap::new();
        for row in coverage {
            if !buyer_index.contains_key(&row.buyer_id) {
                return Err(Error::UnknownBuyer(row.buyer_id));
            }
            let key = (row.buyer_id, row.service_type_id, row.zip_code.clone());
            if coverage_index.contains_key(&key) {
                return Err(Error::DuplicateCoverage {
                    buyer: key.0,
                    service_type: key.1,
                    zip: key.2,
                });
            }
            coverage_index.insert(key, row);
        }

        Ok(Self {
            buyers: buyer_index,
            services: service_index,
            coverage: coverage_index,
        })
    }

    pub fn buyer(&self, id: BuyerId) -> Option<&Arc<Buyer>> {
        self.buyers.get(&id)
    }

    /// All service configs for one vertical, across buyers.
    pub fn services_for(
        &self,
        service_type: ServiceTypeId,
    ) -> impl Iterator<Item = &Arc<BuyerServiceConfig>> {
        self.services
            .iter()
            .filter(move |service| service.service_type_id == service_type)
    }

    pub fn coverage(
        &self,
        buyer: BuyerId,
        service_type: ServiceTypeId,
        zip: &str,
    ) -> Option<&BuyerServiceZipCode> {
        self.coverage
            .get(&(buyer, service_type, zip.to_string()))
    }
}
