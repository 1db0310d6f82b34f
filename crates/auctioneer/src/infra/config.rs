use {
    crate::domain::registry::{self, Registry},
    model::{
        buyer::Buyer,
        coverage::{BuyerServiceConfig, BuyerServiceZipCode},
    },
    serde::Deserialize,
    std::path::Path,
    thiserror::Error,
};

/// On-disk shape of the buyer registry, written by the admin layer.
#[derive(Deserialize)]
struct RegistryFile {
    #[serde(default)]
    buyers: Vec<Buyer>,
    #[serde(default)]
    services: Vec<BuyerServiceConfig>,
    #[serde(default)]
    coverage: Vec<BuyerServiceZipCode>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read registry file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse registry file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Invalid(#[from] registry::Error),
}

/// Reads and validates the registry snapshot the engine works against.
pub fn load(path: &Path) -> Result<Registry, LoadError> {
    let raw = std::fs::read_to_string(path)?;
    let file: RegistryFile = toml::from_str(&raw)?;
    tracing::info!(
        buyers = file.buyers.len(),
        services = file.services.len(),
        coverage = file.coverage.len(),
        "loaded buyer registry"
    );
    Ok(Registry::new(file.buyers, file.services, file.coverage)?)
}

#[cfg(test)]
mod tests {
    use {super::*, model::BuyerId};

    #[test]
    fn parses_a_complete_registry() {
        let raw = r#"
            [[buyers]]
            id = 1
            name = "Acme Exteriors"
            active = true
            kind = "contractor"
            api_url = "https://api.acme.invalid/leads"
            auth = { scheme = "api_key", header = "X-Api-Key", key = "k1" }
            ping_timeout_ms = 500
            post_timeout_ms = 2000

            [[services]]
            buyer_id = 1
            service_type_id = 7
            active = true
            min_bid = "10"
            max_bid = "60"
            requires_trusted_form = true

            [services.mapping]
            version = 1
            static_fields = { TrafficSource = "leadgen" }

            [[services.mapping.mappings]]
            source_field = "phone"
            target_field = "Phone"
            transform = "phone_e164"
            required = true

            [[coverage]]
            buyer_id = 1
            service_type_id = 7
            zip_code = "10001"
            active = true
            priority = 5
            max_leads_per_day = 25
        "#;
        let file: RegistryFile = toml::from_str(raw).unwrap();
        let registry = Registry::new(file.buyers, file.services, file.coverage).unwrap();
        let buyer = registry.buyer(BuyerId(1)).unwrap();
        assert_eq!(buyer.name, "Acme Exteriors");
        assert!(registry
            .coverage(BuyerId(1), model::ServiceTypeId(7), "10001")
            .is_some());
    }

    #[test]
    fn rejects_unknown_transform_at_load_time() {
        let raw = r#"
            [[buyers]]
            id = 1
            name = "Acme"
            active = true
            kind = "contractor"
            api_url = "https://api.acme.invalid/leads"
            auth = { scheme = "bearer", token = "t" }
            ping_timeout_ms = 500
            post_timeout_ms = 2000

            [[services]]
            buyer_id = 1
            service_type_id = 7
            active = true
            min_bid = "10"
            max_bid = "60"

            [[services.mapping.mappings]]
            source_field = "phone"
            target_field = "Phone"
            transform = "reverse_string"
        "#;
        let file: RegistryFile = toml::from_str(raw).unwrap();
        let result = Registry::new(file.buyers, file.services, file.coverage);
        assert!(matches!(result, Err(registry::Error::Mapping { .. })));
    }
}
