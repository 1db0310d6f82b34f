use {
    crate::BuyerId,
    serde::{Deserialize, Serialize},
    std::time::Duration,
    url::Url,
};

/// An external party bidding for leads.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Buyer {
    pub id: BuyerId,
    pub name: String,
    pub active: bool,
    pub kind: BuyerKind,
    /// Endpoint receiving both bid requests and deliveries.
    pub api_url: Url,
    pub auth: AuthConfig,
    /// Upper bound for a single bid request to this buyer.
    pub ping_timeout_ms: u64,
    /// Upper bound for a single delivery attempt to this buyer.
    pub post_timeout_ms: u64,
}

impl Buyer {
    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }

    pub fn post_timeout(&self) -> Duration {
        Duration::from_millis(self.post_timeout_ms)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuyerKind {
    /// Buys leads for its own crews.
    Contractor,
    /// Resells leads into its own buyer panel.
    Network,
}

/// How outbound requests to a buyer authenticate. One variant per scheme
/// seen across the buyer panel.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "scheme")]
pub enum AuthConfig {
    /// Static key sent in a custom header.
    ApiKey { header: String, key: String },
    /// `Authorization: Bearer <token>`.
    Bearer { token: String },
    /// HTTP basic auth.
    Basic { username: String, password: String },
}

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn auth_config_is_tagged_by_scheme() {
        let auth: AuthConfig = serde_json::from_value(json!({
            "scheme": "api_key",
            "header": "X-Api-Key",
            "key": "s3cret",
        }))
        .unwrap();
        assert_eq!(
            auth,
            AuthConfig::ApiKey {
                header: "X-Api-Key".to_string(),
                key: "s3cret".to_string(),
            }
        );
    }
}
