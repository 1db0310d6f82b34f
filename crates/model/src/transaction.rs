use {
    crate::{BuyerId, LeadId, TransactionId},
    chrono::{DateTime, Utc},
    rust_decimal::Decimal,
    serde::{Deserialize, Serialize},
    std::time::Duration,
};

/// One audited PING or POST attempt. Append-only: rows are inserted by the
/// engine and never updated or deleted.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub lead_id: LeadId,
    pub buyer_id: BuyerId,
    pub action: ActionType,
    pub status: TransactionStatus,
    /// For PING rows: the buyer's bid after clamping into its effective
    /// bounds. Absent for rejections, failures and POST rows.
    pub bid_amount: Option<Decimal>,
    #[serde(with = "duration_millis")]
    pub response_time: Duration,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Bid request.
    Ping,
    /// Full lead delivery.
    Post,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Success,
    Failed,
    Timeout,
}

mod duration_millis {
    use {
        serde::{Deserialize, Deserializer, Serialize, Serializer},
        std::time::Duration,
    };

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        u64::try_from(value.as_millis())
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
