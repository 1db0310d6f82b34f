//! Delivery of a won lead: sequential POSTs down the ranked bid pool with
//! bounded retries per buyer and failover to the next bidder.

use {
    crate::{
        domain::{
            auction::Bid,
            mapping::{self, Payload, Phase},
        },
        infra::{
            buyers::BuyerApi,
            persistence::{Persistence, TransactionDraft},
        },
        metrics::Metrics,
    },
    model::{
        lead::{FailureReason, Lead},
        transaction::{ActionType, TransactionStatus},
    },
    std::{sync::Arc, time::Duration},
};

pub struct Dispatcher {
    pub api: Arc<dyn BuyerApi>,
    pub persistence: Arc<dyn Persistence>,
    /// POST attempts per buyer before failing over.
    pub max_attempts: u32,
    /// Backoff before the first retry; doubles per further retry.
    pub retry_backoff: Duration,
}

impl Dispatcher {
    /// Walks the ranked pool until one buyer accepts the lead. Ends in
    /// exactly one terminal lead transition: Completed with the winner
    /// recorded, or Failed(PostExhausted).
    pub async fn deliver(&self, lead: &Lead, pool: Vec<Bid>) {
        for bid in pool {
            let candidate = &bid.candidate;
            let buyer = &candidate.buyer;
            let service_type = candidate.service.service_type_id;

            // Eligibility was computed before the auction started, so the
            // cap is re-checked here, atomically with the reservation.
            if !self
                .persistence
                .reserve_delivery(buyer.id, service_type, candidate.max_leads_per_day)
                .await
            {
                tracing::info!(buyer = %buyer.id, "daily cap reached since eligibility, skipping");
                continue;
            }

            let mapped =
                mapping::build_payload(&candidate.service.mapping, &lead.attributes, Phase::Post);
            if !mapped.is_complete() {
                for error in &mapped.errors {
                    tracing::warn!(buyer = %buyer.id, %error, "delivery payload incomplete");
                }
                self.persistence.release_delivery(buyer.id, service_type).await;
                continue;
            }

            if self.post_with_retries(lead, &bid, &mapped.payload).await {
                if self
                    .persistence
                    .complete(lead.id, buyer.id, bid.amount)
                    .await
                {
                    tracing::info!(buyer = %buyer.id, bid = %bid.amount, "lead delivered");
                    Metrics::auction_completed(bid.amount);
                } else {
                    // The CAS failed: the lead is already terminal. Should
                    // never happen while claims are exclusive.
                    tracing::error!(buyer = %buyer.id, "lead no longer in processing, not recording winner");
                }
                return;
            }

            self.persistence.release_delivery(buyer.id, service_type).await;
        }

        if self
            .persistence
            .fail(lead.id, FailureReason::PostExhausted)
            .await
        {
            tracing::warn!("every ranked bidder refused delivery");
            Metrics::auction_post_exhausted();
        }
    }

    async fn post_with_retries(&self, lead: &Lead, bid: &Bid, payload: &Payload) -> bool {
        let buyer = &bid.candidate.buyer;
        let attempts = self.max_attempts.max(1);
        for attempt in 1..=attempts {
            let started = tokio::time::Instant::now();
            let result =
                tokio::time::timeout(buyer.post_timeout(), self.api.post(buyer, payload)).await;
            let elapsed = started.elapsed();
            let status = match result {
                Ok(Ok(outcome)) if outcome.success => {
                    tracing::debug!(
                        buyer = %buyer.id,
                        buyer_lead_id = ?outcome.buyer_lead_id,
                        "delivery accepted"
                    );
                    self.record_post(lead, buyer.id, TransactionStatus::Success, elapsed)
                        .await;
                    Metrics::post_ok(buyer, elapsed);
                    return true;
                }
                Ok(Ok(outcome)) => {
                    tracing::warn!(
                        buyer = %buyer.id,
                        attempt,
                        error = ?outcome.error,
                        "buyer reported delivery failure"
                    );
                    TransactionStatus::Failed
                }
                Ok(Err(err)) => {
                    tracing::warn!(buyer = %buyer.id, attempt, ?err, "delivery failed");
                    TransactionStatus::Failed
                }
                Err(_) => {
                    tracing::warn!(buyer = %buyer.id, attempt, "delivery timed out");
                    TransactionStatus::Timeout
                }
            };
            self.record_post(lead, buyer.id, status, elapsed).await;
            match status {
                TransactionStatus::Timeout => Metrics::post_timeout(buyer, elapsed),
                _ => Metrics::post_failed(buyer, elapsed),
            }
            if attempt < attempts {
                tokio::time::sleep(self.retry_backoff * 2u32.pow(attempt - 1)).await;
            }
        }
        false
    }

    async fn record_post(
        &self,
        lead: &Lead,
        buyer_id: model::BuyerId,
        status: TransactionStatus,
        response_time: Duration,
    ) {
        self.persistence
            .record(TransactionDraft {
                lead_id: lead.id,
                buyer_id,
                action: ActionType::Post,
                status,
                bid_amount: None,
                response_time,
            })
            .await;
    }
}
