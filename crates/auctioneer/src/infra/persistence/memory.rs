use {
    super::{Persistence, TransactionDraft},
    chrono::{NaiveDate, Utc},
    dashmap::DashMap,
    model::{
        lead::{FailureReason, Lead, LeadStatus},
        transaction::Transaction,
        BuyerId, LeadId, ServiceTypeId, TransactionId,
    },
    rust_decimal::Decimal,
    std::{
        collections::{HashMap, VecDeque},
        sync::atomic::{AtomicI64, Ordering},
    },
    tokio::sync::Mutex,
};

/// Process-wide in-memory store. The storage technology behind the
/// `Persistence` seam is deliberately replaceable; this implementation is
/// the authoritative one for tests and single-node deployments.
#[derive(Default)]
pub struct InMemory {
    next_transaction_id: AtomicI64,
    /// Append-only; guarded by one lock to keep insertion order exact.
    ledger: Mutex<Vec<Transaction>>,
    /// (buyer, service type, UTC day) -> confirmed + in-flight deliveries.
    daily: Mutex<HashMap<(BuyerId, ServiceTypeId, NaiveDate), u32>>,
    leads: DashMap<LeadId, Lead>,
    pending: Mutex<VecDeque<LeadId>>,
}

impl InMemory {
    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }
}

#[async_trait::async_trait]
impl Persistence for InMemory {
    async fn record(&self, draft: TransactionDraft) -> Transaction {
        let transaction = Transaction {
            id: TransactionId(self.next_transaction_id.fetch_add(1, Ordering::Relaxed)),
            lead_id: draft.lead_id,
            buyer_id: draft.buyer_id,
            action: draft.action,
            status: draft.status,
            bid_amount: draft.bid_amount,
            response_time: draft.response_time,
            created_at: Utc::now(),
        };
        self.ledger.lock().await.push(transaction.clone());
        transaction
    }

    async fn transactions(&self, lead: LeadId) -> Vec<Transaction> {
        self.ledger
            .lock()
            .await
            .iter()
            .filter(|tx| tx.lead_id == lead)
            .cloned()
            .collect()
    }

    async fn delivered_today(&self, service_type: ServiceTypeId) -> HashMap<BuyerId, u32> {
        let today = Self::today();
        self.daily
            .lock()
            .await
            .iter()
            .filter(|((_, service, day), _)| *service == service_type && *day == today)
            .map(|((buyer, _, _), count)| (*buyer, *count))
            .collect()
    }

    async fn reserve_delivery(
        &self,
        buyer: BuyerId,
        service_type: ServiceTypeId,
        cap: Option<u32>,
    ) -> bool {
        let mut daily = self.daily.lock().await;
        let count = daily
            .entry((buyer, service_type, Self::today()))
            .or_insert(0);
        if cap.is_some_and(|cap| *count >= cap) {
            return false;
        }
        *count += 1;
        true
    }

    async fn release_delivery(&self, buyer: BuyerId, service_type: ServiceTypeId) {
        let mut daily = self.daily.lock().await;
        if let Some(count) = daily.get_mut(&(buyer, service_type, Self::today())) {
            *count = count.saturating_sub(1);
        }
    }

    async fn next_pending_lead(&self) -> Option<Lead> {
        let mut pending = self.pending.lock().await;
        while let Some(id) = pending.pop_front() {
            if let Some(lead) = self.leads.get(&id) {
                if lead.status == LeadStatus::Pending {
                    return Some(lead.clone());
                }
            }
        }
        None
    }

    async fn claim(&self, lead: LeadId) -> bool {
        match self.leads.get_mut(&lead) {
            Some(mut entry) if entry.status == LeadStatus::Pending => {
                entry.status = LeadStatus::Processing;
                true
            }
            _ => false,
        }
    }

    async fn complete(&self, lead: LeadId, winner: BuyerId, winning_bid: Decimal) -> bool {
        match self.leads.get_mut(&lead) {
            Some(mut entry) if entry.status == LeadStatus::Processing => {
                entry.status = LeadStatus::Completed;
                entry.winning_buyer_id = Some(winner);
                entry.winning_bid = Some(winning_bid);
                true
            }
            _ => false,
        }
    }

    async fn fail(&self, lead: LeadId, reason: FailureReason) -> bool {
        match self.leads.get_mut(&lead) {
            Some(mut entry) if entry.status == LeadStatus::Processing => {
                entry.status = LeadStatus::Failed(reason);
                true
            }
            _ => false,
        }
    }

    async fn lead(&self, id: LeadId) -> Option<Lead> {
        self.leads.get(&id).map(|entry| entry.clone())
    }

    async fn add_lead(&self, lead: Lead) {
        let id = lead.id;
        self.leads.insert(id, lead);
        self.pending.lock().await.push_back(id);
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        model::{
            lead::LeadStatus,
            transaction::{ActionType, TransactionStatus},
        },
        serde_json::json,
        std::time::Duration,
    };

    fn lead(id: i64) -> Lead {
        Lead {
            id: LeadId(id),
            service_type_id: ServiceTypeId(7),
            zip_code: "10001".to_string(),
            attributes: json!({}),
            status: LeadStatus::Pending,
            winning_buyer_id: None,
            winning_bid: None,
        }
    }

    #[tokio::test]
    async fn claim_is_exclusive() {
        let store = InMemory::default();
        store.add_lead(lead(1)).await;
        assert!(store.claim(LeadId(1)).await);
        assert!(!store.claim(LeadId(1)).await);
    }

    #[tokio::test]
    async fn complete_requires_processing() {
        let store = InMemory::default();
        store.add_lead(lead(1)).await;
        assert!(!store.complete(LeadId(1), BuyerId(2), Decimal::from(55)).await);
        assert!(store.claim(LeadId(1)).await);
        assert!(store.complete(LeadId(1), BuyerId(2), Decimal::from(55)).await);
        // The double-win guard.
        assert!(!store.complete(LeadId(1), BuyerId(3), Decimal::from(60)).await);
        let lead = store.lead(LeadId(1)).await.unwrap();
        assert_eq!(lead.status, LeadStatus::Completed);
        assert_eq!(lead.winning_buyer_id, Some(BuyerId(2)));
        assert_eq!(lead.winning_bid, Some(Decimal::from(55)));
    }

    #[tokio::test]
    async fn reservations_enforce_the_cap_and_roll_back() {
        let store = InMemory::default();
        let buyer = BuyerId(1);
        let service = ServiceTypeId(7);
        assert!(store.reserve_delivery(buyer, service, Some(2)).await);
        assert!(store.reserve_delivery(buyer, service, Some(2)).await);
        assert!(!store.reserve_delivery(buyer, service, Some(2)).await);
        store.release_delivery(buyer, service).await;
        assert!(store.reserve_delivery(buyer, service, Some(2)).await);
        assert_eq!(store.delivered_today(service).await[&buyer], 2);
    }

    #[tokio::test]
    async fn ledger_keeps_insertion_order() {
        let store = InMemory::default();
        for buyer in [3, 1, 2] {
            store
                .record(TransactionDraft {
                    lead_id: LeadId(1),
                    buyer_id: BuyerId(buyer),
                    action: ActionType::Ping,
                    status: TransactionStatus::Success,
                    bid_amount: None,
                    response_time: Duration::from_millis(10),
                })
                .await;
        }
        let rows = store.transactions(LeadId(1)).await;
        let buyers: Vec<_> = rows.iter().map(|tx| tx.buyer_id.0).collect();
        assert_eq!(buyers, vec![3, 1, 2]);
        assert_eq!(rows[0].id, TransactionId(0));
    }
}
