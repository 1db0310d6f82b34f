use {
    model::{
        lead::{FailureReason, Lead},
        transaction::{ActionType, Transaction, TransactionStatus},
        BuyerId, LeadId, ServiceTypeId,
    },
    rust_decimal::Decimal,
    std::{collections::HashMap, time::Duration},
};

pub mod memory;

pub use memory::InMemory;

/// A ledger row before the store assigned id and timestamp.
#[derive(Clone, Debug)]
pub struct TransactionDraft {
    pub lead_id: LeadId,
    pub buyer_id: BuyerId,
    pub action: ActionType,
    pub status: TransactionStatus,
    pub bid_amount: Option<Decimal>,
    pub response_time: Duration,
}

/// Narrow seam in front of the shared engine state: the append-only
/// transaction ledger, the per-buyer daily delivery counters and the lead
/// records. The counter operations are atomic so concurrent auctions
/// cannot both pass a cap check and over-deliver; the lead transitions
/// are compare-and-swap so a lead can never complete twice.
#[async_trait::async_trait]
pub trait Persistence: Send + Sync {
    /// Appends one PING/POST attempt to the ledger.
    async fn record(&self, draft: TransactionDraft) -> Transaction;

    /// All ledger rows of one lead, in insertion order.
    async fn transactions(&self, lead: LeadId) -> Vec<Transaction>;

    /// Per-buyer delivery counts for the current UTC day, including
    /// in-flight reservations.
    async fn delivered_today(&self, service_type: ServiceTypeId) -> HashMap<BuyerId, u32>;

    /// Check-and-reserve against the buyer's daily cap in one atomic
    /// step. Returns false when the cap is already exhausted. A `None`
    /// cap always reserves (the counter still tracks volume).
    async fn reserve_delivery(
        &self,
        buyer: BuyerId,
        service_type: ServiceTypeId,
        cap: Option<u32>,
    ) -> bool;

    /// Rolls a reservation back after the buyer's delivery ultimately
    /// failed.
    async fn release_delivery(&self, buyer: BuyerId, service_type: ServiceTypeId);

    /// Next lead waiting for an auction, if any.
    async fn next_pending_lead(&self) -> Option<Lead>;

    /// Pending -> Processing. False when the lead was already claimed,
    /// guarding against concurrent auctions for the same lead.
    async fn claim(&self, lead: LeadId) -> bool;

    /// Processing -> Completed with the winner recorded. False when the
    /// lead is not in Processing (the double-win guard).
    async fn complete(&self, lead: LeadId, winner: BuyerId, winning_bid: Decimal) -> bool;

    /// Processing -> Failed.
    async fn fail(&self, lead: LeadId, reason: FailureReason) -> bool;

    async fn lead(&self, id: LeadId) -> Option<Lead>;

    /// Intake seam: enqueues a validated lead for auctioning.
    async fn add_lead(&self, lead: Lead);
}
