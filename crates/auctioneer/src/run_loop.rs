use {
    crate::{
        domain::{self, auction::Outcome, eligibility},
        infra::persistence::Persistence,
        metrics::Metrics,
    },
    model::lead::{FailureReason, Lead},
    std::{sync::Arc, time::Duration},
    tracing::Instrument,
};

pub struct RunLoop {
    pub registry: Arc<domain::Registry>,
    pub persistence: Arc<dyn Persistence>,
    pub coordinator: domain::Coordinator,
    pub dispatcher: domain::Dispatcher,
    pub idle_poll_interval: Duration,
}

impl RunLoop {
    pub async fn run_forever(self) -> ! {
        loop {
            let Some(lead) = self.persistence.next_pending_lead().await else {
                tokio::time::sleep(self.idle_poll_interval).await;
                continue;
            };
            if !self.persistence.claim(lead.id).await {
                // Someone else picked it up between the poll and the claim.
                continue;
            }
            let id = lead.id;
            self.single_run(lead)
                .instrument(tracing::info_span!("auction", lead = %id))
                .await;
        }
    }

    /// One full auction for a claimed lead: eligibility snapshot, bidding
    /// round, delivery. The lead leaves in a terminal state.
    async fn single_run(&self, lead: Lead) {
        let delivered = self
            .persistence
            .delivered_today(lead.service_type_id)
            .await;
        let candidates = eligibility::resolve(&lead, &self.registry, &delivered);
        tracing::debug!(candidates = candidates.len(), "eligibility resolved");

        match self.coordinator.run(&lead, candidates).await {
            Outcome::Winner(pool) => self.dispatcher.deliver(&lead, pool).await,
            Outcome::NoBids => {
                self.persistence.fail(lead.id, FailureReason::NoBids).await;
                Metrics::auction_no_bids();
            }
        }
    }
}
