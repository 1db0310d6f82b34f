//! The per-lead bidding round: ping every candidate concurrently, clamp
//! and rank the returned bids, pick the winner.

use {
    crate::{
        domain::{
            eligibility::Candidate,
            mapping::{self, Phase},
        },
        infra::{
            buyers::{BuyerApi, CallError, PingOutcome},
            persistence::{Persistence, TransactionDraft},
        },
        metrics::Metrics,
    },
    futures::stream::{FuturesUnordered, StreamExt},
    model::{
        buyer::Buyer,
        lead::Lead,
        transaction::{ActionType, TransactionStatus},
        BuyerId, LeadId,
    },
    rust_decimal::Decimal,
    std::{sync::Arc, time::Duration},
    tokio::task::JoinHandle,
};

pub struct Coordinator {
    pub api: Arc<dyn BuyerApi>,
    pub persistence: Arc<dyn Persistence>,
    /// Overall deadline for the whole bidding round, on top of the
    /// per-buyer ping timeouts.
    pub deadline: Duration,
}

/// One valid bid in the pool: accepted, numeric and clamped into the
/// candidate's effective bounds.
#[derive(Clone)]
pub struct Bid {
    pub candidate: Candidate,
    pub amount: Decimal,
    pub response_time: Duration,
    /// Position in the eligibility ordering, the final tie-break.
    pub eligibility_rank: usize,
}

pub enum Outcome {
    /// The valid-bid pool ranked best-first; the head is the winner.
    Winner(Vec<Bid>),
    NoBids,
}

type PingTask = (
    usize,
    Arc<Buyer>,
    Duration,
    Result<Result<PingOutcome, CallError>, tokio::time::error::Elapsed>,
);

impl Coordinator {
    /// Runs the bidding round against a fixed candidate snapshot. Exactly
    /// one PING transaction is recorded per candidate; a candidate that
    /// errors or times out is excluded from the pool, never fatal for the
    /// others.
    pub async fn run(&self, lead: &Lead, candidates: Vec<Candidate>) -> Outcome {
        if candidates.is_empty() {
            tracing::info!("no eligible buyers");
            return Outcome::NoBids;
        }

        let deadline = tokio::time::Instant::now() + self.deadline;
        let mut in_flight: FuturesUnordered<JoinHandle<PingTask>> = FuturesUnordered::new();
        for (rank, candidate) in candidates.iter().enumerate() {
            let mapped =
                mapping::build_payload(&candidate.service.mapping, &lead.attributes, Phase::Ping);
            if !mapped.is_complete() {
                for error in &mapped.errors {
                    tracing::warn!(buyer = %candidate.buyer.id, %error, "bid request incomplete");
                }
                self.record_ping(
                    lead.id,
                    candidate.buyer.id,
                    TransactionStatus::Failed,
                    None,
                    Duration::ZERO,
                )
                .await;
                continue;
            }
            let api = self.api.clone();
            let buyer = candidate.buyer.clone();
            let payload = mapped.payload;
            in_flight.push(tokio::spawn(async move {
                let started = tokio::time::Instant::now();
                let result =
                    tokio::time::timeout(buyer.ping_timeout(), api.ping(&buyer, &payload)).await;
                (rank, buyer, started.elapsed(), result)
            }));
        }

        let mut bids = Vec::new();
        loop {
            // Bind first so the stream borrow ends before the deadline arm
            // takes ownership of `in_flight`.
            let next = tokio::time::timeout_at(deadline, in_flight.next()).await;
            match next {
                Ok(None) => break,
                Ok(Some(Err(err))) => {
                    tracing::error!(?err, "bid request task panicked");
                }
                Ok(Some(Ok((rank, buyer, elapsed, result)))) => {
                    let candidate = &candidates[rank];
                    match result {
                        Ok(Ok(outcome)) if outcome.accepted && outcome.bid_amount.is_some() => {
                            let reported = outcome.bid_amount.unwrap_or_default();
                            let amount = reported.clamp(candidate.min_bid, candidate.max_bid);
                            if amount != reported {
                                tracing::debug!(
                                    buyer = %buyer.id, %reported, %amount, "bid clamped"
                                );
                            }
                            self.record_ping(
                                lead.id,
                                buyer.id,
                                TransactionStatus::Success,
                                Some(amount),
                                elapsed,
                            )
                            .await;
                            Metrics::ping_ok(&buyer, elapsed);
                            bids.push(Bid {
                                candidate: candidate.clone(),
                                amount,
                                response_time: elapsed,
                                eligibility_rank: rank,
                            });
                        }
                        Ok(Ok(outcome)) => {
                            // The buyer answered but declined (or omitted
                            // the amount): a successful call with no bid.
                            tracing::debug!(
                                buyer = %buyer.id,
                                reason = ?outcome.rejection_reason,
                                "bid declined"
                            );
                            self.record_ping(
                                lead.id,
                                buyer.id,
                                TransactionStatus::Success,
                                None,
                                elapsed,
                            )
                            .await;
                            Metrics::ping_rejected(&buyer, elapsed);
                        }
                        Ok(Err(err)) => {
                            tracing::warn!(buyer = %buyer.id, ?err, "bid request failed");
                            self.record_ping(
                                lead.id,
                                buyer.id,
                                TransactionStatus::Failed,
                                None,
                                elapsed,
                            )
                            .await;
                            Metrics::ping_err(&buyer, elapsed, &err);
                        }
                        Err(_) => {
                            tracing::debug!(buyer = %buyer.id, "bid request timed out");
                            self.record_ping(
                                lead.id,
                                buyer.id,
                                TransactionStatus::Timeout,
                                None,
                                elapsed,
                            )
                            .await;
                            Metrics::ping_timeout(&buyer, elapsed);
                        }
                    }
                }
                Err(_) => {
                    self.abandon(lead.id, in_flight);
                    break;
                }
            }
        }

        if bids.is_empty() {
            tracing::info!("no valid bids");
            return Outcome::NoBids;
        }
        bids.sort_by(|a, b| {
            b.amount
                .cmp(&a.amount)
                .then_with(|| a.response_time.cmp(&b.response_time))
                .then_with(|| a.eligibility_rank.cmp(&b.eligibility_rank))
        });
        tracing::info!(
            winner = %bids[0].candidate.buyer.id,
            bid = %bids[0].amount,
            pool = bids.len(),
            "winner selected"
        );
        Outcome::Winner(bids)
    }

    /// The auction moved on; outstanding calls are drained off-task so a
    /// late answer still leaves an audit row but can no longer join the
    /// pool.
    fn abandon(&self, lead: LeadId, mut in_flight: FuturesUnordered<JoinHandle<PingTask>>) {
        if in_flight.is_empty() {
            return;
        }
        tracing::warn!(
            outstanding = in_flight.len(),
            "auction deadline reached, abandoning outstanding bid requests"
        );
        let persistence = self.persistence.clone();
        tokio::spawn(async move {
            while let Some(joined) = in_flight.next().await {
                let Ok((_, buyer, elapsed, result)) = joined else {
                    continue;
                };
                if let Ok(Ok(outcome)) = &result {
                    tracing::debug!(buyer = %buyer.id, ?outcome, "late bid response ignored");
                }
                persistence
                    .record(TransactionDraft {
                        lead_id: lead,
                        buyer_id: buyer.id,
                        action: ActionType::Ping,
                        status: TransactionStatus::Timeout,
                        bid_amount: None,
                        response_time: elapsed,
                    })
                    .await;
                Metrics::ping_timeout(&buyer, elapsed);
            }
        });
    }

    async fn record_ping(
        &self,
        lead_id: LeadId,
        buyer_id: BuyerId,
        status: TransactionStatus,
        bid_amount: Option<Decimal>,
        response_time: Duration,
    ) {
        self.persistence
            .record(TransactionDraft {
                lead_id,
                buyer_id,
                action: ActionType::Ping,
                status,
                bid_amount,
                response_time,
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::infra::persistence::InMemory,
        model::{
            buyer::{AuthConfig, BuyerKind},
            coverage::BuyerServiceConfig,
            lead::LeadStatus,
            mapping::{FieldMapping, FieldMappingConfig},
            ServiceTypeId,
        },
        serde_json::json,
        std::collections::HashMap,
    };

    const SERVICE: ServiceTypeId = ServiceTypeId(7);

    /// Scripted stand-in for the buyer panel, for behaviors mockall's
    /// immediately-resolving futures cannot express (delays, hangs).
    struct ScriptedPanel {
        pings: HashMap<BuyerId, PingScript>,
    }

    enum PingScript {
        Bid { amount: Decimal, delay: Duration },
        Reject,
        Error,
        Hang,
    }

    #[async_trait::async_trait]
    impl BuyerApi for ScriptedPanel {
        async fn ping(
            &self,
            buyer: &Buyer,
            _payload: &mapping::Payload,
        ) -> Result<PingOutcome, CallError> {
            match self.pings.get(&buyer.id).expect("scripted buyer") {
                PingScript::Bid { amount, delay } => {
                    tokio::time::sleep(*delay).await;
                    Ok(PingOutcome {
                        accepted: true,
                        bid_amount: Some(*amount),
                        rejection_reason: None,
                    })
                }
                PingScript::Reject => Ok(PingOutcome {
                    accepted: false,
                    bid_amount: None,
                    rejection_reason: Some("budget".to_string()),
                }),
                PingScript::Error => Err(CallError::Status {
                    status: 500,
                    body: "oops".to_string(),
                }),
                PingScript::Hang => std::future::pending().await,
            }
        }

        async fn post(
            &self,
            _buyer: &Buyer,
            _payload: &mapping::Payload,
        ) -> Result<crate::infra::buyers::PostOutcome, CallError> {
            unreachable!("auction never posts")
        }
    }

    fn buyer(id: i64) -> Arc<Buyer> {
        Arc::new(Buyer {
            id: BuyerId(id),
            name: format!("buyer-{id}"),
            active: true,
            kind: BuyerKind::Contractor,
            api_url: "https://buyer.invalid/leads".parse().unwrap(),
            auth: AuthConfig::Bearer {
                token: "t".to_string(),
            },
            ping_timeout_ms: 500,
            post_timeout_ms: 2_000,
        })
    }

    fn candidate(id: i64, max_bid: i64) -> Candidate {
        let buyer = buyer(id);
        Candidate {
            service: Arc::new(BuyerServiceConfig {
                buyer_id: buyer.id,
                service_type_id: SERVICE,
                active: true,
                min_bid: Decimal::from(10),
                max_bid: Decimal::from(max_bid),
                requires_trusted_form: false,
                requires_jornaya: false,
                mapping: FieldMappingConfig::default(),
            }),
            buyer,
            min_bid: Decimal::from(10),
            max_bid: Decimal::from(max_bid),
            priority: 0,
            max_leads_per_day: None,
        }
    }

    fn lead() -> Lead {
        Lead {
            id: LeadId(1),
            service_type_id: SERVICE,
            zip_code: "10001".to_string(),
            attributes: json!({ "first_name": "Ada" }),
            status: LeadStatus::Processing,
            winning_buyer_id: None,
            winning_bid: None,
        }
    }

    fn coordinator(
        pings: HashMap<BuyerId, PingScript>,
        persistence: Arc<InMemory>,
    ) -> Coordinator {
        Coordinator {
            api: Arc::new(ScriptedPanel { pings }),
            persistence,
            deadline: Duration::from_secs(5),
        }
    }

    fn bid(amount: i64) -> PingScript {
        PingScript::Bid {
            amount: Decimal::from(amount),
            delay: Duration::ZERO,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn highest_clamped_bid_wins() {
        let persistence = Arc::new(InMemory::default());
        // Buyer 1 bids over its own cap of 50 and gets clamped down.
        let coordinator = coordinator(
            maplit::hashmap! {
                BuyerId(1) => bid(70),
                BuyerId(2) => bid(55),
                BuyerId(3) => bid(38),
            },
            persistence.clone(),
        );
        let candidates = vec![candidate(1, 50), candidate(2, 60), candidate(3, 40)];
        let Outcome::Winner(pool) = coordinator.run(&lead(), candidates).await else {
            panic!("expected a winner");
        };
        let ranked: Vec<_> = pool
            .iter()
            .map(|bid| (bid.candidate.buyer.id.0, bid.amount))
            .collect();
        assert_eq!(
            ranked,
            vec![
                (2, Decimal::from(55)),
                (1, Decimal::from(50)),
                (3, Decimal::from(38)),
            ]
        );
        // The winner's bid is >= every other valid bid in the pool.
        assert!(pool.iter().all(|bid| bid.amount <= pool[0].amount));
    }

    #[tokio::test(start_paused = true)]
    async fn equal_bids_rank_by_response_time() {
        let persistence = Arc::new(InMemory::default());
        let coordinator = coordinator(
            maplit::hashmap! {
                BuyerId(1) => PingScript::Bid {
                    amount: Decimal::from(50),
                    delay: Duration::from_millis(100),
                },
                BuyerId(2) => PingScript::Bid {
                    amount: Decimal::from(50),
                    delay: Duration::from_millis(10),
                },
            },
            persistence,
        );
        let candidates = vec![candidate(1, 60), candidate(2, 60)];
        let Outcome::Winner(pool) = coordinator.run(&lead(), candidates).await else {
            panic!("expected a winner");
        };
        assert_eq!(pool[0].candidate.buyer.id, BuyerId(2));
    }

    #[tokio::test(start_paused = true)]
    async fn equal_bids_and_times_fall_back_to_eligibility_order() {
        let persistence = Arc::new(InMemory::default());
        let coordinator = coordinator(
            maplit::hashmap! { BuyerId(1) => bid(50), BuyerId(2) => bid(50) },
            persistence,
        );
        // Candidate order is the eligibility ranking.
        let candidates = vec![candidate(2, 60), candidate(1, 60)];
        let Outcome::Winner(pool) = coordinator.run(&lead(), candidates).await else {
            panic!("expected a winner");
        };
        assert_eq!(pool[0].candidate.buyer.id, BuyerId(2));
    }

    #[tokio::test(start_paused = true)]
    async fn all_timeouts_yield_no_bids() {
        let persistence = Arc::new(InMemory::default());
        let coordinator = coordinator(
            maplit::hashmap! {
                BuyerId(1) => PingScript::Hang,
                BuyerId(2) => PingScript::Hang,
                BuyerId(3) => PingScript::Hang,
            },
            persistence.clone(),
        );
        let candidates = vec![candidate(1, 60), candidate(2, 60), candidate(3, 60)];
        assert!(matches!(
            coordinator.run(&lead(), candidates).await,
            Outcome::NoBids
        ));
        let rows = persistence.transactions(LeadId(1)).await;
        assert_eq!(rows.len(), 3);
        assert!(rows
            .iter()
            .all(|tx| tx.status == TransactionStatus::Timeout
                && tx.action == ActionType::Ping));
    }

    #[tokio::test(start_paused = true)]
    async fn one_failure_never_aborts_the_round() {
        let persistence = Arc::new(InMemory::default());
        let coordinator = coordinator(
            maplit::hashmap! {
                BuyerId(1) => PingScript::Error,
                BuyerId(2) => bid(42),
                BuyerId(3) => PingScript::Reject,
            },
            persistence.clone(),
        );
        let candidates = vec![candidate(1, 60), candidate(2, 60), candidate(3, 60)];
        let Outcome::Winner(pool) = coordinator.run(&lead(), candidates).await else {
            panic!("expected a winner");
        };
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].candidate.buyer.id, BuyerId(2));

        let rows = persistence.transactions(LeadId(1)).await;
        assert_eq!(rows.len(), 3);
        let status_of = |id: i64| {
            rows.iter()
                .find(|tx| tx.buyer_id == BuyerId(id))
                .unwrap()
                .status
        };
        assert_eq!(status_of(1), TransactionStatus::Failed);
        assert_eq!(status_of(2), TransactionStatus::Success);
        // A clean rejection is a successful call with no bid amount.
        assert_eq!(status_of(3), TransactionStatus::Success);
        assert_eq!(
            rows.iter()
                .find(|tx| tx.buyer_id == BuyerId(3))
                .unwrap()
                .bid_amount,
            None
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unresolved_required_field_excludes_the_candidate() {
        let persistence = Arc::new(InMemory::default());
        let coordinator = coordinator(
            maplit::hashmap! { BuyerId(1) => bid(70), BuyerId(2) => bid(42) },
            persistence.clone(),
        );
        let mut strict = candidate(1, 60);
        strict.service = Arc::new(BuyerServiceConfig {
            mapping: FieldMappingConfig {
                version: 1,
                mappings: vec![FieldMapping {
                    source_field: "email".to_string(),
                    target_field: "Email".to_string(),
                    transform: None,
                    value_map: None,
                    required: true,
                    default_value: None,
                    order: 0,
                    include_in_ping: true,
                    include_in_post: true,
                }],
                static_fields: Default::default(),
            },
            ..(*strict.service).clone()
        });
        let candidates = vec![strict, candidate(2, 60)];
        let Outcome::Winner(pool) = coordinator.run(&lead(), candidates).await else {
            panic!("expected a winner");
        };
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].candidate.buyer.id, BuyerId(2));
        let rows = persistence.transactions(LeadId(1)).await;
        assert_eq!(
            rows.iter()
                .find(|tx| tx.buyer_id == BuyerId(1))
                .unwrap()
                .status,
            TransactionStatus::Failed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn late_response_is_ignored_but_audited() {
        let persistence = Arc::new(InMemory::default());
        let mut slow = candidate(1, 60);
        slow.buyer = Arc::new(Buyer {
            // Generous per-call budget; the auction deadline cuts in first.
            ping_timeout_ms: 60_000,
            ..(*slow.buyer).clone()
        });
        let coordinator = Coordinator {
            api: Arc::new(ScriptedPanel {
                pings: maplit::hashmap! {
                    BuyerId(1) => PingScript::Bid {
                        amount: Decimal::from(99),
                        delay: Duration::from_secs(10),
                    },
                    BuyerId(2) => bid(42),
                },
            }),
            persistence: persistence.clone(),
            deadline: Duration::from_secs(1),
        };
        let candidates = vec![slow, candidate(2, 60)];
        let Outcome::Winner(pool) = coordinator.run(&lead(), candidates).await else {
            panic!("expected a winner");
        };
        // The slow 99 bid must not join the pool.
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].candidate.buyer.id, BuyerId(2));

        // The straggler still lands in the ledger for audit.
        for _ in 0..100 {
            if persistence.transactions(LeadId(1)).await.len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        let rows = persistence.transactions(LeadId(1)).await;
        assert_eq!(rows.len(), 2);
        let late = rows.iter().find(|tx| tx.buyer_id == BuyerId(1)).unwrap();
        assert_eq!(late.status, TransactionStatus::Timeout);
        assert_eq!(late.bid_amount, None);
    }
}
