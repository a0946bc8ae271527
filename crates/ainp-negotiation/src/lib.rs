//! Negotiation engine (C7): bilateral proposal/counter-proposal rounds,
//! ledger-backed acceptance, and settlement into a pending receipt.
//!
//! Deliberately decoupled from `ainp-config` (see this crate's `Cargo.toml`):
//! the composition root translates `BrokerConfig` into a `NegotiationConfig`
//! at startup rather than this crate reaching for broker-wide config directly.

pub mod convergence;

use ainp_core::{
    constants::{INCENTIVE_SPLIT_TOLERANCE, MAX_ROUNDS_DEFAULT, MAX_ROUNDS_HARD_CAP},
    AinpError, Did, IncentiveSplit, NegotiationSession, NegotiationState, Proposal,
    ReceiptMetrics, Round, SessionId,
};
use ainp_ledger::CreditLedger;
use ainp_receipts::ReceiptEngine;
use ainp_reputation::{ObservedOutcome, ReputationEngine};
use ainp_store::StoreDb;
use tracing::info;

const NEGOTIATION_DEFAULT_TTL_MS: i64 = 3_600_000;

/// Settlement counterparties and round-limit policy, independent of any
/// particular `ainp-config` wiring.
#[derive(Debug, Clone)]
pub struct NegotiationConfig {
    pub max_rounds_default: u32,
    pub max_rounds_hard_cap: u32,
    pub incentive_split: IncentiveSplit,
    pub default_ttl_ms: i64,
    pub broker_did: Did,
    pub validator_did: Did,
    pub pool_did: Did,
    /// Atomic units per display unit; `Proposal.price` arrives in display
    /// units and is converted to atomic units at accept time.
    pub display_unit_scale: u64,
}

impl NegotiationConfig {
    pub fn new(broker_did: Did, validator_did: Did, pool_did: Did) -> Self {
        NegotiationConfig {
            max_rounds_default: MAX_ROUNDS_DEFAULT,
            max_rounds_hard_cap: MAX_ROUNDS_HARD_CAP,
            incentive_split: IncentiveSplit {
                agent: ainp_core::constants::INCENTIVE_SPLIT_AGENT_DEFAULT,
                broker: ainp_core::constants::INCENTIVE_SPLIT_BROKER_DEFAULT,
                validator: ainp_core::constants::INCENTIVE_SPLIT_VALIDATOR_DEFAULT,
                pool: ainp_core::constants::INCENTIVE_SPLIT_POOL_DEFAULT,
            },
            default_ttl_ms: NEGOTIATION_DEFAULT_TTL_MS,
            broker_did,
            validator_did,
            pool_did,
            display_unit_scale: ainp_core::constants::DISPLAY_UNIT_SCALE_DEFAULT,
        }
    }
}

#[derive(Clone)]
pub struct NegotiationEngine {
    db: StoreDb,
    ledger: CreditLedger,
    receipts: ReceiptEngine,
    reputation: ReputationEngine,
    config: NegotiationConfig,
}

impl NegotiationEngine {
    pub fn new(
        db: StoreDb,
        ledger: CreditLedger,
        receipts: ReceiptEngine,
        reputation: ReputationEngine,
        config: NegotiationConfig,
    ) -> Self {
        NegotiationEngine {
            db,
            ledger,
            receipts,
            reputation,
            config,
        }
    }

    /// Open a session with the initiator's first round already proposed.
    #[allow(clippy::too_many_arguments)]
    pub fn create_session(
        &self,
        initiator_did: Did,
        responder_did: Did,
        intent_id: Option<String>,
        initial_proposal: Proposal,
        max_rounds: Option<u32>,
        incentive_split: Option<IncentiveSplit>,
        ttl_ms: Option<i64>,
        now: i64,
    ) -> Result<NegotiationSession, AinpError> {
        let max_rounds = max_rounds
            .unwrap_or(self.config.max_rounds_default)
            .min(self.config.max_rounds_hard_cap);
        let split = incentive_split.unwrap_or_else(|| self.config.incentive_split.clone());
        validate_split(&split)?;

        let round = Round {
            round_number: 1,
            proposer_did: initiator_did.clone(),
            proposal: initial_proposal.clone(),
            timestamp: now,
            convergence_delta: None,
        };

        let session = NegotiationSession {
            id: SessionId::generate(),
            intent_id,
            initiator_did,
            responder_did,
            state: NegotiationState::Proposed,
            rounds: vec![round],
            convergence_score: None,
            current_proposal: initial_proposal,
            final_proposal: None,
            incentive_split: split,
            max_rounds,
            reserved_amount: None,
            created_at: now,
            expires_at: now + ttl_ms.unwrap_or(self.config.default_ttl_ms),
        };
        self.db.put_session(&session)?;
        info!(session_id = %session.id, "negotiation session created");
        Ok(session)
    }

    pub fn get(&self, id: &SessionId) -> Result<NegotiationSession, AinpError> {
        self.db
            .get_session(id)?
            .ok_or_else(|| AinpError::NotFound(format!("no negotiation session {}", id.as_str())))
    }

    /// Append a proposal or counter-proposal. `proposer_did` MUST differ
    /// from the previous round's proposer.
    pub fn propose(
        &self,
        id: &SessionId,
        proposer_did: &Did,
        proposal: Proposal,
        now: i64,
    ) -> Result<NegotiationSession, AinpError> {
        let mut session = self.get(id)?;
        self.guard_live(&session, now)?;
        if session.state.is_terminal() || session.state == NegotiationState::Accepted {
            return Err(AinpError::InvalidStateTransition(format!(
                "cannot propose from state {:?}",
                session.state
            )));
        }
        if let Some(last) = session.last_proposer() {
            if last == proposer_did {
                return Err(AinpError::InvalidStateTransition(
                    "proposer must alternate from the previous round".into(),
                ));
            }
        }
        let next_round_number = session.rounds.len() as u32 + 1;
        if next_round_number > session.max_rounds {
            return Err(AinpError::MaxRoundsExceeded);
        }

        let delta = convergence::convergence_delta(&session.current_proposal, &proposal);
        session.rounds.push(Round {
            round_number: next_round_number,
            proposer_did: proposer_did.clone(),
            proposal: proposal.clone(),
            timestamp: now,
            convergence_delta: delta,
        });
        session.convergence_score = delta;
        session.current_proposal = proposal;
        session.state = match session.state {
            NegotiationState::Proposed => NegotiationState::CounterProposed,
            _ => NegotiationState::Proposed,
        };

        self.db.put_session(&session)?;
        info!(session_id = %id.as_str(), round = next_round_number, "negotiation round recorded");
        Ok(session)
    }

    /// Accept the current proposal. Reserves `current_proposal.price` from
    /// the initiator's account; a reservation failure leaves state unchanged.
    pub fn accept(
        &self,
        id: &SessionId,
        accepting_did: &Did,
        now: i64,
    ) -> Result<NegotiationSession, AinpError> {
        let mut session = self.get(id)?;
        self.guard_live(&session, now)?;
        if !matches!(
            session.state,
            NegotiationState::Proposed | NegotiationState::CounterProposed
        ) {
            return Err(AinpError::InvalidStateTransition(format!(
                "cannot accept from state {:?}",
                session.state
            )));
        }
        if session.last_proposer() == Some(accepting_did) {
            return Err(AinpError::InvalidStateTransition(
                "the last proposer cannot accept their own proposal".into(),
            ));
        }
        let price = session.current_proposal.price.ok_or_else(|| {
            AinpError::InvalidRequest("current proposal has no price to reserve".into())
        })?;
        let amount = (price * self.config.display_unit_scale as f64).round() as u64;

        self.ledger
            .reserve(&session.initiator_did, amount, session.id.as_str(), now)?;

        session.state = NegotiationState::Accepted;
        session.reserved_amount = Some(amount);
        session.final_proposal = Some(session.current_proposal.clone());
        self.db.put_session(&session)?;
        info!(session_id = %id.as_str(), amount, "negotiation accepted, funds reserved");
        Ok(session)
    }

    /// Reject a still-open negotiation. Not callable once accepted; settle
    /// or let it expire instead.
    pub fn reject(
        &self,
        id: &SessionId,
        now: i64,
    ) -> Result<NegotiationSession, AinpError> {
        let mut session = self.get(id)?;
        if session.state.is_terminal() || session.state == NegotiationState::Accepted {
            return Err(AinpError::InvalidStateTransition(format!(
                "cannot reject from state {:?}",
                session.state
            )));
        }
        let _ = now;
        session.state = NegotiationState::Rejected;
        self.db.put_session(&session)?;
        info!(session_id = %id.as_str(), "negotiation rejected");
        Ok(session)
    }

    /// Settle an accepted session: release the reservation split across
    /// agent/broker/validator/pool, emit a pending receipt, and nudge the
    /// responder's reputation with the observed price/latency.
    pub fn settle(&self, id: &SessionId, now: i64) -> Result<(NegotiationSession, ainp_core::TaskReceipt), AinpError> {
        let mut session = self.get(id)?;
        if session.state != NegotiationState::Accepted {
            return Err(AinpError::InvalidStateTransition(format!(
                "cannot settle from state {:?}",
                session.state
            )));
        }
        let reserved = session
            .reserved_amount
            .ok_or_else(|| AinpError::Internal("accepted session missing reserved_amount".into()))?;
        if reserved == 0 {
            return Err(AinpError::InvalidStateTransition(
                "negotiation session already settled".into(),
            ));
        }

        self.ledger
            .release(&session.initiator_did, reserved, reserved, session.id.as_str(), now)?;

        let split = &session.incentive_split;
        let agent_share = (reserved as f64 * split.agent).round() as u64;
        let broker_share = (reserved as f64 * split.broker).round() as u64;
        let validator_share = (reserved as f64 * split.validator).round() as u64;
        let pool_share = reserved
            .saturating_sub(agent_share)
            .saturating_sub(broker_share)
            .saturating_sub(validator_share);

        self.ledger.earn(
            &session.responder_did,
            agent_share,
            session.id.as_str(),
            None,
            now,
        )?;
        self.ledger.earn(
            &self.config.broker_did,
            broker_share,
            session.id.as_str(),
            None,
            now,
        )?;
        self.ledger.earn(
            &self.config.validator_did,
            validator_share,
            session.id.as_str(),
            None,
            now,
        )?;
        self.ledger.earn(
            &self.config.pool_did,
            pool_share,
            session.id.as_str(),
            None,
            now,
        )?;

        let accepted_price = session.current_proposal.price;
        let latency_ms = Some((now - session.created_at) as f64);

        let receipt = self.receipts.create(
            Some(session.id.as_str().to_string()),
            session.intent_id.clone(),
            session.responder_did.clone(),
            session.initiator_did.clone(),
            ReceiptMetrics {
                latency_ms,
                accepted_price,
            },
            reserved,
            0,
            0,
            session.id.as_str(),
            now,
        )?;

        // The negotiated exchange has completed and the responder has been
        // paid; that is itself a positive reliability signal independent of
        // the receipt's later quorum finalization.
        let outcome = ObservedOutcome {
            latency_ms,
            finalized: true,
            ..Default::default()
        };
        self.reputation
            .record_outcome(&session.responder_did, &outcome, now)?;

        session.state = NegotiationState::Accepted;
        session.reserved_amount = Some(0);
        self.db.put_session(&session)?;
        info!(session_id = %id.as_str(), reserved, "negotiation settled");
        Ok((session, receipt))
    }

    /// Sweep every non-terminal, non-accepted session past its `expires_at`
    /// into `expired`, releasing any lingering reservation in full.
    pub fn expire_sweep(&self, now: i64) -> Result<Vec<SessionId>, AinpError> {
        let mut expired = Vec::new();
        for mut session in self.db.iter_sessions()? {
            if session.state.is_terminal() || session.state == NegotiationState::Accepted {
                continue;
            }
            if now <= session.expires_at {
                continue;
            }
            if let Some(reserved) = session.reserved_amount.filter(|r| *r > 0) {
                self.ledger
                    .release(&session.initiator_did, reserved, 0, session.id.as_str(), now)?;
                session.reserved_amount = Some(0);
            }
            session.state = NegotiationState::Expired;
            self.db.put_session(&session)?;
            expired.push(session.id.clone());
        }
        if !expired.is_empty() {
            info!(count = expired.len(), "negotiation sessions expired");
        }
        Ok(expired)
    }

    fn guard_live(&self, session: &NegotiationSession, now: i64) -> Result<(), AinpError> {
        if session.state != NegotiationState::Accepted && now > session.expires_at {
            return Err(AinpError::NegotiationExpired);
        }
        Ok(())
    }
}

fn validate_split(split: &IncentiveSplit) -> Result<(), AinpError> {
    let sum = split.agent + split.broker + split.validator + split.pool;
    if (sum - 1.0).abs() > INCENTIVE_SPLIT_TOLERANCE {
        return Err(AinpError::InvalidRequest(format!(
            "incentive split must sum to 1 +/- {INCENTIVE_SPLIT_TOLERANCE}, got {sum}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> (NegotiationEngine, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = StoreDb::open(dir.path()).unwrap();
        let ledger = CreditLedger::new(db.clone());
        let reputation = ReputationEngine::new(db.clone(), ainp_core::constants::REPUTATION_ALPHA_DEFAULT);
        let receipts = ReceiptEngine::new(db.clone(), reputation.clone());
        let config = NegotiationConfig::new(
            Did::new("did:key:zBroker"),
            Did::new("did:key:zValidator"),
            Did::new("did:key:zPool"),
        );
        ledger.create_account(&config.broker_did, 0).unwrap();
        ledger.create_account(&config.validator_did, 0).unwrap();
        ledger.create_account(&config.pool_did, 0).unwrap();
        (
            NegotiationEngine::new(db, ledger, receipts, reputation, config),
            dir,
        )
    }

    fn price(p: f64) -> Proposal {
        Proposal {
            price: Some(p),
            ..Default::default()
        }
    }

    #[test]
    fn happy_negotiation_settles_with_the_spec_example_split() {
        let (engine, _dir) = engine();
        let initiator = Did::new("did:key:zI");
        let responder = Did::new("did:key:zR");
        engine.ledger.create_account(&initiator, 1_000_000).unwrap();
        engine.ledger.create_account(&responder, 0).unwrap();

        let session = engine
            .create_session(
                initiator.clone(),
                responder.clone(),
                None,
                price(100.0),
                None,
                None,
                None,
                0,
            )
            .unwrap();
        let session = engine
            .propose(&session.id, &responder, price(90.0), 1)
            .unwrap();
        assert_eq!(session.state, NegotiationState::CounterProposed);
        assert!(session.convergence_score.unwrap() > 0.0);

        let session = engine.accept(&session.id, &initiator, 2).unwrap();
        assert_eq!(session.state, NegotiationState::Accepted);
        assert_eq!(session.reserved_amount, Some(90_000));

        let (session, _receipt) = engine.settle(&session.id, 3).unwrap();
        assert_eq!(session.reserved_amount, Some(0));

        let initiator_account = engine.ledger.get_account(&initiator).unwrap().unwrap();
        assert_eq!(initiator_account.reserved, 0);
        assert_eq!(initiator_account.spent, 90_000);

        let responder_account = engine.ledger.get_account(&responder).unwrap().unwrap();
        assert_eq!(responder_account.earned, 63_000);

        let err = engine.settle(&session.id, 4).unwrap_err();
        assert!(matches!(err, AinpError::InvalidStateTransition(_)));
    }

    #[test]
    fn accept_with_insufficient_funds_leaves_state_unchanged() {
        let (engine, _dir) = engine();
        let initiator = Did::new("did:key:zI");
        let responder = Did::new("did:key:zR");
        engine.ledger.create_account(&initiator, 50_000).unwrap();
        engine.ledger.create_account(&responder, 0).unwrap();

        let session = engine
            .create_session(initiator.clone(), responder.clone(), None, price(100.0), None, None, None, 0)
            .unwrap();
        let err = engine.accept(&session.id, &responder, 1).unwrap_err();
        assert!(matches!(err, AinpError::InsufficientFunds));

        let reloaded = engine.get(&session.id).unwrap();
        assert_eq!(reloaded.state, NegotiationState::Proposed);
        assert!(reloaded.reserved_amount.is_none());
    }

    #[test]
    fn proposer_must_alternate() {
        let (engine, _dir) = engine();
        let initiator = Did::new("did:key:zI");
        let responder = Did::new("did:key:zR");
        engine.ledger.create_account(&initiator, 1000).unwrap();
        engine.ledger.create_account(&responder, 0).unwrap();
        let session = engine
            .create_session(initiator.clone(), responder, None, price(100.0), None, None, None, 0)
            .unwrap();
        let err = engine
            .propose(&session.id, &initiator, price(95.0), 1)
            .unwrap_err();
        assert!(matches!(err, AinpError::InvalidStateTransition(_)));
    }

    #[test]
    fn exceeding_max_rounds_is_rejected() {
        let (engine, _dir) = engine();
        let initiator = Did::new("did:key:zI");
        let responder = Did::new("did:key:zR");
        engine.ledger.create_account(&initiator, 1000).unwrap();
        engine.ledger.create_account(&responder, 0).unwrap();
        let mut session = engine
            .create_session(
                initiator.clone(),
                responder.clone(),
                None,
                price(100.0),
                Some(2),
                None,
                None,
                0,
            )
            .unwrap();
        session = engine
            .propose(&session.id, &responder, price(95.0), 1)
            .unwrap();
        let err = engine
            .propose(&session.id, &initiator, price(96.0), 2)
            .unwrap_err();
        assert!(matches!(err, AinpError::MaxRoundsExceeded));
    }

    #[test]
    fn expiry_sweep_releases_pending_sessions_but_never_touches_accepted() {
        let (engine, _dir) = engine();
        let initiator = Did::new("did:key:zI");
        let responder = Did::new("did:key:zR");
        engine.ledger.create_account(&initiator, 1_000_000).unwrap();
        engine.ledger.create_account(&responder, 0).unwrap();

        let stale = engine
            .create_session(
                initiator.clone(),
                responder.clone(),
                None,
                price(100.0),
                None,
                None,
                Some(10),
                0,
            )
            .unwrap();
        let accepted = engine
            .create_session(
                initiator.clone(),
                responder.clone(),
                None,
                price(50.0),
                None,
                None,
                Some(10),
                0,
            )
            .unwrap();
        let accepted = engine.accept(&accepted.id, &responder, 1).unwrap();
        assert_eq!(accepted.state, NegotiationState::Accepted);

        let expired_ids = engine.expire_sweep(100).unwrap();
        assert_eq!(expired_ids, vec![stale.id.clone()]);

        let reloaded_stale = engine.get(&stale.id).unwrap();
        assert_eq!(reloaded_stale.state, NegotiationState::Expired);

        let reloaded_accepted = engine.get(&accepted.id).unwrap();
        assert_eq!(reloaded_accepted.state, NegotiationState::Accepted);
    }

    #[test]
    fn rejecting_an_accepted_session_is_an_invalid_transition() {
        let (engine, _dir) = engine();
        let initiator = Did::new("did:key:zI");
        let responder = Did::new("did:key:zR");
        engine.ledger.create_account(&initiator, 1_000_000).unwrap();
        engine.ledger.create_account(&responder, 0).unwrap();
        let session = engine
            .create_session(initiator.clone(), responder.clone(), None, price(100.0), None, None, None, 0)
            .unwrap();
        let session = engine.accept(&session.id, &responder, 1).unwrap();
        let err = engine.reject(&session.id, 2).unwrap_err();
        assert!(matches!(err, AinpError::InvalidStateTransition(_)));
    }
}
