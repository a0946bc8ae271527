//! Envelope pipeline (C5): the strict ordered sequence of ingress checks.
//!
//! Each step short-circuits with a specific `AinpError`; ordering is part of
//! the contract (e.g. a valid signature is required before anything counts
//! against the rate limit).

mod rate_limit;

use ainp_core::constants::{EMBEDDING_DIM, FRESHNESS_SKEW_SECONDS};
use ainp_core::{AinpError, Envelope, Intent, MsgType};
use ainp_antifraud::AntiFraudCache;
use ainp_config::BrokerConfig;
use ainp_ledger::CreditLedger;
use ainp_store::StoreDb;

use rate_limit::RateLimiter;

pub struct PipelineOutcome {
    pub intent: Option<Intent>,
    pub degraded: bool,
}

pub struct EnvelopePipeline {
    antifraud: AntiFraudCache,
    ledger: CreditLedger,
    db: StoreDb,
    rate_limiter: RateLimiter,
    config: BrokerConfig,
}

impl EnvelopePipeline {
    pub fn new(antifraud: AntiFraudCache, ledger: CreditLedger, db: StoreDb, config: BrokerConfig) -> Self {
        EnvelopePipeline {
            antifraud,
            rate_limiter: RateLimiter::new(config.rate_limit_max_per_minute),
            ledger,
            db,
            config,
        }
    }

    /// Run the full pipeline. `caller_ip` is used as the rate-limit key when
    /// the caller is unauthenticated (no `from_did` context established).
    pub fn process(
        &self,
        envelope: &Envelope,
        caller_ip: Option<&str>,
        now_ms: i64,
    ) -> Result<PipelineOutcome, AinpError> {
        // 1. Structure: `Envelope` deserialization already enforces required
        // fields are present; an unknown `msg_type` fails to deserialize,
        // which the caller maps to INVALID_ENVELOPE before we're reached.

        // 2. Version.
        if let Some(v) = envelope.version {
            if v != ainp_core::constants::ENVELOPE_VERSION {
                return Err(AinpError::UnsupportedVersion(v));
            }
        }

        // 3. Signature.
        if self.config.flags.signature_verification_enabled {
            ainp_crypto::verify_envelope(envelope).map_err(AinpError::from)?;
        }

        // 4. Freshness.
        let now_s = now_ms / 1000;
        let skew_ms = FRESHNESS_SKEW_SECONDS * 1000;
        if envelope.is_expired(now_ms, skew_ms) {
            return Err(AinpError::Stale);
        }

        // 5. Replay.
        if self.config.flags.replay_check_enabled {
            let first_sight = self.antifraud.check_and_mark_replay(
                envelope.id.as_str(),
                &envelope.from_did,
                envelope.trace_id.as_str(),
                now_s,
                ainp_core::constants::REPLAY_TTL_SECONDS,
            );
            if !first_sight {
                return Err(AinpError::ReplayDetected);
            }
        }

        // Only INTENT-typed envelopes carry a parseable intent payload.
        let intent: Option<Intent> = if envelope.msg_type == MsgType::Intent {
            Some(
                serde_json::from_value(envelope.payload.clone())
                    .map_err(|e| AinpError::InvalidIntent(e.to_string()))?,
            )
        } else {
            None
        };

        // 6. Intent guards (email-flavored intents only).
        if let Some(intent) = &intent {
            if intent.is_email_flavored() {
                self.run_email_guards(intent, envelope, now_s)?;
            }
            if let Intent::TaskRequest {
                embedding: Some(emb),
                ..
            } = intent
            {
                if emb.len() != EMBEDDING_DIM && emb.len() != self.config.embedding_dim {
                    return Err(AinpError::InvalidRequest(format!(
                        "embedding dimension {} does not match network dimension {}",
                        emb.len(),
                        self.config.embedding_dim
                    )));
                }
            }
        }

        // 7. Rate limit, keyed by from_did when authenticated, by IP otherwise.
        let key = if self.config.flags.signature_verification_enabled {
            envelope.from_did.as_str().to_string()
        } else {
            caller_ip.unwrap_or("unknown").to_string()
        };
        if let Err(retry_after_ms) = self.rate_limiter.check(&key, now_ms) {
            return Err(AinpError::RateLimitExceeded {
                retry_after_ms,
                degraded: self.antifraud.is_degraded(),
            });
        }

        Ok(PipelineOutcome {
            intent,
            degraded: self.antifraud.is_degraded(),
        })
    }

    fn run_email_guards(
        &self,
        intent: &Intent,
        envelope: &Envelope,
        now_s: i64,
    ) -> Result<(), AinpError> {
        let Intent::EmailMessage { subject, body } = intent else {
            return Ok(());
        };
        let Some(to_did) = &envelope.to_did else {
            return Ok(());
        };

        if self.config.flags.content_dedupe_enabled {
            let first_sight = self.antifraud.check_and_mark_content_hash(
                &envelope.from_did,
                to_did,
                subject.as_deref(),
                body,
                now_s,
                self.config.dedupe_ttl_seconds,
            );
            if !first_sight {
                return Err(AinpError::DuplicateEmail);
            }
        }

        if self.config.flags.greylist_enabled {
            let should_greylist = self.antifraud.should_greylist_first_contact(
                &envelope.from_did,
                to_did,
                now_s,
                self.config.greylist_delay_seconds,
            );
            if should_greylist {
                return Err(AinpError::Greylisted {
                    retry_after_seconds: self.config.greylist_delay_seconds,
                });
            }
        }

        // Postage is scoped to first-contact direct mail: once routing has
        // recorded a prior contact from this sender, the recipient has
        // already admitted them and postage no longer applies.
        let already_contacted = self.db.get_contact(to_did, &envelope.from_did)?.is_some();
        if self.config.flags.postage_enabled && !already_contacted {
            if let Err(e) = self.ledger.spend(
                &envelope.from_did,
                self.config.postage_amount_atomic,
                &format!("postage:{}", envelope.id),
                now_s,
            ) {
                if matches!(e, AinpError::InsufficientFunds) {
                    return Err(AinpError::PaymentRequired {
                        request_id: envelope.id.as_str().to_string(),
                        amount_atomic: self.config.postage_amount_atomic,
                        payment_url: format!("ainp://pay/{}", envelope.id.as_str()),
                        expires_at: now_s + self.config.payment_challenge_ttl_seconds,
                    });
                }
                return Err(e);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ainp_core::{EnvelopeId, TraceId};
    use ainp_crypto::KeyPair;
    use ainp_store::StoreDb;

    fn setup() -> (EnvelopePipeline, KeyPair) {
        let dir = tempfile::tempdir().unwrap();
        let db = StoreDb::open(dir.path()).unwrap();
        let antifraud = AntiFraudCache::new(db.clone());
        let ledger = CreditLedger::new(db.clone());
        let config = BrokerConfig::default();
        let kp = KeyPair::generate();
        (EnvelopePipeline::new(antifraud, ledger, db, config), kp)
    }

    fn signed_envelope(kp: &KeyPair, payload: serde_json::Value, msg_type: MsgType) -> Envelope {
        let mut env = Envelope {
            id: EnvelopeId::generate(),
            trace_id: TraceId::generate(),
            from_did: kp.did.clone(),
            to_did: Some(kp.did.clone()),
            msg_type,
            version: Some(1),
            ttl_ms: 60_000,
            timestamp_ms: 1_700_000_000_000,
            sig: String::new(),
            payload,
        };
        env.sig = ainp_crypto::sign_envelope(&env, kp);
        env
    }

    #[test]
    fn valid_signed_intent_passes() {
        let (pipeline, kp) = setup();
        let env = signed_envelope(
            &kp,
            serde_json::json!({"@type": "MESSAGE", "body": "hi", "conversation_id": null, "subject": null}),
            MsgType::Intent,
        );
        let outcome = pipeline.process(&env, None, env.timestamp_ms).unwrap();
        assert!(outcome.intent.is_some());
    }

    #[test]
    fn invalid_signature_short_circuits_before_replay() {
        let (pipeline, kp) = setup();
        let mut env = signed_envelope(
            &kp,
            serde_json::json!({"@type": "MESSAGE", "body": "hi", "conversation_id": null, "subject": null}),
            MsgType::Intent,
        );
        env.sig = "bogus".into();
        let err = pipeline.process(&env, None, env.timestamp_ms).unwrap_err();
        assert!(matches!(err, AinpError::SignatureVerificationError(_)));
    }

    #[test]
    fn replay_detected_on_second_identical_send() {
        let (pipeline, kp) = setup();
        let env = signed_envelope(
            &kp,
            serde_json::json!({"@type": "MESSAGE", "body": "hi", "conversation_id": null, "subject": null}),
            MsgType::Intent,
        );
        pipeline.process(&env, None, env.timestamp_ms).unwrap();
        let err = pipeline.process(&env, None, env.timestamp_ms).unwrap_err();
        assert!(matches!(err, AinpError::ReplayDetected));
    }

    #[test]
    fn stale_envelope_rejected() {
        let (pipeline, kp) = setup();
        let env = signed_envelope(
            &kp,
            serde_json::json!({"@type": "MESSAGE", "body": "hi", "conversation_id": null, "subject": null}),
            MsgType::Intent,
        );
        let far_future = env.timestamp_ms + env.ttl_ms + 10 * 60 * 1000;
        let err = pipeline.process(&env, None, far_future).unwrap_err();
        assert!(matches!(err, AinpError::Stale));
    }

    #[test]
    fn unpaid_postage_on_a_direct_send_issues_a_payment_challenge() {
        let dir = tempfile::tempdir().unwrap();
        let db = StoreDb::open(dir.path()).unwrap();
        let antifraud = AntiFraudCache::new(db.clone());
        let ledger = CreditLedger::new(db.clone());
        let mut config = BrokerConfig::default();
        config.flags.greylist_enabled = false;
        let kp = KeyPair::generate();
        ledger.create_account(&kp.did, 0).unwrap();
        let pipeline = EnvelopePipeline::new(antifraud, ledger, db, config);

        let env = signed_envelope(
            &kp,
            serde_json::json!({
                "@type": "EMAIL_MESSAGE",
                "subject": "hi",
                "body": "first contact",
            }),
            MsgType::Intent,
        );
        let err = pipeline.process(&env, None, env.timestamp_ms).unwrap_err();
        match err {
            AinpError::PaymentRequired {
                amount_atomic,
                expires_at,
                ..
            } => {
                assert_eq!(amount_atomic, 1_000);
                assert!(expires_at > env.timestamp_ms);
            }
            other => panic!("expected PaymentRequired, got {other:?}"),
        }
    }

    #[test]
    fn established_contact_is_not_charged_postage_again() {
        let dir = tempfile::tempdir().unwrap();
        let db = StoreDb::open(dir.path()).unwrap();
        let antifraud = AntiFraudCache::new(db.clone());
        let ledger = CreditLedger::new(db.clone());
        let mut config = BrokerConfig::default();
        config.flags.greylist_enabled = false;
        let kp = KeyPair::generate();
        ledger.create_account(&kp.did, 0).unwrap();
        db.put_contact(&ainp_core::Contact {
            owner_did: kp.did.clone(),
            peer_did: kp.did.clone(),
            state: ainp_core::ContactState::Allowlisted,
            first_seen: 0,
            last_seen: 0,
        })
        .unwrap();
        let pipeline = EnvelopePipeline::new(antifraud, ledger, db, config);

        let env = signed_envelope(
            &kp,
            serde_json::json!({
                "@type": "EMAIL_MESSAGE",
                "subject": "hi",
                "body": "already an established contact",
            }),
            MsgType::Intent,
        );
        let outcome = pipeline.process(&env, None, env.timestamp_ms).unwrap();
        assert!(outcome.intent.is_some());
    }

    #[test]
    fn unknown_intent_type_is_invalid_intent() {
        let (pipeline, kp) = setup();
        let env = signed_envelope(
            &kp,
            serde_json::json!({"@type": "WIRE_TRANSFER", "amount": 5}),
            MsgType::Intent,
        );
        let err = pipeline.process(&env, None, env.timestamp_ms).unwrap_err();
        assert!(matches!(err, AinpError::InvalidIntent(_)));
    }
}
