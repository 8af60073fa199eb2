use std::time::Duration;

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use chrono::{TimeDelta, Utc};
use puerta_core::constants::CHALLENGE_TTL_SECS;
use puerta_storage::{Credential, CredentialRepository, User};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::flow::{ChallengeIssued, FlowKind, FlowState, GateOutcome};
use super::relying_party::RelyingParty;
use crate::ephemeral::EphemeralStore;
use crate::error::SecondFactorError;

type Result<T> = std::result::Result<T, SecondFactorError>;

/// Registration and step-up login flows over a relying party and the
/// credential store.
///
/// Pending challenges are kept in the [`EphemeralStore`] passed to each
/// call, which is expected to be scoped to the caller's browser.
#[derive(Debug)]
pub struct SecondFactor<R, C> {
    relying_party: R,
    credentials: C,
    challenge_ttl: Duration,
}

impl<R: RelyingParty, C: CredentialRepository> SecondFactor<R, C> {
    pub fn new(relying_party: R, credentials: C) -> Self {
        Self {
            relying_party,
            credentials,
            challenge_ttl: Duration::from_secs(CHALLENGE_TTL_SECS),
        }
    }

    pub fn with_challenge_ttl(mut self, ttl: Duration) -> Self {
        self.challenge_ttl = ttl;
        self
    }

    pub fn credentials(&self) -> &C {
        &self.credentials
    }

    async fn store_pending<S: EphemeralStore>(
        &self,
        store: &S,
        flow: FlowKind,
        state: Value,
    ) -> Result<()> {
        let encoded = serde_json::to_vec(&FlowState::awaiting(flow, state))?;
        store.put(flow.store_key(), encoded).await?;
        Ok(())
    }

    /// Consume the pending state of `flow`, if any is still live.
    async fn take_pending<S: EphemeralStore>(&self, store: &S, flow: FlowKind) -> Result<Option<Value>> {
        let Some(encoded) = store.pop(flow.store_key()).await? else {
            return Ok(None);
        };

        let ttl = TimeDelta::from_std(self.challenge_ttl).unwrap_or(TimeDelta::MAX);
        let pending = serde_json::from_slice::<FlowState>(&encoded)?.into_pending(flow, ttl, Utc::now());
        if pending.is_none() {
            debug!(%flow, "discarding stale challenge");
        }
        Ok(pending)
    }

    /// Issue a registration challenge, excluding already enrolled
    /// authenticators.
    pub async fn begin_registration<S: EphemeralStore>(
        &self,
        store: &S,
        user: &User,
    ) -> Result<ChallengeIssued> {
        let enrolled = self.credentials.find_by_user(user.id).await?;
        let pending = self.relying_party.start_registration(user, &enrolled)?;
        self.store_pending(store, FlowKind::Register, pending.state).await?;

        info!(user = %user.handle, "webauthn registration started");
        Ok(ChallengeIssued {
            flow: FlowKind::Register,
            options: pending.options,
        })
    }

    /// Verify the browser's answer to a registration challenge and store
    /// the new credential.
    ///
    /// # Errors
    ///
    /// [`SecondFactorError::NoPendingChallenge`] without a live challenge,
    /// including when this one was already answered.
    pub async fn finish_registration<S: EphemeralStore>(
        &self,
        store: &S,
        user: &User,
        response: &Value,
    ) -> Result<Credential> {
        let state = self
            .take_pending(store, FlowKind::Register)
            .await?
            .ok_or(SecondFactorError::NoPendingChallenge {
                flow: FlowKind::Register,
            })?;

        let accepted = self.relying_party.finish_registration(&state, response)?;
        let mut credential = Credential::new(user.id, accepted.credential_id, accepted.passkey);
        credential.id = self.credentials.create(&credential).await?;

        info!(user = %user.handle, credential_id = %credential.credential_id, "webauthn credential registered");
        Ok(credential)
    }

    /// Issue a step-up login challenge for the enrolled authenticators.
    pub async fn begin_login<S: EphemeralStore>(
        &self,
        store: &S,
        user: &User,
        enrolled: &[Credential],
    ) -> Result<ChallengeIssued> {
        let pending = self.relying_party.start_login(enrolled)?;
        self.store_pending(store, FlowKind::Login, pending.state).await?;

        info!(user = %user.handle, "webauthn login started");
        Ok(ChallengeIssued {
            flow: FlowKind::Login,
            options: pending.options,
        })
    }

    /// Verify the assertion carried in the `webauthn` request header.
    ///
    /// The header holds the browser's credential response as standard
    /// base64 JSON.
    pub async fn finish_login<S: EphemeralStore>(
        &self,
        store: &S,
        user: &User,
        header: Option<&str>,
    ) -> Result<()> {
        let state = self
            .take_pending(store, FlowKind::Login)
            .await?
            .ok_or(SecondFactorError::NoPendingChallenge {
                flow: FlowKind::Login,
            })?;
        self.verify_login(user, &state, header)
    }

    fn verify_login(&self, user: &User, state: &Value, header: Option<&str>) -> Result<()> {
        let header = header
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(SecondFactorError::MissingResponse)?;

        let decoded = BASE64_STANDARD
            .decode(header)
            .map_err(|_| SecondFactorError::malformed("unparseable webauthn header value"))?;
        let response: Value = serde_json::from_slice(&decoded)
            .map_err(|e| SecondFactorError::malformed(e.to_string()))?;

        self.relying_party.finish_login(state, &response)?;
        info!(user = %user.handle, "webauthn login verified");
        Ok(())
    }

    /// Second-factor gate in front of the door.
    ///
    /// - No second factor required: [`GateOutcome::Proceed`].
    /// - Nothing enrolled: a registration challenge.
    /// - A login challenge pending: verify the header against it.
    /// - Otherwise: a new login challenge.
    pub async fn enforce<S: EphemeralStore>(
        &self,
        store: &S,
        user: &User,
        header: Option<&str>,
    ) -> Result<GateOutcome> {
        if !user.require_2fa {
            return Ok(GateOutcome::Proceed);
        }

        debug!(user = %user.handle, "enforcing second factor");
        let enrolled = self.credentials.find_by_user(user.id).await?;
        if enrolled.is_empty() {
            return Ok(GateOutcome::Challenge(self.begin_registration(store, user).await?));
        }

        match self.take_pending(store, FlowKind::Login).await? {
            Some(state) => {
                if let Err(err) = self.verify_login(user, &state, header) {
                    warn!(user = %user.handle, error = %err, "second factor failed");
                    return Err(err);
                }
                Ok(GateOutcome::Proceed)
            }
            None => Ok(GateOutcome::Challenge(
                self.begin_login(store, user, &enrolled).await?,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeral::MemoryEphemeralStore;
    use crate::webauthn::{NewCredential, PendingChallenge};
    use puerta_storage::{Database, SqliteCredentialRepository, SqliteUserRepository, UserRepository};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Accepts `{"ok": true}` for whatever challenge it issued last.
    #[derive(Debug, Default)]
    struct FakeRelyingParty {
        issued: AtomicUsize,
    }

    impl FakeRelyingParty {
        fn pending(&self, kind: &str) -> PendingChallenge {
            let n = self.issued.fetch_add(1, Ordering::SeqCst);
            PendingChallenge {
                options: json!({"publicKey": {"challenge": format!("{kind}-{n}")}}),
                state: json!({"challenge": format!("{kind}-{n}")}),
            }
        }

        fn check(state: &Value, response: &Value) -> Result<()> {
            if response.get("ok").is_none() {
                return Err(SecondFactorError::malformed("no ok field"));
            }
            if response["ok"] != true || response["challenge"] != state["challenge"] {
                return Err(SecondFactorError::rejected("bad assertion"));
            }
            Ok(())
        }
    }

    impl RelyingParty for FakeRelyingParty {
        fn start_registration(&self, _user: &User, _enrolled: &[Credential]) -> Result<PendingChallenge> {
            Ok(self.pending("register"))
        }

        fn finish_registration(&self, state: &Value, response: &Value) -> Result<NewCredential> {
            Self::check(state, response)?;
            Ok(NewCredential {
                credential_id: format!("cred-{}", state["challenge"].as_str().unwrap_or_default()),
                passkey: "{}".to_string(),
            })
        }

        fn start_login(&self, enrolled: &[Credential]) -> Result<PendingChallenge> {
            assert!(!enrolled.is_empty());
            Ok(self.pending("login"))
        }

        fn finish_login(&self, state: &Value, response: &Value) -> Result<()> {
            Self::check(state, response)
        }
    }

    struct Fixture {
        second_factor: SecondFactor<FakeRelyingParty, SqliteCredentialRepository>,
        store: MemoryEphemeralStore,
        user: User,
    }

    async fn fixture(require_2fa: bool) -> Fixture {
        let db = Database::in_memory().await.unwrap();
        let users = SqliteUserRepository::new(db.pool().clone());
        let id = users
            .create(&User::new("alice", "Alice", "hash").with_2fa(require_2fa))
            .await
            .unwrap();
        Fixture {
            second_factor: SecondFactor::new(
                FakeRelyingParty::default(),
                SqliteCredentialRepository::new(db.pool().clone()),
            ),
            store: MemoryEphemeralStore::default(),
            user: users.find_by_id(id).await.unwrap().unwrap(),
        }
    }

    fn answer(challenge: &ChallengeIssued) -> Value {
        json!({"ok": true, "challenge": challenge.options["publicKey"]["challenge"]})
    }

    fn header(response: &Value) -> String {
        BASE64_STANDARD.encode(response.to_string())
    }

    #[tokio::test]
    async fn test_finish_registration_without_begin() {
        let f = fixture(true).await;

        let err = f
            .second_factor
            .finish_registration(&f.store, &f.user, &json!({"ok": true}))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SecondFactorError::NoPendingChallenge {
                flow: FlowKind::Register
            }
        ));
    }

    #[tokio::test]
    async fn test_registration_challenge_is_single_use() {
        let f = fixture(true).await;
        let challenge = f.second_factor.begin_registration(&f.store, &f.user).await.unwrap();
        let response = answer(&challenge);

        f.second_factor
            .finish_registration(&f.store, &f.user, &response)
            .await
            .unwrap();
        let second = f
            .second_factor
            .finish_registration(&f.store, &f.user, &response)
            .await;

        assert!(matches!(second, Err(SecondFactorError::NoPendingChallenge { .. })));
        assert_eq!(
            f.second_factor.credentials().find_by_user(f.user.id).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_stale_challenge_is_not_pending() {
        let f = fixture(true).await;
        let second_factor = SecondFactor {
            challenge_ttl: Duration::ZERO,
            ..f.second_factor
        };
        let challenge = second_factor.begin_registration(&f.store, &f.user).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let result = second_factor
            .finish_registration(&f.store, &f.user, &answer(&challenge))
            .await;
        assert!(matches!(result, Err(SecondFactorError::NoPendingChallenge { .. })));
    }

    #[tokio::test]
    async fn test_gate_without_requirement_proceeds() {
        let f = fixture(false).await;
        let outcome = f.second_factor.enforce(&f.store, &f.user, None).await.unwrap();

        assert!(outcome.is_proceed());
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn test_gate_full_cycle() {
        let f = fixture(true).await;

        // Nothing enrolled yet: registration challenge.
        let GateOutcome::Challenge(register) =
            f.second_factor.enforce(&f.store, &f.user, None).await.unwrap()
        else {
            panic!("expected a registration challenge");
        };
        assert_eq!(register.flow, FlowKind::Register);
        f.second_factor
            .finish_registration(&f.store, &f.user, &answer(&register))
            .await
            .unwrap();

        // Enrolled: login challenge.
        let GateOutcome::Challenge(login) =
            f.second_factor.enforce(&f.store, &f.user, None).await.unwrap()
        else {
            panic!("expected a login challenge");
        };
        assert_eq!(login.flow, FlowKind::Login);

        // Answered: proceed.
        let outcome = f
            .second_factor
            .enforce(&f.store, &f.user, Some(&header(&answer(&login))))
            .await
            .unwrap();
        assert!(outcome.is_proceed());

        // The answer cannot be replayed: a fresh challenge is issued.
        let replay = f
            .second_factor
            .enforce(&f.store, &f.user, Some(&header(&answer(&login))))
            .await
            .unwrap();
        assert!(matches!(replay, GateOutcome::Challenge(ChallengeIssued { flow: FlowKind::Login, .. })));
    }

    #[tokio::test]
    async fn test_login_header_errors() {
        let f = fixture(true).await;
        let register = f.second_factor.begin_registration(&f.store, &f.user).await.unwrap();
        f.second_factor
            .finish_registration(&f.store, &f.user, &answer(&register))
            .await
            .unwrap();
        let enrolled = f.second_factor.credentials().find_by_user(f.user.id).await.unwrap();

        let cases: [(Option<&str>, fn(&SecondFactorError) -> bool); 3] = [
            (None, |e| matches!(e, SecondFactorError::MissingResponse)),
            (Some("%%%"), |e| matches!(e, SecondFactorError::MalformedResponse { .. })),
            (Some("bm90IGpzb24="), |e| matches!(e, SecondFactorError::MalformedResponse { .. })),
        ];
        for (value, expected) in cases {
            f.second_factor.begin_login(&f.store, &f.user, &enrolled).await.unwrap();
            let err = f
                .second_factor
                .finish_login(&f.store, &f.user, value)
                .await
                .unwrap_err();
            assert!(expected(&err), "unexpected error for {value:?}: {err}");
        }
    }

    #[tokio::test]
    async fn test_wrong_assertion_is_rejected() {
        let f = fixture(true).await;
        let register = f.second_factor.begin_registration(&f.store, &f.user).await.unwrap();
        f.second_factor
            .finish_registration(&f.store, &f.user, &answer(&register))
            .await
            .unwrap();
        let enrolled = f.second_factor.credentials().find_by_user(f.user.id).await.unwrap();
        f.second_factor.begin_login(&f.store, &f.user, &enrolled).await.unwrap();

        let forged = json!({"ok": true, "challenge": "something else"});
        let err = f
            .second_factor
            .finish_login(&f.store, &f.user, Some(&header(&forged)))
            .await
            .unwrap_err();

        assert!(matches!(err, SecondFactorError::Rejected { .. }));
    }
}
