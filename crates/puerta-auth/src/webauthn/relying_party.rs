use puerta_storage::{Credential, User};
use serde_json::Value;
use tracing::debug;
use url::Url;
use uuid::Uuid;
use webauthn_rs::prelude::{
    Passkey, PasskeyAuthentication, PasskeyRegistration, PublicKeyCredential,
    RegisterPublicKeyCredential, Webauthn, WebauthnBuilder,
};

use crate::error::SecondFactorError;

type Result<T> = std::result::Result<T, SecondFactorError>;

/// Options for the browser plus the state needed to verify its answer.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingChallenge {
    pub options: Value,
    pub state: Value,
}

/// An authenticator accepted during registration, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCredential {
    pub credential_id: String,
    pub passkey: String,
}

/// The cryptographic half of the second factor.
///
/// Everything here is synchronous: generating challenges and verifying
/// signatures needs no I/O. Persisting state is the caller's job.
pub trait RelyingParty: Send + Sync {
    fn start_registration(&self, user: &User, enrolled: &[Credential]) -> Result<PendingChallenge>;

    fn finish_registration(&self, state: &Value, response: &Value) -> Result<NewCredential>;

    fn start_login(&self, enrolled: &[Credential]) -> Result<PendingChallenge>;

    fn finish_login(&self, state: &Value, response: &Value) -> Result<()>;
}

/// [`RelyingParty`] backed by `webauthn-rs` passkeys.
pub struct WebauthnRelyingParty {
    webauthn: Webauthn,
    rp_id: String,
}

impl std::fmt::Debug for WebauthnRelyingParty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebauthnRelyingParty")
            .field("rp_id", &self.rp_id)
            .finish_non_exhaustive()
    }
}

impl WebauthnRelyingParty {
    /// `rp_id` is the bare host browsers see (`door.example.com`); `origin`
    /// is the full URL the UI is served from.
    pub fn new(rp_id: &str, origin: &str, display_name: &str) -> Result<Self> {
        let origin = Url::parse(origin)
            .map_err(|e| SecondFactorError::relying_party(format!("invalid origin {origin:?}: {e}")))?;
        let webauthn = WebauthnBuilder::new(rp_id, &origin)
            .map_err(|e| SecondFactorError::relying_party(e.to_string()))?
            .rp_name(display_name)
            .build()
            .map_err(|e| SecondFactorError::relying_party(e.to_string()))?;

        debug!(rp_id, %origin, "webauthn relying party ready");
        Ok(Self {
            webauthn,
            rp_id: rp_id.to_string(),
        })
    }

    /// Stable WebAuthn user handle derived from the user row.
    fn user_uuid(user: &User) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{}-{}", user.id, user.handle).as_bytes())
    }

    fn passkeys(enrolled: &[Credential]) -> Result<Vec<Passkey>> {
        enrolled
            .iter()
            .map(|credential| Ok(serde_json::from_str(&credential.passkey)?))
            .collect()
    }
}

impl RelyingParty for WebauthnRelyingParty {
    fn start_registration(&self, user: &User, enrolled: &[Credential]) -> Result<PendingChallenge> {
        let exclude: Vec<_> = Self::passkeys(enrolled)?
            .iter()
            .map(|passkey| passkey.cred_id().clone())
            .collect();
        let exclude = (!exclude.is_empty()).then_some(exclude);

        let (options, registration) = self
            .webauthn
            .start_passkey_registration(Self::user_uuid(user), &user.handle, &user.name, exclude)
            .map_err(|e| SecondFactorError::relying_party(e.to_string()))?;

        Ok(PendingChallenge {
            options: serde_json::to_value(&options)?,
            state: serde_json::to_value(&registration)?,
        })
    }

    fn finish_registration(&self, state: &Value, response: &Value) -> Result<NewCredential> {
        let registration: PasskeyRegistration = serde_json::from_value(state.clone())?;
        let response: RegisterPublicKeyCredential = serde_json::from_value(response.clone())
            .map_err(|e| SecondFactorError::malformed(e.to_string()))?;

        let passkey = self
            .webauthn
            .finish_passkey_registration(&response, &registration)
            .map_err(|e| SecondFactorError::rejected(e.to_string()))?;

        let credential_id = match serde_json::to_value(passkey.cred_id())? {
            Value::String(id) => id,
            other => other.to_string(),
        };

        Ok(NewCredential {
            credential_id,
            passkey: serde_json::to_string(&passkey)?,
        })
    }

    fn start_login(&self, enrolled: &[Credential]) -> Result<PendingChallenge> {
        let passkeys = Self::passkeys(enrolled)?;
        let (options, authentication) = self
            .webauthn
            .start_passkey_authentication(&passkeys)
            .map_err(|e| SecondFactorError::relying_party(e.to_string()))?;

        Ok(PendingChallenge {
            options: serde_json::to_value(&options)?,
            state: serde_json::to_value(&authentication)?,
        })
    }

    fn finish_login(&self, state: &Value, response: &Value) -> Result<()> {
        let authentication: PasskeyAuthentication = serde_json::from_value(state.clone())?;
        let response: PublicKeyCredential = serde_json::from_value(response.clone())
            .map_err(|e| SecondFactorError::malformed(e.to_string()))?;

        let result = self
            .webauthn
            .finish_passkey_authentication(&response, &authentication)
            .map_err(|e| SecondFactorError::rejected(e.to_string()))?;

        debug!(user_verified = result.user_verified(), "webauthn assertion verified");
        Ok(())
    }
}
