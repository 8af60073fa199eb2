//! Shared state handed to every handler.

use std::sync::Arc;

use puerta_auth::{SecondFactor, SessionManager, WebauthnRelyingParty};
use puerta_core::AccessPolicy;
use puerta_door::DoorController;
use puerta_storage::{
    Database, SqliteAuditLogRepository, SqliteCredentialRepository, SqliteSessionRepository,
    SqliteUserRepository,
};

use crate::config::Config;

/// Cloned into each request; the heavy parts sit behind `Arc`s or pools.
#[derive(Debug, Clone)]
pub struct AppState {
    pub users: SqliteUserRepository,
    pub audit: SqliteAuditLogRepository,
    pub sessions: Arc<SessionManager<SqliteSessionRepository>>,
    pub second_factor: Arc<SecondFactor<WebauthnRelyingParty, SqliteCredentialRepository>>,
    pub door: DoorController,
    pub policy: AccessPolicy,
    pub secure_cookies: bool,
}

impl AppState {
    /// Wire repositories, the relying party and the door together.
    pub fn new(config: &Config, db: &Database, door: DoorController) -> anyhow::Result<Self> {
        let pool = db.pool().clone();
        let relying_party =
            WebauthnRelyingParty::new(config.rp_id(), &config.public_origin(), &config.name)?;
        let policy = config.policy()?;

        Ok(Self {
            users: SqliteUserRepository::new(pool.clone()),
            audit: SqliteAuditLogRepository::new(pool.clone()),
            sessions: Arc::new(SessionManager::new(SqliteSessionRepository::new(pool.clone()))),
            second_factor: Arc::new(SecondFactor::new(
                relying_party,
                SqliteCredentialRepository::new(pool),
            )),
            door,
            policy,
            secure_cookies: config.secure_cookies(),
        })
    }
}
