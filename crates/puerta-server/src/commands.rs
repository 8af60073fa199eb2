//! One-shot administrative commands run from the CLI.

use chrono::{DateTime, Utc};
use puerta_auth::hash_password;
use puerta_core::{Schedule, Ttl};
use puerta_door::hue::{HueConfig, HueDoor, HueLight};
use puerta_storage::{Database, SqliteUserRepository, User, UserRepository};
use tracing::info;

/// Fields of a user created from the command line.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub handle: String,
    pub name: String,
    pub password: String,
    pub greeting: String,
    pub ttl: Option<Ttl>,
    pub expires: Option<DateTime<Utc>>,
    pub schedule: Option<Schedule>,
    pub is_admin: bool,
    pub require_2fa: bool,
}

impl NewUser {
    fn into_user(self) -> anyhow::Result<User> {
        let mut user = User::new(self.handle, self.name, hash_password(&self.password)?)
            .with_greeting(self.greeting)
            .with_admin(self.is_admin)
            .with_2fa(self.require_2fa);
        if let Some(ttl) = self.ttl {
            user = user.with_ttl(ttl);
        }
        if let Some(expires) = self.expires {
            user = user.with_expiry(expires);
        }
        if let Some(schedule) = self.schedule {
            user = user.with_schedule(schedule);
        }
        Ok(user)
    }
}

/// Insert a user into the database at `db_path`, returning its id.
pub async fn create_user(db_path: &str, new_user: NewUser) -> anyhow::Result<i64> {
    let db = Database::open(db_path).await?;
    let users = SqliteUserRepository::new(db.pool().clone());

    let user = new_user.into_user()?;
    let id = users.create(&user).await?;
    info!(user = %user.handle, id, admin = user.is_admin, "user created");

    db.close().await;
    Ok(id)
}

/// Pair with a Hue bridge when no username is known yet, then list its
/// lights.
///
/// Returns the username to put in the adapter configuration together with
/// the lights it can see.
pub async fn hue_setup(
    ip: &str,
    devicetype: &str,
    username: Option<String>,
) -> anyhow::Result<(String, Vec<HueLight>)> {
    let username = match username {
        Some(username) => username,
        None => {
            let bridge = HueDoor::new(HueConfig::new(ip))?;
            let username = bridge.pair(devicetype).await?;
            info!(bridge = ip, "paired with hue bridge");
            username
        }
    };

    let bridge = HueDoor::new(HueConfig::new(ip).username(username.clone()))?;
    let lights = bridge.lights().await?;
    Ok((username, lights))
}
