//! Login flow: password phase, username phase, and the one-time admin
//! setup phase.
//!
//! Every phase returns a closed outcome enum so callers re-display
//! rejections without guessing at shapes; `anyhow::Result` wraps only
//! store failures.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};

use crate::domain::identity::{Identity, ADMIN_USERNAME, COLOR_PALETTE};
use crate::domain::{admin::AdminConfig, identity::PresenceStatus};
use crate::infra::contracts::SessionStore;

const MIN_USERNAME_LEN: usize = 2;
const MIN_ADMIN_PASSWORD_LEN: usize = 6;

/// Coarse authorization granted at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    Admin,
    Room,
    Public,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    pub level: AccessLevel,
    /// Set when `level` is [`AccessLevel::Room`]: the only room this
    /// session may see.
    pub restricted_room_id: Option<String>,
}

/// A completed login: the resolved identity plus its grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSession {
    pub identity: Identity,
    pub grant: AccessGrant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordOutcome {
    Accepted(AccessGrant),
    /// Matches neither the master passphrase nor any private room.
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsernameOutcome {
    LoggedIn(LoginSession),
    /// Reserved admin name with no admin config yet: the flow moves to
    /// the one-time setup phase.
    AdminSetupRequired,
    Rejected(UsernameRejection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsernameRejection {
    TooShort,
    InUse,
    InvalidAdminCredentials,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminSetupOutcome {
    Completed(LoginSession),
    PasswordTooShort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Password,
    Username,
    AdminSetup,
    Complete,
}

/// State machine driving a single login attempt.
pub struct LoginFlow {
    phase: Phase,
    /// Password captured in the first phase; rechecked against the stored
    /// admin credential when the admin username is chosen.
    captured_password: Option<String>,
    grant: Option<AccessGrant>,
}

impl LoginFlow {
    pub fn new() -> Self {
        Self {
            phase: Phase::Password,
            captured_password: None,
            grant: None,
        }
    }

    /// Password phase: master passphrase grants public access, a private
    /// room's password grants room-restricted access.
    pub fn submit_password(
        &mut self,
        store: &dyn SessionStore,
        master_password: &str,
        supplied: &str,
    ) -> Result<PasswordOutcome> {
        if self.phase != Phase::Password {
            bail!("password submitted outside the password phase");
        }

        let grant = if supplied == master_password {
            Some(AccessGrant {
                level: AccessLevel::Public,
                restricted_room_id: None,
            })
        } else {
            store
                .load_rooms()?
                .iter()
                .find(|room| room.password == supplied && room.is_private)
                .map(|room| AccessGrant {
                    level: AccessLevel::Room,
                    restricted_room_id: Some(room.id.clone()),
                })
        };

        match grant {
            Some(grant) => {
                self.captured_password = Some(supplied.to_owned());
                self.grant = Some(grant.clone());
                self.phase = Phase::Username;
                Ok(PasswordOutcome::Accepted(grant))
            }
            None => Ok(PasswordOutcome::Rejected),
        }
    }

    /// Username phase: restores a saved identity, mints a new one, or
    /// branches into admin setup / admin credential validation.
    pub fn submit_username(
        &mut self,
        store: &mut dyn SessionStore,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<UsernameOutcome> {
        if self.phase != Phase::Username {
            bail!("username submitted outside the username phase");
        }

        let username = username.trim();
        if username.len() < MIN_USERNAME_LEN {
            return Ok(UsernameOutcome::Rejected(UsernameRejection::TooShort));
        }

        let is_admin_name = username.eq_ignore_ascii_case(ADMIN_USERNAME);
        if is_admin_name {
            match store.load_admin_config()? {
                None => {
                    self.phase = Phase::AdminSetup;
                    return Ok(UsernameOutcome::AdminSetupRequired);
                }
                Some(config) => {
                    if self.captured_password.as_deref() != Some(config.admin_password.as_str()) {
                        return Ok(UsernameOutcome::Rejected(
                            UsernameRejection::InvalidAdminCredentials,
                        ));
                    }
                    if let Some(grant) = self.grant.as_mut() {
                        grant.level = AccessLevel::Admin;
                    }
                }
            }
        }

        let identity = match store.load_saved_identities()?.remove(&username.to_lowercase()) {
            Some(saved) => {
                let mut restored = saved.refreshed(now);
                if is_admin_name {
                    restored.is_admin = true;
                }
                restored
            }
            None => {
                let present = store.load_users()?;
                if present.iter().any(|user| user.has_username(username)) {
                    return Ok(UsernameOutcome::Rejected(UsernameRejection::InUse));
                }
                let minted = Identity::new(username, is_admin_name, now);
                let mut saved = store.load_saved_identities()?;
                saved.insert(username.to_lowercase(), minted.clone());
                store.save_saved_identities(&saved)?;
                minted
            }
        };

        self.activate(store, identity)
    }

    /// One-time admin setup: writes the AdminConfig that gates all future
    /// admin logins, then creates the admin identity.
    pub fn submit_admin_password(
        &mut self,
        store: &mut dyn SessionStore,
        supplied: &str,
        now: DateTime<Utc>,
    ) -> Result<AdminSetupOutcome> {
        if self.phase != Phase::AdminSetup {
            bail!("admin password submitted outside the setup phase");
        }

        let supplied = supplied.trim();
        if supplied.len() < MIN_ADMIN_PASSWORD_LEN {
            return Ok(AdminSetupOutcome::PasswordTooShort);
        }

        store.save_admin_config(&AdminConfig::bootstrap(supplied))?;
        tracing::info!("admin bootstrap completed");

        let mut identity = Identity::new(ADMIN_USERNAME, true, now);
        identity.color = COLOR_PALETTE[0].to_owned();

        let mut saved = store.load_saved_identities()?;
        saved.insert(ADMIN_USERNAME.to_owned(), identity.clone());
        store.save_saved_identities(&saved)?;

        self.grant = Some(AccessGrant {
            level: AccessLevel::Admin,
            restricted_room_id: None,
        });

        match self.activate(store, identity)? {
            UsernameOutcome::LoggedIn(session) => Ok(AdminSetupOutcome::Completed(session)),
            _ => bail!("admin activation cannot be rejected"),
        }
    }

    /// Persists the resolved identity as present and current, consuming
    /// the grant.
    fn activate(
        &mut self,
        store: &mut dyn SessionStore,
        identity: Identity,
    ) -> Result<UsernameOutcome> {
        let Some(grant) = self.grant.clone() else {
            bail!("login activated without an access grant");
        };

        let mut users: Vec<Identity> = store
            .load_users()?
            .into_iter()
            .filter(|user| !user.has_username(&identity.username))
            .collect();
        users.push(identity.clone());
        store.save_users(&users)?;
        store.save_current_identity(&identity)?;

        debug_assert_eq!(identity.status, PresenceStatus::Online);
        self.phase = Phase::Complete;
        tracing::debug!(username = %identity.username, level = ?grant.level, "login resolved");

        Ok(UsernameOutcome::LoggedIn(LoginSession { identity, grant }))
    }
}

impl Default for LoginFlow {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::room::Room;
    use crate::infra::stubs::MemorySessionStore;

    const MASTER: &str = "let-me-in";

    fn accepted_flow(store: &MemorySessionStore) -> LoginFlow {
        let mut flow = LoginFlow::new();
        let outcome = flow
            .submit_password(store, MASTER, MASTER)
            .expect("store should not fail");
        assert!(matches!(outcome, PasswordOutcome::Accepted(_)));
        flow
    }

    #[test]
    fn master_passphrase_grants_public_access() {
        let store = MemorySessionStore::default();
        let mut flow = LoginFlow::new();

        let outcome = flow.submit_password(&store, MASTER, MASTER).expect("ok");

        match outcome {
            PasswordOutcome::Accepted(grant) => {
                assert_eq!(grant.level, AccessLevel::Public);
                assert_eq!(grant.restricted_room_id, None);
            }
            PasswordOutcome::Rejected => panic!("master passphrase must be accepted"),
        }
    }

    #[test]
    fn unknown_password_is_rejected() {
        let store = MemorySessionStore::default();
        let mut flow = LoginFlow::new();

        let outcome = flow.submit_password(&store, MASTER, "nope").expect("ok");

        assert_eq!(outcome, PasswordOutcome::Rejected);
    }

    #[test]
    fn private_room_password_grants_restricted_access() {
        let mut store = MemorySessionStore::default();
        let room = Room::new("owner", "den", "hunter2", true, None, 48, Utc::now());
        store.rooms.push(room.clone());

        let mut flow = LoginFlow::new();
        let outcome = flow.submit_password(&store, MASTER, "hunter2").expect("ok");

        match outcome {
            PasswordOutcome::Accepted(grant) => {
                assert_eq!(grant.level, AccessLevel::Room);
                assert_eq!(grant.restricted_room_id, Some(room.id));
            }
            PasswordOutcome::Rejected => panic!("room password must be accepted"),
        }
    }

    #[test]
    fn public_room_password_does_not_grant_entry() {
        let mut store = MemorySessionStore::default();
        store
            .rooms
            .push(Room::new("owner", "lobby", "hunter2", false, None, 48, Utc::now()));

        let mut flow = LoginFlow::new();
        let outcome = flow.submit_password(&store, MASTER, "hunter2").expect("ok");

        assert_eq!(outcome, PasswordOutcome::Rejected);
    }

    #[test]
    fn short_username_is_rejected() {
        let mut store = MemorySessionStore::default();
        let mut flow = accepted_flow(&store);

        let outcome = flow.submit_username(&mut store, "a", Utc::now()).expect("ok");

        assert_eq!(
            outcome,
            UsernameOutcome::Rejected(UsernameRejection::TooShort)
        );
    }

    #[test]
    fn new_username_mints_identity_and_persists_presence() {
        let mut store = MemorySessionStore::default();
        let mut flow = accepted_flow(&store);

        let outcome = flow
            .submit_username(&mut store, "ada", Utc::now())
            .expect("ok");

        let UsernameOutcome::LoggedIn(session) = outcome else {
            panic!("fresh username must log in");
        };
        assert_eq!(session.identity.username, "ada");
        assert!(!session.identity.is_admin);
        assert_eq!(session.grant.level, AccessLevel::Public);
        assert_eq!(store.users.len(), 1);
        assert_eq!(store.current_identity, Some(session.identity.clone()));
        assert_eq!(store.saved_identities["ada"], session.identity);
    }

    #[test]
    fn present_username_is_rejected_case_insensitively() {
        let mut store = MemorySessionStore::default();
        store.users.push(Identity::new("Ada", false, Utc::now()));

        let mut flow = accepted_flow(&store);
        let outcome = flow
            .submit_username(&mut store, "ada", Utc::now())
            .expect("ok");

        assert_eq!(outcome, UsernameOutcome::Rejected(UsernameRejection::InUse));
    }

    #[test]
    fn saved_identity_restores_unconditionally_and_keeps_id_and_color() {
        let mut store = MemorySessionStore::default();
        let saved = Identity::new("Ada", false, Utc::now() - chrono::Duration::days(3));
        store
            .saved_identities
            .insert("ada".to_owned(), saved.clone());
        // A stale presence entry with the same name must not block restore.
        store.users.push(saved.clone());

        let mut flow = accepted_flow(&store);
        let now = Utc::now();
        let outcome = flow.submit_username(&mut store, "ADA", now).expect("ok");

        let UsernameOutcome::LoggedIn(session) = outcome else {
            panic!("saved identity must restore");
        };
        assert_eq!(session.identity.id, saved.id);
        assert_eq!(session.identity.color, saved.color);
        assert_eq!(session.identity.last_seen, now);
        assert_eq!(session.identity.status, PresenceStatus::Online);
        assert_eq!(store.users.len(), 1, "stale entry must be replaced");
    }

    #[test]
    fn admin_bootstrap_scenario() {
        let mut store = MemorySessionStore::default();
        let mut flow = accepted_flow(&store);

        let outcome = flow
            .submit_username(&mut store, "admin", Utc::now())
            .expect("ok");
        assert_eq!(outcome, UsernameOutcome::AdminSetupRequired);

        let outcome = flow
            .submit_admin_password(&mut store, "1234", Utc::now())
            .expect("ok");
        assert_eq!(outcome, AdminSetupOutcome::PasswordTooShort);

        let outcome = flow
            .submit_admin_password(&mut store, "secret1", Utc::now())
            .expect("ok");
        let AdminSetupOutcome::Completed(session) = outcome else {
            panic!("six-character password must complete setup");
        };
        assert_eq!(session.identity.username, "admin");
        assert!(session.identity.is_admin);
        assert_eq!(session.grant.level, AccessLevel::Admin);

        let config = store.admin_config.as_ref().expect("config must exist");
        assert_eq!(config.admin_password, "secret1");
        assert_eq!(config.default_retention_hours, 24);
    }

    #[test]
    fn admin_setup_happens_only_once() {
        let mut store = MemorySessionStore::default();
        let mut flow = accepted_flow(&store);
        assert_eq!(
            flow.submit_username(&mut store, "admin", Utc::now())
                .expect("ok"),
            UsernameOutcome::AdminSetupRequired
        );
        flow.submit_admin_password(&mut store, "secret1", Utc::now())
            .expect("ok");

        // Second login with the master passphrase instead of the admin
        // credential must be rejected, not offered setup again.
        let mut flow = accepted_flow(&store);
        let outcome = flow
            .submit_username(&mut store, "admin", Utc::now())
            .expect("ok");

        assert_eq!(
            outcome,
            UsernameOutcome::Rejected(UsernameRejection::InvalidAdminCredentials)
        );
    }

    #[test]
    fn admin_login_with_stored_credential_escalates_access() {
        let mut store = MemorySessionStore::default();
        store.admin_config = Some(AdminConfig::bootstrap("secret1"));
        let admin = Identity::new("admin", true, Utc::now());
        store
            .saved_identities
            .insert("admin".to_owned(), admin.clone());

        let mut flow = LoginFlow::new();
        // The admin credential is not the master passphrase, so the
        // password phase alone grants nothing.
        assert_eq!(
            flow.submit_password(&store, MASTER, "secret1").expect("ok"),
            PasswordOutcome::Rejected
        );

        // With a private room carrying the same password the phase grants
        // room access, later escalated by the username phase.
        store
            .rooms
            .push(Room::new("owner", "den", "secret1", true, None, 24, Utc::now()));
        let mut flow = LoginFlow::new();
        assert!(matches!(
            flow.submit_password(&store, MASTER, "secret1").expect("ok"),
            PasswordOutcome::Accepted(_)
        ));

        let outcome = flow
            .submit_username(&mut store, "admin", Utc::now())
            .expect("ok");
        let UsernameOutcome::LoggedIn(session) = outcome else {
            panic!("stored credential must log the admin in");
        };
        assert_eq!(session.grant.level, AccessLevel::Admin);
        assert_eq!(session.identity.id, admin.id);
    }
}
