//! Single-account session.
//!
//! The [`SessionStore`] owns who is signed in, their profile, the credential
//! history and the last status message. Storage is written before memory:
//! when a port write fails, the in-memory session is left as it was.
//!
//! Two records live in the port. `account` is the one registered account
//! and survives sign-out. `user` and `profile` describe the active session
//! and are removed by sign-out.
//!
//! ```text
//!            register / sign_in
//! Anonymous ───────────────────▶ Authenticated
//!     ▲                               │
//!     └────────── sign_out ───────────┘
//! ```

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::credential::CredentialHasher;
use crate::error::{Error, Result};
use crate::events::{StoreEvent, SubscriptionId, Subscribers};
use crate::port::{self, KeyValueStore, WriteBatch};
use crate::task::{SharedTaskStore, Task};

/// Port key holding the signed-in user
pub const USER_KEY: &str = "user";
/// Port key holding the signed-in user's profile
pub const PROFILE_KEY: &str = "profile";
/// Port key holding the registered account, kept across sign-out
pub const ACCOUNT_KEY: &str = "account";
/// Port key holding the credential history
pub const PREVIOUS_PASSWORDS_KEY: &str = "previousPasswords";

pub const MSG_ACCOUNT_CREATED: &str = "Account successfully created.";
pub const MSG_DUPLICATE_ACCOUNT: &str = "User already exists with this email.";
pub const MSG_SIGNED_IN: &str = "Successfully signed in.";
pub const MSG_INVALID_CREDENTIALS: &str = "User not found or password incorrect.";
pub const MSG_SIGNED_OUT: &str = "Successfully signed out.";

/// Registered account. `credential` is whatever the hasher produced.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    #[serde(rename = "password")]
    pub credential: String,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("credential", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: u64,
    pub username: String,
}

/// The single registered account slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub user: User,
    pub profile: Option<Profile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Anonymous,
    Authenticated,
}

pub struct SessionStore<S: KeyValueStore> {
    tasks: SharedTaskStore,
    store: S,
    hasher: Box<dyn CredentialHasher>,
    current_user: Option<User>,
    current_profile: Option<Profile>,
    previous_passwords: Vec<String>,
    last_message: String,
    last_user_id: u64,
    subscribers: Subscribers,
}

impl<S: KeyValueStore> SessionStore<S> {
    /// An anonymous session. Call [`SessionStore::fetch_user`] to restore a
    /// persisted one.
    pub fn new(tasks: SharedTaskStore, store: S, hasher: Box<dyn CredentialHasher>) -> Self {
        Self {
            tasks,
            store,
            hasher,
            current_user: None,
            current_profile: None,
            previous_passwords: Vec::new(),
            last_message: String::new(),
            last_user_id: 0,
            subscribers: Subscribers::default(),
        }
    }

    /// Restore the session from the port.
    ///
    /// A persisted user and its profile become current. With no persisted
    /// user an existing in-memory session is kept. Returns true when a
    /// persisted user was found.
    pub fn fetch_user(&mut self) -> Result<bool> {
        let user: Option<User> = port::get_json(&self.store, USER_KEY)?;
        let profile: Option<Profile> = port::get_json(&self.store, PROFILE_KEY)?;
        let history: Vec<String> =
            port::get_json(&self.store, PREVIOUS_PASSWORDS_KEY)?.unwrap_or_default();

        self.previous_passwords = history;
        let Some(user) = user else {
            tracing::debug!(logged_in = self.is_logged_in(), "no persisted user");
            return Ok(false);
        };

        let user_id = user.id;
        self.last_user_id = self.last_user_id.max(user_id);
        self.current_user = Some(user);
        self.current_profile = profile;
        tracing::debug!(user_id, "session restored");
        self.subscribers
            .notify(&StoreEvent::SessionRestored { user_id });
        Ok(true)
    }

    /// Create the account and sign it in.
    ///
    /// Fails with [`Error::DuplicateAccount`] when the registered account has
    /// the same email. A different email replaces the single account slot.
    pub fn register(&mut self, email: &str, password: &str) -> Result<User> {
        let existing = self.stored_account()?;
        if existing.as_ref().is_some_and(|account| account.user.email == email) {
            tracing::debug!(email, "register: account exists");
            self.last_message = MSG_DUPLICATE_ACCOUNT.to_string();
            return Err(Error::DuplicateAccount(email.to_string()));
        }

        let credential = self.hasher.hash(password)?;
        let mut history: Vec<String> = port::get_json(&self.store, PREVIOUS_PASSWORDS_KEY)?
            .unwrap_or_else(|| self.previous_passwords.clone());
        history.push(credential.clone());

        let user = User {
            id: self.next_user_id(),
            email: email.to_string(),
            credential,
        };
        let profile = Profile {
            user_id: user.id,
            username: email.to_string(),
        };

        let account = Account {
            user: user.clone(),
            profile: Some(profile.clone()),
        };

        let mut batch = WriteBatch::new(&self.store);
        batch.set_json(ACCOUNT_KEY, &account)?;
        batch.set_json(USER_KEY, &user)?;
        batch.set_json(PROFILE_KEY, &profile)?;
        batch.set_json(PREVIOUS_PASSWORDS_KEY, &history)?;
        batch.commit();

        let user_id = user.id;
        self.last_user_id = user_id;
        self.current_user = Some(user.clone());
        self.current_profile = Some(profile);
        self.previous_passwords = history;
        self.last_message = MSG_ACCOUNT_CREATED.to_string();
        tracing::debug!(user_id, email, scheme = self.hasher.scheme(), "account registered");
        self.subscribers.notify(&StoreEvent::Registered { user_id });
        Ok(user)
    }

    /// Sign in against the registered account.
    ///
    /// On mismatch only `last_message` changes.
    pub fn sign_in(&mut self, email: &str, password: &str) -> Result<User> {
        let Account { user, profile } = match self.stored_account()? {
            Some(account)
                if account.user.email == email
                    && self.hasher.verify(password, &account.user.credential) =>
            {
                account
            }
            _ => {
                tracing::debug!(email, "sign-in rejected");
                self.last_message = MSG_INVALID_CREDENTIALS.to_string();
                return Err(Error::InvalidCredentials);
            }
        };

        let mut batch = WriteBatch::new(&self.store);
        batch.set_json(USER_KEY, &user)?;
        match &profile {
            Some(profile) => batch.set_json(PROFILE_KEY, profile)?,
            None => batch.delete(PROFILE_KEY)?,
        }
        batch.commit();

        let user_id = user.id;
        self.last_user_id = self.last_user_id.max(user_id);
        self.current_user = Some(user.clone());
        self.current_profile = profile;
        self.last_message = MSG_SIGNED_IN.to_string();
        tracing::debug!(user_id, "signed in");
        self.subscribers.notify(&StoreEvent::SignedIn { user_id });
        Ok(user)
    }

    /// End the session in storage and memory. The registered account and
    /// the credential history stay.
    pub fn sign_out(&mut self) -> Result<()> {
        let mut batch = WriteBatch::new(&self.store);
        batch.delete(USER_KEY)?;
        batch.delete(PROFILE_KEY)?;
        batch.commit();

        self.current_user = None;
        self.current_profile = None;
        self.last_message = MSG_SIGNED_OUT.to_string();
        tracing::debug!("signed out");
        self.subscribers.notify(&StoreEvent::SignedOut);
        Ok(())
    }

    /// Tasks owned by the signed-in user, in collection order
    pub fn tasks_for_current_user(&self) -> Vec<Task> {
        let Some(user) = &self.current_user else {
            return Vec::new();
        };
        self.tasks
            .borrow()
            .by_user(user.id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Credential history as stored, oldest first
    pub fn previous_passwords(&self) -> &[String] {
        &self.previous_passwords
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    pub fn current_profile(&self) -> Option<&Profile> {
        self.current_profile.as_ref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.current_user.is_some()
    }

    pub fn state(&self) -> SessionState {
        if self.is_logged_in() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        }
    }

    pub fn last_message(&self) -> &str {
        &self.last_message
    }

    pub fn task_store(&self) -> &SharedTaskStore {
        &self.tasks
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn hasher(&self) -> &dyn CredentialHasher {
        self.hasher.as_ref()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&StoreEvent) + 'static) -> SubscriptionId {
        self.subscribers.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// The registered account. Data written before the `account` record
    /// existed falls back to the session keys.
    fn stored_account(&self) -> Result<Option<Account>> {
        if let Some(account) = port::get_json::<Account, _>(&self.store, ACCOUNT_KEY)? {
            return Ok(Some(account));
        }
        let Some(user) = port::get_json::<User, _>(&self.store, USER_KEY)? else {
            return Ok(None);
        };
        let profile = port::get_json(&self.store, PROFILE_KEY)?;
        Ok(Some(Account { user, profile }))
    }

    /// Millisecond timestamp, bumped past the last id handed out.
    /// Saturates at `u64::MAX`; the single account slot is replaced anyway.
    fn next_user_id(&self) -> u64 {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        now.max(self.last_user_id.saturating_add(1))
    }
}

impl<S: KeyValueStore + fmt::Debug> fmt::Debug for SessionStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("store", &self.store)
            .field("scheme", &self.hasher.scheme())
            .field("current_user", &self.current_user)
            .field("current_profile", &self.current_profile)
            .field("previous_passwords", &self.previous_passwords.len())
            .field("last_message", &self.last_message)
            .finish()
    }
}
