//! Signed-in user state with an explicit lifecycle.
//!
//! The app creates one [`AppContext`] at startup, replaces the session on sign-in
//! and sign-out, and tears it down with [`AppContext::shutdown`].

use foundation::Timestamp;
use serde::{Deserialize, Serialize};

use crate::SessionError;

/// Anonymous sessions expire this many days after creation.
pub const ANONYMOUS_SESSION_DAYS: u64 = 30;
pub const ANONYMOUS_NAME: &str = "Anonymous";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "auth_type", rename_all = "snake_case")]
pub enum Identity {
    /// Backed by the hosted identity provider; does not expire locally.
    #[serde(rename = "oauth")]
    OAuth { provider: String },
    /// Issued on this device.
    Anonymous { expires_at: Timestamp },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub name: String,
    pub identity: Identity,
}

impl Session {
    pub fn is_expired(&self, now: Timestamp) -> bool {
        match self.identity {
            Identity::OAuth { .. } => false,
            Identity::Anonymous { expires_at } => !now.is_before(expires_at),
        }
    }

    pub fn current_user(&self) -> CurrentUser {
        CurrentUser {
            id: self.user_id.clone(),
            name: self.name.clone(),
            is_anonymous: matches!(self.identity, Identity::Anonymous { .. }),
        }
    }
}

/// What the rest of the app may know about the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub name: String,
    pub is_anonymous: bool,
}

/// Persists at most one session.
pub trait SessionStore {
    fn load(&self) -> Result<Option<Session>, SessionError>;
    fn save(&mut self, session: &Session) -> Result<(), SessionError>;
    fn clear(&mut self) -> Result<(), SessionError>;
}

/// Keeps the serialized session in memory, mirroring what browser storage holds.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    raw: Option<String>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with raw stored text, valid or not.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Some(raw.into()),
        }
    }

    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(&self) -> Result<Option<Session>, SessionError> {
        let Some(raw) = self.raw.as_deref().filter(|r| !r.trim().is_empty()) else {
            return Ok(None);
        };
        serde_json::from_str(raw)
            .map(Some)
            .map_err(|e| SessionError::Corrupt(e.to_string()))
    }

    fn save(&mut self, session: &Session) -> Result<(), SessionError> {
        let raw = serde_json::to_string(session).map_err(|e| SessionError::Io(e.to_string()))?;
        self.raw = Some(raw);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), SessionError> {
        self.raw = None;
        Ok(())
    }
}

#[derive(Debug)]
pub struct AppContext<S: SessionStore> {
    sessions: S,
    session: Option<Session>,
}

impl<S: SessionStore> AppContext<S> {
    /// Restores the persisted session. Expired or unreadable sessions are
    /// discarded and the context starts signed out.
    pub fn restore(mut sessions: S, now: Timestamp) -> Self {
        let session = match sessions.load() {
            Ok(Some(session)) if session.is_expired(now) => {
                tracing::info!(user = %session.user_id, "anonymous session expired");
                discard(&mut sessions);
                None
            }
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(%err, "discarding unreadable session");
                discard(&mut sessions);
                None
            }
        };
        Self { sessions, session }
    }

    pub fn current_user(&self) -> Option<CurrentUser> {
        self.session.as_ref().map(Session::current_user)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// Records a session established by the hosted identity provider.
    pub fn sign_in(
        &mut self,
        user_id: impl Into<String>,
        name: impl Into<String>,
        provider: impl Into<String>,
    ) -> Result<CurrentUser, SessionError> {
        self.replace(Session {
            user_id: user_id.into(),
            name: name.into(),
            identity: Identity::OAuth {
                provider: provider.into(),
            },
        })
    }

    /// Issues a local identity that expires after [`ANONYMOUS_SESSION_DAYS`].
    pub fn sign_in_anonymously(
        &mut self,
        name: Option<&str>,
        now: Timestamp,
    ) -> Result<CurrentUser, SessionError> {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(ANONYMOUS_NAME);
        self.replace(Session {
            user_id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            identity: Identity::Anonymous {
                expires_at: now.plus_days(ANONYMOUS_SESSION_DAYS),
            },
        })
    }

    pub fn sign_out(&mut self) -> Result<(), SessionError> {
        self.sessions.clear()?;
        if let Some(session) = self.session.take() {
            tracing::info!(user = %session.user_id, "signed out");
        }
        Ok(())
    }

    /// Ends the context, handing back its session store. The persisted session
    /// is left in place for the next [`AppContext::restore`].
    pub fn shutdown(self) -> S {
        if let Some(session) = &self.session {
            tracing::debug!(user = %session.user_id, "app context shut down");
        }
        self.sessions
    }

    fn replace(&mut self, session: Session) -> Result<CurrentUser, SessionError> {
        self.sessions.save(&session)?;
        let user = session.current_user();
        tracing::info!(user = %user.id, anonymous = user.is_anonymous, "signed in");
        self.session = Some(session);
        Ok(user)
    }
}

fn discard<S: SessionStore>(sessions: &mut S) {
    if let Err(err) = sessions.clear() {
        tracing::warn!(%err, "failed to clear stored session");
    }
}
