//! Browser `localStorage` backing for [`SessionStore`].

use crate::{Session, SessionError, SessionStore};

pub const DEFAULT_SESSION_KEY: &str = "anonymous_session";

#[cfg(target_arch = "wasm32")]
mod wasm {
    use super::{DEFAULT_SESSION_KEY, Session, SessionError, SessionStore};
    use wasm_bindgen::JsValue;

    #[derive(Debug)]
    pub struct LocalStorageSessionStore {
        key: String,
    }

    impl LocalStorageSessionStore {
        pub fn new(key: impl Into<String>) -> Result<Self, SessionError> {
            // Fail early when storage is blocked (private mode, sandboxed iframes).
            window_local_storage()?;
            Ok(Self { key: key.into() })
        }

        pub fn with_default_key() -> Result<Self, SessionError> {
            Self::new(DEFAULT_SESSION_KEY)
        }
    }

    impl SessionStore for LocalStorageSessionStore {
        fn load(&self) -> Result<Option<Session>, SessionError> {
            let storage = window_local_storage()?;
            let raw = storage
                .get_item(&self.key)
                .map_err(|e| io("get_item", e))?;
            let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
                return Ok(None);
            };
            serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| SessionError::Corrupt(e.to_string()))
        }

        fn save(&mut self, session: &Session) -> Result<(), SessionError> {
            let storage = window_local_storage()?;
            let raw =
                serde_json::to_string(session).map_err(|e| SessionError::Io(e.to_string()))?;
            storage
                .set_item(&self.key, &raw)
                .map_err(|e| io("set_item", e))
        }

        fn clear(&mut self) -> Result<(), SessionError> {
            let storage = window_local_storage()?;
            storage
                .remove_item(&self.key)
                .map_err(|e| io("remove_item", e))
        }
    }

    fn io(op: &str, err: JsValue) -> SessionError {
        SessionError::Io(format!("{op} failed: {err:?}"))
    }

    fn window_local_storage() -> Result<web_sys::Storage, SessionError> {
        let win = web_sys::window().ok_or(SessionError::StorageUnavailable)?;
        win.local_storage()
            .map_err(|e| io("localStorage", e))?
            .ok_or(SessionError::StorageUnavailable)
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm::LocalStorageSessionStore;

/// Native builds have no browser storage; use [`crate::InMemorySessionStore`].
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug)]
pub struct LocalStorageSessionStore;

#[cfg(not(target_arch = "wasm32"))]
impl LocalStorageSessionStore {
    pub fn new(_key: impl Into<String>) -> Result<Self, SessionError> {
        Err(SessionError::StorageUnavailable)
    }

    pub fn with_default_key() -> Result<Self, SessionError> {
        Self::new(DEFAULT_SESSION_KEY)
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl SessionStore for LocalStorageSessionStore {
    fn load(&self) -> Result<Option<Session>, SessionError> {
        Err(SessionError::StorageUnavailable)
    }

    fn save(&mut self, _session: &Session) -> Result<(), SessionError> {
        Err(SessionError::StorageUnavailable)
    }

    fn clear(&mut self) -> Result<(), SessionError> {
        Err(SessionError::StorageUnavailable)
    }
}
