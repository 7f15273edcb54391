//! Session context: the bearer token and the signed-in user
//!
//! A [`Session`] is created once at startup with [`Session::init`], which
//! reads any persisted token. Signing in persists the token; signing out or
//! an expired token (a 401 from the backend) clears both the in-memory copy
//! and the persisted one.

use std::path::PathBuf;
use std::sync::{Mutex, RwLock};

use crate::error::{ClientError, ClientResult};
use crate::models::User;

/// Persistence for the bearer token
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Option<String>;
    fn save(&self, token: &str) -> ClientResult<()>;
    fn clear(&self) -> ClientResult<()>;
}

/// Token kept in a file between runs
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

fn storage_error(action: &str, path: &std::path::Path, err: std::io::Error) -> ClientError {
    ClientError::Storage {
        message: format!("failed to {} {}: {}", action, path.display(), err),
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<String> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        let token = raw.trim();
        if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        }
    }

    fn save(&self, token: &str) -> ClientResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| storage_error("create", parent, e))?;
        }
        std::fs::write(&self.path, token).map_err(|e| storage_error("write", &self.path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .map_err(|e| storage_error("protect", &self.path, e))?;
        }

        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error("remove", &self.path, e)),
        }
    }
}

/// Token kept only in memory
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<String> {
        self.token.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn save(&self, token: &str) -> ClientResult<()> {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

/// Last lifecycle transition of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A token was stored by a successful login
    SignedIn,
    /// The user logged out
    SignedOut,
    /// The backend rejected the token; the user must log in again
    Expired,
}

#[derive(Debug, Default)]
struct SessionState {
    token: Option<String>,
    user: Option<User>,
    last_event: Option<SessionEvent>,
}

/// Authentication context passed explicitly to whoever needs the token
pub struct Session {
    store: Box<dyn TokenStore>,
    state: RwLock<SessionState>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("Session")
            .field("authenticated", &state.token.is_some())
            .field("user", &state.user.as_ref().map(|u| &u.email))
            .finish()
    }
}

impl Session {
    /// Start a session from whatever token the store holds
    pub fn init(store: impl TokenStore + 'static) -> Self {
        let token = store.load();
        log::debug!("Session initialized (token present: {})", token.is_some());
        Self {
            store: Box::new(store),
            state: RwLock::new(SessionState {
                token,
                ..Default::default()
            }),
        }
    }

    /// Session that never touches the disk
    pub fn in_memory() -> Self {
        Self::init(MemoryTokenStore::default())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn token(&self) -> Option<String> {
        self.read().token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().token.is_some()
    }

    /// Token for a protected call, or `Unauthorized` when signed out
    pub fn require_token(&self) -> ClientResult<String> {
        self.token().ok_or_else(|| ClientError::Unauthorized {
            detail: "Not logged in".to_string(),
        })
    }

    pub fn user(&self) -> Option<User> {
        self.read().user.clone()
    }

    pub fn set_user(&self, user: User) {
        self.write().user = Some(user);
    }

    pub fn last_event(&self) -> Option<SessionEvent> {
        self.read().last_event
    }

    /// Store a freshly issued token
    pub fn sign_in(&self, token: impl Into<String>) -> ClientResult<()> {
        let token = token.into();
        self.store.save(&token)?;
        let mut state = self.write();
        state.token = Some(token);
        state.user = None;
        state.last_event = Some(SessionEvent::SignedIn);
        log::info!("Signed in");
        Ok(())
    }

    /// Log out and forget the persisted token
    pub fn sign_out(&self) {
        self.teardown(SessionEvent::SignedOut);
        log::info!("Signed out");
    }

    /// The backend rejected the token
    pub fn expire(&self) {
        self.teardown(SessionEvent::Expired);
        log::warn!("Session expired; login required");
    }

    fn teardown(&self, event: SessionEvent) {
        if let Err(e) = self.store.clear() {
            log::error!("{}", e);
        }
        let mut state = self.write();
        state.token = None;
        state.user = None;
        state.last_event = Some(event);
    }
}
