//! Session management on top of [`Cache`].

use crate::{cache_key, Cache, CacheError};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

/// Maximum retry attempts for optimistic concurrency control.
const MAX_UPDATE_RETRIES: u32 = 3;

/// Key prefix for session entries.
const SESSION_PREFIX: &str = "session";

/// A unique session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Create a new session ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new cryptographically secure session ID.
    pub fn generate() -> Self {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
        use rand::Rng;

        let bytes: [u8; 18] = rand::thread_rng().gen();
        Self(format!("sess_{}", URL_SAFE_NO_PAD.encode(bytes)))
    }

    /// Accept a client-supplied ID if it is 1 to 128 characters of
    /// `[A-Za-z0-9_-]`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let valid = !raw.is_empty()
            && raw.len() <= 128
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        valid.then(|| Self(raw.to_string()))
    }

    /// Get the session ID as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Session data stored in the cache.
///
/// Generic over the user data type `T`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData<T> {
    /// The session ID.
    pub id: SessionId,
    /// User-defined session data.
    pub data: T,
    /// Version for optimistic concurrency control.
    pub version: u64,
    /// When the session was created (Unix timestamp).
    pub created_at: u64,
    /// When the session was last written (Unix timestamp).
    pub last_accessed: u64,
}

/// Session manager for per-client state.
///
/// Sessions idle for longer than the configured timeout read as absent and
/// are removed by [`Session::purge_expired`].
///
/// # Example
///
/// ```rust,ignore
/// use karat_cache::{Session, SessionId};
///
/// let carts = Session::<Cart>::new()
///     .with_idle_timeout(Duration::from_secs(3600))
///     .with_init(|id| Cart::new(id.as_str()));
///
/// let id = SessionId::generate();
/// let line = carts.update(&id, |cart| cart.add(&ring, 1).map(|l| l.clone()))?;
/// ```
pub struct Session<T> {
    cache: Cache,
    idle_timeout: Option<Duration>,
    init: fn(&SessionId) -> T,
}

impl<T> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("idle_timeout", &self.idle_timeout)
            .finish_non_exhaustive()
    }
}

impl<T> Clone for Session<T> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            idle_timeout: self.idle_timeout,
            init: self.init,
        }
    }
}

impl<T> Default for Session<T>
where
    T: Serialize + DeserializeOwned + Default + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Session<T>
where
    T: Serialize + DeserializeOwned + Default + Clone,
{
    /// Create a session manager over a fresh cache.
    pub fn new() -> Self {
        Self::with_cache(Cache::new())
    }

    /// Create a session manager over a shared cache.
    pub fn with_cache(cache: Cache) -> Self {
        Self {
            cache,
            idle_timeout: None,
            init: default_init::<T>,
        }
    }

    /// Expire sessions left untouched for longer than `timeout`.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// How new sessions are initialized. Defaults to `T::default()`.
    pub fn with_init(mut self, init: fn(&SessionId) -> T) -> Self {
        self.init = init;
        self
    }

    /// Get session data, or create a new session if it doesn't exist.
    pub fn get_or_create(&self, id: &SessionId) -> Result<T, CacheError> {
        match self.get(id)? {
            Some(data) => Ok(data),
            None => {
                let data = (self.init)(id);
                self.set(id, &data)?;
                Ok(data)
            }
        }
    }

    /// Get session data if it exists and has not expired.
    pub fn get(&self, id: &SessionId) -> Result<Option<T>, CacheError> {
        Ok(self.get_versioned(id)?.map(|s| s.data))
    }

    /// Get full session data including version.
    pub fn get_versioned(&self, id: &SessionId) -> Result<Option<SessionData<T>>, CacheError> {
        let key = self.session_key(id);
        if self.is_expired(&key)? {
            self.cache.delete(&key)?;
            tracing::debug!(session = %id, "session expired");
            return Ok(None);
        }
        self.cache.get::<SessionData<T>>(&key)
    }

    /// Set session data (unconditional write).
    pub fn set(&self, id: &SessionId, data: &T) -> Result<(), CacheError> {
        let key = self.session_key(id);
        let (version, created_at) = self
            .cache
            .get_versioned::<SessionData<T>>(&key)?
            .map_or_else(|| (1, now()), |(s, v)| (v + 1, s.created_at));
        self.cache
            .set(&key, &self.envelope(id, data, version, created_at))?;
        Ok(())
    }

    /// Delete a session.
    pub fn delete(&self, id: &SessionId) -> Result<(), CacheError> {
        self.cache.delete(&self.session_key(id))
    }

    /// Check if a live session exists.
    pub fn exists(&self, id: &SessionId) -> Result<bool, CacheError> {
        Ok(self.get_versioned(id)?.is_some())
    }

    /// Update session data with a closure, using optimistic concurrency control.
    ///
    /// The closure runs against the current data (or a freshly initialized
    /// session) and may fail, in which case nothing is written and its error
    /// is returned. If another writer changed the session in between, the
    /// closure is re-run on the newer data, up to `MAX_UPDATE_RETRIES` times.
    ///
    /// # Returns
    /// - `Ok(R)` - The closure's result after a successful write
    /// - `Err(E)` - The closure's error, or `CacheError::ConcurrentModification`
    ///   if all retries failed
    pub fn update<F, R, E>(&self, id: &SessionId, mut f: F) -> Result<R, E>
    where
        F: FnMut(&mut T) -> Result<R, E>,
        E: From<CacheError>,
    {
        let key = self.session_key(id);

        for _attempt in 0..MAX_UPDATE_RETRIES {
            let current = self.get_versioned(id)?;
            let (mut data, expected, created_at) = match current {
                Some(s) => (s.data, s.version, s.created_at),
                None => ((self.init)(id), 0, now()),
            };

            let result = f(&mut data)?;

            let envelope = self.envelope(id, &data, expected + 1, created_at);
            if self.cache.compare_and_set(&key, expected, &envelope)?.is_some() {
                return Ok(result);
            }
            tracing::debug!(session = %id, "session changed concurrently, retrying");
        }

        Err(CacheError::ConcurrentModification("max retries exceeded".to_string()).into())
    }

    /// Remove every expired session. Returns how many were removed.
    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        match self.idle_timeout {
            Some(timeout) => self.cache.purge_idle(&format!("{SESSION_PREFIX}:"), timeout),
            None => Ok(0),
        }
    }

    fn is_expired(&self, key: &str) -> Result<bool, CacheError> {
        let Some(timeout) = self.idle_timeout else {
            return Ok(false);
        };
        Ok(self.cache.idle_for(key)?.is_some_and(|idle| idle > timeout))
    }

    fn envelope(&self, id: &SessionId, data: &T, version: u64, created_at: u64) -> SessionData<T> {
        SessionData {
            id: id.clone(),
            data: data.clone(),
            version,
            created_at,
            last_accessed: now(),
        }
    }

    fn session_key(&self, id: &SessionId) -> String {
        cache_key!(SESSION_PREFIX, id)
    }
}

fn default_init<T: Default>(_: &SessionId) -> T {
    T::default()
}

fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
