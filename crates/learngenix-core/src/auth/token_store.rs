use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Keychain service name
const SERVICE_NAME: &str = "learngenix";

/// Token file name in cache directory
const TOKEN_FILE: &str = "token.json";

/// Durable home of the session credential.
///
/// The token is opaque: stores never inspect or validate it, and there is no
/// client-side expiry. Implementations must be safe to share between the API
/// client (which reads) and the session manager (which writes).
pub trait TokenStore: Send + Sync {
    /// Store the token, replacing any previous one.
    fn set(&self, token: &str) -> Result<()>;

    /// The stored token, or `None` if never set or cleared.
    fn get(&self) -> Result<Option<String>>;

    /// Remove the stored token. Clearing an empty store is a no-op.
    fn clear(&self) -> Result<()>;

    fn has_token(&self) -> bool {
        matches!(self.get(), Ok(Some(_)))
    }
}

/// Token kept in the OS keychain.
pub struct KeyringTokenStore {
    account: String,
}

impl KeyringTokenStore {
    /// `account` is the storage key, see `ApiConfig::storage_key`.
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &self.account).context("Failed to create keyring entry")
    }
}

impl TokenStore for KeyringTokenStore {
    fn set(&self, token: &str) -> Result<()> {
        self.entry()?
            .set_password(token)
            .context("Failed to store token in keychain")
    }

    fn get(&self) -> Result<Option<String>> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve token from keychain"),
        }
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredToken {
    token: String,
    stored_at: DateTime<Utc>,
}

/// Contents of the token file, one entry per origin
type TokenFile = BTreeMap<String, StoredToken>;

/// Token kept in `token.json` under the cache directory.
///
/// The file holds one entry per backend origin, so logging into one backend
/// never touches the credential of another.
pub struct FileTokenStore {
    path: PathBuf,
    origin: String,
}

impl FileTokenStore {
    pub fn new(cache_dir: &Path, origin: impl Into<String>) -> Self {
        Self {
            path: cache_dir.join(TOKEN_FILE),
            origin: origin.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<TokenFile> {
        if !self.path.exists() {
            return Ok(TokenFile::new());
        }
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read token file {}", self.path.display()))?;
        serde_json::from_str(&contents).context("Failed to parse token file")
    }

    fn write(&self, tokens: &TokenFile) -> Result<()> {
        if tokens.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path).with_context(|| {
                    format!("Failed to remove token file {}", self.path.display())
                })?;
            }
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(tokens)?;
        let mut file = open_private(&self.path)
            .with_context(|| format!("Failed to open token file {}", self.path.display()))?;
        file.write_all(contents.as_bytes())
            .with_context(|| format!("Failed to write token file {}", self.path.display()))
    }
}

/// Open `path` for writing, truncated. On unix a new file is created
/// readable by the owner only, and an existing one is narrowed to that.
fn open_private(path: &Path) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let file = options.open(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(file)
}

impl TokenStore for FileTokenStore {
    fn set(&self, token: &str) -> Result<()> {
        let mut tokens = match self.read() {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "Replacing unreadable token file");
                TokenFile::new()
            }
        };
        tokens.insert(
            self.origin.clone(),
            StoredToken {
                token: token.to_string(),
                stored_at: Utc::now(),
            },
        );
        self.write(&tokens)
    }

    fn get(&self) -> Result<Option<String>> {
        Ok(self.read()?.remove(&self.origin).map(|stored| stored.token))
    }

    fn clear(&self) -> Result<()> {
        let mut tokens = match self.read() {
            Ok(tokens) => tokens,
            Err(e) => {
                // Nobody can read it, so nobody loses anything.
                debug!(error = %e, path = %self.path.display(), "Removing unreadable token file");
                TokenFile::new()
            }
        };
        if tokens.remove(&self.origin).is_none() && !tokens.is_empty() {
            return Ok(());
        }
        self.write(&tokens)
    }
}

/// Token kept only for the life of the process.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.token.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TokenStore for MemoryTokenStore {
    fn set(&self, token: &str) -> Result<()> {
        *self.slot() = Some(token.to_string());
        Ok(())
    }

    fn get(&self) -> Result<Option<String>> {
        Ok(self.slot().clone())
    }

    fn clear(&self) -> Result<()> {
        *self.slot() = None;
        Ok(())
    }
}
