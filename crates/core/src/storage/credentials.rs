use crate::config::Settings;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

const PG_ENV_KEY: &str = "default";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self) -> anyhow::Result<Option<Credentials>>;

    async fn save(&self, credentials: &Credentials) -> anyhow::Result<()>;

    async fn clear(&self) -> anyhow::Result<()>;
}

pub async fn store_from_settings(
    settings: &Settings,
) -> anyhow::Result<Arc<dyn CredentialStore>> {
    let Some(db_url) = settings.database_url.as_deref() else {
        tracing::info!(path = %settings.credentials_path, "using file credential store");
        return Ok(Arc::new(FileCredentialStore::new(&settings.credentials_path)));
    };

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(db_url)
        .await
        .context("connect DATABASE_URL failed")?;
    crate::storage::migrate(&pool).await?;

    tracing::info!("using postgres credential store");
    Ok(Arc::new(PgCredentialStore::new(pool)))
}

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    inner: tokio::sync::Mutex<Option<Credentials>>,
}

impl MemoryCredentialStore {
    pub fn new(initial: Option<Credentials>) -> Self {
        Self {
            inner: tokio::sync::Mutex::new(initial),
        }
    }
}

#[async_trait::async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> anyhow::Result<Option<Credentials>> {
        Ok(self.inner.lock().await.clone())
    }

    async fn save(&self, credentials: &Credentials) -> anyhow::Result<()> {
        *self.inner.lock().await = Some(credentials.clone());
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        *self.inner.lock().await = None;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> anyhow::Result<Option<Credentials>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("read credentials from {}", self.path.display()))
            }
        };

        let creds = serde_json::from_str::<Credentials>(&text)
            .with_context(|| format!("parse credentials file {}", self.path.display()))?;
        Ok(Some(creds))
    }

    async fn save(&self, credentials: &Credentials) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create {}", parent.display()))?;
        }

        // Replace the file atomically.
        let tmp = self.path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(credentials)?;
        tokio::fs::write(&tmp, body)
            .await
            .with_context(|| format!("write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("rename {} into place", tmp.display()))?;
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("remove {}", self.path.display())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: sqlx::PgPool,
    env: String,
}

impl PgCredentialStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self {
            pool,
            env: PG_ENV_KEY.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl CredentialStore for PgCredentialStore {
    async fn load(&self) -> anyhow::Result<Option<Credentials>> {
        let row = sqlx::query_as::<_, (String, String)>(
            "SELECT access_token, refresh_token \
             FROM oauth_credentials \
             WHERE env = $1",
        )
        .persistent(false)
        .bind(&self.env)
        .fetch_optional(&self.pool)
        .await
        .context("select oauth_credentials failed")?;

        Ok(row.map(|(access_token, refresh_token)| Credentials {
            access_token,
            refresh_token,
        }))
    }

    async fn save(&self, credentials: &Credentials) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO oauth_credentials (env, access_token, refresh_token, updated_at) \
             VALUES ($1, $2, $3, now()) \
             ON CONFLICT (env) DO UPDATE SET \
               access_token = EXCLUDED.access_token, \
               refresh_token = EXCLUDED.refresh_token, \
               updated_at = now()",
        )
        .persistent(false)
        .bind(&self.env)
        .bind(&credentials.access_token)
        .bind(&credentials.refresh_token)
        .execute(&self.pool)
        .await
        .context("upsert oauth_credentials failed")?;
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM oauth_credentials WHERE env = $1")
            .persistent(false)
            .bind(&self.env)
            .execute(&self.pool)
            .await
            .context("delete oauth_credentials failed")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(access: &str) -> Credentials {
        Credentials {
            access_token: access.to_string(),
            refresh_token: format!("{access}-refresh"),
        }
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryCredentialStore::default();
        assert!(store.load().await.unwrap().is_none());

        store.save(&creds("a1")).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(creds("a1")));

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_store_survives_reopen() {
        let dir = std::env::temp_dir().join(format!("fitscore-creds-{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join("credentials.json");

        let store = FileCredentialStore::new(&path);
        assert!(store.load().await.unwrap().is_none());
        store.save(&creds("a1")).await.unwrap();
        store.save(&creds("a2")).await.unwrap();

        let reopened = FileCredentialStore::new(&path);
        assert_eq!(reopened.load().await.unwrap(), Some(creds("a2")));

        reopened.clear().await.unwrap();
        reopened.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error_not_empty() {
        let path =
            std::env::temp_dir().join(format!("fitscore-bad-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, "{not json").unwrap();

        let store = FileCredentialStore::new(&path);
        assert!(store.load().await.is_err());

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn debug_output_hides_tokens() {
        let rendered = format!("{:?}", creds("secret-token"));
        assert!(!rendered.contains("secret-token"));
    }
}
