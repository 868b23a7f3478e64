//! Repository for LLM provider configuration
//!
//! API keys never land in the database as plaintext: `save` runs them
//! through the secret store and persists only the returned token. Listing
//! resolves tokens back to plaintext; a failed decrypt degrades to an empty
//! key with a logged error so one broken secret cannot break the settings
//! screen.

use crate::db::DbError;
use crate::secrets::SecretStore;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub struct LlmProviderRepository<'conn, 'store> {
    conn: &'conn Connection,
    secrets: &'store SecretStore,
}

impl<'conn, 'store> LlmProviderRepository<'conn, 'store> {
    pub fn new(conn: &'conn Connection, secrets: &'store SecretStore) -> Self {
        Self { conn, secrets }
    }

    /// Insert or update a provider, storing its API key via the secret store
    pub fn save(
        &self,
        name: &str,
        api_key: &str,
        default_model: &str,
        base_url: Option<&str>,
    ) -> Result<(), DbError> {
        let token = self
            .secrets
            .encrypt(&secret_identifier(name), api_key)
            .map_err(|e| DbError::Conflict(format!("Failed to store API key: {}", e)))?;

        self.conn.execute(
            "INSERT INTO llm_providers (name, api_key, default_model, base_url)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(name) DO UPDATE SET
                api_key = excluded.api_key,
                default_model = excluded.default_model,
                base_url = excluded.base_url",
            params![name, token, default_model, base_url],
        )?;
        Ok(())
    }

    /// All providers with their API keys resolved
    pub fn find_all(&self) -> Result<Vec<LlmProvider>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, api_key, default_model, is_enabled, usage_this_month, base_url
             FROM llm_providers ORDER BY name",
        )?;
        let providers = stmt
            .query_map([], row_to_provider)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(providers
            .into_iter()
            .map(|p| self.resolve_key(p))
            .collect())
    }

    pub fn find_by_name(&self, name: &str) -> Result<Option<LlmProvider>, DbError> {
        let provider = self
            .conn
            .query_row(
                "SELECT id, name, api_key, default_model, is_enabled, usage_this_month, base_url
                 FROM llm_providers WHERE name = ?1",
                [name],
                row_to_provider,
            )
            .optional()?;
        Ok(provider.map(|p| self.resolve_key(p)))
    }

    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<(), DbError> {
        self.conn.execute(
            "UPDATE llm_providers SET is_enabled = ?1 WHERE name = ?2",
            params![enabled as i64, name],
        )?;
        Ok(())
    }

    /// Add to the provider's monthly usage counter
    pub fn add_usage(&self, name: &str, tokens: i64) -> Result<(), DbError> {
        self.conn.execute(
            "UPDATE llm_providers
             SET usage_this_month = usage_this_month + ?1 WHERE name = ?2",
            params![tokens, name],
        )?;
        Ok(())
    }

    /// Remove a provider and its stored secret
    pub fn delete(&self, name: &str) -> Result<bool, DbError> {
        let affected = self
            .conn
            .execute("DELETE FROM llm_providers WHERE name = ?1", [name])?;
        if affected > 0 {
            if let Err(e) = self.secrets.delete(&secret_identifier(name)) {
                tracing::warn!(provider = name, "failed to remove stored secret: {}", e);
            }
        }
        Ok(affected > 0)
    }

    /// A decrypt failure must never crash a listing; degrade to empty
    fn resolve_key(&self, mut provider: LlmProvider) -> LlmProvider {
        match self.secrets.decrypt(&secret_identifier(&provider.name), &provider.api_key) {
            Ok(plaintext) => provider.api_key = plaintext,
            Err(e) => {
                tracing::error!(
                    provider = %provider.name,
                    "failed to decrypt API key, returning empty value: {}",
                    e
                );
                provider.api_key = String::new();
            }
        }
        provider
    }
}

fn secret_identifier(provider_name: &str) -> String {
    format!("llm-provider-{}", provider_name)
}

fn row_to_provider(row: &Row<'_>) -> rusqlite::Result<LlmProvider> {
    Ok(LlmProvider {
        id: row.get(0)?,
        name: row.get(1)?,
        api_key: row.get(2)?,
        default_model: row.get(3)?,
        is_enabled: row.get::<_, i64>(4)? != 0,
        usage_this_month: row.get(5)?,
        base_url: row.get(6)?,
    })
}

/// Provider row with the API key resolved to plaintext (or empty on failure)
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LlmProvider {
    pub id: i64,
    pub name: String,
    pub api_key: String,
    pub default_model: String,
    pub is_enabled: bool,
    pub usage_this_month: i64,
    pub base_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repos::test_support::migrated_connection;

    #[test]
    fn test_save_and_resolve_round_trip() {
        let conn = migrated_connection();
        let secrets = SecretStore::fallback_only();
        let repo = LlmProviderRepository::new(&conn, &secrets);

        repo.save("openai", "sk-test-123", "gpt-4o", None).unwrap();

        let provider = repo.find_by_name("openai").unwrap().unwrap();
        assert_eq!(provider.api_key, "sk-test-123");
        assert!(provider.is_enabled);

        // The database itself must only hold the token
        let stored: String = conn
            .query_row(
                "SELECT api_key FROM llm_providers WHERE name = 'openai'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(stored.starts_with("b64:"));
    }

    #[test]
    fn test_save_twice_upserts() {
        let conn = migrated_connection();
        let secrets = SecretStore::fallback_only();
        let repo = LlmProviderRepository::new(&conn, &secrets);

        repo.save("openai", "sk-old", "gpt-4o", None).unwrap();
        repo.save("openai", "sk-new", "gpt-4o-mini", Some("https://proxy.local"))
            .unwrap();

        let all = repo.find_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].api_key, "sk-new");
        assert_eq!(all[0].default_model, "gpt-4o-mini");
        assert_eq!(all[0].base_url.as_deref(), Some("https://proxy.local"));
    }

    #[test]
    fn test_broken_secret_degrades_to_empty() {
        let conn = migrated_connection();
        let secrets = SecretStore::fallback_only();
        let repo = LlmProviderRepository::new(&conn, &secrets);

        repo.save("openai", "sk-good", "gpt-4o", None).unwrap();
        // Corrupt the stored token behind the repository's back
        conn.execute(
            "UPDATE llm_providers SET api_key = 'b64:%%%corrupt%%%' WHERE name = 'openai'",
            [],
        )
        .unwrap();

        let all = repo.find_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].api_key, "");
    }

    #[test]
    fn test_unknown_provider_name_rejected_by_schema() {
        let conn = migrated_connection();
        let secrets = SecretStore::fallback_only();
        let repo = LlmProviderRepository::new(&conn, &secrets);

        assert!(repo.save("skynet", "key", "model", None).is_err());
    }

    #[test]
    fn test_enable_disable_and_usage() {
        let conn = migrated_connection();
        let secrets = SecretStore::fallback_only();
        let repo = LlmProviderRepository::new(&conn, &secrets);

        repo.save("anthropic", "sk-ant", "claude-sonnet-4-5", None)
            .unwrap();
        repo.set_enabled("anthropic", false).unwrap();
        repo.add_usage("anthropic", 1500).unwrap();

        let provider = repo.find_by_name("anthropic").unwrap().unwrap();
        assert!(!provider.is_enabled);
        assert_eq!(provider.usage_this_month, 1500);
    }
}
