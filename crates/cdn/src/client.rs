//! CDN API abstraction for testability.
//!
//! The [`CdnClient`] trait covers the public key operations the harness and the
//! provider need. [`InMemoryCdnClient`] is an in-process control plane that
//! behaves like the real API where the lifecycle scenarios can observe it:
//! generated identifiers, ETag based optimistic concurrency, name uniqueness
//! and an account quota.
//!
//! # Architecture
//!
//! ```text
//!   PublicKeyResource      PublicKeyProvider
//!   (find / delete)        (create / read / update / delete)
//!          │                      │
//!          └──────────┬───────────┘
//!                     ▼
//!              ┌────────────┐
//!              │ CdnClient  │ (trait)
//!              └────────────┘
//!                     │
//!                     ▼
//!            InMemoryCdnClient
//! ```
//!
//! # Public Key ID Validation
//!
//! Methods that accept a public key ID reject IDs that are empty, longer than
//! 64 characters, or contain anything other than ASCII uppercase letters and digits.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use driftwatch_core::config::CdnConfig;
use driftwatch_core::remote::CallContext;

use crate::error::CdnError;

/// PEM header every encoded key must start with.
pub const PEM_HEADER: &str = "-----BEGIN PUBLIC KEY-----";

/// Maximum length of a public key name.
pub const MAX_NAME_LENGTH: usize = 128;

/// Validates a public key ID.
fn validate_public_key_id(id: &str) -> Result<(), CdnError> {
    if id.is_empty() || id.len() > 64 {
        return Err(CdnError::InvalidArgument(format!(
            "public key id must be 1-64 characters, got {}",
            id.len()
        )));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Err(CdnError::InvalidArgument(format!(
            "public key id contains invalid characters: {id}"
        )));
    }
    Ok(())
}

/// Fields the caller controls on a public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyConfig {
    /// Unique value that prevents accidental duplicate creation.
    pub caller_reference: String,
    /// Account-unique name.
    pub name: String,
    /// PEM-encoded public key.
    pub encoded_key: String,
    /// Optional free-form comment.
    pub comment: Option<String>,
}

/// A public key as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyRecord {
    /// Identifier assigned at creation.
    pub id: String,
    /// Current entity tag, changes on every update.
    pub etag: String,
    /// Key configuration.
    pub config: PublicKeyConfig,
}

/// CDN public key API.
///
/// Every call receives the caller's [`CallContext`] so in-flight requests can be
/// abandoned when the surrounding run is cancelled.
pub trait CdnClient: Send + Sync + 'static {
    /// Creates a public key.
    fn create_public_key(
        &self,
        ctx: &CallContext,
        config: PublicKeyConfig,
    ) -> impl Future<Output = Result<PublicKeyRecord, CdnError>> + Send;

    /// Fetches a public key by ID.
    fn get_public_key(
        &self,
        ctx: &CallContext,
        id: &str,
    ) -> impl Future<Output = Result<PublicKeyRecord, CdnError>> + Send;

    /// Replaces the configuration of a public key. `if_match` must be the current ETag.
    fn update_public_key(
        &self,
        ctx: &CallContext,
        id: &str,
        if_match: &str,
        config: PublicKeyConfig,
    ) -> impl Future<Output = Result<PublicKeyRecord, CdnError>> + Send;

    /// Deletes a public key. `if_match` must be the current ETag.
    fn delete_public_key(
        &self,
        ctx: &CallContext,
        id: &str,
        if_match: &str,
    ) -> impl Future<Output = Result<(), CdnError>> + Send;

    /// Checks that the API is reachable.
    fn ping(&self, ctx: &CallContext) -> impl Future<Output = Result<(), CdnError>> + Send;
}

/// In-process CDN control plane.
pub struct InMemoryCdnClient {
    keys: Mutex<HashMap<String, PublicKeyRecord>>,
    max_public_keys: usize,
    max_comment_length: usize,
    unavailable: AtomicBool,
}

impl InMemoryCdnClient {
    /// Creates a control plane with the given quota and comment limit.
    pub fn new(max_public_keys: usize, max_comment_length: usize) -> Self {
        Self {
            keys: Mutex::new(HashMap::new()),
            max_public_keys,
            max_comment_length,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Creates a control plane from the `[cdn]` configuration section.
    pub fn from_config(config: &CdnConfig) -> Self {
        Self::new(config.max_public_keys, config.max_comment_length)
    }

    /// Simulates an outage: every call fails with `ServiceUnavailable` while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of stored public keys.
    pub async fn len(&self) -> usize {
        self.keys.lock().await.len()
    }

    /// Returns `true` if no public keys are stored.
    pub async fn is_empty(&self) -> bool {
        self.keys.lock().await.is_empty()
    }

    /// IDs of all stored public keys, sorted.
    pub async fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.keys.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn precheck(&self, ctx: &CallContext) -> Result<(), CdnError> {
        if ctx.is_cancelled() {
            return Err(CdnError::Cancelled);
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CdnError::Unavailable(
                "the service is temporarily unavailable".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_config(&self, config: &PublicKeyConfig) -> Result<(), CdnError> {
        if config.caller_reference.is_empty() {
            return Err(CdnError::InvalidArgument(
                "caller reference must not be empty".to_owned(),
            ));
        }
        if config.name.is_empty() || config.name.len() > MAX_NAME_LENGTH {
            return Err(CdnError::InvalidArgument(format!(
                "name must be 1-{MAX_NAME_LENGTH} characters"
            )));
        }
        if !config
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(CdnError::InvalidArgument(format!(
                "name contains invalid characters: {}",
                config.name
            )));
        }
        if !config.encoded_key.trim_start().starts_with(PEM_HEADER) {
            return Err(CdnError::InvalidArgument(
                "encoded key must be a PEM-encoded public key".to_owned(),
            ));
        }
        if let Some(comment) = &config.comment {
            if comment.chars().count() > self.max_comment_length {
                return Err(CdnError::InvalidArgument(format!(
                    "comment exceeds {} characters",
                    self.max_comment_length
                )));
            }
        }
        Ok(())
    }
}

/// Generates an uppercase identifier with the given leading letter.
fn generate_id(lead: char) -> String {
    let simple = uuid::Uuid::new_v4().simple().to_string().to_ascii_uppercase();
    let mut id = String::with_capacity(14);
    id.push(lead);
    id.extend(simple.chars().take(13));
    id
}

impl CdnClient for InMemoryCdnClient {
    async fn create_public_key(
        &self,
        ctx: &CallContext,
        config: PublicKeyConfig,
    ) -> Result<PublicKeyRecord, CdnError> {
        self.precheck(ctx)?;
        self.validate_config(&config)?;

        let mut keys = self.keys.lock().await;
        if keys.values().any(|k| k.config.name == config.name) {
            return Err(CdnError::PublicKeyAlreadyExists { name: config.name });
        }
        if keys.len() >= self.max_public_keys {
            return Err(CdnError::TooManyPublicKeys {
                limit: self.max_public_keys,
            });
        }

        let record = PublicKeyRecord {
            id: generate_id('K'),
            etag: generate_id('E'),
            config,
        };
        debug!(id = %record.id, name = %record.config.name, "public key created");
        keys.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get_public_key(
        &self,
        ctx: &CallContext,
        id: &str,
    ) -> Result<PublicKeyRecord, CdnError> {
        self.precheck(ctx)?;
        validate_public_key_id(id)?;

        self.keys
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| CdnError::NoSuchPublicKey { id: id.to_owned() })
    }

    async fn update_public_key(
        &self,
        ctx: &CallContext,
        id: &str,
        if_match: &str,
        config: PublicKeyConfig,
    ) -> Result<PublicKeyRecord, CdnError> {
        self.precheck(ctx)?;
        validate_public_key_id(id)?;
        self.validate_config(&config)?;

        let mut keys = self.keys.lock().await;
        if keys
            .values()
            .any(|k| k.id != id && k.config.name == config.name)
        {
            return Err(CdnError::PublicKeyAlreadyExists { name: config.name });
        }

        let record = keys
            .get_mut(id)
            .ok_or_else(|| CdnError::NoSuchPublicKey { id: id.to_owned() })?;
        if record.etag != if_match {
            return Err(CdnError::PreconditionFailed {
                id: id.to_owned(),
                if_match: if_match.to_owned(),
            });
        }
        if record.config.caller_reference != config.caller_reference {
            return Err(CdnError::InvalidArgument(
                "caller reference cannot be changed".to_owned(),
            ));
        }

        record.config = config;
        record.etag = generate_id('E');
        debug!(id = %record.id, etag = %record.etag, "public key updated");
        Ok(record.clone())
    }

    async fn delete_public_key(
        &self,
        ctx: &CallContext,
        id: &str,
        if_match: &str,
    ) -> Result<(), CdnError> {
        self.precheck(ctx)?;
        validate_public_key_id(id)?;

        let mut keys = self.keys.lock().await;
        let record = keys
            .get(id)
            .ok_or_else(|| CdnError::NoSuchPublicKey { id: id.to_owned() })?;
        if record.etag != if_match {
            return Err(CdnError::PreconditionFailed {
                id: id.to_owned(),
                if_match: if_match.to_owned(),
            });
        }

        keys.remove(id);
        debug!(id = id, "public key deleted");
        Ok(())
    }

    async fn ping(&self, ctx: &CallContext) -> Result<(), CdnError> {
        self.precheck(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PEM: &str = "-----BEGIN PUBLIC KEY-----\nMIIB\n-----END PUBLIC KEY-----\n";

    fn key_config(name: &str) -> PublicKeyConfig {
        PublicKeyConfig {
            caller_reference: format!("ref-{name}"),
            name: name.to_owned(),
            encoded_key: PEM.to_owned(),
            comment: None,
        }
    }

    #[test]
    fn id_validation() {
        assert!(validate_public_key_id("K2JCJMDEHXQW5F").is_ok());
        assert!(validate_public_key_id("").is_err());
        assert!(validate_public_key_id("k2jcjmdehxqw5f").is_err());
        assert!(validate_public_key_id("K1; DROP").is_err());
        assert!(validate_public_key_id(&"K".repeat(65)).is_err());
    }

    #[test]
    fn generated_ids_are_valid() {
        let id = generate_id('K');
        assert_eq!(id.len(), 14);
        assert!(id.starts_with('K'));
        assert!(validate_public_key_id(&id).is_ok());
    }

    #[tokio::test]
    async fn create_get_delete_round() {
        let client = InMemoryCdnClient::new(10, 128);
        let ctx = CallContext::new();

        let created = client
            .create_public_key(&ctx, key_config("alpha"))
            .await
            .unwrap();
        let fetched = client.get_public_key(&ctx, &created.id).await.unwrap();
        assert_eq!(fetched, created);

        client
            .delete_public_key(&ctx, &created.id, &created.etag)
            .await
            .unwrap();
        let err = client.get_public_key(&ctx, &created.id).await.unwrap_err();
        assert!(matches!(err, CdnError::NoSuchPublicKey { .. }));
        assert!(client.is_empty().await);
    }

    #[tokio::test]
    async fn update_changes_etag_and_keeps_id() {
        let client = InMemoryCdnClient::new(10, 128);
        let ctx = CallContext::new();
        let created = client
            .create_public_key(&ctx, key_config("alpha"))
            .await
            .unwrap();

        let mut config = created.config.clone();
        config.comment = Some("comment 2".to_owned());
        let updated = client
            .update_public_key(&ctx, &created.id, &created.etag, config)
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_ne!(updated.etag, created.etag);
        assert_eq!(updated.config.comment.as_deref(), Some("comment 2"));
    }

    #[tokio::test]
    async fn stale_etag_is_rejected() {
        let client = InMemoryCdnClient::new(10, 128);
        let ctx = CallContext::new();
        let created = client
            .create_public_key(&ctx, key_config("alpha"))
            .await
            .unwrap();
        client
            .update_public_key(&ctx, &created.id, &created.etag, created.config.clone())
            .await
            .unwrap();

        let err = client
            .delete_public_key(&ctx, &created.id, &created.etag)
            .await
            .unwrap_err();
        assert!(matches!(err, CdnError::PreconditionFailed { .. }));
        assert_eq!(client.len().await, 1);
    }

    #[tokio::test]
    async fn duplicate_name_and_quota() {
        let client = InMemoryCdnClient::new(2, 128);
        let ctx = CallContext::new();
        client.create_public_key(&ctx, key_config("a")).await.unwrap();

        let err = client
            .create_public_key(&ctx, key_config("a"))
            .await
            .unwrap_err();
        assert!(matches!(err, CdnError::PublicKeyAlreadyExists { .. }));

        client.create_public_key(&ctx, key_config("b")).await.unwrap();
        let err = client
            .create_public_key(&ctx, key_config("c"))
            .await
            .unwrap_err();
        assert_eq!(err, CdnError::TooManyPublicKeys { limit: 2 });
    }

    #[tokio::test]
    async fn invalid_arguments_are_rejected() {
        let client = InMemoryCdnClient::new(10, 5);
        let ctx = CallContext::new();

        let mut bad_key = key_config("a");
        bad_key.encoded_key = "not a pem".to_owned();
        assert!(matches!(
            client.create_public_key(&ctx, bad_key).await,
            Err(CdnError::InvalidArgument(_))
        ));

        let mut long_comment = key_config("b");
        long_comment.comment = Some("too long".to_owned());
        assert!(matches!(
            client.create_public_key(&ctx, long_comment).await,
            Err(CdnError::InvalidArgument(_))
        ));

        assert!(matches!(
            client.create_public_key(&ctx, key_config("bad name")).await,
            Err(CdnError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn outage_and_cancellation() {
        let client = InMemoryCdnClient::new(10, 128);
        let ctx = CallContext::new();
        client.ping(&ctx).await.unwrap();

        client.set_unavailable(true);
        assert!(matches!(
            client.ping(&ctx).await,
            Err(CdnError::Unavailable(_))
        ));
        client.set_unavailable(false);

        ctx.cancel();
        assert_eq!(client.ping(&ctx).await, Err(CdnError::Cancelled));
    }
}
