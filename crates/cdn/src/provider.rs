//! CDN public key provider: 참조 엔진이 구동하는 CRUD 구현
//!
//! # 속성
//!
//! | 속성 | 규칙 |
//! |------|------|
//! | `encoded_key` | 필수, 변경 시 교체 |
//! | `name` | 선택 + 계산, 변경 시 교체 |
//! | `name_prefix` | 선택, 변경 시 교체, write-only (원격에서 읽을 수 없음) |
//! | `comment` | 선택, 제자리 갱신 |
//! | `caller_reference`, `etag` | 계산 |
//!
//! 이름은 `name` → `name_prefix` + 고유 접미사 → `terraform-` + 고유 접미사
//! 순서로 결정됩니다.

use std::sync::Arc;

use driftwatch_core::error::LookupError;
use driftwatch_core::remote::CallContext;
use driftwatch_core::types::AttributeBag;
use driftwatch_harness::engine::{AttributeSchema, ResourceProvider, ResourceSchema};
use driftwatch_harness::naming::prefixed_unique_id;

use crate::client::{CdnClient, PublicKeyConfig, PublicKeyRecord};
use crate::public_key::RESOURCE_TYPE;

/// 속성 키
pub mod attr {
    /// caller reference (계산)
    pub const CALLER_REFERENCE: &str = "caller_reference";
    /// 설명
    pub const COMMENT: &str = "comment";
    /// PEM 공개 키
    pub const ENCODED_KEY: &str = "encoded_key";
    /// ETag (계산)
    pub const ETAG: &str = "etag";
    /// 이름
    pub const NAME: &str = "name";
    /// 이름 접두어 (write-only)
    pub const NAME_PREFIX: &str = "name_prefix";
}

/// 이름이 지정되지 않았을 때 사용하는 접두어
pub const DEFAULT_NAME_PREFIX: &str = "terraform-";

/// public key provider
pub struct PublicKeyProvider<C> {
    client: Arc<C>,
    schema: ResourceSchema,
}

impl<C: CdnClient> PublicKeyProvider<C> {
    /// 클라이언트로 provider를 생성합니다.
    pub fn new(client: Arc<C>) -> Self {
        let schema = ResourceSchema::new(vec![
            AttributeSchema::computed(attr::CALLER_REFERENCE),
            AttributeSchema::optional(attr::COMMENT),
            AttributeSchema::required(attr::ENCODED_KEY).force_new(),
            AttributeSchema::computed(attr::ETAG),
            AttributeSchema::optional_computed(attr::NAME).force_new(),
            AttributeSchema::optional(attr::NAME_PREFIX)
                .force_new()
                .write_only(),
        ]);
        Self { client, schema }
    }

    /// 구동 중인 클라이언트
    pub fn client(&self) -> &Arc<C> {
        &self.client
    }
}

/// 선언에서 이름을 결정합니다.
fn resolve_name(desired: &AttributeBag) -> String {
    match (
        non_empty(desired, attr::NAME),
        non_empty(desired, attr::NAME_PREFIX),
    ) {
        (Some(name), _) => name.to_owned(),
        (None, Some(prefix)) => prefixed_unique_id(prefix),
        (None, None) => prefixed_unique_id(DEFAULT_NAME_PREFIX),
    }
}

fn non_empty<'a>(bag: &'a AttributeBag, key: &str) -> Option<&'a str> {
    bag.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

fn comment_of(desired: &AttributeBag) -> Option<String> {
    non_empty(desired, attr::COMMENT).map(str::to_owned)
}

/// 원격 레코드를 속성 모음으로 변환합니다.
fn observe(record: &PublicKeyRecord) -> AttributeBag {
    let mut bag = AttributeBag::new();
    bag.insert(
        attr::CALLER_REFERENCE.to_owned(),
        record.config.caller_reference.clone(),
    );
    bag.insert(
        attr::COMMENT.to_owned(),
        record.config.comment.clone().unwrap_or_default(),
    );
    bag.insert(
        attr::ENCODED_KEY.to_owned(),
        record.config.encoded_key.clone(),
    );
    bag.insert(attr::ETAG.to_owned(), record.etag.clone());
    bag.insert(attr::NAME.to_owned(), record.config.name.clone());
    bag
}

fn required<'a>(bag: &'a AttributeBag, key: &str) -> Result<&'a str, LookupError> {
    bag.get(key)
        .map(String::as_str)
        .ok_or_else(|| LookupError::Remote(format!("prior state is missing '{key}'")))
}

impl<C: CdnClient> ResourceProvider for PublicKeyProvider<C> {
    fn resource_type(&self) -> &str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    fn validate(&self, desired: &AttributeBag) -> Result<(), String> {
        if non_empty(desired, attr::NAME).is_some() && non_empty(desired, attr::NAME_PREFIX).is_some() {
            return Err(format!(
                "\"{}\" conflicts with \"{}\"",
                attr::NAME,
                attr::NAME_PREFIX
            ));
        }
        Ok(())
    }

    async fn create(
        &self,
        ctx: &CallContext,
        desired: &AttributeBag,
    ) -> Result<(String, AttributeBag), LookupError> {
        let config = PublicKeyConfig {
            caller_reference: prefixed_unique_id(DEFAULT_NAME_PREFIX),
            name: resolve_name(desired),
            encoded_key: desired
                .get(attr::ENCODED_KEY)
                .cloned()
                .unwrap_or_default(),
            comment: comment_of(desired),
        };

        let record = self.client.create_public_key(ctx, config).await?;
        Ok((record.id.clone(), observe(&record)))
    }

    async fn read(&self, ctx: &CallContext, id: &str) -> Result<AttributeBag, LookupError> {
        let record = self.client.get_public_key(ctx, id).await?;
        Ok(observe(&record))
    }

    async fn update(
        &self,
        ctx: &CallContext,
        id: &str,
        prior: &AttributeBag,
        desired: &AttributeBag,
    ) -> Result<AttributeBag, LookupError> {
        let config = PublicKeyConfig {
            caller_reference: required(prior, attr::CALLER_REFERENCE)?.to_owned(),
            name: required(prior, attr::NAME)?.to_owned(),
            encoded_key: required(prior, attr::ENCODED_KEY)?.to_owned(),
            comment: comment_of(desired),
        };
        let etag = required(prior, attr::ETAG)?;

        let record = self
            .client
            .update_public_key(ctx, id, etag, config)
            .await?;
        Ok(observe(&record))
    }

    async fn delete(
        &self,
        ctx: &CallContext,
        id: &str,
        prior: &AttributeBag,
    ) -> Result<(), LookupError> {
        let etag = required(prior, attr::ETAG)?;
        self.client
            .delete_public_key(ctx, id, etag)
            .await
            .map_err(LookupError::from)
    }
}
