//! CDN public key 조회 어댑터와 능력 구현
//!
//! - [`find_public_key_by_id`]: 식별자로 조회하고 "없음"과 그 외 실패를 구분합니다.
//! - [`PublicKeyResource`]: 하네스의 `{find, delete}` 능력 인터페이스 구현

use std::sync::Arc;

use serde::Serialize;

use driftwatch_core::error::LookupError;
use driftwatch_core::remote::{CallContext, RemoteResource};

use crate::client::{CdnClient, PublicKeyRecord};

/// 오케스트레이터 상태에서 사용하는 리소스 유형 이름
pub const RESOURCE_TYPE: &str = "cdn_public_key";

/// 실패 메시지에 사용하는 이름
pub const DISPLAY_NAME: &str = "CDN Public Key";

/// 원격 public key 객체
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicKey {
    /// 원격 식별자
    pub id: String,
    /// 현재 ETag
    pub etag: String,
    /// 생성 시 지정된 caller reference
    pub caller_reference: String,
    /// 이름
    pub name: String,
    /// PEM 공개 키
    pub encoded_key: String,
    /// 설명 (없으면 빈 문자열)
    pub comment: String,
}

impl From<PublicKeyRecord> for PublicKey {
    fn from(record: PublicKeyRecord) -> Self {
        Self {
            id: record.id,
            etag: record.etag,
            caller_reference: record.config.caller_reference,
            name: record.config.name,
            encoded_key: record.config.encoded_key,
            comment: record.config.comment.unwrap_or_default(),
        }
    }
}

/// 식별자로 public key를 조회합니다.
///
/// # Errors
///
/// - 객체가 없으면 `LookupError::NotFound`
/// - 응답에 설정이 비어 있으면 `LookupError::NotFound` (빈 결과)
/// - 그 외 실패는 `LookupError::Remote`로 그대로 전파 (재시도 없음)
pub async fn find_public_key_by_id<C: CdnClient>(
    client: &C,
    ctx: &CallContext,
    id: &str,
) -> Result<PublicKey, LookupError> {
    let record = client.get_public_key(ctx, id).await?;

    if record.id.is_empty() || record.config.name.is_empty() {
        return Err(LookupError::not_found(RESOURCE_TYPE, id));
    }

    Ok(record.into())
}

/// public key 능력 구현
pub struct PublicKeyResource<C> {
    client: Arc<C>,
}

impl<C: CdnClient> PublicKeyResource<C> {
    /// 클라이언트로 생성합니다.
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }
}

impl<C: CdnClient> RemoteResource for PublicKeyResource<C> {
    type Object = PublicKey;

    fn resource_type(&self) -> &str {
        RESOURCE_TYPE
    }

    fn display_name(&self) -> &str {
        DISPLAY_NAME
    }

    async fn find(&self, ctx: &CallContext, id: &str) -> Result<PublicKey, LookupError> {
        find_public_key_by_id(self.client.as_ref(), ctx, id).await
    }

    /// 현재 ETag를 조회한 뒤 삭제합니다.
    async fn delete(&self, ctx: &CallContext, id: &str) -> Result<(), LookupError> {
        let current = find_public_key_by_id(self.client.as_ref(), ctx, id).await?;
        self.client
            .delete_public_key(ctx, id, &current.etag)
            .await
            .map_err(LookupError::from)
    }
}
