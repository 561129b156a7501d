//! CDN 에러 타입
//!
//! [`CdnError`]는 원격 CDN API 호출에서 발생하는 에러를 표현합니다.
//! 하네스에는 [`LookupError`]로 변환되어 전달되며, `NoSuchPublicKey`만
//! `LookupError::NotFound`가 됩니다.

use driftwatch_core::error::{DriftwatchError, LookupError};

use crate::public_key::RESOURCE_TYPE;

/// CDN API 에러
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CdnError {
    /// 공개 키가 존재하지 않음
    #[error("NoSuchPublicKey: public key {id} does not exist")]
    NoSuchPublicKey {
        /// 공개 키 ID
        id: String,
    },

    /// 같은 이름의 공개 키가 이미 존재함
    #[error("PublicKeyAlreadyExists: a public key named '{name}' already exists")]
    PublicKeyAlreadyExists {
        /// 공개 키 이름
        name: String,
    },

    /// 계정 할당량 초과
    #[error("TooManyPublicKeys: the account already has {limit} public keys")]
    TooManyPublicKeys {
        /// 할당량
        limit: usize,
    },

    /// If-Match 값이 현재 ETag와 다름
    #[error("PreconditionFailed: etag '{if_match}' does not match public key {id}")]
    PreconditionFailed {
        /// 공개 키 ID
        id: String,
        /// 요청에 사용된 ETag
        if_match: String,
    },

    /// 잘못된 요청 인자
    #[error("InvalidArgument: {0}")]
    InvalidArgument(String),

    /// 서비스 사용 불가
    #[error("ServiceUnavailable: {0}")]
    Unavailable(String),

    /// 호출이 취소됨
    #[error("request cancelled")]
    Cancelled,
}

impl From<CdnError> for LookupError {
    fn from(err: CdnError) -> Self {
        match err {
            CdnError::NoSuchPublicKey { id } => LookupError::not_found(RESOURCE_TYPE, id),
            CdnError::Cancelled => LookupError::Cancelled,
            other => LookupError::Remote(other.to_string()),
        }
    }
}

impl From<CdnError> for DriftwatchError {
    fn from(err: CdnError) -> Self {
        DriftwatchError::Lookup(err.into())
    }
}
