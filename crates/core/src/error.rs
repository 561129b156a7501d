//! 에러 타입: 검증 하네스의 에러 분류
//!
//! | 분류 | 의미 | 전파 정책 |
//! |------|------|-----------|
//! | [`LookupError::NotFound`] | 원격 객체 없음 | destroy 검증에서만 성공으로 취급 |
//! | [`LookupError::Remote`] | 그 외 원격 실패 | 항상 전파, 재시도 없음 |
//! | [`TrackingError`] | 추적 상태에 논리 이름 없음 | 하네스/설정 버그, 항상 치명적 |
//! | [`AssertionError`] | 관측 값 불일치 | 현재 단계 실패 |

/// driftwatch 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum DriftwatchError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 원격 조회/삭제 에러
    #[error("lookup error: {0}")]
    Lookup(#[from] LookupError),

    /// 추적 상태 에러
    #[error("tracking error: {0}")]
    Tracking(#[from] TrackingError),

    /// 검증 실패
    #[error("assertion failed: {0}")]
    Assertion(#[from] AssertionError),

    /// 오케스트레이터(plan/apply) 에러
    #[error("orchestrator error: {0}")]
    Orchestrator(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 원격 조회 에러
///
/// "객체 없음"과 그 외 모든 실패를 구분합니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// 원격 객체가 존재하지 않음
    #[error("{resource_type} {id} not found")]
    NotFound { resource_type: String, id: String },

    /// 네트워크, 권한, 응답 형식 등 그 외 원격 실패
    #[error("remote error: {0}")]
    Remote(String),

    /// 호출이 취소됨
    #[error("remote call cancelled")]
    Cancelled,
}

impl LookupError {
    /// `NotFound` 생성 헬퍼
    pub fn not_found(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    /// 객체 부재 신호인지 확인합니다.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// 추적 상태 에러
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackingError {
    /// 추적 상태에 해당 주소가 없음
    #[error("not found: {address}")]
    NotTracked { address: String },

    /// 인스턴스에 원격 식별자가 없음
    #[error("no remote identifier is set for {address}")]
    MissingId { address: String },

    /// `<type>.<name>` 형식이 아닌 주소
    #[error("invalid resource address: {0}")]
    InvalidAddress(String),
}

/// 검증 실패
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssertionError {
    /// 속성 값 불일치
    #[error("{address}: attribute '{key}' expected \"{expected}\", got \"{actual}\"")]
    AttributeMismatch {
        address: String,
        key: String,
        expected: String,
        actual: String,
    },

    /// 속성 없음
    #[error("{address}: attribute '{key}' not found")]
    AttributeMissing { address: String, key: String },

    /// 속성이 비어 있음
    #[error("{address}: attribute '{key}' expected to be set")]
    AttributeEmpty { address: String, key: String },

    /// 정규식 불일치
    #[error("{address}: attribute '{key}' didn't match \"{pattern}\", got \"{actual}\"")]
    PatternMismatch {
        address: String,
        key: String,
        pattern: String,
        actual: String,
    },

    /// destroy 후에도 원격 객체가 남아 있음
    #[error("{resource_type} {id} still exists")]
    StillExists { resource_type: String, id: String },

    /// apply 후 plan이 비어 있지 않음
    #[error("after applying this step, the plan was not empty: {changes}")]
    UnexpectedPlan { changes: String },

    /// 비어 있지 않은 plan을 기대했으나 비어 있음
    #[error("expected a non-empty plan, but got an empty plan")]
    ExpectedNonEmptyPlan,

    /// 단계 사이에 원격 식별자가 바뀜 (교체됨)
    #[error("{address}: id changed from \"{recorded}\" to \"{actual}\"")]
    IdChanged {
        address: String,
        recorded: String,
        actual: String,
    },

    /// 비교할 식별자가 기록되지 않음
    #[error("{address}: no id was recorded to compare against")]
    IdNotRecorded { address: String },

    /// import 결과가 기존 상태와 다름
    #[error("{address}: imported attributes differ from state: {diffs}")]
    ImportMismatch { address: String, diffs: String },
}
