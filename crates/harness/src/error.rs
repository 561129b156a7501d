//! 하네스 에러 타입
//!
//! [`HarnessError`]는 하네스 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<HarnessError> for DriftwatchError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use driftwatch_core::error::{AssertionError, DriftwatchError, LookupError, TrackingError};

/// 하네스 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// 원격 조회/삭제 실패 (NotFound 포함)
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// 추적 상태에 논리 이름이 없음
    #[error(transparent)]
    Tracking(#[from] TrackingError),

    /// 검증 실패
    #[error(transparent)]
    Assertion(#[from] AssertionError),

    /// 여러 검증 실패 (aggregate 번들)
    #[error("{} checks failed: {}", .0.len(), join_errors(.0))]
    Aggregate(Vec<HarnessError>),

    /// 선언 문서 파싱 실패
    #[error("document error at line {line}: {reason}")]
    Document {
        /// 1부터 시작하는 줄 번호
        line: usize,
        /// 실패 사유
        reason: String,
    },

    /// 선언 문서 렌더링 실패 (fixture 읽기, 스키마 검증)
    #[error("render error: {0}")]
    Render(String),

    /// 오케스트레이터 plan/apply 실패
    #[error("orchestrator error: {0}")]
    Orchestrator(String),

    /// 시나리오 정의 오류
    #[error("invalid scenario '{scenario}': {reason}")]
    InvalidScenario {
        /// 시나리오 이름
        scenario: String,
        /// 오류 사유
        reason: String,
    },

    /// 허용되지 않은 시퀀서 상태 전이
    #[error("illegal sequencer transition: {from} -> {to}")]
    IllegalTransition {
        /// 현재 상태
        from: String,
        /// 요청된 상태
        to: String,
    },

    /// 사전 검사 실패
    #[error("pre-check failed: {0}")]
    PreCheck(String),
}

fn join_errors(errors: &[HarnessError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl HarnessError {
    /// 원격 객체 부재 신호인지 확인합니다.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Lookup(e) if e.is_not_found())
    }
}

impl From<HarnessError> for DriftwatchError {
    fn from(err: HarnessError) -> Self {
        match err {
            HarnessError::Lookup(e) => DriftwatchError::Lookup(e),
            HarnessError::Tracking(e) => DriftwatchError::Tracking(e),
            HarnessError::Assertion(e) => DriftwatchError::Assertion(e),
            other => DriftwatchError::Orchestrator(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_error_is_transparent() {
        let err = HarnessError::from(LookupError::Remote("access denied".to_owned()));
        assert_eq!(err.to_string(), "remote error: access denied");
    }

    #[test]
    fn not_found_detection() {
        let err = HarnessError::from(LookupError::not_found("cdn_public_key", "K1"));
        assert!(err.is_not_found());
        assert!(!HarnessError::Render("x".to_owned()).is_not_found());
    }

    #[test]
    fn aggregate_joins_messages() {
        let err = HarnessError::Aggregate(vec![
            HarnessError::Render("first".to_owned()),
            HarnessError::Orchestrator("second".to_owned()),
        ]);
        let msg = err.to_string();
        assert!(msg.starts_with("2 checks failed"));
        assert!(msg.contains("first"));
        assert!(msg.contains("second"));
    }

    #[test]
    fn document_error_display() {
        let err = HarnessError::Document {
            line: 3,
            reason: "expected '='".to_owned(),
        };
        assert_eq!(err.to_string(), "document error at line 3: expected '='");
    }

    #[test]
    fn converts_to_driftwatch_error() {
        let err: DriftwatchError = HarnessError::from(TrackingError::NotTracked {
            address: "cdn_public_key.test".to_owned(),
        })
        .into();
        assert!(matches!(err, DriftwatchError::Tracking(_)));

        let err: DriftwatchError = HarnessError::Render("bad".to_owned()).into();
        assert!(matches!(err, DriftwatchError::Orchestrator(_)));
    }
}
