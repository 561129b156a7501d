//! 원격 시스템 추상화: 호출 컨텍스트와 `{find, delete}` 능력 trait
//!
//! [`RemoteResource`]는 관리 리소스 유형마다 하나씩 구현되는 능력 인터페이스입니다.
//! 하네스는 유형 분기 없이 이 trait만으로 존재 확인, destroy 검증,
//! 외부 삭제(drift) 시뮬레이션을 수행합니다.
//!
//! ```text
//!   Existence / Destroy / Disappearance
//!                 │
//!                 ▼
//!        ┌────────────────┐
//!        │ RemoteResource │ (trait)
//!        └────────────────┘
//!            │        │
//!            ▼        ▼
//!      PublicKey    test double
//!            │
//!            ▼
//!     Remote API client
//! ```

use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use crate::error::LookupError;

/// dyn-compatible trait에서 사용하는 boxed future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 원격 호출 컨텍스트
///
/// 모든 원격 호출에 전달되어 상위 테스트 프레임워크가 진행 중인 호출을
/// 중단할 수 있게 합니다. 하네스 자체의 취소 로직은 없습니다.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: CancellationToken,
}

impl CallContext {
    /// 새 루트 컨텍스트를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 기존 토큰으로 컨텍스트를 생성합니다.
    pub fn with_token(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// 부모가 취소되면 함께 취소되는 자식 컨텍스트를 생성합니다.
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
        }
    }

    /// 컨텍스트를 취소합니다.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// 취소 여부
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// 원격 호출을 취소와 경합시킵니다.
    ///
    /// 취소가 먼저 일어나면 `LookupError::Cancelled`를 반환합니다.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, LookupError>
    where
        F: Future<Output = Result<T, LookupError>>,
    {
        if self.cancel.is_cancelled() {
            return Err(LookupError::Cancelled);
        }
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(LookupError::Cancelled),
            result = fut => result,
        }
    }
}

/// 관리 리소스 유형별 능력 인터페이스 (`{find, delete}`)
///
/// # Error Handling
///
/// - 객체 없음: `LookupError::NotFound`
/// - 그 외 실패: `LookupError::Remote` (재시도 없이 그대로 전파)
pub trait RemoteResource: Send + Sync + 'static {
    /// 원격 객체 표현
    type Object: Send;

    /// 오케스트레이터 상태에서 사용하는 리소스 유형 이름 (예: `cdn_public_key`)
    fn resource_type(&self) -> &str;

    /// 사람이 읽는 이름 (예: `CDN Public Key`). 실패 메시지에 사용됩니다.
    fn display_name(&self) -> &str;

    /// 식별자로 원격 객체를 조회합니다.
    fn find(
        &self,
        ctx: &CallContext,
        id: &str,
    ) -> impl Future<Output = Result<Self::Object, LookupError>> + Send;

    /// 오케스트레이터를 거치지 않고 원격 객체를 직접 삭제합니다.
    fn delete(
        &self,
        ctx: &CallContext,
        id: &str,
    ) -> impl Future<Output = Result<(), LookupError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_passes_through_result() {
        let ctx = CallContext::new();
        let value = ctx.run(async { Ok::<_, LookupError>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn run_returns_cancelled_when_token_cancelled() {
        let ctx = CallContext::new();
        ctx.cancel();
        let result = ctx.run(async { Ok::<_, LookupError>(()) }).await;
        assert_eq!(result, Err(LookupError::Cancelled));
    }

    #[tokio::test]
    async fn child_is_cancelled_with_parent() {
        let parent = CallContext::new();
        let child = parent.child();
        parent.cancel();
        assert!(child.is_cancelled());
    }

    #[tokio::test]
    async fn cancelling_child_leaves_parent_running() {
        let parent = CallContext::new();
        let child = parent.child();
        child.cancel();
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn run_interrupts_pending_call() {
        let ctx = CallContext::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            canceller.cancel();
        });
        let result = ctx
            .run(async {
                std::future::pending::<()>().await;
                Ok::<_, LookupError>(())
            })
            .await;
        assert_eq!(result, Err(LookupError::Cancelled));
    }
}
