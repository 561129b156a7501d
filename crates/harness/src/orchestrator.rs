//! 오케스트레이터 경계: plan/apply 엔진 trait과 plan 표현
//!
//! 시퀀서는 [`Orchestrator`] trait만으로 선언 문서를 적용하고, 재계획하고,
//! 원격 상태에서 인스턴스를 import 합니다. 참조 구현은 [`crate::engine::LocalEngine`]입니다.

use std::fmt;
use std::future::Future;

use serde::Serialize;

use driftwatch_core::remote::CallContext;
use driftwatch_core::types::{ManagedResourceInstance, ResourceAddress, TrackedState};

use crate::error::HarnessError;

/// 계획된 변경 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    /// 새 원격 객체 생성
    Create,
    /// 제자리 갱신
    Update,
    /// 삭제 후 재생성
    Replace,
    /// 삭제
    Delete,
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Replace => write!(f, "replace"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// 단일 계획 변경
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedChange {
    /// 대상 주소
    pub address: ResourceAddress,
    /// 변경 종류
    pub action: ChangeAction,
    /// 값이 달라진 속성 키 (Create/Delete는 비어 있음)
    pub changed_keys: Vec<String>,
}

impl fmt::Display for PlannedChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.address, self.action)?;
        if !self.changed_keys.is_empty() {
            write!(f, " [{}]", self.changed_keys.join(", "))?;
        }
        Ok(())
    }
}

/// 재계획 결과
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    /// 적용 순서대로의 변경 목록
    pub changes: Vec<PlannedChange>,
}

impl Plan {
    /// 변경이 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// 특정 주소에 대한 변경을 찾습니다.
    pub fn change_for(&self, address: &ResourceAddress) -> Option<&PlannedChange> {
        self.changes.iter().find(|c| &c.address == address)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.changes.is_empty() {
            return write!(f, "no changes");
        }
        let parts: Vec<String> = self.changes.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// plan/apply 엔진
///
/// # 구현 요구사항
///
/// - `apply`: 선언 문서를 렌더링하고, 원격 상태를 refresh한 뒤 수렴시킵니다.
///   성공하면 추적 상태가 선언과 일치해야 합니다.
/// - `plan`: refresh 후 diff만 계산하며 추적 상태를 변경하지 않습니다.
/// - `import`: 선언 없이 원격 객체만으로 인스턴스를 재구성합니다.
/// - `destroy`: 추적 중인 모든 인스턴스를 삭제합니다. 이미 없는 객체는 성공으로 취급합니다.
pub trait Orchestrator: Send + Sync {
    /// 선언 문서를 적용합니다.
    fn apply(
        &mut self,
        ctx: &CallContext,
        config: &str,
    ) -> impl Future<Output = Result<(), HarnessError>> + Send;

    /// 현재 추적 상태와 원격 상태를 기준으로 재계획합니다.
    fn plan(
        &self,
        ctx: &CallContext,
        config: &str,
    ) -> impl Future<Output = Result<Plan, HarnessError>> + Send;

    /// 원격 식별자로부터 인스턴스를 재구성합니다.
    fn import(
        &self,
        ctx: &CallContext,
        address: &ResourceAddress,
        id: &str,
    ) -> impl Future<Output = Result<ManagedResourceInstance, HarnessError>> + Send;

    /// 현재 추적 상태
    fn state(&self) -> &TrackedState;

    /// 추적 중인 모든 인스턴스를 삭제합니다.
    fn destroy(&mut self, ctx: &CallContext)
    -> impl Future<Output = Result<(), HarnessError>> + Send;
}
