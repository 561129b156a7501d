//! 시나리오: 이름 붙은 생명주기 테스트와 실행 보고서
//!
//! [`Scenario`]는 [`ScenarioBuilder`]로 생성합니다. 빌더는 단계 순서의 기본
//! 규칙(첫 단계는 apply)을 검증합니다.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use driftwatch_core::remote::{BoxFuture, CallContext};

use crate::check::StateCheck;
use crate::error::HarnessError;
use crate::step::LifecycleStep;

/// 단계 실행 전 사전 검사
///
/// 실패하면 어떤 단계도 적용하지 않고 시나리오가 실패합니다.
pub trait PreCheck: Send + Sync {
    /// 사전 검사를 실행합니다.
    fn run<'a>(&'a self, ctx: &'a CallContext) -> BoxFuture<'a, Result<(), HarnessError>>;
}

/// 이름 붙은 생명주기 시나리오
#[derive(Clone)]
pub struct Scenario {
    name: String,
    description: String,
    pre_check: Option<Arc<dyn PreCheck>>,
    steps: Vec<LifecycleStep>,
    check_destroy: Option<Arc<dyn StateCheck>>,
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("steps", &self.steps.len())
            .field("pre_check", &self.pre_check.is_some())
            .field("check_destroy", &self.check_destroy.is_some())
            .finish()
    }
}

impl Scenario {
    /// 빌더를 생성합니다.
    pub fn builder(name: impl Into<String>) -> ScenarioBuilder {
        ScenarioBuilder::new(name)
    }

    /// 시나리오 이름
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 설명
    pub fn description(&self) -> &str {
        &self.description
    }

    /// 사전 검사
    pub fn pre_check(&self) -> Option<&Arc<dyn PreCheck>> {
        self.pre_check.as_ref()
    }

    /// 단계 목록
    pub fn steps(&self) -> &[LifecycleStep] {
        &self.steps
    }

    /// teardown 후 실행할 destroy 검증
    pub fn check_destroy(&self) -> Option<&Arc<dyn StateCheck>> {
        self.check_destroy.as_ref()
    }
}

/// 시나리오 빌더
pub struct ScenarioBuilder {
    name: String,
    description: String,
    pre_check: Option<Arc<dyn PreCheck>>,
    steps: Vec<LifecycleStep>,
    check_destroy: Option<Arc<dyn StateCheck>>,
}

impl ScenarioBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            pre_check: None,
            steps: Vec::new(),
            check_destroy: None,
        }
    }

    /// 설명을 설정합니다.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// 사전 검사를 설정합니다.
    pub fn pre_check(mut self, pre_check: Arc<dyn PreCheck>) -> Self {
        self.pre_check = Some(pre_check);
        self
    }

    /// 단계를 추가합니다.
    pub fn step(mut self, step: impl Into<LifecycleStep>) -> Self {
        self.steps.push(step.into());
        self
    }

    /// destroy 검증을 설정합니다.
    pub fn check_destroy(mut self, check: Arc<dyn StateCheck>) -> Self {
        self.check_destroy = Some(check);
        self
    }

    /// 시나리오를 생성합니다.
    ///
    /// # Errors
    ///
    /// 이름이 비었거나, 단계가 없거나, 첫 단계가 import이면 `InvalidScenario`
    pub fn build(self) -> Result<Scenario, HarnessError> {
        let invalid = |reason: &str| HarnessError::InvalidScenario {
            scenario: self.name.clone(),
            reason: reason.to_owned(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty"));
        }
        match self.steps.first() {
            None => return Err(invalid("at least one step is required")),
            Some(step) if step.is_import() => {
                return Err(invalid("the first step must apply a configuration"));
            }
            Some(_) => {}
        }

        Ok(Scenario {
            name: self.name,
            description: self.description,
            pre_check: self.pre_check,
            steps: self.steps,
            check_destroy: self.check_destroy,
        })
    }
}

/// 시나리오 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioOutcome {
    /// 모든 단계와 destroy 검증 성공
    Passed,
    /// 단계 또는 destroy 검증 실패
    Failed,
}

impl fmt::Display for ScenarioOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => write!(f, "passed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// 시나리오 실행 보고서
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    /// 시나리오 이름
    pub name: String,
    /// 결과
    pub outcome: ScenarioOutcome,
    /// 성공한 단계 수
    pub steps_completed: usize,
    /// 단계 실패 메시지
    pub failure: Option<String>,
    /// teardown/destroy 검증 실패 메시지
    pub destroy_failure: Option<String>,
    /// teardown을 포함한 실행 시간 (밀리초)
    pub elapsed_ms: u64,
}

impl ScenarioReport {
    /// 통과 여부
    pub fn passed(&self) -> bool {
        self.outcome == ScenarioOutcome::Passed
    }

    /// 사람이 읽는 단일 실패 메시지
    pub fn message(&self) -> Option<String> {
        match (&self.failure, &self.destroy_failure) {
            (None, None) => None,
            (Some(f), None) => Some(f.clone()),
            (None, Some(d)) => Some(format!("destroy check: {d}")),
            (Some(f), Some(d)) => Some(format!("{f} (destroy check: {d})")),
        }
    }
}

#[cfg(test)]
mod tests {
    use driftwatch_core::types::ResourceAddress;

    use super::*;
    use crate::step::{ApplyStep, ImportStep};

    fn addr() -> ResourceAddress {
        ResourceAddress::new("cdn_public_key", "test")
    }

    #[test]
    fn builds_valid_scenario() {
        let scenario = Scenario::builder("basic")
            .description("create and import")
            .step(ApplyStep::new("resource \"cdn_public_key\" \"test\" {}"))
            .step(ImportStep::new(addr()))
            .build()
            .unwrap();
        assert_eq!(scenario.name(), "basic");
        assert_eq!(scenario.steps().len(), 2);
        assert!(scenario.check_destroy().is_none());
    }

    #[test]
    fn rejects_empty_name_and_steps() {
        let err = Scenario::builder(" ").step(ApplyStep::new("")).build().unwrap_err();
        assert!(err.to_string().contains("name must not be empty"));

        let err = Scenario::builder("empty").build().unwrap_err();
        assert!(err.to_string().contains("at least one step"));
    }

    #[test]
    fn rejects_import_as_first_step() {
        let err = Scenario::builder("import-first")
            .step(ImportStep::new(addr()))
            .build()
            .unwrap_err();
        assert!(matches!(err, HarnessError::InvalidScenario { .. }));
    }

    #[test]
    fn report_message_combines_failures() {
        let mut report = ScenarioReport {
            name: "basic".to_owned(),
            outcome: ScenarioOutcome::Failed,
            steps_completed: 0,
            failure: Some("step 1/2: boom".to_owned()),
            destroy_failure: None,
            elapsed_ms: 5,
        };
        assert_eq!(report.message().as_deref(), Some("step 1/2: boom"));

        report.destroy_failure = Some("K1 still exists".to_owned());
        assert_eq!(
            report.message().as_deref(),
            Some("step 1/2: boom (destroy check: K1 still exists)")
        );
        assert!(!report.passed());
    }

    #[test]
    fn report_serializes_outcome_lowercase() {
        let report = ScenarioReport {
            name: "basic".to_owned(),
            outcome: ScenarioOutcome::Passed,
            steps_completed: 2,
            failure: None,
            destroy_failure: None,
            elapsed_ms: 12,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"], "passed");
        assert_eq!(json["steps_completed"], 2);
    }
}
