//! 생명주기 단계 정의
//!
//! 시나리오는 [`LifecycleStep`]의 순서열입니다.
//!
//! - [`ApplyStep`]: 선언 문서를 적용하고 검증 번들을 실행한 뒤 재계획합니다.
//! - [`ImportStep`]: 선언 없이 원격 상태에서 인스턴스를 재구성하여
//!   추적 상태와 비교합니다. `ignore`에 명시한 키만 비교에서 제외됩니다.

use driftwatch_core::types::{ManagedResourceInstance, ResourceAddress};

use crate::check::CheckBundle;

/// 설정 적용 단계
#[derive(Debug, Clone)]
pub struct ApplyStep {
    /// 선언 문서
    pub config: String,
    /// apply 직후 실행할 검증
    pub checks: CheckBundle,
    /// 검증 후 재계획 결과가 비어 있지 않아야 하는지 여부
    pub expect_non_empty_plan: bool,
}

impl ApplyStep {
    /// 검증 없는 apply 단계를 생성합니다.
    pub fn new(config: impl Into<String>) -> Self {
        Self {
            config: config.into(),
            checks: CheckBundle::fail_fast(Vec::new()),
            expect_non_empty_plan: false,
        }
    }

    /// 검증 번들을 설정합니다.
    pub fn checks(mut self, checks: CheckBundle) -> Self {
        self.checks = checks;
        self
    }

    /// 재계획 결과가 비어 있지 않을 것으로 기대합니다 (drift 시뮬레이션).
    pub fn expect_non_empty_plan(mut self) -> Self {
        self.expect_non_empty_plan = true;
        self
    }
}

/// import 검증 단계
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStep {
    /// 재구성할 주소
    pub address: ResourceAddress,
    /// 비교에서 제외할 속성 키
    pub ignore: Vec<String>,
}

impl ImportStep {
    /// import 검증 단계를 생성합니다.
    pub fn new(address: ResourceAddress) -> Self {
        Self {
            address,
            ignore: Vec::new(),
        }
    }

    /// 비교에서 제외할 키를 추가합니다.
    pub fn ignore<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore.extend(keys.into_iter().map(Into::into));
        self
    }

    /// 추적 인스턴스와 import 결과를 비교합니다.
    ///
    /// 한쪽에만 있는 키도 차이로 보고합니다. 반환값은 `key: "state" != "imported"`
    /// 형식의 차이 목록입니다.
    pub fn diff(
        &self,
        tracked: &ManagedResourceInstance,
        imported: &ManagedResourceInstance,
    ) -> Vec<String> {
        let mut keys: Vec<&String> = tracked
            .attributes
            .keys()
            .chain(imported.attributes.keys())
            .filter(|k| !self.ignore.iter().any(|ig| ig == *k))
            .collect();
        keys.sort();
        keys.dedup();

        keys.into_iter()
            .filter_map(|key| {
                let state = tracked.attribute(key);
                let import = imported.attribute(key);
                (state != import).then(|| {
                    format!(
                        "{key}: {} != {}",
                        display_value(state),
                        display_value(import)
                    )
                })
            })
            .collect()
    }
}

fn display_value(value: Option<&str>) -> String {
    match value {
        Some(v) => format!("{v:?}"),
        None => "<absent>".to_owned(),
    }
}

/// 시나리오 단계
#[derive(Debug, Clone)]
pub enum LifecycleStep {
    /// 설정 적용
    Apply(ApplyStep),
    /// import 검증
    ImportVerify(ImportStep),
}

impl LifecycleStep {
    /// 메트릭/로그용 단계 종류
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Apply(_) => "apply",
            Self::ImportVerify(_) => "import",
        }
    }

    /// import 단계인지 확인합니다.
    pub fn is_import(&self) -> bool {
        matches!(self, Self::ImportVerify(_))
    }

    /// apply 단계의 선언 문서
    pub fn config(&self) -> Option<&str> {
        match self {
            Self::Apply(step) => Some(&step.config),
            Self::ImportVerify(_) => None,
        }
    }
}

impl From<ApplyStep> for LifecycleStep {
    fn from(step: ApplyStep) -> Self {
        Self::Apply(step)
    }
}

impl From<ImportStep> for LifecycleStep {
    fn from(step: ImportStep) -> Self {
        Self::ImportVerify(step)
    }
}
