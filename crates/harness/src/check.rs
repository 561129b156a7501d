//! 상태 검증: 속성 검증과 검증 번들
//!
//! 각 단계는 apply 직후 [`CheckBundle`]을 실행합니다. 개별 검증은 [`StateCheck`]를
//! 구현하며, 원격 조회가 필요한 검증([`crate::lookup`])도 같은 trait을 사용합니다.
//!
//! - [`CheckBundle::fail_fast`]: 첫 실패에서 중단
//! - [`CheckBundle::aggregate`]: 모든 검증을 실행하고 실패를 모아서 보고

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use regex::Regex;

use driftwatch_core::error::AssertionError;
use driftwatch_core::remote::{BoxFuture, CallContext};
use driftwatch_core::types::{ResourceAddress, TrackedState};

use crate::error::HarnessError;

/// 추적 상태에 대한 검증
///
/// 번들에 서로 다른 검증을 담기 위해 dyn-compatible 형태로 정의합니다.
pub trait StateCheck: Send + Sync {
    /// 검증 이름 (로그용)
    fn name(&self) -> &str;

    /// 검증을 실행합니다.
    fn check<'a>(
        &'a self,
        ctx: &'a CallContext,
        state: &'a TrackedState,
    ) -> BoxFuture<'a, Result<(), HarnessError>>;
}

/// 속성 값이 정확히 일치하는지 검증합니다.
pub struct AttrEquals {
    address: ResourceAddress,
    key: String,
    expected: String,
}

impl AttrEquals {
    fn evaluate(&self, state: &TrackedState) -> Result<(), HarnessError> {
        let instance = state.require(&self.address)?;

        // 빈 기대값은 속성 부재와 동일하게 취급
        match instance.attribute(&self.key) {
            None if self.expected.is_empty() => Ok(()),
            None => Err(AssertionError::AttributeMissing {
                address: self.address.to_string(),
                key: self.key.clone(),
            }
            .into()),
            Some(actual) if actual == self.expected => Ok(()),
            Some(actual) => Err(AssertionError::AttributeMismatch {
                address: self.address.to_string(),
                key: self.key.clone(),
                expected: self.expected.clone(),
                actual: actual.to_owned(),
            }
            .into()),
        }
    }
}

impl StateCheck for AttrEquals {
    fn name(&self) -> &str {
        "attr_equals"
    }

    fn check<'a>(
        &'a self,
        _ctx: &'a CallContext,
        state: &'a TrackedState,
    ) -> BoxFuture<'a, Result<(), HarnessError>> {
        Box::pin(std::future::ready(self.evaluate(state)))
    }
}

/// 속성이 존재하고 비어 있지 않은지 검증합니다.
pub struct AttrSet {
    address: ResourceAddress,
    key: String,
}

impl AttrSet {
    fn evaluate(&self, state: &TrackedState) -> Result<(), HarnessError> {
        let instance = state.require(&self.address)?;
        match instance.attribute(&self.key) {
            Some(value) if !value.is_empty() => Ok(()),
            _ => Err(AssertionError::AttributeEmpty {
                address: self.address.to_string(),
                key: self.key.clone(),
            }
            .into()),
        }
    }
}

impl StateCheck for AttrSet {
    fn name(&self) -> &str {
        "attr_set"
    }

    fn check<'a>(
        &'a self,
        _ctx: &'a CallContext,
        state: &'a TrackedState,
    ) -> BoxFuture<'a, Result<(), HarnessError>> {
        Box::pin(std::future::ready(self.evaluate(state)))
    }
}

/// 속성 값이 정규식과 일치하는지 검증합니다.
pub struct AttrMatches {
    address: ResourceAddress,
    key: String,
    pattern: Regex,
}

impl AttrMatches {
    fn evaluate(&self, state: &TrackedState) -> Result<(), HarnessError> {
        let instance = state.require(&self.address)?;
        let actual = instance
            .attribute(&self.key)
            .ok_or_else(|| AssertionError::AttributeMissing {
                address: self.address.to_string(),
                key: self.key.clone(),
            })?;

        if self.pattern.is_match(actual) {
            Ok(())
        } else {
            Err(AssertionError::PatternMismatch {
                address: self.address.to_string(),
                key: self.key.clone(),
                pattern: self.pattern.as_str().to_owned(),
                actual: actual.to_owned(),
            }
            .into())
        }
    }
}

impl StateCheck for AttrMatches {
    fn name(&self) -> &str {
        "attr_matches"
    }

    fn check<'a>(
        &'a self,
        _ctx: &'a CallContext,
        state: &'a TrackedState,
    ) -> BoxFuture<'a, Result<(), HarnessError>> {
        Box::pin(std::future::ready(self.evaluate(state)))
    }
}

/// 단계 사이에 리소스 식별자가 유지되는지 확인하는 검증 쌍
///
/// [`IdPin::record`]가 반환한 검증이 현재 `id`를 기록하고, 이후 단계의
/// [`IdPin::unchanged`]가 같은 `id`인지 비교합니다. 제자리 갱신이 교체로
/// 바뀌면 이름은 같아도 `id`가 달라집니다.
#[derive(Clone)]
pub struct IdPin {
    address: ResourceAddress,
    recorded: Arc<Mutex<Option<String>>>,
}

impl IdPin {
    /// `address`에 대한 빈 핀을 생성합니다.
    pub fn new(address: &ResourceAddress) -> Self {
        Self {
            address: address.clone(),
            recorded: Arc::new(Mutex::new(None)),
        }
    }

    /// 기록된 식별자
    pub fn recorded(&self) -> Option<String> {
        self.recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 현재 `id`를 기록하는 검증
    pub fn record(&self) -> Arc<dyn StateCheck> {
        Arc::new(RecordId(self.clone()))
    }

    /// 기록된 `id`와 현재 `id`를 비교하는 검증
    pub fn unchanged(&self) -> Arc<dyn StateCheck> {
        Arc::new(IdUnchanged(self.clone()))
    }
}

struct RecordId(IdPin);

impl StateCheck for RecordId {
    fn name(&self) -> &str {
        "record_id"
    }

    fn check<'a>(
        &'a self,
        _ctx: &'a CallContext,
        state: &'a TrackedState,
    ) -> BoxFuture<'a, Result<(), HarnessError>> {
        let result = state.require(&self.0.address).map(|instance| {
            *self
                .0
                .recorded
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(instance.id.clone());
        });
        Box::pin(std::future::ready(result.map_err(HarnessError::from)))
    }
}

struct IdUnchanged(IdPin);

impl IdUnchanged {
    fn evaluate(&self, state: &TrackedState) -> Result<(), HarnessError> {
        let pin = &self.0;
        let instance = state.require(&pin.address)?;
        let recorded = pin.recorded().ok_or_else(|| AssertionError::IdNotRecorded {
            address: pin.address.to_string(),
        })?;

        if instance.id == recorded {
            Ok(())
        } else {
            Err(AssertionError::IdChanged {
                address: pin.address.to_string(),
                recorded,
                actual: instance.id.clone(),
            }
            .into())
        }
    }
}

impl StateCheck for IdUnchanged {
    fn name(&self) -> &str {
        "id_unchanged"
    }

    fn check<'a>(
        &'a self,
        _ctx: &'a CallContext,
        state: &'a TrackedState,
    ) -> BoxFuture<'a, Result<(), HarnessError>> {
        Box::pin(std::future::ready(self.evaluate(state)))
    }
}

/// `address.key == expected` 검증을 생성합니다.
pub fn attr_equals(
    address: &ResourceAddress,
    key: impl Into<String>,
    expected: impl Into<String>,
) -> Arc<dyn StateCheck> {
    Arc::new(AttrEquals {
        address: address.clone(),
        key: key.into(),
        expected: expected.into(),
    })
}

/// `address.key`가 설정되어 있는지 검증을 생성합니다.
pub fn attr_set(address: &ResourceAddress, key: impl Into<String>) -> Arc<dyn StateCheck> {
    Arc::new(AttrSet {
        address: address.clone(),
        key: key.into(),
    })
}

/// `address.key`가 정규식과 일치하는지 검증을 생성합니다.
pub fn attr_matches(
    address: &ResourceAddress,
    key: impl Into<String>,
    pattern: Regex,
) -> Arc<dyn StateCheck> {
    Arc::new(AttrMatches {
        address: address.clone(),
        key: key.into(),
        pattern,
    })
}

/// 번들 실패 처리 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleMode {
    /// 첫 실패에서 중단
    FailFast,
    /// 모든 검증 실행 후 실패를 모아서 보고
    Aggregate,
}

/// 단계별 검증 번들
#[derive(Clone)]
pub struct CheckBundle {
    mode: BundleMode,
    checks: Vec<Arc<dyn StateCheck>>,
}

impl fmt::Debug for CheckBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.checks.iter().map(|c| c.name()).collect();
        f.debug_struct("CheckBundle")
            .field("mode", &self.mode)
            .field("checks", &names)
            .finish()
    }
}

impl CheckBundle {
    /// 첫 실패에서 중단하는 번들
    pub fn fail_fast(checks: Vec<Arc<dyn StateCheck>>) -> Self {
        Self {
            mode: BundleMode::FailFast,
            checks,
        }
    }

    /// 모든 검증을 실행하는 번들
    pub fn aggregate(checks: Vec<Arc<dyn StateCheck>>) -> Self {
        Self {
            mode: BundleMode::Aggregate,
            checks,
        }
    }

    /// 실패 처리 방식
    pub fn mode(&self) -> BundleMode {
        self.mode
    }

    /// 검증 수
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    /// 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// 번들을 순서대로 실행합니다.
    ///
    /// 검증은 순차 실행되므로 앞선 검증의 부수 효과(예: 외부 삭제)가
    /// 뒤 검증에서 관측됩니다.
    pub async fn run(&self, ctx: &CallContext, state: &TrackedState) -> Result<(), HarnessError> {
        let mut failures = Vec::new();

        for check in &self.checks {
            if let Err(e) = check.check(ctx, state).await {
                tracing::debug!(check = check.name(), error = %e, "check failed");
                match self.mode {
                    BundleMode::FailFast => return Err(e),
                    BundleMode::Aggregate => failures.push(e),
                }
            }
        }

        match failures.len() {
            0 => Ok(()),
            1 => Err(failures.remove(0)),
            _ => Err(HarnessError::Aggregate(failures)),
        }
    }
}

#[cfg(test)]
mod tests {
    use driftwatch_core::error::TrackingError;
    use driftwatch_core::types::{AttributeBag, ManagedResourceInstance};

    use super::*;

    fn addr() -> ResourceAddress {
        ResourceAddress::new("cdn_public_key", "test")
    }

    fn state() -> TrackedState {
        let mut attrs = AttributeBag::new();
        attrs.insert("name".to_owned(), "tf-acc-test-123".to_owned());
        attrs.insert("comment".to_owned(), String::new());
        attrs.insert("etag".to_owned(), "E1".to_owned());
        let mut state = TrackedState::new();
        state.insert(ManagedResourceInstance::new(addr(), "K1", attrs));
        state
    }

    #[tokio::test]
    async fn attr_equals_passes_and_fails() {
        let ctx = CallContext::new();
        let st = state();
        attr_equals(&addr(), "name", "tf-acc-test-123")
            .check(&ctx, &st)
            .await
            .unwrap();

        let err = attr_equals(&addr(), "name", "other")
            .check(&ctx, &st)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HarnessError::Assertion(AssertionError::AttributeMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn id_pin_detects_replacement() {
        let ctx = CallContext::new();
        let pin = IdPin::new(&addr());

        let err = pin.unchanged().check(&ctx, &state()).await.unwrap_err();
        assert!(matches!(
            err,
            HarnessError::Assertion(AssertionError::IdNotRecorded { .. })
        ));

        pin.record().check(&ctx, &state()).await.unwrap();
        assert_eq!(pin.recorded().as_deref(), Some("K1"));
        pin.unchanged().check(&ctx, &state()).await.unwrap();

        // 같은 이름, 새 식별자
        let mut replaced = state();
        let attrs = replaced.get(&addr()).unwrap().attributes.clone();
        replaced.insert(ManagedResourceInstance::new(addr(), "K2", attrs));
        let err = pin.unchanged().check(&ctx, &replaced).await.unwrap_err();
        assert!(err.to_string().contains("id changed from \"K1\" to \"K2\""));
    }

    #[tokio::test]
    async fn attr_equals_empty_matches_empty_or_absent() {
        let ctx = CallContext::new();
        let st = state();
        attr_equals(&addr(), "comment", "").check(&ctx, &st).await.unwrap();
        attr_equals(&addr(), "absent", "").check(&ctx, &st).await.unwrap();
    }

    #[tokio::test]
    async fn attr_set_rejects_empty_value() {
        let ctx = CallContext::new();
        let st = state();
        attr_set(&addr(), "etag").check(&ctx, &st).await.unwrap();

        let err = attr_set(&addr(), "comment").check(&ctx, &st).await.unwrap_err();
        assert!(matches!(
            err,
            HarnessError::Assertion(AssertionError::AttributeEmpty { .. })
        ));
    }

    #[tokio::test]
    async fn attr_matches_uses_regex() {
        let ctx = CallContext::new();
        let st = state();
        let prefix = Regex::new("^tf-acc-test-").unwrap();
        attr_matches(&addr(), "name", prefix).check(&ctx, &st).await.unwrap();

        let other = Regex::new("^prod-").unwrap();
        let err = attr_matches(&addr(), "name", other)
            .check(&ctx, &st)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("didn't match"));
    }

    #[tokio::test]
    async fn untracked_address_is_tracking_error() {
        let ctx = CallContext::new();
        let st = state();
        let missing = ResourceAddress::new("cdn_public_key", "missing");
        let err = attr_set(&missing, "etag").check(&ctx, &st).await.unwrap_err();
        assert!(matches!(
            err,
            HarnessError::Tracking(TrackingError::NotTracked { .. })
        ));
    }

    #[tokio::test]
    async fn fail_fast_stops_at_first_failure() {
        let ctx = CallContext::new();
        let st = state();
        let bundle = CheckBundle::fail_fast(vec![
            attr_equals(&addr(), "name", "wrong"),
            attr_set(&addr(), "comment"),
        ]);
        let err = bundle.run(&ctx, &st).await.unwrap_err();
        assert!(matches!(
            err,
            HarnessError::Assertion(AssertionError::AttributeMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn aggregate_reports_every_failure() {
        let ctx = CallContext::new();
        let st = state();
        let bundle = CheckBundle::aggregate(vec![
            attr_equals(&addr(), "name", "wrong"),
            attr_set(&addr(), "etag"),
            attr_set(&addr(), "comment"),
        ]);
        assert_eq!(bundle.len(), 3);

        match bundle.run(&ctx, &st).await.unwrap_err() {
            HarnessError::Aggregate(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected aggregate error, got {other}"),
        }
    }

    #[tokio::test]
    async fn aggregate_with_single_failure_is_unwrapped() {
        let ctx = CallContext::new();
        let st = state();
        let bundle = CheckBundle::aggregate(vec![
            attr_set(&addr(), "etag"),
            attr_set(&addr(), "comment"),
        ]);
        let err = bundle.run(&ctx, &st).await.unwrap_err();
        assert!(matches!(err, HarnessError::Assertion(_)));
    }

    #[test]
    fn bundle_debug_lists_check_names() {
        let bundle = CheckBundle::fail_fast(vec![attr_set(&addr(), "etag")]);
        let debug = format!("{bundle:?}");
        assert!(debug.contains("attr_set"));
        assert!(debug.contains("FailFast"));
    }
}
