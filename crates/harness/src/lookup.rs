//! 원격 검증: 존재 확인, destroy 검증, 외부 삭제 시뮬레이션
//!
//! 세 연산 모두 [`RemoteResource`] 능력 인터페이스만 사용하므로
//! 리소스 유형에 따른 분기가 없습니다.
//!
//! | 연산 | NotFound | 그 외 원격 실패 |
//! |------|----------|----------------|
//! | [`assert_exists`] | 실패 | 전파 |
//! | [`assert_destroyed`] | 성공 (다음 인스턴스로) | 전파 |
//! | [`disappear`] | 전파 | 전파 |

use std::sync::Arc;

use tracing::{debug, info, warn};

use driftwatch_core::error::AssertionError;
use driftwatch_core::metrics as m;
use driftwatch_core::remote::{BoxFuture, CallContext, RemoteResource};
use driftwatch_core::types::{ResourceAddress, TrackedState};

use crate::check::StateCheck;
use crate::error::HarnessError;

fn record_lookup<R: RemoteResource>(resource: &R) {
    metrics::counter!(
        m::REMOTE_LOOKUPS_TOTAL,
        m::LABEL_RESOURCE_TYPE => resource.resource_type().to_owned()
    )
    .increment(1);
}

/// 추적 상태의 논리 이름이 원격에 존재하는지 확인합니다.
///
/// # Errors
///
/// - 추적 상태에 주소가 없으면 `TrackingError::NotTracked`
/// - 원격 조회 실패(NotFound 포함)는 그대로 반환
pub async fn assert_exists<R: RemoteResource>(
    resource: &R,
    ctx: &CallContext,
    state: &TrackedState,
    address: &ResourceAddress,
) -> Result<R::Object, HarnessError> {
    let instance = state.require(address)?;
    record_lookup(resource);

    let object = resource.find(ctx, &instance.id).await?;
    debug!(address = %address, id = %instance.id, "remote object exists");
    Ok(object)
}

/// 최종 상태의 모든 인스턴스가 원격에서 사라졌는지 확인합니다.
///
/// 관리 유형의 인스턴스를 모두 조회하며, 남아 있는 객체를 처음 발견하면
/// 즉시 실패합니다.
pub async fn assert_destroyed<R: RemoteResource>(
    resource: &R,
    ctx: &CallContext,
    state: &TrackedState,
) -> Result<(), HarnessError> {
    let mut checked = 0usize;

    for instance in state.instances_of(resource.resource_type()) {
        record_lookup(resource);

        match resource.find(ctx, &instance.id).await {
            Err(e) if e.is_not_found() => {
                checked += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
            Ok(_) => {
                warn!(
                    address = %instance.address,
                    id = %instance.id,
                    "remote object still exists after destroy"
                );
                metrics::counter!(
                    m::LEAKED_RESOURCES_TOTAL,
                    m::LABEL_RESOURCE_TYPE => resource.resource_type().to_owned()
                )
                .increment(1);
                return Err(AssertionError::StillExists {
                    resource_type: resource.display_name().to_owned(),
                    id: instance.id.clone(),
                }
                .into());
            }
        }
    }

    debug!(
        resource_type = resource.resource_type(),
        checked, "all tracked objects destroyed"
    );
    Ok(())
}

/// 오케스트레이터를 거치지 않고 원격 객체를 삭제합니다.
pub async fn disappear<R: RemoteResource>(
    resource: &R,
    ctx: &CallContext,
    state: &TrackedState,
    address: &ResourceAddress,
) -> Result<(), HarnessError> {
    let instance = state.require(address)?;
    resource.delete(ctx, &instance.id).await?;
    info!(address = %address, id = %instance.id, "deleted remote object out-of-band");
    Ok(())
}

/// 존재 확인 검증
pub struct Exists<R> {
    resource: Arc<R>,
    address: ResourceAddress,
}

impl<R: RemoteResource> StateCheck for Exists<R> {
    fn name(&self) -> &str {
        "exists"
    }

    fn check<'a>(
        &'a self,
        ctx: &'a CallContext,
        state: &'a TrackedState,
    ) -> BoxFuture<'a, Result<(), HarnessError>> {
        Box::pin(async move {
            assert_exists(self.resource.as_ref(), ctx, state, &self.address)
                .await
                .map(|_| ())
        })
    }
}

/// 외부 삭제 검증 단계
pub struct Disappears<R> {
    resource: Arc<R>,
    address: ResourceAddress,
}

impl<R: RemoteResource> StateCheck for Disappears<R> {
    fn name(&self) -> &str {
        "disappears"
    }

    fn check<'a>(
        &'a self,
        ctx: &'a CallContext,
        state: &'a TrackedState,
    ) -> BoxFuture<'a, Result<(), HarnessError>> {
        Box::pin(disappear(self.resource.as_ref(), ctx, state, &self.address))
    }
}

/// destroy 검증
pub struct Destroyed<R> {
    resource: Arc<R>,
}

impl<R: RemoteResource> StateCheck for Destroyed<R> {
    fn name(&self) -> &str {
        "destroyed"
    }

    fn check<'a>(
        &'a self,
        ctx: &'a CallContext,
        state: &'a TrackedState,
    ) -> BoxFuture<'a, Result<(), HarnessError>> {
        Box::pin(assert_destroyed(self.resource.as_ref(), ctx, state))
    }
}

/// 존재 확인 검증을 생성합니다.
pub fn exists<R: RemoteResource>(resource: &Arc<R>, address: &ResourceAddress) -> Arc<dyn StateCheck> {
    Arc::new(Exists {
        resource: Arc::clone(resource),
        address: address.clone(),
    })
}

/// 외부 삭제 검증을 생성합니다.
pub fn disappears<R: RemoteResource>(
    resource: &Arc<R>,
    address: &ResourceAddress,
) -> Arc<dyn StateCheck> {
    Arc::new(Disappears {
        resource: Arc::clone(resource),
        address: address.clone(),
    })
}

/// destroy 검증을 생성합니다.
pub fn destroyed<R: RemoteResource>(resource: &Arc<R>) -> Arc<dyn StateCheck> {
    Arc::new(Destroyed {
        resource: Arc::clone(resource),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use driftwatch_core::error::{LookupError, TrackingError};
    use driftwatch_core::types::{AttributeBag, ManagedResourceInstance};

    use super::*;

    /// 조회 결과를 직접 지정하는 테스트 리소스
    #[derive(Default)]
    struct FakeRemote {
        present: Mutex<HashSet<String>>,
        broken: Mutex<HashMap<String, String>>,
        lookups: Mutex<Vec<String>>,
    }

    impl FakeRemote {
        fn with(ids: &[&str]) -> Self {
            let remote = Self::default();
            remote
                .present
                .lock()
                .unwrap()
                .extend(ids.iter().map(|s| (*s).to_owned()));
            remote
        }
    }

    impl RemoteResource for FakeRemote {
        type Object = String;

        fn resource_type(&self) -> &str {
            "fake_key"
        }

        fn display_name(&self) -> &str {
            "Fake Key"
        }

        async fn find(&self, _ctx: &CallContext, id: &str) -> Result<String, LookupError> {
            self.lookups.lock().unwrap().push(id.to_owned());
            if let Some(reason) = self.broken.lock().unwrap().get(id) {
                return Err(LookupError::Remote(reason.clone()));
            }
            if self.present.lock().unwrap().contains(id) {
                Ok(id.to_owned())
            } else {
                Err(LookupError::not_found("fake_key", id))
            }
        }

        async fn delete(&self, _ctx: &CallContext, id: &str) -> Result<(), LookupError> {
            if self.present.lock().unwrap().remove(id) {
                Ok(())
            } else {
                Err(LookupError::not_found("fake_key", id))
            }
        }
    }

    fn state(entries: &[(&str, &str, &str)]) -> TrackedState {
        let mut state = TrackedState::new();
        for (ty, name, id) in entries {
            state.insert(ManagedResourceInstance::new(
                ResourceAddress::new(*ty, *name),
                *id,
                AttributeBag::new(),
            ));
        }
        state
    }

    #[tokio::test]
    async fn exists_returns_object_with_tracked_id() {
        let remote = FakeRemote::with(&["K1"]);
        let st = state(&[("fake_key", "test", "K1")]);
        let obj = assert_exists(
            &remote,
            &CallContext::new(),
            &st,
            &ResourceAddress::new("fake_key", "test"),
        )
        .await
        .unwrap();
        assert_eq!(obj, "K1");
    }

    #[tokio::test]
    async fn exists_fails_for_untracked_name_without_lookup() {
        let remote = FakeRemote::with(&["K1"]);
        let st = state(&[]);
        let err = assert_exists(
            &remote,
            &CallContext::new(),
            &st,
            &ResourceAddress::new("fake_key", "test"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "not found: fake_key.test");
        assert!(matches!(err, HarnessError::Tracking(TrackingError::NotTracked { .. })));
        assert!(remote.lookups.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn exists_surfaces_not_found() {
        let remote = FakeRemote::default();
        let st = state(&[("fake_key", "test", "K1")]);
        let err = assert_exists(
            &remote,
            &CallContext::new(),
            &st,
            &ResourceAddress::new("fake_key", "test"),
        )
        .await
        .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn destroyed_checks_every_instance_of_type() {
        let remote = FakeRemote::default();
        let st = state(&[
            ("fake_key", "a", "K1"),
            ("fake_key", "b", "K2"),
            ("other_type", "c", "X1"),
        ]);
        assert_destroyed(&remote, &CallContext::new(), &st)
            .await
            .unwrap();
        assert_eq!(*remote.lookups.lock().unwrap(), vec!["K1", "K2"]);
    }

    #[tokio::test]
    async fn destroyed_fails_fast_on_leak() {
        let remote = FakeRemote::with(&["K1", "K2"]);
        let st = state(&[("fake_key", "a", "K1"), ("fake_key", "b", "K2")]);
        let err = assert_destroyed(&remote, &CallContext::new(), &st)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Fake Key K1 still exists");
        assert_eq!(remote.lookups.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn destroyed_finds_leak_after_absent_instances() {
        let remote = FakeRemote::with(&["K2"]);
        let st = state(&[("fake_key", "a", "K1"), ("fake_key", "b", "K2")]);
        let err = assert_destroyed(&remote, &CallContext::new(), &st)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HarnessError::Assertion(AssertionError::StillExists { ref id, .. }) if id == "K2"
        ));
    }

    #[tokio::test]
    async fn destroyed_propagates_remote_errors() {
        let remote = FakeRemote::default();
        remote
            .broken
            .lock()
            .unwrap()
            .insert("K1".to_owned(), "access denied".to_owned());
        let st = state(&[("fake_key", "a", "K1")]);
        let err = assert_destroyed(&remote, &CallContext::new(), &st)
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::Lookup(LookupError::Remote(_))));
    }

    #[tokio::test]
    async fn disappear_deletes_remote_object() {
        let remote = Arc::new(FakeRemote::with(&["K1"]));
        let st = state(&[("fake_key", "test", "K1")]);
        let address = ResourceAddress::new("fake_key", "test");
        let ctx = CallContext::new();

        exists(&remote, &address).check(&ctx, &st).await.unwrap();
        disappears(&remote, &address).check(&ctx, &st).await.unwrap();
        assert!(remote.present.lock().unwrap().is_empty());
        destroyed(&remote).check(&ctx, &st).await.unwrap();
    }

    #[tokio::test]
    async fn cancelled_context_propagates_from_find() {
        struct Slow;

        impl RemoteResource for Slow {
            type Object = ();

            fn resource_type(&self) -> &str {
                "fake_key"
            }

            fn display_name(&self) -> &str {
                "Fake Key"
            }

            async fn find(&self, ctx: &CallContext, _id: &str) -> Result<(), LookupError> {
                ctx.run(std::future::pending()).await
            }

            async fn delete(&self, _ctx: &CallContext, _id: &str) -> Result<(), LookupError> {
                Ok(())
            }
        }

        let ctx = CallContext::new();
        ctx.cancel();
        let st = state(&[("fake_key", "a", "K1")]);
        let err = assert_destroyed(&Slow, &ctx, &st).await.unwrap_err();
        assert!(matches!(err, HarnessError::Lookup(LookupError::Cancelled)));
    }
}
