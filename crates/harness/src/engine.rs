//! 참조 오케스트레이터: 단일 리소스 유형을 수렴시키는 로컬 plan/apply 엔진
//!
//! [`LocalEngine`]은 [`ResourceProvider`] 하나를 구동하여 선언 문서를 원격 상태로
//! 수렴시킵니다. 하네스가 실제 배포 도구 없이 시나리오를 끝까지 실행할 수 있도록
//! 필요한 만큼만 구현되어 있습니다.
//!
//! # 수렴 절차
//!
//! ```text
//! render ──▶ refresh ──▶ diff ──▶ (create | update | replace | delete)*
//! ```
//!
//! - refresh: 추적 중인 인스턴스를 provider `read`로 다시 읽습니다.
//!   `NotFound`는 drift로 기록되고 인스턴스가 상태에서 빠집니다.
//! - diff: 선언된 키만 비교합니다. `force_new` 속성이 바뀌면 Replace가 됩니다.
//! - write-only 속성은 원격에서 읽을 수 없으므로 이전 상태 값을 유지합니다.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, warn};

use driftwatch_core::error::LookupError;
use driftwatch_core::metrics as m;
use driftwatch_core::remote::CallContext;
use driftwatch_core::types::{AttributeBag, ID_ATTRIBUTE, ManagedResourceInstance, ResourceAddress, TrackedState};

use crate::document::Renderer;
use crate::error::HarnessError;
use crate::orchestrator::{ChangeAction, Orchestrator, Plan, PlannedChange};

/// 속성 존재 규칙
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// 반드시 선언해야 함
    Required,
    /// 선언하지 않으면 빈 값
    Optional,
    /// 선언하지 않으면 원격이 값을 결정
    OptionalComputed,
    /// 원격만 값을 결정 (선언 불가)
    Computed,
}

/// 속성 스키마
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSchema {
    /// 속성 이름
    pub name: String,
    /// 존재 규칙
    pub presence: Presence,
    /// 값이 바뀌면 교체가 필요한지 여부
    pub force_new: bool,
    /// 원격에서 읽을 수 없는 생성 힌트인지 여부
    pub write_only: bool,
}

impl AttributeSchema {
    fn new(name: impl Into<String>, presence: Presence) -> Self {
        Self {
            name: name.into(),
            presence,
            force_new: false,
            write_only: false,
        }
    }

    /// 필수 속성
    pub fn required(name: impl Into<String>) -> Self {
        Self::new(name, Presence::Required)
    }

    /// 선택 속성
    pub fn optional(name: impl Into<String>) -> Self {
        Self::new(name, Presence::Optional)
    }

    /// 선택 + 계산 속성
    pub fn optional_computed(name: impl Into<String>) -> Self {
        Self::new(name, Presence::OptionalComputed)
    }

    /// 계산 전용 속성
    pub fn computed(name: impl Into<String>) -> Self {
        Self::new(name, Presence::Computed)
    }

    /// 값 변경 시 교체하도록 표시합니다.
    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// write-only로 표시합니다.
    pub fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }
}

/// 리소스 스키마
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSchema {
    attributes: Vec<AttributeSchema>,
}

impl ResourceSchema {
    /// 속성 목록으로 스키마를 생성합니다.
    pub fn new(attributes: Vec<AttributeSchema>) -> Self {
        Self { attributes }
    }

    /// 이름으로 속성 스키마를 조회합니다.
    pub fn attribute(&self, name: &str) -> Option<&AttributeSchema> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// 모든 속성 스키마
    pub fn attributes(&self) -> impl Iterator<Item = &AttributeSchema> {
        self.attributes.iter()
    }

    /// write-only 속성 이름
    pub fn write_only_keys(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .iter()
            .filter(|a| a.write_only)
            .map(|a| a.name.as_str())
    }

    /// 선언된 속성을 스키마에 대해 검증합니다.
    pub fn validate(
        &self,
        address: &ResourceAddress,
        desired: &AttributeBag,
    ) -> Result<(), HarnessError> {
        for key in desired.keys() {
            match self.attribute(key) {
                None => {
                    return Err(HarnessError::Render(format!(
                        "{address}: unsupported attribute '{key}'"
                    )));
                }
                Some(attr) if attr.presence == Presence::Computed => {
                    return Err(HarnessError::Render(format!(
                        "{address}: attribute '{key}' is computed and cannot be set"
                    )));
                }
                Some(_) => {}
            }
        }

        for attr in &self.attributes {
            if attr.presence == Presence::Required && !desired.contains_key(&attr.name) {
                return Err(HarnessError::Render(format!(
                    "{address}: missing required attribute '{}'",
                    attr.name
                )));
            }
        }

        Ok(())
    }

    /// 선언과 현재 인스턴스의 차이를 계산합니다.
    ///
    /// 값이 다른 키 목록과 교체 필요 여부를 반환합니다.
    fn diff(&self, desired: &AttributeBag, current: &ManagedResourceInstance) -> (Vec<String>, bool) {
        let mut changed = Vec::new();
        let mut replace = false;

        for attr in &self.attributes {
            let wanted = match (desired.get(&attr.name), attr.presence) {
                (_, Presence::Computed) => continue,
                (Some(value), _) => value.as_str(),
                (None, Presence::Optional) => "",
                (None, _) => continue,
            };
            let actual = current.attribute(&attr.name).unwrap_or("");
            if wanted != actual {
                changed.push(attr.name.clone());
                replace |= attr.force_new;
            }
        }

        (changed, replace)
    }
}

/// 리소스 유형 하나의 CRUD를 담당하는 provider
///
/// 모든 원격 실패는 [`LookupError`]로 보고합니다. 객체가 없으면 `NotFound`입니다.
pub trait ResourceProvider: Send + Sync + 'static {
    /// 리소스 유형 이름
    fn resource_type(&self) -> &str;

    /// 속성 스키마
    fn schema(&self) -> &ResourceSchema;

    /// 스키마로 표현되지 않는 선언 규칙을 검증합니다.
    fn validate(&self, _desired: &AttributeBag) -> Result<(), String> {
        Ok(())
    }

    /// 원격 객체를 생성하고 (식별자, 관측 속성)을 반환합니다.
    fn create(
        &self,
        ctx: &CallContext,
        desired: &AttributeBag,
    ) -> impl Future<Output = Result<(String, AttributeBag), LookupError>> + Send;

    /// 원격 객체를 읽습니다.
    fn read(
        &self,
        ctx: &CallContext,
        id: &str,
    ) -> impl Future<Output = Result<AttributeBag, LookupError>> + Send;

    /// 원격 객체를 제자리 갱신합니다.
    fn update(
        &self,
        ctx: &CallContext,
        id: &str,
        prior: &AttributeBag,
        desired: &AttributeBag,
    ) -> impl Future<Output = Result<AttributeBag, LookupError>> + Send;

    /// 원격 객체를 삭제합니다.
    fn delete(
        &self,
        ctx: &CallContext,
        id: &str,
        prior: &AttributeBag,
    ) -> impl Future<Output = Result<(), LookupError>> + Send;
}

/// 로컬 참조 오케스트레이터
pub struct LocalEngine<P: ResourceProvider> {
    provider: Arc<P>,
    renderer: Renderer,
    state: TrackedState,
}

impl<P: ResourceProvider> LocalEngine<P> {
    /// provider와 렌더러로 엔진을 생성합니다.
    pub fn new(provider: Arc<P>, renderer: Renderer) -> Self {
        Self {
            provider,
            renderer,
            state: TrackedState::new(),
        }
    }

    /// 구동 중인 provider
    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// 문서를 렌더링하고 선언을 검증합니다.
    async fn declarations(
        &self,
        config: &str,
    ) -> Result<BTreeMap<ResourceAddress, AttributeBag>, HarnessError> {
        let resource_type = self.provider.resource_type();
        let mut declared = BTreeMap::new();

        for decl in self.renderer.render(config).await? {
            if decl.address.resource_type != resource_type {
                return Err(HarnessError::Render(format!(
                    "{}: unsupported resource type (engine manages '{resource_type}')",
                    decl.address
                )));
            }
            self.provider.schema().validate(&decl.address, &decl.attributes)?;
            self.provider
                .validate(&decl.attributes)
                .map_err(|reason| HarnessError::Render(format!("{}: {reason}", decl.address)))?;
            declared.insert(decl.address, decl.attributes);
        }

        Ok(declared)
    }

    /// 관측 속성에 write-only 값을 합쳐 인스턴스를 만듭니다.
    fn instance(
        &self,
        address: ResourceAddress,
        id: String,
        mut observed: AttributeBag,
        write_only_source: &AttributeBag,
    ) -> ManagedResourceInstance {
        for key in self.provider.schema().write_only_keys() {
            if let Some(value) = write_only_source.get(key) {
                observed.insert(key.to_owned(), value.clone());
            }
        }
        ManagedResourceInstance::new(address, id, observed)
    }

    /// 추적 중인 인스턴스를 원격 상태로 갱신합니다.
    async fn refresh(&self, ctx: &CallContext) -> Result<TrackedState, HarnessError> {
        let mut refreshed = TrackedState::new();

        for tracked in self.state.iter() {
            metrics::counter!(
                m::REMOTE_LOOKUPS_TOTAL,
                m::LABEL_RESOURCE_TYPE => tracked.resource_type().to_owned()
            )
            .increment(1);

            match self.provider.read(ctx, &tracked.id).await {
                Ok(observed) => {
                    refreshed.insert(self.instance(
                        tracked.address.clone(),
                        tracked.id.clone(),
                        observed,
                        &tracked.attributes,
                    ));
                }
                Err(e) if e.is_not_found() => {
                    warn!(
                        address = %tracked.address,
                        id = %tracked.id,
                        "tracked object no longer exists remotely, dropping from state"
                    );
                    metrics::counter!(
                        m::DRIFT_DETECTED_TOTAL,
                        m::LABEL_RESOURCE_TYPE => tracked.resource_type().to_owned()
                    )
                    .increment(1);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(refreshed)
    }

    /// 선언과 상태의 차이를 계산합니다.
    fn diff(
        &self,
        declared: &BTreeMap<ResourceAddress, AttributeBag>,
        state: &TrackedState,
    ) -> Plan {
        let schema = self.provider.schema();
        let mut changes = Vec::new();

        for (address, desired) in declared {
            match state.get(address) {
                None => changes.push(PlannedChange {
                    address: address.clone(),
                    action: ChangeAction::Create,
                    changed_keys: Vec::new(),
                }),
                Some(current) => {
                    let (changed_keys, replace) = schema.diff(desired, current);
                    if changed_keys.is_empty() {
                        continue;
                    }
                    changes.push(PlannedChange {
                        address: address.clone(),
                        action: if replace {
                            ChangeAction::Replace
                        } else {
                            ChangeAction::Update
                        },
                        changed_keys,
                    });
                }
            }
        }

        for tracked in state.iter() {
            if !declared.contains_key(&tracked.address) {
                changes.push(PlannedChange {
                    address: tracked.address.clone(),
                    action: ChangeAction::Delete,
                    changed_keys: Vec::new(),
                });
            }
        }

        Plan { changes }
    }

    /// 원격 객체를 삭제합니다. 이미 없으면 성공입니다.
    async fn delete_remote(
        &self,
        ctx: &CallContext,
        instance: &ManagedResourceInstance,
    ) -> Result<(), HarnessError> {
        match self
            .provider
            .delete(ctx, &instance.id, &instance.attributes)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                debug!(address = %instance.address, id = %instance.id, "object already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn create_remote(
        &mut self,
        ctx: &CallContext,
        address: &ResourceAddress,
        desired: &AttributeBag,
    ) -> Result<(), HarnessError> {
        let (id, observed) = self.provider.create(ctx, desired).await?;
        info!(address = %address, id = %id, "created");
        let instance = self.instance(address.clone(), id, observed, desired);
        self.state.insert(instance);
        Ok(())
    }

    async fn apply_change(
        &mut self,
        ctx: &CallContext,
        change: &PlannedChange,
        declared: &BTreeMap<ResourceAddress, AttributeBag>,
    ) -> Result<(), HarnessError> {
        let address = &change.address;
        let desired = declared.get(address);

        match (change.action, desired) {
            (ChangeAction::Create, Some(desired)) => {
                self.create_remote(ctx, address, desired).await
            }
            (ChangeAction::Update, Some(desired)) => {
                let prior = self.state.require(address)?.clone();
                let observed = self
                    .provider
                    .update(ctx, &prior.id, &prior.attributes, desired)
                    .await?;
                info!(address = %address, id = %prior.id, keys = ?change.changed_keys, "updated in place");
                let instance = self.instance(address.clone(), prior.id, observed, desired);
                self.state.insert(instance);
                Ok(())
            }
            (ChangeAction::Replace, Some(desired)) => {
                let prior = self.state.require(address)?.clone();
                self.delete_remote(ctx, &prior).await?;
                self.state.remove(address);
                info!(address = %address, id = %prior.id, keys = ?change.changed_keys, "replacing");
                self.create_remote(ctx, address, desired).await
            }
            (ChangeAction::Delete, _) => {
                if let Some(prior) = self.state.get(address).cloned() {
                    self.delete_remote(ctx, &prior).await?;
                    self.state.remove(address);
                    info!(address = %address, id = %prior.id, "deleted");
                }
                Ok(())
            }
            (action, None) => Err(HarnessError::Orchestrator(format!(
                "{address}: planned {action} without a declaration"
            ))),
        }
    }
}

impl<P: ResourceProvider> Orchestrator for LocalEngine<P> {
    async fn apply(&mut self, ctx: &CallContext, config: &str) -> Result<(), HarnessError> {
        let declared = self.declarations(config).await?;
        self.state = self.refresh(ctx).await?;

        let plan = self.diff(&declared, &self.state);
        debug!(plan = %plan, "applying");

        for change in &plan.changes {
            self.apply_change(ctx, change, &declared).await?;
        }

        Ok(())
    }

    async fn plan(&self, ctx: &CallContext, config: &str) -> Result<Plan, HarnessError> {
        let declared = self.declarations(config).await?;
        let refreshed = self.refresh(ctx).await?;
        Ok(self.diff(&declared, &refreshed))
    }

    async fn import(
        &self,
        ctx: &CallContext,
        address: &ResourceAddress,
        id: &str,
    ) -> Result<ManagedResourceInstance, HarnessError> {
        if address.resource_type != self.provider.resource_type() {
            return Err(HarnessError::Orchestrator(format!(
                "{address}: cannot import into unsupported resource type"
            )));
        }

        let mut observed = self.provider.read(ctx, id).await?;
        observed.remove(ID_ATTRIBUTE);
        debug!(address = %address, id = id, "imported");
        Ok(ManagedResourceInstance::new(address.clone(), id, observed))
    }

    fn state(&self) -> &TrackedState {
        &self.state
    }

    async fn destroy(&mut self, ctx: &CallContext) -> Result<(), HarnessError> {
        let tracked: Vec<ManagedResourceInstance> = self.state.iter().cloned().collect();
        let mut first_error = None;

        for instance in tracked {
            match self.delete_remote(ctx, &instance).await {
                Ok(()) => {
                    self.state.remove(&instance.address);
                    info!(address = %instance.address, id = %instance.id, "destroyed");
                }
                Err(e) => {
                    warn!(address = %instance.address, id = %instance.id, error = %e, "destroy failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
