//! CDN public key 생명주기 시나리오
//!
//! | 시나리오 | 흐름 |
//! |----------|------|
//! | `public_key_basic` | 생성 → 속성 검증 → import 검증 |
//! | `public_key_disappears` | 생성 → 외부 삭제 → 비어 있지 않은 plan 확인 |
//! | `public_key_name_prefix` | 접두어로 생성 → 이름 패턴 검증 → import 검증 (`name_prefix` 제외) |
//! | `public_key_update` | comment 1 → import 검증 → comment 2 (식별자 유지) |
//!
//! 모든 시나리오는 teardown 후 destroy 검증을 실행합니다.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;

use driftwatch_core::config::HarnessConfig;
use driftwatch_core::remote::{BoxFuture, CallContext};
use driftwatch_core::types::ResourceAddress;
use driftwatch_harness::check::{CheckBundle, IdPin, attr_equals, attr_matches, attr_set};
use driftwatch_harness::document::Renderer;
use driftwatch_harness::engine::LocalEngine;
use driftwatch_harness::error::HarnessError;
use driftwatch_harness::lookup::{destroyed, disappears, exists};
use driftwatch_harness::naming::random_with_prefix;
use driftwatch_harness::runner::run_scenarios;
use driftwatch_harness::scenario::{PreCheck, Scenario, ScenarioReport};
use driftwatch_harness::step::{ApplyStep, ImportStep};

use crate::client::CdnClient;
use crate::configs::{
    EXAMPLE_NAME, FIXTURE_PATH, TEST_NAME, config_basic, config_comment, config_name_prefix,
};
use crate::provider::{PublicKeyProvider, attr};
use crate::public_key::{PublicKeyResource, RESOURCE_TYPE};

/// 기본 시나리오 이름
pub const BASIC: &str = "public_key_basic";
/// 외부 삭제 시나리오 이름
pub const DISAPPEARS: &str = "public_key_disappears";
/// 이름 접두어 시나리오 이름
pub const NAME_PREFIX: &str = "public_key_name_prefix";
/// 제자리 갱신 시나리오 이름
pub const UPDATE: &str = "public_key_update";

/// 등록된 시나리오 이름 (실행 순서)
pub const SCENARIO_NAMES: [&str; 4] = [BASIC, DISAPPEARS, NAME_PREFIX, UPDATE];

/// 원격 도달 가능성과 fixture 존재를 확인하는 사전 검사
pub struct CdnPreCheck<C> {
    client: Arc<C>,
    fixture: PathBuf,
}

impl<C: CdnClient> CdnPreCheck<C> {
    /// `fixture`는 읽을 수 있어야 하는 PEM 파일 경로입니다.
    pub fn new(client: Arc<C>, fixture: impl Into<PathBuf>) -> Self {
        Self {
            client,
            fixture: fixture.into(),
        }
    }
}

impl<C: CdnClient> PreCheck for CdnPreCheck<C> {
    fn run<'a>(&'a self, ctx: &'a CallContext) -> BoxFuture<'a, Result<(), HarnessError>> {
        Box::pin(async move {
            self.client
                .ping(ctx)
                .await
                .map_err(|e| HarnessError::PreCheck(e.to_string()))?;
            tokio::fs::metadata(&self.fixture).await.map_err(|e| {
                HarnessError::PreCheck(format!(
                    "fixture {} is not readable: {e}",
                    self.fixture.display()
                ))
            })?;
            Ok::<(), HarnessError>(())
        })
    }
}

/// CDN public key 시나리오 모음
///
/// 클라이언트, 이름 접두어, fixture 기준 디렉토리를 명시적으로 보관하며
/// 전역 상태를 사용하지 않습니다.
pub struct PublicKeySuite<C: CdnClient> {
    client: Arc<C>,
    resource: Arc<PublicKeyResource<C>>,
    resource_prefix: String,
    fixture_root: PathBuf,
}

impl<C: CdnClient> PublicKeySuite<C> {
    /// 새 시나리오 모음을 생성합니다.
    pub fn new(
        client: Arc<C>,
        resource_prefix: impl Into<String>,
        fixture_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            resource: Arc::new(PublicKeyResource::new(Arc::clone(&client))),
            client,
            resource_prefix: resource_prefix.into(),
            fixture_root: fixture_root.into(),
        }
    }

    /// `[harness]` 설정으로 생성합니다.
    pub fn from_config(client: Arc<C>, config: &HarnessConfig) -> Self {
        Self::new(client, &config.resource_prefix, &config.fixture_root)
    }

    /// 원격 클라이언트
    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// fixture 기준 디렉토리
    pub fn fixture_root(&self) -> &Path {
        &self.fixture_root
    }

    /// 시나리오마다 새 참조 오케스트레이터를 생성합니다.
    pub fn orchestrator(&self) -> LocalEngine<PublicKeyProvider<C>> {
        LocalEngine::new(
            Arc::new(PublicKeyProvider::new(Arc::clone(&self.client))),
            Renderer::new(&self.fixture_root),
        )
    }

    fn pre_check(&self) -> Arc<dyn PreCheck> {
        Arc::new(CdnPreCheck::new(
            Arc::clone(&self.client),
            self.fixture_root.join(FIXTURE_PATH),
        ))
    }

    fn random_name(&self) -> String {
        random_with_prefix(&self.resource_prefix)
    }

    /// 이름으로 시나리오를 생성합니다. 알 수 없는 이름이면 `None`입니다.
    ///
    /// 생성할 때마다 새 무작위 이름을 사용합니다.
    pub fn scenario(&self, name: &str) -> Option<Result<Scenario, HarnessError>> {
        match name {
            BASIC => Some(self.basic()),
            DISAPPEARS => Some(self.disappears()),
            NAME_PREFIX => Some(self.name_prefix()),
            UPDATE => Some(self.update()),
            _ => None,
        }
    }

    /// 등록된 모든 시나리오를 생성합니다.
    pub fn scenarios(&self) -> Result<Vec<Scenario>, HarnessError> {
        SCENARIO_NAMES
            .iter()
            .filter_map(|name| self.scenario(name))
            .collect()
    }

    /// 생성 → 속성 검증 → import 검증
    pub fn basic(&self) -> Result<Scenario, HarnessError> {
        let r_name = self.random_name();
        let addr = ResourceAddress::new(RESOURCE_TYPE, TEST_NAME);

        Scenario::builder(BASIC)
            .description("create a public key with an explicit name and import it")
            .pre_check(self.pre_check())
            .step(
                ApplyStep::new(config_basic(&r_name)).checks(CheckBundle::aggregate(vec![
                    exists(&self.resource, &addr),
                    attr_set(&addr, attr::CALLER_REFERENCE),
                    attr_equals(&addr, attr::COMMENT, ""),
                    attr_set(&addr, attr::ENCODED_KEY),
                    attr_set(&addr, attr::ETAG),
                    attr_equals(&addr, attr::NAME, r_name.as_str()),
                ])),
            )
            .step(ImportStep::new(addr))
            .check_destroy(destroyed(&self.resource))
            .build()
    }

    /// 생성 → 외부 삭제 → 비어 있지 않은 plan
    pub fn disappears(&self) -> Result<Scenario, HarnessError> {
        let r_name = self.random_name();
        let addr = ResourceAddress::new(RESOURCE_TYPE, TEST_NAME);

        Scenario::builder(DISAPPEARS)
            .description("delete the public key out-of-band and expect the next plan to recreate it")
            .pre_check(self.pre_check())
            .step(
                ApplyStep::new(config_basic(&r_name))
                    .checks(CheckBundle::fail_fast(vec![
                        exists(&self.resource, &addr),
                        disappears(&self.resource, &addr),
                    ]))
                    .expect_non_empty_plan(),
            )
            .check_destroy(destroyed(&self.resource))
            .build()
    }

    /// 접두어로 생성 → 이름 패턴 검증 → import 검증
    pub fn name_prefix(&self) -> Result<Scenario, HarnessError> {
        let prefix = format!("{}-", self.resource_prefix);
        let addr = ResourceAddress::new(RESOURCE_TYPE, EXAMPLE_NAME);
        let pattern = Regex::new(&format!("^{}", regex::escape(&prefix))).map_err(|e| {
            HarnessError::InvalidScenario {
                scenario: NAME_PREFIX.to_owned(),
                reason: e.to_string(),
            }
        })?;

        Scenario::builder(NAME_PREFIX)
            .description("generate the name from a prefix; the prefix itself does not round-trip")
            .pre_check(self.pre_check())
            .step(
                ApplyStep::new(config_name_prefix(&prefix)).checks(CheckBundle::aggregate(vec![
                    exists(&self.resource, &addr),
                    attr_matches(&addr, attr::NAME, pattern),
                ])),
            )
            .step(ImportStep::new(addr).ignore([attr::NAME_PREFIX]))
            .check_destroy(destroyed(&self.resource))
            .build()
    }

    /// comment 1 → import 검증 → comment 2 (식별자 유지)
    pub fn update(&self) -> Result<Scenario, HarnessError> {
        let r_name = self.random_name();
        let addr = ResourceAddress::new(RESOURCE_TYPE, TEST_NAME);
        let pin = IdPin::new(&addr);

        Scenario::builder(UPDATE)
            .description("update the comment in place without replacing the key")
            .pre_check(self.pre_check())
            .step(
                ApplyStep::new(config_comment(&r_name, "comment 1")).checks(
                    CheckBundle::aggregate(vec![
                        exists(&self.resource, &addr),
                        attr_equals(&addr, attr::COMMENT, "comment 1"),
                        attr_equals(&addr, attr::NAME, r_name.as_str()),
                        pin.record(),
                    ]),
                ),
            )
            .step(ImportStep::new(addr.clone()))
            .step(
                ApplyStep::new(config_comment(&r_name, "comment 2")).checks(
                    CheckBundle::aggregate(vec![
                        exists(&self.resource, &addr),
                        attr_equals(&addr, attr::COMMENT, "comment 2"),
                        attr_equals(&addr, attr::NAME, r_name.as_str()),
                        pin.unchanged(),
                    ]),
                ),
            )
            .check_destroy(destroyed(&self.resource))
            .build()
    }

    /// 시나리오를 병렬로 실행합니다.
    pub async fn run(
        &self,
        scenarios: Vec<Scenario>,
        max_parallel: usize,
        ctx: &CallContext,
    ) -> Vec<ScenarioReport> {
        let client = Arc::clone(&self.client);
        let fixture_root = self.fixture_root.clone();

        run_scenarios(
            scenarios.into_iter().map(Arc::new).collect(),
            move |_scenario| {
                LocalEngine::new(
                    Arc::new(PublicKeyProvider::new(Arc::clone(&client))),
                    Renderer::new(&fixture_root),
                )
            },
            max_parallel,
            ctx,
        )
        .await
    }
}
