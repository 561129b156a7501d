//! 병렬 시나리오 실행기
//!
//! 여러 시나리오를 세마포어로 제한된 폭만큼 동시에 실행합니다. 시나리오마다
//! 새 오케스트레이터와 자식 [`CallContext`]를 사용하므로 시나리오 간에 공유되는
//! 가변 상태는 원격 시스템뿐입니다.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error};

use driftwatch_core::remote::CallContext;

use crate::orchestrator::Orchestrator;
use crate::scenario::{Scenario, ScenarioOutcome, ScenarioReport};
use crate::sequencer::run_scenario;

/// 시나리오를 병렬로 실행하고 입력 순서대로 보고서를 반환합니다.
///
/// `make_orchestrator`는 시나리오마다 한 번 호출됩니다.
/// `max_parallel`이 0이면 1로 취급합니다.
pub async fn run_scenarios<O, F>(
    scenarios: Vec<Arc<Scenario>>,
    make_orchestrator: F,
    max_parallel: usize,
    ctx: &CallContext,
) -> Vec<ScenarioReport>
where
    O: Orchestrator + 'static,
    F: Fn(&Scenario) -> O + Send + Sync + 'static,
{
    let semaphore = Arc::new(Semaphore::new(max_parallel.max(1)));
    let make_orchestrator = Arc::new(make_orchestrator);
    let mut tasks = JoinSet::new();
    let names: Vec<String> = scenarios.iter().map(|s| s.name().to_owned()).collect();

    for (index, scenario) in scenarios.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let make_orchestrator = Arc::clone(&make_orchestrator);
        let ctx = ctx.child();

        tasks.spawn(async move {
            // 세마포어는 닫지 않으므로 acquire는 실패하지 않음
            let _permit = semaphore.acquire_owned().await.ok();
            debug!(scenario = scenario.name(), "scenario slot acquired");
            let mut orchestrator = make_orchestrator(&scenario);
            let report = run_scenario(&scenario, &mut orchestrator, &ctx).await;
            (index, report)
        });
    }

    let mut reports: Vec<Option<ScenarioReport>> = vec![None; names.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, report)) => {
                if let Some(slot) = reports.get_mut(index) {
                    *slot = Some(report);
                }
            }
            Err(e) => error!(error = %e, "scenario task failed"),
        }
    }

    reports
        .into_iter()
        .zip(names)
        .map(|(report, name)| {
            report.unwrap_or_else(|| ScenarioReport {
                name,
                outcome: ScenarioOutcome::Failed,
                steps_completed: 0,
                failure: Some("scenario task did not complete".to_owned()),
                destroy_failure: None,
                elapsed_ms: 0,
            })
        })
        .collect()
}
