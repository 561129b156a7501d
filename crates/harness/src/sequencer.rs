//! 생명주기 단계 시퀀서
//!
//! 시나리오 하나를 명시적인 상태 전이 표에 따라 실행합니다.
//!
//! ```text
//!            ┌──────────────────────────────────────────────┐
//!            ▼                                              │
//! Init ──▶ Applying ──▶ Verifying ──▶ ImportVerifying ──────┘
//!  │          │            │   ▲            │   ▲  │
//!  │          │            └───┼────────────┼───┘  │
//!  ▼          ▼            ▼   │            ▼      │
//!  └──────▶ TearingDown ◀──────┴────────────┘◀─────┘
//!               │
//!               ▼
//!             Done
//! ```
//!
//! - 단계 실패는 시나리오 전체를 중단시키며 재시도하지 않습니다.
//! - 어떤 상태에서든 TearingDown으로 갈 수 있으므로 destroy와 destroy 검증은
//!   항상 실행됩니다.
//! - destroy 검증은 destroy 직전의 추적 상태 스냅샷을 대상으로 합니다.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{Instrument, error, info, info_span, warn};

use driftwatch_core::error::AssertionError;
use driftwatch_core::metrics as m;
use driftwatch_core::remote::CallContext;

use crate::error::HarnessError;
use crate::orchestrator::Orchestrator;
use crate::scenario::{Scenario, ScenarioOutcome, ScenarioReport};
use crate::step::{ApplyStep, ImportStep, LifecycleStep};

/// 시퀀서 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// 시작 전
    Init,
    /// 설정 적용 중
    Applying,
    /// 단계 검증 중
    Verifying,
    /// import 검증 중
    ImportVerifying,
    /// destroy 및 destroy 검증 중
    TearingDown,
    /// 종료
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Applying => "applying",
            Self::Verifying => "verifying",
            Self::ImportVerifying => "import_verifying",
            Self::TearingDown => "tearing_down",
            Self::Done => "done",
        };
        write!(f, "{name}")
    }
}

/// 허용된 상태 전이
pub const TRANSITIONS: &[(Phase, Phase)] = &[
    (Phase::Init, Phase::Applying),
    (Phase::Init, Phase::TearingDown),
    (Phase::Applying, Phase::Verifying),
    (Phase::Applying, Phase::TearingDown),
    (Phase::Verifying, Phase::Applying),
    (Phase::Verifying, Phase::ImportVerifying),
    (Phase::Verifying, Phase::TearingDown),
    (Phase::ImportVerifying, Phase::Applying),
    (Phase::ImportVerifying, Phase::ImportVerifying),
    (Phase::ImportVerifying, Phase::TearingDown),
    (Phase::TearingDown, Phase::Done),
];

/// 전이 표를 강제하는 상태 기계
#[derive(Debug)]
pub struct StepMachine {
    phase: Phase,
}

impl Default for StepMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StepMachine {
    /// Init 상태로 생성합니다.
    pub fn new() -> Self {
        Self { phase: Phase::Init }
    }

    /// 현재 상태
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// 전이가 허용되는지 확인합니다.
    pub fn can_advance(&self, to: Phase) -> bool {
        TRANSITIONS.contains(&(self.phase, to))
    }

    /// 다음 상태로 전이합니다.
    ///
    /// # Errors
    ///
    /// 표에 없는 전이면 `HarnessError::IllegalTransition`
    pub fn advance(&mut self, to: Phase) -> Result<(), HarnessError> {
        if !self.can_advance(to) {
            return Err(HarnessError::IllegalTransition {
                from: self.phase.to_string(),
                to: to.to_string(),
            });
        }
        self.phase = to;
        Ok(())
    }
}

/// 단계 실패 정보
struct StepFailure {
    completed: usize,
    message: String,
}

/// 시나리오 하나를 실행합니다.
///
/// 단계는 순차 실행되며, 결과와 무관하게 teardown이 실행됩니다.
/// 반환된 보고서가 시나리오의 통과/실패와 실패 메시지를 담습니다.
pub async fn run_scenario<O: Orchestrator>(
    scenario: &Scenario,
    orchestrator: &mut O,
    ctx: &CallContext,
) -> ScenarioReport {
    let span = info_span!("scenario", scenario = scenario.name());
    run_scenario_inner(scenario, orchestrator, ctx)
        .instrument(span)
        .await
}

async fn run_scenario_inner<O: Orchestrator>(
    scenario: &Scenario,
    orchestrator: &mut O,
    ctx: &CallContext,
) -> ScenarioReport {
    let started = Instant::now();
    let mut machine = StepMachine::new();
    info!(steps = scenario.steps().len(), "scenario started");

    let step_result = run_steps(scenario, orchestrator, ctx, &mut machine).await;
    let (steps_completed, failure) = match step_result {
        Ok(completed) => (completed, None),
        Err(f) => {
            error!(error = %f.message, "scenario step failed");
            (f.completed, Some(f.message))
        }
    };

    let destroy_failure = match machine.advance(Phase::TearingDown) {
        Ok(()) => teardown(scenario, orchestrator, ctx).await,
        Err(e) => Some(e.to_string()),
    };
    if let Err(e) = machine.advance(Phase::Done) {
        warn!(error = %e, "sequencer did not reach done");
    }

    let outcome = if failure.is_none() && destroy_failure.is_none() {
        ScenarioOutcome::Passed
    } else {
        ScenarioOutcome::Failed
    };
    let elapsed = started.elapsed();

    metrics::counter!(
        m::SCENARIOS_TOTAL,
        m::LABEL_SCENARIO => scenario.name().to_owned(),
        m::LABEL_RESULT => outcome.to_string()
    )
    .increment(1);
    metrics::histogram!(m::SCENARIO_DURATION_SECONDS).record(elapsed.as_secs_f64());

    let elapsed_ms = saturating_millis(elapsed);
    info!(
        outcome = %outcome,
        steps_completed,
        elapsed_ms,
        "scenario finished"
    );

    ScenarioReport {
        name: scenario.name().to_owned(),
        outcome,
        steps_completed,
        failure,
        destroy_failure,
        elapsed_ms,
    }
}

fn saturating_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

async fn run_steps<O: Orchestrator>(
    scenario: &Scenario,
    orchestrator: &mut O,
    ctx: &CallContext,
    machine: &mut StepMachine,
) -> Result<usize, StepFailure> {
    if let Some(pre_check) = scenario.pre_check() {
        pre_check.run(ctx).await.map_err(|e| StepFailure {
            completed: 0,
            message: match e {
                HarnessError::PreCheck(_) => e.to_string(),
                other => HarnessError::PreCheck(other.to_string()).to_string(),
            },
        })?;
    }

    let total = scenario.steps().len();
    for (index, step) in scenario.steps().iter().enumerate() {
        let result = match step {
            LifecycleStep::Apply(apply) => run_apply(apply, orchestrator, ctx, machine).await,
            LifecycleStep::ImportVerify(import) => {
                run_import(import, orchestrator, ctx, machine).await
            }
        };

        metrics::counter!(m::STEPS_TOTAL, m::LABEL_STEP_KIND => step.kind()).increment(1);

        if let Err(e) = result {
            return Err(StepFailure {
                completed: index,
                message: format!("step {}/{total} ({}): {e}", index + 1, step.kind()),
            });
        }
        info!(step = index + 1, kind = step.kind(), "step passed");
    }

    Ok(total)
}

async fn run_apply<O: Orchestrator>(
    step: &ApplyStep,
    orchestrator: &mut O,
    ctx: &CallContext,
    machine: &mut StepMachine,
) -> Result<(), HarnessError> {
    machine.advance(Phase::Applying)?;
    orchestrator.apply(ctx, &step.config).await?;

    machine.advance(Phase::Verifying)?;
    step.checks.run(ctx, orchestrator.state()).await?;

    let plan = orchestrator.plan(ctx, &step.config).await?;
    match (plan.is_empty(), step.expect_non_empty_plan) {
        (false, false) => Err(AssertionError::UnexpectedPlan {
            changes: plan.to_string(),
        }
        .into()),
        (true, true) => Err(AssertionError::ExpectedNonEmptyPlan.into()),
        _ => Ok(()),
    }
}

async fn run_import<O: Orchestrator>(
    step: &ImportStep,
    orchestrator: &mut O,
    ctx: &CallContext,
    machine: &mut StepMachine,
) -> Result<(), HarnessError> {
    machine.advance(Phase::ImportVerifying)?;

    let tracked = orchestrator.state().require(&step.address)?.clone();
    let imported = orchestrator.import(ctx, &step.address, &tracked.id).await?;

    let diffs = step.diff(&tracked, &imported);
    if diffs.is_empty() {
        Ok(())
    } else {
        Err(AssertionError::ImportMismatch {
            address: step.address.to_string(),
            diffs: diffs.join("; "),
        }
        .into())
    }
}

/// destroy 후 스냅샷에 대해 destroy 검증을 실행합니다.
async fn teardown<O: Orchestrator>(
    scenario: &Scenario,
    orchestrator: &mut O,
    ctx: &CallContext,
) -> Option<String> {
    let snapshot = orchestrator.state().clone();
    let mut failures = Vec::new();

    if let Err(e) = orchestrator.destroy(ctx).await {
        warn!(error = %e, "destroy failed");
        failures.push(format!("destroy: {e}"));
    }

    if let Some(check) = scenario.check_destroy() {
        if let Err(e) = check.check(ctx, &snapshot).await {
            warn!(error = %e, "destroy check failed");
            failures.push(e.to_string());
        }
    }

    if failures.is_empty() {
        None
    } else {
        Some(failures.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_millis_saturate() {
        assert_eq!(saturating_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(saturating_millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn happy_path_transitions_are_allowed() {
        let mut machine = StepMachine::new();
        for phase in [
            Phase::Applying,
            Phase::Verifying,
            Phase::ImportVerifying,
            Phase::Applying,
            Phase::Verifying,
            Phase::TearingDown,
            Phase::Done,
        ] {
            machine.advance(phase).unwrap();
        }
        assert_eq!(machine.phase(), Phase::Done);
    }

    #[test]
    fn import_requires_prior_apply() {
        let mut machine = StepMachine::new();
        let err = machine.advance(Phase::ImportVerifying).unwrap_err();
        assert_eq!(
            err.to_string(),
            "illegal sequencer transition: init -> import_verifying"
        );
        assert_eq!(machine.phase(), Phase::Init);
    }

    #[test]
    fn teardown_reachable_from_every_active_phase() {
        for from in [
            Phase::Init,
            Phase::Applying,
            Phase::Verifying,
            Phase::ImportVerifying,
        ] {
            assert!(TRANSITIONS.contains(&(from, Phase::TearingDown)), "{from}");
        }
    }

    #[test]
    fn done_is_terminal() {
        assert!(!TRANSITIONS.iter().any(|(from, _)| *from == Phase::Done));
        let mut machine = StepMachine::new();
        machine.advance(Phase::TearingDown).unwrap();
        machine.advance(Phase::Done).unwrap();
        assert!(machine.advance(Phase::Applying).is_err());
    }

    #[test]
    fn verify_requires_apply() {
        let machine = StepMachine::new();
        assert!(!machine.can_advance(Phase::Verifying));
    }
}
