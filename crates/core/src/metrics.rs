//! 메트릭 상수
//!
//! 모든 메트릭의 이름을 중앙에서 정의합니다. 하네스는 이 상수를 사용하여
//! `metrics::counter!()` 매크로를 호출합니다. recorder가 설치되지 않은
//! 프로세스에서는 기록이 무시됩니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `driftwatch_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 시나리오 이름 레이블 키
pub const LABEL_SCENARIO: &str = "scenario";

/// 결과 레이블 키 (passed, failed)
pub const LABEL_RESULT: &str = "result";

/// 리소스 유형 레이블 키
pub const LABEL_RESOURCE_TYPE: &str = "resource_type";

/// 단계 종류 레이블 키 (apply, import)
pub const LABEL_STEP_KIND: &str = "kind";

// ─── Harness 메트릭 ────────────────────────────────────────────────

/// 실행된 시나리오 수 (counter, label: scenario, result)
pub const SCENARIOS_TOTAL: &str = "driftwatch_scenarios_total";

/// 실행된 단계 수 (counter, label: kind)
pub const STEPS_TOTAL: &str = "driftwatch_steps_total";

/// 원격 조회 횟수 (counter, label: resource_type)
pub const REMOTE_LOOKUPS_TOTAL: &str = "driftwatch_remote_lookups_total";

/// destroy 후 남아 있던 원격 객체 수 (counter, label: resource_type)
pub const LEAKED_RESOURCES_TOTAL: &str = "driftwatch_leaked_resources_total";

/// refresh 중 감지된 drift 수 (counter, label: resource_type)
pub const DRIFT_DETECTED_TOTAL: &str = "driftwatch_drift_detected_total";

/// 시나리오 실행 시간 (histogram, 초)
pub const SCENARIO_DURATION_SECONDS: &str = "driftwatch_scenario_duration_seconds";

/// 모든 메트릭에 설명을 등록합니다.
///
/// recorder 설치 직후 한 번 호출합니다.
pub fn describe_metrics() {
    metrics::describe_counter!(SCENARIOS_TOTAL, "Number of scenarios run, by result");
    metrics::describe_counter!(STEPS_TOTAL, "Number of lifecycle steps executed");
    metrics::describe_counter!(REMOTE_LOOKUPS_TOTAL, "Number of remote lookups issued");
    metrics::describe_counter!(
        LEAKED_RESOURCES_TOTAL,
        "Remote objects still present after destroy"
    );
    metrics::describe_counter!(
        DRIFT_DETECTED_TOTAL,
        "Tracked instances found missing during refresh"
    );
    metrics::describe_histogram!(
        SCENARIO_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Wall-clock duration of a scenario including teardown"
    );
}
