//! 설정 관리: driftwatch.toml 파싱 및 런타임 설정
//!
//! [`DriftwatchConfig`]는 모든 크레이트의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`DRIFTWATCH_HARNESS_RESOURCE_PREFIX=tf-acc-test` 형식)
//! 3. 설정 파일 (`driftwatch.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), driftwatch_core::error::DriftwatchError> {
//! use driftwatch_core::config::DriftwatchConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = DriftwatchConfig::load("driftwatch.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = DriftwatchConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, DriftwatchError};

/// 설정 상한값 상수
const MAX_PARALLEL_SCENARIOS: usize = 64;
const MAX_PUBLIC_KEYS: usize = 1000;
const MAX_COMMENT_LENGTH: usize = 4096;

/// driftwatch 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriftwatchConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 하네스 설정
    #[serde(default)]
    pub harness: HarnessConfig,
    /// CDN 원격 시스템 설정
    #[serde(default)]
    pub cdn: CdnConfig,
}

impl DriftwatchConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DriftwatchError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, DriftwatchError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DriftwatchError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                DriftwatchError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, DriftwatchError> {
        toml::from_str(toml_str).map_err(|e| {
            DriftwatchError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `DRIFTWATCH_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "DRIFTWATCH_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "DRIFTWATCH_GENERAL_LOG_FORMAT");

        // Harness
        override_string(
            &mut self.harness.resource_prefix,
            "DRIFTWATCH_HARNESS_RESOURCE_PREFIX",
        );
        override_string(
            &mut self.harness.fixture_root,
            "DRIFTWATCH_HARNESS_FIXTURE_ROOT",
        );
        override_usize(
            &mut self.harness.max_parallel_scenarios,
            "DRIFTWATCH_HARNESS_MAX_PARALLEL_SCENARIOS",
        );

        // CDN
        override_usize(&mut self.cdn.max_public_keys, "DRIFTWATCH_CDN_MAX_PUBLIC_KEYS");
        override_usize(
            &mut self.cdn.max_comment_length,
            "DRIFTWATCH_CDN_MAX_COMMENT_LENGTH",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), DriftwatchError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        // 랜덤 이름 접두어는 원격 이름 규칙([A-Za-z0-9_-])을 따라야 함
        let prefix = &self.harness.resource_prefix;
        if prefix.is_empty()
            || !prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ConfigError::InvalidValue {
                field: "harness.resource_prefix".to_owned(),
                reason: "must be non-empty and contain only [A-Za-z0-9_-]".to_owned(),
            }
            .into());
        }

        if self.harness.fixture_root.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "harness.fixture_root".to_owned(),
                reason: "must not be empty".to_owned(),
            }
            .into());
        }

        if self.harness.max_parallel_scenarios == 0
            || self.harness.max_parallel_scenarios > MAX_PARALLEL_SCENARIOS
        {
            return Err(ConfigError::InvalidValue {
                field: "harness.max_parallel_scenarios".to_owned(),
                reason: format!("must be 1-{MAX_PARALLEL_SCENARIOS}"),
            }
            .into());
        }

        if self.cdn.max_public_keys == 0 || self.cdn.max_public_keys > MAX_PUBLIC_KEYS {
            return Err(ConfigError::InvalidValue {
                field: "cdn.max_public_keys".to_owned(),
                reason: format!("must be 1-{MAX_PUBLIC_KEYS}"),
            }
            .into());
        }

        if self.cdn.max_comment_length > MAX_COMMENT_LENGTH {
            return Err(ConfigError::InvalidValue {
                field: "cdn.max_comment_length".to_owned(),
                reason: format!("must be 0-{MAX_COMMENT_LENGTH}"),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 하네스 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// 랜덤 리소스 이름 접두어
    pub resource_prefix: String,
    /// `file()` 상대 경로의 기준 디렉토리
    pub fixture_root: String,
    /// 동시에 실행할 시나리오 최대 수
    pub max_parallel_scenarios: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            resource_prefix: "tf-acc-test".to_owned(),
            fixture_root: "crates/cdn".to_owned(),
            max_parallel_scenarios: 4,
        }
    }
}

/// CDN 원격 시스템 설정 (in-memory control plane)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CdnConfig {
    /// 계정당 공개 키 최대 수
    pub max_public_keys: usize,
    /// comment 최대 길이
    pub max_comment_length: usize,
}

impl Default for CdnConfig {
    fn default() -> Self {
        Self {
            max_public_keys: 10,
            max_comment_length: 128,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}
