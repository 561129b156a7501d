#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod metrics;
pub mod remote;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{AssertionError, ConfigError, DriftwatchError, LookupError, TrackingError};

// 설정
pub use config::DriftwatchConfig;

// 원격 추상화
pub use remote::{BoxFuture, CallContext, RemoteResource};

// 도메인 타입
pub use types::{AttributeBag, ManagedResourceInstance, ResourceAddress, TrackedState};
