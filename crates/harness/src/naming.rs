//! 이름 생성 유틸리티
//!
//! - [`random_with_prefix`]: 테스트가 원격 네임스페이스 충돌을 피하기 위해 사용하는
//!   무작위 이름 (`<prefix>-<19자리 숫자>`)
//! - [`prefixed_unique_id`]: provider가 `name_prefix`로부터 이름을 만들 때 사용하는
//!   시간 순 고유 접미사

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// 무작위 숫자 접미사 자릿수
pub const RANDOM_SUFFIX_DIGITS: usize = 19;

/// 고유 접미사 길이 (18자리 시각 + 8자리 16진 카운터)
pub const UNIQUE_ID_SUFFIX_LENGTH: usize = 26;

static UNIQUE_COUNTER: AtomicU32 = AtomicU32::new(0);

/// `<prefix>-<19자리 숫자>` 형식의 무작위 이름을 생성합니다.
pub fn random_with_prefix(prefix: &str) -> String {
    let modulus = 10u128.pow(RANDOM_SUFFIX_DIGITS as u32);
    let value = uuid::Uuid::new_v4().as_u128() % modulus;
    format!("{prefix}-{value:0width$}", width = RANDOM_SUFFIX_DIGITS)
}

/// 접두어에 시간 순 고유 접미사를 붙입니다.
///
/// 같은 프로세스 안에서는 호출 순서대로 사전식 정렬됩니다.
pub fn prefixed_unique_id(prefix: &str) -> String {
    // 10ns 단위 시각은 2286년까지 18자리에 들어감
    let ticks = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos() / 10);
    let counter = UNIQUE_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}{ticks:018}{counter:08x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_name_has_prefix_and_digits() {
        let name = random_with_prefix("tf-acc-test");
        let suffix = name.strip_prefix("tf-acc-test-").unwrap();
        assert_eq!(suffix.len(), RANDOM_SUFFIX_DIGITS);
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn random_names_differ() {
        assert_ne!(random_with_prefix("x"), random_with_prefix("x"));
    }

    #[test]
    fn unique_id_has_fixed_suffix_length() {
        let id = prefixed_unique_id("tf-acc-test-");
        assert!(id.starts_with("tf-acc-test-"));
        assert_eq!(id.len(), "tf-acc-test-".len() + UNIQUE_ID_SUFFIX_LENGTH);
    }

    #[test]
    fn unique_ids_are_ordered() {
        let first = prefixed_unique_id("p-");
        let second = prefixed_unique_id("p-");
        assert_ne!(first, second);
        assert!(first < second);
    }
}
