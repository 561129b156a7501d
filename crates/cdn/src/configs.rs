//! 시나리오별 선언 문서 생성기
//!
//! 모든 생성기는 부수 효과가 없는 순수 함수입니다. 파라미터는 [`quote`]로
//! 인용되며, 각 문서는 PEM fixture 하나를 `file()`로 참조합니다.

use driftwatch_harness::document::quote;

use crate::public_key::RESOURCE_TYPE;

/// fixture 기준 디렉토리에 대한 PEM fixture 경로
pub const FIXTURE_PATH: &str = "test-fixtures/cdn-public-key.pem";

/// 시나리오에서 사용하는 논리 이름 (`name`을 지정하는 문서)
pub const TEST_NAME: &str = "test";

/// 시나리오에서 사용하는 논리 이름 (`name_prefix`를 지정하는 문서)
pub const EXAMPLE_NAME: &str = "example";

/// 이름만 지정하는 기본 문서
pub fn config_basic(name: &str) -> String {
    format!(
        r#"
resource "{RESOURCE_TYPE}" "{TEST_NAME}" {{
  encoded_key = file({fixture})
  name        = {name}
}}
"#,
        fixture = quote(FIXTURE_PATH),
        name = quote(name),
    )
}

/// 이름 대신 접두어를 지정하는 문서
pub fn config_name_prefix(prefix: &str) -> String {
    format!(
        r#"
resource "{RESOURCE_TYPE}" "{EXAMPLE_NAME}" {{
  comment     = "test key"
  encoded_key = file({fixture})
  name_prefix = {prefix}
}}
"#,
        fixture = quote(FIXTURE_PATH),
        prefix = quote(prefix),
    )
}

/// 설명을 포함하는 문서
pub fn config_comment(name: &str, comment: &str) -> String {
    format!(
        r#"
resource "{RESOURCE_TYPE}" "{TEST_NAME}" {{
  comment     = {comment}
  encoded_key = file({fixture})
  name        = {name}
}}
"#,
        fixture = quote(FIXTURE_PATH),
        name = quote(name),
        comment = quote(comment),
    )
}
