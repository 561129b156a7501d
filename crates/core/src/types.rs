//! 도메인 타입: 추적 상태와 관리 리소스 인스턴스
//!
//! 오케스트레이터가 보고하는 상태를 하네스가 읽을 수 있는 형태로 표현합니다.
//! 원격 시스템이 객체 수명의 진실 원천이며, [`TrackedState`]는 시나리오가
//! 실행되는 동안 테스트 프로세스가 소유하는 기록입니다.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TrackingError;

/// 속성 모음 (문자열 키 → 문자열 값)
///
/// 렌더링과 diff 출력이 결정적이도록 정렬된 맵을 사용합니다.
pub type AttributeBag = BTreeMap<String, String>;

/// 원격 식별자를 속성 모음에 복제할 때 사용하는 키
pub const ID_ATTRIBUTE: &str = "id";

/// 리소스 주소 (`<type>.<logical-name>`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceAddress {
    /// 리소스 유형 (예: `cdn_public_key`)
    pub resource_type: String,
    /// 설정에서 사용하는 논리 이름 (예: `test`)
    pub name: String,
}

impl ResourceAddress {
    /// 새 주소를 생성합니다.
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.name)
    }
}

impl FromStr for ResourceAddress {
    type Err = TrackingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((ty, name))
                if !ty.is_empty() && !name.is_empty() && !name.contains('.') =>
            {
                Ok(Self::new(ty, name))
            }
            _ => Err(TrackingError::InvalidAddress(s.to_owned())),
        }
    }
}

/// 관리 리소스 인스턴스
///
/// 설정 단계가 적용되고 오케스트레이터가 성공을 보고하면 생성됩니다.
/// 식별자는 원격 시스템이 부여합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedResourceInstance {
    /// 리소스 주소
    pub address: ResourceAddress,
    /// 원격 식별자
    pub id: String,
    /// 속성 모음
    pub attributes: AttributeBag,
}

impl ManagedResourceInstance {
    /// 새 인스턴스를 생성합니다. `id`는 속성 모음에도 기록됩니다.
    pub fn new(address: ResourceAddress, id: impl Into<String>, mut attributes: AttributeBag) -> Self {
        let id = id.into();
        attributes.insert(ID_ATTRIBUTE.to_owned(), id.clone());
        Self {
            address,
            id,
            attributes,
        }
    }

    /// 리소스 유형
    pub fn resource_type(&self) -> &str {
        &self.address.resource_type
    }

    /// 속성 값을 조회합니다.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// 오케스트레이터 추적 상태 (주소 → 인스턴스)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedState {
    resources: BTreeMap<ResourceAddress, ManagedResourceInstance>,
}

impl TrackedState {
    /// 빈 상태를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 인스턴스를 추가하거나 교체합니다.
    pub fn insert(&mut self, instance: ManagedResourceInstance) -> Option<ManagedResourceInstance> {
        self.resources.insert(instance.address.clone(), instance)
    }

    /// 인스턴스를 제거합니다.
    pub fn remove(&mut self, address: &ResourceAddress) -> Option<ManagedResourceInstance> {
        self.resources.remove(address)
    }

    /// 주소로 인스턴스를 조회합니다.
    pub fn get(&self, address: &ResourceAddress) -> Option<&ManagedResourceInstance> {
        self.resources.get(address)
    }

    /// 주소로 인스턴스를 조회하고, 없으면 `TrackingError::NotTracked`를 반환합니다.
    pub fn require(&self, address: &ResourceAddress) -> Result<&ManagedResourceInstance, TrackingError> {
        let instance = self.get(address).ok_or_else(|| TrackingError::NotTracked {
            address: address.to_string(),
        })?;
        if instance.id.is_empty() {
            return Err(TrackingError::MissingId {
                address: address.to_string(),
            });
        }
        Ok(instance)
    }

    /// 특정 유형의 인스턴스를 모두 반환합니다.
    pub fn instances_of<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = &'a ManagedResourceInstance> + 'a {
        self.resources
            .values()
            .filter(move |r| r.resource_type() == resource_type)
    }

    /// 모든 인스턴스를 주소 순으로 반환합니다.
    pub fn iter(&self) -> impl Iterator<Item = &ManagedResourceInstance> {
        self.resources.values()
    }

    /// 추적 중인 인스턴스 수
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(ty: &str, name: &str, id: &str) -> ManagedResourceInstance {
        ManagedResourceInstance::new(ResourceAddress::new(ty, name), id, AttributeBag::new())
    }

    #[test]
    fn address_parses_and_displays() {
        let addr: ResourceAddress = "cdn_public_key.test".parse().unwrap();
        assert_eq!(addr.resource_type, "cdn_public_key");
        assert_eq!(addr.name, "test");
        assert_eq!(addr.to_string(), "cdn_public_key.test");
    }

    #[test]
    fn address_rejects_malformed_input() {
        for bad in ["", "cdn_public_key", ".test", "cdn_public_key.", "a.b.c"] {
            assert!(
                matches!(
                    bad.parse::<ResourceAddress>(),
                    Err(TrackingError::InvalidAddress(_))
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn instance_mirrors_id_into_attributes() {
        let inst = instance("cdn_public_key", "test", "K1");
        assert_eq!(inst.attribute("id"), Some("K1"));
    }

    #[test]
    fn require_reports_untracked_address() {
        let state = TrackedState::new();
        let err = state
            .require(&ResourceAddress::new("cdn_public_key", "missing"))
            .unwrap_err();
        assert_eq!(err.to_string(), "not found: cdn_public_key.missing");
    }

    #[test]
    fn require_reports_missing_id() {
        let mut state = TrackedState::new();
        state.insert(instance("cdn_public_key", "test", ""));
        let err = state
            .require(&ResourceAddress::new("cdn_public_key", "test"))
            .unwrap_err();
        assert!(matches!(err, TrackingError::MissingId { .. }));
    }

    #[test]
    fn instances_of_filters_by_type() {
        let mut state = TrackedState::new();
        state.insert(instance("cdn_public_key", "a", "K1"));
        state.insert(instance("cdn_public_key", "b", "K2"));
        state.insert(instance("cdn_key_group", "g", "G1"));

        let ids: Vec<_> = state
            .instances_of("cdn_public_key")
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, vec!["K1", "K2"]);
        assert_eq!(state.len(), 3);
    }

    #[test]
    fn insert_replaces_existing_address() {
        let mut state = TrackedState::new();
        state.insert(instance("cdn_public_key", "test", "K1"));
        let previous = state.insert(instance("cdn_public_key", "test", "K2"));
        assert_eq!(previous.map(|p| p.id), Some("K1".to_owned()));
        assert_eq!(state.len(), 1);
    }
}
