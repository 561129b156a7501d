#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Remote API error type (`CdnError`)
//! - [`client`]: `CdnClient` trait and the in-memory control plane
//! - [`public_key`]: Lookup adapter and `PublicKeyResource`
//! - [`provider`]: `PublicKeyProvider` for the reference engine
//! - [`configs`]: Declarative document generators
//! - [`scenarios`]: `PublicKeySuite` and `CdnPreCheck`

pub mod client;
pub mod configs;
pub mod error;
pub mod provider;
pub mod public_key;
pub mod scenarios;

// --- Public API Re-exports ---

pub use client::{CdnClient, InMemoryCdnClient, PublicKeyConfig, PublicKeyRecord};
pub use error::CdnError;
pub use provider::PublicKeyProvider;
pub use public_key::{PublicKey, PublicKeyResource, find_public_key_by_id};
pub use scenarios::{CdnPreCheck, PublicKeySuite, SCENARIO_NAMES};
