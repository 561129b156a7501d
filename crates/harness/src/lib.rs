#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error type (`HarnessError`)
//! - [`document`]: Declarative document parser, `quote()`, fixture-resolving `Renderer`
//! - [`orchestrator`]: Plan/apply boundary (`Orchestrator` trait, `Plan`)
//! - [`engine`]: Reference engine (`LocalEngine`, `ResourceProvider`, `ResourceSchema`)
//! - [`check`]: Attribute checks and `CheckBundle`
//! - [`lookup`]: Existence / destroy assertions and the disappearance simulator
//! - [`step`]: Lifecycle steps (`ApplyStep`, `ImportStep`)
//! - [`scenario`]: `Scenario`, `PreCheck`, `ScenarioReport`
//! - [`sequencer`]: Explicit transition table and `run_scenario`
//! - [`runner`]: Parallel `run_scenarios`
//! - [`naming`]: `random_with_prefix`, `prefixed_unique_id`
//!
//! # Architecture
//!
//! ```text
//! run_scenarios --semaphore--> run_scenario (one task per scenario)
//!                                   |
//!                  Init -> Applying -> Verifying -> ImportVerifying
//!                                   |                    |
//!                        Orchestrator.apply/plan   Orchestrator.import
//!                                   |
//!                         CheckBundle (attr checks, exists, disappears)
//!                                   |
//!                  TearingDown: destroy + check_destroy (always) -> Done
//! ```

pub mod check;
pub mod document;
pub mod engine;
pub mod error;
pub mod lookup;
pub mod naming;
pub mod orchestrator;
pub mod runner;
pub mod scenario;
pub mod sequencer;
pub mod step;

// --- Public API Re-exports ---

// Error
pub use error::HarnessError;

// Document
pub use document::{Declaration, Renderer, quote};

// Orchestrator
pub use engine::{AttributeSchema, LocalEngine, Presence, ResourceProvider, ResourceSchema};
pub use orchestrator::{ChangeAction, Orchestrator, Plan, PlannedChange};

// Checks
pub use check::{CheckBundle, IdPin, StateCheck, attr_equals, attr_matches, attr_set};
pub use lookup::{assert_destroyed, assert_exists, destroyed, disappear, disappears, exists};

// Scenario
pub use scenario::{PreCheck, Scenario, ScenarioBuilder, ScenarioOutcome, ScenarioReport};
pub use sequencer::{Phase, StepMachine, run_scenario};
pub use step::{ApplyStep, ImportStep, LifecycleStep};

// Runner
pub use naming::{prefixed_unique_id, random_with_prefix};
pub use runner::run_scenarios;
