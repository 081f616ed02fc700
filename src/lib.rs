//! olap-dialogue - natural-language dialogue engine for building OLAP queries.
//!
//! A user describes the query they want in free text and refines it turn by
//! turn. Each session keeps an *analysis situation* (cube, measures,
//! predicates and per-dimension qualifications) that the engine fills from
//! scored schema candidates and from the user's answers to offered options.
//!
//! ## Pipeline
//!
//! ```text
//! free text ─► Annotator ─► SchemaLookup ─► filter ─► ConstraintSolver
//!                                                        │
//!                                                        ▼
//!   DisplayPayload ◄── DialogueStateMachine ◄── SlotMerger (situation)
//! ```
//!
//! ## Modules
//!
//! - [`solver`] - weighted constraint solver over scored candidates
//! - [`merge`] - merging solutions into a live situation, candidate filters
//! - [`dialogue`] - transition table, intent resolution, state machine
//! - [`registry`] - per-session workers and session lifecycle
//! - [`collaborators`] - service traits and in-memory implementations
//! - [`config`], [`error`], [`telemetry`] - ambient plumbing
//!
//! Shared wire types live in the `olap-dialogue-types` crate and are
//! re-exported here.

pub mod collaborators;
pub mod config;
pub mod dialogue;
pub mod error;
pub mod merge;
pub mod registry;
pub mod session;
pub mod solver;
pub mod telemetry;

pub use collaborators::{DialogueServices, InMemoryCubeSchema};
pub use config::DialogueConfig;
pub use dialogue::{DialogueEvent, DialogueState, DialogueStateMachine, Operation};
pub use error::{DialogueError, Result};
pub use merge::SlotMerger;
pub use registry::{SessionRegistry, SessionSnapshot};
pub use session::Session;
pub use solver::{ConstraintSolver, SolverSolution};

pub use olap_dialogue_types as types;
