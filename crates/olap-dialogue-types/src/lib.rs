//! Shared data model for the OLAP dialogue engine.
//!
//! Everything that crosses the boundary between the engine and a transport
//! layer lives here: scored schema candidates, the analysis situation under
//! construction and the display payloads sent back to the user.
//!
//! ## Boundaries
//!
//! ```text
//! ┌──────────────────┐  Similarity   ┌──────────────────┐
//! │ schema lookup    │ ────────────► │  olap-dialogue   │
//! └──────────────────┘               │  (solver, state  │
//! ┌──────────────────┐  Display /    │   machine)       │
//! │ transport        │ ◄──────────── │                  │
//! └──────────────────┘  Situation    └──────────────────┘
//! ```
//!
//! ## Rules
//!
//! 1. Tagged enums only: `#[serde(tag = "type")]`
//! 2. Ordered collections (`BTreeSet`, `BTreeMap`) so serialisation is stable
//! 3. Schema identifiers are plain strings (IRIs in practice)

pub mod display;
pub mod language;
pub mod similarity;
pub mod situation;

pub use display::*;
pub use language::*;
pub use similarity::*;
pub use situation::*;

/// Identifier of a schema element (cube, measure, level, predicate, ...).
pub type ElementId = String;
