//! gridloom service layer
//!
//! Sits between a grid UI and the domain engines: the schema cache, the
//! edit state machine, and the table controller that orchestrates
//! flatten/unflatten/merge/delete against a remote data source.
//!
//! # Architecture
//!
//! ```text
//! Grid UI
//!     ↓
//! Service layer (gridloom-services) ← this crate
//!     ↓
//! Domain layer (gridloom-engine, gridloom-query)
//!     ↓
//! Infrastructure layer (gridloom-core, gridloom-rest)
//! ```
//!
//! # Design principles
//!
//! 1. **No UI dependencies** - services never import rendering types
//! 2. **Explicit state** - the edit lifecycle is a finite-state machine
//!    value with pure transitions, not scattered flags
//! 3. **Injected collaborators** - schema cache, remote source and notice
//!    sink arrive through the constructor; nothing is process-global

mod edit_state;
mod error;
mod notices;
mod schema_cache;
mod table_controller;

pub use edit_state::{transition, EditCommand, EditEvent, EditState};
pub use error::{ServiceError, ServiceResult};
pub use notices::{NoticeLevel, NoticeSink, NullNotices};
pub use schema_cache::SchemaCache;
pub use table_controller::{LoadPhase, TableController};
