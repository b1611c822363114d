//! Prelude module for Lattice Repeater.
//!
//! ```ignore
//! use lattice_repeater::prelude::*;
//! ```
//!
//! This provides access to:
//! - The engine (`Repeater`, `RepeaterBuilder`, `SearchInput`)
//! - Rows (`RowCollection`, `MemoryRows`, `RowId`, `RowView`, `NewRow`)
//! - Records and validation (`Record`, `Anchored`, `FormCore`, `ValidateConfig`)
//! - Signals (`Signal`, `ConnectionId`)

// ============================================================================
// Engine
// ============================================================================

pub use crate::model::{Repeater, RepeaterBuilder, RepeaterSignals, SearchInput};
pub use crate::{Error, HandlerError, Result};

// ============================================================================
// Rows
// ============================================================================

pub use crate::model::{
    CommitFn, MemoryRows, NewRow, RowCollection, RowCommit, RowId, RowMode, RowView,
};

// ============================================================================
// Records, Schema and Validation
// ============================================================================

pub use crate::model::{Anchored, AnchoredRecord, FormCore, Record, RowStatus};
pub use crate::model::{ColumnSpec, RowSchema};
pub use crate::model::{ValidateConfig, Validator};

// ============================================================================
// Signal System
// ============================================================================

pub use lattice_repeater_core::{ConnectionGuard, ConnectionId, Signal};
