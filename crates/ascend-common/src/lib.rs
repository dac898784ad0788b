//! # Ascend Common
//!
//! Common types shared by the Ascend progression crates:
//! - ID types (CharacterId, StatId, AbilityId, CurveId)
//! - Version information for persisted schemas
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod ids;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::version::*;
}

pub use prelude::*;
