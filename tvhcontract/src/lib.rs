//! # tvhcontract
//!
//! Bridges Tvheadend identifiers (channel id, EPG event id, DVR entry id)
//! and the rows of the TV provider store.
//!
//! - [`ResourceUri`]: opaque `{kind}/{row_id}` handle on a store row.
//! - [`TvStore`]: read/delete interface onto the store.
//! - [`IdentityRegistry`]: lookups in both directions and bulk maps.
//! - [`InMemoryStore`]: a store kept in memory, for tests and demos.

pub mod errors;
pub mod memory;
pub mod registry;
pub mod store;
pub mod uri;

pub use errors::{RegistryError, StoreError};
pub use memory::InMemoryStore;
pub use registry::IdentityRegistry;
pub use store::{ChannelRow, ProgramRow, RecordingRow, TvStore};
pub use uri::{ResourceUri, UriKind};
