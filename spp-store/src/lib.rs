//! Trusted-store and variable-bag codecs.
//!
//! A trusted store is an encrypted record list. Three record layouts
//! exist, picked by [`PsVersion`](spp_types::PsVersion):
//!
//! | layout | versions            | keyed            | files  |
//! |--------|---------------------|------------------|--------|
//! | Vista  | Vista               | no               | mirror |
//! | Win7   | Win7                | per record       | mirror |
//! | Modern | Win8, WinBlue, 10+  | grouped by key   | single |
//!
//! All three implement [`PhysicalStore`]. [`Container`] picks one at
//! runtime and [`TrustedStore`] binds a container to its file(s).
//!
//! Record payloads are often [`VariableBag`]s, a nested key/value format
//! with a CRC on every entry.

pub mod bag;
pub mod codec;
mod error;
mod file;
mod options;
pub mod record;

pub use bag::{BagEntry, BagKind, VariableBag};
pub use codec::{Container, FLAT_TRAILER_SIZE, ModernStore, PhysicalStore, VistaStore, Win7Store};
pub use error::{StoreError, StoreResult};
pub use file::{TrustedStore, mirror_path};
pub use options::StoreOptions;
pub use record::{BlockKind, Record, Timer, ValueQuery, VistaTimer};
