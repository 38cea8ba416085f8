//! Product keys and the identifiers derived from them.
//!
//! - [`ProductKey`]: packing, the 25-character key string, parsing with
//!   checksum validation, the product key id and phone activation data
//! - [`pid`]: PID2, `DigitalProductId`, `DigitalProductId4` and the
//!   extended PID
//! - [`PKeyConfig`]: which serial ranges belong to which product, loaded
//!   from an XrML license, and random key generation from them

mod config;
mod error;
mod key;
mod license;
pub mod pid;
pub mod system;

pub use config::{KeyRange, PKeyConfig, ProductConfig};
pub use error::{PKeyError, PKeyResult};
pub use key::{ALPHABET, KEY_DIGITS, KeyDetails, PKeyAlgorithm, ProductKey, ProductKeyParams};
pub use pid::{PID3_SIZE, PID4_SIZE, PidContext, mpc_for_build};
pub use system::HostInfo;
