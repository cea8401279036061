//! Domain model (ids, blob names, samples, progress events, sessions, errors).

pub mod blob;
pub mod errors;
pub mod events;
pub mod ids;
pub mod sample;
pub mod session;

pub use self::blob::{BlobInfo, DEFAULT_DERIVED_SUFFIX, derived_name, escapes_root, split_extension};
pub use self::errors::{DepolError, ErrorKind};
pub use self::events::{ProgressEvent, Stage, WireEvent};
pub use self::ids::{ExpiryId, SessionId};
pub use self::sample::{SAMPLE_LEN, leading_bits, leading_hex};
pub use self::session::{ProcessingSession, SessionState};
