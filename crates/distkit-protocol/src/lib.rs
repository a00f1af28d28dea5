//! distkit registry protocol types.
//!
//! Defines the JSON documents stored in the release registry and the
//! canonical key names shared by the publisher and the directory service.

pub mod error;
pub mod key;
pub mod platform;
pub mod record;

pub use error::ProtocolError;
pub use key::{is_allowed_char, pointer_key, validate_component, ReleaseKey};
pub use platform::{Platform, DEFAULT_PLATFORMS};
pub use record::{CurrentVersionPointer, ReleaseRecord, SHA256_LEN};

/// Marker character that every release tag starts with.
pub const RELEASE_TAG_MARKER: char = 'v';
