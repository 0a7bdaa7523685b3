//! Raw protocol records.
//!
//! These mirror what the QQ protocol client hands to the adapter. They are
//! cached as-is and only converted into canonical payloads on demand.

pub mod contact;
pub mod message;
pub mod room;

pub use contact::ContactRecord;
pub use message::{MessageKind, MessageRecord};
pub use room::RoomRecord;
