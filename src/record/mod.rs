//! Record Module
//!
//! Fixed-layout entries stored in hash file data blocks.
//!
//! ## Entry Types
//! - `Record`: full primary record (76 bytes), keyed by `id`
//! - `SecondaryEntry`: `{name, primary block}` pair (20 bytes), keyed by `name`
//!
//! Every type has exactly one encode/decode pair; field offsets are listed
//! in each type's module docs.

mod codec;
mod primary;
mod secondary;

pub use primary::{Record, CITY_WIDTH, NAME_WIDTH, RECORD_TAG_WIDTH, SURNAME_WIDTH};
pub use secondary::SecondaryEntry;
