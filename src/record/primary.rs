//! Primary record
//!
//! ## Layout (76 bytes)
//! ```text
//! ┌────────────┬─────┬────────┬───────────┬──────────────┬──────────────┬─────┐
//! │ record(15) │ pad │ id (4) │ name (15) │ surname (20) │ city (20)    │ pad │
//! │   0..15    │ 15  │ 16..20 │  20..35   │   35..55     │   55..75     │ 75  │
//! └────────────┴─────┴────────┴───────────┴──────────────┴──────────────┴─────┘
//! ```
//! `id` is a little-endian i32. Padding bytes are written as zero.

use std::fmt;

use bytes::{Buf, BufMut};

use crate::error::{HashStoreError, Result};

use super::codec::{check_width, get_fixed_str, put_fixed_str};

/// Width of the free-form record tag
pub const RECORD_TAG_WIDTH: usize = 15;
/// Width of the name field
pub const NAME_WIDTH: usize = 15;
/// Width of the surname field
pub const SURNAME_WIDTH: usize = 20;
/// Width of the city field
pub const CITY_WIDTH: usize = 20;

/// A fixed-size record stored in the primary hash file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Free-form record identifier
    pub record: String,
    /// Primary key
    pub id: i32,
    /// Secondary key
    pub name: String,
    pub surname: String,
    pub city: String,
}

impl Record {
    /// Encoded size in bytes
    pub const SIZE: usize = 76;

    /// Create a record tagged `rec{id}`
    pub fn new(
        id: i32,
        name: impl Into<String>,
        surname: impl Into<String>,
        city: impl Into<String>,
    ) -> Result<Self> {
        Self::with_tag(format!("rec{}", id), id, name, surname, city)
    }

    /// Create a record with an explicit tag
    pub fn with_tag(
        record: impl Into<String>,
        id: i32,
        name: impl Into<String>,
        surname: impl Into<String>,
        city: impl Into<String>,
    ) -> Result<Self> {
        let record = Self {
            record: record.into(),
            id,
            name: name.into(),
            surname: surname.into(),
            city: city.into(),
        };
        record.validate()?;
        Ok(record)
    }

    /// Check every string field fits its fixed width
    pub fn validate(&self) -> Result<()> {
        check_width("record", &self.record, RECORD_TAG_WIDTH)?;
        check_width("name", &self.name, NAME_WIDTH)?;
        check_width("surname", &self.surname, SURNAME_WIDTH)?;
        check_width("city", &self.city, CITY_WIDTH)?;
        Ok(())
    }

    /// Encode into the first `SIZE` bytes of `dst`
    pub fn encode_into(&self, dst: &mut [u8]) -> Result<()> {
        self.validate()?;
        let mut buf = slot_mut(dst)?;
        put_fixed_str(&mut buf, "record", &self.record, RECORD_TAG_WIDTH)?;
        buf.put_u8(0);
        buf.put_i32_le(self.id);
        put_fixed_str(&mut buf, "name", &self.name, NAME_WIDTH)?;
        put_fixed_str(&mut buf, "surname", &self.surname, SURNAME_WIDTH)?;
        put_fixed_str(&mut buf, "city", &self.city, CITY_WIDTH)?;
        buf.put_u8(0);
        Ok(())
    }

    /// Decode from the first `SIZE` bytes of `src`
    pub fn decode_from(src: &[u8]) -> Result<Self> {
        if src.len() < Self::SIZE {
            return Err(HashStoreError::Codec(format!(
                "record needs {} bytes, got {}",
                Self::SIZE,
                src.len()
            )));
        }
        let mut buf = &src[..Self::SIZE];
        let record = get_fixed_str(&mut buf, "record", RECORD_TAG_WIDTH)?;
        buf.advance(1);
        let id = buf.get_i32_le();
        let name = get_fixed_str(&mut buf, "name", NAME_WIDTH)?;
        let surname = get_fixed_str(&mut buf, "surname", SURNAME_WIDTH)?;
        let city = get_fixed_str(&mut buf, "city", CITY_WIDTH)?;

        Ok(Self {
            record,
            id,
            name,
            surname,
            city,
        })
    }

    /// Encode into a fresh buffer
    pub fn to_bytes(&self) -> Result<[u8; Record::SIZE]> {
        let mut out = [0u8; Record::SIZE];
        self.encode_into(&mut out)?;
        Ok(out)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{},{},{},{})",
            self.record, self.id, self.name, self.surname, self.city
        )
    }
}

fn slot_mut(dst: &mut [u8]) -> Result<&mut [u8]> {
    let len = dst.len();
    dst.get_mut(..Record::SIZE).ok_or_else(|| {
        HashStoreError::Codec(format!(
            "record needs {} bytes, got {}",
            Record::SIZE,
            len
        ))
    })
}
