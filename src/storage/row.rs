//! The fixed-width record this store keys on and persists.
//!
//! A row has exactly three fields — `id`, `username`, `email` — and that
//! shape never varies. There is no schema to load and no column list to
//! validate against; `ROW_SIZE` is a compile-time constant.

use crate::errors::{Error, UserError};
use heapless::Vec as HVec;

pub const ID_SIZE: usize = std::mem::size_of::<u32>();
pub const USERNAME_SIZE: usize = 33;
pub const EMAIL_SIZE: usize = 256;
pub const ROW_SIZE: usize = ID_SIZE + USERNAME_SIZE + EMAIL_SIZE;

/// Longest username a caller may supply, not counting the NUL terminator.
pub const MAX_USERNAME_LEN: usize = USERNAME_SIZE - 1;
/// Longest email a caller may supply, not counting the NUL terminator.
pub const MAX_EMAIL_LEN: usize = EMAIL_SIZE - 1;

const ID_OFFSET: usize = 0;
const USERNAME_OFFSET: usize = ID_OFFSET + ID_SIZE;
const EMAIL_OFFSET: usize = USERNAME_OFFSET + USERNAME_SIZE;

/// A single record: a 32-bit key plus two NUL-terminated text fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: u32,
    pub username: String,
    pub email: String,
}

impl Row {
    /// Builds a row from already-tokenized fields, rejecting ones too long
    /// to fit their fixed-width columns.
    pub fn new(id: u32, username: &str, email: &str) -> Result<Row, Error> {
        if username.len() > MAX_USERNAME_LEN || email.len() > MAX_EMAIL_LEN {
            return Err(Error::User(UserError::StringTooLong));
        }
        Ok(Row {
            id,
            username: username.to_string(),
            email: email.to_string(),
        })
    }

    /// Packs the row into its on-disk 293-byte image.
    pub fn serialize(&self) -> HVec<u8, ROW_SIZE> {
        let mut buf: HVec<u8, ROW_SIZE> = HVec::new();
        buf.extend_from_slice(&[0u8; ROW_SIZE]).ok();

        buf[ID_OFFSET..ID_OFFSET + ID_SIZE].copy_from_slice(&self.id.to_le_bytes());

        let username_bytes = self.username.as_bytes();
        buf[USERNAME_OFFSET..USERNAME_OFFSET + username_bytes.len()]
            .copy_from_slice(username_bytes);

        let email_bytes = self.email.as_bytes();
        buf[EMAIL_OFFSET..EMAIL_OFFSET + email_bytes.len()].copy_from_slice(email_bytes);

        buf
    }

    /// Unpacks a row from a 293-byte image, stopping each text field at its
    /// first NUL byte.
    pub fn deserialize(buf: &[u8]) -> Result<Row, Error> {
        if buf.len() != ROW_SIZE {
            return Err(err!(
                Storage,
                "row image is {} bytes, expected {}",
                buf.len(),
                ROW_SIZE
            ));
        }

        let id = u32::from_le_bytes(
            buf[ID_OFFSET..ID_OFFSET + ID_SIZE]
                .try_into()
                .map_err(|_| err!(Storage, "failed to decode row id"))?,
        );

        let username = nul_terminated_str(&buf[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE])?;
        let email = nul_terminated_str(&buf[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE])?;

        Ok(Row {
            id,
            username,
            email,
        })
    }
}

fn nul_terminated_str(field: &[u8]) -> Result<String, Error> {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    std::str::from_utf8(&field[..end])
        .map(|s| s.to_string())
        .map_err(|e| err!(Storage, "row field is not valid utf-8: {}", e))
}

impl std::fmt::Display for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.id, self.username, self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_serialize_deserialize() {
        let row = Row::new(7, "alice", "alice@example.com").unwrap();
        let packed = row.serialize();
        let unpacked = Row::deserialize(&packed).unwrap();
        assert_eq!(row, unpacked);
    }

    #[test]
    fn rejects_username_over_32_bytes() {
        let long = "a".repeat(MAX_USERNAME_LEN + 1);
        assert!(Row::new(1, &long, "x@example.com").is_err());
    }

    #[test]
    fn rejects_email_over_255_bytes() {
        let long = "a".repeat(MAX_EMAIL_LEN + 1);
        assert!(Row::new(1, "bob", &long).is_err());
    }

    #[test]
    fn accepts_fields_at_exact_boundary() {
        let username = "a".repeat(MAX_USERNAME_LEN);
        let email = "b".repeat(MAX_EMAIL_LEN);
        assert!(Row::new(1, &username, &email).is_ok());
    }

    #[test]
    fn serialized_image_is_exactly_row_size() {
        let row = Row::new(1, "x", "y").unwrap();
        assert_eq!(row.serialize().len(), ROW_SIZE);
    }
}
