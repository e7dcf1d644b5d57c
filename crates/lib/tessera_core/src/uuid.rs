// Helpers for generating identifiers.
//
// Profiles use UUIDv7 so listings sort by creation time. Refresh record ids
// (the `jti` claim) use v4: they are looked up, never ordered, and should not
// leak issuance time.

use uuid::Uuid;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn uuidv7() -> Uuid {
    Uuid::now_v7()
}

/// Generate a new random UUIDv4.
pub fn uuidv4() -> Uuid {
    Uuid::new_v4()
}
