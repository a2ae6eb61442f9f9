//! Record identifiers.

use ulid::Ulid;

/// Issues lowercase ULIDs for every table's primary key. Ids from
/// different milliseconds sort by creation time.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdGenerator;

impl IdGenerator {
    /// Stateless; construct wherever ids are needed.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// A fresh identifier.
    #[must_use]
    pub fn generate(self) -> String {
        Ulid::new().to_string().to_lowercase()
    }
}
