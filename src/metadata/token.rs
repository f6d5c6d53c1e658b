//! Handles for types and members registered in a [`crate::metadata::TypeUniverse`].
//!
//! A [`Token`] is a 32-bit value whose high byte names the table the entry lives
//! in and whose low 24 bits are the row inside that table. Tokens are cheap to
//! copy and hash, and are the only identity the patcher keeps for resolved
//! members.
//!
//! | Table byte | Meaning |
//! |------------|---------|
//! | `0x02` | Type registered by the host |
//! | `0x06` | Member (method, constructor, accessor) |
//! | `0xF0` | Built-in primitive type |

use std::fmt;
use std::hash::{Hash, Hasher};

/// Opaque handle to a type or member of the type universe.
///
/// # Examples
///
/// ```rust
/// use dynpatch::metadata::token::Token;
///
/// let token = Token::new(0x06000001);
/// assert_eq!(token.table(), Token::MEMBER_TABLE);
/// assert_eq!(token.row(), 1);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Token(pub u32);

impl Token {
    /// Table byte of host-registered types.
    pub const TYPE_TABLE: u8 = 0x02;
    /// Table byte of members.
    pub const MEMBER_TABLE: u8 = 0x06;
    /// Table byte of built-in primitive types.
    pub const PRIMITIVE_TABLE: u8 = 0xF0;

    /// Creates a token from its raw value.
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Creates a token from a table byte and a row.
    #[must_use]
    pub fn from_parts(table: u8, row: u32) -> Self {
        Token((u32::from(table) << 24) | (row & 0x00FF_FFFF))
    }

    /// Returns the raw value.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Returns the table byte.
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Returns the row inside the table.
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// Returns `true` for the null token.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if this token refers to a member.
    #[must_use]
    pub fn is_member(&self) -> bool {
        self.table() == Self::MEMBER_TABLE
    }

    /// Returns `true` if this token refers to a type (primitive or host-registered).
    #[must_use]
    pub fn is_type(&self) -> bool {
        matches!(self.table(), Self::TYPE_TABLE | Self::PRIMITIVE_TABLE)
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(0x{:08x}, table: 0x{:02x}, row: {})",
            self.0,
            self.table(),
            self.row()
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}
