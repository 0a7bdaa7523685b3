//! QQ conversation identifiers.
//!
//! QQ addresses users and groups with two independent number spaces. The
//! host framework only ever sees opaque strings, so both spaces are folded
//! into one string namespace by prefixing the decimal number:
//!
//! ```text
//! qq_12345678      user (QQ account number)
//! group_87654321   group (QQ group number)
//! ```
//!
//! The prefix alone decides which send path a conversation id takes, so
//! [`classify`] never needs a lookup. Decoding is strict: an empty string,
//! an unknown prefix, a non-digit remainder, overflow or zero are all
//! [`PuppetError::InvalidIdentifier`].

use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;

use puppet_core::{PuppetError, PuppetResult};
use serde::{Deserialize, Serialize};

/// Prefix of user (account) identifiers.
pub const USER_PREFIX: &str = "qq_";

/// Prefix of group identifiers.
pub const GROUP_PREFIX: &str = "group_";

/// Which namespace an identifier string belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    /// Starts with [`USER_PREFIX`].
    User,
    /// Starts with [`GROUP_PREFIX`].
    Group,
    /// Carries no recognized prefix.
    Unknown,
}

/// Classifies an identifier by prefix only; the remainder is not validated.
pub fn classify(id: &str) -> IdKind {
    if id.starts_with(USER_PREFIX) {
        IdKind::User
    } else if id.starts_with(GROUP_PREFIX) {
        IdKind::Group
    } else {
        IdKind::Unknown
    }
}

/// Encodes a QQ account number as a user identifier.
pub fn encode_user(number: NonZeroU64) -> UserId {
    UserId::new(number)
}

/// Encodes a QQ group number as a group identifier.
pub fn encode_group(number: NonZeroU64) -> GroupId {
    GroupId::new(number)
}

/// Decodes the number behind a user or group identifier.
pub fn decode_number(id: &str) -> PuppetResult<NonZeroU64> {
    let rest = match classify(id) {
        IdKind::User => &id[USER_PREFIX.len()..],
        IdKind::Group => &id[GROUP_PREFIX.len()..],
        IdKind::Unknown => return Err(PuppetError::invalid_identifier(id)),
    };
    parse_number(rest).ok_or_else(|| PuppetError::invalid_identifier(id))
}

/// Parses a strictly decimal, positive number.
fn parse_number(digits: &str) -> Option<NonZeroU64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u64>().ok().and_then(NonZeroU64::new)
}

macro_rules! define_qq_id {
    (
        $(#[$meta:meta])*
        $name:ident, prefix = $prefix:expr, kind = $kind:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(NonZeroU64);

        impl $name {
            /// Wraps a positive number.
            pub const fn new(number: NonZeroU64) -> Self {
                Self(number)
            }

            /// Wraps a raw number, returning `None` for zero.
            pub fn from_number(number: u64) -> Option<Self> {
                NonZeroU64::new(number).map(Self)
            }

            /// Returns the wrapped number.
            pub const fn number(self) -> NonZeroU64 {
                self.0
            }

            /// Returns the wrapped number as a plain integer.
            pub const fn get(self) -> u64 {
                self.0.get()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = PuppetError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if classify(s) != IdKind::$kind {
                    return Err(PuppetError::invalid_identifier(s));
                }
                decode_number(s).map(Self)
            }
        }

        impl TryFrom<String> for $name {
            type Error = PuppetError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.to_string()
            }
        }
    };
}

define_qq_id!(
    /// Identifier of a QQ user, rendered as `qq_<number>`.
    UserId, prefix = USER_PREFIX, kind = User
);

define_qq_id!(
    /// Identifier of a QQ group, rendered as `group_<number>`.
    GroupId, prefix = GROUP_PREFIX, kind = Group
);

/// A decoded conversation id: either a user or a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversationId {
    User(UserId),
    Group(GroupId),
}

impl ConversationId {
    /// Parses a conversation id.
    ///
    /// An unclassifiable string is [`PuppetError::InvalidConversationId`];
    /// a classifiable one with a bad number is
    /// [`PuppetError::InvalidIdentifier`].
    pub fn parse(id: &str) -> PuppetResult<Self> {
        match classify(id) {
            IdKind::User => id.parse().map(Self::User),
            IdKind::Group => id.parse().map(Self::Group),
            IdKind::Unknown => Err(PuppetError::InvalidConversationId { id: id.to_string() }),
        }
    }

    /// Returns the namespace of this id.
    pub fn kind(&self) -> IdKind {
        match self {
            Self::User(_) => IdKind::User,
            Self::Group(_) => IdKind::Group,
        }
    }

    /// Returns the QQ number behind this id.
    pub fn number(&self) -> NonZeroU64 {
        match self {
            Self::User(id) => id.number(),
            Self::Group(id) => id.number(),
        }
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => fmt::Display::fmt(id, f),
            Self::Group(id) => fmt::Display::fmt(id, f),
        }
    }
}

impl FromStr for ConversationId {
    type Err = PuppetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<UserId> for ConversationId {
    fn from(id: UserId) -> Self {
        Self::User(id)
    }
}

impl From<GroupId> for ConversationId {
    fn from(id: GroupId) -> Self {
        Self::Group(id)
    }
}
