//! Raw friend / sender information.

use serde::{Deserialize, Serialize};

/// Friend-list entry or message sender, as reported by the protocol client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    /// QQ account number.
    pub user_id: u64,
    /// Nickname.
    #[serde(default)]
    pub nickname: String,
    /// Gender ("male", "female", "unknown").
    ///
    /// Clients omit the field when the profile hides it, which is the same
    /// fact as an explicit "unknown". Any other string is kept verbatim and
    /// rejected by the translator.
    #[serde(default = "default_sex")]
    pub sex: String,
    /// Remark the bot account set for this friend.
    #[serde(default)]
    pub remark: Option<String>,
    /// Age.
    #[serde(default)]
    pub age: Option<u32>,
    /// Group card (group nickname), for group senders.
    #[serde(default)]
    pub card: Option<String>,
    /// Area.
    #[serde(default)]
    pub area: Option<String>,
    /// Group role ("owner", "admin", "member"), for group senders.
    #[serde(default)]
    pub role: Option<String>,
}

fn default_sex() -> String {
    "unknown".to_string()
}

impl ContactRecord {
    /// Creates a record with an unknown gender and no optional fields.
    pub fn new(user_id: u64, nickname: impl Into<String>) -> Self {
        Self {
            user_id,
            nickname: nickname.into(),
            sex: default_sex(),
            remark: None,
            age: None,
            card: None,
            area: None,
            role: None,
        }
    }

    /// Sets the raw gender string.
    pub fn with_sex(mut self, sex: impl Into<String>) -> Self {
        self.sex = sex.into();
        self
    }

    /// Sets the friend remark.
    pub fn with_remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = Some(remark.into());
        self
    }
}
