use serde::{Deserialize, Serialize};

/// Platform user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// Platform chat/channel id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

/// Platform message id (numeric). `MessageId(0)` is the "newest" cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i32);

/// Operator id of the account service (who is asking for a collection).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperatorId(pub i64);

/// The authenticated caller of a core operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller {
    pub id: OperatorId,
    pub username: Option<String>,
}

impl Caller {
    pub fn new(id: i64) -> Self {
        Self {
            id: OperatorId(id),
            username: None,
        }
    }

    pub fn display_name(&self) -> String {
        self.username
            .clone()
            .unwrap_or_else(|| self.id.0.to_string())
    }
}
