use serde::{Deserialize, Serialize};

/// The single persisted identity recognized by this session.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub uid: String,
    #[serde(rename = "isAnonymous")]
    pub is_anonymous: bool,
}

impl User {
    pub fn anonymous(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            is_anonymous: true,
        }
    }

    pub fn from_token_uid(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            is_anonymous: false,
        }
    }
}

/// Outcome of a sign-in operation.
#[derive(Clone, Debug)]
pub struct UserCredential {
    pub user: User,
}
