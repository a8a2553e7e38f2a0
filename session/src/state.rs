//! Session state types.
//!
//! [`SessionRecord`] is the unit of persisted state. It is stored as a JSON
//! string and always written whole, never patched field by field.

use crate::error::SessionError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix of every generated session identifier.
pub const SESSION_ID_PREFIX: &str = "SES";

/// Prefix of every temp session token.
pub const TEMP_TOKEN_PREFIX: &str = "TempSessionToken-";

/// Role label of the anonymous packet.
pub const UNAUTHENTICATED_ROLE: &str = "Unauthenticated";

/// Opaque session identifier (`SES<uuid-v4>` when generated here).
///
/// Identifiers supplied by clients (cookie, bearer header, override data)
/// are accepted verbatim; only the ones minted by [`SessionId::generate`]
/// are guaranteed to carry the prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Mint a fresh identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("{SESSION_ID_PREFIX}{}", Uuid::new_v4()))
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Mint a fresh temp session token.
#[must_use]
pub fn generate_temp_token() -> String {
    format!("{TEMP_TOKEN_PREFIX}{}", Uuid::new_v4())
}

/// Session record ("user packet").
///
/// Field names on the wire follow the legacy packet shape
/// (`SessionID`, `LoggedIn`, `UserID`, ...), so records written by older
/// services stay readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionRecord {
    /// Session identifier. Packets built by an authenticator may not carry
    /// one yet; the manager stamps it before persisting.
    #[serde(rename = "SessionID", default)]
    pub session_id: Option<SessionId>,

    /// Authentication status.
    #[serde(default)]
    pub logged_in: bool,

    /// Role label.
    #[serde(default)]
    pub user_role: String,

    /// Numeric rank of the role (`-1` when unauthenticated).
    #[serde(default)]
    pub user_role_index: i64,

    /// User id (`0` when anonymous).
    #[serde(rename = "UserID", default)]
    pub user_id: i64,

    /// Customer/tenant id (`0` if none).
    #[serde(rename = "CustomerID", default)]
    pub customer_id: i64,

    /// Profile title.
    #[serde(default)]
    pub title: String,

    /// First name.
    #[serde(default)]
    pub name_first: String,

    /// Last name.
    #[serde(default)]
    pub name_last: String,

    /// Email address.
    #[serde(default)]
    pub email: String,

    /// Build/version tag stamped when the packet was created.
    #[serde(default)]
    pub version: String,

    /// Time of the last successful login through this session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login_time: Option<DateTime<Utc>>,
}

impl SessionRecord {
    /// The canonical anonymous packet.
    #[must_use]
    pub fn anonymous(session_id: Option<SessionId>, version: &str) -> Self {
        Self {
            session_id,
            logged_in: false,
            user_role: UNAUTHENTICATED_ROLE.to_string(),
            user_role_index: -1,
            user_id: 0,
            customer_id: 0,
            title: String::new(),
            name_first: String::new(),
            name_last: String::new(),
            email: String::new(),
            version: version.to_string(),
            last_login_time: None,
        }
    }

    /// A logged-in packet without a session id or profile fields.
    #[must_use]
    pub fn logged_in(role: &str, role_index: i64, user_id: i64, version: &str) -> Self {
        Self {
            logged_in: true,
            user_role: role.to_string(),
            user_role_index: role_index,
            user_id,
            ..Self::anonymous(None, version)
        }
    }

    /// Map a persisted user account into a logged-in packet.
    ///
    /// The session id is left empty; it is stamped when the packet is
    /// persisted against a request.
    #[must_use]
    pub fn from_user_record(user: &UserRecord, version: &str) -> Self {
        Self {
            session_id: None,
            logged_in: true,
            user_role: user.user_role.clone(),
            user_role_index: user.id_role,
            user_id: user.id_user,
            customer_id: user.id_customer,
            title: user.title.clone(),
            name_first: user.name_first.clone(),
            name_last: user.name_last.clone(),
            email: user.email.clone(),
            version: version.to_string(),
            last_login_time: None,
        }
    }

    /// `true` iff logged in with a real user id.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.logged_in && self.user_id > 0
    }

    /// Serialize for the store.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidSessionData`] if serialization fails.
    pub fn to_json(&self) -> Result<String, SessionError> {
        serde_json::to_string(self).map_err(|e| SessionError::InvalidSessionData(e.to_string()))
    }

    /// Parse a stored payload.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidSessionData`] if the payload is not a
    /// session record.
    pub fn from_json(payload: &str) -> Result<Self, SessionError> {
        serde_json::from_str(payload).map_err(|e| SessionError::InvalidSessionData(e.to_string()))
    }
}

/// A persisted user account, as handed over by the account subsystem.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// User id.
    #[serde(rename = "IDUser", default)]
    pub id_user: i64,

    /// Role rank.
    #[serde(rename = "IDRole", default)]
    pub id_role: i64,

    /// Role label.
    #[serde(rename = "UserRole", default)]
    pub user_role: String,

    /// Customer id.
    #[serde(rename = "IDCustomer", default)]
    pub id_customer: i64,

    /// Title.
    #[serde(rename = "Title", default)]
    pub title: String,

    /// First name.
    #[serde(rename = "NameFirst", default)]
    pub name_first: String,

    /// Last name.
    #[serde(rename = "NameLast", default)]
    pub name_last: String,

    /// Email.
    #[serde(rename = "Email", default)]
    pub email: String,
}

/// Login credentials.
///
/// Missing fields deserialize as empty strings and are rejected by the
/// presence check in `authenticate_user`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Login name.
    #[serde(default)]
    pub username: String,

    /// Password.
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    /// Build credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Both fields present (non-empty).
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
