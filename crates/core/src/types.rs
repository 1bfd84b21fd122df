use serde::{Deserialize, Serialize};

/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// The two kinds of account that can hold a push connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    Rider,
    Captain,
}

impl ActorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rider => "rider",
            Self::Captain => "captain",
        }
    }

    /// Parse a JWT role claim.
    pub fn from_role(role: &str) -> Option<Self> {
        match role {
            "rider" => Some(Self::Rider),
            "captain" => Some(Self::Captain),
            _ => None,
        }
    }
}

/// Identity of a rider or captain.
///
/// Rider and captain ids come from different tables, so the kind is part
/// of the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorKey {
    pub kind: ActorKind,
    pub id: DbId,
}

impl ActorKey {
    pub fn rider(id: DbId) -> Self {
        Self {
            kind: ActorKind::Rider,
            id,
        }
    }

    pub fn captain(id: DbId) -> Self {
        Self {
            kind: ActorKind::Captain,
            id,
        }
    }
}

impl std::fmt::Display for ActorKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}
