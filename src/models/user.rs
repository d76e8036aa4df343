use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = String;
pub type ConnectionId = Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Driver,
    Rider,
}

/// An identity bound to a live connection.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub role: Role,
    pub connection: Option<ConnectionId>,
}
