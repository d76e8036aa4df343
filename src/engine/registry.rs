use std::collections::HashMap;

use crate::models::user::{ConnectionId, Role, User, UserId};

/// What changed when a connection was bound to an identity.
#[derive(Debug, Default, PartialEq)]
pub struct Registration {
    /// Role the identity held before, when it registered again under a different one.
    pub previous_role: Option<Role>,
    /// Identity that was bound to this connection before and has been released.
    pub displaced: Option<User>,
}

/// Live connection to identity bindings.
///
/// A connection maps to at most one identity and an identity to at most one
/// connection. Reconnecting under the same id moves the binding.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    users: HashMap<UserId, User>,
    bindings: HashMap<ConnectionId, UserId>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        connection: ConnectionId,
        user_id: UserId,
        role: Role,
    ) -> Registration {
        let mut registration = Registration::default();

        let displaced_id = self
            .bindings
            .get(&connection)
            .filter(|bound| **bound != user_id)
            .cloned();
        if let Some(bound) = displaced_id {
            registration.displaced = self.users.remove(&bound);
        }

        match self.users.get_mut(&user_id) {
            Some(user) => {
                if let Some(old) = user.connection.filter(|old| *old != connection) {
                    self.bindings.remove(&old);
                }
                if user.role != role {
                    registration.previous_role = Some(user.role);
                    user.role = role;
                }
                user.connection = Some(connection);
            }
            None => {
                self.users.insert(
                    user_id.clone(),
                    User {
                        id: user_id.clone(),
                        role,
                        connection: Some(connection),
                    },
                );
            }
        }

        self.bindings.insert(connection, user_id);
        registration
    }

    pub fn resolve(&self, user_id: &str) -> Option<ConnectionId> {
        self.users.get(user_id).and_then(|user| user.connection)
    }

    pub fn role_of(&self, user_id: &str) -> Option<Role> {
        self.users.get(user_id).map(|user| user.role)
    }

    pub fn is_registered_as(&self, user_id: &str, role: Role) -> bool {
        self.role_of(user_id) == Some(role)
    }

    /// Removes whatever identity is bound to `connection`. No-op for unbound connections.
    pub fn unregister(&mut self, connection: ConnectionId) -> Option<User> {
        let user_id = self.bindings.remove(&connection)?;
        self.users.remove(&user_id)
    }

    pub fn connections_with_role(&self, role: Role) -> Vec<ConnectionId> {
        self.users
            .values()
            .filter(|user| user.role == role)
            .filter_map(|user| user.connection)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::ConnectionRegistry;
    use crate::models::user::Role;

    fn conn(seed: u128) -> Uuid {
        Uuid::from_u128(seed)
    }

    #[test]
    fn resolves_registered_identity() {
        let mut registry = ConnectionRegistry::new();
        registry.register(conn(1), "d1".to_string(), Role::Driver);

        assert_eq!(registry.resolve("d1"), Some(conn(1)));
        assert_eq!(registry.role_of("d1"), Some(Role::Driver));
        assert_eq!(registry.resolve("nobody"), None);
    }

    #[test]
    fn reconnect_moves_binding() {
        let mut registry = ConnectionRegistry::new();
        registry.register(conn(1), "r1".to_string(), Role::Rider);
        let registration = registry.register(conn(2), "r1".to_string(), Role::Rider);

        assert_eq!(registration.displaced, None);
        assert_eq!(registration.previous_role, None);
        assert_eq!(registry.resolve("r1"), Some(conn(2)));

        // The stale connection closing must not remove the reconnected identity.
        assert!(registry.unregister(conn(1)).is_none());
        assert_eq!(registry.resolve("r1"), Some(conn(2)));
    }

    #[test]
    fn registering_twice_on_same_connection_is_idempotent() {
        let mut registry = ConnectionRegistry::new();
        registry.register(conn(1), "d1".to_string(), Role::Driver);
        let registration = registry.register(conn(1), "d1".to_string(), Role::Driver);

        assert_eq!(registration, Default::default());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn new_identity_on_bound_connection_displaces_the_old_one() {
        let mut registry = ConnectionRegistry::new();
        registry.register(conn(1), "d1".to_string(), Role::Driver);
        let registration = registry.register(conn(1), "r1".to_string(), Role::Rider);

        assert_eq!(registration.displaced.map(|user| user.id), Some("d1".to_string()));
        assert_eq!(registry.resolve("d1"), None);
        assert_eq!(registry.resolve("r1"), Some(conn(1)));
    }

    #[test]
    fn role_switch_is_reported() {
        let mut registry = ConnectionRegistry::new();
        registry.register(conn(1), "u1".to_string(), Role::Rider);
        let registration = registry.register(conn(1), "u1".to_string(), Role::Driver);

        assert_eq!(registration.previous_role, Some(Role::Rider));
        assert!(registry.is_registered_as("u1", Role::Driver));
    }

    #[test]
    fn unregister_removes_only_the_bound_entry() {
        let mut registry = ConnectionRegistry::new();
        registry.register(conn(1), "d1".to_string(), Role::Driver);
        registry.register(conn(2), "d2".to_string(), Role::Driver);
        registry.register(conn(3), "r1".to_string(), Role::Rider);

        let removed = registry.unregister(conn(2)).unwrap();
        assert_eq!(removed.id, "d2");
        assert_eq!(registry.resolve("d1"), Some(conn(1)));
        assert_eq!(registry.resolve("r1"), Some(conn(3)));
        assert_eq!(registry.len(), 2);

        assert!(registry.unregister(conn(42)).is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn lists_connections_by_role() {
        let mut registry = ConnectionRegistry::new();
        registry.register(conn(1), "d1".to_string(), Role::Driver);
        registry.register(conn(2), "r1".to_string(), Role::Rider);
        registry.register(conn(3), "r2".to_string(), Role::Rider);

        let mut riders = registry.connections_with_role(Role::Rider);
        riders.sort();
        assert_eq!(riders, vec![conn(2), conn(3)]);
    }
}
