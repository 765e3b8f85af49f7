use crate::domain::loan::{Role, User};
use crate::domain::value_objects::UserId;
use crate::ports::user_directory::{Result, UserDirectory as UserDirectoryTrait};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Mock implementation of UserDirectory
///
/// Keeps users and their roles in memory.
/// Readers and staff are registered up front; anyone else resolves to `None`.
pub struct UserDirectory {
    users: Mutex<HashMap<UserId, User>>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
        }
    }

    /// Register a user with the given roles, replacing any previous entry
    pub fn add_user(&self, user_id: UserId, roles: Vec<Role>) {
        self.users
            .lock()
            .unwrap()
            .insert(user_id, User::new(user_id, roles));
    }

    /// Register a reader and return the generated id
    pub fn add_reader(&self) -> UserId {
        let user_id = UserId::new();
        self.add_user(user_id, vec![Role::Reader]);
        user_id
    }

    /// Register a staff member and return the generated id
    pub fn add_staff(&self) -> UserId {
        let user_id = UserId::new();
        self.add_user(user_id, vec![Role::Staff]);
        user_id
    }
}

impl Default for UserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserDirectoryTrait for UserDirectory {
    async fn find_user(&self, user_id: UserId) -> Result<Option<User>> {
        Ok(self.users.lock().unwrap().get(&user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_registered_roles_are_returned() {
        let directory = UserDirectory::new();
        let staff_reader = UserId::new();
        directory.add_user(staff_reader, vec![Role::Staff, Role::Reader]);

        let user = directory.find_user(staff_reader).await.unwrap().unwrap();
        assert!(user.is_staff());
        assert!(user.is_reader());
    }

    #[tokio::test]
    async fn test_unknown_user_is_none() {
        let directory = UserDirectory::new();
        directory.add_reader();

        assert!(directory.find_user(UserId::new()).await.unwrap().is_none());
    }
}
