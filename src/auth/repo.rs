use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::auth::repo_types::{DirectoryError, NewUser, User};

/// Storage seam for user records. Handlers only see this trait.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by exact (case-sensitive) email.
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;

    /// Append a user, assigning the next sequential id.
    async fn insert(&self, new_user: NewUser) -> Result<User, DirectoryError>;

    /// All users in registration order.
    async fn list(&self) -> anyhow::Result<Vec<User>>;

    async fn count(&self) -> anyhow::Result<usize>;
}

/// Process-lifetime user list. Contents are lost on restart.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<Vec<User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn insert(&self, new_user: NewUser) -> Result<User, DirectoryError> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == new_user.email) {
            return Err(DirectoryError::DuplicateEmail);
        }
        let user = User {
            id: users.len() as u64 + 1,
            fullname: new_user.fullname,
            email: new_user.email,
            password: new_user.password,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn list(&self) -> anyhow::Result<Vec<User>> {
        Ok(self.users.read().await.clone())
    }

    async fn count(&self) -> anyhow::Result<usize> {
        Ok(self.users.read().await.len())
    }
}
