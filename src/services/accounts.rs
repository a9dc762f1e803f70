use sqlx::{Connection, PgConnection};
use thiserror::Error;

use crate::core::security;
use crate::core::time::primitive_now_utc;
use crate::db::is_unique_violation;
use crate::db::models::User;
use crate::db::types::UserEntity;
use crate::repositories;
use crate::services::credentials::{self, IssuedCredential};

pub(crate) const DEFAULT_FULL_NAME: &str = "New User";
const MAX_USERNAME_COLLISIONS: u32 = 5;

/// Input for an admin-created student or teacher account.
#[derive(Debug, Clone)]
pub(crate) struct NewAccount {
    pub(crate) entity: UserEntity,
    pub(crate) full_name: String,
    pub(crate) email: Option<String>,
    pub(crate) phone: Option<String>,
    pub(crate) gender: Option<String>,
    pub(crate) class_id: Option<i64>,
    pub(crate) subject_id: Option<i64>,
}

#[derive(Debug)]
pub(crate) struct ProvisionedAccount {
    pub(crate) user: User,
    pub(crate) credential: IssuedCredential,
}

#[derive(Debug, Error)]
pub(crate) enum ProvisionError {
    #[error("Class {0} does not exist.")]
    ClassNotFound(i64),
    #[error("Class {0} is full.")]
    ClassFull(i64),
    #[error("Subject {0} does not exist.")]
    SubjectNotFound(i64),
    #[error("password hashing failed")]
    Hashing(#[from] security::SecurityError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl ProvisionError {
    /// Errors the admin can fix by changing the input.
    pub(crate) fn is_user_facing(&self) -> bool {
        matches!(self, Self::ClassNotFound(_) | Self::ClassFull(_) | Self::SubjectNotFound(_))
    }
}

/// Trims and turns blank strings into `None`.
pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Fails when a class is at capacity; `None` capacity means unlimited.
pub(crate) async fn ensure_class_has_room(
    conn: &mut PgConnection,
    class_id: i64,
) -> Result<(), ProvisionError> {
    let class = repositories::classes::find_by_id(&mut *conn, class_id)
        .await?
        .ok_or(ProvisionError::ClassNotFound(class_id))?;

    if let Some(capacity) = class.max_students {
        let enrolled = repositories::students::count_in_class(&mut *conn, class_id).await?;
        if enrolled >= i64::from(capacity) {
            return Err(ProvisionError::ClassFull(class_id));
        }
    }

    Ok(())
}

pub(crate) async fn ensure_subject_exists(
    conn: &mut PgConnection,
    subject_id: i64,
) -> Result<(), ProvisionError> {
    repositories::subjects::find_by_id(&mut *conn, subject_id)
        .await?
        .map(|_| ())
        .ok_or(ProvisionError::SubjectNotFound(subject_id))
}

/// Inserts the user under the first free generated username. A concurrent insert
/// that takes the same name is rolled back to a savepoint and the next suffix tried.
async fn create_user_row(
    conn: &mut PgConnection,
    account: &NewAccount,
    password_hash: &str,
) -> Result<User, ProvisionError> {
    let seed = credentials::username_seed(&account.full_name, account.entity.as_str());
    let base = credentials::normalize_username_base(seed);
    let mut attempt = 1;
    let mut collisions = 0;

    loop {
        let (username, probed) =
            credentials::next_free_username(&mut *conn, &base, attempt).await?;
        let mut savepoint = conn.begin().await?;
        let created = repositories::users::create(
            &mut *savepoint,
            repositories::users::CreateUser {
                username: &username,
                password_hash,
                full_name: Some(&account.full_name),
                email: account.email.as_deref(),
                phone: account.phone.as_deref(),
                gender: account.gender.as_deref(),
                role: account.entity.role(),
                force_password_change: true,
                created_at: primitive_now_utc(),
            },
        )
        .await;

        match created {
            Ok(user) => {
                savepoint.commit().await?;
                return Ok(user);
            }
            Err(err) if is_unique_violation(&err) && collisions < MAX_USERNAME_COLLISIONS => {
                savepoint.rollback().await?;
                tracing::debug!(username = %username, "Generated username taken concurrently");
                collisions += 1;
                attempt = probed + 1;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// Creates the user with a generated username and temporary password, plus the
/// matching student or teacher row. Runs on the caller's transaction.
pub(crate) async fn provision(
    conn: &mut PgConnection,
    account: NewAccount,
    temp_password_length: usize,
) -> Result<ProvisionedAccount, ProvisionError> {
    match account.entity {
        UserEntity::Student => {
            if let Some(class_id) = account.class_id {
                ensure_class_has_room(&mut *conn, class_id).await?;
            }
        }
        UserEntity::Teacher => {
            if let Some(subject_id) = account.subject_id {
                ensure_subject_exists(&mut *conn, subject_id).await?;
            }
        }
    }

    let temp_password = credentials::generate_temp_password(temp_password_length);
    let password_hash = security::hash_password(&temp_password)?;
    let user = create_user_row(&mut *conn, &account, &password_hash).await?;

    match account.entity {
        UserEntity::Student => {
            repositories::students::create(&mut *conn, user.user_id, account.class_id).await?;
        }
        UserEntity::Teacher => {
            repositories::teachers::create(&mut *conn, user.user_id, account.subject_id).await?;
        }
    }

    let credential = IssuedCredential {
        full_name: account.full_name,
        email: account.email.unwrap_or_default(),
        username: user.username.clone(),
        password: temp_password,
    };

    Ok(ProvisionedAccount { user, credential })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::db::types::UserRole;
    use crate::test_support;

    fn student(full_name: &str) -> NewAccount {
        NewAccount {
            entity: UserEntity::Student,
            full_name: full_name.to_string(),
            email: None,
            phone: None,
            gender: None,
            class_id: None,
            subject_id: None,
        }
    }

    #[test]
    fn non_blank_trims_and_drops_empty() {
        assert_eq!(non_blank(Some("  a@b.c ")), Some("a@b.c".to_string()));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }

    #[test]
    fn only_input_errors_are_user_facing() {
        assert!(ProvisionError::ClassFull(3).is_user_facing());
        assert!(!ProvisionError::Database(sqlx::Error::RowNotFound).is_user_facing());
        assert_eq!(ProvisionError::ClassFull(3).to_string(), "Class 3 is full.");
    }

    #[tokio::test]
    async fn concurrent_insert_of_same_name_moves_to_next_suffix() {
        let ctx = test_support::setup_test_context().await;
        let pool = ctx.state.db().clone();

        // Holds "alice" uncommitted so the provisioning probe still sees it free.
        let mut holder = pool.begin().await.expect("begin holder");
        let password_hash = security::hash_password("secret1").expect("hash");
        repositories::users::create(
            &mut *holder,
            repositories::users::CreateUser {
                username: "alice",
                password_hash: &password_hash,
                full_name: Some("Alice Holder"),
                email: None,
                phone: None,
                gender: None,
                role: UserRole::Student,
                force_password_change: false,
                created_at: primitive_now_utc(),
            },
        )
        .await
        .expect("insert holder");

        let provisioning = tokio::spawn({
            let pool = pool.clone();
            async move {
                let mut tx = pool.begin().await.expect("begin");
                let provisioned = provision(&mut tx, student("Alice Smith"), 10).await;
                tx.commit().await.expect("commit");
                provisioned
            }
        });
        tokio::time::sleep(Duration::from_millis(300)).await;
        holder.commit().await.expect("commit holder");

        let provisioned = provisioning.await.expect("join").expect("provision");
        assert_eq!(provisioned.user.username, "alice2");
        assert_eq!(provisioned.credential.username, "alice2");
        assert!(repositories::students::find_by_user_id(&pool, provisioned.user.user_id)
            .await
            .expect("query")
            .is_some());
    }
}
