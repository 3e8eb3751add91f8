use crate::{
    client::{DbError, Result},
    record::UserRecord,
};
use plauder_common::{
    credential::PasswordCredential,
    model::{
        Id,
        user::{NewUser, UpdateProfile, User, UserMarker, Username},
    },
};
use sqlx::{SqliteConnection, query, query_as, query_scalar};
use tracing::debug;

/// Persistence for the `users` table.
///
/// The password credential is only ever read through
/// [`UserRepository::fetch_credential`]; none of the [`User`] projections
/// carry it.
pub struct UserRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> UserRepository<'c> {
    pub(crate) fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&mut self, user: &NewUser) -> Result<Id<UserMarker>> {
        let result = query(
            "
            INSERT INTO users (username, password_hash, biography, avatar)
            VALUES (?, ?, ?, ?)
            ",
        )
        .bind(user.username.get())
        .bind(user.credential.as_str())
        .bind(&user.biography)
        .bind(&user.avatar)
        .execute(&mut *self.conn)
        .await
        .map_err(|err| DbError::from_username_write(err, &user.username))?;

        let id = result.last_insert_rowid();
        debug!(%id, username = %user.username, "Created user");

        Ok(id.into())
    }

    pub async fn fetch(&mut self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT
                users.id,
                users.username,
                users.biography,
                users.avatar,
                users.created_at
            FROM
                users
            WHERE
                users.id = ?
            ",
        )
        .bind(user_id.get())
        .fetch_optional(&mut *self.conn)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    pub async fn fetch_by_username(&mut self, username: &Username) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT
                users.id,
                users.username,
                users.biography,
                users.avatar,
                users.created_at
            FROM
                users
            WHERE
                users.username = ?
            ",
        )
        .bind(username.get())
        .fetch_optional(&mut *self.conn)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    /// Only meant for the login flow.
    pub async fn fetch_credential(
        &mut self,
        username: &Username,
    ) -> Result<Option<PasswordCredential>> {
        let credential = query_scalar::<_, String>(
            "
            SELECT users.password_hash
            FROM users
            WHERE users.username = ?
            ",
        )
        .bind(username.get())
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(credential.map(PasswordCredential::from_stored))
    }

    /// Overwrites the public profile fields and reads the row back.
    ///
    /// Returns `None` when no user has this id. The read-back is a separate
    /// statement, so a concurrent delete in between also yields `None`.
    pub async fn update(
        &mut self,
        user_id: Id<UserMarker>,
        profile: &UpdateProfile,
    ) -> Result<Option<User>> {
        let result = query(
            "
            UPDATE users
            SET
                username = ?,
                biography = ?,
                avatar = ?
            WHERE
                id = ?
            ",
        )
        .bind(profile.username.get())
        .bind(&profile.biography)
        .bind(&profile.avatar)
        .bind(user_id.get())
        .execute(&mut *self.conn)
        .await
        .map_err(|err| DbError::from_username_write(err, &profile.username))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        debug!(id = %user_id, "Updated user profile");
        self.fetch(user_id).await
    }

    pub async fn update_credential(
        &mut self,
        user_id: Id<UserMarker>,
        credential: &PasswordCredential,
    ) -> Result<bool> {
        let result = query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(credential.as_str())
            .bind(user_id.get())
            .execute(&mut *self.conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes the user row only. Their posts stay in storage but drop out of
    /// every aggregated read, since those inner-join on `users`.
    pub async fn delete(&mut self, user_id: Id<UserMarker>) -> Result<bool> {
        let result = query("DELETE FROM users WHERE id = ?")
            .bind(user_id.get())
            .execute(&mut *self.conn)
            .await?;

        debug!(id = %user_id, deleted = result.rows_affected(), "Deleted user");
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::DbClient;
    use plauder_common::credential::{CredentialVerifier, Password};

    fn username(name: &str) -> Username {
        Username::new(name.to_owned()).unwrap()
    }

    fn new_user(name: &str) -> NewUser {
        NewUser::new(
            username(name),
            PasswordCredential::from_stored(format!("hash-of-{name}")),
        )
    }

    #[tokio::test]
    async fn create_then_fetch() {
        let db = DbClient::connect_in_memory().await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        let id = conn.users().create(&new_user("alice")).await.unwrap();
        let user = conn.users().fetch(id).await.unwrap().unwrap();

        assert_eq!(user.id, id);
        assert_eq!(user.username.get(), "alice");
        assert_eq!(user.biography, "");
        assert_eq!(user.avatar, "");

        let by_name = conn.users().fetch_by_username(&username("alice")).await;
        assert_eq!(by_name.unwrap(), Some(user));
    }

    #[tokio::test]
    async fn ids_increase() {
        let db = DbClient::connect_in_memory().await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        let first = conn.users().create(&new_user("a")).await.unwrap();
        let second = conn.users().create(&new_user("b")).await.unwrap();

        assert!(second > first);
    }

    #[tokio::test]
    async fn duplicate_username_is_a_conflict() {
        let db = DbClient::connect_in_memory().await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        conn.users().create(&new_user("alice")).await.unwrap();
        let err = conn.users().create(&new_user("alice")).await.unwrap_err();

        assert!(matches!(err, DbError::UsernameTaken(name) if name.get() == "alice"));
        // Case-sensitive: a differently cased name is a different account.
        conn.users().create(&new_user("Alice")).await.unwrap();
    }

    #[tokio::test]
    async fn missing_users_are_none() {
        let db = DbClient::connect_in_memory().await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        assert_eq!(conn.users().fetch(Id::new(99)).await.unwrap(), None);
        assert_eq!(
            conn.users().fetch_by_username(&username("ghost")).await.unwrap(),
            None
        );
        assert_eq!(
            conn.users().fetch_credential(&username("ghost")).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn stored_credential_verifies() {
        let db = DbClient::connect_in_memory().await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let verifier = CredentialVerifier::default();
        let password = Password::new("p1".to_owned()).unwrap();

        let credential = verifier.hash(&password).unwrap();
        conn.users()
            .create(&NewUser::new(username("alice"), credential))
            .await
            .unwrap();

        let stored = conn
            .users()
            .fetch_credential(&username("alice"))
            .await
            .unwrap()
            .unwrap();
        assert!(verifier.verify(&password, &stored));
    }

    #[tokio::test]
    async fn update_profile() {
        let db = DbClient::connect_in_memory().await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let id = conn.users().create(&new_user("alice")).await.unwrap();
        let created_at = conn.users().fetch(id).await.unwrap().unwrap().created_at;

        let profile = UpdateProfile {
            username: username("alice2"),
            biography: "hi there".to_owned(),
            avatar: "cat.png".to_owned(),
        };
        let user = conn.users().update(id, &profile).await.unwrap().unwrap();

        assert_eq!(user.username.get(), "alice2");
        assert_eq!(user.biography, "hi there");
        assert_eq!(user.avatar, "cat.png");
        assert_eq!(user.created_at, created_at);
        assert_eq!(
            conn.users().fetch_by_username(&username("alice")).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn update_into_taken_username_fails() {
        let db = DbClient::connect_in_memory().await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        conn.users().create(&new_user("alice")).await.unwrap();
        let bob = conn.users().create(&new_user("bob")).await.unwrap();

        let profile = UpdateProfile {
            username: username("alice"),
            biography: String::new(),
            avatar: String::new(),
        };
        let err = conn.users().update(bob, &profile).await.unwrap_err();

        assert!(matches!(err, DbError::UsernameTaken(_)));
        let bob = conn.users().fetch(bob).await.unwrap().unwrap();
        assert_eq!(bob.username.get(), "bob");
    }

    #[tokio::test]
    async fn update_missing_user_is_none() {
        let db = DbClient::connect_in_memory().await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        let profile = UpdateProfile {
            username: username("nobody"),
            biography: String::new(),
            avatar: String::new(),
        };
        assert_eq!(conn.users().update(Id::new(5), &profile).await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_credential_replaces_hash() {
        let db = DbClient::connect_in_memory().await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let id = conn.users().create(&new_user("alice")).await.unwrap();
        let replacement = PasswordCredential::from_stored("new-hash".to_owned());

        assert!(conn.users().update_credential(id, &replacement).await.unwrap());
        assert!(
            !conn
                .users()
                .update_credential(Id::new(404), &replacement)
                .await
                .unwrap()
        );

        let stored = conn.users().fetch_credential(&username("alice")).await;
        assert_eq!(stored.unwrap(), Some(replacement));
    }

    #[tokio::test]
    async fn delete_user() {
        let db = DbClient::connect_in_memory().await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let id = conn.users().create(&new_user("alice")).await.unwrap();

        assert!(conn.users().delete(id).await.unwrap());
        assert!(!conn.users().delete(id).await.unwrap());
        assert_eq!(conn.users().fetch(id).await.unwrap(), None);
    }
}
