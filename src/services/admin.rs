use uuid::Uuid;

use crate::db::Database;
use crate::error::{is_unique_violation, AppError, AppResult};
use crate::models::Admin;
use crate::utils::password::{hash_password, verify_password};
use crate::utils::time::current_timestamp_seconds;

const ADMIN_COLUMNS: &str =
    "id, name, email, password, active, last_login_at, created_at, updated_at";

pub struct AdminService<'a> {
    db: &'a Database,
}

impl<'a> AdminService<'a> {
    pub fn new(db: &'a Database) -> Self {
        AdminService { db }
    }

    pub async fn create(&self, name: &str, email: &str, password: &str) -> AppResult<Admin> {
        let id = Uuid::new_v4().to_string();
        let password_hash = hash_password(password)?;
        let now = current_timestamp_seconds();

        sqlx::query(
            r#"
            INSERT INTO admin (id, name, email, password, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&id)
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(true)
        .bind(now)
        .bind(now)
        .execute(&self.db.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("An admin with this email already exists".to_string())
            } else {
                AppError::Database(e)
            }
        })?;

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| AppError::Internal("Failed to create admin".to_string()))
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<Option<Admin>> {
        let admin = sqlx::query_as::<_, Admin>(&format!(
            "SELECT {} FROM admin WHERE id = $1",
            ADMIN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db.pool)
        .await?;

        Ok(admin)
    }

    pub async fn get_by_email(&self, email: &str) -> AppResult<Option<Admin>> {
        let admin = sqlx::query_as::<_, Admin>(&format!(
            "SELECT {} FROM admin WHERE email = $1",
            ADMIN_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.db.pool)
        .await?;

        Ok(admin)
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admin")
            .fetch_one(&self.db.pool)
            .await?;
        Ok(count)
    }

    /// Checks credentials against an active admin. A deactivated account
    /// is rejected even with the correct password.
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<Admin> {
        let admin = self
            .get_by_email(email)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

        check_credentials(&admin, password)?;

        Ok(admin)
    }

    pub async fn touch_last_login(&self, id: &str) -> AppResult<i64> {
        let now = current_timestamp_seconds();

        sqlx::query("UPDATE admin SET last_login_at = $1, updated_at = $1 WHERE id = $2")
            .bind(now)
            .bind(id)
            .execute(&self.db.pool)
            .await?;

        Ok(now)
    }

    /// Any admin id, creating a deactivated placeholder when the table is
    /// empty. Used by the settings bootstrap, which needs an `updated_by`
    /// before any real admin has been provisioned.
    pub async fn ensure_any_admin(&self) -> AppResult<String> {
        let existing: Option<String> =
            sqlx::query_scalar("SELECT id FROM admin ORDER BY created_at ASC LIMIT 1")
                .fetch_optional(&self.db.pool)
                .await?;

        if let Some(id) = existing {
            return Ok(id);
        }

        let id = Uuid::new_v4().to_string();
        let password_hash = hash_password(&Uuid::new_v4().to_string())?;
        let now = current_timestamp_seconds();

        sqlx::query(
            r#"
            INSERT INTO admin (id, name, email, password, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(&id)
        .bind("System")
        .bind("system@localhost")
        .bind(password_hash)
        .bind(false)
        .bind(now)
        .bind(now)
        .execute(&self.db.pool)
        .await?;

        let id: String =
            sqlx::query_scalar("SELECT id FROM admin ORDER BY created_at ASC LIMIT 1")
                .fetch_one(&self.db.pool)
                .await?;

        Ok(id)
    }
}

/// The active check runs before the password check, so a deactivated
/// account is turned away regardless of the password supplied.
fn check_credentials(admin: &Admin, password: &str) -> AppResult<()> {
    if !admin.active {
        return Err(AppError::Unauthorized("Account is not active".to_string()));
    }

    if !verify_password(password, &admin.password)? {
        return Err(AppError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin_with(password_hash: String, active: bool) -> Admin {
        Admin {
            id: "admin-1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: password_hash,
            active,
            last_login_at: None,
            created_at: 1,
            updated_at: 1,
        }
    }

    #[test]
    fn test_deactivated_admin_rejected_with_correct_password() {
        let hash = hash_password("hunter22").unwrap();
        let admin = admin_with(hash, false);

        let err = check_credentials(&admin, "hunter22").unwrap_err();
        match err {
            AppError::Unauthorized(m) => assert_eq!(m, "Account is not active"),
            other => panic!("expected Unauthorized, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_password_rejected() {
        let hash = hash_password("hunter22").unwrap();
        let admin = admin_with(hash, true);

        assert!(matches!(
            check_credentials(&admin, "wrong"),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_active_admin_with_correct_password_accepted() {
        let hash = hash_password("hunter22").unwrap();
        let admin = admin_with(hash, true);

        assert!(check_credentials(&admin, "hunter22").is_ok());
    }
}
