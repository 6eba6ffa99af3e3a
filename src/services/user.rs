use uuid::Uuid;

use crate::db::Database;
use crate::error::{is_unique_violation, AppError, AppResult};
use crate::models::User;
use crate::query::QueryOptions;
use crate::utils::password::{hash_password, verify_password};
use crate::utils::time::current_timestamp_seconds;

const USER_COLUMNS: &str = "id, name, email, password, active, created_at, updated_at";

pub struct UserService<'a> {
    db: &'a Database,
}

impl<'a> UserService<'a> {
    pub fn new(db: &'a Database) -> Self {
        UserService { db }
    }

    pub async fn create(&self, name: &str, email: &str, password: &str) -> AppResult<User> {
        let id = Uuid::new_v4().to_string();
        let password_hash = hash_password(password)?;
        let now = current_timestamp_seconds();

        sqlx::query(
            r#"
            INSERT INTO site_user (id, name, email, password, active, created_at, updated_at)
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
                AppError::Conflict("A user with this email already exists".to_string())
            } else {
                AppError::Database(e)
            }
        })?;

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| AppError::Internal("Failed to create user".to_string()))
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM site_user WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db.pool)
        .await?;

        Ok(user)
    }

    pub async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM site_user WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.db.pool)
        .await?;

        Ok(user)
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<User> {
        let user = self
            .get_by_email(email)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

        if !user.active {
            return Err(AppError::Unauthorized("Account is not active".to_string()));
        }

        if !verify_password(password, &user.password)? {
            return Err(AppError::Unauthorized(
                "Invalid email or password".to_string(),
            ));
        }

        Ok(user)
    }

    /// Paginated listing driven by the query engine: filter, sort and
    /// page window come straight from the request's query parameters.
    pub async fn list(&self, opts: &QueryOptions) -> AppResult<(Vec<User>, i64)> {
        let (where_clause, binds) = opts.where_clause(1);

        let count_sql = format!("SELECT COUNT(*) FROM site_user {}", where_clause);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for bind in &binds {
            count_query = count_query.bind(bind);
        }
        let total = count_query.fetch_one(&self.db.pool).await?;

        let list_sql = format!(
            "SELECT {} FROM site_user {} {} LIMIT {} OFFSET {}",
            USER_COLUMNS,
            where_clause,
            opts.order_clause(),
            opts.limit,
            opts.offset()
        );
        let mut list_query = sqlx::query_as::<_, User>(&list_sql);
        for bind in &binds {
            list_query = list_query.bind(bind);
        }
        let users = list_query.fetch_all(&self.db.pool).await?;

        Ok((users, total))
    }
}
