//! Account operations for PostgreSQL database.

use sqlx::{PgPool, Postgres, Transaction};

use super::SqlResult;
use crate::account::{Account, AccountFilter, NewAccount};
use crate::search::Page;
use crate::AppError;

/// Inserts a new account.
///
/// # Returns
/// * `Ok(Account)` - The stored account with its assigned id
/// * `Err(AppError::AlreadyExists)` - The email is taken
pub async fn insert(pool: &PgPool, account: &NewAccount) -> SqlResult<Account> {
    let result = sqlx::query_as::<_, Account>(
        r#"
        INSERT INTO accounts (first_name, last_name, email, password)
        VALUES ($1, $2, $3, $4)
        RETURNING id, first_name, last_name, email, password
        "#,
    )
    .bind(&account.first_name)
    .bind(&account.last_name)
    .bind(&account.email)
    .bind(&account.password)
    .fetch_one(pool)
    .await;

    match result {
        Ok(account) => Ok(account),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
            AppError::already_exists("account with this email already exists"),
        ),
        Err(e) => {
            eprintln!("Database error inserting account: {}", e);
            Err(AppError::from(e))
        }
    }
}

/// Fetches an account by id.
pub async fn get(pool: &PgPool, id: i32) -> SqlResult<Option<Account>> {
    sqlx::query_as::<_, Account>(
        "SELECT id, first_name, last_name, email, password FROM accounts WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        eprintln!("Database error fetching account: {}", e);
        AppError::from(e)
    })
}

/// Fetches an account by email. Used by authentication.
pub async fn get_by_email(pool: &PgPool, email: &str) -> SqlResult<Option<Account>> {
    sqlx::query_as::<_, Account>(
        "SELECT id, first_name, last_name, email, password FROM accounts WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        eprintln!("Database error fetching account by email: {}", e);
        AppError::from(e)
    })
}

/// Checks that an account exists, inside the caller's transaction.
pub async fn exists(tx: &mut Transaction<'_, Postgres>, id: i32) -> SqlResult<bool> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM accounts WHERE id = $1)")
        .bind(id)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            eprintln!("Database error checking account existence: {}", e);
            AppError::from(e)
        })
}

/// Case-insensitive substring search over first name, last name, and email,
/// ordered by id ascending.
pub async fn search(pool: &PgPool, filter: &AccountFilter, page: Page) -> SqlResult<Vec<Account>> {
    let mut query = sqlx::QueryBuilder::<Postgres>::new(
        "SELECT id, first_name, last_name, email, password FROM accounts",
    );
    let mut prefix = " WHERE ";
    if let Some(first_name) = &filter.first_name {
        query.push(prefix).push("first_name ILIKE '%' || ");
        query.push_bind(first_name).push(" || '%'");
        prefix = " AND ";
    }
    if let Some(last_name) = &filter.last_name {
        query.push(prefix).push("last_name ILIKE '%' || ");
        query.push_bind(last_name).push(" || '%'");
        prefix = " AND ";
    }
    if let Some(email) = &filter.email {
        query.push(prefix).push("email ILIKE '%' || ");
        query.push_bind(email).push(" || '%'");
    }
    query.push(" ORDER BY id ASC LIMIT ");
    query.push_bind(page.size);
    query.push(" OFFSET ");
    query.push_bind(page.from);

    query
        .build_query_as::<Account>()
        .fetch_all(pool)
        .await
        .map_err(|e| {
            eprintln!("Database error searching accounts: {}", e);
            AppError::from(e)
        })
}

/// Updates an account's fields. Returns false when the id does not exist.
///
/// # Returns
/// * `Err(AppError::AlreadyExists)` - The new email belongs to another account
pub async fn update(pool: &PgPool, account: &Account) -> SqlResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE accounts
        SET first_name = $2, last_name = $3, email = $4, password = $5, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(account.id)
    .bind(&account.first_name)
    .bind(&account.last_name)
    .bind(&account.email)
    .bind(&account.password)
    .execute(pool)
    .await;

    match result {
        Ok(result) => Ok(result.rows_affected() > 0),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
            AppError::already_exists("email already in use by another account"),
        ),
        Err(e) => {
            eprintln!("Database error updating account: {}", e);
            Err(AppError::from(e))
        }
    }
}

/// Deletes an account. Returns false when the id does not exist.
pub async fn delete(pool: &PgPool, id: i32) -> SqlResult<bool> {
    let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| {
            eprintln!("Database error deleting account: {}", e);
            AppError::from(e)
        })?;
    Ok(result.rows_affected() > 0)
}

/// True when any animal names this account as its chipper.
pub async fn is_chipper(pool: &PgPool, id: i32) -> SqlResult<bool> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM animals WHERE chipper_id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(|e| {
            eprintln!("Database error checking chipper references: {}", e);
            AppError::from(e)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::tests::setup_test_db;

    fn new_account(email: &str) -> NewAccount {
        NewAccount {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: email.to_string(),
            password: "secret".to_string(),
        }
    }

    #[tokio::test]
    async fn insert_get_roundtrip() {
        let Some(pool) = setup_test_db().await else {
            return;
        };
        let stored = insert(&pool, &new_account("ada@example.com")).await.unwrap();
        assert!(stored.id > 0);

        let fetched = get(&pool, stored.id).await.unwrap().unwrap();
        assert_eq!(fetched, stored);
        let by_email = get_by_email(&pool, "ada@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, stored.id);
        assert_eq!(get(&pool, stored.id + 1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_email_rejected() {
        let Some(pool) = setup_test_db().await else {
            return;
        };
        insert(&pool, &new_account("dup@example.com")).await.unwrap();
        let err = insert(&pool, &new_account("dup@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn search_matches_substrings_case_insensitively() {
        let Some(pool) = setup_test_db().await else {
            return;
        };
        insert(&pool, &new_account("grace@example.com")).await.unwrap();
        let mut other = new_account("alan@example.com");
        other.first_name = "Alan".to_string();
        insert(&pool, &other).await.unwrap();

        let filter = AccountFilter {
            first_name: Some("aDa".to_string()),
            last_name: None,
            email: None,
        };
        let hits = search(&pool, &filter, Page::default()).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].email, "grace@example.com");

        let all = search(&pool, &AccountFilter::default(), Page::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].id < all[1].id);
    }

    #[tokio::test]
    async fn update_and_delete() {
        let Some(pool) = setup_test_db().await else {
            return;
        };
        let mut stored = insert(&pool, &new_account("upd@example.com")).await.unwrap();
        stored.last_name = "Byron".to_string();
        assert!(update(&pool, &stored).await.unwrap());
        let fetched = get(&pool, stored.id).await.unwrap().unwrap();
        assert_eq!(fetched.last_name, "Byron");

        let other = insert(&pool, &new_account("taken@example.com")).await.unwrap();
        stored.email = other.email.clone();
        let err = update(&pool, &stored).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyExists(_)));

        assert!(delete(&pool, stored.id).await.unwrap());
        assert!(!delete(&pool, stored.id).await.unwrap());
    }

    #[tokio::test]
    async fn exists_and_is_chipper() {
        let Some(pool) = setup_test_db().await else {
            return;
        };
        let stored = insert(&pool, &new_account("chip@example.com")).await.unwrap();
        let mut tx = pool.begin().await.unwrap();
        assert!(exists(&mut tx, stored.id).await.unwrap());
        assert!(!exists(&mut tx, stored.id + 1).await.unwrap());
        tx.commit().await.unwrap();

        assert!(!is_chipper(&pool, stored.id).await.unwrap());
    }
}
