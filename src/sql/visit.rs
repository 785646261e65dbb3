//! Visited-location persistence for PostgreSQL database.
//!
//! Visits belong to one animal. Writers mutate them only while holding the
//! owning animal's row lock, so these operations take the caller's
//! transaction.

use sqlx::{PgPool, Postgres, Transaction};

use super::SqlResult;
use crate::search::Page;
use crate::visit::{VisitFilter, VisitedLocation};
use crate::AppError;

/// Inserts a visit at the end of an animal's sequence.
///
/// # Returns
/// * `Ok(VisitedLocation)` - The visit with its assigned id
pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    animal_id: i32,
    visit: &VisitedLocation,
) -> SqlResult<VisitedLocation> {
    let id = sqlx::query_scalar::<_, i32>(
        r#"
        INSERT INTO visited_locations (animal_id, location_id, visited_at)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(animal_id)
    .bind(visit.location_id)
    .bind(visit.visited_at)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| {
        eprintln!("Database error inserting visited location: {}", e);
        AppError::from(e)
    })?;
    Ok(VisitedLocation { id, ..*visit })
}

/// Repoints one visit at a different location. The timestamp stays.
pub async fn update_location(
    tx: &mut Transaction<'_, Postgres>,
    visit_id: i32,
    location_id: i32,
) -> SqlResult<()> {
    sqlx::query("UPDATE visited_locations SET location_id = $2 WHERE id = $1")
        .bind(visit_id)
        .bind(location_id)
        .execute(&mut **tx)
        .await
        .map(|_| ())
        .map_err(|e| {
            eprintln!("Database error updating visited location: {}", e);
            AppError::from(e)
        })
}

/// Deletes a batch of visits by id. Used for single deletes and for the
/// two-row cascade when removing the head of a sequence.
pub async fn delete_many(tx: &mut Transaction<'_, Postgres>, ids: &[i32]) -> SqlResult<()> {
    sqlx::query("DELETE FROM visited_locations WHERE id = ANY($1)")
        .bind(ids.to_vec())
        .execute(&mut **tx)
        .await
        .map(|_| ())
        .map_err(|e| {
            eprintln!("Database error deleting visited locations: {}", e);
            AppError::from(e)
        })
}

/// Searches one animal's visits, ordered by timestamp ascending with the id
/// breaking ties.
pub async fn search(
    pool: &PgPool,
    animal_id: i32,
    filter: &VisitFilter,
    page: Page,
) -> SqlResult<Vec<VisitedLocation>> {
    let mut query = sqlx::QueryBuilder::<Postgres>::new(
        "SELECT id, location_id, visited_at FROM visited_locations WHERE animal_id = ",
    );
    query.push_bind(animal_id);
    if let Some(start) = filter.range.start {
        query.push(" AND visited_at > ");
        query.push_bind(start);
    }
    if let Some(end) = filter.range.end {
        query.push(" AND visited_at < ");
        query.push_bind(end);
    }
    query.push(" ORDER BY visited_at ASC, id ASC LIMIT ");
    query.push_bind(page.size);
    query.push(" OFFSET ");
    query.push_bind(page.from);

    query
        .build_query_as::<VisitedLocation>()
        .fetch_all(pool)
        .await
        .map_err(|e| {
            eprintln!("Database error searching visited locations: {}", e);
            AppError::from(e)
        })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::account::NewAccount;
    use crate::animal::{Animal, Gender, NewAnimal};
    use crate::search::TimeRange;
    use crate::sql::tests::setup_test_db;

    async fn seed_animal(pool: &PgPool) -> (Animal, Vec<i32>) {
        let chipper = crate::sql::account::insert(
            pool,
            &NewAccount {
                first_name: "Field".to_string(),
                last_name: "Tech".to_string(),
                email: "tech@example.com".to_string(),
                password: "secret".to_string(),
            },
        )
        .await
        .unwrap();
        let mut points = Vec::new();
        for step in 0..4 {
            let point = crate::sql::location::insert(pool, f64::from(step), 0.0)
                .await
                .unwrap();
            points.push(point.id);
        }
        let wolf = crate::sql::animal_type::insert(pool, "wolf").await.unwrap();
        let mut tx = pool.begin().await.unwrap();
        let animal = crate::sql::animal::insert(
            &mut tx,
            Animal::chip(
                NewAnimal {
                    types: vec![wolf.id],
                    length: 120.0,
                    weight: 35.0,
                    height: 80.0,
                    gender: Gender::Female,
                    chipper_id: chipper.id,
                    chipping_location_id: points[0],
                },
                Utc::now(),
            ),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();
        (animal, points)
    }

    #[tokio::test]
    async fn insert_preserves_sequence_order() {
        let Some(pool) = setup_test_db().await else {
            return;
        };
        let (animal, points) = seed_animal(&pool).await;

        let mut tx = pool.begin().await.unwrap();
        let first = insert(&mut tx, animal.id, &VisitedLocation::new(points[1], Utc::now()))
            .await
            .unwrap();
        let second = insert(&mut tx, animal.id, &VisitedLocation::new(points[2], Utc::now()))
            .await
            .unwrap();
        tx.commit().await.unwrap();
        assert!(first.id < second.id);

        let fetched = crate::sql::animal::get(&pool, animal.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.visits().len(), 2);
        assert_eq!(fetched.visits()[0].location_id, points[1]);
        assert_eq!(fetched.visits()[1].location_id, points[2]);
    }

    #[tokio::test]
    async fn update_location_keeps_timestamp() {
        let Some(pool) = setup_test_db().await else {
            return;
        };
        let (animal, points) = seed_animal(&pool).await;

        let mut tx = pool.begin().await.unwrap();
        let visit = insert(&mut tx, animal.id, &VisitedLocation::new(points[1], Utc::now()))
            .await
            .unwrap();
        update_location(&mut tx, visit.id, points[2]).await.unwrap();
        tx.commit().await.unwrap();

        let visits = search(&pool, animal.id, &VisitFilter::default(), Page::default())
            .await
            .unwrap();
        assert_eq!(visits.len(), 1);
        assert_eq!(visits[0].id, visit.id);
        assert_eq!(visits[0].location_id, points[2]);
        // Postgres stores microseconds; compare at that precision.
        assert_eq!(
            visits[0].visited_at.timestamp_micros(),
            visit.visited_at.timestamp_micros()
        );
    }

    #[tokio::test]
    async fn delete_many_removes_a_batch() {
        let Some(pool) = setup_test_db().await else {
            return;
        };
        let (animal, points) = seed_animal(&pool).await;

        let mut tx = pool.begin().await.unwrap();
        let first = insert(&mut tx, animal.id, &VisitedLocation::new(points[1], Utc::now()))
            .await
            .unwrap();
        let second = insert(&mut tx, animal.id, &VisitedLocation::new(points[2], Utc::now()))
            .await
            .unwrap();
        let third = insert(&mut tx, animal.id, &VisitedLocation::new(points[3], Utc::now()))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = pool.begin().await.unwrap();
        delete_many(&mut tx, &[first.id, second.id]).await.unwrap();
        tx.commit().await.unwrap();

        let visits = search(&pool, animal.id, &VisitFilter::default(), Page::default())
            .await
            .unwrap();
        assert_eq!(visits.len(), 1);
        assert_eq!(visits[0].id, third.id);
    }

    #[tokio::test]
    async fn search_applies_strict_time_bounds() {
        let Some(pool) = setup_test_db().await else {
            return;
        };
        let (animal, points) = seed_animal(&pool).await;

        let stamps: Vec<chrono::DateTime<Utc>> = vec![
            "2024-01-01T00:00:00Z".parse().unwrap(),
            "2024-02-01T00:00:00Z".parse().unwrap(),
            "2024-03-01T00:00:00Z".parse().unwrap(),
        ];
        let mut tx = pool.begin().await.unwrap();
        for (step, stamp) in stamps.iter().enumerate() {
            insert(
                &mut tx,
                animal.id,
                &VisitedLocation::new(points[step + 1], *stamp),
            )
            .await
            .unwrap();
        }
        tx.commit().await.unwrap();

        // Bounds are strict, so visits at exactly the bound fall out.
        let filter = VisitFilter {
            range: TimeRange {
                start: Some(stamps[0]),
                end: Some(stamps[2]),
            },
        };
        let visits = search(&pool, animal.id, &filter, Page::default())
            .await
            .unwrap();
        assert_eq!(visits.len(), 1);
        assert_eq!(visits[0].location_id, points[2]);

        let paged = search(
            &pool,
            animal.id,
            &VisitFilter::default(),
            Page { from: 1, size: 1 },
        )
        .await
        .unwrap();
        assert_eq!(paged.len(), 1);
        assert_eq!(paged[0].location_id, points[2]);
    }
}
