use sqlx::PgPool;

/// Connect, migrate, verify the status lookup table matches `SessionStatus`.
#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_full_bootstrap(pool: PgPool) {
    pullup_db::health_check(&pool).await.unwrap();

    let rows: Vec<(i16, String)> =
        sqlx::query_as("SELECT id, name FROM session_statuses ORDER BY id")
            .fetch_all(&pool)
            .await
            .unwrap();

    for (id, name) in rows.iter() {
        let status = pullup_core::training_session::SessionStatus::from_id(*id)
            .unwrap_or_else(|| panic!("status id {id} has no enum variant"));
        assert_eq!(status.as_str(), name);
    }
    assert_eq!(rows.len(), 4);
}
