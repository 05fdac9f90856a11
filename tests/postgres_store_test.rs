//! PostgreSQL store tests
//!
//! Need a reachable `DATABASE_URL`; run with `cargo test -- --ignored`.

use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;

use leadflow_core::models::AssignmentTrigger;
use leadflow_core::services::LeadAssignmentService;
use leadflow_core::{
    AssignmentOutcome, AutomationState, EventPublisher, LeadStore, PostgresLeadStore, SystemClock,
};

async fn seed_campaign_with_pool(pool: &PgPool, user_ids: &[i64]) -> i64 {
    let campaign_id: i64 = sqlx::query_scalar(
        "INSERT INTO campaigns (name, strategy) VALUES ('Spring launch', 'dynamic') RETURNING id",
    )
    .fetch_one(pool)
    .await
    .unwrap();

    for (position, user_id) in user_ids.iter().enumerate() {
        sqlx::query(
            "INSERT INTO campaign_assignees (campaign_id, user_id, sort_order) VALUES ($1, $2, $3)",
        )
        .bind(campaign_id)
        .bind(user_id)
        .bind(position as i32)
        .execute(pool)
        .await
        .unwrap();
    }
    campaign_id
}

async fn seed_sales_ready_lead(pool: &PgPool, campaign_id: i64) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO leads (phone, campaign_id, intention, intention_status)
         VALUES ('+551100000000', $1, 'interested', 'finalized') RETURNING id",
    )
    .bind(campaign_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

#[sqlx::test(migrator = "leadflow_core::database::MIGRATOR")]
#[ignore = "requires PostgreSQL"]
async fn test_round_robin_against_postgres(pool: PgPool) {
    let campaign_id = seed_campaign_with_pool(&pool, &[100, 200]).await;
    let store: Arc<dyn LeadStore> = Arc::new(PostgresLeadStore::new(pool.clone()));
    let service =
        LeadAssignmentService::new(store.clone(), Arc::new(SystemClock), EventPublisher::default());

    let first = seed_sales_ready_lead(&pool, campaign_id).await;
    let second = seed_sales_ready_lead(&pool, campaign_id).await;

    assert_eq!(
        service.assign_on_sales_ready(first).await,
        AssignmentOutcome::Assigned {
            user_id: 100,
            trigger: AssignmentTrigger::AutoRoundRobin,
            cursor_index: Some(0),
        }
    );
    assert!(matches!(
        service.assign_on_sales_ready(second).await,
        AssignmentOutcome::Assigned { user_id: 200, .. }
    ));

    let cursor = store.find_cursor(campaign_id).await.unwrap().unwrap();
    assert_eq!(cursor.current_index, 0);

    let history = store.assignment_history(first).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].cursor_index, Some(0));
}

#[sqlx::test(migrator = "leadflow_core::database::MIGRATOR")]
#[ignore = "requires PostgreSQL"]
async fn test_lead_round_trips_through_transaction(pool: PgPool) {
    let campaign_id = seed_campaign_with_pool(&pool, &[]).await;
    let lead_id = seed_sales_ready_lead(&pool, campaign_id).await;
    let store = PostgresLeadStore::new(pool);

    let mut tx = store.begin().await.unwrap();
    let mut lead = tx.lock_lead(lead_id).await.unwrap().unwrap();
    lead.automation_status = AutomationState::Failed;
    lead.automation_error = Some("whatsapp failed: timeout".to_string());
    lead.updated_at = Utc::now();
    tx.update_lead(&lead).await.unwrap();
    tx.commit().await.unwrap();

    let reloaded = store.find_lead(lead_id).await.unwrap().unwrap();
    assert_eq!(reloaded.automation_status, AutomationState::Failed);
    assert_eq!(
        reloaded.automation_error.as_deref(),
        Some("whatsapp failed: timeout")
    );

    let attention = store
        .leads_needing_attention(Some(campaign_id), 10)
        .await
        .unwrap();
    assert_eq!(attention.len(), 1);
}
