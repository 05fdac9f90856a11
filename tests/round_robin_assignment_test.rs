mod common;

use common::*;

use leadflow_core::constants::messages;
use leadflow_core::models::{AssignmentTrigger, CampaignStrategy, IntentionStatus, Lead};
use leadflow_core::{AssignmentOutcome, LeadStore, LeadflowError};

const A: i64 = 100;
const B: i64 = 200;
const C: i64 = 300;

fn assigned_user(outcome: &AssignmentOutcome) -> Option<i64> {
    match outcome {
        AssignmentOutcome::Assigned { user_id, .. } => Some(*user_id),
        _ => None,
    }
}

#[tokio::test]
async fn test_rotation_continues_from_cursor() {
    let harness = TestHarness::new();
    harness.seed_campaign(1, CampaignStrategy::Dynamic).await;
    harness.seed_assignees(1, &[A, B, C]).await;
    harness.set_cursor(1, 1).await;
    for id in [10, 11, 12] {
        harness.seed_sales_ready_lead(id, 1).await;
    }
    let service = harness.assignment();

    let first = service.assign_on_sales_ready(10).await;
    assert_eq!(
        first,
        AssignmentOutcome::Assigned {
            user_id: B,
            trigger: AssignmentTrigger::AutoRoundRobin,
            cursor_index: Some(1),
        }
    );
    assert_eq!(harness.cursor_index(1).await, Some(2));

    assert_eq!(assigned_user(&service.assign_on_sales_ready(11).await), Some(C));
    assert_eq!(harness.cursor_index(1).await, Some(0));

    assert_eq!(assigned_user(&service.assign_on_sales_ready(12).await), Some(A));
    assert_eq!(harness.cursor_index(1).await, Some(1));

    let cursor = harness.store.find_cursor(1).await.unwrap().unwrap();
    assert_eq!(cursor.last_assigned_at, Some(base_time()));
}

#[tokio::test]
async fn test_cursor_past_pool_heals_to_first_assignee() {
    let harness = TestHarness::new();
    harness.seed_campaign(1, CampaignStrategy::Dynamic).await;
    harness.seed_assignees(1, &[A, B, C]).await;
    harness.set_cursor(1, 7).await;
    harness.seed_sales_ready_lead(10, 1).await;

    let outcome = harness.assignment().assign_on_sales_ready(10).await;

    assert_eq!(assigned_user(&outcome), Some(A));
    assert_eq!(harness.cursor_index(1).await, Some(1));
}

#[tokio::test]
async fn test_inactive_assignees_are_skipped() {
    let harness = TestHarness::new();
    harness.seed_campaign(1, CampaignStrategy::Dynamic).await;
    harness.seed_assignees(1, &[A, B, C]).await;
    harness.pool().set_assignee_active(1, B, false).await.unwrap();
    harness.seed_sales_ready_lead(10, 1).await;
    harness.seed_sales_ready_lead(11, 1).await;
    let service = harness.assignment();

    assert_eq!(assigned_user(&service.assign_on_sales_ready(10).await), Some(A));
    assert_eq!(assigned_user(&service.assign_on_sales_ready(11).await), Some(C));
}

#[tokio::test]
async fn test_deactivation_heals_cursor_beyond_pool() {
    let harness = TestHarness::new();
    harness.seed_campaign(1, CampaignStrategy::Dynamic).await;
    harness.seed_assignees(1, &[A, B, C]).await;
    harness.set_cursor(1, 2).await;

    harness.pool().set_assignee_active(1, C, false).await.unwrap();

    assert_eq!(harness.cursor_index(1).await, Some(0));
}

#[tokio::test]
async fn test_empty_pool_records_reason() {
    let harness = TestHarness::new();
    harness.seed_campaign(1, CampaignStrategy::Dynamic).await;
    harness.seed_sales_ready_lead(10, 1).await;

    let outcome = harness.assignment().assign_on_sales_ready(10).await;

    assert!(matches!(outcome, AssignmentOutcome::NotAssigned { .. }));
    let lead = harness.lead(10).await;
    assert_eq!(lead.assigned_to, None);
    assert!(lead.assignment_error.is_some());
    assert!(lead.satisfies_assignment_invariant());
}

#[tokio::test]
async fn test_sales_ready_lead_without_campaign_records_reason() {
    let harness = TestHarness::new();
    let mut lead = Lead::new(10, "+5511777000010", None, base_time());
    lead.intention = Some("interested".to_string());
    lead.intention_status = IntentionStatus::Finalized;
    harness.save_lead(lead).await;

    let outcome = harness.assignment().assign_on_sales_ready(10).await;

    assert_eq!(
        outcome,
        AssignmentOutcome::NotAssigned {
            reason: messages::NO_CAMPAIGN.to_string(),
        }
    );
    assert!(!outcome.succeeded());
    let lead = harness.lead(10).await;
    assert_eq!(lead.assigned_to, None);
    assert_eq!(lead.assignment_error.as_deref(), Some(messages::NO_CAMPAIGN));
    assert!(lead.satisfies_assignment_invariant());
    assert!(harness.store.assignment_history(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_assignment_is_idempotent() {
    let harness = TestHarness::new();
    harness.seed_campaign(1, CampaignStrategy::Dynamic).await;
    harness.seed_assignees(1, &[A, B]).await;
    harness.seed_sales_ready_lead(10, 1).await;
    let service = harness.assignment();

    service.assign_on_sales_ready(10).await;
    let again = service.assign_on_sales_ready(10).await;

    assert_eq!(again, AssignmentOutcome::AlreadyAssigned { user_id: A });
    assert_eq!(harness.cursor_index(1).await, Some(1));
    assert_eq!(harness.store.assignment_history(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_lead_not_sales_ready_is_left_alone() {
    let harness = TestHarness::new();
    harness.seed_campaign(1, CampaignStrategy::Dynamic).await;
    harness.seed_assignees(1, &[A]).await;
    harness.seed_lead(10, 1, None).await;

    let outcome = harness.assignment().assign_on_sales_ready(10).await;

    assert_eq!(outcome, AssignmentOutcome::NotSalesReady);
    assert_eq!(harness.cursor_index(1).await, None);
}

#[tokio::test]
async fn test_storage_failure_leaves_cursor_untouched() {
    let harness = TestHarness::new();
    harness.seed_campaign(1, CampaignStrategy::Dynamic).await;
    harness.seed_assignees(1, &[A, B]).await;
    harness.set_cursor(1, 1).await;
    harness.seed_sales_ready_lead(10, 1).await;
    harness.store.set_fail_commits(true);

    let outcome = harness.assignment().assign_on_sales_ready(10).await;

    assert!(matches!(outcome, AssignmentOutcome::Failed { .. }));
    harness.store.set_fail_commits(false);
    assert_eq!(harness.cursor_index(1).await, Some(1));
    assert_eq!(harness.lead(10).await.assigned_to, None);
    assert!(harness.store.assignment_history(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_manual_assign_unassign_and_reassign_are_logged() {
    let harness = TestHarness::new();
    harness.seed_campaign(1, CampaignStrategy::Dynamic).await;
    harness.seed_assignees(1, &[A, B]).await;
    harness.seed_sales_ready_lead(10, 1).await;
    let service = harness.assignment();
    let operator = 9;

    let manual = service.assign_manually(10, C, operator).await;
    assert_eq!(assigned_user(&manual), Some(C));
    assert_eq!(harness.cursor_index(1).await, None);

    let conflicting = service.assign_manually(10, A, operator).await;
    assert!(matches!(conflicting, AssignmentOutcome::Rejected { .. }));

    let same = service.assign_manually(10, C, operator).await;
    assert_eq!(same, AssignmentOutcome::AlreadyAssigned { user_id: C });

    let reassigned = service.reassign(10, B, operator).await;
    assert_eq!(assigned_user(&reassigned), Some(B));

    let released = service.unassign(10, operator).await;
    assert_eq!(released, AssignmentOutcome::Unassigned { previous: B });
    let lead = harness.lead(10).await;
    assert_eq!(lead.assigned_to, None);
    assert!(lead.satisfies_assignment_invariant());

    let history = harness.store.assignment_history(10).await.unwrap();
    let triggers: Vec<AssignmentTrigger> = history.iter().map(|log| log.trigger).collect();
    assert_eq!(
        triggers,
        vec![
            AssignmentTrigger::Manual,
            AssignmentTrigger::Unassigned,
            AssignmentTrigger::Manual,
            AssignmentTrigger::Unassigned,
        ]
    );
    assert_eq!(history[2].previous_assignee, None);
    assert_eq!(history[1].previous_assignee, Some(C));
    assert!(history.iter().all(|log| log.actor_id == Some(operator)));

    let nothing_to_release = service.unassign(10, operator).await;
    assert!(matches!(nothing_to_release, AssignmentOutcome::Rejected { .. }));
}

#[tokio::test]
async fn test_sync_assignees_replaces_pool_in_order() {
    let harness = TestHarness::new();
    harness.seed_campaign(1, CampaignStrategy::Dynamic).await;
    harness.seed_assignees(1, &[A, B, C]).await;
    harness.set_cursor(1, 2).await;
    let pool = harness.pool();

    let sync = pool.sync_assignees(1, &[C, A, C]).await.unwrap();

    assert!(sync.cursor_reset);
    assert_eq!(sync.cursor.current_index, 0);
    let mut active: Vec<_> = sync.assignees.iter().filter(|a| a.is_active).collect();
    active.sort_by_key(|a| a.sort_order);
    let users: Vec<i64> = active.iter().map(|a| a.user_id).collect();
    assert_eq!(users, vec![C, A]);

    harness.seed_sales_ready_lead(10, 1).await;
    let outcome = harness.assignment().assign_on_sales_ready(10).await;
    assert_eq!(assigned_user(&outcome), Some(C));
}

#[tokio::test]
async fn test_sync_for_unknown_campaign() {
    let harness = TestHarness::new();

    let result = harness.pool().sync_assignees(42, &[A]).await;

    assert!(matches!(result, Err(LeadflowError::NotFound(_))));
}
