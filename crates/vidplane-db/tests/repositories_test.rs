//! Repository tests against a real Postgres instance.

use sqlx::PgPool;
use uuid::Uuid;
use vidplane_core::models::{Organization, SubscriptionPlan};
use vidplane_core::AppError;
use vidplane_db::{OrganizationRepository, UsageRepository, VideoRepository};

async fn seed_org(pool: &PgPool, name: &str, plan: SubscriptionPlan) -> Organization {
    OrganizationRepository::new(pool.clone())
        .create(name, &format!("ops@{}.test", name), plan)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_cross_tenant_video_reads_are_not_found(pool: PgPool) {
    let videos = VideoRepository::new(pool.clone());
    let org_a = seed_org(&pool, "acme", SubscriptionPlan::Free).await;
    let org_b = seed_org(&pool, "globex", SubscriptionPlan::Free).await;

    let video = videos
        .create(
            org_a.id,
            Uuid::new_v4(),
            "clip.mp4",
            "videos/a/clip.mp4",
            1024,
            "video/mp4",
        )
        .await
        .unwrap();

    // Another tenant sees the same id as missing, on every read and on delete.
    assert!(matches!(
        videos.get_for_org(org_b.id, video.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(videos.list_for_org(org_b.id).await.unwrap().is_empty());
    assert!(matches!(
        videos.delete_cascade(org_b.id, video.id).await,
        Err(AppError::NotFound(_))
    ));

    // The owner still has it.
    assert_eq!(videos.get_for_org(org_a.id, video.id).await.unwrap().id, video.id);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_deletion_returns_original_plus_variant_bytes(pool: PgPool) {
    let usage = UsageRepository::new(pool.clone());
    let org = seed_org(&pool, "acme", SubscriptionPlan::Starter).await;

    assert!(usage.try_record_upload(&org, 10_000).await.unwrap());
    usage.record_transcoded_bytes(org.id, 4_000).await.unwrap();

    let record = usage.get_or_create(org.id).await.unwrap();
    assert_eq!(record.storage_bytes, 14_000);

    // Deleting the video frees exactly what the upload and the pipeline added.
    usage.record_deletion(org.id, 14_000).await.unwrap();
    let record = usage.get_or_create(org.id).await.unwrap();
    assert_eq!(record.storage_bytes, 0);
    assert_eq!(record.videos_uploaded, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_storage_counter_clamps_at_zero(pool: PgPool) {
    let usage = UsageRepository::new(pool.clone());
    let org = seed_org(&pool, "acme", SubscriptionPlan::Free).await;

    assert!(usage.try_record_upload(&org, 500).await.unwrap());
    usage.record_deletion(org.id, 9_999).await.unwrap();

    let record = usage.get_or_create(org.id).await.unwrap();
    assert_eq!(record.storage_bytes, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_concurrent_first_access_creates_one_month_row(pool: PgPool) {
    let usage = UsageRepository::new(pool.clone());
    let org = seed_org(&pool, "acme", SubscriptionPlan::Free).await;

    let (a, b, c) = tokio::join!(
        usage.get_or_create(org.id),
        usage.get_or_create(org.id),
        usage.get_or_create(org.id)
    );
    let a = a.unwrap();
    assert_eq!(a.id, b.unwrap().id);
    assert_eq!(a.id, c.unwrap().id);

    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM usage_records WHERE organization_id = $1")
            .bind(org.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(count, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_upload_gate_stops_at_plan_limit(pool: PgPool) {
    let usage = UsageRepository::new(pool.clone());
    let org = seed_org(&pool, "acme", SubscriptionPlan::Free).await;

    for _ in 0..10 {
        assert!(usage.try_record_upload(&org, 100).await.unwrap());
    }
    assert!(!usage.try_record_upload(&org, 100).await.unwrap());

    let decision = usage.can_upload_video(&org).await.unwrap();
    assert!(!decision.allowed);
    assert!(decision.reason.unwrap().contains("limit reached"));
}
