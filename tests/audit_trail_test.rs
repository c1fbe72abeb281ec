mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::{setup_test_env, setup_test_env_with};
use stockpile_backend::services::geo::{GeoError, GeoResolver};
use stockpile_backend::types::internal::audit::{
    AuditAction, AuditEvent, AuditQuery, GeoInfo,
};
use stockpile_backend::types::internal::context::RequestContext;

struct FixedGeoResolver;

#[async_trait]
impl GeoResolver for FixedGeoResolver {
    async fn resolve(&self, _ip: &str) -> Result<Option<GeoInfo>, GeoError> {
        Ok(Some(GeoInfo {
            country: Some("Germany".to_string()),
            city: Some("Berlin".to_string()),
            region: Some("Berlin".to_string()),
            latitude: Some(52.52),
            longitude: Some(13.405),
        }))
    }
}

struct FailingGeoResolver;

#[async_trait]
impl GeoResolver for FailingGeoResolver {
    async fn resolve(&self, _ip: &str) -> Result<Option<GeoInfo>, GeoError> {
        Err(GeoError::Request("unreachable".to_string()))
    }
}

fn ctx_for(actor: &str) -> RequestContext {
    RequestContext::authenticated(actor, Some("203.0.113.7".to_string()), None)
}

#[tokio::test]
async fn test_queued_events_are_written_in_order() {
    let env = setup_test_env().await;
    let ctx = ctx_for("actor-1");

    for i in 0..3 {
        env.recorder
            .record(
                AuditEvent::new(AuditAction::Update, "item")
                    .with_context(&ctx)
                    .with_resource_id(format!("item-{}", i)),
            )
            .await;
    }

    let entries = env.audit_entries("UPDATE").await;
    assert_eq!(entries.len(), 3);
    let ids: Vec<_> = entries
        .iter()
        .map(|e| e.resource_id.clone().unwrap())
        .collect();
    assert_eq!(ids, vec!["item-0", "item-1", "item-2"]);
}

#[tokio::test]
async fn test_enrichment_fills_geo_columns() {
    let env = setup_test_env_with(Some(Arc::new(FixedGeoResolver)), 5).await;
    let ctx = ctx_for("actor-1");

    env.recorder
        .record(AuditEvent::new(AuditAction::Create, "item").with_context(&ctx))
        .await;
    // First drain writes the row and queues enrichment; second applies it
    env.recorder.drain().await;
    env.recorder.drain().await;

    let entries = env.audit_entries("CREATE").await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].geo_country.as_deref(), Some("Germany"));
    assert_eq!(entries[0].geo_city.as_deref(), Some("Berlin"));
    assert_eq!(entries[0].geo_latitude, Some(52.52));
}

#[tokio::test]
async fn test_failed_enrichment_leaves_entry_valid() {
    let env = setup_test_env_with(Some(Arc::new(FailingGeoResolver)), 5).await;
    let ctx = ctx_for("actor-1");

    env.recorder
        .record(AuditEvent::new(AuditAction::Create, "item").with_context(&ctx))
        .await;
    env.recorder.drain().await;
    env.recorder.drain().await;

    let entries = env.audit_entries("CREATE").await;
    assert_eq!(entries.len(), 1);
    // Absence of geolocation is a valid terminal state
    assert!(entries[0].geo_country.is_none());
    assert_eq!(entries[0].ip_address.as_deref(), Some("203.0.113.7"));
}

#[tokio::test]
async fn test_events_without_ip_are_not_enriched() {
    let env = setup_test_env_with(Some(Arc::new(FixedGeoResolver)), 5).await;

    env.recorder
        .record(
            AuditEvent::new(AuditAction::Create, "item").with_actor("actor-1"),
        )
        .await;
    env.recorder.drain().await;
    env.recorder.drain().await;

    let entries = env.audit_entries("CREATE").await;
    assert_eq!(entries.len(), 1);
    assert!(entries[0].geo_country.is_none());
}

#[tokio::test]
async fn test_query_filters_by_actor_and_action() {
    let env = setup_test_env().await;

    env.recorder
        .record(AuditEvent::new(AuditAction::Create, "item").with_context(&ctx_for("actor-1")))
        .await;
    env.recorder
        .record(AuditEvent::new(AuditAction::Update, "item").with_context(&ctx_for("actor-1")))
        .await;
    env.recorder
        .record(AuditEvent::new(AuditAction::Create, "item").with_context(&ctx_for("actor-2")))
        .await;
    env.recorder.drain().await;

    let filter = AuditQuery {
        actor_id: Some("actor-1".to_string()),
        ..Default::default()
    };
    let (entries, total) = env.audit_store.query(&filter, 0, 50).await.unwrap();
    assert_eq!(total, 2);
    assert_eq!(entries.len(), 2);

    let filter = AuditQuery {
        actor_id: Some("actor-1".to_string()),
        action: Some("CREATE".to_string()),
        ..Default::default()
    };
    let (_, total) = env.audit_store.query(&filter, 0, 50).await.unwrap();
    assert_eq!(total, 1);
}

#[tokio::test]
async fn test_query_paginates_newest_first() {
    let env = setup_test_env().await;
    let ctx = ctx_for("actor-1");

    for i in 0..5 {
        let mut event = AuditEvent::new(AuditAction::Update, "item")
            .with_context(&ctx)
            .with_resource_id(format!("item-{}", i));
        // Distinct timestamps so ordering is well-defined
        event.recorded_at = format!("2026-08-01T00:00:0{}Z", i);
        env.recorder.record(event).await;
    }
    env.recorder.drain().await;

    let (page0, total) = env
        .audit_store
        .query(&AuditQuery::default(), 0, 2)
        .await
        .unwrap();
    assert_eq!(total, 5);
    assert_eq!(page0.len(), 2);
    assert_eq!(page0[0].resource_id.as_deref(), Some("item-4"));
    assert_eq!(page0[1].resource_id.as_deref(), Some("item-3"));

    let (page2, _) = env
        .audit_store
        .query(&AuditQuery::default(), 2, 2)
        .await
        .unwrap();
    assert_eq!(page2.len(), 1);
    assert_eq!(page2[0].resource_id.as_deref(), Some("item-0"));
}

#[tokio::test]
async fn test_query_filters_by_time_range() {
    let env = setup_test_env().await;
    let ctx = ctx_for("actor-1");

    for (i, ts) in ["2026-08-01T00:00:00Z", "2026-08-02T00:00:00Z", "2026-08-03T00:00:00Z"]
        .iter()
        .enumerate()
    {
        let mut event = AuditEvent::new(AuditAction::Update, "item")
            .with_context(&ctx)
            .with_resource_id(format!("item-{}", i));
        event.recorded_at = ts.to_string();
        env.recorder.record(event).await;
    }
    env.recorder.drain().await;

    let filter = AuditQuery {
        from: Some("2026-08-01T12:00:00Z".to_string()),
        to: Some("2026-08-02T12:00:00Z".to_string()),
        ..Default::default()
    };
    let (entries, total) = env.audit_store.query(&filter, 0, 50).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(entries[0].resource_id.as_deref(), Some("item-1"));
}
