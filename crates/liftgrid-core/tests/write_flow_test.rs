use std::sync::Arc;

use chrono::{Duration, Utc};
use liftgrid_core::auth::{
    AccessToken, Credential, CredentialManager, CredentialStore, ManualSurface, OAuthClient,
    OAuthConfig, SqliteCredentialStore, loopback_redirect_uri,
};
use liftgrid_core::layout::{self, Vocabulary, Weekday};
use liftgrid_core::sheets::{CsvExportFetcher, GridFetcher, SheetsValuesWriter};
use liftgrid_core::write::{PlanContext, ProgressEntry, SetResult, WriteCoordinator, WriteResult};
use liftgrid_test_utils::{FakeGoogle, create_test_pool, fixtures};

async fn signed_in_coordinator(fake: &FakeGoogle) -> WriteCoordinator {
    let store = Arc::new(SqliteCredentialStore::new(create_test_pool().await));
    store
        .save(&Credential {
            access_token: AccessToken::new("cached-token"),
            refresh_token: Some("rt".into()),
            expiry: Utc::now() + Duration::hours(1),
        })
        .await
        .unwrap();

    let config = OAuthConfig {
        token_url: fake.token_url(),
        ..OAuthConfig::google("client-id", None)
    };
    let http = reqwest::Client::new();
    let manager = Arc::new(CredentialManager::new(
        config.clone(),
        Arc::new(OAuthClient::new(http.clone(), config)),
        store,
        Arc::new(ManualSurface::new(loopback_redirect_uri(8085))),
    ));
    WriteCoordinator::new(
        manager,
        Arc::new(SheetsValuesWriter::new(http).with_api_base(fake.base_url())),
    )
}

fn bench(sets: &[(u32, &str)]) -> ProgressEntry {
    ProgressEntry {
        exercise_name: "Bench".into(),
        day: Weekday::Wednesday,
        sets: sets
            .iter()
            .map(|(n, w)| SetResult {
                set_number: *n,
                weight: w.to_string(),
                reps: None,
                completed: true,
            })
            .collect(),
    }
}

#[tokio::test]
async fn fetch_infer_and_write_back() {
    let fake = FakeGoogle::start().await;
    fake.publish_csv("DOC", &fixtures::to_csv(&fixtures::three_column_grid()));

    let fetcher = CsvExportFetcher::new(reqwest::Client::new()).with_export_base(fake.base_url());
    let grid = fetcher.fetch_grid("DOC").await.unwrap();
    let layout = layout::infer(&grid, &Vocabulary::english()).unwrap();
    let context = PlanContext::new("DOC", &grid, Some(Arc::new(layout.positions)));

    let coordinator = signed_in_coordinator(&fake).await;
    // Bench spans columns 3..5, so a third set has nowhere to go.
    let result = coordinator
        .write_progress(&context, &bench(&[(1, "40"), (2, "45"), (3, "50")]))
        .await
        .unwrap();

    assert_eq!(
        result,
        WriteResult::Written {
            positions: vec!["D3".into(), "E3".into()]
        }
    );
    let mut ranges: Vec<(String, String)> = fake
        .writes()
        .into_iter()
        .map(|w| (w.range, w.value))
        .collect();
    ranges.sort();
    assert_eq!(
        ranges,
        vec![
            ("D3".to_string(), "40".to_string()),
            ("E3".to_string(), "45".to_string())
        ]
    );
    assert!(fake.writes().iter().all(|w| w.bearer.as_deref() == Some("cached-token")));
    assert_eq!(fake.refreshes(), 0);
}

#[tokio::test]
async fn partial_failure_keeps_successful_cells() {
    let fake = FakeGoogle::start().await;
    fake.fail_range("E3");
    let grid = liftgrid_core::grid::Grid::new(fixtures::three_column_grid());
    let layout = layout::infer(&grid, &Vocabulary::english()).unwrap();
    let context = PlanContext::new("DOC", &grid, Some(Arc::new(layout.positions)));

    let coordinator = signed_in_coordinator(&fake).await;
    let result = coordinator
        .write_progress(&context, &bench(&[(1, "40"), (2, "45")]))
        .await
        .unwrap();

    match result {
        WriteResult::PartiallyFailed {
            failed, attempted, ..
        } => {
            assert_eq!(failed, vec!["E3".to_string()]);
            assert_eq!(attempted, 2);
        }
        other => panic!("expected partial failure, got {other:?}"),
    }
    assert_eq!(fake.writes().len(), 1);
}
