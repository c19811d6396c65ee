//! Harness integration tests
//!
//! # Test Coverage
//!
//! - Builders and fixtures composing into working service doubles
//! - Compliance engine recounts over builder-seeded ledgers
//! - PostgreSQL container lifecycle (ignored without Docker)

use std::sync::Arc;

use proptest::prelude::*;
use rust_decimal_macros::dec;

use core_kernel::{DoctorId, UserId};
use domain_coverage::{ComplianceEngine, ComplianceStatus, CoverageStats};
use domain_directory::{DirectoryPort, UserQuery};
use domain_visit::{MockVisitLedger, VisitLedgerPort};
use infra_db::PostgresDirectoryAdapter;
use test_utils::{
    assert_compliance, boundary_pair_strategy, db_test, DatabaseTestAssertions, TeamFixture,
    TemporalFixtures, TestUserBuilder, TestVisitBuilder,
};

// ====== BUILDER-BACKED SERVICE DOUBLES ======

#[tokio::test]
async fn test_team_fixture_backs_scoped_queries() {
    let team = TeamFixture::standard();
    let directory = team.seed_directory().await;

    let mrs = directory
        .find_users(UserQuery::mrs_of(team.manager.id))
        .await
        .unwrap();
    assert_eq!(mrs.len(), 2);
    assert!(mrs.iter().all(|mr| mr.reports_to(team.manager.id)));
}

#[tokio::test]
async fn test_seeded_visits_drive_the_engine_recount() {
    let team = TeamFixture::standard();
    let mr = &team.mrs[0];
    let doctor = &team.doctors[0];

    let visits: Vec<_> = (1..=9)
        .map(|day| {
            TestVisitBuilder::new()
                .for_mr(mr.id)
                .to_doctor(doctor.id)
                .on_june_day(day)
                .build()
        })
        .collect();
    let ledger: Arc<dyn VisitLedgerPort> =
        Arc::new(MockVisitLedger::new().with_visits(visits).await);

    let engine = ComplianceEngine::new(ledger, TemporalFixtures::reporting_timezone());
    let stats = engine
        .compute(doctor.id, mr.id, TemporalFixtures::june_2024(), 10)
        .await
        .unwrap();

    assert_compliance(&stats, 9, dec!(90.00), ComplianceStatus::OnTrack);
}

// ====== LEDGER RECOUNT PROPERTIES ======

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn engine_recount_matches_the_seeded_day_count(
        days in proptest::collection::btree_set(1u32..=30u32, 0..=15usize),
        planned in 1u32..=20u32,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let mr = UserId::new_v7();
            let doctor = DoctorId::new_v7();
            let expected = days.len() as u32;

            let visits: Vec<_> = days
                .iter()
                .map(|&day| {
                    TestVisitBuilder::new()
                        .for_mr(mr)
                        .to_doctor(doctor)
                        .on_june_day(day)
                        .build()
                })
                .collect();
            let ledger: Arc<dyn VisitLedgerPort> =
                Arc::new(MockVisitLedger::new().with_visits(visits).await);

            let engine = ComplianceEngine::new(ledger, TemporalFixtures::reporting_timezone());
            let stats = engine
                .compute(doctor, mr, TemporalFixtures::june_2024(), planned)
                .await
                .unwrap();

            assert_eq!(stats, CoverageStats::derive(planned, expected));
        });
    }

    #[test]
    fn boundary_pairs_never_disagree_with_classify(
        (planned, actual) in boundary_pair_strategy()
    ) {
        let stats = CoverageStats::derive(planned, actual);
        prop_assert_eq!(
            stats.status,
            ComplianceStatus::classify(stats.compliance_percentage)
        );
    }
}

// ====== POSTGRES CONTAINER HARNESS ======

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_container_database_migrates_and_clears() {
    let db = test_utils::create_isolated_test_database()
        .await
        .expect("Failed to create test database");
    let directory = PostgresDirectoryAdapter::new(db.pool().clone());

    let owner = TestUserBuilder::owner().build();
    directory.insert_user(&owner).await.unwrap();

    let touched = sqlx::query("UPDATE users SET is_active = FALSE")
        .execute(db.pool())
        .await
        .unwrap();
    touched.assert_rows_affected(1);

    db.clear_data().await.expect("Failed to clear data");
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_shared_database_is_reused() {
    let first = test_utils::get_shared_test_database().await;
    let second = test_utils::get_shared_test_database().await;
    assert!(Arc::ptr_eq(&first, &second));
}

db_test!(fresh_container_starts_empty, |pool| {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM visits")
        .fetch_one(pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
});
