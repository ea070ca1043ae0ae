use chrono::Utc;
use rvm_common::{Grams, Money};
use rvm_engine::{
    db_types::{DisposalEvent, EventSource},
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::{DisposalSource, ProfileSource, SourceError, VendorProfile},
    Harvester,
    MigrationApi,
    ReconciliationApi,
    SettlementManagement,
    SqliteDatabase,
};
use tokio::runtime::Runtime;

async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

#[derive(Clone)]
struct StubVendor {
    events: Vec<DisposalEvent>,
    profile: VendorProfile,
}

impl DisposalSource for StubVendor {
    async fn disposal_history(&self, _phone: &str, limit: usize) -> Result<Vec<DisposalEvent>, SourceError> {
        Ok(self.events.iter().take(limit).cloned().collect())
    }
}

impl ProfileSource for StubVendor {
    async fn account_profile(&self, _phone: &str, _nickname: &str) -> Result<VendorProfile, SourceError> {
        Ok(self.profile.clone())
    }
}

fn history_event(record_id: &str, phone: &str, kg: f64, points: f64) -> DisposalEvent {
    let mut event = DisposalEvent::new(Grams::from_kg(kg), Money::from_value(points), Utc::now());
    event.record_id = Some(record_id.to_string());
    event.phone = Some(phone.to_string());
    event.raw_label = Some("Botol Plastik".to_string());
    event
}

#[test]
fn harvest_imports_new_records_and_skips_known_ones() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async move {
        let db = new_db().await;
        let phone = "0123400001";
        let api = ReconciliationApi::new(db.clone());
        // The user exists and one of their records is already known from a webhook.
        api.fetch_or_create_user(None, Some(phone)).await.expect("Error creating user");
        api.process_event(history_event("REC-H1", phone, 1.0, 0.30), EventSource::Webhook).await.unwrap();

        let vendor = StubVendor {
            events: vec![
                history_event("REC-H1", phone, 1.0, 0.30),
                history_event("REC-H2", phone, 2.0, 0.60),
                history_event("REC-H3", phone, 0.5, 0.15),
            ],
            profile: VendorProfile::default(),
        };
        let harvester = Harvester::new(db.clone(), vendor);

        let report = harvester.run(false).await.expect("Error running harvester");
        assert_eq!(report.imported, 2);
        assert_eq!(report.skipped, 1);
        assert!(report.errors.is_empty());
    });
}

#[test]
fn cooldown_skips_recently_synced_users() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async move {
        let db = new_db().await;
        let phone = "0123400002";
        let api = ReconciliationApi::new(db.clone());
        api.fetch_or_create_user(None, Some(phone)).await.expect("Error creating user");

        let vendor = StubVendor {
            events: vec![history_event("REC-C1", phone, 1.0, 0.30)],
            profile: VendorProfile::default(),
        };
        let harvester = Harvester::new(db.clone(), vendor);

        let first = harvester.run(false).await.unwrap();
        assert_eq!(first.imported, 1);

        // Within the cooldown the user is not a candidate at all.
        let second = harvester.run(false).await.unwrap();
        assert_eq!(second.imported, 0);
        assert_eq!(second.skipped, 0);

        // Forcing bypasses the cooldown; the record itself still dedups.
        let forced = harvester.run(true).await.unwrap();
        assert_eq!(forced.imported, 0);
        assert_eq!(forced.skipped, 1);
    });
}

#[test]
fn vendor_failures_are_reported_not_fatal() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async move {
        let db = new_db().await;
        let api = ReconciliationApi::new(db.clone());
        api.fetch_or_create_user(None, Some("0123400003")).await.expect("Error creating user");

        #[derive(Clone)]
        struct FailingVendor;
        impl DisposalSource for FailingVendor {
            async fn disposal_history(&self, _phone: &str, _limit: usize) -> Result<Vec<DisposalEvent>, SourceError> {
                Err(SourceError::Vendor("503 from upstream".to_string()))
            }
        }

        let harvester = Harvester::new(db.clone(), FailingVendor);
        let report = harvester.run(false).await.expect("The run itself must not fail");
        assert_eq!(report.imported, 0);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("503"));
    });
}

#[test]
fn onboarding_imports_history_and_lands_on_the_vendor_balance() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async move {
        let db = new_db().await;
        let phone = "0123400004";
        let vendor = StubVendor {
            events: vec![
                history_event("REC-M1", phone, 2.0, 0.60),
                history_event("REC-M2", phone, 3.0, 0.90),
            ],
            profile: VendorProfile {
                vendor_user_no: Some("900777".to_string()),
                nickname: Some("Aisyah".to_string()),
                // Less than the 1.50 earned: the user cashed some out on the vendor side.
                balance: Money::from_value(1.00),
            },
        };
        let migration = MigrationApi::new(db.clone(), vendor.clone());

        let report = migration.onboard(phone, None).await.expect("Error onboarding");
        assert_eq!(report.imported, 2);
        assert_eq!(report.adjustment, Money::from_value(-0.50));
        assert_eq!(report.final_balance, Money::from_value(1.00));

        let wallet = db.fetch_wallet(report.user_id, 1).await.unwrap().expect("No wallet");
        assert_eq!(wallet.balance, Money::from_value(1.00));
        // The negative adjustment is mirrored as an external withdrawal, keeping the books conserved.
        let audit = db.wallet_audit(report.user_id, 1).await.unwrap();
        assert!(audit.consistent, "stored {} expected {}", audit.wallet.balance, audit.expected_balance);

        // Onboarding twice is a no-op.
        let repeat = migration.onboard(phone, None).await.expect("Error onboarding again");
        assert_eq!(repeat.imported, 0);
        assert_eq!(repeat.final_balance, Money::from_value(1.00));
    });
}
