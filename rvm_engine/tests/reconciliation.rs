use chrono::Utc;
use log::*;
use rvm_common::{Grams, Money};
use rvm_engine::{
    db_types::{DisposalEvent, EventSource, ReviewStatus},
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::SubmissionOutcome,
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

async fn seed_machine(db: &SqliteDatabase, device_no: &str, rate_plastic: f64) {
    sqlx::query("INSERT INTO machines (device_no, merchant_id, rate_plastic) VALUES (?, 1, ?)")
        .bind(device_no)
        .bind(rate_plastic)
        .execute(db.pool())
        .await
        .expect("Error seeding machine");
}

fn plastic_deposit(record_id: &str, phone: &str, kg: f64) -> DisposalEvent {
    let mut event = DisposalEvent::new(Grams::from_kg(kg), Money::default(), Utc::now());
    event.record_id = Some(record_id.to_string());
    event.phone = Some(phone.to_string());
    event.device_no = Some("GCM-0042".to_string());
    event.raw_label = Some("Botol Plastik".to_string());
    event
}

#[test]
fn webhook_deposit_is_valued_and_settled() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async move {
        let db = new_db().await;
        seed_machine(&db, "GCM-0042", 0.30).await;
        let api = ReconciliationApi::new(db.clone());

        let event = plastic_deposit("REC-1001", "0123456789", 2.5);
        let outcome = api.process_event(event, EventSource::Webhook).await.expect("Error processing event");
        let review = outcome.review();
        assert!(matches!(outcome, SubmissionOutcome::Inserted(_)));
        assert_eq!(review.value, Money::from_value(0.75));
        assert_eq!(review.rate_per_kg, 0.30);
        assert_eq!(review.status, ReviewStatus::Verified);

        let wallet = db.fetch_wallet(review.user_id, review.merchant_id).await.unwrap().expect("No wallet");
        assert_eq!(wallet.balance, Money::from_value(0.75));
        assert_eq!(wallet.total_weight, Grams::from_kg(2.5));

        let audit = db.wallet_audit(review.user_id, review.merchant_id).await.unwrap();
        assert!(audit.consistent, "stored {} expected {}", audit.wallet.balance, audit.expected_balance);
    });
    info!("🚀️ test complete");
}

#[test]
fn redelivery_is_a_no_op() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async move {
        let db = new_db().await;
        seed_machine(&db, "GCM-0042", 0.30).await;
        let api = ReconciliationApi::new(db.clone());

        let first = api.process_event(plastic_deposit("REC-2001", "0111111111", 2.5), EventSource::Webhook).await.unwrap();
        let user_id = first.review().user_id;
        let merchant_id = first.review().merchant_id;

        // Same record id, delivered again (webhook retry, then a history fetch).
        for source in [EventSource::Webhook, EventSource::Fetch] {
            let again = api.process_event(plastic_deposit("REC-2001", "0111111111", 2.5), source).await.unwrap();
            assert!(matches!(again, SubmissionOutcome::AlreadyProcessed(_)));
            assert_eq!(again.review().value, Money::from_value(0.75));
        }

        let wallet = db.fetch_wallet(user_id, merchant_id).await.unwrap().expect("No wallet");
        assert_eq!(wallet.balance, Money::from_value(0.75), "duplicate deliveries must not double-credit");
    });
}

#[test]
fn zero_value_events_wait_for_review_and_promote_later() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async move {
        let db = new_db().await;
        let api = ReconciliationApi::new(db.clone());

        // Unknown device, no points: implied rate is zero, so the row waits for review.
        let mut event = DisposalEvent::new(Grams::from_kg(1.2), Money::default(), Utc::now());
        event.record_id = Some("REC-3001".to_string());
        event.phone = Some("0122222222".to_string());
        event.raw_label = Some("Botol Plastik".to_string());
        let outcome = api.process_event(event, EventSource::Webhook).await.unwrap();
        assert_eq!(outcome.review().status, ReviewStatus::Pending);
        assert!(db.fetch_wallet(outcome.review().user_id, outcome.review().merchant_id).await.unwrap().is_none());

        // The history fetch later carries the points the webhook was missing.
        let mut richer = DisposalEvent::new(Grams::from_kg(1.2), Money::from_value(0.36), Utc::now());
        richer.record_id = Some("REC-3001".to_string());
        richer.phone = Some("0122222222".to_string());
        richer.raw_label = Some("Botol Plastik".to_string());
        let promoted = api.process_event(richer, EventSource::Fetch).await.unwrap();
        assert!(matches!(promoted, SubmissionOutcome::Promoted(_)));
        let review = promoted.review();
        assert_eq!(review.status, ReviewStatus::Verified);
        assert_eq!(review.value, Money::from_value(0.36));

        let wallet = db.fetch_wallet(review.user_id, review.merchant_id).await.unwrap().expect("No wallet");
        assert_eq!(wallet.balance, Money::from_value(0.36));
        let audit = db.wallet_audit(review.user_id, review.merchant_id).await.unwrap();
        assert!(audit.consistent);
    });
}

#[test]
fn lifetime_points_track_the_machines_own_points() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async move {
        let db = new_db().await;
        seed_machine(&db, "GCM-0042", 0.30).await;
        let api = ReconciliationApi::new(db.clone());

        // The machine awarded 0.50 of its own points; the merchant rate values the deposit at 0.75.
        let mut event = plastic_deposit("REC-4001", "0155555555", 2.5);
        event.points = Money::from_value(0.50);
        let outcome = api.process_event(event, EventSource::Webhook).await.unwrap();
        let review = outcome.review();
        assert_eq!(review.status, ReviewStatus::Verified);
        assert_eq!(review.value, Money::from_value(0.75));

        // The wallet holds the money; the user's lifetime tally holds the machine points.
        let wallet = db.fetch_wallet(review.user_id, review.merchant_id).await.unwrap().expect("No wallet");
        assert_eq!(wallet.balance, Money::from_value(0.75));
        let user = api.fetch_or_create_user(None, Some("0155555555")).await.unwrap();
        assert_eq!(user.lifetime_points, Money::from_value(0.50));
        assert_eq!(user.total_weight, Grams::from_kg(2.5));
    });
}

#[test]
fn junk_record_ids_get_synthesized_replacements() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async move {
        let db = new_db().await;
        let api = ReconciliationApi::new(db.clone());

        let mut event = plastic_deposit("undefined", "0133333333", 0.8);
        event.device_no = None;
        let first = api.process_event(event, EventSource::Webhook).await.unwrap();
        assert!(first.review().vendor_record_id.0.starts_with("SYN-"));

        // A second junk-id event is a distinct deposit and must not collide.
        let mut event = plastic_deposit("null", "0133333333", 0.8);
        event.device_no = None;
        let second = api.process_event(event, EventSource::Webhook).await.unwrap();
        assert!(matches!(second, SubmissionOutcome::Inserted(_)));
        assert_ne!(first.review().vendor_record_id, second.review().vendor_record_id);
    });
}

#[test]
fn identity_resolution_reuses_and_backfills_users() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async move {
        let db = new_db().await;
        let api = ReconciliationApi::new(db.clone());

        // First event knows only the phone.
        let first = api.process_event(plastic_deposit("REC-5001", "0144444444", 1.0), EventSource::Webhook).await.unwrap();

        // Second event carries the vendor user number as well; it must land on the same user, backfilled.
        let mut event = plastic_deposit("REC-5002", "0144444444", 1.0);
        event.vendor_user_no = Some("900555".to_string());
        let second = api.process_event(event, EventSource::Webhook).await.unwrap();
        assert_eq!(first.review().user_id, second.review().user_id);

        // Third event knows only the vendor number and still resolves to the same user.
        let mut event = plastic_deposit("REC-5003", "", 1.0);
        event.phone = None;
        event.vendor_user_no = Some("900555".to_string());
        let third = api.process_event(event, EventSource::Webhook).await.unwrap();
        assert_eq!(first.review().user_id, third.review().user_id);

        let user = api.fetch_or_create_user(None, Some("0144444444")).await.unwrap();
        assert_eq!(user.vendor_user_no.as_deref(), Some("900555"));
    });
}
