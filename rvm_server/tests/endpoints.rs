use actix_web::{test, web, App};
use rvm_common::{Grams, Money, Secret};
use rvm_engine::{
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    ReconciliationApi,
    SettlementApi,
    SqliteDatabase,
};
use rvm_server::{config::ServerConfig, integrations::VendorSource, routes};
use rvm_vendor::VendorApi;
use serde_json::{json, Value};

async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

async fn seed_machine(db: &SqliteDatabase, device_no: &str, merchant_id: i64, rate_plastic: f64, bin_1_kg: f64) {
    sqlx::query("INSERT INTO machines (device_no, merchant_id, rate_plastic, bin_weight_1) VALUES (?, ?, ?, ?)")
        .bind(device_no)
        .bind(merchant_id)
        .bind(rate_plastic)
        .bind(Grams::from_kg(bin_1_kg))
        .execute(db.pool())
        .await
        .expect("Error seeding machine");
}

fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.cron_secret = Secret::new("sekrit".to_string());
    config
}

macro_rules! test_app {
    ($db:expr, $config:expr) => {{
        let vendor = VendorSource::new(VendorApi::new($config.vendor.clone()).unwrap());
        test::init_service(
            App::new()
                .app_data(web::Data::new($config.clone()))
                .app_data(web::Data::new(vendor))
                .app_data(web::Data::new(ReconciliationApi::new($db.clone())))
                .app_data(web::Data::new(SettlementApi::new($db.clone())))
                .service(routes::health)
                .service(routes::webhook)
                .service(
                    web::scope("/api")
                        .service(routes::cron_poll)
                        .service(routes::verify_review)
                        .service(routes::list_reviews),
                ),
        )
        .await
    }};
}

#[actix_web::test]
async fn health_check_responds() {
    let db = new_db().await;
    let app = test_app!(&db, test_config());
    let req = test::TestRequest::get().uri("/health").to_request();
    let res = test::call_service(&app, req).await;
    assert!(res.status().is_success());
}

#[actix_web::test]
async fn garbage_webhook_payloads_get_a_200_and_a_log_entry() {
    let db = new_db().await;
    let app = test_app!(&db, test_config());
    let req = test::TestRequest::post().uri("/webhook").set_payload("not json at all {{{").to_request();
    let res = test::call_service(&app, req).await;
    assert!(res.status().is_success(), "the vendor must never see a non-200 from the webhook");
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["error"], "Logged");

    let logged: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM machine_logs WHERE event_type = 'UNPARSED'")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(logged, 1);
}

#[actix_web::test]
async fn a_deposit_webhook_creates_a_settled_review() {
    let db = new_db().await;
    let app = test_app!(&db, test_config());
    let payload = json!({
        "type": 1,
        "userId": "900123",
        "deviceNo": "GCM-0042",
        "putId": "REC-WH-1",
        "totalWeight": 2.5,
        "integral": 0.75,
        "phone": "0123456789",
        "userRubbishPutDetailsVOList": [
            {"positionId": "1", "rubbishName": "Botol Plastik", "positionWeight": 2.5}
        ]
    });
    let req = test::TestRequest::post().uri("/webhook").set_json(&payload).to_request();
    let res = test::call_service(&app, req).await;
    assert!(res.status().is_success());
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["msg"], "Success");

    // Nonzero vendor points auto-verify and settle immediately.
    let (status, value): (String, Money) =
        sqlx::query_as("SELECT status, value FROM submission_reviews WHERE vendor_record_id = 'REC-WH-1'")
            .fetch_one(db.pool())
            .await
            .unwrap();
    assert_eq!(status, "VERIFIED");
    assert_eq!(value, Money::from_value(0.75));

    // Redelivery is still a 200 and does not double-credit.
    let req = test::TestRequest::post().uri("/webhook").set_json(&payload).to_request();
    let res = test::call_service(&app, req).await;
    assert!(res.status().is_success());
    let balance: Money = sqlx::query_scalar("SELECT balance FROM merchant_wallets")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(balance, Money::from_value(0.75));
}

#[actix_web::test]
async fn a_put_webhook_settles_the_deposit_and_detects_the_bin_emptying() {
    let db = new_db().await;
    let app = test_app!(&db, test_config());
    // Bin 1 last held 4.0kg. The deposit reports the bin at 0.3kg, so a cleaning happened in between.
    seed_machine(&db, "D1", 1, 0.30, 4.0).await;
    let payload = json!({
        "type": "PUT",
        "userId": "900777",
        "deviceNo": "D1",
        "putId": "REC-PUT-1",
        "totalWeight": 2.5,
        "integral": 0,
        "phone": "0123456788",
        "userRubbishPutDetailsVOList": [
            {"positionId": "1", "rubbishName": "Botol Plastik", "positionWeight": 0.3}
        ]
    });
    let req = test::TestRequest::post().uri("/webhook").set_json(&payload).to_request();
    let res = test::call_service(&app, req).await;
    assert!(res.status().is_success());
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["msg"], "Success");

    // 2.5kg of plastic at 0.30/kg auto-verifies for 0.75, snapshotting the item's bin level.
    let (status, value, snapshot): (String, Money, Grams) = sqlx::query_as(
        "SELECT status, value, bin_weight_snapshot FROM submission_reviews WHERE vendor_record_id = 'REC-PUT-1'",
    )
    .fetch_one(db.pool())
    .await
    .unwrap();
    assert_eq!(status, "VERIFIED");
    assert_eq!(value, Money::from_value(0.75));
    assert_eq!(snapshot, Grams::from_kg(0.3));

    // The drop from 4.0kg to 0.3kg is an emptying; the collected weight is the last known level.
    let collected: Vec<Grams> =
        sqlx::query_scalar("SELECT weight_collected FROM cleaning_records WHERE device_no = 'D1'")
            .fetch_all(db.pool())
            .await
            .unwrap();
    assert_eq!(collected, vec![Grams::from_kg(4.0)]);
    let bin_1: Grams = sqlx::query_scalar("SELECT bin_weight_1 FROM machines WHERE device_no = 'D1'")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(bin_1, Grams::from_kg(0.3));
}

#[actix_web::test]
async fn non_deposit_webhook_events_are_logged_and_ignored() {
    let db = new_db().await;
    let app = test_app!(&db, test_config());
    let payload = json!({"type": 3, "deviceNo": "GCM-0042"});
    let req = test::TestRequest::post().uri("/webhook").set_json(&payload).to_request();
    let res = test::call_service(&app, req).await;
    assert!(res.status().is_success());

    let reviews: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM submission_reviews").fetch_one(db.pool()).await.unwrap();
    assert_eq!(reviews, 0);
    let logged: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM machine_logs WHERE event_type = '3'")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(logged, 1);
}

#[actix_web::test]
async fn cron_poll_requires_the_shared_secret() {
    let db = new_db().await;
    let app = test_app!(&db, test_config());
    let req = test::TestRequest::get().uri("/api/cron/poll?key=wrong").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status().as_u16(), 401);

    // With the right key and no active machines, the sweep is an empty success. No vendor calls are made.
    let req = test::TestRequest::get().uri("/api/cron/poll?key=sekrit").to_request();
    let res = test::call_service(&app, req).await;
    assert!(res.status().is_success());
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["machines_checked"], 0);
    assert_eq!(body["cleaning_events"], 0);
}

#[actix_web::test]
async fn an_unset_cron_secret_disables_the_endpoint() {
    let db = new_db().await;
    let app = test_app!(&db, ServerConfig::default());
    let req = test::TestRequest::get().uri("/api/cron/poll?key=").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status().as_u16(), 401);
}

#[actix_web::test]
async fn verifying_an_unknown_review_is_a_404() {
    let db = new_db().await;
    let app = test_app!(&db, test_config());
    let req = test::TestRequest::post()
        .uri("/api/reviews/9999/verify")
        .set_json(json!({"note": "nothing here"}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status().as_u16(), 404);
    let body: Value = test::read_body_json(res).await;
    assert!(body["error"].as_str().unwrap().contains("9999"));
}

#[actix_web::test]
async fn review_listings_are_scoped_by_the_merchant_header() {
    let db = new_db().await;
    let app = test_app!(&db, test_config());
    sqlx::query("INSERT INTO merchants (id, name) VALUES (2, 'Tenant')").execute(db.pool()).await.unwrap();
    seed_machine(&db, "GCM-0099", 2, 0.30, 0.0).await;

    // One deposit lands on the platform (unknown device), one on the tenant's machine.
    for (device, put_id, phone) in [("GCM-0042", "REC-SCOPE-1", "0123456780"), ("GCM-0099", "REC-SCOPE-2", "0123456781")] {
        let payload = json!({
            "type": "PUT",
            "deviceNo": device,
            "putId": put_id,
            "totalWeight": 1.0,
            "integral": 0.30,
            "phone": phone,
            "userRubbishPutDetailsVOList": [{"rubbishName": "Botol Plastik", "positionWeight": 1.0}]
        });
        let req = test::TestRequest::post().uri("/webhook").set_json(&payload).to_request();
        test::call_service(&app, req).await;
    }

    // The platform owner sends no header and sees everything.
    let req = test::TestRequest::get().uri("/api/reviews").to_request();
    let reviews: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(reviews.len(), 2);

    // A merchant header narrows the listing to that merchant's reviews.
    let req = test::TestRequest::get().uri("/api/reviews").insert_header(("x-merchant-id", "2")).to_request();
    let reviews: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0]["vendor_record_id"], "REC-SCOPE-2");

    let req = test::TestRequest::get()
        .uri("/api/reviews")
        .insert_header(("x-merchant-id", "42"))
        .to_request();
    let reviews: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert!(reviews.is_empty());
}
