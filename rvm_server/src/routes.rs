//! Request handler definitions.
//!
//! Handlers stay thin: they translate HTTP shapes into engine calls and engine results back into JSON. Anything that
//! smells like business logic belongs in `rvm_engine`, not here.
//!
//! The webhook is the one deliberate exception to normal error handling. The vendor cloud treats any non-200 response
//! as a delivery failure and retries aggressively, so the webhook always answers 200 and the raw payload is captured
//! in `machine_logs` before any processing happens. A bad payload is a log entry, never an error response.

use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use log::*;
use rvm_common::{Grams, Money};
use rvm_engine::{
    db_types::{EventSource, WasteType, DEFAULT_MERCHANT_ID},
    helpers::cleaning::{MIN_SNAPSHOT_DELTA_KG, POLL_DROP_THRESHOLD_KG},
    traits::ReviewFilter,
    Harvester,
    MigrationApi,
    ReconciliationApi,
    SettlementApi,
    SqliteDatabase,
};
use rvm_vendor::{Method, WebhookEvent};
use serde_json::json;

use crate::{
    config::ServerConfig,
    data_objects::{
        AdjustRequest,
        CleaningReviewRequest,
        CronParams,
        HarvestParams,
        OnboardRequest,
        PollReport,
        ProxyRequest,
        RejectRequest,
        ReviewListParams,
        VerifyRequest,
        WithdrawalStatusRequest,
    },
    errors::ServerError,
    integrations::{disposal_event_from_webhook, proxy_allowed, VendorSource},
};

/// Deposit push events carry the type tag `PUT`; older firmware sends the numeric code 1 instead. Everything else
/// (heartbeats, door events) is logged and ignored.
fn is_deposit_event(event: &WebhookEvent) -> bool {
    matches!(event.event_type.as_deref(), Some("PUT") | Some("1"))
}

/// The merchant scope for admin calls. Authentication happens upstream; by the time a request reaches a handler the
/// resolved merchant id is in the `x-merchant-id` header. The platform owner sends no header and sees everything.
fn merchant_scope(req: &HttpRequest) -> Option<i64> {
    req.headers().get("x-merchant-id").and_then(|v| v.to_str().ok()).and_then(|v| v.parse::<i64>().ok())
}

#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

#[post("/webhook")]
pub async fn webhook(
    body: web::Bytes,
    api: web::Data<ReconciliationApi<SqliteDatabase>>,
    config: web::Data<ServerConfig>,
) -> HttpResponse {
    let payload = String::from_utf8_lossy(&body).into_owned();
    let event = match serde_json::from_str::<WebhookEvent>(&payload) {
        Ok(event) => event,
        Err(e) => {
            warn!("📤️ Discarding unparseable webhook payload: {e}");
            api.raw_log(None, "UNPARSED", None, &payload).await;
            return HttpResponse::Ok().json(json!({"error": "Logged"}));
        },
    };
    let event_tag = event.event_type.as_deref().unwrap_or("UNKNOWN");
    api.raw_log(event.device_no.as_deref(), event_tag, event.user_id.as_deref(), &payload).await;
    if !is_deposit_event(&event) {
        debug!("📤️ Ignoring webhook event of type {event_tag} from {:?}", event.device_no);
        return HttpResponse::Ok().json(json!({"msg": "Success"}));
    }
    let disposal = disposal_event_from_webhook(&event);

    // Each line item reports its compartment's fill level, and each drives cleaning detection and a snapshot
    // update. Oil machines send no item list, only a top-level fill weight. A failure here never blocks crediting
    // the deposit.
    if let Some(device_no) = disposal.device_no.as_deref() {
        let threshold = Grams::from_kg(config.cleaning_threshold_kg);
        let min_delta = Grams::from_kg(MIN_SNAPSHOT_DELTA_KG);
        let mut observations = event
            .items
            .iter()
            .map(|item| {
                let position = item.position_id.as_deref().and_then(|p| p.parse::<i64>().ok()).unwrap_or(1);
                (position, WasteType::detect(item.rubbish_name.as_deref()), Grams::from_kg(item.position_weight))
            })
            .collect::<Vec<_>>();
        if observations.is_empty() {
            if let Some(level) = event.position_weight {
                observations.push((1, WasteType::Uco, Grams::from_kg(level)));
            }
        }
        for (position, waste_type, observed) in observations {
            match api.observe_bin_weight(device_no, position, waste_type, observed, threshold, min_delta).await {
                Ok(Some(record)) => info!(
                    "🧹️ Bin emptying detected on {device_no} position {position}: {} collected",
                    record.weight_collected
                ),
                Ok(None) => {},
                Err(e) => warn!("🧹️ Could not run cleaning detection for {device_no} position {position}: {e}"),
            }
        }
    }

    match api.process_event(disposal, EventSource::Webhook).await {
        Ok(outcome) => {
            let review = outcome.review();
            info!(
                "📤️ Webhook deposit {} settled as {} ({})",
                review.vendor_record_id, review.value, review.status
            );
            HttpResponse::Ok().json(json!({"msg": "Success"}))
        },
        Err(e) => {
            warn!("📤️ Webhook deposit failed reconciliation and was only logged: {e}");
            HttpResponse::Ok().json(json!({"error": "Logged"}))
        },
    }
}

#[post("/harvest")]
pub async fn harvest(
    params: web::Query<HarvestParams>,
    harvester: web::Data<Harvester<SqliteDatabase, VendorSource>>,
) -> Result<HttpResponse, ServerError> {
    let report = harvester.run(params.force).await?;
    Ok(HttpResponse::Ok().json(report))
}

#[get("/cron/poll")]
pub async fn cron_poll(
    params: web::Query<CronParams>,
    config: web::Data<ServerConfig>,
    api: web::Data<ReconciliationApi<SqliteDatabase>>,
    vendor: web::Data<VendorSource>,
) -> Result<HttpResponse, ServerError> {
    let secret = config.cron_secret.reveal();
    if secret.is_empty() || params.key != *secret {
        return Err(ServerError::Unauthorized("Invalid cron key".to_string()));
    }
    let threshold = Grams::from_kg(POLL_DROP_THRESHOLD_KG);
    let min_delta = Grams::from_kg(MIN_SNAPSHOT_DELTA_KG);
    let mut report = PollReport::default();
    for machine in api.active_machines().await? {
        report.machines_checked += 1;
        let bins = match vendor.api().device_positions(&machine.device_no).await {
            Ok(bins) => bins,
            Err(e) => {
                warn!("🧹️ Could not poll bins for {}: {e}", machine.device_no);
                report.errors.push(format!("{}: {e}", machine.device_no));
                continue;
            },
        };
        for bin in bins {
            let position = bin.position_id.as_deref().and_then(|p| p.parse::<i64>().ok()).unwrap_or(1);
            let waste_type = WasteType::detect(bin.rubbish_name.as_deref());
            let observed = Grams::from_kg(bin.weight);
            match api.observe_bin_weight(&machine.device_no, position, waste_type, observed, threshold, min_delta).await
            {
                Ok(Some(record)) => {
                    info!(
                        "🧹️ Poll detected a bin emptying on {} position {position}: {} collected",
                        machine.device_no, record.weight_collected
                    );
                    report.cleaning_events += 1;
                },
                Ok(None) => {},
                Err(e) => report.errors.push(format!("{} position {position}: {e}", machine.device_no)),
            }
        }
    }
    Ok(HttpResponse::Ok().json(report))
}

#[post("/onboard")]
pub async fn onboard(
    body: web::Json<OnboardRequest>,
    migration: web::Data<MigrationApi<SqliteDatabase, VendorSource>>,
) -> Result<HttpResponse, ServerError> {
    let report = migration.onboard(&body.phone, body.nickname.as_deref()).await?;
    Ok(HttpResponse::Ok().json(report))
}

#[post("/proxy")]
pub async fn proxy(body: web::Json<ProxyRequest>, vendor: web::Data<VendorSource>) -> Result<HttpResponse, ServerError> {
    if !proxy_allowed(&body.endpoint) {
        return Err(ServerError::InvalidRequest(format!("{} is not a proxyable vendor endpoint", body.endpoint)));
    }
    let method = body.method.as_deref().unwrap_or("GET").to_uppercase();
    let method = Method::from_bytes(method.as_bytes())
        .map_err(|_| ServerError::InvalidRequest(format!("{method} is not a valid HTTP method")))?;
    let params = body.params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect::<Vec<_>>();
    let result = vendor.api().raw_call(method, &body.endpoint, &params, body.body.clone()).await?;
    Ok(HttpResponse::Ok().json(result))
}

#[post("/reviews/{id}/verify")]
pub async fn verify_review(
    path: web::Path<i64>,
    body: web::Json<VerifyRequest>,
    api: web::Data<SettlementApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let review =
        api.verify(*path, body.final_weight_kg.map(Grams::from_kg), body.rate, body.note.as_deref()).await?;
    info!("💰️ Review #{} verified for {}", review.id, review.value);
    Ok(HttpResponse::Ok().json(review))
}

#[post("/reviews/{id}/reject")]
pub async fn reject_review(
    path: web::Path<i64>,
    body: web::Json<RejectRequest>,
    api: web::Data<SettlementApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let review = api.reject(*path, &body.reason).await?;
    info!("🚫️ Review #{} rejected", review.id);
    Ok(HttpResponse::Ok().json(review))
}

#[get("/reviews")]
pub async fn list_reviews(
    req: HttpRequest,
    params: web::Query<ReviewListParams>,
    api: web::Data<SettlementApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let mut filter = ReviewFilter::default();
    if let Some(merchant_id) = merchant_scope(&req) {
        filter = filter.with_merchant_id(merchant_id);
    }
    if let Some(user_id) = params.user_id {
        filter = filter.with_user_id(user_id);
    }
    if let Some(status) = params.status {
        filter = filter.with_status(status);
    }
    if let Some(limit) = params.limit {
        filter = filter.with_limit(limit);
    }
    filter.device_no = params.device_no.clone();
    let reviews = api.fetch_reviews(filter).await?;
    Ok(HttpResponse::Ok().json(reviews))
}

#[post("/wallets/adjust")]
pub async fn adjust_wallet(
    req: HttpRequest,
    body: web::Json<AdjustRequest>,
    api: web::Data<SettlementApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let merchant_id = body.merchant_id.or_else(|| merchant_scope(&req)).unwrap_or(DEFAULT_MERCHANT_ID);
    let amount = Money::from_value(body.amount);
    let balance = api.adjust_balance(body.user_id, merchant_id, amount, body.kind, &body.description).await?;
    info!("💰️ Adjusted wallet ({}, {merchant_id}) by {amount}. New balance: {balance}", body.user_id);
    Ok(HttpResponse::Ok().json(json!({"balance": balance})))
}

#[get("/wallets/{user_id}/{merchant_id}/audit")]
pub async fn wallet_audit(
    path: web::Path<(i64, i64)>,
    api: web::Data<SettlementApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let (user_id, merchant_id) = path.into_inner();
    let audit = api.wallet_audit(user_id, merchant_id).await?;
    Ok(HttpResponse::Ok().json(audit))
}

#[post("/withdrawals/{id}/status")]
pub async fn withdrawal_status(
    path: web::Path<i64>,
    body: web::Json<WithdrawalStatusRequest>,
    api: web::Data<SettlementApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let withdrawal = api.update_withdrawal_status(*path, body.status, body.note.as_deref()).await?;
    info!("💰️ Withdrawal #{} is now {}", withdrawal.id, withdrawal.status);
    Ok(HttpResponse::Ok().json(withdrawal))
}

#[post("/cleanings/{id}/review")]
pub async fn review_cleaning(
    path: web::Path<i64>,
    body: web::Json<CleaningReviewRequest>,
    api: web::Data<SettlementApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let record = api.review_cleaning(*path, body.status, body.note.as_deref()).await?;
    info!("🧹️ Cleaning record #{} reviewed as {}", record.id, record.status);
    Ok(HttpResponse::Ok().json(record))
}
