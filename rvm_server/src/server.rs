use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use rvm_engine::{Harvester, MigrationApi, ReconciliationApi, SettlementApi, SqliteDatabase};
use rvm_vendor::VendorApi;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    integrations::VendorSource,
    routes::{
        adjust_wallet,
        cron_poll,
        harvest,
        health,
        list_reviews,
        onboard,
        proxy,
        reject_review,
        review_cleaning,
        verify_review,
        wallet_audit,
        webhook,
        withdrawal_status,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let srv = create_server_instance(config, db)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(config: ServerConfig, db: SqliteDatabase) -> Result<Server, ServerError> {
    let vendor_api =
        VendorApi::new(config.vendor.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let vendor = VendorSource::new(vendor_api.clone());
        let reconciliation_api = ReconciliationApi::new(db.clone());
        let settlement_api = SettlementApi::new(db.clone());
        let harvester = Harvester::new(db.clone(), vendor.clone());
        let migration_api = MigrationApi::new(db.clone(), vendor.clone());
        let api_scope = web::scope("/api")
            .service(harvest)
            .service(cron_poll)
            .service(onboard)
            .service(proxy)
            .service(list_reviews)
            .service(verify_review)
            .service(reject_review)
            .service(adjust_wallet)
            .service(wallet_audit)
            .service(withdrawal_status)
            .service(review_cleaning);
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("rvm::access_log"))
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(vendor))
            .app_data(web::Data::new(reconciliation_api))
            .app_data(web::Data::new(settlement_api))
            .app_data(web::Data::new(harvester))
            .app_data(web::Data::new(migration_api))
            .service(health)
            .service(webhook)
            .service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
