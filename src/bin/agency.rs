// Agency bootstrap: load the configured companies, register them and run a short
// booking round against them.
//
// Usage: agency [config.json] [--verbose]

use std::sync::Arc;

use anyhow::{Context, Result};
use car_rental_agency::loader::load_registry;
use car_rental_agency::logging::init_logger;
use car_rental_agency::{AgencyConfig, SessionManager};
use chrono::{Duration, Utc};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    let config_path = args
        .iter()
        .find(|a| !a.starts_with('-'))
        .map(String::as_str)
        .unwrap_or("agency.json");

    let config = AgencyConfig::from_file(config_path)
        .with_context(|| format!("failed to read config {}", config_path))?;
    init_logger(config.log_format, verbose);

    let registry = Arc::new(load_registry(&config).context("failed to load company data")?);
    info!(companies = ?registry.company_names(), "Agency ready");

    let manager = SessionManager::new(Arc::clone(&registry), &config);
    let session = manager.create_reservation_session("alice");

    let start = Utc::now() + Duration::days(1);
    let end = start + Duration::days(3);
    let region = "Brussels";

    let car_type = session
        .cheapest_car_type(start, end, region)
        .await
        .context("no car available in the demo period")?;
    let quote = session.create_quote(start, end, &car_type, region).await?;
    info!(company = %quote.company, car_type = %quote.car_type, price = quote.price, "Got quote");

    let outcome = session.confirm_quotes().await?;
    for reservation in &outcome.confirmed {
        info!(
            company = %reservation.company,
            car_id = reservation.car_id,
            price = reservation.price,
            "Reservation confirmed"
        );
    }
    for failed in &outcome.failed {
        warn!(company = %failed.quote.company, error = %failed.error, "Quote not confirmed");
    }

    let reports = manager.create_manager_session("reports");
    for company in reports.registered_companies() {
        let popular = reports.most_popular_car_type(&company, start, end).await?;
        info!(%company, car_type = %popular.name, "Most popular car type");
    }

    manager.remove_session(session.id())?;
    manager.remove_session(reports.id())?;
    Ok(())
}
