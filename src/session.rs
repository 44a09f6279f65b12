// Client sessions. A reservation session collects quotes from any registered company
// and later confirms them; a manager session answers reporting queries.
// A session serves one client: concurrent calls on the same session are not coordinated
// beyond keeping its own state consistent.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::company::CarRentalCompany;
use crate::config::ConfirmPolicy;
use crate::error::{ReservationError, Result};
use crate::model::{validate_period, CarType, Quote, Reservation, ReservationConstraints};
use crate::registry::CompanyRegistry;

pub type SessionId = u64;

// Identity and activity bookkeeping shared by both session variants
#[derive(Debug)]
pub struct SessionInfo {
    id: SessionId,
    name: String,
    created_at: DateTime<Utc>,
    last_active: Mutex<Instant>,
}

impl SessionInfo {
    pub fn new(id: SessionId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            created_at: Utc::now(),
            last_active: Mutex::new(Instant::now()),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn touch(&self) {
        *self.last_active.lock() = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_active.lock().elapsed()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Confirmed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailedQuote {
    pub quote: Quote,
    pub error: ReservationError,
}

// Result of confirming every pending quote: what was booked and what was not
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfirmOutcome {
    pub confirmed: Vec<Reservation>,
    pub failed: Vec<FailedQuote>,
}

impl ConfirmOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug)]
struct SessionInner {
    pending_quotes: Vec<Quote>,
    state: SessionState,
}

pub struct ReservationSession {
    info: SessionInfo,
    registry: Arc<CompanyRegistry>,
    policy: ConfirmPolicy,
    inner: Mutex<SessionInner>,
}

impl ReservationSession {
    pub fn new(
        id: SessionId,
        name: impl Into<String>,
        registry: Arc<CompanyRegistry>,
        policy: ConfirmPolicy,
    ) -> Self {
        Self {
            info: SessionInfo::new(id, name),
            registry,
            policy,
            inner: Mutex::new(SessionInner {
                pending_quotes: Vec::new(),
                state: SessionState::Active,
            }),
        }
    }

    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    pub fn id(&self) -> SessionId {
        self.info.id
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    // Asks the registered companies in name order and keeps the first quote offered.
    // Companies that cannot serve the request, or cannot be reached, are skipped.
    pub async fn create_quote(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        car_type: &str,
        region: &str,
    ) -> Result<Quote> {
        self.info.touch();
        if self.state() == SessionState::Confirmed {
            return Err(ReservationError::SessionConfirmed(self.info.name.clone()));
        }
        let constraints = ReservationConstraints::new(start, end, car_type, region)?;

        for company in self.registry.all_companies() {
            match company.create_quote(&self.info.name, &constraints).await {
                Ok(quote) => {
                    info!(session = %self.info.name, company = %quote.company, price = quote.price, "Quote added");
                    self.inner.lock().pending_quotes.push(quote.clone());
                    return Ok(quote);
                }
                Err(e) if e.is_unsatisfiable() => {
                    debug!(company = %company.name(), error = %e, "Company cannot satisfy constraints");
                }
                Err(e @ ReservationError::TransportUnavailable { .. }) => {
                    warn!(company = %company.name(), error = %e, "Skipping unreachable company");
                }
                Err(e) => return Err(e),
            }
        }

        Err(ReservationError::NoAvailability(format!(
            "{} in {} from {} to {}",
            car_type, region, start, end
        )))
    }

    pub fn current_quotes(&self) -> Vec<Quote> {
        self.info.touch();
        self.inner.lock().pending_quotes.clone()
    }

    // Confirms the pending quotes in insertion order. Each company confirms atomically,
    // the sequence as a whole does not; the configured policy decides what a failure means.
    pub async fn confirm_quotes(&self) -> Result<ConfirmOutcome> {
        self.info.touch();
        let quotes = self.inner.lock().pending_quotes.clone();
        let mut outcome = ConfirmOutcome::default();

        for quote in &quotes {
            let result = match self.registry.lookup(&quote.company) {
                Ok(company) => company.confirm_quote(quote).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(reservation) => outcome.confirmed.push(reservation),
                Err(error) => {
                    warn!(session = %self.info.name, company = %quote.company, %error, "Quote confirmation failed");
                    if self.policy == ConfirmPolicy::AllOrNothing {
                        let leaked = self.compensate(&outcome.confirmed).await;
                        return Err(ReservationError::ConfirmationAborted {
                            quote: Box::new(quote.clone()),
                            source: Box::new(error),
                            leaked,
                        });
                    }
                    outcome.failed.push(FailedQuote {
                        quote: quote.clone(),
                        error,
                    });
                }
            }
        }

        let mut inner = self.inner.lock();
        inner.pending_quotes.drain(..quotes.len());
        if !outcome.confirmed.is_empty() {
            inner.state = SessionState::Confirmed;
        }
        info!(
            session = %self.info.name,
            confirmed = outcome.confirmed.len(),
            failed = outcome.failed.len(),
            "Quotes confirmed"
        );
        Ok(outcome)
    }

    // Cancels in reverse order; returns the reservations that are still booked
    async fn compensate(&self, confirmed: &[Reservation]) -> Vec<Reservation> {
        let mut leaked = Vec::new();
        for reservation in confirmed.iter().rev() {
            let result = match self.registry.lookup(&reservation.company) {
                Ok(company) => company.cancel_reservation(reservation).await,
                Err(e) => Err(e),
            };
            if let Err(error) = result {
                warn!(
                    session = %self.info.name,
                    company = %reservation.company,
                    car_id = reservation.car_id,
                    %error,
                    "Failed to roll back reservation"
                );
                leaked.push(reservation.clone());
            }
        }
        leaked
    }

    // Car types free in the period at any company, without duplicates
    pub async fn available_car_types(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CarType>> {
        self.info.touch();
        validate_period(start, end)?;
        let companies = self.registry.all_companies();
        let results = join_all(
            companies
                .iter()
                .map(|company| company.get_available_car_types(start, end)),
        )
        .await;

        let mut car_types: Vec<CarType> = Vec::new();
        for result in results {
            for car_type in result? {
                if !car_types.contains(&car_type) {
                    car_types.push(car_type);
                }
            }
        }
        Ok(car_types)
    }

    // Name of the cheapest car type free in the period across every company serving the region.
    // Equal prices resolve to the lexicographically smallest name. Unreachable companies are skipped.
    pub async fn cheapest_car_type(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        region: &str,
    ) -> Result<String> {
        self.info.touch();
        validate_period(start, end)?;

        let companies = self.registry.all_companies();
        let results = join_all(
            companies
                .iter()
                .map(|company| offers_in_region(company.as_ref(), region, start, end)),
        )
        .await;

        let mut cheapest: Option<(f64, String)> = None;
        for (company, result) in companies.iter().zip(results) {
            let car_types = match result {
                Ok(car_types) => car_types,
                Err(e @ ReservationError::TransportUnavailable { .. }) => {
                    warn!(company = %company.name(), error = %e, "Skipping unreachable company");
                    continue;
                }
                Err(e) => return Err(e),
            };
            for car_type in car_types {
                let price = car_type.rental_price_per_day;
                let better = match &cheapest {
                    None => true,
                    Some((best_price, best_name)) => price
                        .total_cmp(best_price)
                        .then_with(|| car_type.name.cmp(best_name))
                        .is_lt(),
                };
                if better {
                    cheapest = Some((price, car_type.name));
                }
            }
        }

        cheapest
            .map(|(_, name)| name)
            .ok_or_else(|| ReservationError::NoAvailability(format!("any car type in {}", region)))
    }

    // Every reservation held by this session's renter, across all companies
    pub async fn reservations(&self) -> Result<Vec<Reservation>> {
        self.info.touch();
        collect_renter_reservations(&self.registry.all_companies(), &self.info.name).await
    }

    pub async fn cancel_reservation(&self, company: &str, reservation: &Reservation) -> Result<()> {
        self.info.touch();
        self.registry
            .lookup(company)?
            .cancel_reservation(reservation)
            .await
    }
}

// Free car types of a company, or nothing when it does not operate in the region
async fn offers_in_region(
    company: &dyn CarRentalCompany,
    region: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<CarType>> {
    if !company.get_regions().await?.iter().any(|r| r == region) {
        return Ok(Vec::new());
    }
    company.get_available_car_types(start, end).await
}

async fn collect_renter_reservations(
    companies: &[Arc<dyn CarRentalCompany>],
    renter: &str,
) -> Result<Vec<Reservation>> {
    let results = join_all(
        companies
            .iter()
            .map(|company| company.get_reservations_by_renter(renter)),
    )
    .await;

    let mut reservations = Vec::new();
    for result in results {
        match result {
            Ok(found) => reservations.extend(found),
            Err(ReservationError::NoReservations { .. }) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(reservations)
}

// Administrative session for cross-company reports
pub struct ManagerSession {
    info: SessionInfo,
    registry: Arc<CompanyRegistry>,
}

impl ManagerSession {
    pub fn new(id: SessionId, name: impl Into<String>, registry: Arc<CompanyRegistry>) -> Self {
        Self {
            info: SessionInfo::new(id, name),
            registry,
        }
    }

    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    pub fn id(&self) -> SessionId {
        self.info.id
    }

    pub fn registered_companies(&self) -> Vec<String> {
        self.info.touch();
        self.registry.company_names()
    }

    pub async fn all_car_types(&self, company: &str) -> Result<Vec<CarType>> {
        self.info.touch();
        self.registry.lookup(company)?.get_all_car_types().await
    }

    pub async fn number_of_reservations_for_car_type(
        &self,
        company: &str,
        car_type: &str,
    ) -> Result<usize> {
        self.info.touch();
        self.registry
            .lookup(company)?
            .get_number_of_reservations_for_car_type(car_type)
            .await
    }

    pub async fn most_popular_car_type(
        &self,
        company: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<CarType> {
        self.info.touch();
        self.registry
            .lookup(company)?
            .get_most_popular_car_type(start, end)
            .await
    }

    pub async fn reservations_by_renter(&self, renter: &str) -> Result<Vec<Reservation>> {
        self.info.touch();
        let reservations =
            collect_renter_reservations(&self.registry.all_companies(), renter).await?;
        if reservations.is_empty() {
            return Err(ReservationError::NoReservations {
                company: "*".to_string(),
                renter: renter.to_string(),
            });
        }
        Ok(reservations)
    }
}
