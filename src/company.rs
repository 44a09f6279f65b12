// Company-facing boundary: every call a session makes to a rental company goes
// through this trait, so an in-process inventory and a remote endpoint are interchangeable

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::{ReservationError, Result};
use crate::inventory::Inventory;
use crate::model::{CarType, Quote, Reservation, ReservationConstraints};

#[async_trait]
pub trait CarRentalCompany: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn get_all_car_types(&self) -> Result<Vec<CarType>>;

    async fn get_available_car_types(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CarType>>;

    async fn get_regions(&self) -> Result<Vec<String>>;

    async fn create_quote(&self, renter: &str, constraints: &ReservationConstraints) -> Result<Quote>;

    async fn confirm_quote(&self, quote: &Quote) -> Result<Reservation>;

    async fn cancel_reservation(&self, reservation: &Reservation) -> Result<()>;

    async fn get_reservations_by_renter(&self, renter: &str) -> Result<Vec<Reservation>>;

    async fn get_number_of_reservations_for_car_type(&self, car_type: &str) -> Result<usize>;

    async fn get_most_popular_car_type(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<CarType>;
}

#[async_trait]
impl CarRentalCompany for Inventory {
    fn name(&self) -> &str {
        Inventory::name(self)
    }

    async fn get_all_car_types(&self) -> Result<Vec<CarType>> {
        Ok(self.all_car_types())
    }

    async fn get_available_car_types(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CarType>> {
        Ok(self.available_car_types(start, end))
    }

    async fn get_regions(&self) -> Result<Vec<String>> {
        Ok(self.regions().to_vec())
    }

    async fn create_quote(&self, renter: &str, constraints: &ReservationConstraints) -> Result<Quote> {
        Inventory::create_quote(self, renter, constraints)
    }

    async fn confirm_quote(&self, quote: &Quote) -> Result<Reservation> {
        Inventory::confirm_quote(self, quote)
    }

    async fn cancel_reservation(&self, reservation: &Reservation) -> Result<()> {
        Inventory::cancel_reservation(self, reservation)
    }

    async fn get_reservations_by_renter(&self, renter: &str) -> Result<Vec<Reservation>> {
        self.reservations_by_renter(renter)
    }

    async fn get_number_of_reservations_for_car_type(&self, car_type: &str) -> Result<usize> {
        self.reservation_count_for_car_type(car_type)
    }

    async fn get_most_popular_car_type(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<CarType> {
        self.most_popular_car_type(start, end)
    }
}

// Transport wrapper around a company handle. Calls that exceed the timeout, or are
// made while the endpoint is marked unreachable, fail with TransportUnavailable.
pub struct RemoteCompany {
    name: String,
    inner: Arc<dyn CarRentalCompany>,
    timeout: Duration,
    reachable: AtomicBool,
    latency_ms: AtomicU64,
}

impl RemoteCompany {
    pub fn new(inner: Arc<dyn CarRentalCompany>, timeout: Duration) -> Self {
        Self {
            name: inner.name().to_string(),
            inner,
            timeout,
            reachable: AtomicBool::new(true),
            latency_ms: AtomicU64::new(0),
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    // Simulated link delay added before each call reaches the company
    pub fn set_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(millis, Ordering::SeqCst);
    }

    fn unavailable(&self, reason: impl Into<String>) -> ReservationError {
        let reason = reason.into();
        warn!(company = %self.name, %reason, "Company endpoint unavailable");
        ReservationError::TransportUnavailable {
            company: self.name.clone(),
            reason,
        }
    }

    async fn call<T, F>(&self, call: F) -> Result<T>
    where
        T: Send,
        F: std::future::Future<Output = Result<T>> + Send,
    {
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(self.unavailable("endpoint unreachable"));
        }

        let latency = self.latency_ms.load(Ordering::SeqCst);
        let delayed = async {
            if latency > 0 {
                tokio::time::sleep(Duration::from_millis(latency)).await;
            }
            call.await
        };

        match tokio::time::timeout(self.timeout, delayed).await {
            Ok(result) => result,
            Err(_) => Err(self.unavailable(format!(
                "no response within {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}

#[async_trait]
impl CarRentalCompany for RemoteCompany {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_all_car_types(&self) -> Result<Vec<CarType>> {
        self.call(self.inner.get_all_car_types()).await
    }

    async fn get_available_car_types(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CarType>> {
        self.call(self.inner.get_available_car_types(start, end)).await
    }

    async fn get_regions(&self) -> Result<Vec<String>> {
        self.call(self.inner.get_regions()).await
    }

    async fn create_quote(&self, renter: &str, constraints: &ReservationConstraints) -> Result<Quote> {
        self.call(self.inner.create_quote(renter, constraints)).await
    }

    async fn confirm_quote(&self, quote: &Quote) -> Result<Reservation> {
        self.call(self.inner.confirm_quote(quote)).await
    }

    async fn cancel_reservation(&self, reservation: &Reservation) -> Result<()> {
        self.call(self.inner.cancel_reservation(reservation)).await
    }

    async fn get_reservations_by_renter(&self, renter: &str) -> Result<Vec<Reservation>> {
        self.call(self.inner.get_reservations_by_renter(renter)).await
    }

    async fn get_number_of_reservations_for_car_type(&self, car_type: &str) -> Result<usize> {
        self.call(self.inner.get_number_of_reservations_for_car_type(car_type))
            .await
    }

    async fn get_most_popular_car_type(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<CarType> {
        self.call(self.inner.get_most_popular_car_type(start, end)).await
    }
}
