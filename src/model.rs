// Rental data model: car types, cars with their booking calendar, quotes and reservations

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ReservationError, Result};

const MILLIS_PER_DAY: f64 = 24.0 * 60.0 * 60.0 * 1000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarType {
    pub name: String,
    pub seats: u32,
    pub trunk_space: f32,
    pub rental_price_per_day: f64,
    pub smoking_allowed: bool,
}

impl CarType {
    pub fn new(
        name: impl Into<String>,
        seats: u32,
        trunk_space: f32,
        rental_price_per_day: f64,
        smoking_allowed: bool,
    ) -> Self {
        Self {
            name: name.into(),
            seats,
            trunk_space,
            rental_price_per_day,
            smoking_allowed,
        }
    }
}

// Parameters of a quote request, validated before reaching any company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationConstraints {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub car_type: String,
    pub region: String,
}

impl ReservationConstraints {
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        car_type: impl Into<String>,
        region: impl Into<String>,
    ) -> Result<Self> {
        validate_period(start, end)?;
        Ok(Self {
            start,
            end,
            car_type: car_type.into(),
            region: region.into(),
        })
    }
}

pub fn validate_period(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if end <= start {
        return Err(ReservationError::InvalidConstraint(format!(
            "rental period must end after it starts ({} >= {})",
            start, end
        )));
    }
    Ok(())
}

// Two half-open periods [start, end) overlap when each starts before the other ends
pub fn periods_overlap(
    start1: DateTime<Utc>,
    end1: DateTime<Utc>,
    start2: DateTime<Utc>,
    end2: DateTime<Utc>,
) -> bool {
    start1 < end2 && start2 < end1
}

// Number of billed days: elapsed time rounded up, never less than one
pub fn rental_days(start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    let elapsed = (end - start).num_milliseconds() as f64 / MILLIS_PER_DAY;
    (elapsed.ceil() as u32).max(1)
}

pub fn rental_price(price_per_day: f64, start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    price_per_day * f64::from(rental_days(start, end))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub renter: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub company: String,
    pub car_type: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub renter: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub company: String,
    pub car_type: String,
    pub price: f64,
    pub car_id: u32,
}

impl Reservation {
    pub fn from_quote(quote: &Quote, car_id: u32) -> Self {
        Self {
            renter: quote.renter.clone(),
            start: quote.start,
            end: quote.end,
            company: quote.company.clone(),
            car_type: quote.car_type.clone(),
            price: quote.price,
            car_id,
        }
    }

    // Reservations are identified by (company, car, renter, period)
    pub fn same_booking(&self, other: &Reservation) -> bool {
        self.company == other.company
            && self.car_id == other.car_id
            && self.renter == other.renter
            && self.start == other.start
            && self.end == other.end
    }

    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        periods_overlap(self.start, self.end, start, end)
    }
}

#[derive(Debug, Clone)]
pub struct Car {
    id: u32,
    car_type: Arc<CarType>,
    // Kept sorted by start date
    reservations: Vec<Reservation>,
}

impl Car {
    pub fn new(id: u32, car_type: Arc<CarType>) -> Self {
        Self {
            id,
            car_type,
            reservations: Vec::new(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn car_type(&self) -> &Arc<CarType> {
        &self.car_type
    }

    pub fn reservations(&self) -> &[Reservation] {
        &self.reservations
    }

    pub fn is_available(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        !self.reservations.iter().any(|r| r.overlaps(start, end))
    }

    pub fn add_reservation(&mut self, reservation: Reservation) {
        assert!(
            self.is_available(reservation.start, reservation.end),
            "car {} double-booked from {} to {}",
            self.id,
            reservation.start,
            reservation.end
        );
        let position = self
            .reservations
            .partition_point(|r| r.start <= reservation.start);
        self.reservations.insert(position, reservation);
    }

    // Returns the removed reservation, or None when it is not on this car's calendar
    pub fn remove_reservation(&mut self, reservation: &Reservation) -> Option<Reservation> {
        let index = self
            .reservations
            .iter()
            .position(|r| r.same_booking(reservation))?;
        Some(self.reservations.remove(index))
    }
}
