// Per-company inventory: the single authority over one rental company's cars and reservations.
// Reads share a lock; confirmation and cancellation take it exclusively so that the
// availability check and the calendar update happen as one step.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::{ReservationError, Result};
use crate::model::{rental_price, validate_period, Car, CarType, Quote, Reservation, ReservationConstraints};
use crate::selection::{CarSelector, RandomCarSelector};

pub struct Inventory {
    name: String,
    regions: Vec<String>,
    car_types: BTreeMap<String, Arc<CarType>>,
    cars: RwLock<Vec<Car>>,
    selector: Box<dyn CarSelector>,
}

impl std::fmt::Debug for Inventory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inventory")
            .field("name", &self.name)
            .field("regions", &self.regions)
            .field("car_types", &self.car_types.keys().collect::<Vec<_>>())
            .field("cars", &self.cars.read().len())
            .finish()
    }
}

impl Inventory {
    pub fn new(name: impl Into<String>, regions: Vec<String>, cars: Vec<Car>) -> Self {
        let name = name.into();

        let mut ids = HashSet::with_capacity(cars.len());
        for car in &cars {
            assert!(ids.insert(car.id()), "<{}> duplicate car id {}", name, car.id());
        }

        let car_types = cars
            .iter()
            .map(|car| (car.car_type().name.clone(), Arc::clone(car.car_type())))
            .collect::<BTreeMap<_, _>>();

        info!(
            company = %name,
            regions = ?regions,
            cars = cars.len(),
            car_types = car_types.len(),
            "Car rental company starting up"
        );

        Self {
            name,
            regions,
            car_types,
            cars: RwLock::new(cars),
            selector: Box::new(RandomCarSelector),
        }
    }

    pub fn with_selector(mut self, selector: impl CarSelector) -> Self {
        self.selector = Box::new(selector);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    pub fn operates_in_region(&self, region: &str) -> bool {
        self.regions.iter().any(|r| r == region)
    }

    pub fn all_car_types(&self) -> Vec<CarType> {
        self.car_types.values().map(|t| (**t).clone()).collect()
    }

    fn car_type(&self, car_type: &str) -> Result<&Arc<CarType>> {
        self.car_types
            .get(car_type)
            .ok_or_else(|| ReservationError::NoSuchCarType {
                company: self.name.clone(),
                car_type: car_type.to_string(),
            })
    }

    // Car types with at least one car free for the whole period, in name order
    pub fn available_car_types(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<CarType> {
        let cars = self.cars.read();
        let available: HashSet<&str> = cars
            .iter()
            .filter(|car| car.is_available(start, end))
            .map(|car| car.car_type().name.as_str())
            .collect();

        self.car_types
            .values()
            .filter(|t| available.contains(t.name.as_str()))
            .map(|t| (**t).clone())
            .collect()
    }

    fn has_free_car(cars: &[Car], car_type: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        cars.iter()
            .any(|car| car.car_type().name == car_type && car.is_available(start, end))
    }

    // Prices a tentative reservation; no car is held until the quote is confirmed
    pub fn create_quote(&self, renter: &str, constraints: &ReservationConstraints) -> Result<Quote> {
        info!(
            company = %self.name,
            renter = %renter,
            car_type = %constraints.car_type,
            region = %constraints.region,
            "Creating tentative reservation"
        );
        validate_period(constraints.start, constraints.end)?;

        if !self.operates_in_region(&constraints.region) {
            return Err(ReservationError::NoSuchRegion {
                company: self.name.clone(),
                region: constraints.region.clone(),
            });
        }
        let car_type = self.car_type(&constraints.car_type)?;

        debug!(company = %self.name, car_type = %car_type.name, "Checking availability");
        if !Self::has_free_car(&self.cars.read(), &car_type.name, constraints.start, constraints.end) {
            return Err(ReservationError::Unavailable {
                company: self.name.clone(),
                car_type: car_type.name.clone(),
            });
        }

        Ok(Quote {
            renter: renter.to_string(),
            start: constraints.start,
            end: constraints.end,
            company: self.name.clone(),
            car_type: car_type.name.clone(),
            price: rental_price(car_type.rental_price_per_day, constraints.start, constraints.end),
        })
    }

    // Availability is recomputed here because other sessions may have booked the
    // cars since the quote was issued
    pub fn confirm_quote(&self, quote: &Quote) -> Result<Reservation> {
        info!(company = %self.name, renter = %quote.renter, car_type = %quote.car_type, "Confirming quote");
        if quote.company != self.name {
            return Err(ReservationError::InvalidConstraint(format!(
                "quote issued by {} cannot be confirmed at {}",
                quote.company, self.name
            )));
        }
        validate_period(quote.start, quote.end)?;
        self.car_type(&quote.car_type)?;

        let mut cars = self.cars.write();
        let free: Vec<usize> = cars
            .iter()
            .enumerate()
            .filter(|(_, car)| {
                car.car_type().name == quote.car_type && car.is_available(quote.start, quote.end)
            })
            .map(|(index, _)| index)
            .collect();

        if free.is_empty() {
            return Err(ReservationError::Unavailable {
                company: self.name.clone(),
                car_type: quote.car_type.clone(),
            });
        }

        let candidate_ids: Vec<u32> = free.iter().map(|&i| cars[i].id()).collect();
        let chosen = free[self.selector.select(&candidate_ids)];
        let car = &mut cars[chosen];

        let reservation = Reservation::from_quote(quote, car.id());
        car.add_reservation(reservation.clone());
        info!(company = %self.name, car_id = car.id(), renter = %quote.renter, "Reservation confirmed");
        Ok(reservation)
    }

    pub fn cancel_reservation(&self, reservation: &Reservation) -> Result<()> {
        info!(company = %self.name, car_id = reservation.car_id, renter = %reservation.renter, "Cancelling reservation");
        let mut cars = self.cars.write();
        let car = cars
            .iter_mut()
            .find(|car| car.id() == reservation.car_id)
            .ok_or_else(|| ReservationError::NoSuchCar {
                company: self.name.clone(),
                car_id: reservation.car_id,
            })?;

        car.remove_reservation(reservation)
            .map(|_| ())
            .ok_or_else(|| ReservationError::NoSuchReservation {
                company: self.name.clone(),
                car_id: reservation.car_id,
            })
    }

    pub fn reservations_by_renter(&self, renter: &str) -> Result<Vec<Reservation>> {
        let reservations: Vec<Reservation> = self
            .cars
            .read()
            .iter()
            .flat_map(|car| car.reservations().iter())
            .filter(|r| r.renter == renter)
            .cloned()
            .collect();

        if reservations.is_empty() {
            return Err(ReservationError::NoReservations {
                company: self.name.clone(),
                renter: renter.to_string(),
            });
        }
        Ok(reservations)
    }

    pub fn reservation_count_for_car_type(&self, car_type: &str) -> Result<usize> {
        self.car_type(car_type)?;
        Ok(self
            .cars
            .read()
            .iter()
            .filter(|car| car.car_type().name == car_type)
            .map(|car| car.reservations().len())
            .sum())
    }

    // Tallies every reservation regardless of the requested period. On a tie the
    // car type with the lexicographically smallest name wins.
    pub fn most_popular_car_type(&self, _start: DateTime<Utc>, _end: DateTime<Utc>) -> Result<CarType> {
        let cars = self.cars.read();
        let mut tally: BTreeMap<&str, usize> = self.car_types.keys().map(|k| (k.as_str(), 0)).collect();
        for car in cars.iter() {
            if let Some(count) = tally.get_mut(car.car_type().name.as_str()) {
                *count += car.reservations().len();
            }
        }

        let mut best: Option<(&str, usize)> = None;
        for (name, count) in tally {
            if best.map_or(true, |(_, top)| count > top) {
                best = Some((name, count));
            }
        }

        best.and_then(|(name, _)| self.car_types.get(name))
            .map(|t| (**t).clone())
            .ok_or_else(|| ReservationError::NoSuchCarType {
                company: self.name.clone(),
                car_type: "*".to_string(),
            })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::selection::FirstCarSelector;
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    pub(crate) fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, d, 0, 0, 0).unwrap()
    }

    // Builds an inventory from (car type, number of cars) pairs with consecutive ids
    pub(crate) fn inventory(name: &str, regions: &[&str], fleet: &[(CarType, u32)]) -> Inventory {
        let mut cars = Vec::new();
        let mut next_id = 0;
        for (car_type, count) in fleet {
            let car_type = Arc::new(car_type.clone());
            for _ in 0..*count {
                cars.push(Car::new(next_id, Arc::clone(&car_type)));
                next_id += 1;
            }
        }
        Inventory::new(
            name,
            regions.iter().map(|r| r.to_string()).collect(),
            cars,
        )
        .with_selector(FirstCarSelector)
    }

    pub(crate) fn economy() -> CarType {
        CarType::new("Economy", 4, 250.0, 10.0, false)
    }

    pub(crate) fn luxury() -> CarType {
        CarType::new("Luxury", 5, 500.0, 80.0, true)
    }

    fn constraints(car_type: &str, region: &str, start: u32, end: u32) -> ReservationConstraints {
        ReservationConstraints::new(day(start), day(end), car_type, region).unwrap()
    }

    #[test]
    fn test_quote_pricing_and_errors() {
        let hertz = inventory("Hertz", &["Brussels"], &[(economy(), 1)]);

        let quote = hertz
            .create_quote("alice", &constraints("Economy", "Brussels", 1, 3))
            .unwrap();
        assert_eq!(quote.price, 20.0);
        assert_eq!(quote.company, "Hertz");
        assert_eq!(quote.renter, "alice");

        let partial = ReservationConstraints::new(
            day(1),
            day(3) + Duration::hours(12),
            "Economy",
            "Brussels",
        )
        .unwrap();
        assert_eq!(hertz.create_quote("alice", &partial).unwrap().price, 30.0);

        assert!(matches!(
            hertz.create_quote("alice", &constraints("Economy", "Paris", 1, 3)),
            Err(ReservationError::NoSuchRegion { .. })
        ));
        assert!(matches!(
            hertz.create_quote("alice", &constraints("Van", "Brussels", 1, 3)),
            Err(ReservationError::NoSuchCarType { .. })
        ));
    }

    #[test]
    fn test_quote_does_not_hold_a_car() {
        let hertz = inventory("Hertz", &["Brussels"], &[(economy(), 1)]);
        let first = hertz
            .create_quote("alice", &constraints("Economy", "Brussels", 1, 3))
            .unwrap();
        let second = hertz
            .create_quote("bob", &constraints("Economy", "Brussels", 2, 4))
            .unwrap();

        hertz.confirm_quote(&second).unwrap();
        assert!(matches!(
            hertz.confirm_quote(&first),
            Err(ReservationError::Unavailable { .. })
        ));
        assert!(matches!(
            hertz.create_quote("carol", &constraints("Economy", "Brussels", 3, 5)),
            Err(ReservationError::Unavailable { .. })
        ));
        // Ends exactly when bob's booking starts
        assert!(hertz
            .create_quote("carol", &constraints("Economy", "Brussels", 1, 2))
            .is_ok());
    }

    #[test]
    fn test_confirm_rejects_foreign_quote() {
        let hertz = inventory("Hertz", &["Brussels"], &[(economy(), 1)]);
        let dockx = inventory("Dockx", &["Brussels"], &[(economy(), 1)]);
        let quote = dockx
            .create_quote("alice", &constraints("Economy", "Brussels", 1, 3))
            .unwrap();
        assert!(matches!(
            hertz.confirm_quote(&quote),
            Err(ReservationError::InvalidConstraint(_))
        ));
    }

    #[test]
    fn test_confirm_rejects_empty_period() {
        let hertz = inventory("Hertz", &["Brussels"], &[(economy(), 1)]);
        let mut quote = hertz
            .create_quote("alice", &constraints("Economy", "Brussels", 1, 3))
            .unwrap();
        quote.end = quote.start;
        assert!(matches!(
            hertz.confirm_quote(&quote),
            Err(ReservationError::InvalidConstraint(_))
        ));

        quote.end = day(1) - Duration::days(1);
        assert!(hertz.confirm_quote(&quote).is_err());
        assert_eq!(hertz.reservation_count_for_car_type("Economy").unwrap(), 0);
    }

    #[test]
    fn test_cancel_frees_car_type() {
        let hertz = inventory("Hertz", &["Brussels"], &[(economy(), 1), (luxury(), 1)]);
        let quote = hertz
            .create_quote("alice", &constraints("Economy", "Brussels", 1, 5))
            .unwrap();
        let reservation = hertz.confirm_quote(&quote).unwrap();

        let names: Vec<String> = hertz
            .available_car_types(day(2), day(3))
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["Luxury".to_string()]);

        hertz.cancel_reservation(&reservation).unwrap();
        let names: Vec<String> = hertz
            .available_car_types(day(2), day(3))
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["Economy".to_string(), "Luxury".to_string()]);

        assert!(matches!(
            hertz.cancel_reservation(&reservation),
            Err(ReservationError::NoSuchReservation { .. })
        ));
        let mut unknown_car = reservation.clone();
        unknown_car.car_id = 99;
        assert!(matches!(
            hertz.cancel_reservation(&unknown_car),
            Err(ReservationError::NoSuchCar { .. })
        ));
    }

    #[test]
    fn test_reservations_by_renter_and_counts() {
        let hertz = inventory("Hertz", &["Brussels"], &[(economy(), 2), (luxury(), 1)]);
        assert!(matches!(
            hertz.reservations_by_renter("alice"),
            Err(ReservationError::NoReservations { .. })
        ));

        for (renter, car_type, start, end) in [
            ("alice", "Economy", 1, 3),
            ("alice", "Luxury", 4, 6),
            ("bob", "Economy", 1, 3),
        ] {
            let quote = hertz
                .create_quote(renter, &constraints(car_type, "Brussels", start, end))
                .unwrap();
            hertz.confirm_quote(&quote).unwrap();
        }

        assert_eq!(hertz.reservations_by_renter("alice").unwrap().len(), 2);
        assert_eq!(hertz.reservations_by_renter("bob").unwrap().len(), 1);
        assert_eq!(hertz.reservation_count_for_car_type("Economy").unwrap(), 2);
        assert_eq!(hertz.reservation_count_for_car_type("Luxury").unwrap(), 1);
        assert!(matches!(
            hertz.reservation_count_for_car_type("Van"),
            Err(ReservationError::NoSuchCarType { .. })
        ));
    }

    #[test]
    fn test_most_popular_car_type_with_tie_break() {
        let hertz = inventory("Hertz", &["Brussels"], &[(economy(), 1), (luxury(), 1)]);

        // No reservations at all: both tie at zero
        assert_eq!(hertz.most_popular_car_type(day(1), day(30)).unwrap().name, "Economy");

        let quote = hertz
            .create_quote("alice", &constraints("Luxury", "Brussels", 1, 2))
            .unwrap();
        hertz.confirm_quote(&quote).unwrap();
        assert_eq!(hertz.most_popular_car_type(day(1), day(30)).unwrap().name, "Luxury");

        let quote = hertz
            .create_quote("bob", &constraints("Economy", "Brussels", 1, 2))
            .unwrap();
        hertz.confirm_quote(&quote).unwrap();
        for _ in 0..5 {
            assert_eq!(hertz.most_popular_car_type(day(1), day(30)).unwrap().name, "Economy");
        }

        let empty = Inventory::new("Empty", vec![], vec![]);
        assert!(empty.most_popular_car_type(day(1), day(2)).is_err());
    }

    #[test]
    fn test_concurrent_confirmations_never_double_book() {
        let free_cars = 3;
        let contenders = 10;
        let hertz = Arc::new(
            inventory("Hertz", &["Brussels"], &[(economy(), free_cars)])
                .with_selector(RandomCarSelector),
        );
        let quote = hertz
            .create_quote("renter", &constraints("Economy", "Brussels", 1, 4))
            .unwrap();

        let succeeded = Arc::new(AtomicUsize::new(0));
        let unavailable = Arc::new(AtomicUsize::new(0));
        let mut handles = vec![];
        for i in 0..contenders {
            let hertz = Arc::clone(&hertz);
            let succeeded = Arc::clone(&succeeded);
            let unavailable = Arc::clone(&unavailable);
            let mut quote = quote.clone();
            quote.renter = format!("renter{}", i);

            handles.push(thread::spawn(move || match hertz.confirm_quote(&quote) {
                Ok(_) => {
                    succeeded.fetch_add(1, Ordering::SeqCst);
                }
                Err(ReservationError::Unavailable { .. }) => {
                    unavailable.fetch_add(1, Ordering::SeqCst);
                }
                Err(other) => panic!("unexpected error: {}", other),
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(succeeded.load(Ordering::SeqCst), free_cars as usize);
        assert_eq!(unavailable.load(Ordering::SeqCst), contenders - free_cars as usize);
        assert_eq!(hertz.reservation_count_for_car_type("Economy").unwrap(), free_cars as usize);

        for car in hertz.cars.read().iter() {
            assert_eq!(car.reservations().len(), 1);
        }
    }

    #[test]
    fn test_random_confirmations_keep_calendars_disjoint() {
        let hertz = Arc::new(
            inventory("Hertz", &["Brussels"], &[(economy(), 4)]).with_selector(RandomCarSelector),
        );
        let mut handles = vec![];
        for i in 0..8u32 {
            let hertz = Arc::clone(&hertz);
            handles.push(thread::spawn(move || {
                for j in 0..20u32 {
                    let start = 1 + (i + j) % 20;
                    let end = start + 1 + (j % 5);
                    if let Ok(quote) = hertz.create_quote(
                        &format!("renter{}", i),
                        &constraints("Economy", "Brussels", start, end),
                    ) {
                        let _ = hertz.confirm_quote(&quote);
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        for car in hertz.cars.read().iter() {
            let reservations = car.reservations();
            for (a, first) in reservations.iter().enumerate() {
                for second in &reservations[a + 1..] {
                    assert!(!first.overlaps(second.start, second.end));
                }
            }
        }
    }
}
