// Error types shared by companies, sessions and the bootstrap loader

use thiserror::Error;

use crate::model::{Quote, Reservation};

// Coarse classification used by callers that only care about the failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidConstraint,
    Unavailable,
    NoSuchEntity,
    TransportUnavailable,
}

// Business and boundary failures of the reservation protocol
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReservationError {
    #[error("<{company}> does not operate in region {region}")]
    NoSuchRegion { company: String, region: String },

    #[error("<{company}> has no car type named {car_type}")]
    NoSuchCarType { company: String, car_type: String },

    #[error("<{company}> all cars of type {car_type} are unavailable in the requested period")]
    Unavailable { company: String, car_type: String },

    #[error("<{company}> has no car with id {car_id}")]
    NoSuchCar { company: String, car_id: u32 },

    #[error("<{company}> reservation not found on car {car_id}")]
    NoSuchReservation { company: String, car_id: u32 },

    #[error("<{company}> no reservations were made by renter {renter}")]
    NoReservations { company: String, renter: String },

    #[error("No company registered under name {0}")]
    NoSuchCompany(String),

    #[error("Session {0} is not tracked by the session manager")]
    NoSuchSession(u64),

    #[error("No registered company can satisfy the constraints: {0}")]
    NoAvailability(String),

    #[error("Invalid constraint: {0}")]
    InvalidConstraint(String),

    #[error("Session {0} has already confirmed its quotes")]
    SessionConfirmed(String),

    // `leaked` holds earlier reservations that could not be cancelled during rollback
    #[error(
        "Confirmation aborted on quote for {} at {}: {source} ({} reservation(s) left in place)",
        .quote.car_type,
        .quote.company,
        .leaked.len()
    )]
    ConfirmationAborted {
        quote: Box<Quote>,
        source: Box<ReservationError>,
        leaked: Vec<Reservation>,
    },

    #[error("Company {company} is unreachable: {reason}")]
    TransportUnavailable { company: String, reason: String },
}

impl ReservationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReservationError::NoSuchRegion { .. }
            | ReservationError::InvalidConstraint(_)
            | ReservationError::SessionConfirmed(_) => ErrorKind::InvalidConstraint,
            ReservationError::Unavailable { .. } | ReservationError::NoAvailability(_) => {
                ErrorKind::Unavailable
            }
            ReservationError::NoSuchCarType { .. }
            | ReservationError::NoSuchCar { .. }
            | ReservationError::NoSuchReservation { .. }
            | ReservationError::NoReservations { .. }
            | ReservationError::NoSuchCompany(_)
            | ReservationError::NoSuchSession(_) => ErrorKind::NoSuchEntity,
            ReservationError::ConfirmationAborted { source, .. } => source.kind(),
            ReservationError::TransportUnavailable { .. } => ErrorKind::TransportUnavailable,
        }
    }

    // True for failures that mean "this company cannot serve the request" rather than a broken call
    pub fn is_unsatisfiable(&self) -> bool {
        matches!(
            self,
            ReservationError::NoSuchRegion { .. }
                | ReservationError::NoSuchCarType { .. }
                | ReservationError::Unavailable { .. }
        )
    }
}

// Errors raised while reading configuration or company data files
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parse error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid data at line {line}: {message}")]
    InvalidFormat { line: u64, message: String },

    #[error("Missing company header (a line starting with '-')")]
    MissingHeader,
}

pub type Result<T> = std::result::Result<T, ReservationError>;
