// Car rental agency: sessions collect quotes from independently operated rental
// companies and confirm them against each company's own inventory

pub mod company;
pub mod config;
pub mod error;
pub mod inventory;
pub mod loader;
pub mod logging;
pub mod manager;
pub mod model;
pub mod registry;
pub mod selection;
pub mod session;

// Re-export key types for convenience
pub use company::{CarRentalCompany, RemoteCompany};
pub use config::{AgencyConfig, ConfirmPolicy, LogFormat};
pub use error::{ErrorKind, LoadError, ReservationError};
pub use inventory::Inventory;
pub use manager::{SessionManager, TrackedSession};
pub use model::{Car, CarType, Quote, Reservation, ReservationConstraints};
pub use registry::CompanyRegistry;
pub use selection::{CarSelector, FirstCarSelector, RandomCarSelector};
pub use session::{
    ConfirmOutcome, FailedQuote, ManagerSession, ReservationSession, SessionId, SessionState,
};
