// Directory of rental companies. Populated during bootstrap and shared by every
// session afterwards; rebinding a name replaces the previous handle.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use crate::company::CarRentalCompany;
use crate::error::{ReservationError, Result};

#[derive(Default)]
pub struct CompanyRegistry {
    companies: DashMap<String, Arc<dyn CarRentalCompany>>,
}

impl CompanyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: impl Into<String>, company: Arc<dyn CarRentalCompany>) {
        let name = name.into();
        if self.companies.insert(name.clone(), company).is_some() {
            info!(company = %name, "Rebound company in registry");
        } else {
            info!(company = %name, "Registered company");
        }
    }

    pub fn unregister(&self, name: &str) -> Result<()> {
        self.companies
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ReservationError::NoSuchCompany(name.to_string()))
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<dyn CarRentalCompany>> {
        self.companies
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ReservationError::NoSuchCompany(name.to_string()))
    }

    // Handles in company name order, so fan-out queries see a stable sequence
    pub fn all_companies(&self) -> Vec<Arc<dyn CarRentalCompany>> {
        let mut companies: Vec<(String, Arc<dyn CarRentalCompany>)> = self
            .companies
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();
        companies.sort_by(|a, b| a.0.cmp(&b.0));
        companies.into_iter().map(|(_, company)| company).collect()
    }

    pub fn company_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.companies.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.companies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::tests::{economy, inventory, luxury};

    #[test]
    fn test_register_lookup_and_rebind() {
        let registry = CompanyRegistry::new();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.lookup("Hertz"),
            Err(ReservationError::NoSuchCompany(_))
        ));

        registry.register("Hertz", Arc::new(inventory("Hertz", &["Brussels"], &[(economy(), 1)])));
        registry.register("Dockx", Arc::new(inventory("Dockx", &["Leuven"], &[(economy(), 1)])));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.lookup("Hertz").unwrap().name(), "Hertz");

        // Last write wins
        registry.register("Hertz", Arc::new(inventory("Hertz", &["Paris"], &[(luxury(), 2)])));
        assert_eq!(registry.len(), 2);
        let regions = futures::executor::block_on(registry.lookup("Hertz").unwrap().get_regions()).unwrap();
        assert_eq!(regions, vec!["Paris".to_string()]);

        registry.unregister("Dockx").unwrap();
        assert!(registry.unregister("Dockx").is_err());
        assert_eq!(registry.company_names(), vec!["Hertz".to_string()]);
    }

    #[test]
    fn test_all_companies_in_name_order() {
        let registry = CompanyRegistry::new();
        for name in ["Sixt", "Avis", "Hertz"] {
            registry.register(name, Arc::new(inventory(name, &["Brussels"], &[(economy(), 1)])));
        }
        let names: Vec<String> = registry
            .all_companies()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(names, vec!["Avis", "Hertz", "Sixt"]);
    }
}
