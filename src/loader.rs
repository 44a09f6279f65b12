// Bootstrap loading of company data files into registered inventories.
//
// File format, one record per line:
//   # comment
//   -<company name>,<region>:<region>:...
//   <car type>,<seats>,<trunk space>,<price per day>,<smoking allowed>,<number of cars>
// Car ids are assigned consecutively from 0 in file order.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::info;

use crate::company::RemoteCompany;
use crate::config::AgencyConfig;
use crate::error::LoadError;
use crate::inventory::Inventory;
use crate::model::{Car, CarType};
use crate::registry::CompanyRegistry;

#[derive(Debug)]
pub struct CompanyData {
    pub name: String,
    pub regions: Vec<String>,
    pub cars: Vec<Car>,
}

impl CompanyData {
    pub fn into_inventory(self) -> Inventory {
        Inventory::new(self.name, self.regions, self.cars)
    }
}

fn field<T: FromStr>(record: &StringRecord, index: usize, line: u64, what: &str) -> Result<T, LoadError> {
    let raw = record.get(index).ok_or_else(|| LoadError::InvalidFormat {
        line,
        message: format!("missing {}", what),
    })?;
    raw.parse().map_err(|_| LoadError::InvalidFormat {
        line,
        message: format!("invalid {}: {:?}", what, raw),
    })
}

pub fn parse_company_data<R: Read>(input: R) -> Result<CompanyData, LoadError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(Trim::All)
        .from_reader(input);

    let mut name = None;
    let mut regions = Vec::new();
    let mut cars = Vec::new();
    let mut next_id = 0u32;

    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        let first = record.get(0).unwrap_or_default();

        if let Some(company) = first.strip_prefix('-') {
            name = Some(company.trim().to_string());
            regions = record
                .get(1)
                .unwrap_or_default()
                .split(':')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(String::from)
                .collect();
            continue;
        }
        if first.is_empty() {
            continue;
        }

        let car_type = Arc::new(CarType::new(
            first,
            field(&record, 1, line, "seat count")?,
            field(&record, 2, line, "trunk space")?,
            field(&record, 3, line, "price per day")?,
            record
                .get(4)
                .is_some_and(|flag| flag.eq_ignore_ascii_case("true")),
        ));
        let count: u32 = field(&record, 5, line, "number of cars")?;

        for _ in 0..count {
            cars.push(Car::new(next_id, Arc::clone(&car_type)));
            next_id += 1;
        }
    }

    Ok(CompanyData {
        name: name.ok_or(LoadError::MissingHeader)?,
        regions,
        cars,
    })
}

pub fn load_company_file(path: impl AsRef<Path>) -> Result<CompanyData, LoadError> {
    let path = path.as_ref();
    let data = parse_company_data(File::open(path)?)?;
    info!(file = %path.display(), company = %data.name, cars = data.cars.len(), "Loaded company data");
    Ok(data)
}

// Builds one inventory per configured data file, each behind the transport timeout
pub fn load_registry(config: &AgencyConfig) -> Result<CompanyRegistry, LoadError> {
    let registry = CompanyRegistry::new();
    for path in &config.companies {
        let inventory = load_company_file(path)?.into_inventory();
        let name = inventory.name().to_string();
        let remote = RemoteCompany::new(Arc::new(inventory), config.rpc_timeout());
        registry.register(name, Arc::new(remote));
    }
    Ok(registry)
}
