use rust_decimal::Decimal;

use crate::domain::add_on::{AddOn, AddOnId, Package, PackageId};
use crate::errors::DomainError;
use crate::estimation::engine::{CostEstimate, CostEstimationEngine};
use crate::ports::PackageCatalog;

#[derive(Clone, Debug, Default)]
pub struct InMemoryPackageCatalog {
    packages: Vec<Package>,
    add_ons: Vec<AddOn>,
}

impl InMemoryPackageCatalog {
    pub fn new(packages: Vec<Package>, add_ons: Vec<AddOn>) -> Self {
        Self { packages, add_ons }
    }

    pub fn find_package(&self, package_id: &PackageId) -> Option<&Package> {
        self.packages.iter().find(|package| &package.id == package_id)
    }
}

impl PackageCatalog for InMemoryPackageCatalog {
    /// Inactive packages are not quotable and resolve to `None`.
    fn base_price(&self, package_id: &PackageId) -> Option<Decimal> {
        self.find_package(package_id).filter(|package| package.active).map(|package| package.base_price)
    }

    fn add_on_catalog(&self) -> Vec<AddOn> {
        self.add_ons.clone()
    }

    fn add_on(&self, add_on_id: &AddOnId) -> Option<AddOn> {
        self.add_ons.iter().find(|add_on| &add_on.id == add_on_id).cloned()
    }
}

/// Resolves a package and add-on selection against `catalog`, then estimates it.
pub fn estimate_selection<E, C>(
    engine: &E,
    catalog: &C,
    package_id: &PackageId,
    add_on_ids: &[AddOnId],
    tax_percent: Decimal,
) -> Result<CostEstimate, DomainError>
where
    E: CostEstimationEngine + ?Sized,
    C: PackageCatalog + ?Sized,
{
    let max = engine.settings().max_add_ons;
    if add_on_ids.len() > max {
        return Err(DomainError::AddOnLimitExceeded { count: add_on_ids.len(), max });
    }

    let base_price = catalog
        .base_price(package_id)
        .ok_or_else(|| DomainError::UnknownCatalogItem(format!("package {}", package_id.0)))?;
    let add_ons = add_on_ids
        .iter()
        .map(|id| {
            catalog
                .add_on(id)
                .ok_or_else(|| DomainError::UnknownCatalogItem(format!("add-on {}", id.0)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    engine.estimate(base_price, &add_ons, tax_percent)
}
