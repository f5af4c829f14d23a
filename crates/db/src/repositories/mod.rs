//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod catalog_repo;
pub mod dealer_pricing_repo;
pub mod dealer_repo;
pub mod freshness_repo;
pub mod operations_repo;

pub use catalog_repo::CatalogRepo;
pub use dealer_pricing_repo::DealerPricingRepo;
pub use dealer_repo::DealerRepo;
pub use freshness_repo::FreshnessRepo;
pub use operations_repo::OperationsRepo;
