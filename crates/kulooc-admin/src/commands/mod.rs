//! Command handlers grouped by subcommand.

pub(crate) mod drivers;
pub(crate) mod indexes;
pub(crate) mod purge;
pub(crate) mod rules;
pub(crate) mod test_driver;

/// Collection holding driver profiles.
pub(crate) const DRIVERS: &str = "drivers";
/// Collection holding driver-submitted documents, keyed by `driverId`.
pub(crate) const DRIVER_DOCUMENTS: &str = "driver_documents";
