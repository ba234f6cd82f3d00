//! Dataset-specific pipelines built from the normalizer and classifier steps.

pub mod appointments;
pub mod weather;

pub use appointments::{prepare_appointments, PreparedAppointments};
pub use weather::{enrich_weather, prepare_weather};
