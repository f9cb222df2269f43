//! Data access layer. Each store owns a clone of the connection pool.

pub mod accounts;
pub mod appointments;
pub mod leads;

pub use accounts::AccountStore;
pub use appointments::{AppointmentQuery, AppointmentStore};
pub use leads::{LeadQuery, LeadSortField, LeadStore};
