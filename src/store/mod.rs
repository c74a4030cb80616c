pub mod expiring;

pub use expiring::{ExpiringStore, Ttl};
