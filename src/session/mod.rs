pub mod budget;
pub mod registry;
pub mod transcript;
pub mod types;

pub use budget::{BudgetOutcome, CharRatioEstimator, TokenEstimator};
pub use registry::{DefaultSessionFactory, SessionFactory, SessionRegistry, SharedSession};
pub use transcript::Session;
pub use types::{Message, MessageRole};
