pub mod callback;

pub use callback::{CallbackDispatcher, DeliveryError};
