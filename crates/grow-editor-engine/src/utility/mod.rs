pub mod config;
pub mod deep_object;
pub mod defer;
pub mod listeners;

pub use config::Config;
pub use deep_object::{DeepObject, expand, expand_into, flatten};
pub use defer::Deferred;
pub use listeners::{ListenerId, Listeners};
