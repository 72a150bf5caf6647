//! `confirm-core` — ask the local user to confirm a device-management
//! operation before it runs.
//!
//! A workflow hands the operation to a [`Waiter`], which keeps announcing
//! "waiting for confirmation" on the local MQTT bus while it polls a
//! [`ConfirmationSource`]. When the window closes unconfirmed, the waiter
//! reports the operation as failed to the cloud and returns
//! [`Outcome::NotConfirmed`].

pub mod config;
pub mod confirmation;
pub mod error;
pub mod publisher;
pub mod types;
pub mod waiter;

pub use config::WaiterConfig;
pub use confirmation::{ConfirmationSource, MarkerFile, NeverConfirmed};
pub use error::{ConfirmError, Result};
pub use publisher::{Delivery, MqttCliPublisher, Publisher};
pub use types::{Operation, Payload, Qos, TopicScheme};
pub use waiter::{Outcome, Waiter, EXIT_ERROR, EXIT_NOT_CONFIRMED, EXIT_OK};
