pub mod client;
pub mod metrics;
pub mod retry;
pub mod serialization;
pub mod transmission;

pub use client::{ClientError, DeliveryError, HttpClient};
pub use metrics::{StatsSnapshot, TransportStats};
pub use retry::RetryPolicy;
pub use serialization::{BatchSerializer, Payload, SerializationError, ServiceType};
pub use transmission::{BatchTransmitter, TransmissionError, TransmissionResult};
