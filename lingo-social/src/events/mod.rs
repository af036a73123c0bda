pub mod publisher;
pub mod subscriber;

pub use publisher::EventPublisher;
