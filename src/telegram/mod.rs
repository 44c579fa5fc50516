//! Telegram delivery

pub mod relay;
pub mod transport;

pub use relay::{DeliveryOutcome, DeliveryRelay, RelayReport};
pub use transport::{AudioTransport, LinkedAudio, TelegramTransport};
