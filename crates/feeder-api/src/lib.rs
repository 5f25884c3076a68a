// feeder-api: Async Rust client for the smart feeder backend (REST + push channel)

pub mod client;
pub mod error;
pub mod models;
pub mod transport;
pub mod websocket;

mod devices;
mod users;
mod visits;

pub use client::FeederClient;
pub use error::Error;
pub use models::{
    Device, FoodLevelResponse, SpeciesCount, TokenResponse, TopSpeciesResponse,
    UnwelcomeVisitorList, User,
};
pub use transport::{TlsMode, TransportConfig};
pub use websocket::{ChannelSignal, PushChannel, SignalSink};
