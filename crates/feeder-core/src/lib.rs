// feeder-core: Live visit feed and dashboard services between feeder-api and consumers (CLI/TUI).

pub mod config;
pub mod controller;
pub mod error;
pub mod feed;
pub mod food;
pub mod session;
pub mod species;
pub mod stream;
pub mod visitors;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{Credentials, FeederConfig, TlsVerification};
pub use controller::{ConnectionState, Feeder};
pub use error::CoreError;
pub use feed::{
    ChannelState, ConnectionTarget, FeedEvent, FeedHandle, LiveFeed, VisitHistory, VisitRecord,
};
pub use food::{AlertChange, FoodAlert, FoodLevel, FoodMonitor};
pub use session::Session;
pub use species::SpeciesBoard;
pub use stream::SnapshotStream;
pub use visitors::{UnwelcomeVisitors, VisitorToggle};

// Wire types that surface through the core API.
pub use feeder_api::{Device, SpeciesCount};
