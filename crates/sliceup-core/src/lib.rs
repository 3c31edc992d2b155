pub mod config;
pub mod logging;

pub mod chunker;
pub mod error;
pub mod events;
pub mod fingerprint;
pub mod pool;
pub mod remote;
pub mod transport;
pub mod uploader;
