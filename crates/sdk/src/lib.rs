//! Client-side experiments SDK: per-session variant snapshots and the
//! typed facade hosts call to read variants and log views and conversions.

pub mod client;
pub mod session;

pub use client::ExperimentClient;
pub use session::SessionSnapshot;
