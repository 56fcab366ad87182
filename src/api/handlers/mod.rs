//! API request handlers.

/// Liveness check.
pub mod health;
/// Oracle model rotation listing.
pub mod models;
/// Research runs streamed as Server-Sent Events.
pub mod research;
