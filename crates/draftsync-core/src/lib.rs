// Library root: client-side synchronizer for a turn-based draft room.
//
// Server events flow transport -> session -> reducer; the session publishes a
// read-only projection and issues pick intents back through the transport.

pub mod bootstrap;
pub mod config;
pub mod draft;
pub mod error;
pub mod protocol;
pub mod session;
pub mod sync;
pub mod transport;
