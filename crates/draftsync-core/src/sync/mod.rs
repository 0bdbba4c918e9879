// Synchronization state machine: reducer, turn and timer projections, pick
// issuing, and the reconnect barrier.

pub mod issuer;
pub mod reducer;
pub mod resync;
pub mod timer;
pub mod turn;
