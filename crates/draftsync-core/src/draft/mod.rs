// Draft data model: rooms, players, picks, and the synchronized state.

pub mod pick;
pub mod player;
pub mod room;
pub mod state;

pub use pick::Pick;
pub use player::{Player, Position};
pub use room::{Participant, Room, RoomStatus};
pub use state::DraftState;
