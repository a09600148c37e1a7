pub mod events;
pub mod participants;
pub mod trackers;
