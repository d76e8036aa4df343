pub mod events;
pub mod location;
pub mod ride;
pub mod user;
