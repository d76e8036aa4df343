pub mod dispatch;
pub mod locations;
pub mod matching;
pub mod notifier;
pub mod queue;
pub mod registry;
