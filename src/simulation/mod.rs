pub mod callback;
pub mod event_queue;
pub mod sim_event;
pub mod simulator;
pub mod ticker;
