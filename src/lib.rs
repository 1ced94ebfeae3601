pub mod callbacks;
pub mod config;
pub mod intake;
pub mod map;
pub mod model;
pub mod session;
pub mod simulation;
pub mod view;
