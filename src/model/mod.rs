pub mod bus;
pub mod route;

pub use bus::{Bus, BusEta, BusId};
pub use route::{Route, RoutePoint};
