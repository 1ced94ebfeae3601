pub mod memory;
pub mod surface;
pub mod view;

pub use memory::InMemorySurface;
pub use surface::{LayerId, MapSurface};
pub use view::MapView;
