pub mod format;
pub mod list;
pub mod popup;

pub use list::{ListRow, ListView};
