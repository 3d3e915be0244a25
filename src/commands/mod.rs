pub mod distance;
pub mod geocode;
pub mod invoke;
pub mod serve;

pub use distance::handle_distance;
pub use geocode::handle_geocode;
pub use invoke::handle_invoke;
pub use serve::handle_serve;
