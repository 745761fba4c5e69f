pub mod batch;
pub mod configuration;
pub mod image;

pub use batch::*;
pub use configuration::*;
pub use self::image::*;
