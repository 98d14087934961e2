pub mod credentials;
pub mod crocodile;
pub mod step;

pub use credentials::*;
pub use crocodile::*;
pub use step::*;
