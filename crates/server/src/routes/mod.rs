mod events;
mod health;
mod runs;
mod templates;

pub use events::*;
pub use health::*;
pub use runs::*;
pub use templates::*;
