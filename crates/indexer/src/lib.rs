pub mod arguments;
pub mod chain;
pub mod events;
pub mod floor;
pub mod projector;
pub mod run;
pub mod tailer;
mod util;

pub use run::start;
