mod build;
mod inspect;

pub use build::build;
pub use inspect::inspect;
