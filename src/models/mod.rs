pub mod entry;
pub mod nav;
pub mod settings;
pub mod summary;
pub mod validation;

pub use entry::*;
pub use nav::*;
pub use settings::*;
pub use summary::*;
