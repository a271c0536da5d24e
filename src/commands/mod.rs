pub mod backup;
pub mod entries;
pub mod import;
pub mod nav;
pub mod settings;
pub mod summary;

pub use backup::*;
pub use entries::*;
pub use import::*;
pub use nav::*;
pub use settings::*;
pub use summary::*;
