mod error;
mod position;
mod reorder;
mod service;
mod zones;

pub use error::*;
pub use position::*;
pub use reorder::*;
pub use service::*;
pub use zones::*;
