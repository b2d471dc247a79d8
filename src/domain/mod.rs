mod id;
mod macros;
mod errors;
mod district;
mod status;
mod address;
mod geo;
mod langcode;
mod snapshot;

pub use id::*;
pub use errors::*;
pub use district::*;
pub use status::*;
pub use address::*;
pub use geo::*;
pub use langcode::*;
pub use snapshot::*;
