pub mod convert;
pub mod error;
pub mod pipeline;
pub mod protocol;
pub mod query;
pub mod request;
pub mod source;

pub use convert::*;
pub use error::*;
pub use pipeline::*;
pub use protocol::*;
pub use query::*;
pub use request::*;
pub use source::*;
