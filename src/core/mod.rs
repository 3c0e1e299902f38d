pub mod error;
pub mod record;
pub mod types;
pub mod value;

pub use error::{AdapterError, Result};
pub use record::{Record, RecordId};
pub use types::{Attribute, DataType, RecordKind};
pub use value::Value;
