pub mod catalog;
pub mod entity;
pub mod error;
pub mod query;
pub mod repository;
pub mod response;
pub mod store;
pub mod validation;
pub mod value;

pub use catalog::{AddedBy, Genre, Mood, Reactions, Track};
pub use entity::{Entity, Registry};
pub use error::{Error, Result};
pub use query::{Combine, Direction, FilterSet, Page, PageParams, PageQuery, SortKey, Window};
pub use repository::{Patch, Repository};
pub use response::{respond, throw, Abort, Envelope, Outcome, Reply};
pub use store::{MemoryStore, PgStore, Session, Store, StoreError};
pub use validation::ValidationError;
pub use value::{FieldKind, Value};
