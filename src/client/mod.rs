//! The consumer side of the REST contract: a persisted session store, one
//! resource client per entity, and the loading/submission state machines
//! the management screens drive.

pub mod error;
pub mod resources;
pub mod session;
pub mod views;

pub use error::{ClientError, ClientResult};
pub use resources::ApiClient;
pub use session::{Identity, Session};
