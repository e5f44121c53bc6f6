mod store_error;

pub use store_error::{StoreError, StoreResult};
