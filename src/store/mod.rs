pub mod api_keys;
pub mod ledger;
pub mod linking;
pub mod models;
pub mod rate_limit;
pub mod users;

pub use api_keys::ApiKeyService;
pub use ledger::{generate_id, UploadLedger};
pub use linking::LinkService;
pub use rate_limit::RateLimiter;
pub use users::{UserDirectory, UserError, UserRecord};
