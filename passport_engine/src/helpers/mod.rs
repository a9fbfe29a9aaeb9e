mod retry;
mod tokens;

pub use retry::{do_cache_op_with_retry, RetryPolicy};
pub use tokens::{generate_access_token, hash_password};
