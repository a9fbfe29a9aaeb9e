mod cors;
mod inner_token;
mod recovery;
mod request_id;

pub use cors::cors;
pub use inner_token::{InnerTokenMiddlewareFactory, InnerTokenMiddlewareService, INNER_TOKEN_HEADER};
pub use recovery::{RecoveryMiddlewareFactory, RecoveryMiddlewareService};
pub use request_id::{
    current_request_id,
    RequestId,
    RequestIdMiddlewareFactory,
    RequestIdMiddlewareService,
    REQUEST_ID_HEADER,
};
