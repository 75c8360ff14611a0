#![forbid(unsafe_code)]

pub mod context;
pub mod diff_path;
pub mod error;
pub mod ids;
pub mod model;
pub mod session;

pub use context::{CancelToken, Interrupted, RequestContext};
pub use diff_path::{CompareInfo, DiffPathError, parse_diff_path};
pub use error::{Classify, ErrorKind};
pub use session::{Identity, Principal, PrincipalKind, Session};
