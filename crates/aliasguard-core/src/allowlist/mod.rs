//! Sender-domain allow-list.
//!
//! Maps an alias to the domains that may send to it regardless of any other
//! check. A domain can be registered for one alias only, across the whole
//! store. That uniqueness is probably stricter than intended (one domain
//! cannot be allowed on two aliases) and is kept until someone decides
//! otherwise.

mod model;
mod repository;

pub use model::AllowListEntry;
pub use repository::{AllowList, AllowListRepository};
