//! Connection handling: transport streams, framing, the type-state client
//! and IDLE.

mod client;
mod framed;
mod idle;
mod stream;

pub use client::{Authenticated, Client, MailboxStatus, NotAuthenticated, Selected};
pub use idle::{IdleEvent, IdleHandle};
pub use stream::{ImapStream, connect_plain, connect_tls};
