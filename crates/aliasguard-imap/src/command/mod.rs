//! IMAP commands and their wire form.

mod tag_generator;

pub use tag_generator::TagGenerator;

use crate::{Error, Result};

/// A command the client can send.
///
/// Message references are always UIDs; sequence numbers shift under
/// concurrent expunges and are not used.
#[derive(Clone, PartialEq, Eq)]
pub enum Command {
    /// CAPABILITY.
    Capability,
    /// NOOP, also used to poll servers without IDLE.
    Noop,
    /// LOGIN with a plaintext password.
    Login {
        /// User name.
        username: String,
        /// Password.
        password: String,
    },
    /// SELECT a mailbox read-write.
    Select {
        /// Mailbox name.
        mailbox: String,
    },
    /// CREATE a mailbox.
    Create {
        /// Mailbox name.
        mailbox: String,
    },
    /// `UID SEARCH` with raw search criteria such as `UNSEEN`.
    UidSearch {
        /// Search keys, sent as given.
        criteria: String,
    },
    /// `UID FETCH` of selected header fields without setting `\Seen`.
    UidFetchHeaderFields {
        /// Message UID.
        uid: u32,
        /// Header field names.
        fields: Vec<String>,
    },
    /// `UID MOVE` (RFC 6851).
    UidMove {
        /// Message UID.
        uid: u32,
        /// Target mailbox.
        mailbox: String,
    },
    /// `UID COPY`.
    UidCopy {
        /// Message UID.
        uid: u32,
        /// Target mailbox.
        mailbox: String,
    },
    /// `UID STORE uid +FLAGS.SILENT (\Deleted)`.
    UidStoreDeleted {
        /// Message UID.
        uid: u32,
    },
    /// `UID EXPUNGE` (RFC 4315).
    UidExpunge {
        /// Message UID.
        uid: u32,
    },
    /// EXPUNGE every `\Deleted` message in the mailbox.
    Expunge,
    /// IDLE (RFC 2177).
    Idle,
    /// DONE, ends IDLE. Sent without a tag.
    Done,
    /// LOGOUT.
    Logout,
}

impl Command {
    /// Command name for logs. Never includes arguments.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Capability => "CAPABILITY",
            Self::Noop => "NOOP",
            Self::Login { .. } => "LOGIN",
            Self::Select { .. } => "SELECT",
            Self::Create { .. } => "CREATE",
            Self::UidSearch { .. } => "UID SEARCH",
            Self::UidFetchHeaderFields { .. } => "UID FETCH",
            Self::UidMove { .. } => "UID MOVE",
            Self::UidCopy { .. } => "UID COPY",
            Self::UidStoreDeleted { .. } => "UID STORE",
            Self::UidExpunge { .. } => "UID EXPUNGE",
            Self::Expunge => "EXPUNGE",
            Self::Idle => "IDLE",
            Self::Done => "DONE",
            Self::Logout => "LOGOUT",
        }
    }

    /// Rejects arguments that cannot travel as an atom or quoted string.
    ///
    /// Quoted strings cannot carry CR, LF or NUL. Mailbox names must be
    /// ASCII because modified UTF-7 is not implemented.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] naming the command.
    pub fn check_arguments(&self) -> Result<()> {
        let unsendable = |s: &str| s.bytes().any(|b| matches!(b, b'\r' | b'\n' | 0));
        let (strings, mailbox): (Vec<&str>, Option<&str>) = match self {
            Self::Login { username, password } => (vec![username.as_str(), password.as_str()], None),
            Self::Select { mailbox }
            | Self::Create { mailbox }
            | Self::UidMove { mailbox, .. }
            | Self::UidCopy { mailbox, .. } => (vec![mailbox.as_str()], Some(mailbox.as_str())),
            Self::UidSearch { criteria } => (vec![criteria.as_str()], None),
            Self::UidFetchHeaderFields { fields, .. } => {
                (fields.iter().map(String::as_str).collect(), None)
            }
            _ => (Vec::new(), None),
        };

        if strings.into_iter().any(unsendable) {
            return Err(Error::Protocol(format!(
                "{} argument contains CR, LF or NUL",
                self.name()
            )));
        }
        if mailbox.is_some_and(|name| !name.is_ascii()) {
            return Err(Error::Protocol(format!(
                "{} mailbox name must be ASCII",
                self.name()
            )));
        }
        Ok(())
    }

    /// Serializes the command with `tag`, including the trailing CRLF.
    #[must_use]
    pub fn serialize(&self, tag: &str) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);

        if matches!(self, Self::Done) {
            buf.extend_from_slice(b"DONE\r\n");
            return buf;
        }

        buf.extend_from_slice(tag.as_bytes());
        buf.push(b' ');

        match self {
            Self::Capability
            | Self::Noop
            | Self::Expunge
            | Self::Idle
            | Self::Logout
            | Self::Done => buf.extend_from_slice(self.name().as_bytes()),
            Self::Login { username, password } => {
                buf.extend_from_slice(b"LOGIN ");
                write_astring(&mut buf, username);
                buf.push(b' ');
                write_astring(&mut buf, password);
            }
            Self::Select { mailbox } | Self::Create { mailbox } => {
                buf.extend_from_slice(self.name().as_bytes());
                buf.push(b' ');
                write_astring(&mut buf, mailbox);
            }
            Self::UidSearch { criteria } => {
                buf.extend_from_slice(b"UID SEARCH ");
                buf.extend_from_slice(criteria.as_bytes());
            }
            Self::UidFetchHeaderFields { uid, fields } => {
                buf.extend_from_slice(
                    format!("UID FETCH {uid} (UID BODY.PEEK[HEADER.FIELDS (").as_bytes(),
                );
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        buf.push(b' ');
                    }
                    write_astring(&mut buf, field);
                }
                buf.extend_from_slice(b")])");
            }
            Self::UidMove { uid, mailbox } | Self::UidCopy { uid, mailbox } => {
                buf.extend_from_slice(format!("{} {uid} ", self.name()).as_bytes());
                write_astring(&mut buf, mailbox);
            }
            Self::UidStoreDeleted { uid } => {
                buf.extend_from_slice(
                    format!("UID STORE {uid} +FLAGS.SILENT (\\Deleted)").as_bytes(),
                );
            }
            Self::UidExpunge { uid } => {
                buf.extend_from_slice(format!("UID EXPUNGE {uid}").as_bytes());
            }
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Command").field(&self.name()).finish()
    }
}

/// Writes an astring, quoting it when it is not a plain atom.
fn write_astring(buf: &mut Vec<u8>, s: &str) {
    if s.is_empty() || s.bytes().any(needs_quoting) {
        buf.push(b'"');
        for b in s.bytes() {
            if b == b'"' || b == b'\\' {
                buf.push(b'\\');
            }
            buf.push(b);
        }
        buf.push(b'"');
    } else {
        buf.extend_from_slice(s.as_bytes());
    }
}

/// Returns true if the byte cannot appear in an atom.
const fn needs_quoting(b: u8) -> bool {
    matches!(b, b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*' | b']')
        || b < 0x20
        || b >= 0x7F
}
