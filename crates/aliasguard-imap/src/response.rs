//! Parser for the server responses the client acts on.
//!
//! Only the response shapes needed for login, selection, search, header
//! fetches and IDLE are decoded. Everything else becomes
//! [`Untagged::Other`] and is ignored by the client.

use crate::{Error, Result};

/// Status word of a status response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// OK.
    Ok,
    /// NO: the command failed.
    No,
    /// BAD: the command was not understood.
    Bad,
    /// PREAUTH greeting.
    PreAuth,
    /// BYE: the server is closing the connection.
    Bye,
}

impl Status {
    fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "OK" => Some(Self::Ok),
            "NO" => Some(Self::No),
            "BAD" => Some(Self::Bad),
            "PREAUTH" => Some(Self::PreAuth),
            "BYE" => Some(Self::Bye),
            _ => None,
        }
    }
}

/// One complete server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Completion of the command with this tag.
    Tagged {
        /// Command tag.
        tag: String,
        /// Outcome.
        status: Status,
        /// Response code (if any) and human-readable text.
        text: String,
    },
    /// Untagged data.
    Untagged(Untagged),
    /// Continuation request (`+`).
    Continuation(String),
}

/// Untagged responses the client understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Untagged {
    /// `* OK|NO|BAD|PREAUTH|BYE ...`.
    Status {
        /// Status word.
        status: Status,
        /// Response code (if any) and text.
        text: String,
    },
    /// `* CAPABILITY ...`.
    Capability(Vec<String>),
    /// `* n EXISTS`.
    Exists(u32),
    /// `* n RECENT`.
    Recent(u32),
    /// `* n EXPUNGE`.
    Expunge(u32),
    /// `* SEARCH ...`, UIDs when answering `UID SEARCH`.
    Search(Vec<u32>),
    /// `* n FETCH (...)`.
    Fetch(FetchData),
    /// Anything else.
    Other(String),
}

/// The parts of a FETCH response the client reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchData {
    /// Message sequence number.
    pub seq: u32,
    /// `UID` item, if present.
    pub uid: Option<u32>,
    /// Body section contents, `None` for NIL or when absent.
    pub body: Option<Vec<u8>>,
}

/// Response parser.
#[derive(Debug, Clone, Copy)]
pub struct ResponseParser;

impl ResponseParser {
    /// Parses one response as returned by the framed reader, literals
    /// included.
    pub fn parse(raw: &[u8]) -> Result<Response> {
        let line_end = find_crlf(raw).unwrap_or(raw.len());
        let first = String::from_utf8_lossy(&raw[..line_end]);

        if let Some(rest) = first.strip_prefix('+') {
            return Ok(Response::Continuation(rest.trim_start().to_string()));
        }

        if let Some(rest) = first.strip_prefix("* ") {
            return parse_untagged(rest, raw).map(Response::Untagged);
        }

        let (tag, rest) = first
            .split_once(' ')
            .ok_or_else(|| Error::Protocol(format!("malformed response: {first}")))?;
        let (status, text) = split_status(rest)
            .ok_or_else(|| Error::Protocol(format!("malformed tagged response: {first}")))?;

        Ok(Response::Tagged {
            tag: tag.to_string(),
            status,
            text,
        })
    }
}

/// Capabilities from a `[CAPABILITY ...]` response code, if `text` starts
/// with one.
pub(crate) fn capabilities_in(text: &str) -> Option<Vec<String>> {
    let code = response_code(text)?;
    let (name, rest) = code.split_once(' ')?;
    name.eq_ignore_ascii_case("CAPABILITY")
        .then(|| rest.split_whitespace().map(str::to_string).collect())
}

/// The value of a `[UIDVALIDITY n]` response code, if `text` starts with
/// one.
pub(crate) fn uid_validity_in(text: &str) -> Option<u32> {
    let code = response_code(text)?;
    let (name, value) = code.split_once(' ')?;
    if name.eq_ignore_ascii_case("UIDVALIDITY") {
        value.trim().parse().ok()
    } else {
        None
    }
}

fn response_code(text: &str) -> Option<&str> {
    let inner = text.strip_prefix('[')?;
    inner.find(']').map(|end| &inner[..end])
}

fn split_status(rest: &str) -> Option<(Status, String)> {
    let (word, text) = rest.split_once(' ').unwrap_or((rest, ""));
    Status::parse(word).map(|status| (status, text.trim().to_string()))
}

fn parse_number(word: &str, what: &str) -> Result<u32> {
    word.parse()
        .map_err(|_| Error::Protocol(format!("invalid {what}: {word}")))
}

fn parse_untagged(rest: &str, raw: &[u8]) -> Result<Untagged> {
    if let Some((status, text)) = split_status(rest) {
        return Ok(Untagged::Status { status, text });
    }

    let mut words = rest.split_whitespace();
    let first = words.next().unwrap_or_default();

    if first.eq_ignore_ascii_case("CAPABILITY") {
        return Ok(Untagged::Capability(words.map(str::to_string).collect()));
    }
    if first.eq_ignore_ascii_case("SEARCH") {
        let uids = words
            .map(|word| parse_number(word, "SEARCH result"))
            .collect::<Result<Vec<_>>>()?;
        return Ok(Untagged::Search(uids));
    }

    if let Ok(n) = first.parse::<u32>() {
        let kind = words.next().unwrap_or_default().to_ascii_uppercase();
        return match kind.as_str() {
            "EXISTS" => Ok(Untagged::Exists(n)),
            "RECENT" => Ok(Untagged::Recent(n)),
            "EXPUNGE" => Ok(Untagged::Expunge(n)),
            "FETCH" => parse_fetch(n, raw).map(Untagged::Fetch),
            _ => Ok(Untagged::Other(rest.to_string())),
        };
    }

    Ok(Untagged::Other(rest.to_string()))
}

fn parse_fetch(seq: u32, raw: &[u8]) -> Result<FetchData> {
    let Some(section_start) = find_ignore_case(raw, b"BODY[") else {
        return Ok(FetchData {
            seq,
            uid: find_uid(raw)?,
            body: None,
        });
    };

    let section_end = raw[section_start..]
        .iter()
        .position(|&b| b == b']')
        .map(|i| section_start + i + 1)
        .ok_or_else(|| Error::Protocol("unterminated BODY section".to_string()))?;

    // Skip a partial-fetch origin such as `<0>`.
    let mut pos = section_end;
    if raw.get(pos) == Some(&b'<') {
        pos += raw[pos..]
            .iter()
            .position(|&b| b == b'>')
            .map_or(raw.len() - pos, |i| i + 1);
    }
    if raw.get(pos) == Some(&b' ') {
        pos += 1;
    }

    let (body, value_end) = parse_nstring(raw, pos)?;

    let uid = match find_uid(&raw[..section_start])? {
        Some(uid) => Some(uid),
        None => find_uid(&raw[value_end..])?,
    };

    Ok(FetchData { seq, uid, body })
}

/// Reads an nstring (literal, quoted string or NIL) at `pos`.
///
/// Returns the value and the offset just past it.
fn parse_nstring(raw: &[u8], pos: usize) -> Result<(Option<Vec<u8>>, usize)> {
    match raw.get(pos) {
        Some(b'{') => {
            let close = raw[pos..]
                .iter()
                .position(|&b| b == b'}')
                .map(|i| pos + i)
                .ok_or_else(|| Error::Protocol("unterminated literal length".to_string()))?;
            let digits = std::str::from_utf8(&raw[pos + 1..close])
                .map_err(|_| Error::Protocol("invalid literal length".to_string()))?;
            let len: usize = digits
                .trim_end_matches('+')
                .parse()
                .map_err(|_| Error::Protocol(format!("invalid literal length: {digits}")))?;

            let start = close + 3;
            if raw.get(close + 1..start) != Some(b"\r\n") {
                return Err(Error::Protocol("literal length not followed by CRLF".to_string()));
            }
            let end = start + len;
            let literal = raw
                .get(start..end)
                .ok_or_else(|| Error::Protocol("literal shorter than announced".to_string()))?;
            Ok((Some(literal.to_vec()), end))
        }
        Some(b'"') => {
            let mut value = Vec::new();
            let mut i = pos + 1;
            while let Some(&b) = raw.get(i) {
                match b {
                    b'\\' => {
                        if let Some(&escaped) = raw.get(i + 1) {
                            value.push(escaped);
                        }
                        i += 2;
                    }
                    b'"' => return Ok((Some(value), i + 1)),
                    _ => {
                        value.push(b);
                        i += 1;
                    }
                }
            }
            Err(Error::Protocol("unterminated quoted string".to_string()))
        }
        _ if raw
            .get(pos..pos + 3)
            .is_some_and(|word| word.eq_ignore_ascii_case(b"NIL")) =>
        {
            Ok((None, pos + 3))
        }
        _ => Err(Error::Protocol("expected literal, string or NIL".to_string())),
    }
}

/// Finds a `UID n` item in a slice of a FETCH response.
fn find_uid(raw: &[u8]) -> Result<Option<u32>> {
    let mut from = 0;
    while let Some(found) = find_ignore_case(&raw[from..], b"UID ") {
        let at = from + found;
        let boundary = at == 0 || matches!(raw[at - 1], b'(' | b' ');
        if boundary {
            let digits: Vec<u8> = raw[at + 4..]
                .iter()
                .copied()
                .take_while(u8::is_ascii_digit)
                .collect();
            let word = String::from_utf8_lossy(&digits);
            return parse_number(&word, "UID").map(Some);
        }
        from = at + 4;
    }
    Ok(None)
}

fn find_ignore_case(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}
