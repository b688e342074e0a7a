//! Global channel topology validation
//!
//! Every chat tenant lives under a global channel. Private namespaces are
//! derived from it by appending reserved suffixes:
//!
//! - `{global}#chat#public.*` / `{global}#chat#private.*`
//! - `{global}#user#{uuid}#read.*` / `{global}#user#{uuid}#write.*`
//! - `{global}#{uuid}#rooms`, `#system`, `#custom` (and their `-pnpres` twins)
//!
//! A global channel that contains one of those suffixes anywhere would let a
//! client request grants that land inside someone else's private namespace,
//! so such values are rejected before any grant is computed.

use std::fmt;
use thiserror::Error;

/// Valid characters for a uuid segment inside a reserved suffix
fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("global channel is missing or empty")]
    Missing,

    #[error("global channel '{channel}' collides with reserved pattern '{pattern}'")]
    Reserved {
        channel: String,
        pattern: ReservedPattern,
    },
}

/// One rule of the reserved suffix grammar.
///
/// A candidate matches when it contains `{lead}{id}{tail}` at any position,
/// where `id` is a (possibly empty) run of `[A-Za-z0-9_-]` and `lead` is
/// absent for the fixed `#chat#...` suffixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservedPattern {
    /// Text preceding the uuid segment, `None` for fixed suffixes
    lead: Option<&'static str>,
    /// Literal suffix after the uuid segment
    tail: &'static str,
}

impl ReservedPattern {
    const fn fixed(tail: &'static str) -> Self {
        Self { lead: None, tail }
    }

    const fn keyed(lead: &'static str, tail: &'static str) -> Self {
        Self {
            lead: Some(lead),
            tail,
        }
    }

    /// Check whether this pattern occurs anywhere in `candidate`
    pub fn matches(&self, candidate: &str) -> bool {
        let Some(lead) = self.lead else {
            return candidate.contains(self.tail);
        };

        candidate.match_indices(lead).any(|(at, _)| {
            candidate[at + lead.len()..]
                .trim_start_matches(is_id_char)
                .starts_with(self.tail)
        })
    }
}

impl fmt::Display for ReservedPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.lead {
            None => write!(f, "...{}", self.tail),
            Some(lead) => write!(f, "...{}<id>{}", lead, self.tail),
        }
    }
}

/// The reserved suffix grammar, one entry per private namespace shape.
pub const RESERVED_PATTERNS: &[ReservedPattern] = &[
    ReservedPattern::fixed("#chat#public"),
    ReservedPattern::fixed("#chat#private"),
    ReservedPattern::keyed("#user#", "#read"),
    ReservedPattern::keyed("#user#", "#write"),
    ReservedPattern::keyed("#", "#rooms"),
    ReservedPattern::keyed("#", "#rooms-pnpres"),
    ReservedPattern::keyed("#", "#system"),
    ReservedPattern::keyed("#", "#system-pnpres"),
    ReservedPattern::keyed("#", "#custom"),
    ReservedPattern::keyed("#", "#custom-pnpres"),
];

/// Find the first reserved pattern a candidate collides with
pub fn reserved_match(candidate: &str) -> Option<ReservedPattern> {
    RESERVED_PATTERNS.iter().copied().find(|p| p.matches(candidate))
}

/// Pure predicate: `true` if the value may be used as a global channel.
///
/// Missing and empty values are rejected, since every grant-bearing route
/// builds its channel list from the global channel.
pub fn validate(global: Option<&str>) -> bool {
    GlobalChannel::parse(global).is_ok()
}

/// A validated global channel
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GlobalChannel(String);

impl GlobalChannel {
    pub fn parse(global: Option<&str>) -> Result<Self, ChannelError> {
        let global = match global {
            Some(g) if !g.is_empty() => g,
            _ => return Err(ChannelError::Missing),
        };

        if let Some(pattern) = reserved_match(global) {
            return Err(ChannelError::Reserved {
                channel: global.to_string(),
                pattern,
            });
        }

        Ok(Self(global.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GlobalChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
