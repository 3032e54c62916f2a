//! Directive extraction from LLM replies.
//!
//! The model answers in free text and, when it wants an action executed,
//! appends one bracketed directive on its own final line:
//!
//! ```text
//! [SALVAR_NOTA: "<content>"]
//! [AGENDAR_LEMBRETE: "<content>", "<YYYY-MM-DD HH:MM:SS>"]
//! [CONSULTAR_NOTAS: "TODAS"]
//! [DELETAR_NOTA_POR_ID: "<integer>"]
//! [CONVERSAR]
//! ```
//!
//! The first line of the reply is always relayed to the user verbatim; only
//! the last line is a directive candidate. Because the directive comes from
//! a non-deterministic model, parsing is defensive: anything malformed
//! becomes `Action::Invalid` carrying the offending text, so the user sees
//! the failure instead of believing an action succeeded.

use chrono::{DateTime, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use regex::Regex;
use std::sync::OnceLock;

/// No-op marker: the model signals "just conversation" explicitly, which
/// suppresses the unrecognized-directive diagnostic.
const CONVERSE_MARKER: &str = "[CONVERSAR]";

/// Timestamp format the model is instructed to emit, in the bot's local zone.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn directive_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\[(\w+): (.*)\]$").unwrap_or_else(|e| panic!("directive pattern: {e}"))
    })
}

/// What the parser found wrong with a directive. Every variant is surfaced
/// to the user; none is silently dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectiveError {
    #[error("could not understand directive: {0}")]
    Unrecognized(String),

    #[error("unknown directive keyword: {0}")]
    UnknownKeyword(String),

    #[error("the model tried to save an empty note")]
    EmptyContent,

    #[error("malformed reminder arguments: {0}")]
    MalformedArguments(String),

    #[error("invalid timestamp {raw:?}: {reason}")]
    InvalidTimestamp { raw: String, reason: String },

    #[error("invalid note id: {0}")]
    InvalidId(String),
}

/// Typed action extracted from one reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SaveNote { content: String },
    ScheduleReminder { content: String, fire_at: DateTime<Tz> },
    ListNotes,
    DeleteNote { id: i64 },
    /// No actionable directive, just conversation.
    Conversation,
    /// A directive was attempted but malformed; reported, never executed.
    Invalid(DirectiveError),
}

/// An LLM reply split into its user-facing text and its directive.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReply {
    /// First line of the reply, relayed to the user verbatim.
    pub natural_reply: String,
    pub action: Action,
}

/// Parses replies against the bracket grammar, resolving timestamps in one
/// fixed time zone.
pub struct DirectiveParser {
    tz: Tz,
}

impl DirectiveParser {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Split a full reply into natural text plus the action on its last line.
    pub fn parse_reply(&self, reply: &str) -> ParsedReply {
        let trimmed = reply.trim();
        let mut lines = trimmed.split('\n');

        let natural_reply = lines.next().unwrap_or_default().trim().to_string();
        // Consuming the first line first means a single-line reply yields no
        // candidate at all.
        let candidate = lines.next_back().map(str::trim);

        let action = match candidate {
            Some(line) if line.starts_with('[') && line.ends_with(']') => {
                self.parse_directive(line)
            }
            _ => Action::Conversation,
        };

        ParsedReply {
            natural_reply,
            action,
        }
    }

    /// Parse one bracketed line. The caller has already checked the brackets.
    fn parse_directive(&self, line: &str) -> Action {
        if line == CONVERSE_MARKER {
            return Action::Conversation;
        }

        let captures = match directive_pattern().captures(line) {
            Some(c) => c,
            None => return Action::Invalid(DirectiveError::Unrecognized(line.to_string())),
        };

        let keyword = &captures[1];
        let rest = &captures[2];

        match keyword {
            "SALVAR_NOTA" => {
                let content = unquote(rest);
                if content.is_empty() {
                    Action::Invalid(DirectiveError::EmptyContent)
                } else {
                    Action::SaveNote {
                        content: content.to_string(),
                    }
                }
            }

            "AGENDAR_LEMBRETE" => match self.parse_schedule_args(rest) {
                Ok((content, fire_at)) => Action::ScheduleReminder { content, fire_at },
                Err(e) => Action::Invalid(e),
            },

            // Only one query mode exists; the argument is not inspected.
            "CONSULTAR_NOTAS" => Action::ListNotes,

            "DELETAR_NOTA_POR_ID" => {
                let raw = unquote(rest);
                match raw.parse::<i64>() {
                    Ok(id) => Action::DeleteNote { id },
                    Err(_) => Action::Invalid(DirectiveError::InvalidId(raw.to_string())),
                }
            }

            other => Action::Invalid(DirectiveError::UnknownKeyword(other.to_string())),
        }
    }

    /// `"<content>", "<YYYY-MM-DD HH:MM:SS>"` → (content, zoned fire time).
    fn parse_schedule_args(&self, rest: &str) -> Result<(String, DateTime<Tz>), DirectiveError> {
        let (content_part, time_part) = rest
            .split_once("\", \"")
            .ok_or_else(|| DirectiveError::MalformedArguments(rest.to_string()))?;

        let content = unquote(content_part).to_string();
        if content.is_empty() {
            return Err(DirectiveError::EmptyContent);
        }

        let raw_time = unquote(time_part);
        let naive = NaiveDateTime::parse_from_str(raw_time, TIMESTAMP_FORMAT).map_err(|e| {
            DirectiveError::InvalidTimestamp {
                raw: raw_time.to_string(),
                reason: e.to_string(),
            }
        })?;

        match self.tz.from_local_datetime(&naive) {
            chrono::LocalResult::Single(dt) => Ok((content, dt)),
            // DST fold: two readings exist, take the earlier one.
            chrono::LocalResult::Ambiguous(earliest, _) => Ok((content, earliest)),
            chrono::LocalResult::None => Err(DirectiveError::InvalidTimestamp {
                raw: raw_time.to_string(),
                reason: format!("time does not exist in {}", self.tz),
            }),
        }
    }
}

fn unquote(raw: &str) -> &str {
    raw.trim().trim_matches('"')
}
