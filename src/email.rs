use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::str::FromStr;

/// Format the reference backend uses when serializing timestamps.
const SERVER_TIMESTAMP_FORMAT: &str = "%b %d %Y, %I:%M %p";

/// Default display format: a locale-style `month/day/year, time`.
pub const DEFAULT_DISPLAY_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mailbox {
    Inbox,
    Sent,
    Archive,
}

impl Mailbox {
    pub const ALL: [Mailbox; 3] = [Mailbox::Inbox, Mailbox::Sent, Mailbox::Archive];

    /// Path segment used by `GET /emails/{mailbox}`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mailbox::Inbox => "inbox",
            Mailbox::Sent => "sent",
            Mailbox::Archive => "archive",
        }
    }

    /// Header shown above the row list.
    pub fn title(&self) -> String {
        capitalize(self.as_str())
    }

    /// The per-row state action offered in this mailbox, if any.
    pub fn row_action(&self) -> Option<RowAction> {
        match self {
            Mailbox::Inbox => Some(RowAction::Archive),
            Mailbox::Archive => Some(RowAction::Unarchive),
            Mailbox::Sent => None,
        }
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mailbox {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inbox" => Ok(Mailbox::Inbox),
            "sent" => Ok(Mailbox::Sent),
            "archive" | "archived" => Ok(Mailbox::Archive),
            other => {
                let known: Vec<&str> = Mailbox::ALL.iter().map(Mailbox::as_str).collect();
                Err(format!(
                    "unknown mailbox {:?} (expected one of {})",
                    other,
                    known.join(", ")
                ))
            }
        }
    }
}

/// State toggle attached to a mailbox row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    Archive,
    Unarchive,
}

impl RowAction {
    pub fn label(&self) -> &'static str {
        match self {
            RowAction::Archive => "Archive",
            RowAction::Unarchive => "Unarchive",
        }
    }

    /// Value written to `archived` by this action.
    pub fn archived(&self) -> bool {
        matches!(self, RowAction::Archive)
    }

    /// Mailbox reloaded once the update succeeds.
    pub fn reload_target(&self) -> Mailbox {
        match self {
            RowAction::Archive => Mailbox::Inbox,
            RowAction::Unarchive => Mailbox::Archive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Email {
    pub id: u64,
    pub sender: String,
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub archived: bool,
}

impl Email {
    pub fn is_unread(&self) -> bool {
        !self.read
    }

    pub fn recipients_display(&self) -> String {
        self.recipients.join(", ")
    }

    pub fn timestamp_display(&self, format: &str) -> String {
        format_timestamp(&self.timestamp, format)
    }
}

/// Partial state mutation for `PUT /emails/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmailUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
}

impl EmailUpdate {
    pub fn mark_read() -> Self {
        Self {
            read: Some(true),
            ..Default::default()
        }
    }

    pub fn archived(archived: bool) -> Self {
        Self {
            archived: Some(archived),
            ..Default::default()
        }
    }
}

/// Body of `POST /emails`. Recipients travel as one comma-separated string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    pub recipients: String,
    pub subject: String,
    pub body: String,
}

/// Parse a server timestamp and render it in local time.
/// Unrecognised strings, and formats chrono refuses, come back unchanged.
pub fn format_timestamp(raw: &str, format: &str) -> String {
    let Some(dt) = parse_timestamp(raw) else {
        return raw.to_string();
    };
    let mut out = String::new();
    match write!(out, "{}", dt.format(format)) {
        Ok(()) => out,
        Err(_) => raw.to_string(),
    }
}

/// Whether chrono understands every specifier in `format`.
pub fn is_valid_display_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Local>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local));
    }
    let naive = NaiveDateTime::parse_from_str(raw, SERVER_TIMESTAMP_FORMAT).ok()?;
    Local.from_local_datetime(&naive).earliest()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mailbox_titles_are_capitalized() {
        assert_eq!(Mailbox::Inbox.title(), "Inbox");
        assert_eq!(Mailbox::Sent.title(), "Sent");
        assert_eq!(Mailbox::Archive.title(), "Archive");
    }

    #[test]
    fn mailbox_from_str() {
        assert_eq!("inbox".parse::<Mailbox>(), Ok(Mailbox::Inbox));
        assert_eq!(" Sent ".parse::<Mailbox>(), Ok(Mailbox::Sent));
        assert_eq!("archived".parse::<Mailbox>(), Ok(Mailbox::Archive));
        assert!("drafts".parse::<Mailbox>().is_err());
    }

    #[test]
    fn row_action_per_mailbox() {
        assert_eq!(Mailbox::Inbox.row_action(), Some(RowAction::Archive));
        assert_eq!(Mailbox::Archive.row_action(), Some(RowAction::Unarchive));
        assert_eq!(Mailbox::Sent.row_action(), None);
        assert_eq!(RowAction::Archive.reload_target(), Mailbox::Inbox);
        assert_eq!(RowAction::Unarchive.reload_target(), Mailbox::Archive);
    }

    #[test]
    fn email_deserializes_list_summary() {
        // List endpoints may leave out fields; they default.
        let json = r#"{"id":1,"sender":"a@x.com","subject":"Hi","read":false,
                       "timestamp":"2024-01-01T00:00:00Z"}"#;
        let email: Email = serde_json::from_str(json).unwrap();
        assert_eq!(email.id, 1);
        assert!(email.is_unread());
        assert!(email.recipients.is_empty());
        assert_eq!(email.body, "");
        assert!(!email.archived);
    }

    #[test]
    fn recipients_joined_with_comma() {
        let email = Email {
            id: 7,
            sender: "a@x.com".into(),
            recipients: vec!["b@x.com".into(), "c@x.com".into()],
            subject: String::new(),
            body: String::new(),
            timestamp: String::new(),
            read: true,
            archived: false,
        };
        assert_eq!(email.recipients_display(), "b@x.com, c@x.com");
    }

    #[test]
    fn update_serializes_only_present_fields() {
        let json = serde_json::to_string(&EmailUpdate::mark_read()).unwrap();
        assert_eq!(json, r#"{"read":true}"#);
        let json = serde_json::to_string(&EmailUpdate::archived(false)).unwrap();
        assert_eq!(json, r#"{"archived":false}"#);
    }

    #[test]
    fn timestamp_server_format_is_parsed() {
        let out = format_timestamp("Jan 01 2024, 12:00 AM", "%Y-%m-%d %H:%M");
        assert_eq!(out, "2024-01-01 00:00");
    }

    #[test]
    fn timestamp_rfc3339_is_parsed() {
        let out = format_timestamp("2024-01-01T00:00:00Z", "%Y");
        // Any timezone offset keeps the year within 2023..=2024.
        assert!(out == "2024" || out == "2023", "got {}", out);
    }

    #[test]
    fn bad_display_format_falls_back_to_raw() {
        assert!(!is_valid_display_format("%Q"));
        assert!(is_valid_display_format(DEFAULT_DISPLAY_FORMAT));
        let raw = "2024-01-01T00:00:00Z";
        assert_eq!(format_timestamp(raw, "%Q"), raw);
    }

    #[test]
    fn timestamp_unknown_is_verbatim() {
        assert_eq!(format_timestamp("yesterday-ish", "%Y"), "yesterday-ish");
    }
}
