use crossterm::event::{KeyCode, KeyEvent};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders};
use thiserror::Error;
use tui_textarea::TextArea;

use crate::email::{Email, OutgoingEmail};

const REPLY_PREFIX: &str = "Re: ";

/// What kind of composition are we doing?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeKind {
    NewMessage,
    Reply,
}

/// Initial contents of the compose form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeContext {
    pub kind: ComposeKind,
    pub recipients: String,
    pub subject: String,
    pub body: String,
}

impl ComposeContext {
    /// Build a blank new-message context.
    pub fn new_message() -> Self {
        Self {
            kind: ComposeKind::NewMessage,
            recipients: String::new(),
            subject: String::new(),
            body: String::new(),
        }
    }

    /// Build a reply context: address the original sender, prefix the
    /// subject once, and quote the original under an attribution line.
    pub fn reply(email: &Email, timestamp_format: &str) -> Self {
        Self {
            kind: ComposeKind::Reply,
            recipients: email.sender.clone(),
            subject: reply_subject(&email.subject),
            body: format!(
                "{}\n{}",
                attribution_line(email, timestamp_format),
                email.body
            ),
        }
    }
}

/// `"Re: " + subject`, unless the subject already carries the prefix.
pub fn reply_subject(subject: &str) -> String {
    if subject.starts_with(REPLY_PREFIX) {
        subject.to_string()
    } else {
        format!("{}{}", REPLY_PREFIX, subject)
    }
}

/// `On <timestamp>, <sender> wrote:`
pub fn attribution_line(email: &Email, timestamp_format: &str) -> String {
    format!(
        "On {}, {} wrote:",
        email.timestamp_display(timestamp_format),
        email.sender
    )
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ComposeError {
    #[error("please provide at least one recipient")]
    NoRecipients,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeField {
    Recipients,
    Subject,
    Body,
}

impl ComposeField {
    fn next(self) -> Self {
        match self {
            ComposeField::Recipients => ComposeField::Subject,
            ComposeField::Subject => ComposeField::Body,
            ComposeField::Body => ComposeField::Recipients,
        }
    }

    fn prev(self) -> Self {
        match self {
            ComposeField::Recipients => ComposeField::Body,
            ComposeField::Subject => ComposeField::Recipients,
            ComposeField::Body => ComposeField::Subject,
        }
    }

    fn title(self) -> &'static str {
        match self {
            ComposeField::Recipients => "To",
            ComposeField::Subject => "Subject",
            ComposeField::Body => "Body",
        }
    }

    fn single_line(self) -> bool {
        !matches!(self, ComposeField::Body)
    }
}

/// The three compose inputs plus which one has focus.
pub struct ComposeForm {
    recipients: TextArea<'static>,
    subject: TextArea<'static>,
    body: TextArea<'static>,
    focus: ComposeField,
}

impl Default for ComposeForm {
    fn default() -> Self {
        Self::new()
    }
}

impl ComposeForm {
    pub fn new() -> Self {
        let mut form = Self {
            recipients: TextArea::default(),
            subject: TextArea::default(),
            body: TextArea::default(),
            focus: ComposeField::Recipients,
        };
        form.fill(&ComposeContext::new_message());
        form
    }

    /// Replace every field with the context's values and focus the first
    /// field that still needs input.
    pub fn fill(&mut self, ctx: &ComposeContext) {
        self.recipients = text_area(&ctx.recipients);
        self.subject = text_area(&ctx.subject);
        self.body = text_area(&ctx.body);
        self.focus = match ctx.kind {
            ComposeKind::NewMessage => ComposeField::Recipients,
            ComposeKind::Reply => ComposeField::Body,
        };
        self.restyle();
    }

    pub fn clear(&mut self) {
        self.fill(&ComposeContext::new_message());
    }

    pub fn recipients(&self) -> String {
        self.recipients.lines().join("\n")
    }

    pub fn subject(&self) -> String {
        self.subject.lines().join("\n")
    }

    pub fn body(&self) -> String {
        self.body.lines().join("\n")
    }

    pub fn focus(&self) -> ComposeField {
        self.focus
    }

    pub fn focus_next(&mut self) {
        self.focus = self.focus.next();
        self.restyle();
    }

    pub fn focus_prev(&mut self) {
        self.focus = self.focus.prev();
        self.restyle();
    }

    pub fn field(&self, field: ComposeField) -> &TextArea<'static> {
        match field {
            ComposeField::Recipients => &self.recipients,
            ComposeField::Subject => &self.subject,
            ComposeField::Body => &self.body,
        }
    }

    fn focused_mut(&mut self) -> &mut TextArea<'static> {
        match self.focus {
            ComposeField::Recipients => &mut self.recipients,
            ComposeField::Subject => &mut self.subject,
            ComposeField::Body => &mut self.body,
        }
    }

    /// Feed a key into the focused field. Enter in a single-line field
    /// advances focus instead of inserting a newline.
    pub fn input(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Enter && self.focus.single_line() {
            self.focus_next();
            return;
        }
        self.focused_mut().input(key);
    }

    /// Validate the form and build the create request body.
    /// Recipients are trimmed; subject and body are sent verbatim.
    pub fn submission(&self) -> Result<OutgoingEmail, ComposeError> {
        let recipients = self.recipients().trim().to_string();
        if recipients.is_empty() {
            return Err(ComposeError::NoRecipients);
        }
        Ok(OutgoingEmail {
            recipients,
            subject: self.subject(),
            body: self.body(),
        })
    }

    fn restyle(&mut self) {
        let focus = self.focus;
        for field in [
            ComposeField::Recipients,
            ComposeField::Subject,
            ComposeField::Body,
        ] {
            let focused = field == focus;
            let border = if focused {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            let cursor = if focused {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            let ta = match field {
                ComposeField::Recipients => &mut self.recipients,
                ComposeField::Subject => &mut self.subject,
                ComposeField::Body => &mut self.body,
            };
            ta.set_block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border)
                    .title(field.title()),
            );
            ta.set_cursor_style(cursor);
            ta.set_cursor_line_style(Style::default());
        }
    }
}

fn text_area(content: &str) -> TextArea<'static> {
    let lines: Vec<String> = content.split('\n').map(str::to_string).collect();
    let mut ta = TextArea::new(lines);
    ta.move_cursor(tui_textarea::CursorMove::Bottom);
    ta.move_cursor(tui_textarea::CursorMove::End);
    ta
}
