//! Application state and the transitions between the three panels.
//!
//! Requests run on spawned tasks and report back as [`Completion`]s over a
//! channel. Every view transition bumps a generation counter; completions
//! tagged with an older generation are dropped so a slow response can't
//! repaint a view the user has already left.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;

use crate::api::{ApiError, MailApi};
use crate::compose::{ComposeContext, ComposeForm};
use crate::email::{Email, EmailUpdate, Mailbox, RowAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Mailbox,
    Detail,
    Compose,
}

/// A finished request, routed back to the run loop.
#[derive(Debug)]
pub enum Completion {
    MailboxLoaded {
        generation: u64,
        mailbox: Mailbox,
        result: Result<Vec<Email>, ApiError>,
    },
    EmailLoaded {
        generation: u64,
        id: u64,
        result: Result<Email, ApiError>,
    },
    MarkedRead {
        id: u64,
        result: Result<(), ApiError>,
    },
    ArchiveToggled {
        generation: u64,
        id: u64,
        action: RowAction,
        result: Result<(), ApiError>,
    },
    Sent {
        generation: u64,
        result: Result<(), ApiError>,
    },
}

/// One rendered mailbox row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub id: u64,
    pub from: String,
    pub subject: String,
    pub timestamp: String,
    pub unread: bool,
    pub action: Option<RowAction>,
}

#[derive(Debug)]
pub struct MailboxView {
    pub mailbox: Mailbox,
    pub emails: Vec<Email>,
    pub selected: usize,
    pub offset: usize,
    pub loading: bool,
}

impl MailboxView {
    fn new(mailbox: Mailbox) -> Self {
        Self {
            mailbox,
            emails: Vec::new(),
            selected: 0,
            offset: 0,
            loading: false,
        }
    }

    pub fn header(&self) -> String {
        self.mailbox.title()
    }

    /// Rows in server order.
    pub fn rows(&self, timestamp_format: &str) -> Vec<RowView> {
        let action = self.mailbox.row_action();
        self.emails
            .iter()
            .map(|e| RowView {
                id: e.id,
                from: format!("From: {}", e.sender),
                subject: format!("Subject: {}", e.subject),
                timestamp: format!("Timestamp: {}", e.timestamp_display(timestamp_format)),
                unread: e.is_unread(),
                action,
            })
            .collect()
    }

    pub fn unread_count(&self) -> usize {
        self.emails.iter().filter(|e| e.is_unread()).count()
    }

    fn selected_email(&self) -> Option<&Email> {
        self.emails.get(self.selected)
    }

    fn move_down(&mut self) {
        if self.selected + 1 < self.emails.len() {
            self.selected += 1;
        }
    }

    fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn jump_bottom(&mut self) {
        self.selected = self.emails.len().saturating_sub(1);
    }
}

#[derive(Debug)]
pub struct DetailView {
    pub origin: Mailbox,
    pub email: Option<Email>,
    pub scroll: u16,
    pub loading: bool,
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
    at: Instant,
}

pub struct Controller {
    api: Arc<dyn MailApi>,
    tx: UnboundedSender<Completion>,
    panel: Panel,
    generation: u64,
    mailbox: MailboxView,
    detail: DetailView,
    compose: ComposeForm,
    /// Mailbox to return to when compose is cancelled.
    last_mailbox: Mailbox,
    sending: bool,
    timestamp_format: String,
    status: Option<StatusMessage>,
}

impl Controller {
    pub fn new(
        api: Arc<dyn MailApi>,
        tx: UnboundedSender<Completion>,
        timestamp_format: impl Into<String>,
    ) -> Self {
        Self {
            api,
            tx,
            panel: Panel::Mailbox,
            generation: 0,
            mailbox: MailboxView::new(Mailbox::Inbox),
            detail: DetailView {
                origin: Mailbox::Inbox,
                email: None,
                scroll: 0,
                loading: false,
            },
            compose: ComposeForm::new(),
            last_mailbox: Mailbox::Inbox,
            sending: false,
            timestamp_format: timestamp_format.into(),
            status: None,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn panel(&self) -> Panel {
        self.panel
    }

    pub fn mailbox_view(&self) -> &MailboxView {
        &self.mailbox
    }

    pub fn mailbox_view_mut(&mut self) -> &mut MailboxView {
        &mut self.mailbox
    }

    pub fn detail_view(&self) -> &DetailView {
        &self.detail
    }

    pub fn compose_form(&self) -> &ComposeForm {
        &self.compose
    }

    pub fn compose_form_mut(&mut self) -> &mut ComposeForm {
        &mut self.compose
    }

    pub fn is_sending(&self) -> bool {
        self.sending
    }

    pub fn timestamp_format(&self) -> &str {
        &self.timestamp_format
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    // ── Panels ──────────────────────────────────────────────────────

    /// Make exactly one panel visible.
    pub fn show_panel(&mut self, panel: Panel) {
        self.panel = panel;
    }

    /// Switch panels and start a new view generation.
    fn begin_view(&mut self, panel: Panel) -> u64 {
        self.show_panel(panel);
        self.generation += 1;
        self.generation
    }

    fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    // ── Mailbox ─────────────────────────────────────────────────────

    pub fn load_mailbox(&mut self, mailbox: Mailbox) {
        let generation = self.begin_view(Panel::Mailbox);
        self.mailbox = MailboxView::new(mailbox);
        self.mailbox.loading = true;
        self.last_mailbox = mailbox;
        tracing::debug!("load_mailbox: {} (generation {})", mailbox, generation);

        let api = Arc::clone(&self.api);
        self.spawn(async move {
            Completion::MailboxLoaded {
                generation,
                mailbox,
                result: api.list_mailbox(mailbox).await,
            }
        });
    }

    pub fn move_down(&mut self) {
        match self.panel {
            Panel::Mailbox => self.mailbox.move_down(),
            Panel::Detail => self.detail.scroll = self.detail.scroll.saturating_add(1),
            Panel::Compose => {}
        }
    }

    pub fn move_up(&mut self) {
        match self.panel {
            Panel::Mailbox => self.mailbox.move_up(),
            Panel::Detail => self.detail.scroll = self.detail.scroll.saturating_sub(1),
            Panel::Compose => {}
        }
    }

    pub fn jump_top(&mut self) {
        match self.panel {
            Panel::Mailbox => self.mailbox.selected = 0,
            Panel::Detail => self.detail.scroll = 0,
            Panel::Compose => {}
        }
    }

    pub fn jump_bottom(&mut self) {
        if self.panel == Panel::Mailbox {
            self.mailbox.jump_bottom();
        }
    }

    pub fn scroll_detail(&mut self, delta: i32) {
        let scroll = i32::from(self.detail.scroll) + delta;
        self.detail.scroll = scroll.clamp(0, i32::from(u16::MAX)) as u16;
    }

    /// Open the selected row in the detail panel.
    pub fn open_selected(&mut self) {
        if self.panel != Panel::Mailbox {
            return;
        }
        if let Some(id) = self.mailbox.selected_email().map(|e| e.id) {
            let origin = self.mailbox.mailbox;
            self.view_email(id, origin);
        }
    }

    /// Run the selected row's Archive/Unarchive action. The row is not
    /// opened; the mailbox reloads once the update succeeds.
    pub fn toggle_archive_selected(&mut self) {
        if self.panel != Panel::Mailbox {
            return;
        }
        let Some(action) = self.mailbox.mailbox.row_action() else {
            return;
        };
        let Some(id) = self.mailbox.selected_email().map(|e| e.id) else {
            return;
        };
        let generation = self.generation;
        tracing::debug!("{} email {}", action.label(), id);

        let api = Arc::clone(&self.api);
        self.spawn(async move {
            let update = EmailUpdate::archived(action.archived());
            Completion::ArchiveToggled {
                generation,
                id,
                action,
                result: api.update_email(id, &update).await,
            }
        });
    }

    // ── Detail ──────────────────────────────────────────────────────

    pub fn view_email(&mut self, id: u64, origin: Mailbox) {
        let generation = self.begin_view(Panel::Detail);
        self.detail = DetailView {
            origin,
            email: None,
            scroll: 0,
            loading: true,
        };
        tracing::debug!("view_email: {} from {} (generation {})", id, origin, generation);

        let api = Arc::clone(&self.api);
        self.spawn(async move {
            Completion::EmailLoaded {
                generation,
                id,
                result: api.get_email(id).await,
            }
        });
    }

    /// "Back to Mailbox": reload the mailbox the message was opened from.
    pub fn back_to_mailbox(&mut self) {
        let origin = self.detail.origin;
        self.load_mailbox(origin);
    }

    /// "Reply": compose pre-filled from the open message.
    pub fn reply(&mut self) {
        if self.panel != Panel::Detail {
            return;
        }
        if let Some(email) = self.detail.email.clone() {
            self.compose_email(Some(&email));
        }
    }

    // ── Compose ─────────────────────────────────────────────────────

    pub fn compose_email(&mut self, source: Option<&Email>) {
        self.begin_view(Panel::Compose);
        let ctx = match source {
            Some(email) if !email.sender.is_empty() => {
                ComposeContext::reply(email, &self.timestamp_format)
            }
            _ => ComposeContext::new_message(),
        };
        self.compose.fill(&ctx);
    }

    pub fn cancel_compose(&mut self) {
        self.compose.clear();
        let mailbox = self.last_mailbox;
        self.load_mailbox(mailbox);
    }

    /// The one submit handler for the compose form.
    pub fn submit_compose(&mut self) {
        if self.panel != Panel::Compose {
            return;
        }
        if self.sending {
            tracing::debug!("submit ignored: send already in flight");
            return;
        }
        let outgoing = match self.compose.submission() {
            Ok(outgoing) => outgoing,
            Err(e) => {
                self.report_error(format!("Error: {}", e));
                return;
            }
        };

        self.sending = true;
        let generation = self.generation;
        tracing::debug!("sending to {:?}", outgoing.recipients);

        let api = Arc::clone(&self.api);
        self.spawn(async move {
            Completion::Sent {
                generation,
                result: api.send_email(&outgoing).await,
            }
        });
    }

    // ── Completions ─────────────────────────────────────────────────

    pub fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::MailboxLoaded {
                generation,
                mailbox,
                result,
            } => {
                if !self.is_current(generation) {
                    tracing::debug!("dropping stale {} listing (generation {})", mailbox, generation);
                    return;
                }
                self.mailbox.loading = false;
                match result {
                    Ok(emails) => {
                        tracing::debug!("{}: {} emails", mailbox, emails.len());
                        self.mailbox.emails = emails;
                        self.mailbox.selected = 0;
                        self.mailbox.offset = 0;
                    }
                    Err(e) => self.report_error(format!("Error loading {}: {}", mailbox, e)),
                }
            }

            Completion::EmailLoaded {
                generation,
                id,
                result,
            } => {
                if !self.is_current(generation) {
                    tracing::debug!("dropping stale email {} (generation {})", id, generation);
                    return;
                }
                self.detail.loading = false;
                match result {
                    Ok(email) => {
                        if !email.read {
                            self.mark_read(email.id);
                        }
                        self.detail.email = Some(email);
                    }
                    Err(e) => self.report_error(format!("Error loading email {}: {}", id, e)),
                }
            }

            Completion::MarkedRead { id, result } => match result {
                Ok(()) => tracing::info!("email {} marked as read", id),
                Err(e) => self.report_error(format!("Error marking email as read: {}", e)),
            },

            Completion::ArchiveToggled {
                generation,
                id,
                action,
                result,
            } => match result {
                Ok(()) => {
                    tracing::info!("email {}: {} succeeded", id, action.label());
                    if self.is_current(generation) {
                        self.load_mailbox(action.reload_target());
                    }
                }
                Err(e) => self.report_error(format!("Error: {} failed: {}", action.label(), e)),
            },

            Completion::Sent { generation, result } => {
                self.sending = false;
                match result {
                    Ok(()) => {
                        tracing::info!("email sent");
                        self.set_status("Email sent");
                        if self.is_current(generation) {
                            self.load_mailbox(Mailbox::Sent);
                        }
                    }
                    Err(e) => self.report_error(format!("Error sending email: {}", e)),
                }
            }
        }
    }

    /// Fire-and-forget `read = true`. The open view keeps the pre-update
    /// value; the list picks it up on its next load.
    fn mark_read(&mut self, id: u64) {
        let api = Arc::clone(&self.api);
        self.spawn(async move {
            Completion::MarkedRead {
                id,
                result: api.update_email(id, &EmailUpdate::mark_read()).await,
            }
        });
    }

    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let completion = fut.await;
            if tx.send(completion).is_err() {
                tracing::debug!("completion channel closed");
            }
        });
    }

    // ── Status ──────────────────────────────────────────────────────

    pub fn set_status(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error: false,
            at: Instant::now(),
        });
    }

    /// All failures funnel through here: logged, and shown in the status bar.
    pub fn report_error(&mut self, text: impl Into<String>) {
        let text = text.into();
        tracing::error!("{}", text);
        self.status = Some(StatusMessage {
            text,
            is_error: true,
            at: Instant::now(),
        });
    }

    pub fn clear_stale_status(&mut self, timeout: Duration) {
        if let Some(status) = &self.status {
            if status.at.elapsed() > timeout {
                self.status = None;
            }
        }
    }
}
