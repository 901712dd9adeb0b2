pub mod compose_view;
pub mod detail_view;
pub mod mailbox_list;
pub mod status_bar;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{Event, EventStream, KeyEvent, KeyEventKind},
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use futures::StreamExt;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;

use crate::api::MailApi;
use crate::config::Config;
use crate::controller::{Completion, Controller, Panel};
use crate::email::Mailbox;
use crate::keymap::{Action, InputMode, KeyMapper};

use self::compose_view::ComposeView;
use self::detail_view::DetailPane;
use self::mailbox_list::MailboxList;
use self::status_bar::{BottomBar, TopBar};

pub struct App {
    pub controller: Controller,
    pub keymap: KeyMapper,
    pub should_quit: bool,
    status_timeout: Duration,
}

impl App {
    pub fn new(api: Arc<dyn MailApi>, config: &Config, tx: UnboundedSender<Completion>) -> Self {
        Self {
            controller: Controller::new(api, tx, config.display.timestamp_format.clone()),
            keymap: KeyMapper::new(),
            should_quit: false,
            status_timeout: Duration::from_secs(config.display.status_timeout_secs),
        }
    }

    fn mode(&self) -> InputMode {
        self.controller.panel().into()
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        let action = self.keymap.handle(key, self.mode());
        self.handle_action(action);
    }

    // ── Action dispatch ─────────────────────────────────────────────

    pub fn handle_action(&mut self, action: Action) {
        let c = &mut self.controller;
        match action {
            Action::MoveDown => c.move_down(),
            Action::MoveUp => c.move_up(),
            Action::JumpTop => c.jump_top(),
            Action::JumpBottom => c.jump_bottom(),
            Action::ScrollDown => c.scroll_detail(5),
            Action::ScrollUp => c.scroll_detail(-5),

            Action::OpenEmail => c.open_selected(),
            Action::ToggleArchive => c.toggle_archive_selected(),

            Action::GoInbox => c.load_mailbox(Mailbox::Inbox),
            Action::GoSent => c.load_mailbox(Mailbox::Sent),
            Action::GoArchive => c.load_mailbox(Mailbox::Archive),

            Action::Reply => c.reply(),
            Action::Back => c.back_to_mailbox(),

            Action::Compose => c.compose_email(None),
            Action::NextField => c.compose_form_mut().focus_next(),
            Action::PrevField => c.compose_form_mut().focus_prev(),
            Action::Submit => c.submit_compose(),
            Action::Cancel => c.cancel_compose(),
            Action::Input(key) => c.compose_form_mut().input(key),

            Action::Quit => self.should_quit = true,
            Action::Noop => {}
        }
    }
}

fn draw(frame: &mut Frame, app: &mut App) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let c = &app.controller;
    let panel = c.panel();

    let title = match panel {
        Panel::Mailbox => c.mailbox_view().header(),
        Panel::Detail => c
            .detail_view()
            .email
            .as_ref()
            .map(|e| {
                if e.archived {
                    format!("{} (archived)", e.subject)
                } else {
                    e.subject.clone()
                }
            })
            .unwrap_or_else(|| "Email".to_string()),
        Panel::Compose => "New Email".to_string(),
    };
    let counts = (panel == Panel::Mailbox).then(|| {
        let view = c.mailbox_view();
        (view.unread_count(), view.emails.len())
    });
    frame.render_widget(
        TopBar {
            title: &title,
            counts,
        },
        outer[0],
    );

    match panel {
        Panel::Mailbox => {
            let view = c.mailbox_view();
            let rows = view.rows(c.timestamp_format());
            let (offset, _) = MailboxList::visible_range(
                view.selected,
                view.offset,
                outer[1].height as usize,
                rows.len(),
            );
            frame.render_widget(
                MailboxList {
                    rows: &rows,
                    selected: view.selected,
                    offset,
                    loading: view.loading,
                },
                outer[1],
            );
            app.controller.mailbox_view_mut().offset = offset;
        }
        Panel::Detail => {
            let view = c.detail_view();
            frame.render_widget(
                DetailPane {
                    email: view.email.as_ref(),
                    timestamp_format: c.timestamp_format(),
                    scroll: view.scroll,
                    loading: view.loading,
                },
                outer[1],
            );
        }
        Panel::Compose => {
            frame.render_widget(
                ComposeView {
                    form: c.compose_form(),
                    sending: c.is_sending(),
                },
                outer[1],
            );
        }
    }

    let c = &app.controller;
    frame.render_widget(
        BottomBar {
            panel: c.panel(),
            pending_key: app.keymap.pending_display(),
            status: c.status(),
        },
        outer[2],
    );
}

pub async fn run(api: Arc<dyn MailApi>, config: Config, initial: Mailbox) -> Result<()> {
    let (tx, completions) = mpsc::unbounded_channel();
    let mut app = App::new(api, &config, tx);
    app.controller.load_mailbox(initial);

    terminal::enable_raw_mode()?;
    io::stdout().execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = event_loop(&mut terminal, &mut app, completions).await;

    terminal::disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    mut completions: UnboundedReceiver<Completion>,
) -> Result<()> {
    let sequence_timeout = Duration::from_millis(1000);
    let mut last_key_time = Instant::now();
    let mut event_stream = EventStream::new();

    loop {
        app.controller.clear_stale_status(app.status_timeout);
        terminal.draw(|frame| draw(frame, app))?;

        if app.should_quit {
            break;
        }

        if app.keymap.has_pending() && last_key_time.elapsed() > sequence_timeout {
            app.keymap.cancel_pending();
        }

        let timeout = if app.keymap.has_pending() {
            sequence_timeout
        } else {
            Duration::from_millis(250)
        };

        tokio::select! {
            event = event_stream.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    last_key_time = Instant::now();
                    app.handle_key(key);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::error!("terminal event error: {}", e);
                    return Err(e.into());
                }
                None => break,
            },
            completion = completions.recv() => {
                if let Some(completion) = completion {
                    app.controller.apply(completion);
                }
            }
            _ = tokio::time::sleep(timeout) => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::tests::{email, Call, FakeApi};
    use crate::email::OutgoingEmail;
    use crossterm::event::{KeyCode, KeyModifiers};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn setup() -> (App, Arc<FakeApi>, UnboundedReceiver<Completion>) {
        let mut api = FakeApi::default();
        api.mailboxes
            .insert(Mailbox::Inbox, vec![email(1, "a@x.com", "Hi", true)]);
        api.emails.insert(1, email(1, "a@x.com", "Hi", true));
        let api = Arc::new(api);
        let (tx, rx) = mpsc::unbounded_channel();
        let app = App::new(api.clone(), &Config::default(), tx);
        (app, api, rx)
    }

    async fn step(app: &mut App, rx: &mut UnboundedReceiver<Completion>) {
        let completion = rx.recv().await.expect("completion");
        app.controller.apply(completion);
    }

    #[tokio::test]
    async fn keys_drive_compose_and_send() {
        let (mut app, api, mut rx) = setup();
        app.handle_key(key(KeyCode::Char('c')));
        assert_eq!(app.controller.panel(), Panel::Compose);

        for c in " bob@x.com ".chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
        app.handle_key(key(KeyCode::Tab));
        for c in "Hi".chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
        app.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));
        step(&mut app, &mut rx).await;

        assert_eq!(
            api.calls()[0],
            Call::Send(OutgoingEmail {
                recipients: "bob@x.com".to_string(),
                subject: "Hi".to_string(),
                body: String::new(),
            })
        );
        assert_eq!(app.controller.panel(), Panel::Mailbox);
        assert_eq!(app.controller.mailbox_view().mailbox, Mailbox::Sent);
    }

    #[tokio::test]
    async fn open_reply_and_back() {
        let (mut app, _api, mut rx) = setup();
        app.controller.load_mailbox(Mailbox::Inbox);
        step(&mut app, &mut rx).await;

        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.controller.panel(), Panel::Detail);
        step(&mut app, &mut rx).await;

        app.handle_key(key(KeyCode::Char('r')));
        assert_eq!(app.controller.panel(), Panel::Compose);
        assert_eq!(app.controller.compose_form().subject(), "Re: Hi");

        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.controller.panel(), Panel::Mailbox);
        assert_eq!(app.controller.mailbox_view().mailbox, Mailbox::Inbox);
    }

    #[tokio::test]
    async fn q_in_compose_is_text_not_quit() {
        let (mut app, _api, _rx) = setup();
        app.handle_key(key(KeyCode::Char('c')));
        app.handle_key(key(KeyCode::Char('q')));
        assert!(!app.should_quit);
        assert_eq!(app.controller.compose_form().recipients(), "q");
    }

    #[tokio::test]
    async fn q_quits_from_mailbox() {
        let (mut app, _api, _rx) = setup();
        app.handle_key(key(KeyCode::Char('q')));
        assert!(app.should_quit);
    }
}
