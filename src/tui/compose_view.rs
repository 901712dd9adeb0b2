use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::Widget,
};

use crate::compose::{ComposeField, ComposeForm};

pub struct ComposeView<'a> {
    pub form: &'a ComposeForm,
    pub sending: bool,
}

impl<'a> Widget for ComposeView<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(area);

        self.form.field(ComposeField::Recipients).render(chunks[0], buf);
        self.form.field(ComposeField::Subject).render(chunks[1], buf);
        self.form.field(ComposeField::Body).render(chunks[2], buf);

        let (hint, style) = if self.sending {
            ("Sending…", Style::default().fg(Color::Yellow))
        } else {
            (
                "Ctrl+S send · Tab next field · Esc cancel",
                Style::default().fg(Color::DarkGray),
            )
        };
        buf.set_string(chunks[3].x + 1, chunks[3].y, hint, style);
    }
}
