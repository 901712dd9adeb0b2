use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::controller::{Panel, StatusMessage};

pub struct TopBar<'a> {
    /// Mailbox header, or the panel name for detail/compose.
    pub title: &'a str,
    pub counts: Option<(usize, usize)>,
}

impl<'a> Widget for TopBar<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let style = Style::default().bg(Color::DarkGray).fg(Color::White);
        buf.set_style(area, style);

        let left = format!(" {} ", self.title);
        let right = match self.counts {
            Some((unread, total)) if unread > 0 => format!(" {}/{} unread ", unread, total),
            Some((_, total)) => format!(" {} messages ", total),
            None => String::new(),
        };

        let left_spans = Line::from(vec![Span::styled(
            &left,
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )]);
        buf.set_line(area.x, area.y, &left_spans, area.width);

        let right_len = right.len() as u16;
        if area.width > right_len + left.len() as u16 {
            let rx = area.x + area.width - right_len;
            buf.set_string(rx, area.y, &right, style);
        }
    }
}

pub struct BottomBar<'a> {
    pub panel: Panel,
    pub pending_key: Option<&'a str>,
    pub status: Option<&'a StatusMessage>,
}

impl<'a> BottomBar<'a> {
    pub fn hints(panel: Panel) -> &'static str {
        match panel {
            Panel::Mailbox => {
                "j/k move · Enter open · e archive/unarchive · c compose · gi/gs/ga mailboxes · q quit"
            }
            Panel::Detail => "r reply · b back to mailbox · Space scroll · c compose · q quit",
            Panel::Compose => "Ctrl+S send · Tab/Shift+Tab field · Esc cancel · Ctrl+C quit",
        }
    }
}

impl<'a> Widget for BottomBar<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let style = Style::default().bg(Color::DarkGray).fg(Color::White);
        buf.set_style(area, style);

        if let Some(status) = self.status {
            let status_style = if status.is_error {
                style.fg(Color::LightRed).add_modifier(Modifier::BOLD)
            } else {
                style.fg(Color::LightGreen)
            };
            buf.set_string(area.x, area.y, format!(" {}", status.text), status_style);
            return;
        }

        let hints = Self::hints(self.panel);
        let text = match self.pending_key {
            Some(pending) => format!(" {}… | {}", pending, hints),
            None => format!(" {}", hints),
        };
        buf.set_string(area.x, area.y, &text, style);
    }
}
