use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use crate::email::Email;

pub struct DetailPane<'a> {
    pub email: Option<&'a Email>,
    pub timestamp_format: &'a str,
    pub scroll: u16,
    pub loading: bool,
}

impl<'a> Widget for DetailPane<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let email = match self.email {
            Some(e) => e,
            None => {
                let (text, style) = if self.loading {
                    ("Loading…", Style::default().fg(Color::DarkGray))
                } else {
                    (
                        "Could not load this email. [b] Back to Mailbox",
                        Style::default().fg(Color::LightRed),
                    )
                };
                buf.set_string(area.x + 2, area.y + area.height / 2, text, style);
                return;
            }
        };

        let header_style = Style::default().fg(Color::DarkGray);
        let value_style = Style::default().fg(Color::White);
        let subject_style = Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD);

        let mut lines = vec![
            Line::from(vec![
                Span::styled("From:      ", header_style),
                Span::styled(email.sender.as_str(), value_style),
            ]),
            Line::from(vec![
                Span::styled("To:        ", header_style),
                Span::styled(email.recipients_display(), value_style),
            ]),
            Line::from(vec![
                Span::styled("Subject:   ", header_style),
                Span::styled(email.subject.as_str(), subject_style),
            ]),
            Line::from(vec![
                Span::styled("Timestamp: ", header_style),
                Span::styled(email.timestamp_display(self.timestamp_format), value_style),
            ]),
            Line::from(""),
        ];

        for line in email.body.lines() {
            // Quoted reply text is dimmed.
            let attribution = line.starts_with("On ") && line.ends_with(" wrote:");
            let quoted = line.starts_with('>') || attribution;
            let style = if quoted {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().fg(Color::White)
            };
            lines.push(Line::from(Span::styled(line.to_string(), style)));
        }

        lines.push(Line::from(""));
        let key_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
        lines.push(Line::from(vec![
            Span::styled("[r]", key_style),
            Span::raw(" Reply   "),
            Span::styled("[b]", key_style),
            Span::raw(" Back to Mailbox"),
        ]));

        let block = Block::default()
            .borders(Borders::TOP)
            .border_style(Style::default().fg(Color::DarkGray));

        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((self.scroll, 0))
            .render(area, buf);
    }
}
