use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::Widget,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::controller::RowView;

/// Lines each row occupies: sender line + subject line.
pub const ROW_HEIGHT: usize = 2;

pub struct MailboxList<'a> {
    pub rows: &'a [RowView],
    pub selected: usize,
    pub offset: usize,
    pub loading: bool,
}

impl<'a> MailboxList<'a> {
    /// Calculate the visible range of rows for scrolling.
    pub fn visible_range(
        selected: usize,
        offset: usize,
        height: usize,
        total: usize,
    ) -> (usize, usize) {
        let capacity = (height / ROW_HEIGHT).max(1);
        let mut off = offset;
        if selected < off {
            off = selected;
        }
        if selected >= off + capacity {
            off = selected + 1 - capacity;
        }
        off = off.min(total.saturating_sub(capacity));
        let end = (off + capacity).min(total);
        (off, end)
    }
}

impl<'a> Widget for MailboxList<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        if self.rows.is_empty() {
            let text = if self.loading { "Loading…" } else { "No messages" };
            let style = Style::default().fg(Color::DarkGray);
            buf.set_string(area.x + 2, area.y + area.height / 2, text, style);
            return;
        }

        let (start, end) = Self::visible_range(
            self.selected,
            self.offset,
            area.height as usize,
            self.rows.len(),
        );
        let w = area.width as usize;

        for (i, row) in self.rows[start..end].iter().enumerate() {
            let y = area.y + (i * ROW_HEIGHT) as u16;
            if y >= area.y + area.height {
                break;
            }
            let is_selected = start + i == self.selected;

            // Unread rows are highlighted, read rows keep the plain background.
            let base_style = if is_selected {
                Style::default().bg(Color::Indexed(238)).fg(Color::White)
            } else if row.unread {
                Style::default().bg(Color::Indexed(235))
            } else {
                Style::default()
            };
            let lines = (ROW_HEIGHT as u16).min(area.y + area.height - y);
            buf.set_style(Rect::new(area.x, y, area.width, lines), base_style);

            let (indicator, ind_style) = if row.unread {
                ("> ", base_style.fg(Color::Cyan).add_modifier(Modifier::BOLD))
            } else {
                ("  ", base_style.fg(Color::DarkGray))
            };
            buf.set_string(area.x, y, indicator, ind_style);

            // Right-aligned action label on the sender line.
            let action = row
                .action
                .map(|a| format!("[{}]", a.label()))
                .unwrap_or_default();
            let action_width = action.width();
            let action_x = area.x + w.saturating_sub(action_width + 1) as u16;
            if !action.is_empty() && w > action_width + 4 {
                buf.set_string(action_x, y, &action, base_style.fg(Color::Blue));
            }

            let from_style = if row.unread {
                base_style.add_modifier(Modifier::BOLD)
            } else {
                base_style
            };
            let from_width = (action_x - area.x) as usize;
            let from_width = from_width.saturating_sub(3);
            buf.set_string(area.x + 2, y, truncate_str(&row.from, from_width), from_style);

            if lines < 2 {
                continue;
            }
            let y = y + 1;

            // Subject on the left, timestamp on the right.
            let ts_width = row.timestamp.width();
            let ts_x = if w > ts_width + 1 {
                area.x + (w - ts_width - 1) as u16
            } else {
                area.x + area.width - 1
            };
            buf.set_string(ts_x, y, &row.timestamp, base_style.fg(Color::DarkGray));

            let subject_width = (ts_x - area.x) as usize;
            let subject_width = subject_width.saturating_sub(3);
            let subj_style = if row.unread {
                base_style
            } else {
                base_style.fg(Color::Gray)
            };
            buf.set_string(
                area.x + 2,
                y,
                truncate_str(&row.subject, subject_width),
                subj_style,
            );
        }
    }
}

/// Truncate a string to fit within `max_width` columns, marking the cut with "~".
pub fn truncate_str(s: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    if s.width() <= max_width {
        return s.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let cw = c.width().unwrap_or(0);
        if used + cw + 1 > max_width {
            break;
        }
        out.push(c);
        used += cw;
    }
    out.push('~');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::RowAction;

    fn row(id: u64, unread: bool, action: Option<RowAction>) -> RowView {
        RowView {
            id,
            from: "From: a@x.com".to_string(),
            subject: "Subject: Hi".to_string(),
            timestamp: "Timestamp: 1/1/2024".to_string(),
            unread,
            action,
        }
    }

    fn buffer_lines(buf: &Buffer) -> Vec<String> {
        let area = buf.area;
        (0..area.height)
            .map(|y| {
                (0..area.width)
                    .map(|x| buf[(x, y)].symbol().to_string())
                    .collect::<String>()
            })
            .collect()
    }

    #[test]
    fn renders_unread_row_with_archive() {
        let rows = vec![row(1, true, Some(RowAction::Archive))];
        let area = Rect::new(0, 0, 60, 4);
        let mut buf = Buffer::empty(area);
        MailboxList {
            rows: &rows,
            selected: 5,
            offset: 0,
            loading: false,
        }
        .render(area, &mut buf);

        let lines = buffer_lines(&buf);
        assert!(lines[0].starts_with("> From: a@x.com"));
        assert!(lines[0].contains("[Archive]"));
        assert!(lines[1].contains("Subject: Hi"));
        assert!(lines[1].contains("Timestamp: 1/1/2024"));
        assert_eq!(buf[(0, 0)].bg, Color::Indexed(235));
    }

    #[test]
    fn read_row_has_no_indicator_or_action() {
        let rows = vec![row(1, false, None)];
        let area = Rect::new(0, 0, 60, 2);
        let mut buf = Buffer::empty(area);
        MailboxList {
            rows: &rows,
            selected: 5,
            offset: 0,
            loading: false,
        }
        .render(area, &mut buf);

        let lines = buffer_lines(&buf);
        assert!(lines[0].starts_with("  From: a@x.com"));
        assert!(!lines[0].contains('['));
        assert_eq!(buf[(0, 0)].bg, Color::Reset);
    }

    #[test]
    fn empty_list_shows_placeholder() {
        let area = Rect::new(0, 0, 30, 3);
        let mut buf = Buffer::empty(area);
        MailboxList {
            rows: &[],
            selected: 0,
            offset: 0,
            loading: true,
        }
        .render(area, &mut buf);
        assert!(buffer_lines(&buf)[1].contains("Loading"));
    }

    #[test]
    fn visible_range_follows_selection() {
        // 6 lines fit 3 rows.
        assert_eq!(MailboxList::visible_range(0, 0, 6, 10), (0, 3));
        assert_eq!(MailboxList::visible_range(4, 0, 6, 10), (2, 5));
        assert_eq!(MailboxList::visible_range(1, 3, 6, 10), (1, 4));
        assert_eq!(MailboxList::visible_range(9, 0, 6, 10), (7, 10));
    }

    #[test]
    fn truncate() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 6), "hello~");
        assert_eq!(truncate_str("hello", 0), "");
    }
}
