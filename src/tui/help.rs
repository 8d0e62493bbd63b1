use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn keybind(key: &'static str, pad: usize, action: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key, Style::default().fg(Color::Magenta)),
        Span::raw(" ".repeat(pad)),
        Span::raw(action),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Ctrl-C", Style::default().fg(Color::Magenta)),
            Span::raw("  Quit"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("+", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("↑", Style::default().fg(Color::Magenta)),
            Span::raw("       Increment"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("-", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("↓", Style::default().fg(Color::Magenta)),
            Span::raw("       Decrement"),
        ]),
        keybind("b", 11, "Change background"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("s", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("enter", Style::default().fg(Color::Magenta)),
            Span::raw("   Sort now (background)"),
        ]),
        keybind("tab", 9, "Switch tabs"),
        keybind("?", 11, "Show this help"),
        Line::from(""),
        Line::from("The counter and background keep responding while a sort runs;"),
        Line::from("the sort itself runs on its own execution unit."),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
