use crate::app::{App, Overlay, SETTINGS_ITEMS, Session};
use crate::config::{APP_NAME, APP_VERSION};
use crate::model::{DEFAULT_THEME_COLOR, format_duration_ms};
use crate::player::WidgetStatus;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use std::time::Duration;

#[derive(Clone, Copy)]
struct ThemePalette {
    bg: Color,
    panel_bg: Color,
    border: Color,
    text: Color,
    muted: Color,
    accent: Color,
    selected_bg: Color,
    highlight: Color,
}

fn palette(accent: &str) -> ThemePalette {
    ThemePalette {
        bg: Color::Rgb(26, 26, 26),
        panel_bg: Color::Rgb(37, 37, 37),
        border: Color::Rgb(51, 51, 51),
        text: Color::Rgb(224, 214, 204),
        muted: Color::Rgb(160, 154, 146),
        accent: parse_hex_color(accent)
            .or_else(|| parse_hex_color(DEFAULT_THEME_COLOR))
            .unwrap_or(Color::Yellow),
        selected_bg: Color::Rgb(42, 42, 74),
        highlight: Color::Rgb(54, 109, 171),
    }
}

pub fn parse_hex_color(value: &str) -> Option<Color> {
    let hex = value.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    Some(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

pub fn draw(frame: &mut Frame, app: &App) {
    let accent = match &app.session {
        Some(session) => session.player.playlist.color.as_str(),
        None => DEFAULT_THEME_COLOR,
    };
    let colors = palette(accent);
    frame.render_widget(
        Block::default().style(Style::default().bg(colors.bg)),
        frame.area(),
    );

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
        ])
        .split(frame.area());

    draw_header(frame, app, vertical[0], &colors);
    match &app.session {
        Some(session) => draw_player(frame, session, vertical[1], &colors),
        None => draw_selector(frame, app, vertical[1], &colors),
    }
    draw_footer(frame, app, vertical[2], &colors);

    match app.overlay {
        Overlay::None => {}
        Overlay::TrackList { selected } => {
            if let Some(session) = &app.session {
                draw_track_list(frame, session, selected, &colors);
            }
        }
        Overlay::Settings { selected } => draw_settings(frame, app, selected, &colors),
        Overlay::About => draw_about(frame, &colors),
    }
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect, colors: &ThemePalette) {
    frame.render_widget(
        panel_block(APP_NAME, colors.panel_bg, colors.text, colors.border),
        area,
    );
    let inner = area.inner(Margin {
        vertical: 1,
        horizontal: 2,
    });
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(inner);

    let left = Paragraph::new(Line::from(vec![
        Span::styled(
            "KI KUNST",
            Style::default()
                .fg(colors.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("  ", Style::default()),
        Span::styled("Klanginsel", Style::default().fg(colors.muted)),
    ]));
    frame.render_widget(left, halves[0]);

    let (shuffle_label, shuffle_color) = if app.shuffle_enabled {
        ("Shuffle on", colors.accent)
    } else {
        ("Shuffle off", colors.muted)
    };
    let right = Paragraph::new(Line::from(vec![
        Span::styled(shuffle_label, Style::default().fg(shuffle_color)),
        Span::styled("  o settings", Style::default().fg(colors.muted)),
    ]))
    .alignment(Alignment::Right);
    frame.render_widget(right, halves[1]);
}

fn draw_selector(frame: &mut Frame, app: &App, area: Rect, colors: &ThemePalette) {
    let items: Vec<ListItem> = app
        .settings
        .playlists
        .iter()
        .map(|playlist| {
            let color = parse_hex_color(&playlist.color).unwrap_or(colors.accent);
            ListItem::new(Line::from(vec![
                Span::styled("  ♪ ", Style::default().fg(color)),
                Span::styled(
                    format!("{} Vibes", playlist.name),
                    Style::default().fg(colors.text),
                ),
            ]))
        })
        .collect();

    let mut state = ListState::default();
    state.select(
        (!app.settings.playlists.is_empty())
            .then_some(app.selected_playlist.min(app.settings.playlists.len() - 1)),
    );

    let list = List::new(items)
        .block(panel_block(
            "Choose your sound journey",
            colors.panel_bg,
            colors.text,
            colors.border,
        ))
        .highlight_style(
            Style::default()
                .bg(colors.selected_bg)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("-> ");
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_player(frame: &mut Frame, session: &Session, area: Rect, colors: &ThemePalette) {
    let player = &session.player;
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(6),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(area);

    let total = player.tracks().len();
    let position = if total == 0 {
        String::from("Track -")
    } else {
        format!("Track {} of {total}", player.current_track + 1)
    };
    let (state_label, state_color) = match player.widget_status {
        WidgetStatus::Loading => ("Loading...", colors.muted),
        WidgetStatus::Unavailable => ("Player unavailable", colors.highlight),
        WidgetStatus::Ready if player.playing => ("Playing", colors.accent),
        WidgetStatus::Ready => ("Paused", colors.muted),
    };
    let artist = player
        .current()
        .map(|track| track.artist.clone())
        .unwrap_or_else(|| player.playlist.fallback_artist());

    let info = vec![
        Line::from(Span::styled(
            format!("♪ {} Vibes", player.playlist.name),
            Style::default()
                .fg(colors.accent)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(position, Style::default().fg(colors.muted))),
        Line::from(""),
        Line::from(vec![
            Span::styled(
                "Now Playing",
                Style::default()
                    .fg(colors.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  {}", player.title),
                Style::default().fg(colors.text),
            ),
        ]),
        Line::from(Span::styled(
            format!("Artist  {artist}"),
            Style::default().fg(colors.muted),
        )),
        Line::from(Span::styled(
            format!("● {state_label}"),
            Style::default().fg(state_color),
        )),
    ];
    frame.render_widget(
        Paragraph::new(info)
            .block(panel_block(
                &player.playlist.name,
                colors.panel_bg,
                colors.text,
                colors.border,
            ))
            .wrap(Wrap { trim: true }),
        rows[0],
    );

    let elapsed = session
        .widget
        .position()
        .unwrap_or(Duration::from_millis(player.position_ms));
    frame.render_widget(
        Paragraph::new(Span::styled(
            timeline_line(elapsed, session.widget.duration(), 30),
            Style::default().fg(colors.text),
        ))
        .block(panel_block(
            "Timeline",
            colors.panel_bg,
            colors.text,
            colors.border,
        )),
        rows[1],
    );

    let control_color = if player.is_ready() {
        colors.text
    } else {
        colors.border
    };
    let toggle = if player.playing { "⏸" } else { "▶" };
    let controls = Paragraph::new(Line::from(vec![
        Span::styled("p ⏮    ", Style::default().fg(control_color)),
        Span::styled(
            format!("space {toggle}"),
            Style::default()
                .fg(control_color)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("    n ⏭", Style::default().fg(control_color)),
    ]))
    .alignment(Alignment::Center)
    .block(panel_block(
        "Controls",
        colors.panel_bg,
        colors.text,
        colors.border,
    ));
    frame.render_widget(controls, rows[2]);
}

fn draw_footer(frame: &mut Frame, app: &App, area: Rect, colors: &ThemePalette) {
    let keys = if app.session.is_some() {
        "Keys: space play/pause, n next, p previous, l tracks, s shuffle, Esc back, q quit"
    } else {
        "Keys: Up/Down choose, Enter open, s shuffle, o settings, q quit"
    };
    let footer = Paragraph::new(Line::from(vec![
        Span::styled(keys, Style::default().fg(colors.muted)),
        Span::styled("  |  ", Style::default().fg(colors.muted)),
        Span::styled(app.status_line(), Style::default().fg(colors.text)),
    ]))
    .block(panel_block(
        "Message",
        colors.panel_bg,
        colors.text,
        colors.border,
    ));
    frame.render_widget(footer, area);
}

fn draw_track_list(frame: &mut Frame, session: &Session, selected: usize, colors: &ThemePalette) {
    let player = &session.player;
    let popup = centered_rect(frame.area(), 70, 70);
    frame.render_widget(Clear, popup);
    let title = format!("{} Tracks", player.playlist.name);

    if player.tracks().is_empty() {
        frame.render_widget(
            Paragraph::new(Span::styled(
                "Loading tracks...",
                Style::default().fg(colors.muted),
            ))
            .block(panel_block(&title, colors.panel_bg, colors.text, colors.border)),
            popup,
        );
        return;
    }

    let items: Vec<ListItem> = player
        .tracks()
        .iter()
        .enumerate()
        .map(|(idx, track)| {
            let marker = if idx == player.current_track && player.playing {
                String::from("  ▶ ")
            } else {
                format!("{:>3} ", track.position)
            };
            let title_style = if idx == player.current_track {
                Style::default().fg(colors.accent)
            } else {
                Style::default().fg(colors.text)
            };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(colors.muted)),
                Span::styled(track.title.as_str(), title_style),
                Span::styled(
                    format!("  {} • {}", track.artist, track.formatted_duration()),
                    Style::default().fg(colors.muted),
                ),
            ]))
        })
        .collect();

    let mut state = ListState::default();
    state.select(Some(selected.min(player.tracks().len() - 1)));
    let list = List::new(items)
        .block(panel_block(&title, colors.panel_bg, colors.text, colors.border))
        .highlight_style(
            Style::default()
                .bg(colors.selected_bg)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("-> ");
    frame.render_stateful_widget(list, popup, &mut state);
}

fn draw_settings(frame: &mut Frame, app: &App, selected: usize, colors: &ThemePalette) {
    let popup = centered_rect(frame.area(), 50, 30);
    frame.render_widget(Clear, popup);

    let items: Vec<ListItem> = SETTINGS_ITEMS
        .iter()
        .enumerate()
        .map(|(idx, label)| {
            let suffix = match (idx, app.shuffle_enabled) {
                (0, true) => "  [on]",
                (0, false) => "  [off]",
                _ => "",
            };
            ListItem::new(Span::styled(
                format!("{label}{suffix}"),
                Style::default().fg(colors.text),
            ))
        })
        .collect();

    let mut state = ListState::default();
    state.select(Some(selected.min(SETTINGS_ITEMS.len() - 1)));
    let list = List::new(items)
        .block(panel_block(
            "Settings",
            colors.panel_bg,
            colors.text,
            colors.border,
        ))
        .highlight_style(
            Style::default()
                .bg(colors.highlight)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, popup, &mut state);
}

fn draw_about(frame: &mut Frame, colors: &ThemePalette) {
    let popup = centered_rect(frame.area(), 50, 50);
    frame.render_widget(Clear, popup);
    let lines = vec![
        Line::from(Span::styled(
            APP_NAME,
            Style::default()
                .fg(colors.accent)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("Version {APP_VERSION}"),
            Style::default().fg(colors.muted),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "App erstellt von KI-Kunst",
            Style::default().fg(colors.text),
        )),
        Line::from(Span::styled(
            "Stephan Herzhauser",
            Style::default().fg(colors.text),
        )),
        Line::from(Span::styled(
            "Stand: Juli 2025",
            Style::default().fg(colors.muted),
        )),
        Line::from(""),
        Line::from(Span::styled("Enter OK", Style::default().fg(colors.accent))),
    ];
    frame.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(panel_block("About", colors.panel_bg, colors.text, colors.border)),
        popup,
    );
}

fn panel_block(title: &str, bg: Color, text: Color, border: Color) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(text).add_modifier(Modifier::BOLD),
        ))
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(bg))
}

fn centered_rect(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}

fn progress_bar(ratio: Option<f64>, width: usize) -> String {
    let clamped = ratio.unwrap_or(0.0).clamp(0.0, 1.0);
    let filled = (clamped * width as f64).round() as usize;
    let mut bar = String::with_capacity(width + 2);
    bar.push('[');
    bar.push_str(&"#".repeat(filled));
    bar.push_str(&"-".repeat(width.saturating_sub(filled)));
    bar.push(']');
    bar
}

fn timeline_line(elapsed: Duration, total: Option<Duration>, width: usize) -> String {
    let ratio = total.and_then(|duration| {
        let total_secs = duration.as_secs_f64();
        (total_secs > 0.0).then_some(elapsed.as_secs_f64() / total_secs)
    });
    format!(
        "{} / {} {}",
        format_duration_ms(elapsed.as_millis() as u64),
        total
            .map(|duration| format_duration_ms(duration.as_millis() as u64))
            .unwrap_or_else(|| String::from("0:00")),
        progress_bar(ratio, width),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors_parse() {
        assert_eq!(parse_hex_color("#d4a076"), Some(Color::Rgb(212, 160, 118)));
        assert_eq!(parse_hex_color("d4a076"), None);
        assert_eq!(parse_hex_color("#zzzzzz"), None);
        assert_eq!(parse_hex_color("#fff"), None);
    }

    #[test]
    fn timeline_shows_elapsed_and_total() {
        let line = timeline_line(Duration::from_secs(65), Some(Duration::from_secs(130)), 10);
        assert_eq!(line, "1:05 / 2:10 [#####-----]");
        assert_eq!(timeline_line(Duration::ZERO, None, 4), "0:00 / 0:00 [----]");
    }
}
