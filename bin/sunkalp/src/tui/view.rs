//! ---
//! ems_section: "12-gui-setup-wizard"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Rendering for the sign-in, connect, and dashboard views."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph, Wrap};
use ratatui::Frame;
use sunkalp_common::time::format_sync_time;
use sunkalp_core::TelemetryState;
use sunkalp_session::{KeyValueStore, SessionState};
use sunkalp_telemetry::{Metric, ReadingWindow};

use super::app::{App, Field, Tone};

pub fn draw<S: KeyValueStore>(frame: &mut Frame, app: &App<S>) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1), Constraint::Length(1)])
        .split(frame.size());

    let help = match app.state() {
        SessionState::SignedOut => {
            draw_sign_in(frame, app, layout[0]);
            "paste token + Enter sign in  Ctrl-U clear  Esc quit"
        }
        SessionState::SignedIn => {
            draw_connect(frame, app, layout[0]);
            "Tab switch field  Enter connect  Ctrl-O sign out  Esc quit"
        }
        SessionState::Connected => {
            draw_dashboard(frame, app, layout[0]);
            "d disconnect  o sign out  q quit"
        }
    };

    if let Some((tone, message)) = &app.status {
        let color = match tone {
            Tone::Info => Color::Green,
            Tone::Error => Color::Red,
        };
        frame.render_widget(
            Paragraph::new(message.as_str()).style(Style::default().fg(color)),
            layout[1],
        );
    }
    frame.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::Gray)),
        layout[2],
    );
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn draw_sign_in<S: KeyValueStore>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let area = centered(area, 72, 9);
    let shown = if app.token_input.is_empty() {
        Span::styled("(no token)", Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(elide(&app.token_input, 60))
    };
    let text = vec![
        Line::from(Span::styled(
            "Solar Microgrid Monitor",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Sign in with the ID token issued by your identity provider."),
        Line::from(""),
        Line::from(vec![Span::raw("Token: "), shown]),
    ];
    frame.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Sign in")),
        area,
    );
}

fn draw_connect<S: KeyValueStore>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let area = centered(area, 64, 11);
    let user = app
        .monitor
        .dashboard()
        .identity()
        .map(|claims| claims.display_name().to_owned())
        .unwrap_or_default();
    let focus_style = |field: Field| {
        if app.form.focus == field {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        }
    };
    let masked: String = "•".repeat(app.form.api_key.chars().count());
    let text = vec![
        Line::from(format!("Signed in as {user}")),
        Line::from(""),
        Line::from("Connect to a telemetry channel."),
        Line::from(""),
        Line::from(vec![
            Span::styled("Channel ID:    ", focus_style(Field::Channel)),
            Span::raw(app.form.channel.as_str()),
        ]),
        Line::from(vec![
            Span::styled("Read API Key:  ", focus_style(Field::ApiKey)),
            Span::raw(masked),
        ]),
    ];
    frame.render_widget(
        Paragraph::new(text).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Connect Hardware"),
        ),
        area,
    );
}

fn draw_dashboard<S: KeyValueStore>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let dashboard = app.monitor.dashboard();
    let telemetry = dashboard.telemetry();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(if telemetry.alerts.is_empty() { 0 } else { 3 }),
            Constraint::Length(4),
            Constraint::Min(0),
        ])
        .split(area);

    let user = dashboard
        .identity()
        .map(|claims| claims.display_name().to_owned())
        .unwrap_or_default();
    let channel = dashboard
        .credentials()
        .map(|c| c.channel_id().to_owned())
        .unwrap_or_default();
    let synced = telemetry
        .last_update
        .as_ref()
        .map(|at| format!("Last synced {}", format_sync_time(at)))
        .unwrap_or_else(|| "Waiting for first sync".to_owned());
    let header = Line::from(vec![
        Span::styled("Sunkalp", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!("  channel {channel}  {user}  ")),
        Span::styled(synced, Style::default().fg(Color::Cyan)),
    ]);
    frame.render_widget(Paragraph::new(header), rows[0]);

    if !telemetry.alerts.is_empty() {
        let alerts: Vec<Span> = telemetry
            .alerts
            .iter()
            .map(|alert| Span::raw(format!("⚠ {alert}   ")))
            .collect();
        frame.render_widget(
            Paragraph::new(Line::from(alerts))
                .style(Style::default().fg(Color::White).bg(Color::Red))
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::ALL).title("Alerts")),
            rows[1],
        );
    }

    draw_stat_cards(frame, telemetry, rows[2]);

    let chart_rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[3]);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 3); 3])
        .split(chart_rows[0]);
    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 2); 2])
        .split(chart_rows[1]);
    let slots = top.iter().chain(bottom.iter());
    for (metric, slot) in Metric::ALL.into_iter().zip(slots) {
        draw_chart(frame, &telemetry.window, metric, *slot);
    }
}

fn draw_stat_cards(frame: &mut Frame, telemetry: &TelemetryState, area: Rect) {
    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 5); 5])
        .split(area);
    let latest = telemetry.window.latest();
    for (metric, card) in Metric::ALL.into_iter().zip(cards.iter()) {
        let value = latest
            .map(|reading| format!("{} {}", metric.format_value(reading.value(metric)), metric.unit()))
            .unwrap_or_else(|| "--".to_owned());
        frame.render_widget(
            Paragraph::new(Span::styled(
                value,
                Style::default().fg(metric_color(metric)).add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(metric.label())),
            *card,
        );
    }
}

fn draw_chart(frame: &mut Frame, window: &ReadingWindow, metric: Metric, area: Rect) {
    let points = window.series(metric);
    let (low, high) = window.bounds(metric).unwrap_or((0.0, 1.0));
    let pad = ((high - low) * 0.1).max(1.0);
    let y_bounds = [low - pad, high + pad];
    let x_max = (points.len().saturating_sub(1)).max(1) as f64;

    let readings = window.readings();
    let x_labels = match (readings.first(), readings.last()) {
        (Some(first), Some(last)) => vec![Span::raw(first.time.clone()), Span::raw(last.time.clone())],
        _ => vec![Span::raw("--:--")],
    };
    let y_labels = vec![
        Span::raw(format!("{:.0}", y_bounds[0])),
        Span::raw(format!("{:.0}", y_bounds[1])),
    ];

    let dataset = Dataset::default()
        .name(metric.unit())
        .marker(Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(metric_color(metric)))
        .data(&points);
    let chart = Chart::new(vec![dataset])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(metric.chart_title()),
        )
        .x_axis(
            Axis::default()
                .bounds([0.0, x_max])
                .labels(x_labels)
                .style(Style::default().fg(Color::Gray)),
        )
        .y_axis(
            Axis::default()
                .bounds(y_bounds)
                .labels(y_labels)
                .style(Style::default().fg(Color::Gray)),
        );
    frame.render_widget(chart, area);
}

fn metric_color(metric: Metric) -> Color {
    match metric {
        Metric::Voltage => Color::Yellow,
        Metric::Current => Color::Blue,
        Metric::StateOfCharge => Color::Green,
        Metric::LoadPower => Color::Magenta,
        Metric::Temperature => Color::Red,
    }
}

fn elide(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max {
        return text.to_owned();
    }
    let tail: String = text.chars().skip(count - (max - 1)).collect();
    format!("…{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elide_keeps_the_tail() {
        assert_eq!(elide("short", 10), "short");
        assert_eq!(elide("abcdefghij", 5), "…ghij");
    }

    #[test]
    fn centered_clamps_to_area() {
        let area = Rect::new(0, 0, 40, 10);
        assert_eq!(centered(area, 20, 4), Rect::new(10, 3, 20, 4));
        assert_eq!(centered(area, 80, 20), area);
    }
}
