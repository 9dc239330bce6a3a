//! Frame rendering. Pure: the same state and style always give the same text.

use super::msg::DashboardMsg;
use super::state::DashboardState;
use crate::cli::display::StatusIcon;
use crate::domain::config::DashboardConf;
use crate::domain::stack::{EngineEvent, ProgressMessage};
use crate::infrastructure::constants::{COLUMN_WIDTH, LIST_HEIGHT};
use colored::Colorize;

const IN_PROGRESS_HEADER: &str = "Updates in progress";
const COMPLETED_HEADER: &str = "Updates completed";
const DOC_PADDING: usize = 2;
const COLUMN_MARGIN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Immutable look of the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardStyle {
    pub spinner_frames: &'static [&'static str],
    pub spinner_color: Rgb,
    /// Borders and header rules.
    pub subtle: Rgb,
    /// Check mark of completed resources.
    pub special: Rgb,
    /// Struck-through completed resources.
    pub done: Rgb,
    pub column_width: usize,
    pub list_height: usize,
    /// Terminal width, when known.
    pub max_width: Option<usize>,
    pub color: bool,
}

impl Default for DashboardStyle {
    fn default() -> Self {
        Self {
            spinner_frames: StatusIcon::SPINNER,
            spinner_color: Rgb(255, 95, 175),
            subtle: Rgb(56, 56, 56),
            special: Rgb(115, 245, 159),
            done: Rgb(105, 105, 105),
            column_width: COLUMN_WIDTH,
            list_height: LIST_HEIGHT,
            max_width: None,
            color: true,
        }
    }
}

impl DashboardStyle {
    pub fn from_conf(conf: &DashboardConf) -> Self {
        Self {
            column_width: conf.column_width.max(COMPLETED_HEADER.len() + 2),
            list_height: conf.list_height,
            ..Self::default()
        }
    }

    pub fn with_max_width(self, max_width: Option<usize>) -> Self {
        Self { max_width, ..self }
    }

    pub fn with_color(self, color: bool) -> Self {
        Self { color, ..self }
    }

    /// Width of the two columns side by side, padding included.
    pub fn side_by_side_width(&self) -> usize {
        DOC_PADDING + (self.column_width + 2) + COLUMN_MARGIN + (self.column_width + 1)
    }

    fn paint(&self, text: &str, rgb: Rgb) -> String {
        if self.color {
            text.truecolor(rgb.0, rgb.1, rgb.2).to_string()
        } else {
            text.to_string()
        }
    }

    fn strike(&self, text: &str, rgb: Rgb) -> String {
        if self.color {
            text.truecolor(rgb.0, rgb.1, rgb.2)
                .strikethrough()
                .to_string()
        } else {
            text.to_string()
        }
    }
}

/// Render one frame of the dashboard.
pub fn render(state: &DashboardState, style: &DashboardStyle) -> String {
    let doc = if state.in_progress.is_empty() && state.completed.is_empty() {
        String::new()
    } else {
        let in_progress = column(
            style,
            IN_PROGRESS_HEADER,
            &state.in_progress_types(),
            false,
            style.column_width + 1,
        );
        let completed = column(
            style,
            COMPLETED_HEADER,
            &state.completed_types(),
            true,
            style.column_width,
        );
        layout(style, in_progress, completed)
    };

    let mut frame = format!(
        "\n{}Current step: {}{}\n",
        spinner(state, style),
        state.current_step,
        doc
    );
    if state.is_quitting() {
        frame.push('\n');
    }
    frame
}

/// Line printed for `msg` when running without a dashboard.
pub fn plain_line(msg: &DashboardMsg) -> Option<String> {
    match msg {
        DashboardMsg::Event(EngineEvent::ResourcePre { type_name, .. }) => {
            Some(format!("  {} {}", StatusIcon::PENDING, type_name))
        }
        DashboardMsg::Event(EngineEvent::ResourceOutputs { type_name, .. }) => {
            Some(format!("  {} {}", StatusIcon::CHECK, type_name))
        }
        DashboardMsg::Progress(ProgressMessage::Step(text)) => Some(text.clone()),
        DashboardMsg::Progress(ProgressMessage::Completed) => Some("Succeeded!".to_string()),
        DashboardMsg::Progress(ProgressMessage::CompletedWithEndpoint(endpoint)) => {
            Some(format!("Succeeded! {}", endpoint))
        }
        DashboardMsg::Tick | DashboardMsg::Interrupt => None,
    }
}

fn spinner(state: &DashboardState, style: &DashboardStyle) -> String {
    if style.spinner_frames.is_empty() {
        return String::new();
    }
    let frame = style.spinner_frames[state.spinner_frame % style.spinner_frames.len()];
    style.paint(frame, style.spinner_color)
}

/// A bordered list: header, rule, items, padded to the list height. Every
/// line is `width` cells wide plus the right border.
fn column(
    style: &DashboardStyle,
    header: &str,
    items: &[&str],
    done: bool,
    width: usize,
) -> Vec<String> {
    let mut cells = Vec::with_capacity(items.len() + 2);
    cells.push(pad(header, width));
    let rule = "─".repeat(header.chars().count().min(width));
    cells.push(style.paint(&rule, style.subtle) + &" ".repeat(width - rule.chars().count()));

    for item in items {
        let text = truncate(item, width.saturating_sub(2));
        let gap = " ".repeat(width.saturating_sub(2 + text.chars().count()));
        if done {
            cells.push(format!(
                "{} {}{}",
                style.paint(StatusIcon::CHECK, style.special),
                style.strike(&text, style.done),
                gap
            ));
        } else {
            cells.push(format!("  {}{}", text, gap));
        }
    }

    while cells.len() < style.list_height {
        cells.push(" ".repeat(width));
    }

    let border = style.paint("│", style.subtle);
    cells
        .into_iter()
        .map(|cell| format!("{}{}", cell, border))
        .collect()
}

fn layout(style: &DashboardStyle, left: Vec<String>, right: Vec<String>) -> String {
    let indent = " ".repeat(DOC_PADDING);
    let stacked = style
        .max_width
        .is_some_and(|max| max < style.side_by_side_width());

    let lines: Vec<String> = if stacked {
        left.into_iter()
            .chain(std::iter::once(String::new()))
            .chain(right)
            .map(|line| format!("{}{}", indent, line).trim_end().to_string())
            .collect()
    } else {
        let rows = left.len().max(right.len());
        let blank_left = " ".repeat(style.column_width + 2);
        (0..rows)
            .map(|i| {
                format!(
                    "{}{}{}{}",
                    indent,
                    left.get(i).map(String::as_str).unwrap_or(&blank_left),
                    " ".repeat(COLUMN_MARGIN),
                    right.get(i).map(String::as_str).unwrap_or("")
                )
            })
            .collect()
    };

    format!("\n\n{}\n", lines.join("\n"))
}

fn pad(text: &str, width: usize) -> String {
    let text = truncate(text, width);
    let gap = width - text.chars().count();
    format!("{}{}", text, " ".repeat(gap))
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    if width > 0 {
        out.push('…');
    }
    out
}
