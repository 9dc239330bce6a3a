//! Table rendering for CLI output

use super::{ColorTheme, StatusIcon};
use crate::domain::stack::StackSummary;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Table};

const MISSING: &str = "-";

/// Table renderer for formatted output
pub struct TableRenderer {
    theme: ColorTheme,
}

impl Default for TableRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TableRenderer {
    /// Create a new table renderer with default theme
    pub fn new() -> Self {
        Self {
            theme: ColorTheme::default(),
        }
    }

    /// Render the stacks of a project as a formatted table
    pub fn render_stack_list(&self, project: &str, stacks: &[StackSummary]) -> String {
        if stacks.is_empty() {
            return format!("No stacks found in project {}", project);
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("NAME").set_alignment(CellAlignment::Left),
                Cell::new("IMAGE").set_alignment(CellAlignment::Left),
                Cell::new("PORT").set_alignment(CellAlignment::Center),
                Cell::new("URL").set_alignment(CellAlignment::Left),
                Cell::new("LAST OPERATION").set_alignment(CellAlignment::Center),
                Cell::new("UPDATED").set_alignment(CellAlignment::Left),
                Cell::new("STATUS").set_alignment(CellAlignment::Center),
            ]);

        for stack in stacks {
            let last_operation = stack.last_operation.as_deref();
            let status = StatusIcon::get_status_text(stack.url.is_some(), last_operation);
            let icon = StatusIcon::get_stack_icon(stack.url.is_some(), last_operation);

            table.add_row(vec![
                Cell::new(&stack.name),
                Cell::new(stack.image.as_deref().unwrap_or(MISSING)),
                Cell::new(stack.port.as_deref().unwrap_or(MISSING))
                    .set_alignment(CellAlignment::Center),
                Cell::new(stack.url.as_deref().unwrap_or(MISSING)).fg(self.theme.info),
                Cell::new(last_operation.unwrap_or(MISSING)).set_alignment(CellAlignment::Center),
                Cell::new(stack.updated_at.as_deref().unwrap_or(MISSING)).fg(self.theme.muted),
                Cell::new(format!("{} {}", icon, status)).fg(self.theme.get_status_color(status)),
            ]);
        }

        let mut output = String::new();
        output.push_str(&format!(
            "╭─ {} {} ─╮\n",
            project,
            format!("[{} stacks]", stacks.len()).bright_black()
        ));
        output.push_str(&table.to_string());
        output.push('\n');
        output.push_str(&format!(
            "Legend: {} Running  {} Pending  {} Destroyed\n",
            StatusIcon::CHECK.green(),
            StatusIcon::WARNING.yellow(),
            StatusIcon::ERROR.red()
        ));

        output
    }
}
