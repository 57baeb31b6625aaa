//! Aligned text tables for the run summary.

use console::measure_text_width;

/// A plain table: header line, dashed rule, rows.
///
/// Column widths are measured on visible text, so styled cells line up.
#[derive(Debug)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    column_widths: Vec<usize>,
}

impl Table {
    /// Create a new table with the given headers.
    pub fn new(headers: Vec<&str>) -> Self {
        let headers: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
        let column_widths = headers.iter().map(|h| measure_text_width(h)).collect();

        Self {
            headers,
            rows: Vec::new(),
            column_widths,
        }
    }

    /// Add a row to the table. Missing cells render empty.
    pub fn add_row(&mut self, row: Vec<String>) {
        for (i, cell) in row.iter().enumerate() {
            if i < self.column_widths.len() {
                self.column_widths[i] = self.column_widths[i].max(measure_text_width(cell));
            }
        }
        self.rows.push(row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render the table as a string.
    pub fn render(&self) -> String {
        let mut lines = vec![self.render_row(&self.headers), self.render_rule()];
        lines.extend(self.rows.iter().map(|row| self.render_row(row)));
        lines.join("\n")
    }

    fn render_rule(&self) -> String {
        self.column_widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  ")
    }

    fn render_row(&self, row: &[String]) -> String {
        let mut cells = Vec::with_capacity(self.column_widths.len());
        for (i, width) in self.column_widths.iter().enumerate() {
            let cell = row.get(i).map(String::as_str).unwrap_or("");
            let pad = width.saturating_sub(measure_text_width(cell));
            cells.push(format!("{cell}{}", " ".repeat(pad)));
        }
        cells.join("  ").trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn table_empty() {
        let table = Table::new(vec!["A", "B"]);
        assert!(table.is_empty());
        assert_eq!(table.row_count(), 0);

        let output = table.render();
        assert!(output.contains("A"));
        assert!(output.contains("B"));
    }

    #[test]
    fn table_adjusts_column_width() {
        let mut table = Table::new(vec!["Tool", "Status"]);
        table.add_row(row(&["python_modules", "ok"]));

        let output = table.render();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines[0], "Tool            Status");
        assert_eq!(lines[1], "--------------  ------");
        assert_eq!(lines[2], "python_modules  ok");
    }

    #[test]
    fn table_handles_missing_cells() {
        let mut table = Table::new(vec!["A", "B", "C"]);
        table.add_row(row(&["only", "two"]));

        let output = table.render();
        assert!(output.contains("only  two"));
    }

    #[test]
    fn styled_cells_align_by_visible_width() {
        let mut table = Table::new(vec!["Status", "X"]);
        table.add_row(vec!["\u{1b}[32mok\u{1b}[0m".to_string(), "1".to_string()]);
        table.add_row(row(&["failed", "2"]));

        let output = table.render();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(measure_text_width(lines[2]), measure_text_width(lines[3]));
    }

    #[test]
    fn table_render_line_count() {
        let mut table = Table::new(vec!["Library", "Status"]);
        table.add_row(row(&["zlib", "ok"]));
        table.add_row(row(&["curl", "failed"]));

        assert_eq!(table.render().lines().count(), 4);
    }
}
