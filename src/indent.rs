//! Indentation helpers exposed to templates as builtins

use serde::Deserialize;

/// Indentation style: columns per level, tabs or spaces
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IndentConfig {
    /// Number of columns per indent level
    pub columns: usize,
    /// Emit tab characters for whole levels
    pub use_tab: bool,
}

impl Default for IndentConfig {
    fn default() -> Self {
        Self {
            columns: 4,
            use_tab: true,
        }
    }
}

impl IndentConfig {
    pub fn new(columns: usize, use_tab: bool) -> Self {
        Self { columns, use_tab }
    }

    fn width(&self) -> usize {
        self.columns.max(1)
    }

    /// Indent column of a line; a tab counts as one full level
    pub fn get_column(&self, line: &str) -> usize {
        line.chars()
            .map_while(|c| match c {
                ' ' => Some(1),
                '\t' => Some(self.width()),
                _ => None,
            })
            .sum()
    }

    /// Re-indent a line to `column`
    pub fn set_column(&self, line: &str, column: usize) -> String {
        let prefix = if self.use_tab {
            let width = self.width();
            format!("{}{}", "\t".repeat(column / width), " ".repeat(column % width))
        } else {
            " ".repeat(column)
        };
        format!("{}{}", prefix, line.trim_start_matches([' ', '\t']))
    }

    /// Rewrite every line's indent in this style, preserving its column
    pub fn normalize(&self, block: &str) -> String {
        self.map_lines(block, |col| col)
    }

    /// Add `level` indent levels to every line
    pub fn indent(&self, block: &str, level: usize) -> String {
        let extra = level * self.width();
        self.map_lines(block, |col| col + extra)
    }

    /// Remove up to `level` indent levels from every line
    pub fn deindent(&self, block: &str, level: usize) -> String {
        let dec = level * self.width();
        self.map_lines(block, |col| col.saturating_sub(dec))
    }

    fn map_lines(&self, block: &str, column: impl Fn(usize) -> usize) -> String {
        block
            .split_inclusive('\n')
            .map(|line| self.set_column(line, column(self.get_column(line))))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_get_column_mixes_tabs_and_spaces() {
        let indent = IndentConfig::default();
        assert_eq!(indent.get_column("\t  x"), 6);
        assert_eq!(indent.get_column("x"), 0);
    }

    #[test]
    fn test_indent_with_tabs() {
        let indent = IndentConfig::default();
        assert_eq!(indent.indent("a\n  b\n", 1), "\ta\n\t  b\n");
    }

    #[test]
    fn test_indent_with_spaces() {
        let indent = IndentConfig::new(2, false);
        assert_eq!(indent.indent("a\nb", 2), "    a\n    b");
    }

    #[test]
    fn test_deindent_stops_at_column_zero() {
        let indent = IndentConfig::default();
        assert_eq!(indent.deindent("\t\ta\n  b\n", 1), "\ta\nb\n");
    }

    #[test]
    fn test_normalize_converts_spaces_to_tabs() {
        let indent = IndentConfig::default();
        assert_eq!(indent.normalize("      x\n"), "\t  x\n");
    }
}
