//! Colored output helpers for CLI
//!
//! Provides consistent, colored terminal output for the deepsearch CLI.

use crate::research::ProgressEvent;
use owo_colors::OwoColorize;

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    /// Print the banner
    pub fn banner(&self) {
        if self.colored {
            println!(
                "\n   {} {}\n",
                "deepsearch".bright_cyan().bold(),
                format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
            );
        } else {
            println!("\n   deepsearch v{}\n", env!("CARGO_PKG_VERSION"));
        }
    }

    /// Print a success message with a checkmark
    pub fn success(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "✓".green().bold(), message.green());
        } else {
            println!("  [OK] {}", message);
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "•".blue(), message);
        } else {
            println!("  [INFO] {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            println!("  [WARN] {}", message);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// Print a file creation message
    pub fn created(&self, file_type: &str, path: &str) {
        if self.colored {
            println!(
                "  {} {} {}",
                "✓".green().bold(),
                file_type.dimmed(),
                path.bright_white()
            );
        } else {
            println!("  [CREATED] {} {}", file_type, path);
        }
    }

    /// Print a file skipped message
    pub fn skipped(&self, path: &str, reason: &str) {
        if self.colored {
            println!(
                "  {} {} {}",
                "○".yellow(),
                path.dimmed(),
                format!("({})", reason).yellow()
            );
        } else {
            println!("  [SKIPPED] {} ({})", path, reason);
        }
    }

    /// Print a header for a section
    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    /// Print a key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            println!("    {}: {}", key, value);
        }
    }

    /// Print a hint/tip message
    pub fn hint(&self, message: &str) {
        if self.colored {
            println!("\n  {} {}", "💡".dimmed(), message.dimmed().italic());
        } else {
            println!("\n  [TIP] {}", message);
        }
    }

    /// Print a command suggestion
    pub fn command(&self, cmd: &str) {
        if self.colored {
            println!("     {}", format!("$ {}", cmd).bright_cyan());
        } else {
            println!("     $ {}", cmd);
        }
    }

    /// Print completion message
    pub fn complete(&self, message: &str) {
        if self.colored {
            println!("\n  {} {}", "🚀".green(), message.bright_green().bold());
        } else {
            println!("\n  [DONE] {}", message);
        }
    }

    /// Print one progress line of a research run
    pub fn progress(&self, fraction: f64, status: &str) {
        let percent = format!("{:>3}%", (fraction * 100.0).round() as u32);
        if self.colored {
            println!("  {} {}", percent.cyan(), status);
        } else {
            println!("  [{}] {}", percent, status);
        }
    }

    /// Print the answer and its sources
    pub fn answer(&self, answer: &str, sources: &[String]) {
        self.header("Answer");
        println!();
        for line in answer.lines() {
            println!("  {}", line);
        }
        if !sources.is_empty() {
            self.header("Sources");
            for (i, source) in sources.iter().enumerate() {
                if self.colored {
                    println!("    {} {}", format!("[{}]", i + 1).dimmed(), source.bright_white());
                } else {
                    println!("    [{}] {}", i + 1, source);
                }
            }
        }
        println!();
    }

    /// Render a progress event the way a human reads it
    pub fn event(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Progress { fraction, status } => self.progress(*fraction, status),
            ProgressEvent::Failure { reason } => self.error(&format!("Research failed: {}", reason)),
            ProgressEvent::Done { answer, sources } => self.answer(answer, sources),
        }
    }

    /// Print a table header row
    pub fn table_header(&self, columns: &[&str]) {
        let header: String = columns
            .iter()
            .map(|c| format!("{:<15}", c))
            .collect::<Vec<_>>()
            .join(" ");
        if self.colored {
            println!("    {}", header.bright_white().bold());
            println!("    {}", "─".repeat(columns.len() * 16).dimmed());
        } else {
            println!("    {}", header);
            println!("    {}", "-".repeat(columns.len() * 16));
        }
    }

    /// Print a table row
    pub fn table_row(&self, values: &[&str]) {
        let row: String = values
            .iter()
            .map(|v| format!("{:<15}", v))
            .collect::<Vec<_>>()
            .join(" ");
        println!("    {}", row);
    }

    /// Print newline
    pub fn newline(&self) {
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_new() {
        let output = Output::new();
        assert!(output.colored);
    }

    #[test]
    fn test_output_no_color() {
        let output = Output::no_color();
        assert!(!output.colored);
    }

    #[test]
    fn test_table_formatting_no_panic() {
        let output = Output::no_color();
        output.table_header(&["Model", "Provider"]);
        output.table_header(&[]);
        output.table_row(&["fast", "ollama-local"]);
        output.table_row(&[]);
    }

    #[test]
    fn test_events_render_no_panic() {
        for output in [Output::new(), Output::no_color()] {
            output.event(&ProgressEvent::Progress {
                fraction: 0.42,
                status: "Searching: static typing (depth 1)".to_string(),
            });
            output.event(&ProgressEvent::Failure {
                reason: "no article".to_string(),
            });
            output.event(&ProgressEvent::Done {
                answer: "Line one\nLine two".to_string(),
                sources: vec!["https://a.example".to_string()],
            });
            output.event(&ProgressEvent::Done {
                answer: String::new(),
                sources: vec![],
            });
        }
    }

    #[test]
    fn test_output_methods_no_panic() {
        let output = Output::no_color();
        output.banner();
        output.success("test success");
        output.info("test info");
        output.warning("test warning");
        output.error("test error");
        output.created("file", "path/to/file");
        output.skipped("path", "reason");
        output.header("Test Header");
        output.kv("key", "value");
        output.hint("hint message");
        output.command("some command");
        output.complete("complete message");
        output.newline();
    }
}
