//! Status messages. Everything goes to stderr; stdout carries only the report.

use colored::Colorize;

/// Print an info message
pub fn info(msg: &str) {
    eprintln!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    eprintln!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    eprintln!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    eprintln!("  {}", msg.dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    eprintln!("  {}: {}", key.dimmed(), value);
}

/// Pluralize a count: `1 account`, `3 accounts`
pub fn count(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}
