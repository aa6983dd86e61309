//! Terminal output for `picce-server` subcommands
//!
//! Every line is composed by [`Output::line`] so the colored and plain
//! renderings stay in step. Plain lines carry a bracketed tag that scripts
//! can grep for.

use crate::types::Role;
use crate::utils::toml_config::MIN_SECRET_LEN;
use owo_colors::OwoColorize;

/// Kind of status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Ok,
    Info,
    Warn,
    Error,
    Created,
    Skipped,
    Tip,
    Done,
}

impl Tone {
    fn tag(self) -> &'static str {
        match self {
            Tone::Ok => "[OK]",
            Tone::Info => "[INFO]",
            Tone::Warn => "[WARN]",
            Tone::Error => "[ERROR]",
            Tone::Created => "[CREATED]",
            Tone::Skipped => "[SKIPPED]",
            Tone::Tip => "[TIP]",
            Tone::Done => "[DONE]",
        }
    }

    fn marker(self) -> String {
        match self {
            Tone::Ok | Tone::Created => "✓".green().bold().to_string(),
            Tone::Info => "•".blue().to_string(),
            Tone::Warn => "⚠".yellow().bold().to_string(),
            Tone::Error => "✗".red().bold().to_string(),
            Tone::Skipped => "○".yellow().to_string(),
            Tone::Tip => "›".dimmed().to_string(),
            Tone::Done => "»".bright_green().bold().to_string(),
        }
    }
}

/// Printer for CLI status lines, colored or plain.
pub struct Output {
    /// Whether to use ANSI colors
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Colored output
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Plain output, for `--no-color` and non-terminal consumers
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    fn line(&self, tone: Tone, text: &str) -> String {
        if !self.colored {
            return format!("  {} {}", tone.tag(), text);
        }
        let text = match tone {
            Tone::Ok => text.green().to_string(),
            Tone::Warn => text.yellow().to_string(),
            Tone::Error => text.red().to_string(),
            Tone::Tip => text.dimmed().italic().to_string(),
            Tone::Done => text.bright_green().bold().to_string(),
            Tone::Info | Tone::Created | Tone::Skipped => text.to_string(),
        };
        format!("  {} {}", tone.marker(), text)
    }

    fn pair(&self, key: &str, value: &str) -> String {
        if self.colored {
            format!("    {}: {}", key.dimmed(), value.bright_white())
        } else {
            format!("    {}: {}", key, value)
        }
    }

    /// Print the server name and version
    pub fn banner(&self) {
        let version = format!("v{}", env!("CARGO_PKG_VERSION"));
        if self.colored {
            println!(
                "\n   {} {}\n",
                "PICCE API".bright_cyan().bold(),
                version.dimmed()
            );
        } else {
            println!("\n   PICCE API {}\n", version);
        }
    }

    /// Print a section title
    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    /// Print a completed check
    pub fn success(&self, message: &str) {
        println!("{}", self.line(Tone::Ok, message));
    }

    /// Print a neutral status line
    pub fn info(&self, message: &str) {
        println!("{}", self.line(Tone::Info, message));
    }

    /// Print a non-fatal problem
    pub fn warning(&self, message: &str) {
        println!("{}", self.line(Tone::Warn, message));
    }

    /// Print to stderr
    pub fn error(&self, message: &str) {
        eprintln!("{}", self.line(Tone::Error, message));
    }

    /// Report a scaffolded file or directory
    pub fn created(&self, kind: &str, path: &str) {
        println!("{}", self.line(Tone::Created, &format!("{} {}", kind, path)));
    }

    /// Report a scaffold target left untouched
    pub fn skipped(&self, path: &str, reason: &str) {
        println!("{}", self.line(Tone::Skipped, &format!("{} ({})", path, reason)));
    }

    /// Print a tip after a blank line
    pub fn hint(&self, message: &str) {
        println!("\n{}", self.line(Tone::Tip, message));
    }

    /// Print a shell command the operator should run next
    pub fn command(&self, cmd: &str) {
        let cmd = format!("$ {}", cmd);
        if self.colored {
            println!("     {}", cmd.bright_cyan());
        } else {
            println!("     {}", cmd);
        }
    }

    /// Print the closing line of a subcommand
    pub fn complete(&self, message: &str) {
        println!("\n{}", self.line(Tone::Done, message));
    }

    /// Print one configuration value
    pub fn kv(&self, key: &str, value: &str) {
        println!("{}", self.pair(key, value));
    }

    /// Print whether the token signing secret is available.
    ///
    /// Only the length is shown, never the value.
    pub fn secret_status(&self, env_name: &str, value: Option<&str>) {
        println!("{}", self.pair(env_name, &describe_secret(value)));
    }

    /// Print the role hierarchy, lowest privilege first
    pub fn roles(&self) {
        println!("{}", self.pair("roles", &role_ladder()));
    }

    /// Print a blank line
    pub fn newline(&self) {
        println!();
    }
}

fn describe_secret(value: Option<&str>) -> String {
    match value {
        None => "missing".to_string(),
        Some(secret) if secret.len() < MIN_SECRET_LEN => {
            format!("too short ({} of {} bytes)", secret.len(), MIN_SECRET_LEN)
        }
        Some(secret) => format!("set ({} bytes)", secret.len()),
    }
}

fn role_ladder() -> String {
    Role::NAMES.join(" < ")
}

/// Renders a token lifetime in seconds with its largest whole unit.
pub fn describe_lifetime(seconds: i64) -> String {
    const UNITS: [(i64, &str); 3] = [(86_400, "d"), (3_600, "h"), (60, "m")];

    UNITS
        .iter()
        .find(|(size, _)| seconds >= *size && seconds % size == 0)
        .map(|(size, unit)| format!("{}s ({}{})", seconds, seconds / size, unit))
        .unwrap_or_else(|| format!("{}s", seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_lines_carry_tags() {
        let output = Output::no_color();

        assert_eq!(
            output.line(Tone::Ok, "Configuration is valid"),
            "  [OK] Configuration is valid"
        );
        assert_eq!(
            output.line(Tone::Warn, "picce.toml already exists!"),
            "  [WARN] picce.toml already exists!"
        );
        assert_eq!(
            output.line(Tone::Created, "config picce.toml"),
            "  [CREATED] config picce.toml"
        );
        assert_eq!(output.pair("token_expiry", "3600s"), "    token_expiry: 3600s");
    }

    #[test]
    fn test_colored_lines_keep_text_and_drop_tags() {
        let output = Output::new();
        let line = output.line(Tone::Error, "JWT_SECRET is not set");

        assert!(line.contains("JWT_SECRET is not set"));
        assert!(!line.contains("[ERROR]"));
        assert!(line.contains('\u{1b}'));
    }

    #[test]
    fn test_secret_is_described_not_printed() {
        let secret = "a".repeat(MIN_SECRET_LEN);

        assert_eq!(describe_secret(None), "missing");
        assert_eq!(
            describe_secret(Some(&secret)),
            format!("set ({} bytes)", MIN_SECRET_LEN)
        );
        assert_eq!(
            describe_secret(Some("short")),
            format!("too short (5 of {} bytes)", MIN_SECRET_LEN)
        );
        assert!(!describe_secret(Some("hunter2-hunter2")).contains("hunter2"));
    }

    #[test]
    fn test_role_ladder_is_ordered() {
        assert_eq!(
            role_ladder(),
            "GUEST < USER < APPLIER < PUBLISHER < COORDINATOR < ADMIN"
        );
    }

    #[test]
    fn test_lifetimes() {
        assert_eq!(describe_lifetime(3600), "3600s (1h)");
        assert_eq!(describe_lifetime(86_400 * 7), "604800s (7d)");
        assert_eq!(describe_lifetime(900), "900s (15m)");
        assert_eq!(describe_lifetime(45), "45s");
        assert_eq!(describe_lifetime(3601), "3601s");
    }

    #[test]
    fn test_default_is_colored() {
        assert!(Output::default().colored);
        assert!(!Output::no_color().colored);
    }
}
