use clap::Parser;
use clap::builder::styling::{AnsiColor, Effects, Styles};

fn get_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
        .usage(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Yellow.on_default())
        .error(AnsiColor::Red.on_default().effects(Effects::BOLD))
        .valid(AnsiColor::Green.on_default())
        .invalid(AnsiColor::Red.on_default())
}

/// Wall-calendar dashboard core
///
/// Shows the current weather and the lunar almanac for a free-form Taiwan
/// location, refreshing weather on even-hour ticks and the almanac on the
/// Taipei day rollover. Results are cached so the dashboard paints
/// instantly on the next start.
#[derive(Parser, Debug)]
#[command(author = "Chia Wei Chien", about, long_about = None, version)]
#[command(styles = get_styles())]
pub struct Args {
    /// Display language: zh or en
    #[arg(short, long, default_value = "zh", value_name = "LANG")]
    pub lang: String,

    /// Free-form location, e.g. "新北市板橋區" or "Banqiao District,
    /// New Taipei City". Defaults to the language-specific location.
    #[arg(short = 'L', long = "loc", value_name = "LOCATION")]
    pub location: Option<String>,

    /// Refresh once, print the dashboard and exit. Useful for scripts.
    #[arg(short, long)]
    pub once: bool,

    /// Enable debug logging on stdout
    #[arg(short, long)]
    pub debug: bool,

    /// Custom log file path
    #[arg(long = "log-file", value_name = "PATH", help_heading = "Configuration")]
    pub log_file: Option<String>,

    /// Print the effective configuration and exit
    #[arg(long = "list-config", help_heading = "Configuration")]
    pub list_config: bool,

    /// Store a new almanac API key in the config file and exit
    #[arg(
        long = "set-almanac-key",
        value_name = "KEY",
        help_heading = "Configuration"
    )]
    pub set_almanac_key: Option<String>,

    /// Clear every cached envelope (weather, almanac, geocoding) and exit
    #[arg(long = "clear-cache", help_heading = "Configuration")]
    pub clear_cache: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["wallcal"]);
        assert_eq!(args.lang, "zh");
        assert!(args.location.is_none());
        assert!(!args.once);
        assert!(!args.clear_cache);
    }

    #[test]
    fn test_location_and_language() {
        let args = Args::parse_from(["wallcal", "-l", "en", "-L", "Banqiao District"]);
        assert_eq!(args.lang, "en");
        assert_eq!(args.location.as_deref(), Some("Banqiao District"));
    }

    #[test]
    fn test_once_flag() {
        let args = Args::parse_from(["wallcal", "--once", "--debug"]);
        assert!(args.once);
        assert!(args.debug);
    }
}
