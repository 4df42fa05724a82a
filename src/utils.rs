use directories::{ProjectDirs, BaseDirs};
use std::path::PathBuf;

/// Minutes in one calendar day
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Profile mode for the application (dev or prod)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Dev,
    Prod,
}

impl Profile {
    fn app_name(self) -> &'static str {
        match self {
            Profile::Dev => "hoshyar-dev",
            Profile::Prod => "hoshyar",
        }
    }
}

/// Get the configuration directory path
/// If profile is Dev, uses "hoshyar-dev" instead of "hoshyar"
pub fn get_config_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "hoshyar", profile.app_name())
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the data directory path
/// If profile is Dev, uses "hoshyar-dev" instead of "hoshyar"
pub fn get_data_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "hoshyar", profile.app_name())
        .map(|dirs| dirs.data_dir().to_path_buf())
}

/// Expand `~` in a path string to the user's home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Parse a date string in ISO 8601 format (YYYY-MM-DD)
pub fn parse_date(date_str: &str) -> Result<chrono::NaiveDate, chrono::ParseError> {
    chrono::NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
}

/// Check that a string is a canonical day key: a real date written as
/// zero-padded `YYYY-MM-DD`
pub fn is_day_key(value: &str) -> bool {
    value.len() == 10
        && parse_date(value)
            .map(|d| d.format("%Y-%m-%d").to_string() == value)
            .unwrap_or(false)
}

/// Get the current local calendar day as a day key (YYYY-MM-DD)
pub fn today_key() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// Parse an `HH:mm` clock string into minutes since midnight.
/// Accepts a single-digit hour ("9:05") but always requires two minute digits.
pub fn parse_clock(value: &str) -> Option<u32> {
    let (h, m) = value.trim().split_once(':')?;
    if h.is_empty() || h.len() > 2 || m.len() != 2 {
        return None;
    }
    let hours: u32 = h.parse().ok()?;
    let minutes: u32 = m.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Normalize a clock string to zero-padded `HH:mm`
pub fn normalize_clock(value: &str) -> Option<String> {
    parse_clock(value).map(format_boundary)
}

/// Format minutes since midnight as `HH:mm` without wrapping.
/// Midnight at the end of the day prints as `24:00`.
pub fn format_boundary(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Format an unwrapped minute count as a wall-clock `HH:mm`, wrapping past midnight
pub fn format_wall_clock(minutes: u32) -> String {
    format!("{:02}:{:02}", (minutes / 60) % 24, minutes % 60)
}
