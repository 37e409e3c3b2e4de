use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::sync::{DEFAULT_DEBOUNCE_MS, RetryPolicy, SyncConfig};

/// Retry delay cap used when a backoff factor is set without an explicit cap.
pub const DEFAULT_RETRY_CAP_MS: u64 = 10_000;

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeMode {
    Auto,
    Light,
    Dark,
}

/// Flags that can live in a flag file as well as on the command line.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConfigFlags {
    pub watch: bool,
    pub no_scroll: bool,
    pub emit_script: bool,
    pub perf: bool,
    pub theme: Option<ThemeMode>,
    pub out: Option<PathBuf>,
    pub rules: Option<PathBuf>,
    pub syntax: Option<String>,
    pub debounce_ms: Option<u64>,
    pub retry_period_ms: Option<u64>,
    pub retry_backoff: Option<f64>,
    pub retry_max_period_ms: Option<u64>,
    pub retry_limit: Option<u32>,
    pub render_debug_log: Option<PathBuf>,
}

impl ConfigFlags {
    /// Merge two flag sets; switches are OR-ed, `other` wins for values.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            watch: self.watch || other.watch,
            no_scroll: self.no_scroll || other.no_scroll,
            emit_script: self.emit_script || other.emit_script,
            perf: self.perf || other.perf,
            theme: other.theme.or(self.theme),
            out: other.out.clone().or_else(|| self.out.clone()),
            rules: other.rules.clone().or_else(|| self.rules.clone()),
            syntax: other.syntax.clone().or_else(|| self.syntax.clone()),
            debounce_ms: other.debounce_ms.or(self.debounce_ms),
            retry_period_ms: other.retry_period_ms.or(self.retry_period_ms),
            retry_backoff: other.retry_backoff.or(self.retry_backoff),
            retry_max_period_ms: other.retry_max_period_ms.or(self.retry_max_period_ms),
            retry_limit: other.retry_limit.or(self.retry_limit),
            render_debug_log: other
                .render_debug_log
                .clone()
                .or_else(|| self.render_debug_log.clone()),
        }
    }

    /// Console tuning described by these flags.
    ///
    /// The retry period defaults to the debounce window, so an unconfigured
    /// console retries on the same cadence it syncs on.
    pub fn sync_config(&self) -> SyncConfig {
        let debounce_ms = self.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS);
        let period_ms = self.retry_period_ms.unwrap_or(debounce_ms);
        let backoff = self.retry_backoff.filter(|b| b.is_finite()).unwrap_or(1.0).max(1.0);
        let max_period_ms = self.retry_max_period_ms.unwrap_or_else(|| {
            if backoff > 1.0 {
                DEFAULT_RETRY_CAP_MS.max(period_ms)
            } else {
                period_ms
            }
        });
        SyncConfig {
            debounce_ms,
            retry: RetryPolicy {
                period_ms,
                backoff,
                max_period_ms,
                max_attempts: self.retry_limit,
            },
            scroll_on_append: !self.no_scroll,
        }
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("tailmark").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("tailmark")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("tailmark").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".config")
                .join("tailmark")
                .join("config");
        }
    }

    local_override_path()
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".tailmarkrc")
}

/// Read a flag file. A missing file yields default flags.
///
/// # Errors
/// Returns an error if the file exists but cannot be read.
pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split_whitespace().map(ToOwned::to_owned))
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

/// Write `flags` to a flag file, creating parent directories.
///
/// # Errors
/// Returns an error if the directory or file cannot be written.
pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = vec!["# tailmark defaults (saved with --save)".to_string()];
    let switches = [
        (flags.watch, "--watch"),
        (flags.no_scroll, "--no-scroll"),
        (flags.emit_script, "--emit-script"),
        (flags.perf, "--perf"),
    ];
    lines.extend(
        switches
            .iter()
            .filter(|(on, _)| *on)
            .map(|(_, flag)| (*flag).to_string()),
    );
    if let Some(theme) = flags.theme {
        let theme_str = match theme {
            ThemeMode::Auto => "auto",
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        };
        lines.push(format!("--theme {theme_str}"));
    }
    if let Some(path) = &flags.out {
        lines.push(format!("--out {}", path.display()));
    }
    if let Some(path) = &flags.rules {
        lines.push(format!("--rules {}", path.display()));
    }
    if let Some(syntax) = &flags.syntax {
        lines.push(format!("--syntax {syntax}"));
    }
    if let Some(ms) = flags.debounce_ms {
        lines.push(format!("--debounce-ms {ms}"));
    }
    if let Some(ms) = flags.retry_period_ms {
        lines.push(format!("--retry-period-ms {ms}"));
    }
    if let Some(factor) = flags.retry_backoff {
        lines.push(format!("--retry-backoff {factor}"));
    }
    if let Some(ms) = flags.retry_max_period_ms {
        lines.push(format!("--retry-max-period-ms {ms}"));
    }
    if let Some(limit) = flags.retry_limit {
        lines.push(format!("--retry-limit {limit}"));
    }
    if let Some(path) = &flags.render_debug_log {
        lines.push(format!("--render-debug-log {}", path.display()));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

/// Remove a flag file if present.
///
/// # Errors
/// Returns an error if the file exists but cannot be removed.
pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Pick known flags out of `tokens`, ignoring anything else.
///
/// Value flags accept both `--flag value` and `--flag=value`. Unparseable
/// values are skipped.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        match token {
            "--watch" => flags.watch = true,
            "--no-scroll" => flags.no_scroll = true,
            "--emit-script" => flags.emit_script = true,
            "--perf" => flags.perf = true,
            _ => {
                let (name, inline) = match token.split_once('=') {
                    Some((name, value)) => (name, Some(value)),
                    None => (token, None),
                };
                if is_value_flag(name) {
                    let value = match inline {
                        Some(value) => Some(value),
                        None => {
                            let next = tokens.get(i + 1).map(String::as_str);
                            if next.is_some() {
                                i += 1;
                            }
                            next
                        }
                    };
                    if let Some(value) = value {
                        apply_value(&mut flags, name, value);
                    }
                }
            }
        }
        i += 1;
    }
    flags
}

const VALUE_FLAGS: [&str; 10] = [
    "--theme",
    "--out",
    "--rules",
    "--syntax",
    "--debounce-ms",
    "--retry-period-ms",
    "--retry-backoff",
    "--retry-max-period-ms",
    "--retry-limit",
    "--render-debug-log",
];

fn is_value_flag(name: &str) -> bool {
    VALUE_FLAGS.contains(&name)
}

fn apply_value(flags: &mut ConfigFlags, name: &str, value: &str) {
    match name {
        "--theme" => flags.theme = parse_theme(value),
        "--out" => flags.out = Some(PathBuf::from(value)),
        "--rules" => flags.rules = Some(PathBuf::from(value)),
        "--syntax" => flags.syntax = Some(value.to_string()),
        "--debounce-ms" => flags.debounce_ms = value.parse().ok(),
        "--retry-period-ms" => flags.retry_period_ms = value.parse().ok(),
        "--retry-backoff" => flags.retry_backoff = value.parse().ok(),
        "--retry-max-period-ms" => flags.retry_max_period_ms = value.parse().ok(),
        "--retry-limit" => flags.retry_limit = value.parse().ok(),
        "--render-debug-log" => flags.render_debug_log = Some(PathBuf::from(value)),
        _ => {}
    }
}

fn parse_theme(s: &str) -> Option<ThemeMode> {
    match s {
        "auto" => Some(ThemeMode::Auto),
        "light" => Some(ThemeMode::Light),
        "dark" => Some(ThemeMode::Dark),
        _ => None,
    }
}
