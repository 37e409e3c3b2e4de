//! Tailmark - follow a text file into a live, styled HTML console.
//!
//! # Usage
//!
//! ```bash
//! tailmark server.log                      # writes server.log.html once
//! tailmark --watch server.log              # keeps the page in sync
//! tailmark --watch --emit-script app.log   # JSON lines for a webview host
//! tailmark --syntax rust src/main.rs
//! ```

use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;

use tailmark::app::App;
use tailmark::config::{
    ConfigFlags, ThemeMode, clear_config_flags, global_config_path, load_config_flags,
    local_override_path, save_config_flags,
};
use tailmark::console::StyledConsole;
use tailmark::highlight::{HighlightBackground, SyntaxStyler, page_theme, set_background_mode};
use tailmark::perf;
use tailmark::style::{LineStyler, RuleStyler};
use tailmark::sync::{HtmlFileSurface, ScriptStreamSurface};

/// Follow a text file into a live, styled HTML console
#[derive(Parser, Debug)]
#[command(name = "tailmark", version, about, long_about = None)]
struct Cli {
    /// File to display
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Keep following the file as it grows
    #[arg(short, long)]
    watch: bool,

    /// HTML page to write (default: FILE.html)
    #[arg(short, long, value_name = "PATH", conflicts_with = "emit_script")]
    out: Option<PathBuf>,

    /// Write bootstrap page and scripts to stdout as JSON lines
    #[arg(long)]
    emit_script: bool,

    /// JSON5 file with regex style rules
    #[arg(long, value_name = "PATH", conflicts_with = "syntax")]
    rules: Option<PathBuf>,

    /// Highlight the file as source code in this language
    #[arg(long, value_name = "LANG")]
    syntax: Option<String>,

    /// Page colors and syntax theme background
    #[arg(long, value_enum)]
    theme: Option<ThemeMode>,

    /// Delay between a change and the page update
    #[arg(long, value_name = "MS")]
    debounce_ms: Option<u64>,

    /// Delay before retrying a failed update (default: debounce)
    #[arg(long, value_name = "MS")]
    retry_period_ms: Option<u64>,

    /// Multiply the retry delay by this factor after each failure
    #[arg(long, value_name = "FACTOR")]
    retry_backoff: Option<f64>,

    /// Upper bound for the retry delay
    #[arg(long, value_name = "MS")]
    retry_max_period_ms: Option<u64>,

    /// Give up after this many consecutive failures (default: never)
    #[arg(long, value_name = "N")]
    retry_limit: Option<u32>,

    /// Do not scroll the page to the bottom after updates
    #[arg(long)]
    no_scroll: bool,

    /// Print timing of internal phases to stderr
    #[arg(long)]
    perf: bool,

    /// Write detailed sync/watch debug events to a file
    #[arg(long, value_name = "PATH")]
    render_debug_log: Option<PathBuf>,

    /// Save current command-line flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,
}

impl Cli {
    fn flags(&self) -> ConfigFlags {
        ConfigFlags {
            watch: self.watch,
            no_scroll: self.no_scroll,
            emit_script: self.emit_script,
            perf: self.perf,
            theme: self.theme,
            out: self.out.clone(),
            rules: self.rules.clone(),
            syntax: self.syntax.clone(),
            debounce_ms: self.debounce_ms,
            retry_period_ms: self.retry_period_ms,
            retry_backoff: self.retry_backoff,
            retry_max_period_ms: self.retry_max_period_ms,
            retry_limit: self.retry_limit,
            render_debug_log: self.render_debug_log.clone(),
        }
    }
}

fn default_out_path(file: &Path) -> PathBuf {
    let mut name = file.as_os_str().to_owned();
    name.push(".html");
    PathBuf::from(name)
}

fn line_styler(flags: &ConfigFlags) -> Result<Rc<dyn LineStyler>> {
    if let Some(path) = &flags.rules {
        let styler = RuleStyler::load(path)
            .with_context(|| format!("Failed to load style rules {}", path.display()))?;
        return Ok(Rc::new(styler));
    }
    if let Some(language) = &flags.syntax {
        let styler = SyntaxStyler::for_language(language)
            .with_context(|| format!("Unknown syntax: {language}"))?;
        return Ok(Rc::new(styler));
    }
    Ok(Rc::new(RuleStyler::log_levels()))
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = cli.flags();

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let mut effective = file_flags.union(&cli_flags);
    if cli.emit_script {
        effective.out = None;
    }

    perf::set_enabled(effective.perf);
    let render_debug_log_path = effective
        .render_debug_log
        .clone()
        .or_else(|| std::env::var_os("TAILMARK_RENDER_DEBUG_LOG").map(PathBuf::from));
    if let Err(err) = perf::set_debug_log_path(render_debug_log_path.as_deref()) {
        tracing::warn!(
            "Failed to initialize render debug log {}: {err}",
            render_debug_log_path
                .as_ref()
                .map_or_else(|| "<unset>".to_string(), |p| p.display().to_string()),
        );
    }

    match effective.theme.unwrap_or(ThemeMode::Auto) {
        ThemeMode::Auto => set_background_mode(None),
        ThemeMode::Light => set_background_mode(Some(HighlightBackground::Light)),
        ThemeMode::Dark => set_background_mode(Some(HighlightBackground::Dark)),
    }

    if !cli.file.exists() {
        anyhow::bail!("File not found: {}", cli.file.display());
    }

    let styler = line_styler(&effective)?;
    let builder = StyledConsole::builder()
        .with_config(effective.sync_config())
        .with_theme(page_theme());
    let console = if effective.emit_script {
        builder.build(ScriptStreamSurface::new(std::io::stdout()))
    } else {
        let out = effective
            .out
            .clone()
            .unwrap_or_else(|| default_out_path(&cli.file));
        tracing::info!(out = %out.display(), "writing console page");
        builder.build(HtmlFileSurface::new(out))
    }
    .context("Failed to start render surface")?;
    console.set_line_styler(Some(styler));

    let mut app = App::new(cli.file).with_watch(effective.watch);
    app.run(&console).context("Application error")?;
    Ok(())
}
