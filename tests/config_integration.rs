use std::path::PathBuf;

use tailmark::config::{ConfigFlags, ThemeMode, load_config_flags, parse_flag_tokens};
use tailmark::sync::RetryPolicy;

#[test]
fn test_config_file_parsing_ignores_comments_and_blank_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".tailmarkrc");
    let content = r"
# comment
--watch

--theme light

--render-debug-log=render.log
--retry-limit 3
";
    std::fs::write(&path, content).unwrap();

    let flags = load_config_flags(&path).unwrap();
    assert!(flags.watch);
    assert_eq!(flags.theme, Some(ThemeMode::Light));
    assert_eq!(flags.render_debug_log, Some(PathBuf::from("render.log")));
    assert_eq!(flags.retry_limit, Some(3));
}

#[test]
fn test_cli_flags_override_file_flags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".tailmarkrc");
    let content = "--watch\n--theme light\n--render-debug-log file.log\n--debounce-ms 300\n";
    std::fs::write(&path, content).unwrap();

    let file_flags = load_config_flags(&path).unwrap();
    let cli_args = vec![
        "tailmark".to_string(),
        "--theme".to_string(),
        "dark".to_string(),
        "--no-scroll".to_string(),
        "--debounce-ms=20".to_string(),
    ];
    let cli_flags = parse_flag_tokens(&cli_args);

    let effective = file_flags.union(&cli_flags);
    assert!(effective.watch, "file flags should remain enabled");
    assert!(effective.no_scroll, "cli flags should be applied");
    assert_eq!(effective.theme, Some(ThemeMode::Dark), "cli should override theme");
    assert_eq!(effective.debounce_ms, Some(20), "cli should override debounce");
    assert_eq!(
        effective.render_debug_log,
        Some(PathBuf::from("file.log")),
        "file config should be preserved when CLI does not override"
    );
}

#[test]
fn test_parse_flag_tokens_handles_equals_syntax() {
    let args = vec![
        "tailmark".to_string(),
        "--theme=dark".to_string(),
        "--rules=rules.json5".to_string(),
        "--retry-backoff=2.5".to_string(),
    ];
    let flags = parse_flag_tokens(&args);
    assert_eq!(flags.theme, Some(ThemeMode::Dark));
    assert_eq!(flags.rules, Some(PathBuf::from("rules.json5")));
    assert_eq!(flags.retry_backoff, Some(2.5));
}

#[test]
fn test_config_union_merges_booleans() {
    let file = ConfigFlags {
        watch: true,
        emit_script: true,
        ..ConfigFlags::default()
    };
    let cli = ConfigFlags {
        no_scroll: true,
        perf: true,
        ..ConfigFlags::default()
    };
    let merged = file.union(&cli);
    assert!(merged.watch);
    assert!(merged.emit_script);
    assert!(merged.no_scroll);
    assert!(merged.perf);
}

#[test]
fn test_flag_file_drives_sync_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".tailmarkrc");
    std::fs::write(
        &path,
        "--debounce-ms 50\n--retry-period-ms 500\n--retry-limit 10\n--no-scroll\n",
    )
    .unwrap();

    let config = load_config_flags(&path).unwrap().sync_config();
    assert_eq!(config.debounce_ms, 50);
    assert_eq!(
        config.retry,
        RetryPolicy {
            max_attempts: Some(10),
            ..RetryPolicy::fixed(500)
        }
    );
    assert!(!config.scroll_on_append);
}
