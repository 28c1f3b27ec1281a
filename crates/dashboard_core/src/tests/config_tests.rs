use super::*;
use std::path::PathBuf;

fn no_env(_: &str) -> Option<String> {
    None
}

fn settings_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "dashboard-settings-{}-{name}.toml",
        std::process::id()
    ));
    fs::write(&path, contents).expect("write settings file");
    path
}

#[test]
fn defaults_apply_without_file_or_env() {
    let settings = load_settings_from(Path::new("/nonexistent/dashboard.toml"), no_env);

    assert_eq!(settings, DashboardSettings::default());
    assert_eq!(settings.fetch_interval(), Duration::from_millis(500));
    assert_eq!(
        settings.api_base_url().expect("url").as_str(),
        "http://127.0.0.1:8000/"
    );
}

#[test]
fn file_values_override_defaults() {
    let path = settings_file(
        "file",
        r#"
api_base_url = "https://admin.example.org"
fetch_interval_ms = 250
superseded_resolution = "ignore"
"#,
    );

    let settings = load_settings_from(&path, no_env);
    let _ = fs::remove_file(&path);

    assert_eq!(settings.api_base_url, "https://admin.example.org");
    assert_eq!(settings.fetch_interval_ms, 250);
    assert_eq!(settings.event_buffer, 256);
    assert_eq!(settings.superseded_resolution, SupersededResolution::Ignore);
}

#[test]
fn environment_wins_over_file() {
    let path = settings_file("env", "fetch_interval_ms = 250\nevent_buffer = 8\n");
    let env = |key: &str| match key {
        "DASHBOARD_API_URL" => Some("http://legacy:9000".to_string()),
        "APP__API_BASE_URL" => Some("http://api:8000".to_string()),
        "APP__FETCH_INTERVAL_MS" => Some("1000".to_string()),
        "APP__EVENT_BUFFER" => Some("not a number".to_string()),
        _ => None,
    };

    let settings = load_settings_from(&path, env);
    let _ = fs::remove_file(&path);

    assert_eq!(settings.api_base_url, "http://api:8000");
    assert_eq!(settings.fetch_interval_ms, 1000);
    assert_eq!(settings.event_buffer, 8);
}

#[test]
fn unparsable_file_is_ignored() {
    let path = settings_file("broken", "api_base_url = [unterminated");

    let settings = load_settings_from(&path, no_env);
    let _ = fs::remove_file(&path);

    assert_eq!(settings, DashboardSettings::default());
}

#[test]
fn api_base_url_must_be_http() {
    assert!(parse_api_base_url("ftp://files.example.org").is_err());
    assert!(parse_api_base_url("not a url").is_err());
    assert_eq!(
        parse_api_base_url(" https://admin.example.org ")
            .expect("https")
            .host_str(),
        Some("admin.example.org")
    );
}
