use super::*;

use std::{
    collections::HashMap,
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| vars.get(key).cloned()
}

fn temp_config(contents: &str) -> std::path::PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = env::temp_dir().join(format!("report_cli_config_test_{suffix}"));
    fs::create_dir_all(&temp_root).expect("temp root");
    let path = temp_root.join("report.toml");
    fs::write(&path, contents).expect("write config");
    path
}

#[test]
fn defaults_mirror_dashboard_query() {
    let settings = Settings::default();
    assert_eq!(settings.page_size, 10);
    assert_eq!(settings.token_path, "/oauth/token");
    assert_eq!(settings.base_query.time_range.relative, "PREVIOUS_MONTH");
    assert_eq!(settings.base_query.metrics[0].unique_name, "revenue");
    assert_eq!(settings.base_query.dimensions.len(), 2);
    assert_eq!(settings.credential_source(), CredentialSource::Missing);
}

#[test]
fn file_settings_override_defaults() {
    let path = temp_config(
        r#"
graphql_endpoint = "https://api.example.com/graphql"
token_host = "https://auth.example.com"
client_id = "id"
client_secret = "secret"
page_size = 25
time_range = "PREVIOUS_WEEK"
metrics = ["revenue", "orders"]

[[dimensions]]
column_name = "PRODUCT_NAME"
display_name = "Product name"
"#,
    );

    let mut settings = Settings::default();
    let file_cfg: FileSettings =
        toml::from_str(&fs::read_to_string(&path).expect("read")).expect("parse");
    apply_file(&mut settings, file_cfg);

    assert_eq!(settings.graphql_endpoint, "https://api.example.com/graphql");
    assert_eq!(settings.page_size, 25);
    assert_eq!(settings.base_query.time_range.relative, "PREVIOUS_WEEK");
    assert_eq!(settings.base_query.metrics.len(), 2);
    assert_eq!(settings.base_query.metrics[1].unique_name, "orders");
    assert_eq!(settings.base_query.dimensions.len(), 1);
    assert_eq!(
        settings.credential_source(),
        CredentialSource::ClientCredentials {
            token_host: "https://auth.example.com".into(),
            token_path: "/oauth/token".into(),
            client_id: "id".into(),
            client_secret: "secret".into(),
        }
    );

    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}

#[test]
fn missing_config_file_yields_defaults_plus_env() {
    let path = env::temp_dir().join("report_cli_config_test_missing/report.toml");
    let settings = load_settings(&path);
    assert_eq!(settings.base_query, Settings::default().base_query);
}

#[test]
fn prefixed_env_wins_over_plain_env() {
    let mut settings = Settings::default();
    apply_env(
        &mut settings,
        lookup_from(&[
            ("GRAPHQL_ENDPOINT", "https://plain.example.com/graphql"),
            ("APP__GRAPHQL_ENDPOINT", "https://prefixed.example.com/graphql"),
            ("PAGE_SIZE", "5"),
        ]),
    );

    assert_eq!(
        settings.graphql_endpoint,
        "https://prefixed.example.com/graphql"
    );
    assert_eq!(settings.page_size, 5);
}

#[test]
fn invalid_page_sizes_are_ignored() {
    let mut settings = Settings::default();
    apply_env(&mut settings, lookup_from(&[("PAGE_SIZE", "0")]));
    assert_eq!(settings.page_size, 10);

    apply_env(&mut settings, lookup_from(&[("APP__PAGE_SIZE", "ten")]));
    assert_eq!(settings.page_size, 10);
}

#[test]
fn static_token_wins_over_client_credentials() {
    let mut settings = Settings::default();
    apply_env(
        &mut settings,
        lookup_from(&[
            ("TOKEN_HOST", "https://auth.example.com"),
            ("CLIENT_ID", "id"),
            ("CLIENT_SECRET", "secret"),
            ("ACCESS_TOKEN", "static"),
        ]),
    );
    assert_eq!(
        settings.credential_source(),
        CredentialSource::Static("static".into())
    );
}

#[test]
fn invalid_endpoint_is_reported() {
    let settings = Settings {
        graphql_endpoint: "not a url".into(),
        ..Settings::default()
    };
    assert!(settings.graphql_url().is_err());
}
