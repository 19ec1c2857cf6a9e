use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;

#[allow(dead_code)]
mod common;

use common::http_mock::{start_token_server, token_endpoint};
use common::token_with_life;

fn tesla_auth_cmd(home: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("tesla-auth").unwrap();
    cmd.env("TESLA_AUTH_HOME", home).env_remove("TESLA_AUTH_LOG");
    cmd
}

fn read_record(home: &std::path::Path) -> serde_json::Value {
    let data = std::fs::read_to_string(home.join("auth_data.json")).unwrap();
    serde_json::from_str(&data).unwrap()
}

#[test]
fn status_without_token() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().join(".tesla");
    tesla_auth_cmd(&home)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No valid access token found."));
}

#[test]
fn status_reports_life_remaining() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().join(".tesla");
    let storage = tesla_auth::SecureStorage::open_in(&home).unwrap();
    storage.store_access_token(&token_with_life(70)).unwrap();

    tesla_auth_cmd(&home)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Expiration Time:"))
        .stdout(predicate::str::contains("UTC"))
        .stdout(predicate::str::contains("Life Remaining:"));
}

#[test]
fn config_stores_answers_with_private_permissions() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().join(".tesla");
    tesla_auth_cmd(&home)
        .arg("config")
        .write_stdin("5YJ3E1EA7KF000000\nhttps://proxy.local:4443/\nmy-client\nmy-secret\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration stored successfully."));

    let record = read_record(&home);
    assert_eq!(record["vin"], "5YJ3E1EA7KF000000");
    assert_eq!(record["proxy_url"], "https://proxy.local:4443");
    assert_eq!(record["client_id"], "my-client");
    assert_eq!(record["client_secret"], "my-secret");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let dir_mode = std::fs::metadata(&home).unwrap().permissions().mode() & 0o777;
        let file_mode = std::fs::metadata(home.join("auth_data.json"))
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(dir_mode, 0o700);
        assert_eq!(file_mode, 0o600);
    }
}

#[test]
fn token_unavailable_fails() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().join(".tesla");
    tesla_auth_cmd(&home)
        .arg("token")
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("No access token available"));
}

#[test]
fn refresh_without_client_id_fails() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().join(".tesla");
    tesla_auth_cmd(&home)
        .arg("refresh")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Client ID is missing"));
}

#[test]
fn login_without_client_id_fails() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().join(".tesla");
    tesla_auth_cmd(&home)
        .args(["login", "--callback", "https://example.com/auth/callback", "--no-browser"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Client ID is missing"));
}

#[test]
fn login_manual_state_mismatch_fails() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().join(".tesla");
    let storage = tesla_auth::SecureStorage::open_in(&home).unwrap();
    storage.store_client_id("my-client").unwrap();

    tesla_auth_cmd(&home)
        .args(["login", "--callback", "https://example.com/auth/callback", "--no-browser"])
        .write_stdin("forged\ncode\n")
        .assert()
        .failure()
        .stdout(predicate::str::contains("Authorization URL: https://auth.tesla.com/oauth2/v3/authorize?"))
        .stderr(predicate::str::contains("State mismatch"));
}

#[test]
fn clear_client_only_keeps_vin() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().join(".tesla");
    let storage = tesla_auth::SecureStorage::open_in(&home).unwrap();
    storage.store_client_id("id").unwrap();
    storage.store_client_secret("secret").unwrap();
    storage.store_vin("vin").unwrap();

    tesla_auth_cmd(&home)
        .args(["clear", "--client-only"])
        .assert()
        .success();

    let record = read_record(&home);
    assert!(record.get("client_id").is_none());
    assert!(record.get("client_secret").is_none());
    assert_eq!(record["vin"], "vin");
}

#[tokio::test(flavor = "multi_thread")]
async fn token_refreshes_stale_token_against_endpoint() {
    let fresh = token_with_life(100);
    let server = start_token_server(
        "refresh_token",
        200,
        json!({
            "access_token": fresh.clone(),
            "refresh_token": "new-refresh",
            "token_type": "Bearer",
            "expires_in": 28800
        }),
    )
    .await;
    let endpoint = token_endpoint(&server);

    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().join(".tesla");
    let storage = tesla_auth::SecureStorage::open_in(&home).unwrap();
    storage.store_client_id("my-client").unwrap();
    storage
        .store_token_pair(&token_with_life(10), "old-refresh")
        .unwrap();

    let expected = format!("{fresh}\n");
    let home_for_cmd = home.clone();
    tokio::task::spawn_blocking(move || {
        tesla_auth_cmd(&home_for_cmd)
            .arg("token")
            .env("TESLA_AUTH_TOKEN_ENDPOINT", endpoint)
            .assert()
            .success()
            .stdout(predicate::str::diff(expected));
    })
    .await
    .unwrap();

    assert_eq!(read_record(&home)["refresh_token"], "new-refresh");
}
