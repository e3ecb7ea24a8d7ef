use anyhow::{Result, bail};
use chrono::{DateTime, Utc};

use liftgrid_core::auth::{AuthFailure, AuthResult, Credential, CredentialStore};

use crate::AuthCommands;
use crate::app::{App, SurfaceKind};

pub async fn run_auth_command(command: AuthCommands, app: &App) -> Result<()> {
    match command {
        AuthCommands::Login { manual, no_browser } => {
            let kind = if manual {
                SurfaceKind::Manual
            } else {
                SurfaceKind::Loopback {
                    browser: !no_browser,
                }
            };
            login(app, kind).await
        }
        AuthCommands::Code { code } => complete_with_code(app, &code).await,
        AuthCommands::Status => {
            let credential = app.credential_store().load().await;
            println!("{}", describe_credential(credential.as_ref(), Utc::now()));
            Ok(())
        }
        AuthCommands::Logout => {
            app.credential_manager(SurfaceKind::Manual)?.logout().await?;
            println!("Signed out.");
            Ok(())
        }
    }
}

async fn login(app: &App, kind: SurfaceKind) -> Result<()> {
    let manager = app.credential_manager(kind)?;
    match manager.authenticate().await? {
        AuthResult::Authorized { source, .. } => {
            println!("Signed in ({source}).");
            Ok(())
        }
        AuthResult::Failed(AuthFailure::RedirectRequired { auth_url }) => {
            println!("Open this URL in a browser and approve access:\n\n  {auth_url}\n");
            println!("Then run `liftgrid auth code <CODE>` with the code from the redirect.");
            Ok(())
        }
        AuthResult::Failed(failure) => bail!("sign-in failed: {failure}"),
    }
}

async fn complete_with_code(app: &App, code: &str) -> Result<()> {
    let manager = app.credential_manager(SurfaceKind::Manual)?;
    match manager.handle_auth_code(code).await? {
        AuthResult::Authorized { .. } => {
            println!("Signed in.");
            Ok(())
        }
        AuthResult::Failed(failure) => bail!("sign-in failed: {failure}"),
    }
}

/// One-line summary of the persisted credential.
pub fn describe_credential(credential: Option<&Credential>, now: DateTime<Utc>) -> String {
    let Some(credential) = credential else {
        return "Not signed in.".to_string();
    };
    let expiry = credential.expiry.format("%Y-%m-%d %H:%M UTC");
    if credential.is_valid_at(now) {
        format!("Signed in; access token valid until {expiry}.")
    } else if credential.has_refresh_token() {
        format!("Access token expired at {expiry}; it will be refreshed on next use.")
    } else {
        format!("Access token expired at {expiry}; run `liftgrid auth login`.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::test_app;
    use chrono::{Duration, TimeZone};
    use liftgrid_core::auth::AccessToken;
    use liftgrid_test_utils::FakeGoogle;

    fn credential(expiry: DateTime<Utc>, refresh: Option<&str>) -> Credential {
        Credential {
            access_token: AccessToken::new("at"),
            refresh_token: refresh.map(str::to_owned),
            expiry,
        }
    }

    #[test]
    fn describe_each_credential_state() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

        assert_eq!(describe_credential(None, now), "Not signed in.");

        let valid = credential(now + Duration::hours(1), Some("rt"));
        assert!(describe_credential(Some(&valid), now).starts_with("Signed in"));

        let refreshable = credential(now - Duration::hours(1), Some("rt"));
        assert!(describe_credential(Some(&refreshable), now).contains("refreshed on next use"));

        let dead = credential(now - Duration::hours(1), None);
        assert!(describe_credential(Some(&dead), now).contains("liftgrid auth login"));
    }

    #[test]
    fn token_inside_margin_is_not_reported_valid() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let almost = credential(now + Duration::seconds(60), Some("rt"));
        assert!(describe_credential(Some(&almost), now).contains("expired"));
    }

    #[tokio::test]
    async fn manual_login_then_code_then_logout() {
        let fake = FakeGoogle::start().await;
        let app = test_app(&fake).await;

        run_auth_command(
            AuthCommands::Login {
                manual: true,
                no_browser: false,
            },
            &app,
        )
        .await
        .unwrap();
        assert_eq!(fake.code_exchanges(), 0);

        run_auth_command(
            AuthCommands::Code {
                code: "pasted".to_string(),
            },
            &app,
        )
        .await
        .unwrap();
        assert_eq!(fake.code_exchanges(), 1);
        assert!(app.credential_store().load().await.is_some());

        run_auth_command(AuthCommands::Logout, &app).await.unwrap();
        assert_eq!(fake.revocations(), 1);
        assert!(app.credential_store().load().await.is_none());
    }

    #[tokio::test]
    async fn rejected_code_is_an_error() {
        let fake = FakeGoogle::start().await;
        fake.reject_tokens(400, r#"{"error":"invalid_grant"}"#);
        let app = test_app(&fake).await;

        let result = run_auth_command(
            AuthCommands::Code {
                code: "stale".to_string(),
            },
            &app,
        )
        .await;
        assert!(result.is_err());
        assert!(app.credential_store().load().await.is_none());
    }
}
