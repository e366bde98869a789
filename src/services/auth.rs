use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::Engine;
use chrono::{Duration, NaiveDateTime, Utc};
use hmac::{Hmac, Mac};
use rusqlite::Connection;
use serde::Deserialize;
use sha1::Sha1;
use uuid::Uuid;

use crate::db::queries;
use crate::models::{Identity, User};
use crate::services::forms::{FieldErrors, MSG_REQUIRED};

pub const LOGIN_URL: &str = "/accounts/login/";
pub const SESSION_COOKIE: &str = "sessionid";
pub const MSG_LOGIN_FAILED: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

const SESSION_TTL_DAYS: i64 = 14;
const USERNAME_MAX: usize = 150;
const PASSWORD_MIN: usize = 8;

// ── Passwords ──

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?;
    Ok(hash.to_string())
}

/// True only when the password matches the stored PHC hash. A hash that
/// fails to parse counts as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

// ── Signup ──

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

/// Validate the signup form and create the account. The inner result carries
/// field errors for re-rendering; the outer one is for storage failures.
pub fn signup(conn: &Connection, form: &SignupForm) -> anyhow::Result<Result<User, FieldErrors>> {
    let mut errors = FieldErrors::new();
    let username = form.username.trim();

    if username.is_empty() {
        push(&mut errors, "username", MSG_REQUIRED.to_string());
    } else {
        let len = username.chars().count();
        if len > USERNAME_MAX {
            push(
                &mut errors,
                "username",
                format!("Ensure this value has at most {USERNAME_MAX} characters (it has {len})."),
            );
        } else if !username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
        {
            push(
                &mut errors,
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                    .to_string(),
            );
        } else if queries::username_exists(conn, username)? {
            push(
                &mut errors,
                "username",
                "A user with that username already exists.".to_string(),
            );
        }
    }

    if form.password1.is_empty() {
        push(&mut errors, "password1", MSG_REQUIRED.to_string());
    }
    if form.password2.is_empty() {
        push(&mut errors, "password2", MSG_REQUIRED.to_string());
    } else if !form.password1.is_empty() {
        if form.password1 != form.password2 {
            push(
                &mut errors,
                "password2",
                "The two password fields didn’t match.".to_string(),
            );
        } else {
            if form.password2.chars().count() < PASSWORD_MIN {
                push(
                    &mut errors,
                    "password2",
                    format!(
                        "This password is too short. It must contain at least {PASSWORD_MIN} characters."
                    ),
                );
            }
            if form.password2.chars().all(|c| c.is_ascii_digit()) {
                push(
                    &mut errors,
                    "password2",
                    "This password is entirely numeric.".to_string(),
                );
            }
        }
    }

    if !errors.is_empty() {
        return Ok(Err(errors));
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        username: username.to_string(),
        password_hash: hash_password(&form.password1)?,
        is_staff: false,
        is_superuser: false,
        created_at: Utc::now().naive_utc(),
    };

    // The unique index is the last word; a concurrent signup with the same
    // name loses here rather than at the earlier existence check.
    if !queries::create_user(conn, &user)? {
        push(
            &mut errors,
            "username",
            "A user with that username already exists.".to_string(),
        );
        return Ok(Err(errors));
    }

    tracing::info!(username = %user.username, "account created");
    Ok(Ok(user))
}

fn push(errors: &mut FieldErrors, field: &str, message: String) {
    errors.entry(field.to_string()).or_default().push(message);
}

// ── Login ──

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: String,
}

/// Check credentials without revealing whether the username or the password
/// was wrong.
pub fn authenticate(
    conn: &Connection,
    username: &str,
    password: &str,
) -> anyhow::Result<Option<User>> {
    let Some(user) = queries::get_user_by_username(conn, username.trim())? else {
        return Ok(None);
    };
    if verify_password(password, &user.password_hash) {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}

/// A post-login destination is honored only when it stays on this site:
/// it must be an absolute path and not a scheme-relative `//host` URL.
pub fn safe_next(next: &str) -> Option<&str> {
    if next.starts_with('/') && !next.starts_with("//") {
        Some(next)
    } else {
        None
    }
}

// ── Sessions ──

pub fn create_session(conn: &Connection, user_id: &str) -> anyhow::Result<String> {
    let token = Uuid::new_v4().to_string();
    let expires_at = Utc::now().naive_utc() + Duration::days(SESSION_TTL_DAYS);
    queries::create_session(conn, &token, user_id, &expires_at)?;
    Ok(token)
}

pub fn session_identity(
    conn: &Connection,
    token: &str,
    now: &NaiveDateTime,
) -> anyhow::Result<Option<Identity>> {
    let user = queries::get_session_user(conn, token, now)?;
    Ok(user.as_ref().map(Identity::from))
}

pub fn destroy_session(conn: &Connection, token: &str) -> anyhow::Result<()> {
    queries::delete_session(conn, token)?;
    Ok(())
}

// ── Cookie signing ──

/// Cookie payload: `{token}.{base64url(hmac_sha1(secret, token))}`. The
/// token alone is worthless without a matching signature.
pub fn signed_cookie_value(token: &str, secret: &str) -> anyhow::Result<String> {
    let sig = cookie_signature(token, secret)?;
    Ok(format!("{token}.{sig}"))
}

/// Returns the embedded session token when the signature checks out.
pub fn verify_cookie_value(value: &str, secret: &str) -> Option<String> {
    let (token, sig) = value.split_once('.')?;
    let expected = cookie_signature(token, secret).ok()?;
    if expected == sig {
        Some(token.to_string())
    } else {
        None
    }
}

/// Build the Set-Cookie value that installs a session in the browser.
pub fn session_cookie_header(token: &str, secret: &str) -> anyhow::Result<String> {
    let value = signed_cookie_value(token, secret)?;
    let max_age = SESSION_TTL_DAYS * 24 * 60 * 60;
    Ok(format!(
        "{SESSION_COOKIE}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}"
    ))
}

/// Build the Set-Cookie value that removes the session cookie.
pub fn clear_session_cookie_header() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

fn cookie_signature(token: &str, secret: &str) -> anyhow::Result<String> {
    let mut mac = Hmac::<Sha1>::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("hmac key setup failed: {e}"))?;
    mac.update(token.as_bytes());
    let result = mac.finalize().into_bytes();
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    fn signup_form(username: &str, password: &str) -> SignupForm {
        SignupForm {
            username: username.to_string(),
            password1: password.to_string(),
            password2: password.to_string(),
        }
    }

    #[test]
    fn hash_and_verify_roundtrip() {
        let hash = hash_password("correct-horse-battery").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct-horse-battery", &hash));
        assert!(!verify_password("wrong-horse", &hash));
    }

    #[test]
    fn unparseable_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn signup_creates_a_plain_account() {
        let conn = setup_db();
        let user = signup(&conn, &signup_form("ada", "s3cure-pass")).unwrap().unwrap();
        assert_eq!(user.username, "ada");
        assert!(!user.is_staff);
        assert!(!user.is_superuser);
        assert!(user.password_hash.starts_with("$argon2id$"));
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let conn = setup_db();
        signup(&conn, &signup_form("ada", "s3cure-pass")).unwrap().unwrap();
        let errors = signup(&conn, &signup_form("ada", "other-pass1")).unwrap().unwrap_err();
        assert_eq!(
            errors["username"],
            vec!["A user with that username already exists.".to_string()]
        );
    }

    #[test]
    fn mismatched_passwords_are_rejected() {
        let conn = setup_db();
        let form = SignupForm {
            username: "ada".to_string(),
            password1: "s3cure-pass".to_string(),
            password2: "s3cure-pass!".to_string(),
        };
        let errors = signup(&conn, &form).unwrap().unwrap_err();
        assert_eq!(
            errors["password2"],
            vec!["The two password fields didn’t match.".to_string()]
        );
    }

    #[test]
    fn short_numeric_password_stacks_both_errors() {
        let conn = setup_db();
        let errors = signup(&conn, &signup_form("ada", "123")).unwrap().unwrap_err();
        assert_eq!(
            errors["password2"],
            vec![
                "This password is too short. It must contain at least 8 characters.".to_string(),
                "This password is entirely numeric.".to_string(),
            ]
        );
    }

    #[test]
    fn username_with_disallowed_characters_is_rejected() {
        let conn = setup_db();
        let errors = signup(&conn, &signup_form("ada lovelace", "s3cure-pass"))
            .unwrap()
            .unwrap_err();
        assert!(errors["username"][0].starts_with("Enter a valid username."));
    }

    #[test]
    fn authenticate_checks_both_name_and_password() {
        let conn = setup_db();
        signup(&conn, &signup_form("ada", "s3cure-pass")).unwrap().unwrap();
        assert!(authenticate(&conn, "ada", "s3cure-pass").unwrap().is_some());
        assert!(authenticate(&conn, "ada", "wrong").unwrap().is_none());
        assert!(authenticate(&conn, "nobody", "s3cure-pass").unwrap().is_none());
    }

    #[test]
    fn session_resolves_until_it_expires() {
        let conn = setup_db();
        let user = signup(&conn, &signup_form("ada", "s3cure-pass")).unwrap().unwrap();
        let token = create_session(&conn, &user.id).unwrap();

        let now = Utc::now().naive_utc();
        let identity = session_identity(&conn, &token, &now).unwrap().unwrap();
        assert_eq!(identity.username, "ada");

        let after_expiry = now + Duration::days(SESSION_TTL_DAYS + 1);
        assert!(session_identity(&conn, &token, &after_expiry).unwrap().is_none());
    }

    #[test]
    fn destroyed_session_no_longer_resolves() {
        let conn = setup_db();
        let user = signup(&conn, &signup_form("ada", "s3cure-pass")).unwrap().unwrap();
        let token = create_session(&conn, &user.id).unwrap();
        destroy_session(&conn, &token).unwrap();
        let now = Utc::now().naive_utc();
        assert!(session_identity(&conn, &token, &now).unwrap().is_none());
    }

    #[test]
    fn cookie_signature_roundtrip_and_tamper_detection() {
        let value = signed_cookie_value("token-123", "secret").unwrap();
        assert_eq!(verify_cookie_value(&value, "secret").as_deref(), Some("token-123"));
        assert!(verify_cookie_value(&value, "other-secret").is_none());

        let tampered = value.replacen("token-123", "token-456", 1);
        assert!(verify_cookie_value(&tampered, "secret").is_none());
        assert!(verify_cookie_value("no-separator", "secret").is_none());
    }

    #[test]
    fn session_cookie_is_http_only_and_scoped_to_root() {
        let header = session_cookie_header("token-123", "secret").unwrap();
        assert!(header.starts_with("sessionid=token-123."));
        assert!(header.contains("Path=/"));
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("SameSite=Lax"));

        let cleared = clear_session_cookie_header();
        assert!(cleared.starts_with("sessionid=;"));
        assert!(cleared.contains("Max-Age=0"));
    }

    #[test]
    fn next_must_stay_on_site() {
        assert_eq!(safe_next("/bookings/"), Some("/bookings/"));
        assert_eq!(safe_next("//evil.example.com/"), None);
        assert_eq!(safe_next("https://evil.example.com/"), None);
        assert_eq!(safe_next(""), None);
    }
}
