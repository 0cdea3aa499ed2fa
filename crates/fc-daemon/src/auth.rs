//! Signup / login collaborator.
//!
//! Authentication here is deliberately primitive: tokens are random strings,
//! and the stored hash is a salted SHA-256 stand-in for a real KDF.  What
//! matters is the side effect: guest carts migrate to the issued user token
//! on every signup and login.

use chrono::Utc;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use fc_schemas::{DomainError, User};
use fc_store::Tables;

/// Issued session: the token supersedes any guest token the client held.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_token: String,
    pub user: User,
}

fn issue_user_token(user_id: i64) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("user-{user_id}-{}", &hex[..12])
}

fn hash_password(plain: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    let digest = salted_digest(&salt, plain);
    format!("sha256${salt}${digest}")
}

fn verify_password(plain: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("sha256"), Some(salt), Some(digest)) => salted_digest(salt, plain) == digest,
        _ => false,
    }
}

fn salted_digest(salt: &str, plain: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(plain.as_bytes());
    let bytes = hasher.finalize();
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// Register a new user, issue a token, and migrate any guest carts.
///
/// `Conflict` when the (lowercased) email is already registered.
pub fn signup(
    tx: &mut Tables,
    email: &str,
    password: &str,
    display_name: Option<&str>,
    guest_token: Option<&str>,
) -> Result<AuthSession, DomainError> {
    let email = email.to_lowercase();
    if tx.user_by_email(&email).is_some() {
        return Err(DomainError::Conflict(
            "Email already registered".to_string(),
        ));
    }

    let display_name = display_name
        .map(str::to_string)
        .unwrap_or_else(|| email.split('@').next().unwrap_or(&email).to_string());

    let user_id = tx.insert_user(User {
        id: 0, // store-allocated
        email: email.clone(),
        password_hash: hash_password(password),
        display_name,
        created_at: Utc::now(),
    });

    let user_token = issue_user_token(user_id);
    if let Some(guest) = guest_token {
        fc_cart::migrate_cart(tx, guest, &user_token);
    }

    let user = tx.users.get(&user_id).cloned().ok_or_else(|| {
        DomainError::NotFound("User not found".to_string()) // unreachable
    })?;
    Ok(AuthSession { user_token, user })
}

/// Verify credentials, issue a fresh token, and migrate any guest carts.
///
/// Returns `None` for unknown email or wrong password (the handler maps
/// this to 401; credential failures sit outside the domain taxonomy).
pub fn login(
    tx: &mut Tables,
    email: &str,
    password: &str,
    guest_token: Option<&str>,
) -> Option<AuthSession> {
    let email = email.to_lowercase();
    let user = tx.user_by_email(&email)?.clone();
    if !verify_password(password, &user.password_hash) {
        return None;
    }

    let user_token = issue_user_token(user.id);
    if let Some(guest) = guest_token {
        fc_cart::migrate_cart(tx, guest, &user_token);
    }
    Some(AuthSession { user_token, user })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let h = hash_password("hunter2");
        assert!(verify_password("hunter2", &h));
        assert!(!verify_password("hunter3", &h));
    }

    #[test]
    fn hashes_are_salted() {
        assert_ne!(hash_password("same"), hash_password("same"));
    }

    #[test]
    fn verify_rejects_malformed_stored_hash() {
        assert!(!verify_password("x", "plaintext"));
        assert!(!verify_password("x", "md5$a$b"));
    }

    #[test]
    fn signup_lowercases_email_and_defaults_display_name() {
        let mut t = Tables::default();
        let s = signup(&mut t, "Alice@Example.COM", "pw", None, None).unwrap();
        assert_eq!(s.user.email, "alice@example.com");
        assert_eq!(s.user.display_name, "alice");
        assert!(s.user_token.starts_with("user-1-"));
    }

    #[test]
    fn duplicate_email_is_conflict() {
        let mut t = Tables::default();
        signup(&mut t, "a@b.c", "pw", None, None).unwrap();
        let err = signup(&mut t, "A@B.C", "other", None, None).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn login_issues_fresh_token_per_session() {
        let mut t = Tables::default();
        signup(&mut t, "a@b.c", "pw", None, None).unwrap();
        let s1 = login(&mut t, "a@b.c", "pw", None).unwrap();
        let s2 = login(&mut t, "a@b.c", "pw", None).unwrap();
        assert_ne!(s1.user_token, s2.user_token);
        assert!(login(&mut t, "a@b.c", "wrong", None).is_none());
        assert!(login(&mut t, "unknown@b.c", "pw", None).is_none());
    }

    #[test]
    fn signup_migrates_guest_cart() {
        let mut t = Tables::default();
        fc_store::seed::seed_demo_catalog(&mut t);
        let menu = t.menus.keys().next().copied().unwrap();
        fc_cart::add_item(&mut t, "guest-9", menu, 2).unwrap();

        let s = signup(&mut t, "a@b.c", "pw", None, Some("guest-9")).unwrap();
        let view = fc_cart::get_cart(&mut t, &s.user_token).unwrap();
        assert_eq!(view.items.len(), 1);
        assert!(t.carts.values().all(|c| c.user_token != "guest-9"));
    }
}
