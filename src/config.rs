use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher};

pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Argon2 PHC string for the admin password. `None` disables admin login.
    pub admin_password_hash: Option<String>,
    /// Take the login rate-limit key from `X-Forwarded-For`. Only safe behind a
    /// reverse proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let admin_password_hash = match std::env::var("O2PARIS_ADMIN_PASSWORD_HASH") {
            Ok(hash) if !hash.trim().is_empty() => {
                let hash = hash.trim().to_string();
                if PasswordHash::new(&hash).is_err() {
                    panic!("O2PARIS_ADMIN_PASSWORD_HASH is not a valid argon2 PHC string");
                }
                Some(hash)
            }
            _ => std::env::var("O2PARIS_ADMIN_PASSWORD")
                .ok()
                .filter(|p| !p.is_empty())
                .map(|password| {
                    hash_password(&password).expect("failed to hash O2PARIS_ADMIN_PASSWORD")
                }),
        };

        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:o2paris.db?mode=rwc".to_string()),
            admin_password_hash,
            trust_forwarded_for: std::env::var("O2PARIS_TRUST_PROXY")
                .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }
}

/// Hash a plaintext password with Argon2id and a random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::PasswordVerifier;
    use serial_test::serial;

    fn clear_env() {
        std::env::remove_var("PORT");
        std::env::remove_var("DATABASE_URL");
        std::env::remove_var("O2PARIS_ADMIN_PASSWORD");
        std::env::remove_var("O2PARIS_ADMIN_PASSWORD_HASH");
        std::env::remove_var("O2PARIS_TRUST_PROXY");
    }

    #[test]
    #[serial]
    fn test_default_config() {
        clear_env();
        let config = Config::from_env();
        assert_eq!(config.port, 3000);
        assert_eq!(config.database_url, "sqlite:o2paris.db?mode=rwc");
        assert!(config.admin_password_hash.is_none());
        assert!(!config.trust_forwarded_for);
    }

    #[test]
    #[serial]
    fn test_trust_proxy_from_env() {
        clear_env();
        std::env::set_var("O2PARIS_TRUST_PROXY", "true");
        assert!(Config::from_env().trust_forwarded_for);
        std::env::set_var("O2PARIS_TRUST_PROXY", "0");
        assert!(!Config::from_env().trust_forwarded_for);
    }

    #[test]
    #[serial]
    fn test_port_from_env() {
        clear_env();
        std::env::set_var("PORT", "8080");
        let config = Config::from_env();
        assert_eq!(config.port, 8080);
    }

    #[test]
    #[serial]
    fn test_invalid_port_falls_back_to_default() {
        clear_env();
        std::env::set_var("PORT", "not_a_number");
        let config = Config::from_env();
        assert_eq!(config.port, 3000);
    }

    #[test]
    #[serial]
    fn test_plaintext_password_is_hashed() {
        clear_env();
        std::env::set_var("O2PARIS_ADMIN_PASSWORD", "fontaine-wallace");
        let config = Config::from_env();
        let hash = config.admin_password_hash.unwrap();
        assert_ne!(hash, "fontaine-wallace");
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(Argon2::default()
            .verify_password(b"fontaine-wallace", &parsed)
            .is_ok());
    }

    #[test]
    #[serial]
    fn test_hash_takes_precedence_over_plaintext() {
        clear_env();
        let hash = hash_password("from-hash").unwrap();
        std::env::set_var("O2PARIS_ADMIN_PASSWORD_HASH", &hash);
        std::env::set_var("O2PARIS_ADMIN_PASSWORD", "from-plaintext");
        let config = Config::from_env();
        assert_eq!(config.admin_password_hash.as_deref(), Some(hash.as_str()));
    }

    #[test]
    #[serial]
    #[should_panic(expected = "not a valid argon2 PHC string")]
    fn test_malformed_hash_panics() {
        clear_env();
        std::env::set_var("O2PARIS_ADMIN_PASSWORD_HASH", "plaintext-oops");
        Config::from_env();
    }
}
