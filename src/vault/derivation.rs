//! Substrate derivation paths
//!
//! Grammar: `(//hard | /soft)* (///password)?`. The empty path is the root key.
//! The password never leaves this type: [`DerivationPath::public_path`] is the
//! text that may be stored and displayed.

use bip39::Mnemonic;
use zeroize::Zeroizing;

use super::secure_memory::SecureString;
use super::VaultError;
use crate::crypto::Junction;

const PASSWORD_MARKER: &str = "///";

#[derive(Debug, Clone)]
pub struct DerivationPath {
    public_path: String,
    junctions: Vec<Junction>,
    password: Option<SecureString>,
}

impl DerivationPath {
    pub fn root() -> Self {
        Self {
            public_path: String::new(),
            junctions: Vec::new(),
            password: None,
        }
    }

    pub fn parse(path: &str) -> Result<Self, VaultError> {
        let (public_path, password) = match path.find(PASSWORD_MARKER) {
            Some(at) => {
                let pwd = &path[at + PASSWORD_MARKER.len()..];
                if pwd.is_empty() {
                    return Err(VaultError::InvalidPath("empty password".to_string()));
                }
                (&path[..at], Some(SecureString::new(pwd)))
            }
            None => (path, None),
        };

        let junctions = parse_junctions(public_path)?;
        Ok(Self {
            public_path: public_path.to_string(),
            junctions,
            password,
        })
    }

    /// Same path with a password taken from elsewhere (the unlock proof)
    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(SecureString::new(password));
        self
    }

    pub fn public_path(&self) -> &str {
        &self.public_path
    }

    pub fn junctions(&self) -> &[Junction] {
        &self.junctions
    }

    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    pub fn has_soft_junction(&self) -> bool {
        self.junctions.iter().any(|j| !j.is_hard())
    }

    /// 32-byte mini secret for this path's password
    pub fn mini_secret(&self, phrase: &str) -> Result<Zeroizing<[u8; 32]>, VaultError> {
        let password = self.password.as_ref().map(|p| p.as_str()).unwrap_or("");
        mini_secret(phrase, password)
    }
}

fn parse_junctions(path: &str) -> Result<Vec<Junction>, VaultError> {
    let mut junctions = Vec::new();
    let mut rest = path;

    while !rest.is_empty() {
        let hard = rest.starts_with("//");
        let body = if hard {
            &rest[2..]
        } else if let Some(body) = rest.strip_prefix('/') {
            body
        } else {
            return Err(VaultError::InvalidPath(format!(
                "junction must start with '/': {}",
                rest
            )));
        };

        let end = body.find('/').unwrap_or(body.len());
        let segment = &body[..end];
        if segment.is_empty() {
            return Err(VaultError::InvalidPath("empty junction".to_string()));
        }
        junctions.push(if hard {
            Junction::hard(segment)
        } else {
            Junction::soft(segment)
        });
        rest = &body[end..];
    }

    Ok(junctions)
}

/// Check that a phrase is a valid BIP-39 English mnemonic
pub fn validate_phrase(phrase: &str) -> Result<(), VaultError> {
    Mnemonic::parse_normalized(phrase)
        .map(|_| ())
        .map_err(|e| VaultError::InvalidSeedPhrase(e.to_string()))
}

/// First half of the BIP-39 seed for `phrase` and `password`
pub fn mini_secret(phrase: &str, password: &str) -> Result<Zeroizing<[u8; 32]>, VaultError> {
    let mnemonic = Mnemonic::parse_normalized(phrase)
        .map_err(|e| VaultError::InvalidSeedPhrase(e.to_string()))?;
    let seed = Zeroizing::new(mnemonic.to_seed_normalized(password));

    let mut mini = Zeroizing::new([0u8; 32]);
    mini.copy_from_slice(&seed[..32]);
    Ok(mini)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::TEST_PHRASE;

    #[test]
    fn test_parse_mixed_path() {
        let path = DerivationPath::parse("//polkadot/0//stash").unwrap();
        assert_eq!(path.junctions().len(), 3);
        assert!(path.junctions()[0].is_hard());
        assert!(!path.junctions()[1].is_hard());
        assert!(path.junctions()[2].is_hard());
        assert!(path.has_soft_junction());
        assert!(!path.has_password());
    }

    #[test]
    fn test_password_split_off() {
        let path = DerivationPath::parse("//westend///secret pass").unwrap();
        assert_eq!(path.public_path(), "//westend");
        assert!(path.has_password());
        assert!(!format!("{:?}", path).contains("secret pass"));
    }

    #[test]
    fn test_root_path() {
        let path = DerivationPath::parse("").unwrap();
        assert!(path.junctions().is_empty());
        assert_eq!(path.public_path(), "");
    }

    #[test]
    fn test_invalid_paths() {
        for bad in ["westend", "//", "//a//", "/a//", "//a///"] {
            assert!(
                matches!(DerivationPath::parse(bad), Err(VaultError::InvalidPath(_))),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_mini_secret_depends_on_password() {
        let plain = mini_secret(TEST_PHRASE, "").unwrap();
        let with_pwd = mini_secret(TEST_PHRASE, "pwd").unwrap();
        assert_ne!(*plain, *with_pwd);
    }

    #[test]
    fn test_bad_phrase() {
        assert!(matches!(
            validate_phrase("not a real mnemonic"),
            Err(VaultError::InvalidSeedPhrase(_))
        ));
        assert!(validate_phrase(TEST_PHRASE).is_ok());
    }
}
