use rand::{distributions::Alphanumeric, Rng};
use sha2::{Digest, Sha256};

const RESET_TOKEN_LEN: usize = 48;

/// A fresh password-reset token: the plain value goes to the user, only the
/// hash is stored.
pub fn generate_reset_token() -> (String, String) {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RESET_TOKEN_LEN)
        .map(char::from)
        .collect();
    let hash = hash_reset_token(&token);
    (token, hash)
}

pub fn hash_reset_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.trim().as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_hash_matches_the_handed_out_token() {
        let (token, hash) = generate_reset_token();
        assert_eq!(token.len(), RESET_TOKEN_LEN);
        assert_eq!(hash.len(), 64);
        assert_eq!(hash_reset_token(&token), hash);
        assert_ne!(hash_reset_token("something-else"), hash);
    }

    #[test]
    fn tokens_are_unique() {
        let (a, _) = generate_reset_token();
        let (b, _) = generate_reset_token();
        assert_ne!(a, b);
    }
}
