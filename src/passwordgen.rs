//! Generated credential passwords: 16 alphanumeric characters from a
//! cryptographically secure source (§4.1.1, §8 invariant 6).

use rand::Rng;
use rand::distributions::Alphanumeric;

pub const PASSWORD_LEN: usize = 16;

pub fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(PASSWORD_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_password_is_16_alphanumeric_chars() {
        for _ in 0..50 {
            let pw = generate_password();
            assert_eq!(pw.len(), PASSWORD_LEN);
            assert!(pw.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn generated_passwords_are_not_constant() {
        let a = generate_password();
        let b = generate_password();
        assert_ne!(a, b);
    }
}
