use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use regex::Regex;
use std::sync::OnceLock;
use tracing::error;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 4096;
const MAX_SIMILARITY: f64 = 0.7;

const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "password12", "password123", "password1234", "passw0rd",
    "p@ssw0rd", "p@ssword", "12345678", "123456789", "1234567890", "0123456789",
    "87654321", "11111111", "00000000", "12341234", "11223344", "qwertyui", "qwerty123",
    "qwertyuiop", "1q2w3e4r", "1qaz2wsx", "zaq12wsx", "q1w2e3r4", "asdfghjk", "asdfasdf",
    "zxcvbnm1", "iloveyou", "iloveyou1", "sunshine", "princess", "football", "baseball",
    "basketball", "superman", "batman123", "whatever", "trustno1", "letmein1", "welcome1",
    "welcome123", "admin123", "administrator", "changeme", "changeme1", "computer",
    "internet", "starwars", "jennifer", "michelle", "chocolate", "butterfly", "charlie1",
    "dragon12", "monkey12", "mustang1", "master12", "shadow12", "abcd1234", "abc12345",
    "aa123456", "a1b2c3d4", "access14", "passpass", "testtest", "test1234", "football1",
    "sweetie1", "cookie12", "candy123", "liverpool", "pokemon1", "qazwsxedc",
];

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    #[cfg(test)]
    VERIFY_CALLS.with(|calls| calls.set(calls.get() + 1));

    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
thread_local! {
    static VERIFY_CALLS: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

/// Argon2 verifications made on the current thread.
#[cfg(test)]
pub(crate) fn verify_calls() -> usize {
    VERIFY_CALLS.with(std::cell::Cell::get)
}

/// Hash checked when the login username does not exist, so both failure
/// paths cost one argon2 verification.
pub fn dummy_hash() -> anyhow::Result<&'static str> {
    static DUMMY: OnceLock<String> = OnceLock::new();
    if let Some(hash) = DUMMY.get() {
        return Ok(hash);
    }
    let hash = hash_password("sweetshop-no-such-user")?;
    Ok(DUMMY.get_or_init(|| hash))
}

/// Runs every strength rule and returns all messages that apply.
/// An empty result means the password is acceptable.
pub fn password_problems(password: &str, username: &str, email: &str) -> Vec<String> {
    let mut problems = Vec::new();

    if password.chars().count() > MAX_PASSWORD_LENGTH {
        problems.push(format!(
            "Ensure this field has no more than {} characters.",
            MAX_PASSWORD_LENGTH
        ));
        return problems;
    }

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        problems.push(format!(
            "This password is too short. It must contain at least {} characters.",
            MIN_PASSWORD_LENGTH
        ));
    }

    let lowered = password.trim().to_lowercase();
    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        problems.push("This password is too common.".to_string());
    }

    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.".to_string());
    }

    for (value, label) in [(username, "username"), (email, "email address")] {
        if too_similar(&lowered, value) {
            problems.push(format!("The password is too similar to the {}.", label));
        }
    }

    problems
}

fn too_similar(password: &str, attribute: &str) -> bool {
    lazy_static! {
        static ref NON_WORD: Regex = Regex::new(r"\W+").unwrap();
    }
    let attribute = attribute.trim().to_lowercase();
    if password.is_empty() || attribute.is_empty() {
        return false;
    }
    let password_len = password.chars().count();
    std::iter::once(attribute.as_str())
        .chain(NON_WORD.split(&attribute))
        .filter(|part| !part.is_empty())
        .filter(|part| can_reach_threshold(password_len, part.chars().count()))
        .any(|part| similarity(password, part) >= MAX_SIMILARITY)
}

/// The ratio never exceeds `2 * min / (a + b)`, so lopsided pairs are
/// skipped without comparing characters.
fn can_reach_threshold(a: usize, b: usize) -> bool {
    2.0 * a.min(b) as f64 / (a + b) as f64 >= MAX_SIMILARITY
}

/// Ratcliff/Obershelp ratio: twice the matched characters over the combined length.
fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 0.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let (len, at_a, at_b) = longest_match(a, b);
    if len == 0 {
        return 0;
    }
    len + matching_chars(&a[..at_a], &b[..at_b])
        + matching_chars(&a[at_a + len..], &b[at_b + len..])
}

/// Longest common block as `(len, start_a, start_b)`, earliest in `a` first.
fn longest_match(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let (mut len, mut at_a, mut at_b) = (0, 0, 0);
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];
    for i in 0..a.len() {
        for j in 0..b.len() {
            let k = if a[i] == b[j] { prev[j] + 1 } else { 0 };
            cur[j + 1] = k;
            if k == 0 {
                continue;
            }
            let (start_a, start_b) = (i + 1 - k, j + 1 - k);
            if k > len || (k == len && (start_a, start_b) < (at_a, at_b)) {
                (len, at_a, at_b) = (k, start_a, start_b);
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    (len, at_a, at_b)
}
