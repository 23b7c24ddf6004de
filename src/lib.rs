//! # Photoshare
//!
//! `photoshare` is the back end of a small photo-sharing site: accounts,
//! photo streams, uploads and comments, served over a JSON HTTP API.
//!
//! ## Credentials
//!
//! Passwords are stored as a salted digest produced by the credential codec
//! in [`credential`]: a fresh random salt per derivation, a single SHA-1 pass
//! over `password ‖ salt`, compared in constant time on login. The digest
//! format matches the seeded model data.
//!
//! ## Sessions
//!
//! Login establishes a server-side session (see [`store::SessionStore`]); the
//! client holds an opaque token in the `photoshare_session` cookie. A session
//! gate evaluates every request: registration and login are the only
//! operations reachable without a session. Logout destroys the session so the
//! same token is rejected afterwards.
//!
//! Unknown login names and wrong passwords produce the same response.

pub mod api;
pub mod cli;
pub mod credential;
pub mod seed;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }
}
