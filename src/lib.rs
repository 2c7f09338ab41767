//! # authn-context (Authentication Context & Attempt Limits)
//!
//! `authn_context` resolves what a federal identity request actually asks for
//! and throttles the attempts made while satisfying it.
//!
//! ## Vectors of Trust and ACR values
//!
//! A relying party expresses its requirements either as one or more Vectors of
//! Trust (`C1.C2.P1.Pb`) or as a legacy, space-delimited list of ACR URIs.
//!
//! - **VoT is strict:** malformed vectors or unknown components are rejected.
//! - **ACR is lenient:** unknown URIs are dropped, unless none of them is known.
//! - **Multiple vectors:** the requester's proofing state decides which vector
//!   applies; list order breaks ties.
//! - **Provider policy:** default AAL/IAL, facial-match permission and the
//!   force-facial-match allow-list are layered on top of the parsed request.
//!
//! The result is a [`vot::ResolvedRequirements`] exposing predicates such as
//! `aal2()` or `facial_match()` and the ACR values to assert back.
//!
//! ## Rate limiting
//!
//! [`rate_limit::RateLimiter`] counts attempts per subject and limit type inside
//! a sliding window. Increments are a single atomic store operation, so
//! concurrent workers sharing a `PostgreSQL` table never exceed the limit, and
//! retries while limited never push the expiry further out.

pub mod cli;
pub mod config;
pub mod rate_limit;
pub mod vot;

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
