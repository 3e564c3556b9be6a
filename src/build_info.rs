mod raw {
    // See https://docs.rs/built/latest/built/index.html for the constants in built.rs.
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// Crate version such as 0.1.0
pub const ULTERIOR_PKG_VERSION: &str = raw::PKG_VERSION;

/// Comma separated features enabled for this build
pub const ULTERIOR_FEATURES: &str = raw::FEATURES_STR;

/// Build profile, `release` or `debug`.
pub const ULTERIOR_PROFILE: &str = raw::PROFILE;

lazy_static! {
    /// Git version such as a96e8f991c91a81df51e7975849441f52fdbcdcc, or
    /// a96e8f991c91a81df51e7975849441f52fdbcdcc-dirty, or unknown-git-version
    /// if the crate is not built from a git repo.
    pub static ref ULTERIOR_GIT_VERSION: &'static str = &ULTERIOR_GIT_VERSION_STRING;

    // Owned string
    static ref ULTERIOR_GIT_VERSION_STRING: String = match raw::GIT_COMMIT_HASH {
        Some(hash) => format!("{}{}", hash, if raw::GIT_DIRTY == Some(true) { "-dirty" } else { "" }),
        None => "unknown-git-version".to_string(),
    };

    /// Full build information, as printed when the collector starts.
    pub static ref ULTERIOR_FULL_BUILD_INFO: String = format!(
        "ulterior {} ({}, {}, [{}])",
        ULTERIOR_PKG_VERSION,
        *ULTERIOR_GIT_VERSION,
        ULTERIOR_PROFILE,
        ULTERIOR_FEATURES
    );
}
