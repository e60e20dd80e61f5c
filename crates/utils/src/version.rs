use std::sync::LazyLock;

/// Full git SHA of the build, when the build ran inside a git checkout.
pub const GIT_SHA: Option<&str> = option_env!("VERGEN_GIT_SHA");

/// Defines the application version.
pub static VERSION: LazyLock<String> = LazyLock::new(|| {
    format!(
        "{}-{}{}",
        env!("IMAGE_VERSION"),
        short_commit(),
        if option_env!("VERGEN_GIT_DIRTY") == Some("true") {
            "-dirty"
        } else {
            ""
        }
    )
});

/// Seven character commit id, or "unknown" outside a git checkout.
pub fn short_commit() -> &'static str {
    abbreviate(GIT_SHA)
}

fn abbreviate(sha: Option<&str>) -> &str {
    match sha {
        Some(sha) if !sha.is_empty() => sha.get(..7).unwrap_or(sha),
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn abbreviate_commit() {
        assert_eq!(abbreviate(Some("0123456789abcdef")), "0123456");
        assert_eq!(abbreviate(Some("abc")), "abc");
        assert_eq!(abbreviate(Some("")), "unknown");
        assert_eq!(abbreviate(None), "unknown");
    }

    #[test]
    fn version_contains_commit() {
        assert!(VERSION.contains(short_commit()));
    }
}
