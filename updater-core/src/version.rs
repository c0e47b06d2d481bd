use crate::{Result, UpdaterError};
use semver::Version;
use std::cmp::Ordering;

/// 去掉版本标签开头的非数字前缀，例如 `v2.1.0` -> `2.1.0`
pub fn normalize(tag: &str) -> &str {
    tag.trim().trim_start_matches(|c: char| !c.is_ascii_digit())
}

/// 解析版本号，`2.1` 这类缺少补丁号的版本会补齐为 `2.1.0`
pub fn parse(raw: &str) -> Result<Version> {
    let normalized = normalize(raw);
    if normalized.is_empty() {
        return Err(UpdaterError::Version(raw.to_string()));
    }

    if let Ok(version) = Version::parse(normalized) {
        return Ok(version);
    }

    // 补齐缺失的版本段，保留预发布/构建后缀
    let split_at = normalized
        .find(|c: char| c == '-' || c == '+')
        .unwrap_or(normalized.len());
    let (core, suffix) = normalized.split_at(split_at);
    let parts = core.split('.').count();
    if parts >= 3 {
        return Err(UpdaterError::Version(raw.to_string()));
    }

    let padded = format!("{core}{}{suffix}", ".0".repeat(3 - parts));
    Version::parse(&padded).map_err(|_| UpdaterError::Version(raw.to_string()))
}

/// 比较两个版本号
pub fn compare(current: &str, candidate: &str) -> Result<Ordering> {
    Ok(parse(current)?.cmp(&parse(candidate)?))
}

/// 上游版本严格大于当前版本时返回 `true`
pub fn is_newer(current: &str, candidate: &str) -> Result<bool> {
    Ok(compare(current, candidate)? == Ordering::Less)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_prefix() {
        assert_eq!(normalize("v2.1.0"), "2.1.0");
        assert_eq!(normalize("release-3.0.0"), "3.0.0");
        assert_eq!(normalize("2.1.0"), "2.1.0");
        assert_eq!(normalize("  V1.0.14 "), "1.0.14");
    }

    #[test]
    fn test_newer_versions() {
        assert!(is_newer("2.0.9", "2.1.0").unwrap());
        assert!(is_newer("2.9.0", "3.0.0").unwrap());
        assert!(is_newer("1.0.9", "1.0.10").unwrap());
        assert!(!is_newer("2.1.0", "2.0.9").unwrap());
    }

    #[test]
    fn test_prefix_is_ignored() {
        assert_eq!(compare("2.1.0", "v2.1.0").unwrap(), Ordering::Equal);
        assert!(!is_newer("2.1.0", "v2.1.0").unwrap());
    }

    #[test]
    fn test_short_versions_are_padded() {
        assert_eq!(parse("2.1").unwrap(), Version::new(2, 1, 0));
        assert_eq!(parse("v3").unwrap(), Version::new(3, 0, 0));
        assert!(is_newer("2.1", "2.1.1").unwrap());
        assert_eq!(parse("2.1-beta.1").unwrap().pre.as_str(), "beta.1");
    }

    #[test]
    fn test_prerelease_orders_before_release() {
        assert!(is_newer("3.0.0-rc.1", "3.0.0").unwrap());
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(parse("latest").is_err());
        assert!(parse("").is_err());
        assert!(parse("1.2.3.4").is_err());
    }
}
