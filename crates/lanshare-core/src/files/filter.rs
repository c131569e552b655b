//! 目录列表过滤规则

/// 列表过滤器
///
/// - 后缀规则: 文件名必须以它结尾（只作用于文件）
/// - 子串规则: 名称必须包含它（文件和目录都适用）
/// - 两条规则同时存在时需同时满足
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingFilter {
    suffix: Option<String>,
    contains: Option<String>,
    show_directories: bool,
}

impl ListingFilter {
    /// 空字符串规则等同于未设置
    pub fn new(suffix: Option<String>, contains: Option<String>, show_directories: bool) -> Self {
        Self {
            suffix: suffix.filter(|s| !s.is_empty()),
            contains: contains.filter(|s| !s.is_empty()),
            show_directories,
        }
    }

    /// 不做任何过滤
    pub fn allow_all() -> Self {
        Self::new(None, None, true)
    }

    pub fn show_directories(&self) -> bool {
        self.show_directories
    }

    /// 判断条目是否可见
    pub fn matches(&self, name: &str, is_dir: bool) -> bool {
        if is_dir && !self.show_directories {
            return false;
        }

        if let Some(contains) = &self.contains
            && !name.contains(contains.as_str())
        {
            return false;
        }

        if is_dir {
            return true;
        }

        self.suffix
            .as_deref()
            .is_none_or(|suffix| name.ends_with(suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visible<'a>(filter: &ListingFilter, entries: &[(&'a str, bool)]) -> Vec<&'a str> {
        entries
            .iter()
            .filter(|(name, is_dir)| filter.matches(name, *is_dir))
            .map(|(name, _)| *name)
            .collect()
    }

    #[test]
    fn test_allow_all() {
        let filter = ListingFilter::allow_all();
        assert!(filter.matches("anything.bin", false));
        assert!(filter.matches("photos", true));
    }

    #[test]
    fn test_suffix_filter() {
        let filter = ListingFilter::new(Some(".jpg".to_string()), None, true);
        let entries = [("a.jpg", false), ("b.png", false), ("c.jpg", false)];
        assert_eq!(visible(&filter, &entries), vec!["a.jpg", "c.jpg"]);
    }

    #[test]
    fn test_hidden_directories_ignore_name_match() {
        let filter = ListingFilter::new(Some(".jpg".to_string()), Some("a".to_string()), false);
        let entries = [("a.jpg", false), ("album.jpg", true), ("archive", true)];
        assert_eq!(visible(&filter, &entries), vec!["a.jpg"]);
    }

    #[test]
    fn test_both_rules_must_hold() {
        let filter = ListingFilter::new(Some(".txt".to_string()), Some("log".to_string()), true);
        assert!(filter.matches("server-log.txt", false));
        assert!(!filter.matches("server-log.csv", false));
        assert!(!filter.matches("notes.txt", false));
    }

    #[test]
    fn test_contains_applies_to_directories() {
        let filter = ListingFilter::new(Some(".jpg".to_string()), Some("2024".to_string()), true);
        assert!(filter.matches("trip-2024", true));
        assert!(!filter.matches("trip-2023", true));
    }

    #[test]
    fn test_empty_rules_are_ignored() {
        let filter = ListingFilter::new(Some(String::new()), Some(String::new()), true);
        assert_eq!(filter, ListingFilter::allow_all());
    }
}
