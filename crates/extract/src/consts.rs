use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// `[[Category:Name]]` or `[[Category:Name|sort key]]`.
regex!(CATEGORY_REGEX, r"\[\[\s*Category\s*:\s*([^\]|]+?)\s*(?:\|[^\]]*)?\]\]");
// `#REDIRECT [[Target]]`, for pages whose header lacks a `<redirect/>` element.
regex!(REDIRECT_REGEX, r"(?i)^\s*#REDIRECT\s*:?\s*\[\[([^\]|#]+)");

/// Element names of the MediaWiki export schema that the page scanner reads.
pub(crate) mod tag {
    pub(crate) const PAGE: &[u8] = b"page";
    pub(crate) const TITLE: &[u8] = b"title";
    pub(crate) const NS: &[u8] = b"ns";
    pub(crate) const ID: &[u8] = b"id";
    pub(crate) const REDIRECT: &[u8] = b"redirect";
    pub(crate) const REVISION: &[u8] = b"revision";
    pub(crate) const TEXT: &[u8] = b"text";
}
