use crate::consts;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// One page record from the archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    /// Page id, as opposed to revision or contributor ids.
    pub id: u64,
    /// MediaWiki namespace number; `0` for encyclopedia articles.
    pub namespace: i64,
    /// Target named by the page's `<redirect title="…"/>` element.
    pub redirect: Option<String>,
    /// Raw wikitext of the latest revision.
    pub text: String,
}
impl Article {
    /// Where this page redirects to, if anywhere.
    ///
    /// Prefers the export's `<redirect/>` element and falls back to a leading
    /// `#REDIRECT [[Target]]` in the wikitext.
    pub fn redirect_target(&self) -> Option<&str> {
        if let Some(target) = self.redirect.as_deref() {
            return Some(target);
        }
        consts::REDIRECT_REGEX
            .captures(&self.text)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().trim())
            .filter(|target| !target.is_empty())
    }

    pub fn is_redirect(&self) -> bool {
        self.redirect_target().is_some()
    }

    /// Category names linked from the wikitext, in order of first appearance.
    ///
    /// Sort keys (`[[Category:Name|key]]`) are dropped.
    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = Vec::new();
        for captures in consts::CATEGORY_REGEX.captures_iter(&self.text) {
            if let Some(name) = captures.get(1).map(|m| m.as_str())
                && !categories.contains(&name)
            {
                categories.push(name);
            }
        }
        categories
    }
}
impl Display for Article {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} (#{})", self.title, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn article(text: &str) -> Article {
        Article { title: "Cat".to_string(), id: 1, namespace: 0, redirect: None, text: text.to_string() }
    }

    #[test]
    fn test_categories() {
        let cat = article(
            "The '''cat''' is a small mammal.\n\
             [[Category:Felines|Cat]]\n\
             [[Category: Domesticated animals ]]\n\
             [[Category:Felines]]\n\
             [[Dog]] is not a category.",
        );
        assert_eq!(cat.categories(), ["Felines", "Domesticated animals"]);
        assert!(article("No categories here.").categories().is_empty());
    }

    #[rstest]
    #[case("#REDIRECT [[Felis catus]]", Some("Felis catus"))]
    #[case("#redirect [[Felis catus#Anatomy]]", Some("Felis catus"))]
    #[case("  #REDIRECT: [[Felis catus|the cat]]", Some("Felis catus"))]
    #[case("A cat is not a #REDIRECT [[Dog]]", None)]
    #[case("The cat.", None)]
    fn test_redirect_from_text(#[case] text: &str, #[case] expected: Option<&str>) {
        let page = article(text);
        assert_eq!(page.redirect_target(), expected);
        assert_eq!(page.is_redirect(), expected.is_some());
    }

    #[test]
    fn test_redirect_element_wins() {
        let page = Article { redirect: Some("Felis catus".to_string()), ..article("#REDIRECT [[Somewhere else]]") };
        assert_eq!(page.redirect_target(), Some("Felis catus"));
    }
}
