use std::borrow::Cow;

use crate::CheckItem;

/// Keyword matcher that forces the authoritative prober for known-unreliable sources.
///
/// A keyword matches when it occurs anywhere in the URL or the title.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EscalationRules {
    keywords: Vec<String>,
    case_sensitive: bool,
}

impl EscalationRules {
    pub fn new<I, S>(keywords: I, case_sensitive: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keywords = keywords
            .into_iter()
            .map(Into::into)
            .map(|kw: String| kw.trim().to_string())
            .filter(|kw| !kw.is_empty())
            .map(|kw| if case_sensitive { kw } else { kw.to_lowercase() })
            .collect();
        Self {
            keywords,
            case_sensitive,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Returns the first keyword found in the item's URL or title.
    pub fn matched_keyword(&self, item: &CheckItem) -> Option<&str> {
        if self.keywords.is_empty() {
            return None;
        }
        let (url, title): (Cow<'_, str>, Cow<'_, str>) = if self.case_sensitive {
            (Cow::Borrowed(item.url.as_str()), Cow::Borrowed(item.title.as_str()))
        } else {
            (
                Cow::Owned(item.url.to_lowercase()),
                Cow::Owned(item.title.to_lowercase()),
            )
        };
        self.keywords
            .iter()
            .find(|kw| url.contains(kw.as_str()) || title.contains(kw.as_str()))
            .map(String::as_str)
    }

    pub fn should_escalate(&self, item: &CheckItem) -> bool {
        self.matched_keyword(item).is_some()
    }
}
