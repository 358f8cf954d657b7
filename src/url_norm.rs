use std::collections::HashSet;

/// Canonical form of a URL used for equality and ordering.
///
/// Everything from the first `#` is dropped, then a single trailing `/` is
/// removed. A run of two or more trailing slashes is left alone so that the
/// function stays idempotent. Purely textual: any string is accepted.
pub fn normalize_url(url: &str) -> String {
    let without_fragment = match url.find('#') {
        Some(idx) => &url[..idx],
        None => url,
    };

    match without_fragment.strip_suffix('/') {
        Some(rest) if !rest.ends_with('/') => rest.to_string(),
        _ => without_fragment.to_string(),
    }
}

/// Ordered, duplicate-free list of documents to render. The seed is always first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentList {
    urls: Vec<String>,
}

impl DocumentList {
    /// Build the list from the seed URL followed by discovered links, keeping
    /// the first occurrence of every normalized form.
    pub fn new<I, S>(seed: &str, discovered: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut urls = Vec::new();

        let seed = normalize_url(seed);
        seen.insert(seed.clone());
        urls.push(seed);

        for link in discovered {
            let normalized = normalize_url(link.as_ref());
            if seen.insert(normalized.clone()) {
                urls.push(normalized);
            }
        }

        Self { urls }
    }

    pub fn seed(&self) -> &str {
        &self.urls[0]
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.urls.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.urls
    }
}
