use std::collections::{BTreeMap, HashMap};
use regex::{Captures, Regex};

/// Rewrites configured source URLs inside served specs.
///
/// A single left-to-right pass: at each position the longest matching
/// source wins, and replaced text is never scanned again.
#[derive(Debug, Clone, Default)]
pub struct UrlReplacer {
    pattern: Option<Regex>,
    targets: HashMap<String, String>,
}

impl UrlReplacer {
    /// Pairs with an empty target are mapped to `site_url`.
    pub fn from_config(
        rewrite_urls: &BTreeMap<String, String>,
        site_url: &str,
    ) -> Result<Self, regex::Error> {
        let mut sources: Vec<&String> = rewrite_urls
            .keys()
            .filter(|from| !from.is_empty())
            .collect();
        if sources.is_empty() {
            return Ok(Self::default());
        }

        // Alternation is leftmost-first, so longer sources must come first
        sources.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let alternation: Vec<String> = sources.iter().map(|from| regex::escape(from)).collect();
        let pattern = Regex::new(&alternation.join("|"))?;

        let targets = rewrite_urls
            .iter()
            .filter(|(from, _)| !from.is_empty())
            .map(|(from, to)| {
                let to = if to.is_empty() { site_url } else { to.as_str() };
                (from.clone(), to.to_string())
            })
            .collect();

        Ok(Self {
            pattern: Some(pattern),
            targets,
        })
    }

    pub fn replace(&self, input: &str) -> String {
        let Some(pattern) = &self.pattern else {
            return input.to_string();
        };

        pattern
            .replace_all(input, |caps: &Captures| {
                self.targets.get(&caps[0]).cloned().unwrap_or_default()
            })
            .into_owned()
    }
}
