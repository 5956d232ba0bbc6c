//! Minimal HAL primitives: a link is `{"href": ...}`, a link set serializes
//! as the `_links` object keyed by relation.

use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub href: String,
}

impl Link {
    pub fn new(href: impl Into<String>) -> Self {
        Self { href: href.into() }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Links(BTreeMap<&'static str, Link>);

impl Links {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, rel: &'static str, href: impl Into<String>) -> Self {
        self.0.insert(rel, Link::new(href));
        self
    }

    pub fn add_if(self, cond: bool, rel: &'static str, href: impl Into<String>) -> Self {
        if cond {
            self.add(rel, href)
        } else {
            self
        }
    }

    pub fn get(&self, rel: &str) -> Option<&Link> {
        self.0.get(rel)
    }

    pub fn contains(&self, rel: &str) -> bool {
        self.0.contains_key(rel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_serialize_keyed_by_relation() {
        let links = Links::new()
            .add("self", "/api/accounts/1")
            .add_if(true, "profile", "/docs/index.html")
            .add_if(false, "update-account", "/api/accounts/1");

        let json = serde_json::to_value(&links).unwrap();
        assert_eq!(json["self"]["href"], "/api/accounts/1");
        assert_eq!(json["profile"]["href"], "/docs/index.html");
        assert!(json.get("update-account").is_none());
    }
}
