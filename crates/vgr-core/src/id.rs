use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Element ids and paint-server names share one interner.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Prefix marking ids minted for elements that had none in the source.
const GENERATED_PREFIX: char = '_';

/// An interned element identifier (`id="..."` in the source document).
///
/// Ids double as paint-server references: a fill of `url(#sunset)` is a
/// `Paint::Server(NodeId::intern("sunset"))`. Copy, 4 bytes, O(1) compare.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Spur);

impl NodeId {
    pub fn intern(s: &str) -> Self {
        NodeId(INTERNER.get_or_intern(s))
    }

    /// Intern a fragment reference such as `#sunset` or `url(#sunset)`.
    pub fn from_fragment(s: &str) -> Self {
        let s = s.trim();
        let s = s
            .strip_prefix("url(")
            .and_then(|rest| rest.strip_suffix(')'))
            .unwrap_or(s);
        Self::intern(s.trim().trim_start_matches('#'))
    }

    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    /// Mint a fresh id for an element of the given kind, e.g. `_circle_7`.
    pub fn generated(kind: &str) -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        Self::intern(&format!("{GENERATED_PREFIX}{kind}_{n}"))
    }

    /// True for ids minted by [`NodeId::generated`].
    pub fn is_generated(&self) -> bool {
        self.as_str().starts_with(GENERATED_PREFIX)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(NodeId::from_fragment(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_stable() {
        let a = NodeId::intern("sunset");
        let b = NodeId::intern("sunset");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "sunset");
    }

    #[test]
    fn fragment_forms_resolve_to_same_id() {
        let plain = NodeId::intern("grad");
        assert_eq!(NodeId::from_fragment("#grad"), plain);
        assert_eq!(NodeId::from_fragment("url(#grad)"), plain);
        assert_eq!(NodeId::from_fragment(" url( #grad ) "), plain);
    }

    #[test]
    fn generated_ids_are_unique_and_flagged() {
        let a = NodeId::generated("rect");
        let b = NodeId::generated("rect");
        assert_ne!(a, b);
        assert!(a.is_generated());
        assert!(!NodeId::intern("logo").is_generated());
    }
}
