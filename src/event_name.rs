use std::{borrow::Borrow, hash::Hash, sync::Arc};

/// Name of a registered event.
///
/// Every [`Emitter`](crate::Emitter) operation is keyed by an event name.
/// `EventName` is cheap to clone (shared `Arc<str>`) and compares by string
/// content, with a fast path for names sharing one allocation.
///
/// ```
/// use chanemit::EventName;
///
/// let a = EventName::new("orders");
/// let b: EventName = "orders".into();
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "orders");
/// ```
#[derive(Debug, Clone, Ord, PartialOrd)]
pub struct EventName(Arc<str>);

impl EventName {
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for EventName {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for EventName {}

impl Hash for EventName {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

// `str` and `Arc<str>` hash identically, so lookups by `&str` are sound.
impl Borrow<str> for EventName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for EventName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EventName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for EventName {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<&String> for EventName {
    fn from(s: &String) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(EventName::new("EVENT"), 1);
        assert_eq!(map.get("EVENT"), Some(&1));
        assert_eq!(map.get("NEW"), None);
    }

    #[test]
    fn clones_share_allocation() {
        let a = EventName::from(String::from("EVENT"));
        let b = a.clone();
        assert!(Arc::ptr_eq(&a.0, &b.0));
        assert_eq!(a, b);
        assert_eq!(b.to_string(), "EVENT");
    }
}
