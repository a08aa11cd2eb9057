//! The query language shared by append conditions and reads.
//!
//! A [`QueryItem`] ORs over its types and ANDs over its tags. A [`Query`] ORs
//! over its items, except that a query with no items matches every event.

use crate::event::Event;

/// One clause of a [`Query`].
///
/// An event matches when its type is one of `types` (or `types` is empty) and
/// every tag in `tags` is present on the event (or `tags` is empty).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct QueryItem {
    types: Vec<String>,
    tags: Vec<String>,
}

impl QueryItem {
    /// An item matching every event.
    #[must_use]
    pub const fn match_all() -> Self {
        Self {
            types: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Match events whose type is any of `types`.
    pub fn of_types<T: Into<String>>(types: impl IntoIterator<Item = T>) -> Self {
        Self::of(types, Vec::<String>::new())
    }

    /// Match events carrying all of `tags`.
    pub fn of_tags<T: Into<String>>(tags: impl IntoIterator<Item = T>) -> Self {
        Self::of(Vec::<String>::new(), tags)
    }

    pub fn of<A, B>(types: impl IntoIterator<Item = A>, tags: impl IntoIterator<Item = B>) -> Self
    where
        A: Into<String>,
        B: Into<String>,
    {
        Self {
            types: types.into_iter().map(Into::into).collect(),
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn types(&self) -> &[String] {
        &self.types
    }

    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        let type_matches = self.types.is_empty() || self.types.iter().any(|t| t == event.kind());
        type_matches && self.tags.iter().all(|tag| event.has_tag(tag))
    }
}

/// An ordered disjunction of [`QueryItem`]s.
///
/// The empty query is the universal matcher, not the empty matcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Query {
    items: Vec<QueryItem>,
}

impl Query {
    /// The query with no items, matching every event.
    #[must_use]
    pub const fn match_all() -> Self {
        Self { items: Vec::new() }
    }

    #[must_use]
    pub fn of(item: QueryItem) -> Self {
        Self { items: vec![item] }
    }

    pub fn from_items(items: impl IntoIterator<Item = QueryItem>) -> Self {
        Self {
            items: items.into_iter().collect(),
        }
    }

    /// A new query with `item` appended. `self` is left untouched.
    #[must_use]
    pub fn and(&self, item: QueryItem) -> Self {
        let mut items = Vec::with_capacity(self.items.len() + 1);
        items.extend_from_slice(&self.items);
        items.push(item);
        Self { items }
    }

    #[must_use]
    pub fn items(&self) -> &[QueryItem] {
        &self.items
    }

    #[must_use]
    pub fn is_match_all(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        self.items.is_empty() || self.items.iter().any(|item| item.matches(event))
    }
}

impl From<QueryItem> for Query {
    fn from(item: QueryItem) -> Self {
        Self::of(item)
    }
}

impl FromIterator<QueryItem> for Query {
    fn from_iter<I: IntoIterator<Item = QueryItem>>(iter: I) -> Self {
        Self::from_items(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: &str, tags: &[&str]) -> Event {
        Event::new(kind, tags.iter().copied(), "").unwrap()
    }

    #[test]
    fn match_all_item_matches_anything() {
        assert!(QueryItem::match_all().matches(&event("a", &["x"])));
    }

    #[test]
    fn types_are_a_disjunction() {
        let item = QueryItem::of_types(["a", "b"]);
        assert!(item.matches(&event("a", &["x"])));
        assert!(item.matches(&event("b", &["x"])));
        assert!(!item.matches(&event("c", &["x"])));
    }

    #[test]
    fn tags_are_a_conjunction_over_set_containment() {
        let item = QueryItem::of_tags(["x", "y"]);
        assert!(item.matches(&event("a", &["y", "z", "x"])));
        assert!(!item.matches(&event("a", &["x"])));
    }

    #[test]
    fn types_and_tags_must_both_hold() {
        let item = QueryItem::of(["a"], ["x"]);
        assert!(item.matches(&event("a", &["x"])));
        assert!(!item.matches(&event("b", &["x"])));
        assert!(!item.matches(&event("a", &["y"])));
    }

    #[test]
    fn matches_agrees_with_definition_over_a_grid() {
        let kinds = ["a", "b", "c"];
        let tag_sets: [&[&str]; 4] = [&["x"], &["y"], &["x", "y"], &["x", "y", "x"]];
        let items = [
            QueryItem::match_all(),
            QueryItem::of_types(["a"]),
            QueryItem::of_types(["a", "c"]),
            QueryItem::of_tags(["x"]),
            QueryItem::of_tags(["x", "y"]),
            QueryItem::of(["b"], ["y"]),
        ];

        for item in &items {
            for kind in kinds {
                for tags in tag_sets {
                    let e = event(kind, tags);
                    let expected = (item.types().is_empty()
                        || item.types().iter().any(|t| t == kind))
                        && item.tags().iter().all(|t| tags.contains(&t.as_str()));
                    assert_eq!(item.matches(&e), expected, "{item:?} vs {kind} {tags:?}");
                }
            }
        }
    }

    #[test]
    fn empty_query_matches_every_event() {
        let query = Query::match_all();
        assert!(query.is_match_all());
        assert!(query.matches(&event("anything", &["at-all"])));
    }

    #[test]
    fn query_is_a_disjunction_of_items() {
        let query = Query::of(QueryItem::of_types(["a"])).and(QueryItem::of_tags(["z"]));
        assert!(query.matches(&event("a", &["x"])));
        assert!(query.matches(&event("b", &["z"])));
        assert!(!query.matches(&event("b", &["x"])));
    }

    #[test]
    fn and_leaves_receiver_unchanged() {
        let original = Query::of(QueryItem::of_types(["a"]));
        let extended = original.and(QueryItem::of_tags(["x"]));

        assert_eq!(original.items().len(), 1);
        assert_eq!(extended.items().len(), 2);
        assert_eq!(extended.items()[0], original.items()[0]);
    }

    #[test]
    fn collects_from_items() {
        let query: Query = [QueryItem::of_types(["a"]), QueryItem::of_types(["b"])]
            .into_iter()
            .collect();
        assert_eq!(query.items().len(), 2);
        assert_eq!(Query::from(QueryItem::match_all()).items().len(), 1);
    }
}
