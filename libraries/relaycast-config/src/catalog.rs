//! Named entity catalogs
//!
//! A catalog is an insertion-ordered map from a case-insensitive name to an
//! entity. Iteration order is the order entities were first referenced,
//! which is also the order the XML printer writes them back out.

use crate::error::ValidationError;
use crate::validate::{validate_string, ValidationResult};
use indexmap::IndexMap;

/// Name given to an entity block that has no `<name>` element
pub const DEFAULT_NAME: &str = "default";

/// Shared shape of servers, streams, intakes, decoders and encoders
pub trait Entity: Sized {
    /// Kind label used in log messages, e.g. `server`
    const KIND: &'static str;

    /// A fresh entity with all fields at their defaults
    fn new(name: &str) -> Self;

    fn name(&self) -> &str;

    /// Change the stored name.
    ///
    /// Only [`Catalog::rename`] should call this, since it is the one place
    /// that can check for collisions with sibling entities.
    #[doc(hidden)]
    fn set_name(&mut self, name: &str);

    /// Apply a field by its config element name.
    ///
    /// Returns `Ok(false)` for fields the entity does not know, so readers can
    /// skip unknown elements.
    fn set(&mut self, field: &str, value: &str) -> ValidationResult<bool>;

    /// Apply a field that may need to see sibling entities.
    ///
    /// The default simply forwards to [`Entity::set`] on the named entity.
    fn apply(
        catalog: &mut Catalog<Self>,
        name: &str,
        field: &str,
        value: &str,
    ) -> ValidationResult<bool> {
        catalog.get_or_create(name)?.set(field, value)
    }

    /// Check cross-field invariants.
    fn validate(&self) -> ValidationResult<()>;

    /// Non-default fields as `(element, value)` pairs, in print order.
    fn fields(&self) -> Vec<(&'static str, String)>;
}

/// Insertion-ordered, case-insensitively keyed entity collection
#[derive(Debug, Clone)]
pub struct Catalog<E> {
    entries: IndexMap<String, E>,
}

fn key(name: &str) -> String {
    name.to_lowercase()
}

impl<E> Default for Catalog<E> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<E: Entity> Catalog<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an entity that is not yet part of any catalog.
    pub fn create(name: &str) -> ValidationResult<E> {
        validate_string(name)?;
        Ok(E::new(name))
    }

    pub fn find(&self, name: &str) -> Option<&E> {
        self.entries.get(&key(name))
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut E> {
        self.entries.get_mut(&key(name))
    }

    /// Look up `name`, inserting a fresh entity if it is not there yet.
    ///
    /// Names differing only in case address the same entity.
    pub fn get_or_create(&mut self, name: &str) -> ValidationResult<&mut E> {
        validate_string(name)?;
        Ok(self
            .entries
            .entry(key(name))
            .or_insert_with(|| E::new(name)))
    }

    /// Insert an entity built with [`Catalog::create`].
    pub fn insert(&mut self, entity: E) -> ValidationResult<&mut E> {
        let k = key(entity.name());
        if self.entries.contains_key(&k) {
            return Err(ValidationError::AlreadyExists);
        }
        Ok(self.entries.entry(k).or_insert(entity))
    }

    /// Detach an entity, keeping the order of the remaining ones.
    pub fn remove(&mut self, name: &str) -> Option<E> {
        self.entries.shift_remove(&key(name))
    }

    /// Rename `old` to `new`, keeping its position.
    ///
    /// Fails with `AlreadyExists` if a different entity already owns `new`.
    /// Changing only the case of a name is allowed.
    pub fn rename(&mut self, old: &str, new: &str) -> ValidationResult<()> {
        validate_string(new)?;
        let old_key = key(old);
        let new_key = key(new);

        if old_key != new_key && self.entries.contains_key(&new_key) {
            return Err(ValidationError::AlreadyExists);
        }
        let Some((index, _, mut entity)) = self.entries.shift_remove_full(&old_key) else {
            return Err(ValidationError::UnknownReference {
                kind: E::KIND,
                name: old.to_string(),
            });
        };
        entity.set_name(new);
        self.entries.shift_insert(index, new_key, entity);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validate every entity, returning the first failure with its name.
    pub fn validate_all(&self) -> Result<(), (String, ValidationError)> {
        for entity in self.iter() {
            entity
                .validate()
                .map_err(|e| (entity.name().to_string(), e))?;
        }
        Ok(())
    }
}

impl<E: PartialEq> PartialEq for Catalog<E> {
    fn eq(&self, other: &Self) -> bool {
        // IndexMap equality ignores order; catalogs do not
        self.entries.len() == other.entries.len()
            && self.entries.iter().eq(other.entries.iter())
    }
}

impl<E: Eq> Eq for Catalog<E> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::Server;

    #[test]
    fn get_or_create_is_case_insensitive() {
        let mut servers = Catalog::<Server>::new();
        servers.get_or_create("Main").unwrap().set_hostname("a.example").unwrap();
        let again = servers.get_or_create("MAIN").unwrap();
        assert_eq!(again.hostname(), Some("a.example"));
        assert_eq!(again.name(), "Main");
        assert_eq!(servers.len(), 1);
    }

    #[test]
    fn find_never_creates() {
        let servers = Catalog::<Server>::new();
        assert!(servers.find("main").is_none());
        assert!(servers.is_empty());
    }

    #[test]
    fn create_rejects_empty_name() {
        assert!(matches!(
            Catalog::<Server>::create(""),
            Err(ValidationError::Empty)
        ));
        let mut servers = Catalog::<Server>::new();
        assert!(servers.get_or_create("").is_err());
    }

    #[test]
    fn insert_refuses_duplicates() {
        let mut servers = Catalog::<Server>::new();
        servers.insert(Catalog::<Server>::create("a").unwrap()).unwrap();
        assert!(matches!(
            servers.insert(Catalog::<Server>::create("A").unwrap()),
            Err(ValidationError::AlreadyExists)
        ));
    }

    #[test]
    fn rename_detects_collisions() {
        let mut servers = Catalog::<Server>::new();
        servers.get_or_create("one").unwrap();
        servers.get_or_create("two").unwrap();

        assert_eq!(
            servers.rename("one", "TWO"),
            Err(ValidationError::AlreadyExists)
        );
        assert!(servers.rename("one", "One").is_ok());
        assert_eq!(servers.find("one").unwrap().name(), "One");
    }

    #[test]
    fn rename_keeps_position() {
        let mut servers = Catalog::<Server>::new();
        for name in ["a", "b", "c"] {
            servers.get_or_create(name).unwrap();
        }
        servers.rename("a", "z").unwrap();
        let names: Vec<_> = servers.iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, vec!["z", "b", "c"]);
        assert!(servers.find("a").is_none());
    }

    #[test]
    fn remove_preserves_order_of_the_rest() {
        let mut servers = Catalog::<Server>::new();
        for name in ["a", "b", "c"] {
            servers.get_or_create(name).unwrap();
        }
        assert!(servers.remove("B").is_some());
        let names: Vec<_> = servers.iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, vec!["a", "c"]);
        assert!(servers.remove("b").is_none());
    }

    #[test]
    fn equality_depends_on_order() {
        let mut left = Catalog::<Server>::new();
        let mut right = Catalog::<Server>::new();
        left.get_or_create("a").unwrap();
        left.get_or_create("b").unwrap();
        right.get_or_create("b").unwrap();
        right.get_or_create("a").unwrap();
        assert_ne!(left, right);
    }
}
