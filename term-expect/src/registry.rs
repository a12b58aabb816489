//! Get-or-create registration of named configuration objects.
//!
//! Datasources, assets, batch definitions and suites are created once and
//! reused on every later run. Presence is checked explicitly and reported
//! through [`Registration`] instead of by catching a lookup failure.

use crate::error::{Result, TermError};

/// Objects addressable by a unique name within their container.
pub trait Named {
    /// The object's name.
    fn name(&self) -> &str;
}

/// Outcome of a get-or-create call.
#[derive(Debug, Clone, PartialEq)]
pub enum Registration<T> {
    /// The named object was already registered and is reused.
    Existing(T),
    /// The named object was missing and has been created and persisted.
    Created(T),
}

impl<T> Registration<T> {
    /// Returns true when the object was created by this call.
    pub fn was_created(&self) -> bool {
        matches!(self, Registration::Created(_))
    }

    /// Borrows the registered object.
    pub fn get(&self) -> &T {
        match self {
            Registration::Existing(value) | Registration::Created(value) => value,
        }
    }

    /// Consumes the registration, returning the object.
    pub fn into_inner(self) -> T {
        match self {
            Registration::Existing(value) | Registration::Created(value) => value,
        }
    }

    /// Maps the registered object while keeping the outcome.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Registration<U> {
        match self {
            Registration::Existing(value) => Registration::Existing(f(value)),
            Registration::Created(value) => Registration::Created(f(value)),
        }
    }

    /// Short label used in log output.
    pub fn outcome(&self) -> &'static str {
        match self {
            Registration::Existing(_) => "existing",
            Registration::Created(_) => "created",
        }
    }
}

/// Finds an item by name.
pub fn find<'a, T: Named>(items: &'a [T], name: &str) -> Option<&'a T> {
    items.iter().find(|item| item.name() == name)
}

/// Finds an item by name for mutation.
pub fn find_mut<'a, T: Named>(items: &'a mut [T], name: &str) -> Option<&'a mut T> {
    items.iter_mut().find(|item| item.name() == name)
}

/// Appends `item`, failing with [`TermError::AlreadyExists`] on a name clash.
pub fn insert_new<T: Named>(items: &mut Vec<T>, kind: &'static str, item: T) -> Result<()> {
    if find(items, item.name()).is_some() {
        return Err(TermError::already_exists(kind, item.name()));
    }
    items.push(item);
    Ok(())
}

/// Returns a clone of the named item, creating and appending it when missing.
///
/// `create` only runs on the creation branch.
pub fn get_or_insert_with<T, F>(
    items: &mut Vec<T>,
    name: &str,
    create: F,
) -> Result<Registration<T>>
where
    T: Named + Clone,
    F: FnOnce() -> Result<T>,
{
    if let Some(existing) = find(items, name) {
        return Ok(Registration::Existing(existing.clone()));
    }

    let item = create()?;
    if item.name() != name {
        return Err(TermError::Internal(format!(
            "created object is named '{}' but '{name}' was requested",
            item.name()
        )));
    }
    items.push(item.clone());
    Ok(Registration::Created(item))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        name: String,
        value: u32,
    }

    impl Named for Item {
        fn name(&self) -> &str {
            &self.name
        }
    }

    fn item(name: &str, value: u32) -> Item {
        Item {
            name: name.to_string(),
            value,
        }
    }

    #[test]
    fn test_get_or_insert_creates_once() {
        let mut items = Vec::new();

        let first = get_or_insert_with(&mut items, "a", || Ok(item("a", 1))).unwrap();
        assert!(first.was_created());

        let mut calls = 0;
        let second = get_or_insert_with(&mut items, "a", || {
            calls += 1;
            Ok(item("a", 2))
        })
        .unwrap();

        assert!(!second.was_created());
        assert_eq!(second.get().value, 1);
        assert_eq!(calls, 0);
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_create_failure_propagates_and_leaves_container_untouched() {
        let mut items: Vec<Item> = Vec::new();
        let err = get_or_insert_with(&mut items, "a", || {
            Err(TermError::Configuration("boom".to_string()))
        })
        .unwrap_err();
        assert!(matches!(err, TermError::Configuration(_)));
        assert!(items.is_empty());
    }

    #[test]
    fn test_created_name_mismatch_is_rejected() {
        let mut items = Vec::new();
        assert!(get_or_insert_with(&mut items, "a", || Ok(item("b", 1))).is_err());
        assert!(items.is_empty());
    }

    #[test]
    fn test_insert_new_rejects_duplicates() {
        let mut items = vec![item("a", 1)];
        let err = insert_new(&mut items, "item", item("a", 2)).unwrap_err();
        assert!(err.is_already_exists());
        assert!(insert_new(&mut items, "item", item("b", 2)).is_ok());
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_registration_accessors() {
        let reg = Registration::Created(3);
        assert_eq!(reg.outcome(), "created");
        assert_eq!(reg.clone().map(|v| v * 2), Registration::Created(6));
        assert_eq!(reg.into_inner(), 3);
        assert_eq!(Registration::Existing("x").outcome(), "existing");
    }
}
