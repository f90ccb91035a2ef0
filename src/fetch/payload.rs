//! Upstream payload normalisation
//!
//! The upstream answers some routes with a bare object, some with an array,
//! and sometimes with `null`. [`OneOrMany`] absorbs all three once, at decode
//! time.

use serde::{Deserialize, Deserializer, Serialize};

/// A JSON payload that may be absent, a single value, or a list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Empty,
    Single(T),
    Many(Vec<T>),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Empty
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for OneOrMany<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw<T> {
            Many(Vec<T>),
            Single(T),
        }

        Ok(match Option::<Raw<T>>::deserialize(deserializer)? {
            None => OneOrMany::Empty,
            Some(Raw::Many(items)) if items.is_empty() => OneOrMany::Empty,
            Some(Raw::Many(items)) => OneOrMany::Many(items),
            Some(Raw::Single(item)) => OneOrMany::Single(item),
        })
    }
}

impl<T> OneOrMany<T> {
    pub fn is_empty(&self) -> bool {
        matches!(self, OneOrMany::Empty)
    }

    pub fn len(&self) -> usize {
        match self {
            OneOrMany::Empty => 0,
            OneOrMany::Single(_) => 1,
            OneOrMany::Many(items) => items.len(),
        }
    }

    pub fn first(&self) -> Option<&T> {
        match self {
            OneOrMany::Empty => None,
            OneOrMany::Single(item) => Some(item),
            OneOrMany::Many(items) => items.first(),
        }
    }

    /// Last element; for date-ordered series the most recent one.
    pub fn last(&self) -> Option<&T> {
        match self {
            OneOrMany::Empty => None,
            OneOrMany::Single(item) => Some(item),
            OneOrMany::Many(items) => items.last(),
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Empty => Vec::new(),
            OneOrMany::Single(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }

    /// Takes the first element matching `predicate`.
    pub fn find(self, predicate: impl FnMut(&T) -> bool) -> Option<T> {
        self.into_vec().into_iter().find(predicate)
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(items: Vec<T>) -> Self {
        if items.is_empty() {
            OneOrMany::Empty
        } else {
            OneOrMany::Many(items)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PricePoint;

    #[test]
    fn test_decode_null_and_empty_array() {
        let null: OneOrMany<PricePoint> = serde_json::from_str("null").unwrap();
        let empty: OneOrMany<PricePoint> = serde_json::from_str("[]").unwrap();

        assert!(null.is_empty());
        assert!(empty.is_empty());
        assert!(null.last().is_none());
    }

    #[test]
    fn test_decode_single_object() {
        let single: OneOrMany<PricePoint> =
            serde_json::from_str(r#"{"date":"2024-05-01","price":101.5}"#).unwrap();

        assert_eq!(single.len(), 1);
        assert_eq!(single.last().map(|p| p.price), Some(101.5));
    }

    #[test]
    fn test_decode_array() {
        let many: OneOrMany<PricePoint> = serde_json::from_str(
            r#"[{"date":"2024-05-01","price":1.0},{"date":"2024-05-02","price":2.0}]"#,
        )
        .unwrap();

        assert_eq!(many.first().map(|p| p.price), Some(1.0));
        assert_eq!(many.last().map(|p| p.price), Some(2.0));
        assert_eq!(many.into_vec().len(), 2);
    }

    #[test]
    fn test_decode_wrong_shape_fails() {
        let result = serde_json::from_str::<OneOrMany<PricePoint>>(r#""nope""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_find() {
        let many = OneOrMany::from(vec![1, 2, 3]);
        assert_eq!(many.clone().find(|n| *n == 2), Some(2));
        assert_eq!(many.find(|n| *n == 9), None);
        assert!(OneOrMany::<u8>::from(Vec::new()).is_empty());
    }
}
