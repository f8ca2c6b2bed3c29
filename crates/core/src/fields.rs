//! Field projection: typed (`Record`) and dynamic (`serde_json::Map`).

use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use smallvec::SmallVec;

/// A record with a closed set of named fields.
///
/// `Field` is usually a fieldless enum, so a key that does not exist on the
/// record cannot be written down at all.
pub trait Record {
    type Field: Copy + Eq + fmt::Debug;
    /// Borrowed view of a single field value.
    type Value<'a>
    where
        Self: 'a;

    fn field(&self, field: Self::Field) -> Self::Value<'_>;
    fn field_name(field: Self::Field) -> &'static str;
}

/// The subset of a record's fields selected by [`pick`], borrowing from the record.
pub struct Picked<'a, R: Record + 'a> {
    entries: SmallVec<[(R::Field, R::Value<'a>); 8]>,
}

impl<'a, R: Record + 'a> Picked<'a, R> {
    pub fn get(&self, field: R::Field) -> Option<&R::Value<'a>> {
        self.entries.iter().find(|(f, _)| *f == field).map(|(_, v)| v)
    }

    pub fn contains(&self, field: R::Field) -> bool { self.get(field).is_some() }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Fields in the order they were requested.
    pub fn fields(&self) -> Vec<R::Field> {
        self.entries.iter().map(|(f, _)| *f).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (R::Field, R::Value<'a>)> {
        self.entries.iter()
    }
}

/// Order-insensitive: same fields with equal values.
impl<'a, R> PartialEq for Picked<'a, R>
where
    R: Record + 'a,
    R::Value<'a>: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.entries.iter().all(|(f, v)| other.get(*f).map(|o| o == v).unwrap_or(false))
    }
}

impl<'a, R> fmt::Debug for Picked<'a, R>
where
    R: Record + 'a,
    R::Value<'a>: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (R::field_name(*k), v)))
            .finish()
    }
}

impl<'a, R> Serialize for Picked<'a, R>
where
    R: Record + 'a,
    R::Value<'a>: Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in self.entries.iter() {
            map.serialize_entry(R::field_name(*k), v)?;
        }
        map.end()
    }
}

/// Select `keys` from `obj`. Values are borrowed, duplicate keys collapse to one entry.
pub fn pick<'a, R: Record>(obj: &'a R, keys: &[R::Field]) -> Picked<'a, R> {
    let mut entries: SmallVec<[(R::Field, R::Value<'a>); 8]> = SmallVec::new();
    for &key in keys {
        if entries.iter().any(|(f, _)| *f == key) {
            continue;
        }
        entries.push((key, obj.field(key)));
    }
    Picked { entries }
}

/// Select `keys` from a JSON object. Keys missing from `obj` are skipped.
pub fn pick_json<I>(obj: &Map<String, Value>, keys: I) -> Map<String, Value>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut out = Map::new();
    for key in keys {
        let key = key.as_ref();
        if let Some(v) = obj.get(key) {
            out.insert(key.to_string(), v.clone());
        }
    }
    out
}
