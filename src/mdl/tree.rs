//! Untyped syntax tree of the text form.
//!
//! The parser produces a list of [`Property`] blocks without knowing what any
//! keyword means. The converters then pull typed values out through the
//! accessors here, which is also where absent fields fall back to their
//! defaults ([`Property::get_or`]).

use std::str::FromStr;

use crate::util::{Error, Result};

/// Source position of a syntax element.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pos {
    pub line: usize,
    pub column: usize,
}

impl Pos {
    pub fn error(self, msg: impl Into<String>) -> Error {
        Error::grammar(self.line, self.column, msg)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Number(String),
    Str(String),
    Ident(String),
    /// `{ 1, 2, 3 }`
    Vector(Vec<String>),
}

impl Value {
    /// Parse a scalar number.
    pub fn parse<T: FromStr>(&self, pos: Pos) -> Result<T> {
        match self {
            Value::Number(s) => parse_number(s, pos),
            other => Err(pos.error(format!("expected a number, found {}", other.describe()))),
        }
    }

    /// Parse an `N`-component value: a bare number when `N` is 1, otherwise
    /// a vector literal of exactly `N` numbers.
    pub fn parse_array<T: FromStr, const N: usize>(&self, pos: Pos) -> Result<[T; N]> {
        let items: Vec<T> = match self {
            Value::Number(s) if N == 1 => vec![parse_number(s, pos)?],
            Value::Vector(items) => items.iter().map(|s| parse_number(s, pos)).collect::<Result<_>>()?,
            other => return Err(pos.error(format!("expected {} numbers, found {}", N, other.describe()))),
        };
        let found = items.len();
        <[T; N]>::try_from(items).map_err(|_| pos.error(format!("expected {} numbers, found {}", N, found)))
    }

    /// Numbers of a vector literal, or a lone number as a one-item list.
    pub fn numbers<T: FromStr>(&self, pos: Pos) -> Result<Vec<T>> {
        match self {
            Value::Vector(items) => items.iter().map(|s| parse_number(s, pos)).collect(),
            other => Ok(vec![other.parse(pos)?]),
        }
    }

    fn describe(&self) -> String {
        match self {
            Value::Number(s) => format!("number {}", s),
            Value::Str(s) => format!("string {:?}", s),
            Value::Ident(s) => format!("keyword {}", s),
            Value::Vector(v) => format!("vector of {}", v.len()),
        }
    }
}

pub fn parse_number<T: FromStr>(s: &str, pos: Pos) -> Result<T> {
    s.parse().map_err(|_| pos.error(format!("number {} out of range", s)))
}

/// One item inside a `{ ... }` body.
#[derive(Clone, Debug, PartialEq)]
pub enum Entry {
    Property(Property),
    /// Bare value such as a vertex `{ 0, 0, 0 },`.
    Value(Value, Pos),
    /// `frame: value,`
    Key { frame: String, value: Value, pos: Pos },
}

/// `[static] Keyword values* ('{' body '}')?`
#[derive(Clone, Debug, PartialEq)]
pub struct Property {
    pub key: String,
    pub is_static: bool,
    pub values: Vec<Value>,
    pub body: Option<Vec<Entry>>,
    pub pos: Pos,
}

impl Property {
    pub fn error(&self, msg: impl Into<String>) -> Error {
        self.pos.error(format!("{}: {}", self.key, msg.into()))
    }

    pub fn entries(&self) -> &[Entry] {
        self.body.as_deref().unwrap_or_default()
    }

    /// Nested properties in order.
    pub fn children(&self) -> impl Iterator<Item = &Property> {
        self.entries().iter().filter_map(|e| match e {
            Entry::Property(p) => Some(p),
            _ => None,
        })
    }

    /// Nested properties named `key`.
    pub fn all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Property> {
        self.children().filter(move |p| p.key == key)
    }

    pub fn child(&self, key: &str) -> Option<&Property> {
        self.children().find(|p| p.key == key)
    }

    /// Non-animated form of `key`: either `static Key v` or a plain `Key v`.
    pub fn static_child(&self, key: &str) -> Option<&Property> {
        self.children().find(|p| p.key == key && p.body.is_none())
    }

    /// Animated form of `key`: `Key n { ... }`.
    pub fn track_child(&self, key: &str) -> Option<&Property> {
        self.children().find(|p| p.key == key && p.body.is_some())
    }

    /// Flag properties are written only when set.
    pub fn has_flag(&self, key: &str) -> bool {
        self.child(key).is_some()
    }

    /// Bitmask of every keyword from `table` present as a flag.
    pub fn flags(&self, table: &[(u32, &str)]) -> u32 {
        table.iter().filter(|(_, kw)| self.has_flag(kw)).fold(0, |acc, (bit, _)| acc | bit)
    }

    /// The first quoted string value, as in `Bone "name" { ... }`.
    pub fn name(&self) -> Result<&str> {
        self.values
            .iter()
            .find_map(|v| match v {
                Value::Str(s) => Some(s.as_str()),
                _ => None,
            })
            .ok_or_else(|| self.error("expected a quoted name"))
    }

    pub fn string(&self) -> Result<&str> {
        self.name()
    }

    /// The first bare keyword value, as in `FilterMode Blend`.
    pub fn ident(&self) -> Result<&str> {
        self.values
            .iter()
            .find_map(|v| match v {
                Value::Ident(s) => Some(s.as_str()),
                _ => None,
            })
            .ok_or_else(|| self.error("expected a keyword"))
    }

    fn first_value(&self) -> Result<&Value> {
        self.values.first().ok_or_else(|| self.error("missing value"))
    }

    pub fn number<T: FromStr>(&self) -> Result<T> {
        self.first_value()?.parse(self.pos)
    }

    pub fn array<T: FromStr, const N: usize>(&self) -> Result<[T; N]> {
        self.first_value()?.parse_array(self.pos)
    }

    /// Declared member count of a counted block (`Sequences 3 { ... }`).
    pub fn count(&self) -> Option<usize> {
        match self.values.first() {
            Some(Value::Number(s)) => s.parse().ok(),
            _ => None,
        }
    }

    /// Every number of a flat list, written either as a vector literal
    /// (`{ 0, 1, 2 }`) or as bare numbers in a body.
    pub fn numbers<T: FromStr>(&self) -> Result<Vec<T>> {
        if let Some(vector) = self.values.iter().find(|v| matches!(v, Value::Vector(_))) {
            return vector.numbers(self.pos);
        }
        self.entries()
            .iter()
            .filter_map(|e| match e {
                Entry::Value(v, pos) => Some(v.parse(*pos)),
                _ => None,
            })
            .collect()
    }

    /// Every bare `N`-vector in the body, as in `Vertices 3 { {..}, {..} }`.
    pub fn vectors<T: FromStr, const N: usize>(&self) -> Result<Vec<[T; N]>> {
        self.entries()
            .iter()
            .filter_map(|e| match e {
                Entry::Value(v, pos) => Some(v.parse_array(*pos)),
                _ => None,
            })
            .collect()
    }

    /// Required scalar field.
    pub fn field<T: FromStr>(&self, key: &str) -> Result<T> {
        self.static_child(key)
            .ok_or_else(|| self.error(format!("missing {}", key)))?
            .number()
    }

    /// Scalar field that falls back to `default` when absent.
    ///
    /// This is the read-side half of default omission; the renderer skips
    /// writing any field equal to the same default.
    pub fn get_or<T: FromStr>(&self, key: &str, default: T) -> Result<T> {
        match self.static_child(key) {
            Some(p) => p.number(),
            None => Ok(default),
        }
    }

    /// Vector field that falls back to `default` when absent.
    pub fn array_or<T: FromStr, const N: usize>(&self, key: &str, default: [T; N]) -> Result<[T; N]> {
        match self.static_child(key) {
            Some(p) => p.array(),
            None => Ok(default),
        }
    }

    /// Optional id where `-1` or absence means none.
    pub fn optional_id(&self, key: &str) -> Result<Option<u32>> {
        let Some(p) = self.static_child(key) else {
            return Ok(None);
        };
        if let Value::Ident(keyword) = p.first_value()? {
            return match keyword.as_str() {
                "None" | "Multiple" => Ok(None),
                other => Err(p.error(format!("{} {}: expected an id, None or Multiple", key, other))),
            };
        }
        let id: i64 = p.number()?;
        if id < 0 {
            return Ok(None);
        }
        u32::try_from(id).map(Some).map_err(|_| self.error(format!("{} {} out of range", key, id)))
    }

    pub fn string_or(&self, key: &str) -> Result<String> {
        self.static_child(key).map_or(Ok(String::new()), |p| p.string().map(str::to_owned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prop(key: &str, values: Vec<Value>) -> Property {
        Property { key: key.into(), is_static: false, values, body: None, pos: Pos { line: 1, column: 1 } }
    }

    #[test]
    fn test_parse_array_checks_arity() {
        let v = Value::Vector(vec!["1".into(), "2".into()]);
        let pos = Pos::default();
        assert_eq!(v.parse_array::<f32, 2>(pos).unwrap(), [1.0, 2.0]);
        assert!(v.parse_array::<f32, 3>(pos).is_err());
        assert_eq!(Value::Number("4".into()).parse_array::<u32, 1>(pos).unwrap(), [4]);
    }

    #[test]
    fn test_get_or_restores_default() {
        let mut block = prop("Anim", vec![Value::Str("Stand".into())]);
        block.body = Some(vec![Entry::Property(prop("MoveSpeed", vec![Value::Number("270".into())]))]);
        assert_eq!(block.get_or("MoveSpeed", 0.0f32).unwrap(), 270.0);
        assert_eq!(block.get_or("Rarity", 0.0f32).unwrap(), 0.0);
        assert_eq!(block.name().unwrap(), "Stand");
        assert!(block.field::<u32>("SyncPoint").is_err());
    }

    #[test]
    fn test_numbers_from_vector_or_body() {
        let flat = prop("VertexGroup", vec![Value::Vector(vec!["0".into(), "1".into()])]);
        assert_eq!(flat.numbers::<u8>().unwrap(), vec![0, 1]);

        let mut bare = prop("Matrices", vec![]);
        bare.body = Some(vec![Entry::Value(Value::Number("7".into()), Pos::default())]);
        assert_eq!(bare.numbers::<u32>().unwrap(), vec![7]);
    }

    #[test]
    fn test_optional_id() {
        let mut block = prop("Bone", vec![]);
        block.body = Some(vec![Entry::Property(prop("Parent", vec![Value::Number("-1".into())]))]);
        assert_eq!(block.optional_id("Parent").unwrap(), None);
        assert_eq!(block.optional_id("GeosetId").unwrap(), None);
    }

    #[test]
    fn test_optional_id_keywords() {
        let mut block = prop("Bone", vec![]);
        block.body = Some(vec![
            Entry::Property(prop("GeosetId", vec![Value::Ident("Multiple".into())])),
            Entry::Property(prop("GeosetAnimId", vec![Value::Ident("None".into())])),
            Entry::Property(prop("Parent", vec![Value::Number("3".into())])),
            Entry::Property(prop("TextureID", vec![Value::Ident("Some".into())])),
        ]);
        assert_eq!(block.optional_id("GeosetId").unwrap(), None);
        assert_eq!(block.optional_id("GeosetAnimId").unwrap(), None);
        assert_eq!(block.optional_id("Parent").unwrap(), Some(3));
        assert!(matches!(block.optional_id("TextureID"), Err(Error::Grammar { .. })));
    }
}
