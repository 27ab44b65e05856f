use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::Tag;

/// A compound's members. Insertion order is preserved so that a parsed
/// document can be written back byte-for-byte.
pub type Compound = IndexMap<String, Value>;

/// A complete NBT value. It owns its data. Lists and compounds are
/// recursively owned.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    ByteArray(Vec<i8>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
    List(List),
    Compound(Compound),
}

impl Value {
    /// The tag this value serializes under.
    pub fn tag(&self) -> Tag {
        match self {
            Value::Byte(_) => Tag::Byte,
            Value::Short(_) => Tag::Short,
            Value::Int(_) => Tag::Int,
            Value::Long(_) => Tag::Long,
            Value::Float(_) => Tag::Float,
            Value::Double(_) => Tag::Double,
            Value::String(_) => Tag::String,
            Value::ByteArray(_) => Tag::ByteArray,
            Value::IntArray(_) => Tag::IntArray,
            Value::LongArray(_) => Tag::LongArray,
            Value::List(_) => Tag::List,
            Value::Compound(_) => Tag::Compound,
        }
    }

    pub fn as_compound(&self) -> Option<&Compound> {
        match self {
            Value::Compound(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_compound_mut(&mut self) -> Option<&mut Compound> {
        match self {
            Value::Compound(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

/// An NBT list. All elements share one kind, recorded in `element` so that
/// an empty list round-trips with the element kind it had on the wire. An
/// empty list read with element kind `End` is the "unknown" form; see
/// `gitmc-snbt`'s normalization for how it is made concrete before writing.
#[derive(Debug, Clone, PartialEq)]
pub struct List {
    element: Tag,
    items: Vec<Value>,
}

impl List {
    /// An empty list of the given element kind.
    pub fn new(element: Tag) -> List {
        List {
            element,
            items: Vec::new(),
        }
    }

    /// The empty list whose element kind was not recorded on the wire.
    pub fn unknown() -> List {
        List::new(Tag::End)
    }

    /// Build a list from parts, checking every element against `element`.
    pub fn from_values(element: Tag, items: Vec<Value>) -> Result<List> {
        for item in &items {
            if item.tag() != element {
                return Err(Error::list_mismatch(element, item.tag()));
            }
        }
        Ok(List { element, items })
    }

    pub fn push(&mut self, value: Value) -> Result<()> {
        if self.element == Tag::End && self.items.is_empty() {
            // First element of an unknown-kind list fixes the kind.
            self.element = value.tag();
        } else if value.tag() != self.element {
            return Err(Error::list_mismatch(self.element, value.tag()));
        }
        self.items.push(value);
        Ok(())
    }

    pub fn element(&self) -> Tag {
        self.element
    }

    /// Replace the element kind of an empty list. Errors if not empty.
    pub fn set_element(&mut self, element: Tag) -> Result<()> {
        if !self.items.is_empty() {
            return Err(Error::list_mismatch(element, self.element));
        }
        self.element = element;
        Ok(())
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut Vec<Value> {
        &mut self.items
    }

    pub fn into_items(self) -> Vec<Value> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }
}

impl<'a> IntoIterator for &'a List {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
