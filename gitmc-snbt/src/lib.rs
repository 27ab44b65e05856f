//! Stringified NBT for *Minecraft: Java Edition*: the human-readable,
//! line-diffable projection of binary NBT.
//!
//! Serialization is deterministic given an option bundle; the two named
//! bundles are [`SnbtOptions::expanded`] (pretty, indented) and
//! [`SnbtOptions::compact`] (no whitespace, the basis for content
//! comparison). The parser accepts both forms.
//!
//! ```
//! use gitmc_nbt::{Compound, Value};
//! use gitmc_snbt::SnbtOptions;
//!
//! let mut c = Compound::new();
//! c.insert("num".to_string(), Value::Long(31300));
//! let v = Value::Compound(c);
//! let text = gitmc_snbt::to_string(&v, &SnbtOptions::compact());
//! assert_eq!(text, "{num:31300L}");
//! assert_eq!(gitmc_snbt::from_str(&text).unwrap(), v);
//! ```

pub mod error;

mod de;
mod parser;
mod ser;

pub use de::from_str;
pub use error::{Error, Result};
pub use ser::{to_string, QuoteStyle, SnbtOptions};

use gitmc_nbt::{Tag, Value};

#[cfg(test)]
mod tests;

/// Replace every zero-length list of unknown element kind with a
/// zero-length list of compounds, recursively. The unknown form is legal
/// on the wire but ambiguous to re-serialize; every SNBT→NBT write path
/// runs this first. Idempotent.
pub fn normalize_empty_lists(value: &mut Value) {
    match value {
        Value::List(list) => {
            if list.is_empty() && list.element() == Tag::End {
                // Cannot fail: the list is empty.
                list.set_element(Tag::Compound).ok();
            } else {
                for item in list.items_mut() {
                    normalize_empty_lists(item);
                }
            }
        }
        Value::Compound(compound) => {
            for (_, v) in compound.iter_mut() {
                normalize_empty_lists(v);
            }
        }
        _ => {}
    }
}
