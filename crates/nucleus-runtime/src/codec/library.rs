//! The codec library that generated source imports from.

use super::model::{CodecDef, Factory, Primitive, RegistryEntry};

const PRIMITIVES: &[Primitive] = &[
    Primitive::U8,
    Primitive::U16,
    Primitive::U32,
    Primitive::U64,
    Primitive::U128,
    Primitive::I8,
    Primitive::I16,
    Primitive::I32,
    Primitive::I64,
    Primitive::I128,
    Primitive::Bool,
    Primitive::Text,
    Primitive::H160,
    Primitive::H256,
    Primitive::AccountId,
    Primitive::Bytes,
];

const FACTORIES: &[Factory] = &[
    Factory::Vec,
    Factory::Option,
    Factory::Result,
    Factory::Tuple,
    Factory::FixedArray,
    Factory::FixedBytes,
    Factory::BTreeMap,
    Factory::Compact,
    Factory::Struct,
    Factory::Enum,
];

/// Looks up a library export by name.
///
/// # Examples
///
/// ```
/// use nucleus_runtime::codec::{CodecDef, Primitive, RegistryEntry, library};
///
/// assert_eq!(
///     library::lookup("U32"),
///     Some(RegistryEntry::Codec(CodecDef::Primitive(Primitive::U32)))
/// );
/// assert!(library::lookup("Point").is_none());
/// ```
#[must_use]
pub fn lookup(name: &str) -> Option<RegistryEntry> {
    if name == "Null" {
        return Some(RegistryEntry::Codec(CodecDef::Null));
    }
    if let Some(primitive) = PRIMITIVES.iter().find(|p| p.name() == name) {
        return Some(RegistryEntry::Codec(CodecDef::Primitive(*primitive)));
    }
    FACTORIES
        .iter()
        .find(|f| f.name() == name)
        .map(|factory| RegistryEntry::Factory(*factory))
}

/// Returns `true` if the library exports `name`.
#[must_use]
pub fn contains(name: &str) -> bool {
    lookup(name).is_some()
}

/// Every exported name, primitives first.
pub fn names() -> impl Iterator<Item = &'static str> {
    std::iter::once("Null")
        .chain(PRIMITIVES.iter().map(|p| p.name()))
        .chain(FACTORIES.iter().map(|f| f.name()))
}
