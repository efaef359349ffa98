//! Per-session codec registry.

use indexmap::IndexMap;
use serde_json::Value;

use super::model::{CodecDef, RegistryEntry};
use super::scale::{self, CodecLookup};
use super::{CodecError, library};

/// Codecs registered by name, in registration order.
///
/// Names missing from the registry fall back to the codec library when lazy
/// references are resolved.
///
/// # Examples
///
/// ```
/// use nucleus_runtime::codec::{CodecDef, CodecRegistry, RegistryEntry};
/// use serde_json::json;
///
/// let mut registry = CodecRegistry::new();
/// registry.register("Balance", RegistryEntry::Codec(CodecDef::reference("U64")));
///
/// let bytes = registry.encode("Balance", &json!(5)).unwrap();
/// assert_eq!(bytes, vec![5, 0, 0, 0, 0, 0, 0, 0]);
/// assert_eq!(registry.decode("Balance", &bytes).unwrap(), json!(5));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CodecRegistry {
    entries: IndexMap<String, RegistryEntry>,
}

impl CodecRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `entry` under `name`, returning the entry it replaced.
    pub fn register(&mut self, name: impl Into<String>, entry: RegistryEntry) -> Option<RegistryEntry> {
        self.entries.insert(name.into(), entry)
    }

    /// Entry registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegistryEntry> {
        self.entries.get(name)
    }

    /// Returns `true` if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RegistryEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encodes `value` with the codec registered as `name`.
    ///
    /// # Errors
    ///
    /// Returns error if `name` is unknown, generic, or the value does not fit.
    pub fn encode(&self, name: &str, value: &Value) -> Result<Vec<u8>, CodecError> {
        self.encode_with(&CodecDef::reference(name), value)
    }

    /// Decodes `bytes` with the codec registered as `name`.
    ///
    /// # Errors
    ///
    /// Returns error if `name` is unknown, generic, or the bytes are malformed.
    pub fn decode(&self, name: &str, bytes: &[u8]) -> Result<Value, CodecError> {
        self.decode_with(&CodecDef::reference(name), bytes)
    }

    /// Encodes `value` with `def`, resolving references through this registry.
    ///
    /// # Errors
    ///
    /// Returns error if the value does not fit the codec.
    pub fn encode_with(&self, def: &CodecDef, value: &Value) -> Result<Vec<u8>, CodecError> {
        scale::encode(def, value, self)
    }

    /// Decodes `bytes` with `def`, resolving references through this registry.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are malformed or not fully consumed.
    pub fn decode_with(&self, def: &CodecDef, bytes: &[u8]) -> Result<Value, CodecError> {
        scale::decode(def, bytes, self)
    }

    /// Lazy references that name neither a registered entry nor a library
    /// export, as `(entry, reference)` pairs.
    #[must_use]
    pub fn unresolved_refs(&self) -> Vec<(String, String)> {
        let mut missing = Vec::new();
        for (name, entry) in &self.entries {
            let def = match entry {
                RegistryEntry::Codec(def) => def,
                RegistryEntry::Template(template) => &template.body,
                RegistryEntry::Factory(_) => continue,
            };
            def.visit_refs(&mut |reference| {
                let known = self.contains(reference) || library::contains(reference);
                let pair = (name.clone(), reference.to_string());
                if !known && !missing.contains(&pair) {
                    missing.push(pair);
                }
            });
        }
        missing
    }
}

impl CodecLookup for CodecRegistry {
    fn resolve(&self, name: &str, args: &[CodecDef]) -> Result<CodecDef, CodecError> {
        let entry = match self.entries.get(name) {
            Some(entry) => entry.clone(),
            None => library::lookup(name).ok_or_else(|| CodecError::Unresolved(name.to_string()))?,
        };
        match entry {
            RegistryEntry::Codec(def) if args.is_empty() => Ok(def),
            RegistryEntry::Codec(_) => Err(CodecError::Arity {
                codec: name.to_string(),
                expected: 0,
                found: args.len(),
            }),
            RegistryEntry::Template(template) => template.instantiate(args),
            RegistryEntry::Factory(factory) => Err(CodecError::InvalidArgument(format!(
                "{} must be applied with .with(..) before use",
                factory.name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CodecTemplate, Primitive};
    use serde_json::json;

    #[test]
    fn test_registration_order_and_replacement() {
        let mut registry = CodecRegistry::new();
        assert!(registry.register("B", RegistryEntry::Codec(CodecDef::Null)).is_none());
        registry.register("A", RegistryEntry::Codec(CodecDef::Null));
        let replaced = registry.register("B", RegistryEntry::Codec(CodecDef::Primitive(Primitive::U8)));
        assert_eq!(replaced, Some(RegistryEntry::Codec(CodecDef::Null)));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["B", "A"]);
    }

    #[test]
    fn test_lazy_reference_to_later_entry() {
        let mut registry = CodecRegistry::new();
        registry.register("Line", RegistryEntry::Codec(CodecDef::Vec(Box::new(CodecDef::reference("Point")))));
        registry.register("Point", RegistryEntry::Codec(CodecDef::Primitive(Primitive::U8)));
        assert_eq!(registry.encode("Line", &json!([1, 2])).unwrap(), vec![8, 1, 2]);
        assert!(registry.unresolved_refs().is_empty());
    }

    #[test]
    fn test_template_reference() {
        let mut registry = CodecRegistry::new();
        registry.register(
            "Pair",
            RegistryEntry::Template(CodecTemplate {
                name: "Pair".to_string(),
                params: vec!["T".to_string()],
                body: CodecDef::Tuple(vec![CodecDef::Param("T".to_string()), CodecDef::Param("T".to_string())]),
            }),
        );
        let def = CodecDef::Ref {
            name: "Pair".to_string(),
            args: vec![CodecDef::reference("U8")],
        };
        assert_eq!(registry.encode_with(&def, &json!([1, 2])).unwrap(), vec![1, 2]);
        assert!(registry.encode("Pair", &json!([1, 2])).is_err());
    }

    #[test]
    fn test_unresolved_refs_reported() {
        let mut registry = CodecRegistry::new();
        registry.register("Shape", RegistryEntry::Codec(CodecDef::Option(Box::new(CodecDef::reference("Missing")))));
        assert_eq!(
            registry.unresolved_refs(),
            vec![("Shape".to_string(), "Missing".to_string())]
        );
        assert!(matches!(
            registry.encode("Shape", &json!(1)),
            Err(CodecError::Unresolved(name)) if name == "Missing"
        ));
    }

    #[test]
    fn test_factory_is_not_a_codec() {
        let registry = CodecRegistry::new();
        assert!(registry.encode("Vec", &json!([])).is_err());
    }
}
