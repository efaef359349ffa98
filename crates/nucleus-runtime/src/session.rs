//! One ABI exploration session.
//!
//! A [`Session`] owns everything bound from one generated source: the codec
//! registry, the symbol table and the interface table. Nothing is shared
//! between sessions, so loading a second ABI never disturbs the first.

use nucleus_abi::{AbiDocument, AbiEntry};
use nucleus_core::{Error, Result};
use serde_json::Value;
use tracing::info;

use crate::args::{ArgumentForm, InterfaceTable};
use crate::binder::{BindReport, Binder, Bindings};
use crate::codec::CodecRegistry;
use crate::eval::{CallRequest, Evaluator, RtValue};
use crate::host::NucleusHost;
use crate::symbols::{BoundFunction, SymbolTable};
use crate::syntax::Module;

/// Live codecs and callable functions of one nucleus ABI.
///
/// # Examples
///
/// ```
/// use nucleus_runtime::Session;
/// use serde_json::json;
///
/// let session = Session::from_abi_json(r#"[
///     {"type": "struct", "name": "Point", "fields": [
///         {"name": "x", "ty": {"kind": "path", "path": ["u32"]}},
///         {"name": "y", "ty": {"kind": "path", "path": ["u32"]}}
///     ]},
///     {"type": "fn", "name": "distance", "method": "get",
///      "inputs": [
///         {"name": "a", "ty": {"kind": "path", "path": ["Point"]}},
///         {"name": "b", "ty": {"kind": "path", "path": ["Point"]}}
///      ],
///      "output": {"kind": "path", "path": ["u32"]}}
/// ]"#).unwrap();
///
/// assert!(session.report().is_clean());
/// let call = session
///     .prepare_call("distance", &json!({"a": {"x": 1, "y": 2}, "b": {"x": 3, "y": 4}}))
///     .unwrap();
/// assert_eq!(call.endpoint, "distance");
/// assert_eq!(call.payload.len(), 16);
/// ```
#[derive(Debug, Clone)]
pub struct Session {
    source: String,
    module: Module,
    registry: CodecRegistry,
    symbols: SymbolTable,
    interfaces: InterfaceTable,
    report: BindReport,
}

impl Session {
    /// Parses and binds generated source text.
    #[must_use]
    pub fn bind_source(source: impl Into<String>) -> Self {
        let source = source.into();
        let Bindings {
            module,
            registry,
            symbols,
            report,
        } = Binder::from_source(&source).bind();
        let interfaces = InterfaceTable::from_module(&module);

        info!(
            symbols = symbols.len(),
            codecs = registry.len(),
            failures = report.failures.len(),
            "session bound"
        );
        Self {
            source,
            module,
            registry,
            symbols,
            interfaces,
            report,
        }
    }

    /// Generates source for `entries` and binds it. Entries the generator
    /// skipped are listed in the report.
    ///
    /// # Errors
    ///
    /// Returns error if the generator cannot be set up.
    pub fn from_entries(entries: &[AbiEntry]) -> Result<Self> {
        let generated = nucleus_codegen::generate(entries)?;
        let mut session = Self::bind_source(generated.text);
        session.report.generation_issues = generated.issues;
        Ok(session)
    }

    /// Generates and binds the entries of a loaded document.
    ///
    /// # Errors
    ///
    /// Returns error if the generator cannot be set up.
    pub fn from_document(document: &AbiDocument) -> Result<Self> {
        Self::from_entries(&document.entries)
    }

    /// Loads an ABI document from JSON text, then generates and binds it.
    ///
    /// # Errors
    ///
    /// Returns error if the text is not an ABI document or the generator
    /// cannot be set up.
    pub fn from_abi_json(text: &str) -> Result<Self> {
        Self::from_document(&AbiDocument::from_json(text)?)
    }

    /// Source text the session was bound from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parsed module.
    #[must_use]
    pub const fn module(&self) -> &Module {
        &self.module
    }

    /// Live codecs.
    #[must_use]
    pub const fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    /// Bound symbols.
    #[must_use]
    pub const fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Interfaces and type aliases used for argument forms.
    #[must_use]
    pub const fn interfaces(&self) -> &InterfaceTable {
        &self.interfaces
    }

    /// Binding report.
    #[must_use]
    pub const fn report(&self) -> &BindReport {
        &self.report
    }

    /// Callable functions in binding order.
    pub fn functions(&self) -> impl Iterator<Item = &BoundFunction> {
        self.symbols.functions()
    }

    /// The function named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SymbolNotFound`] if no function of that name is bound.
    pub fn function(&self, name: &str) -> Result<&BoundFunction> {
        self.functions()
            .find(|function| function.name() == name)
            .ok_or_else(|| Error::SymbolNotFound {
                name: name.to_string(),
            })
    }

    /// Editable arguments for the function named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SymbolNotFound`] if no function of that name is bound.
    pub fn argument_form(&self, name: &str) -> Result<ArgumentForm> {
        let function = self.function(name)?;
        Ok(ArgumentForm::new(function.params(), &self.interfaces))
    }

    /// Evaluates the function named `name` into a call.
    ///
    /// `args` is an object keyed by parameter name or an array of positional
    /// arguments. A parameter renamed with a trailing `_` also accepts its
    /// original name.
    ///
    /// # Errors
    ///
    /// Returns error if the function is not bound, `args` has the wrong
    /// shape, or an argument does not match its codec.
    pub fn prepare_call(&self, name: &str, args: &Value) -> Result<CallRequest> {
        let function = self.function(name)?;
        let values: Vec<Value> = match args {
            Value::Object(map) => function
                .params()
                .iter()
                .map(|param| {
                    map.get(&param.name)
                        .or_else(|| map.get(param.name.trim_end_matches('_')))
                        .cloned()
                        .unwrap_or(Value::Null)
                })
                .collect(),
            Value::Array(items) => items.clone(),
            Value::Null => Vec::new(),
            other => {
                return Err(Error::InvalidArgument(format!(
                    "arguments must be an object or an array, found {other}"
                )));
            }
        };

        let evaluator = Evaluator::new(&self.registry, &self.symbols);
        match evaluator.call(function.decl(), values.into_iter().map(RtValue::Data).collect())? {
            RtValue::Call(request) => Ok(request),
            other => Err(Error::Evaluation {
                message: format!("'{name}' returned a {} instead of a call", other.kind()),
            }),
        }
    }

    /// Calls the function named `name` through `host` and decodes the reply.
    ///
    /// # Errors
    ///
    /// Returns error if the call cannot be prepared, the host fails, or the
    /// reply does not match the output codec.
    pub async fn invoke(&self, name: &str, args: &Value, host: &dyn NucleusHost) -> Result<Value> {
        let request = self.prepare_call(name, args)?;
        info!(
            function = name,
            method = %request.method,
            bytes = request.payload.len(),
            "invoking nucleus function"
        );
        let reply = host
            .request(request.method, &request.endpoint, &request.payload)
            .await?;
        Ok(self.registry.decode_with(&request.output, &reply)?)
    }

    /// Encodes `value` with the codec registered as `type_name`.
    ///
    /// # Errors
    ///
    /// Returns error if the codec is unknown or the value does not match.
    pub fn encode(&self, type_name: &str, value: &Value) -> Result<Vec<u8>> {
        Ok(self.registry.encode(type_name, value)?)
    }

    /// Decodes `bytes` with the codec registered as `type_name`.
    ///
    /// # Errors
    ///
    /// Returns error if the codec is unknown or the bytes are malformed.
    pub fn decode(&self, type_name: &str, bytes: &[u8]) -> Result<Value> {
        Ok(self.registry.decode(type_name, bytes)?)
    }
}
