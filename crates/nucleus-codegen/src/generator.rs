//! ABI-to-source generator.
//!
//! Turns a list of [`AbiEntry`] values into one source text in which every
//! declaration appears after the declarations it references.
//!
//! Generation is best effort. Entries that cannot be rendered are reported as
//! [`GenerationIssue`]s and left out, and entries referencing a left-out entry
//! are left out too, so the emitted text never references an undeclared type.
//!
//! # Examples
//!
//! ```
//! use nucleus_abi::AbiDocument;
//! use nucleus_codegen::AbiGenerator;
//!
//! let doc = AbiDocument::from_json(r#"[
//!     {"type": "fn", "name": "origin", "method": "get", "inputs": [],
//!      "output": {"kind": "path", "path": ["Point"]}},
//!     {"type": "struct", "name": "Point", "fields": [
//!         {"name": "x", "ty": {"kind": "path", "path": ["u32"]}},
//!         {"name": "y", "ty": {"kind": "path", "path": ["u32"]}}
//!     ]}
//! ]"#).unwrap();
//!
//! let generator = AbiGenerator::new().unwrap();
//! let source = generator.generate(&doc.entries).unwrap();
//!
//! assert_eq!(source.order, vec!["Point", "origin"]);
//! assert!(source.text.contains("export class Point extends Struct {"));
//! ```

use crate::render::{
    CODEC_LIBRARY, RESERVED_WORDS, Rendered, TypeRenderer, generic_params, is_identifier,
    property_key, referenced_user_types,
};
use crate::template_engine::TemplateEngine;
use crate::types::{
    AliasContext, Declaration, EnumContext, FunctionContext, GeneratedSource, GenerationIssue,
    HeaderContext, IssueKind, MemberContext, ParamContext, StructContext,
};
use nucleus_abi::{AbiEntry, EnumDef, Field, FunctionDef, StructDef, TypeAliasDef, Variant};
use nucleus_core::Result;
use nucleus_core::order::lenient_topological_order;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Generator for codec-backed source declarations.
///
/// # Examples
///
/// ```
/// use nucleus_codegen::AbiGenerator;
///
/// let generator = AbiGenerator::new().unwrap().with_source_label("nucleus n1");
/// let source = generator.generate(&[]).unwrap();
/// assert!(source.text.contains("nucleus n1"));
/// assert!(source.order.is_empty());
/// ```
#[derive(Debug)]
pub struct AbiGenerator<'a> {
    engine: TemplateEngine<'a>,
    source_label: String,
}

/// Shared lookup state for validating and rendering entries.
struct Scope {
    user_types: HashMap<String, usize>,
    skipped: HashSet<String>,
}

impl Scope {
    fn renderer(&self, generics: &[String]) -> TypeRenderer<'_> {
        TypeRenderer::new(&self.user_types, &self.skipped, generics)
    }

    fn reject(&mut self, entry: &AbiEntry) {
        if entry.is_type() {
            self.user_types.remove(entry.name());
        }
        self.skipped.insert(entry.name().to_string());
    }
}

impl<'a> AbiGenerator<'a> {
    /// Creates a new generator.
    ///
    /// # Errors
    ///
    /// Returns error if template registration fails.
    pub fn new() -> Result<Self> {
        Ok(Self {
            engine: TemplateEngine::new()?,
            source_label: "a nucleus".to_string(),
        })
    }

    /// Sets the origin named in the header comment.
    #[must_use]
    pub fn with_source_label(mut self, label: impl Into<String>) -> Self {
        self.source_label = label.into();
        self
    }

    /// Generates source for `entries`.
    ///
    /// Per-entry failures end up in [`GeneratedSource::issues`]; only a
    /// failure to render the header aborts generation.
    ///
    /// # Errors
    ///
    /// Returns error if the header template cannot be rendered.
    pub fn generate(&self, entries: &[AbiEntry]) -> Result<GeneratedSource> {
        let mut issues = Vec::new();
        let mut scope = Scope {
            user_types: HashMap::new(),
            skipped: HashSet::new(),
        };

        let candidates = Self::admit(entries, &mut scope, &mut issues);
        let live = Self::validate(&candidates, &mut scope, &mut issues);

        let dependency_items: Vec<(String, Vec<String>)> = live
            .iter()
            .map(|entry| (entry.name().to_string(), dependencies(entry, &scope.user_types)))
            .collect();
        let sorted = lenient_topological_order(&dependency_items);
        if sorted.had_stall() {
            tracing::debug!(flushed = ?sorted.flushed, "entries emitted in declaration order after a dependency cycle");
        }

        let by_name: HashMap<&str, &AbiEntry> = live.iter().map(|e| (e.name(), *e)).collect();
        let mut imports = BTreeSet::new();
        let mut declarations = Vec::with_capacity(sorted.order.len());

        for name in &sorted.order {
            let Some(entry) = by_name.get(name.as_str()) else {
                continue;
            };
            match self.render_entry(entry, &scope) {
                Ok((text, used)) => {
                    tracing::debug!(entry = %name, kind = entry.kind(), "rendered declaration");
                    imports.extend(used);
                    declarations.push(Declaration {
                        name: name.clone(),
                        kind: entry.kind().to_string(),
                        text,
                    });
                }
                Err(kind) => {
                    tracing::warn!(entry = %name, reason = %kind, "skipping ABI entry");
                    issues.push(GenerationIssue::new(name.clone(), kind));
                }
            }
        }

        let imports: Vec<String> = imports.into_iter().collect();
        let header = self.engine.render(
            "header",
            &HeaderContext {
                source: self.source_label.clone(),
                library: CODEC_LIBRARY.to_string(),
                has_imports: !imports.is_empty(),
                imports: imports.clone(),
            },
        )?;

        let mut text = header;
        for declaration in &declarations {
            text.push('\n');
            text.push_str(&declaration.text);
        }

        tracing::info!(
            entries = entries.len(),
            emitted = declarations.len(),
            skipped = issues.len(),
            "generated source from ABI"
        );

        Ok(GeneratedSource {
            text,
            order: declarations.iter().map(|d| d.name.clone()).collect(),
            imports,
            declarations,
            issues,
        })
    }

    /// Drops duplicates and entries with undeclarable names; registers the
    /// remaining type entries in `scope`.
    fn admit<'e>(
        entries: &'e [AbiEntry],
        scope: &mut Scope,
        issues: &mut Vec<GenerationIssue>,
    ) -> Vec<&'e AbiEntry> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut candidates = Vec::with_capacity(entries.len());

        for entry in entries {
            let name = entry.name();
            if !seen.insert(name) {
                tracing::warn!(entry = %name, "duplicate ABI entry, keeping the first declaration");
                issues.push(GenerationIssue::new(name, IssueKind::DuplicateSymbol));
                continue;
            }

            if let Some(invalid) = invalid_name(entry) {
                tracing::warn!(entry = %name, name = %invalid, "ABI entry has an invalid identifier");
                issues.push(GenerationIssue::new(
                    name,
                    IssueKind::InvalidIdentifier { name: invalid },
                ));
                scope.skipped.insert(name.to_string());
                continue;
            }

            if entry.is_type() {
                scope
                    .user_types
                    .insert(name.to_string(), entry.generics().len());
            }
            candidates.push(entry);
        }

        candidates
    }

    /// Rejects entries with invalid references until no further entry fails.
    fn validate<'e>(
        candidates: &[&'e AbiEntry],
        scope: &mut Scope,
        issues: &mut Vec<GenerationIssue>,
    ) -> Vec<&'e AbiEntry> {
        let mut rejected = vec![false; candidates.len()];

        loop {
            let mut changed = false;
            for (index, entry) in candidates.iter().enumerate() {
                if rejected[index] {
                    continue;
                }
                if let Err(kind) = check_references(entry, scope) {
                    tracing::warn!(entry = %entry.name(), reason = %kind, "skipping ABI entry");
                    rejected[index] = true;
                    changed = true;
                    scope.reject(entry);
                    issues.push(GenerationIssue::new(entry.name(), kind));
                }
            }
            if !changed {
                break;
            }
        }

        candidates
            .iter()
            .zip(rejected)
            .filter(|(_, rejected)| !rejected)
            .map(|(entry, _)| *entry)
            .collect()
    }

    fn render_entry(
        &self,
        entry: &AbiEntry,
        scope: &Scope,
    ) -> std::result::Result<(String, BTreeSet<String>), IssueKind> {
        match entry {
            AbiEntry::Struct(def) => self.render_struct(def, scope),
            AbiEntry::Enum(def) => self.render_enum(def, scope),
            AbiEntry::Function(def) => self.render_function(def, scope),
            AbiEntry::TypeAlias(def) => self.render_alias(def, scope),
        }
    }

    fn render_template<T: serde::Serialize>(
        &self,
        template: &str,
        context: &T,
    ) -> std::result::Result<String, IssueKind> {
        self.engine
            .render(template, context)
            .map_err(|e| IssueKind::Template {
                message: e.to_string(),
            })
    }

    fn render_struct(
        &self,
        def: &StructDef,
        scope: &Scope,
    ) -> std::result::Result<(String, BTreeSet<String>), IssueKind> {
        let mut renderer = scope.renderer(&def.generics);
        renderer.import("Struct");
        let fields = members(&mut renderer, &def.fields)?;

        let text = self.render_template(
            "struct",
            &StructContext {
                name: def.name.clone(),
                generics: generic_params(&def.generics),
                fields,
            },
        )?;
        Ok((text, renderer.into_imports()))
    }

    fn render_enum(
        &self,
        def: &EnumDef,
        scope: &Scope,
    ) -> std::result::Result<(String, BTreeSet<String>), IssueKind> {
        let mut renderer = scope.renderer(&def.generics);
        renderer.import("Enum");

        let mut variants = Vec::with_capacity(def.variants.len());
        for variant in &def.variants {
            let payload = variant_payload(&mut renderer, variant)?;
            variants.push(MemberContext {
                key: property_key(&variant.name),
                ts_type: payload.ts,
                codec: payload.codec,
            });
        }

        let union = if variants.is_empty() {
            "never".to_string()
        } else {
            variants
                .iter()
                .map(|v| format!("{{ {}: {} }}", v.key, v.ts_type))
                .collect::<Vec<_>>()
                .join(" | ")
        };

        let text = self.render_template(
            "enum",
            &EnumContext {
                name: def.name.clone(),
                generics: generic_params(&def.generics),
                union,
                variants,
            },
        )?;
        Ok((text, renderer.into_imports()))
    }

    fn render_alias(
        &self,
        def: &TypeAliasDef,
        scope: &Scope,
    ) -> std::result::Result<(String, BTreeSet<String>), IssueKind> {
        let mut renderer = scope.renderer(&def.generics);
        let target = renderer.render(&def.target)?;

        let text = self.render_template(
            "alias",
            &AliasContext {
                name: def.name.clone(),
                generics: generic_params(&def.generics),
                ts_type: target.ts,
                codec: target.codec,
            },
        )?;
        Ok((text, renderer.into_imports()))
    }

    fn render_function(
        &self,
        def: &FunctionDef,
        scope: &Scope,
    ) -> std::result::Result<(String, BTreeSet<String>), IssueKind> {
        let mut renderer = scope.renderer(&[]);

        let mut params = Vec::with_capacity(def.inputs.len());
        for (index, input) in def.inputs.iter().enumerate() {
            let rendered = renderer.render(&input.ty)?;
            params.push(ParamContext {
                name: parameter_name(&input.name, index),
                ts_type: rendered.ts,
                codec: rendered.codec,
            });
        }

        let output = match &def.output {
            Some(ty) => renderer.render(ty)?,
            None => renderer.render(&nucleus_abi::TypeExpr::unit())?,
        };

        let text = self.render_template(
            "function",
            &FunctionContext {
                name: def.name.clone(),
                method: def.method.to_string(),
                params,
                return_type: output.ts,
                output_codec: output.codec,
            },
        )?;
        Ok((text, renderer.into_imports()))
    }
}

/// Returns the first name of `entry` that cannot be declared.
fn invalid_name(entry: &AbiEntry) -> Option<String> {
    let name = entry.name();
    if !is_identifier(name) {
        return Some(name.to_string());
    }
    // Underscore-prefixed functions are reserved for generated helpers
    if matches!(entry, AbiEntry::Function(_)) && name.starts_with('_') {
        return Some(name.to_string());
    }
    entry
        .generics()
        .iter()
        .find(|generic| !is_identifier(generic))
        .cloned()
}

fn check_references(entry: &AbiEntry, scope: &Scope) -> std::result::Result<(), IssueKind> {
    let mut renderer = scope.renderer(entry.generics());
    for ty in entry.type_exprs() {
        renderer.render(ty)?;
    }
    Ok(())
}

fn dependencies(entry: &AbiEntry, user_types: &HashMap<String, usize>) -> Vec<String> {
    let mut deps: Vec<String> = Vec::new();
    for ty in entry.type_exprs() {
        for name in referenced_user_types(ty, entry.generics(), user_types) {
            if name != entry.name() && !deps.contains(&name) {
                deps.push(name);
            }
        }
    }
    deps
}

fn field_key(field: &Field, index: usize) -> String {
    if field.is_positional() {
        property_key(&index.to_string())
    } else {
        property_key(&field.name)
    }
}

fn members(
    renderer: &mut TypeRenderer<'_>,
    fields: &[Field],
) -> std::result::Result<Vec<MemberContext>, IssueKind> {
    fields
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let rendered = renderer.render(&field.ty)?;
            Ok(MemberContext {
                key: field_key(field, index),
                ts_type: rendered.ts,
                codec: rendered.codec,
            })
        })
        .collect()
}

fn variant_payload(
    renderer: &mut TypeRenderer<'_>,
    variant: &Variant,
) -> std::result::Result<Rendered, IssueKind> {
    match variant.fields.as_slice() {
        [] => {
            renderer.import("Null");
            Ok(Rendered {
                ts: "null".to_string(),
                codec: "Null".to_string(),
            })
        }
        [single] if single.is_positional() => renderer.render(&single.ty),
        fields if fields.iter().all(Field::is_positional) => {
            let rendered = fields
                .iter()
                .map(|field| renderer.render(&field.ty))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            renderer.import("Tuple");
            Ok(Rendered {
                ts: format!(
                    "[{}]",
                    rendered.iter().map(|r| r.ts.as_str()).collect::<Vec<_>>().join(", ")
                ),
                codec: format!(
                    "Tuple.with({})",
                    rendered.iter().map(|r| r.codec.as_str()).collect::<Vec<_>>().join(", ")
                ),
            })
        }
        fields => {
            let members = members(renderer, fields)?;
            renderer.import("Struct");
            Ok(Rendered {
                ts: format!(
                    "{{ {} }}",
                    members
                        .iter()
                        .map(|m| format!("{}: {};", m.key, m.ts_type))
                        .collect::<Vec<_>>()
                        .join(" ")
                ),
                codec: format!(
                    "Struct.with({{ {} }})",
                    members
                        .iter()
                        .map(|m| format!("{}: {}", m.key, m.codec))
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            })
        }
    }
}

/// Derives a declarable parameter name from an ABI input name.
fn parameter_name(raw: &str, index: usize) -> String {
    let mut name: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if name.is_empty() {
        return format!("arg{index}");
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, 'p');
    }
    if RESERVED_WORDS.contains(&name.as_str()) {
        name.push('_');
    }
    name
}
