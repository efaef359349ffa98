//! Rendering of ABI type expressions.
//!
//! Every [`TypeExpr`] is rendered twice: as a type annotation for the
//! interface declarations and as a codec expression built from the codec
//! library (`U32`, `Vec.with(T)`, ...). Rendering also validates references
//! and collects the library names the output needs to import.

use crate::types::IssueKind;
use nucleus_abi::TypeExpr;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Module path of the codec library imported by generated source.
pub const CODEC_LIBRARY: &str = "@nucleus/codec";

/// Keywords of the generated dialect; they cannot name declarations or
/// parameters.
pub const RESERVED_WORDS: &[&str] = &[
    "as", "async", "await", "class", "const", "export", "extends", "false", "from", "function",
    "import", "interface", "let", "null", "return", "true", "type",
];

/// A type rendered as annotation and codec expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Type annotation, e.g. `u32[]`.
    pub ts: String,
    /// Codec expression, e.g. `Vec.with(U32)`.
    pub codec: String,
}

impl Rendered {
    fn same(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            ts: text.clone(),
            codec: text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wrapper {
    List,
    Set,
    Option,
    Result,
    Map,
    Compact,
    Transparent,
    Phantom,
}

impl Wrapper {
    const fn arity(self) -> Option<usize> {
        match self {
            Self::List | Self::Set | Self::Option | Self::Compact | Self::Transparent => Some(1),
            Self::Result | Self::Map => Some(2),
            Self::Phantom => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Builtin {
    Primitive {
        codec: &'static str,
        ts: &'static str,
    },
    Wrapper(Wrapper),
}

fn builtin(name: &str) -> Option<Builtin> {
    let primitive = |codec, ts| Some(Builtin::Primitive { codec, ts });
    match name {
        "u8" => primitive("U8", "u8"),
        "u16" => primitive("U16", "u16"),
        "u32" => primitive("U32", "u32"),
        "u64" => primitive("U64", "u64"),
        "u128" => primitive("U128", "u128"),
        "i8" => primitive("I8", "i8"),
        "i16" => primitive("I16", "i16"),
        "i32" => primitive("I32", "i32"),
        "i64" => primitive("I64", "i64"),
        "i128" => primitive("I128", "i128"),
        "bool" => primitive("Bool", "bool"),
        "char" => primitive("U32", "u32"),
        "String" | "str" => primitive("Text", "string"),
        "H160" => primitive("H160", "string"),
        "H256" => primitive("H256", "string"),
        "AccountId" | "AccountId32" => primitive("AccountId", "string"),
        "Vec" | "VecDeque" => Some(Builtin::Wrapper(Wrapper::List)),
        "BTreeSet" | "HashSet" => Some(Builtin::Wrapper(Wrapper::Set)),
        "Option" => Some(Builtin::Wrapper(Wrapper::Option)),
        "Result" => Some(Builtin::Wrapper(Wrapper::Result)),
        "BTreeMap" | "HashMap" => Some(Builtin::Wrapper(Wrapper::Map)),
        "Compact" => Some(Builtin::Wrapper(Wrapper::Compact)),
        "Box" | "Rc" | "Arc" => Some(Builtin::Wrapper(Wrapper::Transparent)),
        "PhantomData" => Some(Builtin::Wrapper(Wrapper::Phantom)),
        _ => None,
    }
}

/// Returns `true` if `name` can be declared in generated source.
///
/// # Examples
///
/// ```
/// use nucleus_codegen::render::is_identifier;
///
/// assert!(is_identifier("get_balance"));
/// assert!(!is_identifier("0field"));
/// assert!(!is_identifier("type"));
/// ```
#[must_use]
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        && !RESERVED_WORDS.contains(&name)
}

/// Formats a property key, quoting it unless it is a plain identifier.
///
/// Reserved words are allowed as property keys.
#[must_use]
pub fn property_key(name: &str) -> String {
    if is_identifier(name) || RESERVED_WORDS.contains(&name) {
        name.to_string()
    } else {
        serde_json::Value::String(name.to_string()).to_string()
    }
}

/// Formats a generic parameter list, e.g. `<K, V>`, or an empty string.
#[must_use]
pub fn generic_params(generics: &[String]) -> String {
    if generics.is_empty() {
        String::new()
    } else {
        format!("<{}>", generics.join(", "))
    }
}

/// Renders type expressions for one entry.
///
/// `user_types` maps every declarable entry name to its generic arity;
/// `skipped` holds entries that were rejected, so that references to them are
/// reported as a dependency on a skipped entry.
#[derive(Debug)]
pub struct TypeRenderer<'a> {
    user_types: &'a HashMap<String, usize>,
    skipped: &'a HashSet<String>,
    generics: Vec<String>,
    imports: BTreeSet<String>,
}

impl<'a> TypeRenderer<'a> {
    /// Creates a renderer with `generics` in scope.
    #[must_use]
    pub fn new(
        user_types: &'a HashMap<String, usize>,
        skipped: &'a HashSet<String>,
        generics: &[String],
    ) -> Self {
        Self {
            user_types,
            skipped,
            generics: generics.to_vec(),
            imports: BTreeSet::new(),
        }
    }

    /// Records a codec library name used outside type expressions, such as a
    /// base class.
    pub fn import(&mut self, name: &str) {
        if !self.user_types.contains_key(name) {
            self.imports.insert(name.to_string());
        }
    }

    /// Library names used so far.
    #[must_use]
    pub fn into_imports(self) -> BTreeSet<String> {
        self.imports
    }

    /// Renders `ty`.
    ///
    /// # Errors
    ///
    /// Returns the [`IssueKind`] describing the first invalid reference.
    ///
    /// # Examples
    ///
    /// ```
    /// use nucleus_abi::TypeExpr;
    /// use nucleus_codegen::render::TypeRenderer;
    /// use std::collections::{HashMap, HashSet};
    ///
    /// let user_types = HashMap::from([("Point".to_string(), 0)]);
    /// let skipped = HashSet::new();
    /// let mut renderer = TypeRenderer::new(&user_types, &skipped, &[]);
    ///
    /// let ty = TypeExpr::generic("Vec", vec![TypeExpr::named("Point")]);
    /// let rendered = renderer.render(&ty).unwrap();
    /// assert_eq!(rendered.ts, "Point[]");
    /// assert_eq!(rendered.codec, "Vec.with(Point)");
    /// ```
    pub fn render(&mut self, ty: &TypeExpr) -> Result<Rendered, IssueKind> {
        match ty {
            TypeExpr::Path { path, generic_args } => self.render_path(path, generic_args),
            TypeExpr::Tuple { items } => {
                if items.is_empty() {
                    self.import("Null");
                    return Ok(Rendered {
                        ts: "null".to_string(),
                        codec: "Null".to_string(),
                    });
                }
                let rendered = self.render_all(items)?;
                self.import("Tuple");
                Ok(Rendered {
                    ts: format!("[{}]", join(&rendered, |r| &r.ts)),
                    codec: format!("Tuple.with({})", join(&rendered, |r| &r.codec)),
                })
            }
            TypeExpr::Array { elem, len } => {
                let elem = self.render(elem)?;
                self.import("FixedArray");
                Ok(Rendered {
                    ts: format!("{}[]", elem.ts),
                    codec: format!("FixedArray.with({len}, {})", elem.codec),
                })
            }
            TypeExpr::Alias { target, generics } => {
                let added: Vec<String> = generics
                    .iter()
                    .filter(|g| !self.generics.contains(g))
                    .cloned()
                    .collect();
                self.generics.extend(added.iter().cloned());
                let rendered = self.render(target);
                self.generics.truncate(self.generics.len() - added.len());
                rendered
            }
        }
    }

    fn render_all(&mut self, items: &[TypeExpr]) -> Result<Vec<Rendered>, IssueKind> {
        items.iter().map(|item| self.render(item)).collect()
    }

    fn render_path(&mut self, path: &[String], args: &[TypeExpr]) -> Result<Rendered, IssueKind> {
        let Some(name) = path.last().filter(|name| !name.is_empty()) else {
            return Err(IssueKind::InvalidType {
                message: "empty type path".to_string(),
            });
        };

        if self.generics.iter().any(|g| g == name) {
            check_arity(name, 0, args.len())?;
            return Ok(Rendered::same(name.clone()));
        }

        if let Some(&arity) = self.user_types.get(name) {
            check_arity(name, arity, args.len())?;
            if args.is_empty() {
                return Ok(Rendered::same(name.clone()));
            }
            let rendered = self.render_all(args)?;
            return Ok(Rendered {
                ts: format!("{name}<{}>", join(&rendered, |r| &r.ts)),
                codec: format!("{name}.with({})", join(&rendered, |r| &r.codec)),
            });
        }

        if self.skipped.contains(name) {
            return Err(IssueKind::DependsOnSkipped {
                dependency: name.clone(),
            });
        }

        match builtin(name) {
            Some(Builtin::Primitive { codec, ts }) => {
                check_arity(name, 0, args.len())?;
                self.import(codec);
                Ok(Rendered {
                    ts: ts.to_string(),
                    codec: codec.to_string(),
                })
            }
            Some(Builtin::Wrapper(wrapper)) => self.render_wrapper(name, wrapper, args),
            None => Err(IssueKind::UnresolvedType {
                reference: name.clone(),
            }),
        }
    }

    fn render_wrapper(
        &mut self,
        name: &str,
        wrapper: Wrapper,
        args: &[TypeExpr],
    ) -> Result<Rendered, IssueKind> {
        if let Some(arity) = wrapper.arity() {
            check_arity(name, arity, args.len())?;
        }

        if wrapper == Wrapper::Phantom {
            self.import("Null");
            return Ok(Rendered {
                ts: "null".to_string(),
                codec: "Null".to_string(),
            });
        }

        let rendered = self.render_all(args)?;
        let first = &rendered[0];

        let result = match wrapper {
            Wrapper::List | Wrapper::Set => {
                self.import("Vec");
                Rendered {
                    ts: format!("{}[]", first.ts),
                    codec: format!("Vec.with({})", first.codec),
                }
            }
            Wrapper::Option => {
                self.import("Option");
                Rendered {
                    ts: format!("Option<{}>", first.ts),
                    codec: format!("Option.with({})", first.codec),
                }
            }
            Wrapper::Result => {
                self.import("Result");
                Rendered {
                    ts: format!("Result<{}, {}>", first.ts, rendered[1].ts),
                    codec: format!("Result.with({}, {})", first.codec, rendered[1].codec),
                }
            }
            Wrapper::Map => {
                self.import("BTreeMap");
                Rendered {
                    ts: format!("BTreeMap<{}, {}>", first.ts, rendered[1].ts),
                    codec: format!("BTreeMap.with({}, {})", first.codec, rendered[1].codec),
                }
            }
            Wrapper::Compact => {
                self.import("Compact");
                Rendered {
                    ts: first.ts.clone(),
                    codec: format!("Compact.with({})", first.codec),
                }
            }
            Wrapper::Transparent | Wrapper::Phantom => first.clone(),
        };
        Ok(result)
    }
}

fn check_arity(name: &str, expected: usize, found: usize) -> Result<(), IssueKind> {
    if expected == found {
        Ok(())
    } else {
        Err(IssueKind::GenericArity {
            name: name.to_string(),
            expected,
            found,
        })
    }
}

fn join(items: &[Rendered], part: impl Fn(&Rendered) -> &String) -> String {
    items
        .iter()
        .map(|item| part(item).as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Collects the user type names `ty` references, ignoring `generics`.
///
/// Only names present in `user_types` are returned, in first-seen order.
#[must_use]
pub fn referenced_user_types(
    ty: &TypeExpr,
    generics: &[String],
    user_types: &HashMap<String, usize>,
) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    ty.visit_paths(&mut |name, _| {
        if !generics.iter().any(|g| g == name)
            && user_types.contains_key(name)
            && !found.iter().any(|f| f == name)
        {
            found.push(name.to_string());
        }
    });
    found
}
