//! Template engine for code generation using Handlebars.
//!
//! Wraps Handlebars with the declaration templates pre-registered. Output is
//! source code, so HTML escaping is disabled.
//!
//! # Examples
//!
//! ```
//! use nucleus_codegen::template_engine::TemplateEngine;
//! use serde_json::json;
//!
//! let engine = TemplateEngine::new().unwrap();
//! let text = engine
//!     .render("alias", &json!({"name": "Balance", "generics": "", "ts_type": "u128", "codec": "U128"}))
//!     .unwrap();
//! assert!(text.contains("export const Balance = U128;"));
//! ```

use handlebars::Handlebars;
use nucleus_core::{Error, Result};
use serde::Serialize;

const TEMPLATES: &[(&str, &str)] = &[
    ("header", include_str!("../templates/header.ts.hbs")),
    ("struct", include_str!("../templates/struct.ts.hbs")),
    ("enum", include_str!("../templates/enum.ts.hbs")),
    ("alias", include_str!("../templates/alias.ts.hbs")),
    ("function", include_str!("../templates/function.ts.hbs")),
];

/// Template engine for declaration rendering.
///
/// # Thread Safety
///
/// This type is `Send` and `Sync`.
#[derive(Debug)]
pub struct TemplateEngine<'a> {
    handlebars: Handlebars<'a>,
}

impl<'a> TemplateEngine<'a> {
    /// Creates a new template engine with the built-in templates registered.
    ///
    /// # Errors
    ///
    /// Returns error if template registration fails (should not happen
    /// with valid built-in templates).
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();

        // Strict mode: fail on missing variables
        handlebars.set_strict_mode(true);
        handlebars.register_escape_fn(handlebars::no_escape);

        for (name, template) in TEMPLATES {
            Self::register(&mut handlebars, name, template)?;
        }

        Ok(Self { handlebars })
    }

    fn register(handlebars: &mut Handlebars<'a>, name: &str, template: &str) -> Result<()> {
        handlebars
            .register_template_string(name, template)
            .map_err(|e| Error::SerializationError {
                message: format!("Failed to register template '{name}': {e}"),
                source: None,
            })
    }

    /// Renders a template with the given context.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Template name is not registered
    /// - Context cannot be serialized
    /// - A variable the template uses is missing from the context
    pub fn render<T: Serialize>(&self, template_name: &str, context: &T) -> Result<String> {
        self.handlebars
            .render(template_name, context)
            .map_err(|e| Error::SerializationError {
                message: format!("Template '{template_name}' rendering failed: {e}"),
                source: None,
            })
    }

    /// Registers a custom template, replacing any template with that name.
    ///
    /// # Errors
    ///
    /// Returns error if the template string is invalid.
    ///
    /// # Examples
    ///
    /// ```
    /// use nucleus_codegen::template_engine::TemplateEngine;
    ///
    /// let mut engine = TemplateEngine::new().unwrap();
    /// engine.register_template_string("custom", "// {{name}}").unwrap();
    /// ```
    pub fn register_template_string(&mut self, name: &str, template: &str) -> Result<()> {
        Self::register(&mut self.handlebars, name, template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_template_engine_creation() {
        assert!(TemplateEngine::new().is_ok());
    }

    #[test]
    fn test_render_header_with_imports() {
        let engine = TemplateEngine::new().unwrap();
        let text = engine
            .render(
                "header",
                &json!({
                    "source": "nucleus n1",
                    "library": "@nucleus/codec",
                    "imports": ["Struct", "U32"],
                    "has_imports": true
                }),
            )
            .unwrap();
        assert!(text.contains("import { Struct, U32 } from \"@nucleus/codec\";"));
        assert!(text.contains("function _encode(codec, value)"));
        assert!(text.contains("function _call(method, name, output, args)"));
    }

    #[test]
    fn test_render_struct_does_not_escape() {
        let engine = TemplateEngine::new().unwrap();
        let text = engine
            .render(
                "struct",
                &json!({
                    "name": "Wrapper",
                    "generics": "<T>",
                    "fields": [{"key": "inner", "ts_type": "Option<T>", "codec": "Option.with(T)"}]
                }),
            )
            .unwrap();
        assert!(text.contains("export interface Wrapper<T> {"));
        assert!(text.contains("inner: Option<T>;"));
        assert!(text.contains("export class Wrapper<T> extends Struct {"));
        assert!(text.contains("inner: Option.with(T);"));
    }

    #[test]
    fn test_render_function() {
        let engine = TemplateEngine::new().unwrap();
        let text = engine
            .render(
                "function",
                &json!({
                    "name": "distance",
                    "method": "get",
                    "params": [
                        {"name": "a", "ts_type": "Point", "codec": "Point"},
                        {"name": "b", "ts_type": "Point", "codec": "Point"}
                    ],
                    "return_type": "u32",
                    "output_codec": "U32"
                }),
            )
            .unwrap();
        assert!(text.contains("export async function distance(a: Point, b: Point): u32 {"));
        assert!(text.contains(
            "return _call(\"get\", \"distance\", U32, [_encode(Point, a), _encode(Point, b)]);"
        ));
    }

    #[test]
    fn test_missing_variable_fails_in_strict_mode() {
        let engine = TemplateEngine::new().unwrap();
        let result = engine.render("alias", &json!({"name": "X"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_template() {
        let engine = TemplateEngine::new().unwrap();
        assert!(engine.render("nonexistent", &json!({})).is_err());
    }
}
