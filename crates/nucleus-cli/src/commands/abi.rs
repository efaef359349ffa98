//! ABI command implementation.
//!
//! Generates source from an ABI, binds it, and drives the argument forms
//! and calls of the bound functions.

use anyhow::{Context, Result};
use indexmap::IndexMap;
use nucleus_abi::{AbiDocument, EntryIssue};
use nucleus_codegen::GenerationIssue;
use nucleus_core::cli::{ExitCode, OutputFormat};
use nucleus_core::{Error, ExplorerConfig, NucleusId};
use nucleus_runtime::{ArgNode, ArgumentForm, BindReport, CallRequest, RpcNucleusHost, Session};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use tracing::info;

use super::common::{FormEdit, load_document, parse_json_arg};
use crate::actions::{AbiAction, AbiSource};
use crate::formatters::format_output;

/// Result of `abi generate`.
#[derive(Debug, Serialize)]
pub struct GenerateResult {
    /// Emitted declarations in order.
    pub declarations: Vec<String>,
    /// Codec library imports.
    pub imports: Vec<String>,
    /// Entries skipped by the generator.
    pub skipped: Vec<GenerationIssue>,
    /// ABI elements that failed to decode.
    pub malformed: Vec<EntryIssue>,
    /// File the source was written to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    /// Source text, when not written to a file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl GenerateResult {
    fn exit_code(&self) -> ExitCode {
        if self.skipped.is_empty() && self.malformed.is_empty() {
            ExitCode::SUCCESS
        } else {
            ExitCode::PARTIAL
        }
    }
}

/// Result of `abi bind`.
#[derive(Debug, Serialize)]
pub struct BindResult<'a> {
    /// Signatures of the callable functions.
    pub functions: Vec<String>,
    /// Binding report.
    pub report: &'a BindReport,
    /// ABI elements that failed to decode.
    pub malformed: &'a [EntryIssue],
}

/// Result of `abi args`.
#[derive(Debug, Serialize)]
pub struct ArgsResult<'a> {
    /// Function signature.
    pub signature: String,
    /// Flattened argument values, ready for `abi invoke --args`.
    pub value: Value,
    /// Editable tree.
    pub fields: &'a IndexMap<String, ArgNode>,
}

/// Result of `abi invoke`.
#[derive(Debug, Serialize)]
pub struct InvokeResult {
    /// Function called.
    pub function: String,
    /// Encoded request.
    pub request: CallRequest,
    /// Decoded reply; absent for a dry run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<Value>,
}

/// Runs an ABI action.
///
/// # Errors
///
/// Returns an error if the ABI cannot be loaded or the action fails.
pub async fn run(action: AbiAction, config: &ExplorerConfig, output_format: OutputFormat) -> Result<ExitCode> {
    match action {
        AbiAction::Generate { source, output } => generate(&source, output, config, output_format).await,
        AbiAction::Bind { source } => bind(&source, config, output_format).await,
        AbiAction::Args {
            source,
            function,
            edits,
        } => args(&source, &function, &edits, config, output_format).await,
        AbiAction::Invoke {
            source,
            function,
            args,
            dry_run,
        } => invoke(&source, &function, &args, dry_run, config, output_format).await,
    }
}

async fn generate(
    source: &AbiSource,
    output: Option<PathBuf>,
    config: &ExplorerConfig,
    output_format: OutputFormat,
) -> Result<ExitCode> {
    let document = load_document(source, config).await?;
    let generated = nucleus_codegen::generate(&document.entries)?;
    info!(
        declarations = generated.declaration_count(),
        skipped = generated.issues.len(),
        "source generated"
    );

    let source_text = if let Some(path) = &output {
        std::fs::write(path, &generated.text)
            .with_context(|| format!("failed to write {}", path.display()))?;
        None
    } else {
        Some(generated.text)
    };

    let result = GenerateResult {
        declarations: generated.order,
        imports: generated.imports,
        skipped: generated.issues,
        malformed: document.issues,
        output,
        source: source_text,
    };

    // Outside JSON mode the bare source goes to stdout so it can be piped.
    match (&result.source, output_format) {
        (Some(text), OutputFormat::Pretty | OutputFormat::Text) => println!("{text}"),
        _ => println!("{}", format_output(&result, output_format)?),
    }
    Ok(result.exit_code())
}

async fn bind(source: &AbiSource, config: &ExplorerConfig, output_format: OutputFormat) -> Result<ExitCode> {
    let (document, session) = load_session(source, config).await?;

    let result = BindResult {
        functions: session.functions().map(|function| function.signature()).collect(),
        report: session.report(),
        malformed: &document.issues,
    };
    println!("{}", format_output(&result, output_format)?);

    if session.report().is_clean() && document.issues.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::PARTIAL)
    }
}

/// Applies `--set` edits to a form, in order.
///
/// # Errors
///
/// Returns an error if an edit is malformed or names nothing editable.
pub fn apply_edits(form: &mut ArgumentForm, edits: &[String]) -> Result<()> {
    for edit in edits {
        match FormEdit::parse(edit)? {
            FormEdit::Set { path, value } => form.set(&path, Value::String(value))?,
            FormEdit::Push { path } => {
                form.push_item(&path)?;
            }
            FormEdit::Remove { path, index } => form.remove_item(&path, index)?,
        }
    }
    Ok(())
}

async fn args(
    source: &AbiSource,
    function: &str,
    edits: &[String],
    config: &ExplorerConfig,
    output_format: OutputFormat,
) -> Result<ExitCode> {
    let (_, session) = load_session(source, config).await?;
    let mut form = session.argument_form(function)?;
    apply_edits(&mut form, edits)?;

    let result = ArgsResult {
        signature: session.function(function)?.signature(),
        value: form.value(),
        fields: form.fields(),
    };
    println!("{}", format_output(&result, output_format)?);
    Ok(ExitCode::SUCCESS)
}

async fn invoke(
    source: &AbiSource,
    function: &str,
    args: &str,
    dry_run: bool,
    config: &ExplorerConfig,
    output_format: OutputFormat,
) -> Result<ExitCode> {
    let args = parse_json_arg("--args", args)?;
    let (_, session) = load_session(source, config).await?;
    let request = session.prepare_call(function, &args)?;

    let reply = if dry_run {
        None
    } else {
        let nucleus = source.nucleus.as_deref().ok_or_else(|| {
            Error::InvalidArgument("sending a call needs --nucleus (or use --dry-run)".to_string())
        })?;
        let host = RpcNucleusHost::new(config.rpc_url.as_str(), NucleusId::new(nucleus));
        info!(function, nucleus, rpc = %config.rpc_url, "invoking");
        Some(session.invoke(function, &args, &host).await?)
    };

    let result = InvokeResult {
        function: function.to_string(),
        request,
        reply,
    };
    println!("{}", format_output(&result, output_format)?);
    Ok(ExitCode::SUCCESS)
}

/// Loads `source` and binds it into a session.
///
/// # Errors
///
/// Returns an error if the ABI cannot be loaded or generated.
pub async fn load_session(source: &AbiSource, config: &ExplorerConfig) -> Result<(AbiDocument, Session)> {
    let document = load_document(source, config).await?;
    let session = Session::from_document(&document)?;
    Ok((document, session))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const POINT_ABI: &str = r#"[
        {"type": "struct", "name": "Point", "generics": [], "fields": [
            {"name": "x", "ty": {"kind": "path", "path": ["u32"], "generic_args": []}},
            {"name": "y", "ty": {"kind": "path", "path": ["u32"], "generic_args": []}}
        ]},
        {"type": "fn", "name": "shift", "method": "post",
         "inputs": [{"name": "p", "ty": {"kind": "path", "path": ["Point"], "generic_args": []}}]}
    ]"#;

    fn abi_file(dir: &TempDir, text: &str) -> AbiSource {
        let path = dir.path().join("abi.json");
        std::fs::write(&path, text).unwrap();
        AbiSource {
            file: Some(path),
            nucleus: None,
        }
    }

    #[tokio::test]
    async fn test_generate_to_file() {
        let dir = TempDir::new().unwrap();
        let source = abi_file(&dir, POINT_ABI);
        let out = dir.path().join("point.ts");

        let code = generate(&source, Some(out.clone()), &ExplorerConfig::default(), OutputFormat::Json)
            .await
            .unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
        let text = std::fs::read_to_string(out).unwrap();
        assert!(text.contains("class Point"));
        assert!(text.contains("function shift"));
    }

    #[tokio::test]
    async fn test_generate_with_skipped_entries_is_partial() {
        let dir = TempDir::new().unwrap();
        let source = abi_file(
            &dir,
            r#"[{"type": "fn", "name": "bad", "method": "get",
                 "inputs": [{"name": "m", "ty": {"kind": "path", "path": ["Missing"], "generic_args": []}}]}]"#,
        );
        let code = generate(&source, None, &ExplorerConfig::default(), OutputFormat::Json)
            .await
            .unwrap();
        assert_eq!(code, ExitCode::PARTIAL);
    }

    #[tokio::test]
    async fn test_bind_clean_abi() {
        let dir = TempDir::new().unwrap();
        let source = abi_file(&dir, POINT_ABI);
        let code = bind(&source, &ExplorerConfig::default(), OutputFormat::Text).await.unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[tokio::test]
    async fn test_edits_feed_the_call() {
        let dir = TempDir::new().unwrap();
        let source = abi_file(&dir, POINT_ABI);
        let (_, session) = load_session(&source, &ExplorerConfig::default()).await.unwrap();

        let mut form = session.argument_form("shift").unwrap();
        apply_edits(&mut form, &["p.x=1".to_string(), "p.y=2".to_string()]).unwrap();
        let request = session.prepare_call("shift", &form.value()).unwrap();
        assert_eq!(request.payload, vec![1, 0, 0, 0, 2, 0, 0, 0]);

        assert!(apply_edits(&mut form, &["p.z=1".to_string()]).is_err());
    }

    #[tokio::test]
    async fn test_invoke_dry_run() {
        let dir = TempDir::new().unwrap();
        let source = abi_file(&dir, POINT_ABI);
        let code = invoke(
            &source,
            "shift",
            r#"{"p": {"x": 5, "y": 6}}"#,
            true,
            &ExplorerConfig::default(),
            OutputFormat::Json,
        )
        .await
        .unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[tokio::test]
    async fn test_invoke_without_nucleus_is_rejected() {
        let dir = TempDir::new().unwrap();
        let source = abi_file(&dir, POINT_ABI);
        let err = invoke(
            &source,
            "shift",
            r#"{"p": {"x": 5, "y": 6}}"#,
            false,
            &ExplorerConfig::default(),
            OutputFormat::Json,
        )
        .await
        .unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::InvalidArgument(_))));
    }
}
