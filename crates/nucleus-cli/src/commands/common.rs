//! Helpers shared across CLI commands.

use anyhow::Result;
use nucleus_abi::{AbiClient, AbiDocument};
use nucleus_core::{Error, ExplorerConfig, NucleusId};
use serde_json::Value;
use tracing::info;

use crate::actions::AbiSource;

/// Loads the ABI document named by `source`.
///
/// Elements that fail to decode are left in [`AbiDocument::issues`].
///
/// # Errors
///
/// Returns an error if the file cannot be read, the API request fails, or
/// the document is not a JSON array.
pub async fn load_document(source: &AbiSource, config: &ExplorerConfig) -> Result<AbiDocument> {
    let document = match (&source.file, &source.nucleus) {
        (Some(path), _) => {
            info!(path = %path.display(), "loading ABI file");
            AbiDocument::load(path)?
        }
        (None, Some(id)) => {
            info!(nucleus = %id, api = %config.api_base_url, "fetching ABI");
            AbiClient::new(config.api_base_url.as_str())
                .fetch(&NucleusId::new(id.as_str()))
                .await?
        }
        (None, None) => {
            return Err(Error::InvalidArgument("either --file or --nucleus is required".to_string()).into());
        }
    };

    info!(
        entries = document.len(),
        skipped = document.issues.len(),
        "ABI document loaded"
    );
    Ok(document)
}

/// Parses a JSON command-line argument.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if `text` is not valid JSON.
///
/// # Examples
///
/// ```
/// use nucleus_explorer_cli::commands::common::parse_json_arg;
///
/// assert_eq!(parse_json_arg("--args", "[1, 2]").unwrap()[1], 2);
/// assert!(parse_json_arg("--args", "{oops").is_err());
/// ```
pub fn parse_json_arg(flag: &str, text: &str) -> Result<Value> {
    serde_json::from_str(text)
        .map_err(|e| Error::InvalidArgument(format!("{flag} is not valid JSON: {e}")).into())
}

/// One `--set` edit of an argument form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEdit {
    /// `PATH=VALUE`: set a leaf or list item.
    Set {
        /// Dotted path.
        path: String,
        /// Raw value text.
        value: String,
    },
    /// `PATH+`: append an empty list item.
    Push {
        /// Dotted path of the list.
        path: String,
    },
    /// `PATH-INDEX`: remove a list item.
    Remove {
        /// Dotted path of the list.
        path: String,
        /// Item index.
        index: usize,
    },
}

impl FormEdit {
    /// Parses an edit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `text` matches none of the forms.
    ///
    /// # Examples
    ///
    /// ```
    /// use nucleus_explorer_cli::commands::common::FormEdit;
    ///
    /// assert_eq!(
    ///     FormEdit::parse("labels-2").unwrap(),
    ///     FormEdit::Remove { path: "labels".to_string(), index: 2 }
    /// );
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        if let Some((path, value)) = text.split_once('=') {
            return Ok(Self::Set {
                path: path.trim().to_string(),
                value: value.to_string(),
            });
        }
        if let Some(path) = text.strip_suffix('+') {
            return Ok(Self::Push {
                path: path.to_string(),
            });
        }
        if let Some((path, index)) = text.rsplit_once('-')
            && let Ok(index) = index.parse()
        {
            return Ok(Self::Remove {
                path: path.to_string(),
                index,
            });
        }
        Err(Error::InvalidArgument(format!(
            "invalid edit '{text}' (expected PATH=VALUE, PATH+ or PATH-INDEX)"
        ))
        .into())
    }
}
