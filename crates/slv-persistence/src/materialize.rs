//! ---
//! slv_section: "03-persistence"
//! slv_subsection: "module"
//! slv_type: "source"
//! slv_scope: "code"
//! slv_description: "Writes fetched pages to disk in their serialization format."
//! slv_version: "v0.0.0-prealpha"
//! slv_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};

use slv_api::{Dispatched, Format, ParameterSet, RawResponse};
use tracing::info;

use crate::fs_util::{to_pretty_json, write_atomic};
use crate::{PersistenceError, Result};

const FORBIDDEN: [char; 9] = ['\\', '/', ':', '"', '*', '?', '<', '>', '|'];

/// Remove characters that are illegal in file names. Everything else is kept.
pub fn sanitize_file_name(hint: &str) -> String {
    hint.chars().filter(|c| !FORBIDDEN.contains(c)).collect()
}

/// Serialization recorded in the `ser` parameter.
pub fn format_of(params: &ParameterSet) -> Result<Format> {
    let ser = params
        .get("ser")
        .ok_or(PersistenceError::MissingFormat)?
        .to_string();
    ser.parse()
        .map_err(|_| PersistenceError::InvalidFormat(ser.clone()))
}

/// Write `response` under `directory` using the sanitized `file_name_hint`.
///
/// JSON bodies are re-emitted pretty printed. XML bodies are checked for
/// well-formedness and written unmodified. Returns the written path.
pub fn persist(
    response: &RawResponse,
    params: &ParameterSet,
    file_name_hint: &str,
    directory: &Path,
) -> Result<PathBuf> {
    let format = format_of(params)?;
    let name = sanitize_file_name(file_name_hint);
    if name.is_empty() {
        return Err(PersistenceError::EmptyFileName(file_name_hint.to_owned()));
    }
    let path = directory.join(format!("{name}.{}", format.extension()));

    let bytes = match format {
        Format::Json => {
            let value: serde_json::Value = serde_json::from_str(response.text())?;
            to_pretty_json(&value)?
        }
        Format::Xml => {
            roxmltree::Document::parse(response.text())?;
            response.text().as_bytes().to_vec()
        }
    };
    write_atomic(&path, &bytes)?;

    info!(path = %path.display(), format = %format, bytes = bytes.len(), "page written");
    Ok(path)
}

/// [`persist`] with the file name derived from the dispatched operation.
pub fn persist_dispatched(dispatched: &Dispatched, directory: &Path) -> Result<PathBuf> {
    persist(
        &dispatched.response,
        &dispatched.params,
        &dispatched.operation.file_stem(),
        directory,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_exactly_the_forbidden_characters() {
        assert_eq!(sanitize_file_name("a/b:c*d"), "abcd");
        assert_eq!(sanitize_file_name(r#"x\y"z?w<v>u|t"#), "xyzwvut");
        assert_eq!(
            sanitize_file_name("getDevicesLogValues_01/01/2024 00:00:00"),
            "getDevicesLogValues_01012024 000000"
        );
        assert_eq!(sanitize_file_name("keep-._ ()"), "keep-._ ()");
    }

    #[test]
    fn format_requires_ser_parameter() {
        assert!(matches!(
            format_of(&ParameterSet::new()),
            Err(PersistenceError::MissingFormat)
        ));
        let csv = ParameterSet::new().with("ser", "csv");
        assert!(matches!(
            format_of(&csv),
            Err(PersistenceError::InvalidFormat(ref value)) if value == "csv"
        ));
        let json = ParameterSet::new().with("ser", "json");
        assert_eq!(format_of(&json).unwrap(), Format::Json);
    }
}
