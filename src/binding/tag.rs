//! Field schema and the tag grammar shared by both binding directions.

use crate::binding::{InputBinding, OutputBinding};
use crate::error::ConfigurationError;

/// One declared field of an input, output or error structure.
///
/// Generated by the `Input`, `Output` and `IntoFailure` derives; `tag` is the
/// raw string from the field's `#[request(..)]` / `#[response(..)]` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSchema {
    pub name: &'static str,
    pub tag: Option<&'static str>,
}

impl FieldSchema {
    pub const fn new(name: &'static str, tag: Option<&'static str>) -> Self {
        Self { name, tag }
    }
}

/// Split `source,key` into trimmed parts.
pub(crate) fn split_tag(tag: &str) -> Vec<&str> {
    tag.split(',').map(str::trim).collect()
}

/// Compile every field of an input structure, in declaration order.
pub fn compile_inputs(fields: &[FieldSchema]) -> Result<Vec<InputBinding>, ConfigurationError> {
    fields.iter().map(InputBinding::compile).collect()
}

/// Compile every field of an output or structured error, in declaration order.
pub fn compile_outputs(
    fields: &[FieldSchema],
) -> Result<Vec<OutputBinding>, ConfigurationError> {
    fields.iter().map(OutputBinding::compile).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_tag_trims_parts() {
        assert_eq!(split_tag("header, content-type "), vec!["header", "content-type"]);
        assert_eq!(split_tag(" path "), vec!["path"]);
        assert_eq!(split_tag(""), vec![""]);
    }

    #[test]
    fn test_compile_inputs_keeps_order() {
        const FIELDS: &[FieldSchema] = &[
            FieldSchema::new("auth", Some("header,auth")),
            FieldSchema::new("page", Some("query,page")),
            FieldSchema::new("path", Some("path")),
        ];
        let bindings = compile_inputs(FIELDS).unwrap();
        assert_eq!(
            bindings,
            vec![
                InputBinding::Header("auth".to_string()),
                InputBinding::Query("page".to_string()),
                InputBinding::Path,
            ]
        );
    }

    #[test]
    fn test_compile_stops_at_first_invalid_field() {
        const FIELDS: &[FieldSchema] = &[
            FieldSchema::new("title", Some("json,title")),
            FieldSchema::new("broken", Some("cookie,session")),
            FieldSchema::new("untagged", None),
        ];
        let err = compile_outputs(FIELDS).unwrap_err();
        assert_eq!(err, ConfigurationError::InvalidResponseTag { field: "broken" });
    }
}
