//! Fields command implementation.

use super::resolve_template_path;
use crate::cli::FieldsArgs;
use crate::error::Result;
use crate::output::Formatter;
use immo_domain::FieldSpec;
use immo_extractor::{DocType, Template};
use std::path::Path;

/// Execute the fields command.
pub fn execute_fields(args: FieldsArgs, templates_dir: &Path, formatter: &Formatter) -> Result<()> {
    let fields = template_fields(args.doc_type.into(), args.template.as_deref(), templates_dir)?;
    println!("{}", formatter.format_fields(&fields)?);
    Ok(())
}

fn template_fields(
    doc_type: DocType,
    template: Option<&Path>,
    templates_dir: &Path,
) -> Result<Vec<FieldSpec>> {
    let path = resolve_template_path(doc_type, template, templates_dir);
    Ok(Template::load(&path)?.fields())
}
