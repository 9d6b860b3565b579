//! Entry-Point Transformer
//!
//! Turns a program's process entry point into an ordinary exported function
//! so the program can be called in-process.

use crate::defaults::{ENTRY_POINT, MERGED_MAIN};
use crate::error::{Error, Result};
use crate::syntax::{Edit, SourceFile};

/// Edit renaming `func main` of `file` to the merged entry point name.
///
/// Fails if the file already declares a top-level function with the new name,
/// which includes a file that was promoted before, or has no `func main`.
pub fn promote_entry_point(file: &SourceFile) -> Result<Edit> {
    if file.find_function(MERGED_MAIN).is_some() {
        return Err(Error::NameCollision {
            function: ENTRY_POINT.to_string(),
            target: MERGED_MAIN.to_string(),
            file: file.path().to_path_buf(),
        });
    }

    let main = file
        .find_function(ENTRY_POINT)
        .ok_or_else(|| Error::MissingEntryPoint {
            location: file.path().display().to_string(),
        })?;

    Ok(Edit::replace(main.name.span.clone(), MERGED_MAIN))
}
