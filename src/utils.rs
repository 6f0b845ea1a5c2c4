//! Helper functions.

/// Checks if the given target name represents image data.
///
/// # Examples
///
/// ```
/// use x11_clipboard_stack::utils::is_image;
///
/// assert!(is_image("image/png"));
/// assert!(!is_image("UTF8_STRING"));
/// ```
pub fn is_image(target: &str) -> bool {
    target.contains("image")
}

/// Checks if the given target name is a protocol target rather than a data format.
///
/// These are never stored: `TARGETS` is generated from the stored formats, and the others
/// either describe the selection itself or have side effects on the owner.
///
/// # Examples
///
/// ```
/// use x11_clipboard_stack::utils::is_meta_target;
///
/// assert!(is_meta_target("TARGETS"));
/// assert!(!is_meta_target("text/plain"));
/// ```
pub fn is_meta_target(target: &str) -> bool {
    matches!(
        target,
        "TARGETS"
            | "MULTIPLE"
            | "TIMESTAMP"
            | "SAVE_TARGETS"
            | "DELETE"
            | "INSERT_SELECTION"
            | "INSERT_PROPERTY"
    )
}
