//! URL slugification for thing directories.

use deunicode::deunicode;

// ============================================================================
// Slugification
// ============================================================================

/// Convert a display name to a URL-safe directory.
///
/// Transliterates to ASCII, lowercases, and joins alphanumeric runs with `-`.
///
/// | Input | Output |
/// |-------|--------|
/// | `Déjà Vu (Remix)` | `deja-vu-remix` |
/// | `  A -- B  ` | `a-b` |
pub fn slugify(text: &str) -> String {
    let ascii = deunicode(text);
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_dash = false;

    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
