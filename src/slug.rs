//! Title slugs for providers that put a human readable name into their URLs.

/// Converts a title into a URL-safe slug
///
/// The title is lower-cased and every run of characters that are not ASCII
/// letters or digits collapses into a single hyphen. Leading and trailing
/// hyphens are removed, so a title made only of punctuation yields an empty
/// string.
///
/// # Examples
///
/// ```
/// use embed_resolver::slugify;
///
/// assert_eq!(
///     slugify("The Lord of the Rings: Fellowship!"),
///     "the-lord-of-the-rings-fellowship"
/// );
/// ```
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(
            slugify("The Lord of the Rings: Fellowship!"),
            "the-lord-of-the-rings-fellowship"
        );
        assert_eq!(slugify("Breaking Bad"), "breaking-bad");
        assert_eq!(slugify("  --Spaces and dashes--  "), "spaces-and-dashes");
        assert_eq!(slugify("WALL·E"), "wall-e");
        assert_eq!(slugify("Se7en"), "se7en");
    }

    #[test]
    fn test_slugify_without_alphanumerics() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("?!..."), "");
    }

    #[test]
    fn test_slugify_collapses_non_ascii_runs() {
        assert_eq!(slugify("Amélie"), "am-lie");
        assert_eq!(slugify("Crouching Tiger, Hidden Dragon"), "crouching-tiger-hidden-dragon");
    }
}
