//! Translation between host document URIs and backend document URIs.
//!
//! Host and backend address the same documents, so the mapping is identity
//! at the string level; what changes at the boundary is the representation
//! (a parsed [`Uri`] on the host side, a plain string inside request and
//! response bodies). The one wrinkle is fragment-based addressing: some
//! hosts identify a document inside a root as `<root>#path` rather than
//! `<root>/path`. Both forms are folded into the path form before any glob
//! or prefix comparison, so scope patterns derived from a root match either
//! spelling.

use std::borrow::Cow;
use std::str::FromStr;

use lsp_types::Uri;

use crate::errors::UriMapError;

/// Marshals a host document URI into the backend's plain-string form.
#[must_use]
pub fn to_backend_uri(uri: &Uri) -> String {
    uri.as_str().to_owned()
}

/// Unmarshals a backend URI string into the host's document URI type.
///
/// # Errors
///
/// Returns [`UriMapError`] when the backend string is not a valid URI.
pub fn to_host_uri(raw: &str) -> Result<Uri, UriMapError> {
    Uri::from_str(raw).map_err(|_| UriMapError {
        uri: raw.to_owned(),
    })
}

/// Folds fragment-form addressing under `root` into path form.
///
/// `<root>#foo/bar.ts` becomes `<root>/foo/bar.ts`; URIs already in path
/// form, or outside `root`, are returned unchanged.
#[must_use]
pub fn canonical_document_uri<'a>(uri: &'a str, root: &str) -> Cow<'a, str> {
    let Some(rest) = uri.strip_prefix(root) else {
        return Cow::Borrowed(uri);
    };
    let Some(fragment) = rest.strip_prefix('#') else {
        return Cow::Borrowed(uri);
    };
    if root.ends_with('/') {
        Cow::Owned(format!("{root}{fragment}"))
    } else {
        Cow::Owned(format!("{root}/{fragment}"))
    }
}

/// Glob pattern restricting a selector to documents under `root`.
#[must_use]
pub fn scope_pattern(root: &str) -> String {
    if root.ends_with('/') {
        format!("{root}**")
    } else {
        format!("{root}/**")
    }
}

/// Whether a document URI falls under a root's scope.
///
/// The comparison respects segment boundaries: root `git://repo1` owns
/// `git://repo1/src/a.ts` but not `git://repo10/src/a.ts`.
#[must_use]
pub fn in_scope(uri: &str, root: &str) -> bool {
    let canonical = canonical_document_uri(uri, root);
    let Some(rest) = canonical.strip_prefix(root) else {
        return false;
    };
    rest.is_empty() || root.ends_with('/') || rest.starts_with('/')
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const RAW_ROOT: &str = "https://sourcegraph.test/repo@rev/-/raw/";

    #[rstest]
    fn maps_host_uri_to_identical_backend_string() {
        let host = to_host_uri("file:///workspace/main.rs").expect("valid URI");
        assert_eq!(to_backend_uri(&host), "file:///workspace/main.rs");
    }

    #[rstest]
    fn rejects_invalid_backend_uri() {
        let error = to_host_uri("not a uri").expect_err("parse must fail");
        assert_eq!(error.uri, "not a uri");
    }

    #[rstest]
    #[case("https://sourcegraph.test/repo@rev/-/raw/#foo.ts", "https://sourcegraph.test/repo@rev/-/raw/foo.ts")]
    #[case("https://sourcegraph.test/repo@rev/-/raw/foo.ts", "https://sourcegraph.test/repo@rev/-/raw/foo.ts")]
    fn folds_fragment_form_into_path_form(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(canonical_document_uri(input, RAW_ROOT), expected);
    }

    #[rstest]
    fn fragment_fold_inserts_separator_for_bare_roots() {
        assert_eq!(
            canonical_document_uri("git://repo1?rev#foo.ts", "git://repo1?rev"),
            "git://repo1?rev/foo.ts"
        );
    }

    #[rstest]
    fn leaves_uris_outside_the_root_untouched() {
        let uri = "git://other#foo.ts";
        assert_eq!(canonical_document_uri(uri, RAW_ROOT), uri);
    }

    #[rstest]
    #[case(RAW_ROOT, "https://sourcegraph.test/repo@rev/-/raw/**")]
    #[case("git://repo1?rev", "git://repo1?rev/**")]
    fn derives_scope_pattern_without_duplicate_slash(#[case] root: &str, #[case] expected: &str) {
        assert_eq!(scope_pattern(root), expected);
    }

    #[rstest]
    #[case("https://sourcegraph.test/repo@rev/-/raw/foo.ts", true)]
    #[case("https://sourcegraph.test/repo@rev/-/raw/#foo.ts", true)]
    #[case("https://sourcegraph.test/other/file.ts", false)]
    fn scopes_documents_under_slash_terminated_root(#[case] uri: &str, #[case] expected: bool) {
        assert_eq!(in_scope(uri, RAW_ROOT), expected);
    }

    #[rstest]
    #[case("git://repo1/src/a.ts", true)]
    #[case("git://repo1", true)]
    #[case("git://repo10/src/a.ts", false)]
    fn respects_segment_boundaries_for_bare_roots(#[case] uri: &str, #[case] expected: bool) {
        assert_eq!(in_scope(uri, "git://repo1"), expected);
    }
}
