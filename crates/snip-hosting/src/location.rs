use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static BLOB_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://github\.com/([^/]+)/([^/]+)/blob/([^/]+)/(.+)$").expect("valid regex")
});

/// A file pinned to a ref, parsed from a `github.com/<owner>/<repo>/blob/<ref>/<path>` URL.
/// `path` is stored decoded and re-encoded per segment when a URL is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobLocation {
    pub owner: String,
    pub repo: String,
    pub reference: String,
    pub path: String,
}

impl BlobLocation {
    pub fn parse(url: &str) -> Option<Self> {
        let captures = BLOB_URL.captures(url.trim())?;
        let raw_path = captures[4].split(['?', '#']).next().unwrap_or_default();
        let path = urlencoding::decode(raw_path)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| raw_path.to_owned());
        if path.is_empty() {
            return None;
        }

        Some(Self {
            owner: captures[1].to_owned(),
            repo: captures[2].to_owned(),
            reference: captures[3].to_owned(),
            path,
        })
    }

    pub fn contents_endpoint(&self, api_base: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            api_base.trim_end_matches('/'),
            self.owner,
            self.repo,
            self.encoded_path()
        )
    }

    fn encoded_path(&self) -> String {
        self.path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn commits_endpoint(&self, api_base: &str) -> String {
        format!(
            "{}/repos/{}/{}/commits",
            api_base.trim_end_matches('/'),
            self.owner,
            self.repo
        )
    }
}

impl fmt::Display for BlobLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "https://github.com/{}/{}/blob/{}/{}",
            self.owner,
            self.repo,
            self.reference,
            self.encoded_path()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::BlobLocation;

    #[test]
    fn parses_owner_repo_ref_and_nested_path() {
        let location =
            BlobLocation::parse("https://github.com/octo/tools/blob/4f2a9c1/src/app/main.py")
                .expect("blob url");

        assert_eq!(location.owner, "octo");
        assert_eq!(location.repo, "tools");
        assert_eq!(location.reference, "4f2a9c1");
        assert_eq!(location.path, "src/app/main.py");
        assert_eq!(
            location.contents_endpoint("https://api.github.com/"),
            "https://api.github.com/repos/octo/tools/contents/src/app/main.py"
        );
        assert_eq!(
            location.commits_endpoint("https://api.github.com"),
            "https://api.github.com/repos/octo/tools/commits"
        );
        assert_eq!(
            location.to_string(),
            "https://github.com/octo/tools/blob/4f2a9c1/src/app/main.py"
        );
    }

    #[test]
    fn fragments_are_dropped_and_other_urls_rejected() {
        let location = BlobLocation::parse("https://github.com/o/r/blob/main/a.js#L10-L20")
            .expect("blob url");
        assert_eq!(location.path, "a.js");

        assert!(BlobLocation::parse("https://github.com/o/r/tree/main/src").is_none());
        assert!(BlobLocation::parse("https://gitlab.com/o/r/blob/main/a.py").is_none());
        assert!(BlobLocation::parse("").is_none());
    }

    #[test]
    fn percent_encoded_paths_are_decoded_once() {
        let url = "https://github.com/o/r/blob/main/docs/My%20Notes/caf%C3%A9.py";
        let location = BlobLocation::parse(url).expect("blob url");

        assert_eq!(location.path, "docs/My Notes/café.py");
        assert_eq!(
            location.contents_endpoint("https://api.github.com"),
            "https://api.github.com/repos/o/r/contents/docs/My%20Notes/caf%C3%A9.py"
        );
        assert_eq!(location.to_string(), url);
    }
}
