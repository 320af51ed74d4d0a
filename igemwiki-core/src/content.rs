//! Content types and how they map onto the team wiki.
//!
//! A local file is uploaded as one of five [`ContentKind`]s. The kind decides
//! the destination name ([`resolve_dest`]), the full wiki title
//! ([`wiki_title`]) and whether the transfer is a wikitext edit or a binary
//! file upload ([`ContentKind::is_file`]).

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::Error;

static MARKUP_EXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:\.html?)+$").expect("valid markup regex"));
static STYLESHEET_EXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:\.css)+$").expect("valid stylesheet regex"));
static SCRIPT_EXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:\.js)+$").expect("valid script regex"));

/// Characters MediaWiki never accepts in a page title.
const FORBIDDEN_TITLE_CHARS: &[char] = &['#', '<', '>', '[', ']', '|', '{', '}'];

/// Destination name that maps a page onto the team's home page.
pub const HOME_PAGE_DEST: &str = "index";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Page,
    Template,
    Stylesheet,
    Script,
    Image,
}

impl ContentKind {
    pub const ALL: [ContentKind; 5] = [
        ContentKind::Page,
        ContentKind::Template,
        ContentKind::Stylesheet,
        ContentKind::Script,
        ContentKind::Image,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Page => "page",
            ContentKind::Template => "template",
            ContentKind::Stylesheet => "stylesheet",
            ContentKind::Script => "script",
            ContentKind::Image => "image",
        }
    }

    /// True when the content is uploaded as a binary file rather than edited as wikitext.
    pub fn is_file(&self) -> bool {
        matches!(self, ContentKind::Image)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ContentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| Error::UnsupportedType(s.to_string()))
    }
}

/// Destination name for `source` when uploaded as `kind`.
///
/// Takes the basename and strips the extension recognised for the kind.
/// Stripping is repeated, so applying the function to its own output never
/// changes it.
pub fn resolve_dest(kind: ContentKind, source: &str) -> String {
    let basename = Path::new(source)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.to_string());

    let ext = match kind {
        ContentKind::Page | ContentKind::Template => &*MARKUP_EXT,
        ContentKind::Stylesheet => &*STYLESHEET_EXT,
        ContentKind::Script => &*SCRIPT_EXT,
        ContentKind::Image => return basename,
    };
    ext.replace(&basename, "").into_owned()
}

/// Full wiki title of `dest` for a team.
pub fn wiki_title(kind: ContentKind, team: &str, dest: &str) -> String {
    match kind {
        ContentKind::Page if dest.is_empty() || dest == HOME_PAGE_DEST => format!("Team:{team}"),
        ContentKind::Page => format!("Team:{team}/{dest}"),
        ContentKind::Template => format!("Template:{team}/{dest}"),
        ContentKind::Stylesheet => format!("Template:{team}/css/{dest}"),
        ContentKind::Script => format!("Template:{team}/js/{dest}"),
        ContentKind::Image => format!("File:{}", file_name(team, dest)),
    }
}

/// Name an image is stored under. Team files carry the `T--<team>--` prefix.
pub fn file_name(team: &str, dest: &str) -> String {
    format!("T--{team}--{dest}")
}

/// Checks that `dest` can be used as a destination for `kind`.
pub fn validate_dest(kind: ContentKind, dest: &str) -> Result<(), String> {
    if dest.trim().is_empty() && kind != ContentKind::Page {
        return Err("destination is empty".to_string());
    }
    if let Some(c) = dest.chars().find(|c| FORBIDDEN_TITLE_CHARS.contains(c)) {
        return Err(format!("character '{c}' is not allowed in wiki titles"));
    }
    if kind.is_file() && dest.contains('/') {
        return Err("file names cannot contain '/'".to_string());
    }
    Ok(())
}

/// One local-to-wiki upload unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub kind: ContentKind,
    pub source: PathBuf,
    pub dest: String,
    /// Write even when the wiki already holds identical content.
    pub force: bool,
}

impl ContentItem {
    /// Builds an item, resolving `dest` from `source` when not given.
    pub fn new(kind: ContentKind, source: impl Into<PathBuf>, dest: Option<String>, force: bool) -> Self {
        let source = source.into();
        let dest = dest.unwrap_or_else(|| resolve_dest(kind, &source.to_string_lossy()));
        Self {
            kind,
            source,
            dest,
            force,
        }
    }

    /// Like [`ContentItem::new`] but parses the type name first.
    pub fn parse(
        kind: &str,
        source: impl Into<PathBuf>,
        dest: Option<String>,
        force: bool,
    ) -> crate::error::Result<Self> {
        let kind = kind.parse::<ContentKind>()?;
        Ok(Self::new(kind, source, dest, force))
    }

    pub fn title(&self, team: &str) -> String {
        wiki_title(self.kind, team, &self.dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_only_the_kind_extension() {
        assert_eq!(resolve_dest(ContentKind::Page, "site/about.html"), "about");
        assert_eq!(resolve_dest(ContentKind::Template, "header.htm"), "header");
        assert_eq!(resolve_dest(ContentKind::Stylesheet, "style.css"), "style");
        assert_eq!(resolve_dest(ContentKind::Script, "js/main.js"), "main");
        assert_eq!(resolve_dest(ContentKind::Image, "img/logo.png"), "logo.png");
        assert_eq!(resolve_dest(ContentKind::Stylesheet, "main.js"), "main.js");
    }

    #[test]
    fn resolve_dest_is_idempotent() {
        for kind in ContentKind::ALL {
            for name in ["about.html", "a.html.html", "style.css", "app.js", "logo.png", "plain"] {
                let once = resolve_dest(kind, name);
                assert_eq!(resolve_dest(kind, &once), once, "{kind} {name}");
            }
        }
    }

    #[test]
    fn titles_follow_team_namespaces() {
        assert_eq!(wiki_title(ContentKind::Page, "Foo", "about"), "Team:Foo/about");
        assert_eq!(wiki_title(ContentKind::Page, "Foo", "index"), "Team:Foo");
        assert_eq!(wiki_title(ContentKind::Template, "Foo", "nav"), "Template:Foo/nav");
        assert_eq!(wiki_title(ContentKind::Stylesheet, "Foo", "style"), "Template:Foo/css/style");
        assert_eq!(wiki_title(ContentKind::Script, "Foo", "app"), "Template:Foo/js/app");
        assert_eq!(wiki_title(ContentKind::Image, "Foo", "logo.png"), "File:T--Foo--logo.png");
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = "video".parse::<ContentKind>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedType(ref t) if t == "video"));
        assert_eq!("Stylesheet".parse::<ContentKind>().unwrap(), ContentKind::Stylesheet);
    }

    #[test]
    fn destination_validation() {
        assert!(validate_dest(ContentKind::Page, "about").is_ok());
        assert!(validate_dest(ContentKind::Page, "a[b]").is_err());
        assert!(validate_dest(ContentKind::Image, "dir/logo.png").is_err());
        assert!(validate_dest(ContentKind::Script, "").is_err());
    }
}
