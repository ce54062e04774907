// Whitelist/blacklist membership checks

/// Which of the two lists an entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    White,
    Black,
}

impl ListKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListKind::White => "whitelist",
            ListKind::Black => "blacklist",
        }
    }
}

/// The parsed contents of a list file.
///
/// Entries are either a bare host (`ads.example.com`) or a host with the
/// path appended directly (`cdn.example.com/banners`). Order follows the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListSet {
    pub whitelist: Vec<String>,
    pub blacklist: Vec<String>,
}

impl ListSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: ListKind, entry: String) {
        match kind {
            ListKind::White => self.whitelist.push(entry),
            ListKind::Black => self.blacklist.push(entry),
        }
    }

    pub fn entries(&self, kind: ListKind) -> &[String] {
        match kind {
            ListKind::White => &self.whitelist,
            ListKind::Black => &self.blacklist,
        }
    }

    pub fn is_blacklisted(&self, host: &str, path: &str) -> bool {
        is_listed(&self.blacklist, host, path)
    }

    pub fn is_whitelisted(&self, host: &str, path: &str) -> bool {
        is_listed(&self.whitelist, host, path)
    }

    pub fn is_empty(&self) -> bool {
        self.whitelist.is_empty() && self.blacklist.is_empty()
    }

    pub fn len(&self) -> usize {
        self.whitelist.len() + self.blacklist.len()
    }
}

/// Check `host`, or `host` followed by `path`, against `list`.
///
/// Whole-string, case-sensitive equality only. An empty host never matches.
pub fn is_listed(list: &[String], host: &str, path: &str) -> bool {
    if host.is_empty() {
        return false;
    }

    list.iter().any(|entry| {
        entry == host
            || (entry.len() == host.len() + path.len()
                && entry.starts_with(host)
                && entry.ends_with(path))
    })
}
