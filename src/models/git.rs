#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitInfo {
    /// Branch name, or the short commit id when HEAD is detached. Never empty.
    pub label: String,
    /// Tracked files differ from the index or HEAD. Untracked files are ignored.
    pub dirty: bool,
}
