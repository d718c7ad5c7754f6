/// Namespace prefix some sample pipelines prepend to contig names.
pub const NAMESPACE_PREFIX: &str = "franken::";

/// A contig recorded while indexing a sequence file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContigEntry {
    /// Contig name (definition name with the namespace prefix stripped)
    pub name: String,

    /// Byte offset of the first sequence character after the header line
    pub offset: u64,
}

impl ContigEntry {
    pub fn new(name: impl Into<String>, offset: u64) -> Self {
        Self {
            name: name.into(),
            offset,
        }
    }
}

/// Contig name for a FASTA definition name, with an optional
/// [`NAMESPACE_PREFIX`] removed. Returns `None` if nothing is left.
pub fn contig_name(name: impl AsRef<[u8]>) -> Option<String> {
    let name = name.as_ref();
    let name = name
        .strip_prefix(NAMESPACE_PREFIX.as_bytes())
        .unwrap_or(name);

    (!name.is_empty()).then(|| String::from_utf8_lossy(name).into_owned())
}

/// Detect whether two contig name lists describe the same contigs in the same order.
///
/// Returns the first pair of names that disagree, using `"<none>"` for the side
/// that ran out first.
pub fn first_mismatch<'a>(
    left: &'a [ContigEntry],
    right: &'a [ContigEntry],
) -> Option<(&'a str, &'a str)> {
    let longest = left.len().max(right.len());
    (0..longest).find_map(|i| {
        let l = left.get(i).map_or("<none>", |c| c.name.as_str());
        let r = right.get(i).map_or("<none>", |c| c.name.as_str());
        (l != r).then_some((l, r))
    })
}
