pub mod bedgraph;
pub mod bigwig;
pub mod mutations;

pub use self::bedgraph::BedGraphSource;
pub use self::bigwig::BigWigSource;
pub use self::mutations::MutationSource;

use gwcache_core::models::Chromosome;
use gwcache_core::utils::bare_chrom_name;

/// Find the catalog chromosome a file's chromosome name refers to, accepting
/// names with or without the `chr` prefix.
pub(crate) fn match_chromosome<'a>(
    name: &str,
    chromosomes: &'a [Chromosome],
) -> Option<&'a Chromosome> {
    chromosomes
        .iter()
        .find(|c| c.name == name)
        .or_else(|| {
            let bare = bare_chrom_name(name);
            chromosomes.iter().find(|c| bare_chrom_name(&c.name) == bare)
        })
}
