/*!
# orlbwt
This library provides online construction of the run-length encoded Burrows-Wheeler
Transform (RLBWT) of a multi-string input. Besides the classic character-by-character
extension, it implements the run-optimal variant: when several suffixes are
lexicographically tied at the point of insertion, the new character is placed so that
no existing run is split, which keeps the number of BWT runs small.

## Example
```
use orlbwt::online_rlbwt::OnlineRlbwt;
let mut bwt = OnlineRlbwt::new();
let em = bwt.end_marker();
//characters are fed reversed so the result is the BWT of the forward string
for &b in b"BANANA".iter().rev() {
    bwt.spt_extend(b as u64);
}
bwt.spt_extend(em);
assert_eq!(bwt.to_bwt_bytes(), b"ANNB\x01AA".to_vec());
```
*/

/// Resizable vectors of fixed-bit-width integers packed into 64-bit words
pub mod packed_vector;
/// Monotone integer labels over an ordered list with amortised relabeling
pub mod tag_relabel;
/// Nodes of the mixed, alphabet, and separated B+-trees plus their arena
pub mod btree_node;
/// The leaf-block arrays of the dynamic RLE structure and their side tables
pub mod bottom_blocks;
/// The dynamic run-length encoded sequence with rank/select/insert support
pub mod dyn_rle;
/// The online RLBWT builder wrapping the dynamic RLE sequence
pub mod online_rlbwt;
/// A minimal FASTA loader that packs sequences for online BWT construction
pub mod fasta;
/// Contains helper functions related to BWT construction, primarily for testing purposes
pub mod bwt_util;
