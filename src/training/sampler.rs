//! Deterministic negative sampling.
//!
//! Every edge gets its own ChaCha8 stream: the key is derived from the epoch
//! seed and the stream id is the edge index. Draws therefore only depend on
//! `(seed, edge_idx)` and never on worker scheduling or on the number of
//! draws other edges made.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Golden-ratio multiplier used to spread epoch indices over the seed space
const SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// Seed of a single epoch
///
/// Mixes the run seed with the epoch index so consecutive epochs draw
/// different, but reproducible, negative samples.
///
/// ### Params
///
/// * `seed` - Run-level seed
/// * `epoch` - Current epoch
///
/// ### Returns
///
/// The seed to hand to the batch optimiser for this epoch
#[inline]
pub fn epoch_seed(seed: u64, epoch: usize) -> u64 {
    seed.wrapping_mul(6364136223846793005)
        .wrapping_add((epoch as u64).wrapping_mul(SEED_MIX))
}

/// Counter-based sampler for the negative samples of one edge
pub struct EdgeSampler {
    rng: ChaCha8Rng,
}

impl EdgeSampler {
    /// Create the sampler of edge `edge_idx` for `seed`
    ///
    /// ### Params
    ///
    /// * `seed` - Epoch seed
    /// * `edge_idx` - Index of the edge, selects the ChaCha stream
    pub fn new(seed: u64, edge_idx: usize) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(edge_idx as u64);
        Self { rng }
    }

    /// Next raw 32-bit draw
    #[inline(always)]
    pub fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    /// Next vertex index in `0..n_vertices`
    ///
    /// Draw modulo the number of vertices, so the distribution carries the
    /// usual small modulo bias for huge vertex counts.
    #[inline(always)]
    pub fn next_vertex(&mut self, n_vertices: usize) -> usize {
        (self.next_u32() as usize) % n_vertices
    }
}

///////////
// Tests //
///////////
