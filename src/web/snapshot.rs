//! Derived per-node attributes for export.
//!
//! Color and position come from a generator seeded with the SHA-256 of the node's title, so a
//! title lands in the same place with the same color in every web and every run.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::f64::consts::TAU;

use super::Web;
use crate::properties::{Rgb, SizeBasis};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Size of a node with weighted degree 0.
    pub size_offset: f64,
    /// Size added at weighted degree 1.
    pub size_scale: f64,
    pub min_size: f64,
    pub position_stddev: f64,
    /// Positions are clamped to this many standard deviations from the origin.
    pub position_clamp: f64,
    pub saturation: f64,
    pub value: f64,
    pub edge_color: Rgb,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        SnapshotConfig {
            size_offset: 10.0,
            size_scale: 90.0,
            min_size: 1.0,
            position_stddev: 500.0,
            position_clamp: 3.0,
            saturation: 0.7,
            value: 0.95,
            edge_color: Rgb(160, 160, 160),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub index: usize,
    pub title: String,
    pub in_degree: usize,
    pub out_degree: usize,
    pub weighted_in_degree: f64,
    pub weighted_out_degree: f64,
    pub size: f64,
    pub color: Rgb,
    pub position: (f64, f64),
}

/// ChaCha8's output stream is fixed across rand releases.
fn title_rng(title: &str) -> ChaCha8Rng {
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&Sha256::digest(title.as_bytes()));
    ChaCha8Rng::from_seed(seed)
}

/// A standard normal draw (Box-Muller).
fn gaussian(rng: &mut ChaCha8Rng) -> f64 {
    // gen() is in [0, 1); flip it so ln never sees 0.
    let u1 = 1.0 - rng.gen::<f64>();
    let u2 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}

/// The hue/position draws for one title, independent of the web it is in.
pub fn title_attributes(title: &str, config: &SnapshotConfig) -> (Rgb, (f64, f64)) {
    let mut rng = title_rng(title);
    let color = Rgb::from_hsv(rng.gen::<f64>(), config.saturation, config.value);
    let bound = config.position_clamp * config.position_stddev;
    let mut coordinate = || (gaussian(&mut rng) * config.position_stddev).clamp(-bound, bound);
    let x = coordinate();
    let y = coordinate();
    (color, (x, y))
}

impl SnapshotConfig {
    pub fn size(&self, weighted_degree: f64) -> f64 {
        (self.size_offset + self.size_scale * weighted_degree).max(self.min_size)
    }
}

impl Web {
    /// Computes every node's [NodeSnapshot], in index order.
    #[tracing::instrument(skip_all)]
    pub fn snapshot(&self, basis: SizeBasis, config: &SnapshotConfig) -> Vec<NodeSnapshot> {
        let degrees: Vec<(usize, usize)> = (0..self.node_count())
            .map(|i| (self.in_degree(i), self.out_degree(i)))
            .collect();
        let max_in = degrees.iter().map(|d| d.0).max().unwrap_or(0).max(1) as f64;
        let max_out = degrees.iter().map(|d| d.1).max().unwrap_or(0).max(1) as f64;

        self.titles()
            .zip(degrees)
            .enumerate()
            .map(|(index, (title, (in_degree, out_degree)))| {
                let weighted_in_degree = in_degree as f64 / max_in;
                let weighted_out_degree = out_degree as f64 / max_out;
                let size = config.size(match basis {
                    SizeBasis::InDegree => weighted_in_degree,
                    SizeBasis::OutDegree => weighted_out_degree,
                });
                let (color, position) = title_attributes(title, config);
                NodeSnapshot {
                    index,
                    title: title.to_string(),
                    in_degree,
                    out_degree,
                    weighted_in_degree,
                    weighted_out_degree,
                    size,
                    color,
                    position,
                }
            })
            .collect()
    }
}
