//! Cluster fingerprints of paragraphs.
//!
//! A fingerprint keeps the dominant clusters of a paragraph's cluster weight
//! profile, each quantized to a decile of the strongest one. It is a lossy
//! filter: decoded weights only approximate the original values.
//!
//! On disk every kept cluster is one integer token `cluster * 10 + decile`,
//! tokens are comma separated and ordered by descending weight.

use std::fmt;

/// At most this many clusters are kept per paragraph.
pub const MAX_CLUSTERS: usize = 5;

/// Clusters weaker than this share of the strongest one are dropped.
pub const RELATIVE_CUTOFF: f32 = 0.1;

/// Highest decile; the strongest cluster always quantizes to it.
const MAX_DECILE: u8 = 9;

/// One kept cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterDecile {
    pub cluster: u32,
    pub decile: u8,
}

impl ClusterDecile {
    /// Approximate weight represented by the decile.
    #[must_use]
    pub fn decoded_weight(&self) -> f32 {
        decode_decile(self.decile)
    }
}

/// `decile / 10 + 0.09`: maps 0..=9 onto 0.09..=0.99.
#[must_use]
pub fn decode_decile(decile: u8) -> f32 {
    f32::from(decile) / 10.0 + 0.09
}

/// Quantized, clipped cluster profile of one paragraph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fingerprint(Vec<ClusterDecile>);

impl Fingerprint {
    /// Clips and quantizes a per-cluster weight profile.
    ///
    /// Keeps the top [`MAX_CLUSTERS`] clusters that also reach
    /// [`RELATIVE_CUTOFF`] of the maximum. A profile without any positive
    /// weight yields an empty fingerprint.
    #[must_use]
    pub fn from_weights(weights: &[f32]) -> Self {
        let max = weights.iter().copied().fold(0.0f32, f32::max);
        if max <= 0.0 {
            return Self::default();
        }

        let mut ranked: Vec<(usize, f32)> = weights.iter().copied().enumerate().collect();
        // stable: equal weights keep cluster order
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        let entries = ranked
            .into_iter()
            .take(MAX_CLUSTERS)
            .take_while(|&(_, w)| w >= max * RELATIVE_CUTOFF)
            .filter_map(|(cluster, w)| {
                Some(ClusterDecile {
                    cluster: u32::try_from(cluster).ok()?,
                    decile: quantize(w, max),
                })
            })
            .collect();
        Self(entries)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[ClusterDecile] {
        &self.0
    }

    /// Expected share of the query's cluster mass this paragraph covers:
    /// `Σ query_weights[cluster] × decoded weight`.
    #[must_use]
    pub fn expected_contribution(&self, query_weights: &[f32]) -> f32 {
        self.0
            .iter()
            .map(|e| {
                let q = query_weights.get(e.cluster as usize).copied().unwrap_or(0.0);
                q * e.decoded_weight()
            })
            .sum()
    }

    /// Parses the comma-separated token list.
    pub fn decode(text: &str) -> Result<Self, String> {
        if text.is_empty() {
            return Ok(Self::default());
        }
        text.split(',')
            .map(|token| {
                let value: u64 = token
                    .parse()
                    .map_err(|_| format!("invalid fingerprint token '{token}'"))?;
                let cluster = u32::try_from(value / 10)
                    .map_err(|_| format!("cluster id out of range in '{token}'"))?;
                Ok(ClusterDecile {
                    cluster,
                    decile: (value % 10) as u8,
                })
            })
            .collect::<Result<Vec<_>, String>>()
            .map(Self)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", u64::from(e.cluster) * 10 + u64::from(e.decile))?;
        }
        Ok(())
    }
}

fn quantize(weight: f32, max: f32) -> u8 {
    let decile = (f32::from(MAX_DECILE) * weight / max).round();
    decile.clamp(0.0, f32::from(MAX_DECILE)) as u8
}
