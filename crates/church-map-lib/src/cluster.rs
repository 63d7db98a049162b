//! Zoom-dependent grid clustering of church markers
//!
//! Churches whose pins would land within one grid cell at the current zoom
//! collapse into a cluster marker. Clustering is deterministic for a given
//! input set and zoom: buckets are ordered by cell key and members by church
//! id, so no insertion order or parallel scheduling leaks into the result.
//! Results are cached per `(data generation, zoom bucket)` and rebuilt on
//! data replacement, zoom-bucket change, or filter change.

use crate::church::Church;
use crate::utils;
use dashmap::DashMap;
use geo::Point;
use rayon::prelude::*;
use smallvec::SmallVec;

/// Grid cell edge in screen pixels; pins closer than this merge
pub const CLUSTER_CELL_PX: f64 = 64.0;

/// Members within this distance of each other count as one coordinate
pub const COINCIDENT_EPSILON_M: f64 = 1.0;

/// One rendered marker: a lone church or a cluster of them
#[derive(Debug, Clone, PartialEq)]
pub enum MapMarker {
    Church { id: i64, position: Point<f64> },
    Cluster(ClusterItem),
}

impl MapMarker {
    /// Rendered position (the church itself, or the cluster centroid)
    pub fn position(&self) -> Point<f64> {
        match self {
            Self::Church { position, .. } => *position,
            Self::Cluster(item) => item.position,
        }
    }

    /// Ids of every church behind this marker, ascending
    pub fn member_ids(&self) -> Vec<i64> {
        match self {
            Self::Church { id, .. } => vec![*id],
            Self::Cluster(item) => item.members.to_vec(),
        }
    }
}

/// A group of churches rendered as one marker at the current zoom
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterItem {
    /// Representative position: centroid of the members
    pub position: Point<f64>,
    /// Member church ids, ascending
    pub members: SmallVec<[i64; 8]>,
    /// All members share (approximately) the same coordinate, so zooming in
    /// further would never spread them apart
    pub coincident: bool,
}

struct CachedClusters {
    data_generation: u64,
    zoom_bucket: i32,
    markers: Vec<MapMarker>,
}

/// Groups churches into markers, caching the last grouping
pub struct Clusterer {
    cell_px: f64,
    cache: Option<CachedClusters>,
}

impl Default for Clusterer {
    fn default() -> Self {
        Self::new()
    }
}

impl Clusterer {
    pub fn new() -> Self {
        Self::with_cell_px(CLUSTER_CELL_PX)
    }

    pub fn with_cell_px(cell_px: f64) -> Self {
        Self {
            cell_px,
            cache: None,
        }
    }

    /// Drop the cached grouping (data or filter changed)
    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    /// Markers for `churches` at the given zoom
    ///
    /// `data_generation` identifies the input set; the cached grouping is
    /// reused while both the generation and the zoom bucket are unchanged.
    pub fn markers(&mut self, churches: &[Church], zoom: f64, data_generation: u64) -> &[MapMarker] {
        #[cfg(feature = "profiling")]
        profiling::scope!("clusterer::markers");

        let zoom_bucket = zoom.floor() as i32;
        let stale = match &self.cache {
            Some(cached) => {
                cached.data_generation != data_generation || cached.zoom_bucket != zoom_bucket
            }
            None => true,
        };

        if stale {
            let markers = Self::rebuild(churches, zoom_bucket, self.cell_px);
            tracing::debug!(
                churches = churches.len(),
                markers = markers.len(),
                zoom_bucket,
                "rebuilt marker clusters"
            );
            self.cache = Some(CachedClusters {
                data_generation,
                zoom_bucket,
                markers,
            });
        }

        match &self.cache {
            Some(cached) => &cached.markers,
            None => &[],
        }
    }

    fn rebuild(churches: &[Church], zoom_bucket: i32, cell_px: f64) -> Vec<MapMarker> {
        if churches.is_empty() {
            return Vec::new();
        }

        let cell_meters = cell_px * utils::meters_per_pixel(zoom_bucket as f64);

        // Parallel bucketing; ordering is restored by sorting afterwards
        let cells: DashMap<(i64, i64), SmallVec<[usize; 8]>> = DashMap::new();
        churches.par_iter().enumerate().for_each(|(index, church)| {
            let mercator = utils::wgs84_to_mercator(church.position);
            let key = (
                (mercator.x() / cell_meters).floor() as i64,
                (mercator.y() / cell_meters).floor() as i64,
            );
            cells.entry(key).or_default().push(index);
        });

        let mut buckets: Vec<((i64, i64), SmallVec<[usize; 8]>)> = cells.into_iter().collect();
        buckets.sort_by_key(|(key, _)| *key);

        let mut markers = Vec::with_capacity(buckets.len());
        for (_, mut indexes) in buckets {
            indexes.sort_by_key(|&i| churches[i].id);

            if let [index] = indexes[..] {
                let church = &churches[index];
                markers.push(MapMarker::Church {
                    id: church.id,
                    position: church.position,
                });
                continue;
            }

            let members: SmallVec<[i64; 8]> = indexes.iter().map(|&i| churches[i].id).collect();
            let positions: Vec<Point<f64>> =
                indexes.iter().map(|&i| churches[i].position).collect();

            let centroid_mercator = positions
                .iter()
                .map(|p| utils::wgs84_to_mercator(*p))
                .fold(Point::new(0.0, 0.0), |acc, p| {
                    Point::new(acc.x() + p.x(), acc.y() + p.y())
                });
            let n = positions.len() as f64;
            let position = utils::mercator_to_wgs84(Point::new(
                centroid_mercator.x() / n,
                centroid_mercator.y() / n,
            ));

            let coincident = positions
                .iter()
                .all(|p| utils::haversine_meters(positions[0], *p) <= COINCIDENT_EPSILON_M);

            markers.push(MapMarker::Cluster(ClusterItem {
                position,
                members,
                coincident,
            }));
        }

        markers
    }
}
