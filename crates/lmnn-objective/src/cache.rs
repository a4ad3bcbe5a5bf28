//! Per-triplet and per-point memory of the objective.
//!
//! `TripletCache` keeps the last computed (exact or bounded) margin-violation
//! value of each `(impostor slot, target slot, point)` triplet. A cell is
//! either unset or holds a finite value; there is no in-band sentinel.
//!
//! `PointStamps` keeps, per point, the transformation under which that
//! point's triplet values were last written. Mini-batch calls visit points
//! out of global order, so the drift bound must be measured per point.
use ndarray::Array2;

#[derive(Debug, Clone)]
pub struct TripletCache {
    k: usize,
    points: usize,
    cells: Vec<Option<f64>>,
}

impl TripletCache {
    pub fn new(k: usize, points: usize) -> Self {
        Self {
            k,
            points,
            cells: vec![None; k * k * points],
        }
    }

    #[inline]
    fn offset(&self, impostor_slot: usize, target_slot: usize, point: usize) -> usize {
        debug_assert!(impostor_slot < self.k && target_slot < self.k && point < self.points);
        (point * self.k + target_slot) * self.k + impostor_slot
    }

    #[inline]
    pub fn get(&self, impostor_slot: usize, target_slot: usize, point: usize) -> Option<f64> {
        self.cells[self.offset(impostor_slot, target_slot, point)]
    }

    #[inline]
    pub fn set(&mut self, impostor_slot: usize, target_slot: usize, point: usize, value: f64) {
        debug_assert!(value.is_finite(), "triplet cache only stores finite values");
        let offset = self.offset(impostor_slot, target_slot, point);
        self.cells[offset] = Some(value);
    }

    #[inline]
    pub fn clear(&mut self, impostor_slot: usize, target_slot: usize, point: usize) {
        let offset = self.offset(impostor_slot, target_slot, point);
        self.cells[offset] = None;
    }

    /// Invalidate every impostor slot of one `(target slot, point)` pair.
    pub fn clear_target(&mut self, target_slot: usize, point: usize) {
        let start = self.offset(0, target_slot, point);
        self.cells[start..start + self.k].fill(None);
    }

    /// Reorder the per-point blocks: block `p` becomes old block `ordering[p]`.
    pub fn permute(&mut self, ordering: &[usize]) {
        assert_eq!(ordering.len(), self.points, "permutation length mismatch");
        let block = self.k * self.k;
        let mut cells = Vec::with_capacity(self.cells.len());
        for &old in ordering {
            cells.extend_from_slice(&self.cells[old * block..(old + 1) * block]);
        }
        self.cells = cells;
    }

    /// Number of cells currently holding a value.
    pub fn filled(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn points(&self) -> usize {
        self.points
    }
}

#[derive(Debug, Clone)]
pub struct PointStamps {
    stamps: Vec<Option<Array2<f64>>>,
}

impl PointStamps {
    /// All points start unset.
    pub fn new(points: usize) -> Self {
        Self {
            stamps: vec![None; points],
        }
    }

    pub fn get(&self, point: usize) -> Option<&Array2<f64>> {
        self.stamps[point].as_ref()
    }

    /// Record `transformation` as the last one applied to `point`.
    pub fn set(&mut self, point: usize, transformation: &Array2<f64>) {
        if let Some(stamp) = self.stamps[point].as_mut() {
            if stamp.dim() == transformation.dim() {
                stamp.assign(transformation);
                return;
            }
        }
        self.stamps[point] = Some(transformation.to_owned());
    }

    /// Stamp every point with the same transformation.
    pub fn fill(&mut self, transformation: &Array2<f64>) {
        for point in 0..self.stamps.len() {
            self.set(point, transformation);
        }
    }

    pub fn permute(&mut self, ordering: &[usize]) {
        assert_eq!(ordering.len(), self.stamps.len(), "permutation length mismatch");
        let mut old = std::mem::take(&mut self.stamps);
        self.stamps = ordering.iter().map(|&i| old[i].take()).collect();
    }

    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }
}
