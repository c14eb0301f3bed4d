//! Which trains stand on which segments.

use std::collections::{HashMap, HashSet};

use smallvec::SmallVec;

use crate::layout::{Layout, SegmentId};
use crate::position::Loc;
use crate::train::{Train, TrainId};
use crate::units::Scale;

pub type Extent = SmallVec<[SegmentId; 8]>;

/// Segments covered by a train standing with its front at `head` and
/// `length` feet long, front first.
pub fn extent(layout: &Layout, scale: &Scale, head: &Loc, length: f64) -> Extent {
    let mut segs = Extent::new();
    segs.push(head.segment);
    if let Some(back) = head.reverse(layout) {
        let adv = back.advance(layout, scale, length);
        segs.extend(adv.entered.iter().cloned());
    }
    segs
}

/// The far end of a train standing at `head`, facing away from it.
pub fn tail(layout: &Layout, scale: &Scale, head: &Loc, length: f64) -> Option<Loc> {
    let back = head.reverse(layout)?;
    Some(back.advance(layout, scale, length).loc)
}

#[derive(Debug, Default, Clone)]
pub struct Occupancy {
    by_segment: HashMap<SegmentId, SmallVec<[TrainId; 2]>>,
}

impl Occupancy {
    pub fn build(layout: &Layout, scale: &Scale, trains: &[Train]) -> Occupancy {
        let mut occ = Occupancy::default();
        for t in trains {
            occ.insert_all(t.id, &extent(layout, scale, &t.loc, t.length()));
        }
        occ
    }

    pub fn insert(&mut self, seg: SegmentId, train: TrainId) {
        let v = self.by_segment.entry(seg).or_insert_with(SmallVec::new);
        if !v.contains(&train) {
            v.push(train);
        }
    }

    pub fn insert_all(&mut self, train: TrainId, segs: &[SegmentId]) {
        for &s in segs {
            self.insert(s, train);
        }
    }

    pub fn trains(&self, seg: SegmentId) -> &[TrainId] {
        self.by_segment.get(&seg).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn is_occupied(&self, seg: SegmentId) -> bool {
        !self.trains(seg).is_empty()
    }

    pub fn segments(&self) -> HashSet<SegmentId> {
        self.by_segment.iter().filter(|(_, v)| !v.is_empty()).map(|(k, _)| *k).collect()
    }
}

/// Occupancy during one tick: the picture taken before anything moved,
/// and what the trains already moved this tick cover now. A train counts
/// by its new extent once it has moved, by its old one before.
#[derive(Debug, Default)]
pub struct TickOccupancy {
    pub before: Occupancy,
    pub after: Occupancy,
    moved: HashSet<TrainId>,
}

impl TickOccupancy {
    pub fn new(before: Occupancy) -> TickOccupancy {
        TickOccupancy { before, after: Occupancy::default(), moved: HashSet::new() }
    }

    /// Record that `train` now covers `segs`.
    pub fn moved(&mut self, train: TrainId, segs: &[SegmentId]) {
        self.moved.insert(train);
        self.after.insert_all(train, segs);
    }

    /// Claim a single segment for `train` mid-move.
    pub fn claim(&mut self, train: TrainId, seg: SegmentId) {
        self.after.insert(seg, train);
    }

    pub fn trains(&self, seg: SegmentId) -> SmallVec<[TrainId; 2]> {
        let mut v: SmallVec<[TrainId; 2]> = self.before.trains(seg).iter()
            .cloned()
            .filter(|t| !self.moved.contains(t))
            .collect();
        for &t in self.after.trains(seg) {
            if !v.contains(&t) {
                v.push(t);
            }
        }
        v
    }

    /// Some train other than `train` is on `seg`.
    pub fn other(&self, seg: SegmentId, train: TrainId) -> Option<TrainId> {
        self.trains(seg).into_iter().find(|t| *t != train)
    }
}
