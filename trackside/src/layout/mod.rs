//! The track network: an arena of segments linked by index.

pub mod signal;
pub mod switch;

use smallvec::SmallVec;

use crate::geometry::{bezier, bezier_length, Point};
use crate::units::Scale;
use self::signal::{Indication, SignalProgram};
use self::switch::{four_way_exit, Switch, BEGIN};

pub type SegmentId = usize;

/// Physical length of the off-map staging track behind each portal, in feet.
pub const STAGING_LENGTH: f64 = 2640.0;

#[derive(Debug)]
pub enum SegmentKind {
    Track,
    /// Track that exists for movement only, e.g. tunnels.
    Hidden,
    /// Freight cars load (or unload) while a train stands here.
    Load { unload: bool },
    /// Level crossing with a road.
    Crossing,
    /// Quadratic curve; anchors are start, control point, end.
    Curve,
    /// Map edge. Slot 0 faces the map, slot 1 the staging track.
    Portal { staging: SegmentId },
    /// Off-map track behind a portal. Slot 0 is the portal, slot 1 is open.
    Staging { portal: SegmentId },
    Switch(Switch),
    FourWay,
    /// One-way: traversal only runs from slot 0 to slot 1.
    Signal(Box<dyn SignalProgram>),
    Label(String),
}

#[derive(Debug)]
pub struct Segment {
    pub kind: SegmentKind,
    pub links: SmallVec<[Option<SegmentId>; 4]>,
    pub anchors: SmallVec<[Point; 3]>,
}

impl Segment {
    fn new(kind: SegmentKind, slots: usize, anchors: &[Point]) -> Segment {
        Segment {
            kind,
            links: SmallVec::from_elem(None, slots),
            anchors: SmallVec::from_slice(anchors),
        }
    }

    /// At most one train at a time.
    pub fn singleton(&self) -> bool {
        match self.kind {
            SegmentKind::Switch(_) | SegmentKind::FourWay | SegmentKind::Signal(_) |
            SegmentKind::Staging { .. } => true,
            _ => false,
        }
    }

    /// Trains here are not drawn.
    pub fn car_hidden(&self) -> bool {
        match self.kind {
            SegmentKind::Hidden | SegmentKind::Staging { .. } => true,
            _ => false,
        }
    }

    /// Plain two-ended track where either end may be left open.
    pub fn two_ended(&self) -> bool {
        match self.kind {
            SegmentKind::Track | SegmentKind::Hidden | SegmentKind::Load { .. } |
            SegmentKind::Crossing | SegmentKind::Curve | SegmentKind::Portal { .. } |
            SegmentKind::Staging { .. } => true,
            _ => false,
        }
    }

    pub fn zero_length(&self) -> bool {
        match self.kind {
            SegmentKind::Switch(_) | SegmentKind::FourWay | SegmentKind::Signal(_) |
            SegmentKind::Label(_) => true,
            _ => false,
        }
    }

    /// Physical length in feet. Does not depend on direction.
    pub fn length(&self, scale: &Scale) -> f64 {
        match self.kind {
            SegmentKind::Switch(_) | SegmentKind::FourWay | SegmentKind::Signal(_) |
            SegmentKind::Label(_) => 0.0,
            SegmentKind::Staging { .. } => STAGING_LENGTH,
            SegmentKind::Curve => {
                scale.to_feet(bezier_length(&self.anchors[0], &self.anchors[1], &self.anchors[2]))
            }
            _ => scale.to_feet(self.anchors[0].dist(&self.anchors[1])),
        }
    }

    /// Slot linked to `origin`. An absent origin matches the first open slot.
    pub fn slot_of(&self, origin: Option<SegmentId>) -> Option<usize> {
        self.links.iter().position(|l| *l == origin)
    }

    /// Where a train arriving from `origin` goes next. Switch state decides
    /// the leg taken from the base.
    ///
    /// Panics if `origin` is not linked to this segment: every stored link
    /// is reciprocal, so a stray origin means the graph is corrupt.
    pub fn dest(&self, origin: Option<SegmentId>) -> Option<SegmentId> {
        if let SegmentKind::Label(_) = self.kind {
            return None;
        }
        let slot = match self.slot_of(origin) {
            Some(s) => s,
            None => panic!("graph inconsistency: {:?} is not linked to {:?}", origin, self.links),
        };
        match self.kind {
            SegmentKind::Signal(_) => if slot == 0 { self.links[1] } else { None },
            SegmentKind::Switch(ref sw) => {
                if slot == BEGIN { self.links[sw.leg()] } else { self.links[BEGIN] }
            }
            SegmentKind::FourWay => self.links[four_way_exit(slot)],
            _ => self.links[1 - slot],
        }
    }

    /// Drawing position `fraction` of the way from the `origin` end.
    pub fn point(&self, origin: Option<SegmentId>, fraction: f64) -> Point {
        if self.zero_length() {
            return self.anchors[0];
        }
        let from_start = self.slot_of(origin).unwrap_or(0) == 0;
        let t = if from_start { fraction } else { 1.0 - fraction };
        match self.kind {
            SegmentKind::Curve => bezier(&self.anchors[0], &self.anchors[1], &self.anchors[2], t),
            _ => self.anchors[0].lerp(&self.anchors[1], t),
        }
    }
}

#[derive(Debug, Fail)]
pub enum LayoutError {
    #[fail(display = "unknown segment {}", _0)]
    UnknownSegment(SegmentId),
    #[fail(display = "segment {} has no slot {}", _0, _1)]
    NoSuchSlot(SegmentId, usize),
    #[fail(display = "slot {} of segment {} is already linked", _1, _0)]
    SlotTaken(SegmentId, usize),
    #[fail(display = "segment {} links to {} but not back", _0, _1)]
    NotReciprocal(SegmentId, SegmentId),
}

#[derive(Debug, Default)]
pub struct Layout {
    segments: Vec<Segment>,
}

impl Layout {
    pub fn new() -> Layout {
        Default::default()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, id: SegmentId) -> &Segment {
        &self.segments[id]
    }

    pub fn try_get(&self, id: SegmentId) -> Result<&Segment, LayoutError> {
        self.segments.get(id).ok_or(LayoutError::UnknownSegment(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (SegmentId, &Segment)> {
        self.segments.iter().enumerate()
    }

    fn push(&mut self, segment: Segment) -> SegmentId {
        self.segments.push(segment);
        self.segments.len() - 1
    }

    pub fn add_track(&mut self, a: Point, b: Point) -> SegmentId {
        self.push(Segment::new(SegmentKind::Track, 2, &[a, b]))
    }

    pub fn add_hidden(&mut self, a: Point, b: Point) -> SegmentId {
        self.push(Segment::new(SegmentKind::Hidden, 2, &[a, b]))
    }

    pub fn add_load(&mut self, a: Point, b: Point, unload: bool) -> SegmentId {
        self.push(Segment::new(SegmentKind::Load { unload }, 2, &[a, b]))
    }

    pub fn add_crossing(&mut self, a: Point, b: Point) -> SegmentId {
        self.push(Segment::new(SegmentKind::Crossing, 2, &[a, b]))
    }

    pub fn add_curve(&mut self, a: Point, ctrl: Point, b: Point) -> SegmentId {
        self.push(Segment::new(SegmentKind::Curve, 2, &[a, ctrl, b]))
    }

    pub fn add_switch(&mut self, at: Point) -> SegmentId {
        self.push(Segment::new(SegmentKind::Switch(Switch::default()), 3, &[at]))
    }

    pub fn add_four_way(&mut self, at: Point) -> SegmentId {
        self.push(Segment::new(SegmentKind::FourWay, 4, &[at]))
    }

    pub fn add_signal(&mut self, at: Point, program: Box<dyn SignalProgram>) -> SegmentId {
        self.push(Segment::new(SegmentKind::Signal(program), 2, &[at]))
    }

    pub fn add_label(&mut self, at: Point, text: &str) -> SegmentId {
        self.push(Segment::new(SegmentKind::Label(text.to_string()), 1, &[at]))
    }

    /// A portal from `inner` (map side, slot 0) to `edge`, with its staging
    /// track behind it. Returns the portal.
    pub fn add_portal(&mut self, inner: Point, edge: Point) -> SegmentId {
        let portal = self.segments.len();
        let staging = portal + 1;
        let mut p = Segment::new(SegmentKind::Portal { staging }, 2, &[inner, edge]);
        p.links[1] = Some(staging);
        let mut s = Segment::new(SegmentKind::Staging { portal }, 2, &[edge, edge]);
        s.links[0] = Some(portal);
        self.push(p);
        self.push(s);
        portal
    }

    /// Link slot `sa` of `a` with slot `sb` of `b`, both ways.
    pub fn connect(&mut self, a: SegmentId, sa: usize, b: SegmentId, sb: usize) -> Result<(), LayoutError> {
        for &(seg, slot) in &[(a, sa), (b, sb)] {
            let s = self.try_get(seg)?;
            match s.links.get(slot) {
                None => return Err(LayoutError::NoSuchSlot(seg, slot)),
                Some(Some(_)) => return Err(LayoutError::SlotTaken(seg, slot)),
                Some(None) => {}
            }
        }
        self.segments[a].links[sa] = Some(b);
        self.segments[b].links[sb] = Some(a);
        Ok(())
    }

    /// Open slot `slot` of `seg` and the matching slot on the other side.
    pub fn disconnect(&mut self, seg: SegmentId, slot: usize) -> Result<(), LayoutError> {
        let other = match self.try_get(seg)?.links.get(slot) {
            None => return Err(LayoutError::NoSuchSlot(seg, slot)),
            Some(l) => *l,
        };
        self.segments[seg].links[slot] = None;
        if let Some(o) = other {
            self.relink(o, seg, None);
        }
        Ok(())
    }

    /// Rewrite `seg`'s link to `old` so it points at `new`.
    pub fn relink(&mut self, seg: SegmentId, old: SegmentId, new: Option<SegmentId>) {
        if let Some(l) = self.segments[seg].links.iter_mut().find(|l| **l == Some(old)) {
            *l = new;
        }
    }

    /// Verify every link is reciprocated.
    pub fn check(&self) -> Result<(), LayoutError> {
        for (id, seg) in self.iter() {
            for other in seg.links.iter().filter_map(|l| *l) {
                let back = self.try_get(other)?;
                if !back.links.contains(&Some(id)) {
                    return Err(LayoutError::NotReciprocal(id, other));
                }
            }
        }
        Ok(())
    }

    pub fn dest(&self, seg: SegmentId, origin: Option<SegmentId>) -> Option<SegmentId> {
        self.segments[seg].dest(origin)
    }

    pub fn length(&self, seg: SegmentId, scale: &Scale) -> f64 {
        self.segments[seg].length(scale)
    }

    pub fn switch(&self, seg: SegmentId) -> Option<&Switch> {
        match self.segments.get(seg).map(|s| &s.kind) {
            Some(SegmentKind::Switch(sw)) => Some(sw),
            _ => None,
        }
    }

    pub fn switch_mut(&mut self, seg: SegmentId) -> Option<&mut Switch> {
        match self.segments.get_mut(seg).map(|s| &mut s.kind) {
            Some(SegmentKind::Switch(sw)) => Some(sw),
            _ => None,
        }
    }

    pub fn program(&self, seg: SegmentId) -> Option<&dyn SignalProgram> {
        match self.segments.get(seg).map(|s| &s.kind) {
            Some(SegmentKind::Signal(p)) => Some(p.as_ref()),
            _ => None,
        }
    }

    pub fn program_mut(&mut self, seg: SegmentId) -> Option<&mut (dyn SignalProgram + 'static)> {
        match self.segments.get_mut(seg).map(|s| &mut s.kind) {
            Some(SegmentKind::Signal(p)) => Some(p.as_mut()),
            _ => None,
        }
    }

    pub fn indication(&self, seg: SegmentId) -> Option<Indication> {
        self.program(seg).map(|p| p.status())
    }

    /// Whether a train may pass `seg` from its facing side. Only signals
    /// ever say no.
    pub fn may_proceed(&self, seg: SegmentId) -> bool {
        self.indication(seg).map(|i| i != Indication::Stop).unwrap_or(true)
    }

    pub fn signals(&self) -> Vec<SegmentId> {
        self.iter().filter(|(_, s)| match s.kind { SegmentKind::Signal(_) => true, _ => false })
            .map(|(id, _)| id).collect()
    }

    pub fn switches(&self) -> Vec<SegmentId> {
        self.iter().filter(|(_, s)| match s.kind { SegmentKind::Switch(_) => true, _ => false })
            .map(|(id, _)| id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::signal::ManualProgram;
    use super::switch::{DIVERGING, STRAIGHT};

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn lengths_are_symmetric_and_zero_for_nodes() {
        let scale = Scale::new(2.0);
        let mut l = Layout::new();
        let t = l.add_track(p(0.0, 0.0), p(50.0, 0.0));
        let c = l.add_curve(p(50.0, 0.0), p(75.0, 0.0), p(75.0, 25.0));
        let sw = l.add_switch(p(0.0, 0.0));
        let fw = l.add_four_way(p(0.0, 0.0));
        let sig = l.add_signal(p(0.0, 0.0), Box::new(ManualProgram::new(Indication::Clear)));
        let lab = l.add_label(p(0.0, 0.0), "Yard");
        assert_eq!(l.length(t, &scale), 100.0);
        assert!(l.length(c, &scale) > 2.0 * 25.0 * 2.0f64.sqrt());
        for &z in &[sw, fw, sig, lab] {
            assert_eq!(l.length(z, &scale), 0.0);
        }
        // Measured from either anchor the answer is the same.
        let rev = l.add_track(p(50.0, 0.0), p(0.0, 0.0));
        assert_eq!(l.length(rev, &scale), l.length(t, &scale));
    }

    #[test]
    fn switch_dest_follows_state() {
        let mut l = Layout::new();
        let a = l.add_track(p(-10.0, 0.0), p(0.0, 0.0));
        let sw = l.add_switch(p(0.0, 0.0));
        let s = l.add_track(p(0.0, 0.0), p(10.0, 0.0));
        let d = l.add_track(p(0.0, 0.0), p(10.0, 5.0));
        l.connect(a, 1, sw, BEGIN).unwrap();
        l.connect(sw, STRAIGHT, s, 0).unwrap();
        l.connect(sw, DIVERGING, d, 0).unwrap();
        l.check().unwrap();

        assert_eq!(l.dest(sw, Some(a)), Some(s));
        assert_eq!(l.dest(sw, Some(s)), Some(a));
        assert_eq!(l.dest(sw, Some(d)), Some(a));
        l.switch_mut(sw).unwrap().toggle();
        assert_eq!(l.dest(sw, Some(a)), Some(d));
        assert_eq!(l.dest(a, Some(sw)), None);
        assert_eq!(l.dest(a, None), Some(sw));
    }

    #[test]
    fn signal_is_one_way() {
        let mut l = Layout::new();
        let a = l.add_track(p(0.0, 0.0), p(10.0, 0.0));
        let sig = l.add_signal(p(10.0, 0.0), Box::new(ManualProgram::new(Indication::Stop)));
        let b = l.add_track(p(10.0, 0.0), p(20.0, 0.0));
        l.connect(a, 1, sig, 0).unwrap();
        l.connect(sig, 1, b, 0).unwrap();
        assert_eq!(l.dest(sig, Some(a)), Some(b));
        assert_eq!(l.dest(sig, Some(b)), None);
        assert!(!l.may_proceed(sig));
        assert!(l.may_proceed(a));
    }

    #[test]
    fn portal_leads_to_staging() {
        let mut l = Layout::new();
        let t = l.add_track(p(0.0, 0.0), p(10.0, 0.0));
        let portal = l.add_portal(p(10.0, 0.0), p(20.0, 0.0));
        l.connect(t, 1, portal, 0).unwrap();
        let staging = match l.get(portal).kind {
            SegmentKind::Portal { staging } => staging,
            _ => panic!("not a portal"),
        };
        assert_eq!(l.dest(portal, Some(t)), Some(staging));
        assert_eq!(l.dest(portal, Some(staging)), Some(t));
        assert_eq!(l.dest(staging, None), Some(portal));
        assert_eq!(l.dest(staging, Some(portal)), None);
        assert!(l.get(staging).car_hidden());
        assert!(l.get(staging).singleton());
        assert_eq!(l.length(staging, &Scale::default()), STAGING_LENGTH);
    }

    #[test]
    fn four_way_and_label() {
        let mut l = Layout::new();
        let fw = l.add_four_way(p(0.0, 0.0));
        let ts: Vec<_> = (0..4).map(|i| l.add_track(p(0.0, 0.0), p(i as f64, 1.0))).collect();
        for (i, t) in ts.iter().enumerate() {
            l.connect(fw, i, *t, 0).unwrap();
        }
        assert_eq!(l.dest(fw, Some(ts[0])), Some(ts[1]));
        assert_eq!(l.dest(fw, Some(ts[3])), Some(ts[2]));
        let lab = l.add_label(p(0.0, 0.0), "x");
        assert_eq!(l.dest(lab, Some(ts[0])), None);
    }

    #[test]
    fn connect_errors_and_relink() {
        let mut l = Layout::new();
        let a = l.add_track(p(0.0, 0.0), p(1.0, 0.0));
        let b = l.add_track(p(1.0, 0.0), p(2.0, 0.0));
        let c = l.add_track(p(1.0, 0.0), p(2.0, 1.0));
        l.connect(a, 1, b, 0).unwrap();
        assert!(l.connect(a, 1, c, 0).is_err());
        assert!(l.connect(a, 5, c, 0).is_err());
        assert!(l.connect(a, 0, 99, 0).is_err());

        // One-sided rewrite breaks reciprocity until the other side follows.
        l.relink(a, b, Some(c));
        assert!(l.check().is_err());
        l.relink(b, a, None);
        l.segments[c].links[0] = Some(a);
        l.check().unwrap();

        l.disconnect(a, 1).unwrap();
        assert_eq!(l.get(a).links[1], None);
        assert_eq!(l.get(c).links[0], None);
        l.check().unwrap();
    }

    #[test]
    #[should_panic(expected = "graph inconsistency")]
    fn dest_from_stranger_panics() {
        let mut l = Layout::new();
        let a = l.add_track(p(0.0, 0.0), p(1.0, 0.0));
        let b = l.add_track(p(1.0, 0.0), p(2.0, 0.0));
        l.connect(a, 1, b, 0).unwrap();
        let sw = l.add_switch(p(5.0, 5.0));
        l.connect(sw, 0, a, 0).unwrap();
        let stranger = l.add_track(p(9.0, 9.0), p(8.0, 8.0));
        l.dest(sw, Some(stranger));
    }

    #[test]
    fn points_follow_origin() {
        let mut l = Layout::new();
        let a = l.add_track(p(0.0, 0.0), p(10.0, 0.0));
        let b = l.add_track(p(10.0, 0.0), p(20.0, 0.0));
        l.connect(a, 1, b, 0).unwrap();
        assert_eq!(l.get(a).point(None, 0.25), p(2.5, 0.0));
        assert_eq!(l.get(a).point(Some(b), 0.25), p(7.5, 0.0));
    }
}
