//! Locations on the track network and movement along it.

use smallvec::SmallVec;

use crate::geometry::Point;
use crate::layout::{Layout, SegmentId};
use crate::units::Scale;

/// A directed location: `fraction` of the way across `segment`, measured
/// from the end where `origin` is linked. `origin` is absent only at an
/// open end, e.g. the far side of a portal's staging track.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Loc {
    pub segment: SegmentId,
    pub origin: Option<SegmentId>,
    pub fraction: f64,
}

/// A piece of drawing geometry produced while moving.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SubLine {
    pub segment: SegmentId,
    pub from: Point,
    pub to: Point,
}

impl SubLine {
    pub fn length(&self) -> f64 {
        self.from.dist(&self.to)
    }
}

/// Result of [`Loc::advance`].
#[derive(Clone, Debug)]
pub struct Advance {
    /// Geometry covered, hidden segments left out.
    pub lines: SmallVec<[SubLine; 4]>,
    /// Segments entered on the way, in order, zero-length ones included.
    pub entered: SmallVec<[SegmentId; 4]>,
    /// Where the walk ended.
    pub loc: Loc,
    /// Distance left over because the track ran out.
    pub remaining: f64,
}

impl Advance {
    pub fn blocked(&self) -> bool {
        self.remaining > 0.0
    }

    /// The location reached, or `None` if the walk ran off the track.
    pub fn end(&self) -> Option<Loc> {
        if self.blocked() { None } else { Some(self.loc) }
    }
}

/// A location together with its drawing position and heading.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Placed {
    pub loc: Loc,
    pub point: Point,
    /// Radians, direction of travel.
    pub heading: f64,
}

impl Loc {
    pub fn new(segment: SegmentId, origin: Option<SegmentId>, fraction: f64) -> Loc {
        Loc { segment, origin, fraction }
    }

    /// The segment a train at this location will enter next.
    pub fn next(&self, layout: &Layout) -> Option<SegmentId> {
        layout.dest(self.segment, self.origin)
    }

    pub fn point(&self, layout: &Layout) -> Point {
        layout.get(self.segment).point(self.origin, self.fraction)
    }

    pub fn place(&self, layout: &Layout) -> Placed {
        let seg = layout.get(self.segment);
        let point = seg.point(self.origin, self.fraction);
        let (a, b) = if self.fraction < 0.99 {
            (point, seg.point(self.origin, self.fraction + 0.01))
        } else {
            (seg.point(self.origin, self.fraction - 0.01), point)
        };
        let heading = if a == b { 0.0 } else { (b.y - a.y).atan2(b.x - a.x) };
        Placed { loc: *self, point, heading }
    }

    /// Feet from the origin end.
    pub fn offset(&self, layout: &Layout, scale: &Scale) -> f64 {
        self.fraction * layout.length(self.segment, scale)
    }

    /// The same spot facing the other way. Fails when there is nothing
    /// beyond this segment to take as the new origin, unless the segment is
    /// plain track with exactly one open end.
    pub fn reverse(&self, layout: &Layout) -> Option<Loc> {
        let seg = layout.get(self.segment);
        let beyond = seg.dest(self.origin);
        if beyond.is_none() && (!seg.two_ended() || self.origin.is_none()) {
            return None;
        }
        Some(Loc {
            segment: self.segment,
            origin: beyond,
            fraction: 1.0 - self.fraction,
        })
    }

    /// Walk `distance` feet forward, collecting geometry. Zero-length
    /// segments are passed through and reported in `entered`.
    pub fn advance(&self, layout: &Layout, scale: &Scale, distance: f64) -> Advance {
        let mut adv = Advance {
            lines: SmallVec::new(),
            entered: SmallVec::new(),
            loc: *self,
            remaining: distance.max(0.0),
        };
        if adv.remaining <= 0.0 {
            return adv;
        }
        // Guards against cycles made only of zero-length segments.
        let mut guard = 4 * layout.len() + 4;
        loop {
            let loc = adv.loc;
            let seg = layout.get(loc.segment);
            let len = seg.length(scale);
            let left = (1.0 - loc.fraction) * len;
            let from = seg.point(loc.origin, loc.fraction);
            if len > 0.0 && adv.remaining <= left {
                let fraction = loc.fraction + adv.remaining / len;
                let fraction = if fraction > 1.0 { 1.0 } else { fraction };
                if !seg.car_hidden() {
                    push_line(&mut adv.lines, SubLine {
                        segment: loc.segment, from, to: seg.point(loc.origin, fraction) });
                }
                adv.loc.fraction = fraction;
                adv.remaining = 0.0;
                return adv;
            }
            if left > 0.0 && !seg.car_hidden() {
                push_line(&mut adv.lines, SubLine {
                    segment: loc.segment, from, to: seg.point(loc.origin, 1.0) });
            }
            adv.remaining -= left;
            match seg.dest(loc.origin) {
                Some(next) => {
                    adv.entered.push(next);
                    adv.loc = Loc { segment: next, origin: Some(loc.segment), fraction: 0.0 };
                }
                None => {
                    adv.loc.fraction = 1.0;
                    return adv;
                }
            }
            guard -= 1;
            if guard == 0 {
                panic!("graph inconsistency: endless walk from {:?}", self);
            }
        }
    }
}

/// Append a line, folding pieces shorter than one drawing unit into their
/// neighbour.
fn push_line(lines: &mut SmallVec<[SubLine; 4]>, line: SubLine) {
    if let Some(last) = lines.last_mut() {
        if last.to == line.from && (line.length() < 1.0 || last.length() < 1.0) {
            if last.length() < 1.0 {
                last.segment = line.segment;
            }
            last.to = line.to;
            return;
        }
    }
    lines.push(line);
}
