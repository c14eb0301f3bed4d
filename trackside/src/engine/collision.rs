//! Finding the next train ahead and deciding whether two trains touch.

use ordered_float::OrderedFloat;

use crate::layout::{Layout, SegmentId};
use crate::position::Loc;
use crate::train::{Train, TrainId};
use crate::units::{mph_to_fps, Scale};
use super::occupancy::tail;

const EPS: f64 = 1e-9;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Contact {
    /// Front meets front.
    HeadToHead,
    /// Front meets the back of a train running the same way.
    HeadToTail,
}

/// Another train close enough ahead to matter this tick.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Encounter {
    pub other: TrainId,
    pub contact: Contact,
    /// Feet along the track.
    pub distance: f64,
    /// ft/s, positive when the gap is shrinking.
    pub closing: f64,
}

/// Whether `target` faces against a walker that is on the same segment
/// with `origin`.
fn faces_against(layout: &Layout, origin: Option<SegmentId>, target: &Loc) -> bool {
    target.origin != origin && target.origin == layout.dest(target.segment, origin)
}

/// Feet from `from` forward to `target`, if `target` faces back toward
/// `from` and lies within `limit`.
pub fn distance_to(layout: &Layout, scale: &Scale, from: &Loc, target: &Loc, limit: f64)
    -> Option<f64> {
    let mut cur = *from;
    let mut travelled = 0.0;
    let mut guard = 4 * layout.len() + 4;
    loop {
        let len = layout.length(cur.segment, scale);
        if target.segment == cur.segment && faces_against(layout, cur.origin, target) {
            let at = (1.0 - target.fraction) * len;
            let here = cur.fraction * len;
            if at >= here - EPS {
                let d = (travelled + at - here).max(0.0);
                return if d <= limit { Some(d) } else { None };
            }
        }
        travelled += (1.0 - cur.fraction) * len;
        if travelled > limit {
            return None;
        }
        let next = layout.dest(cur.segment, cur.origin)?;
        cur = Loc::new(next, Some(cur.segment), 0.0);
        guard -= 1;
        if guard == 0 {
            return None;
        }
    }
}

/// The nearest front or back of another train facing `train` within
/// `limit` feet, ignoring speeds.
pub fn nearest(layout: &Layout, scale: &Scale, trains: &[Train], train: &Train, limit: f64)
    -> Option<(TrainId, Contact, f64)> {
    trains.iter()
        .filter(|o| o.id != train.id)
        .flat_map(|o| {
            let head = distance_to(layout, scale, &train.loc, &o.loc, limit)
                .map(|d| (o.id, Contact::HeadToHead, d));
            let back = tail(layout, scale, &o.loc, o.length())
                .and_then(|t| distance_to(layout, scale, &train.loc, &t, limit))
                .map(|d| (o.id, Contact::HeadToTail, d));
            head.into_iter().chain(back)
        })
        .min_by_key(|&(_, _, d)| OrderedFloat(d))
}

/// The train `trains[idx]` will touch within the next `tick_ms`, if any.
/// Contact means the gap is within `join_distance` plus what the two
/// close in one tick.
pub fn scan(layout: &Layout, scale: &Scale, trains: &[Train], idx: usize,
            join_distance: f64, tick_ms: f64) -> Option<Encounter> {
    let me = &trains[idx];
    let dt = tick_ms / 1000.0;
    let va = mph_to_fps(me.velocity);
    trains.iter()
        .enumerate()
        .filter(|&(j, _)| j != idx)
        .filter_map(|(_, o)| {
            let vb = mph_to_fps(o.velocity);
            let limit = join_distance + (va + vb) * dt;
            let mut found = None;
            if let Some(d) = distance_to(layout, scale, &me.loc, &o.loc, limit) {
                found = Some(Encounter { other: o.id, contact: Contact::HeadToHead,
                                         distance: d, closing: va + vb });
            }
            if let Some(t) = tail(layout, scale, &o.loc, o.length()) {
                if let Some(d) = distance_to(layout, scale, &me.loc, &t, limit) {
                    let e = Encounter { other: o.id, contact: Contact::HeadToTail,
                                        distance: d, closing: va - vb };
                    if found.map(|f: Encounter| d < f.distance).unwrap_or(true) {
                        found = Some(e);
                    }
                }
            }
            found
        })
        .filter(|e| e.closing >= 0.0 && e.distance <= join_distance + e.closing * dt)
        .min_by_key(|e| OrderedFloat(e.distance))
}
