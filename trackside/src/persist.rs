//! Saving and restoring the moving parts of a simulation: trains, switch
//! positions and signal program state. Segments are named by their index
//! in the layout; the layout itself is not part of a snapshot.

use crate::engine::Simulation;
use crate::layout::signal::{program_by_name, ProgramError};
use crate::layout::SegmentId;
use crate::output::history::Tick;
use crate::position::Loc;
use crate::train::controller::{controller_by_name, Controller};
use crate::train::{Car, Train, TrainId, MAX_SPEED, MAX_THROTTLE};

/// Stored in place of an origin segment at an open end.
pub const NO_ORIGIN: i64 = -1;

#[derive(Debug, Clone, PartialEq)]
pub struct TrainRecord {
    pub id: TrainId,
    pub segment: SegmentId,
    /// Segment index, or [`NO_ORIGIN`].
    pub origin: i64,
    pub fraction: f64,
    pub throttle: u8,
    pub brake: bool,
    pub velocity: f64,
    pub cars: Vec<Car>,
    /// As produced by [`Controller::describe`].
    pub controller: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalRecord {
    pub signal: SegmentId,
    pub program: String,
    pub state: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub tick: Tick,
    pub next_id: TrainId,
    pub trains: Vec<TrainRecord>,
    /// Switch and whether it is set to the diverging leg.
    pub switches: Vec<(SegmentId, bool)>,
    pub signals: Vec<SignalRecord>,
}

#[derive(Debug, Fail)]
pub enum RestoreError {
    #[fail(display = "unknown segment {}", _0)]
    UnknownSegment(SegmentId),
    #[fail(display = "train {} has an origin not linked to its segment", _0)]
    BadOrigin(TrainId),
    #[fail(display = "train {} has out of range state", _0)]
    BadState(TrainId),
    #[fail(display = "train id {} used twice", _0)]
    DuplicateTrain(TrainId),
    #[fail(display = "unknown controller \"{}\"", _0)]
    UnknownController(String),
    #[fail(display = "segment {} is not a switch", _0)]
    NotASwitch(SegmentId),
    #[fail(display = "segment {} is not a signal", _0)]
    NotASignal(SegmentId),
    #[fail(display = "signal {} runs program {}, snapshot has {}", _0, _1, _2)]
    ProgramMismatch(SegmentId, String, String),
    #[fail(display = "signal {}: {}", _0, _1)]
    Program(SegmentId, #[cause] ProgramError),
}

fn encode_origin(origin: Option<SegmentId>) -> i64 {
    origin.map(|o| o as i64).unwrap_or(NO_ORIGIN)
}

impl Simulation {
    pub fn snapshot(&self) -> Snapshot {
        let trains = self.trains.iter()
            .map(|t| TrainRecord {
                id: t.id,
                segment: t.loc.segment,
                origin: encode_origin(t.loc.origin),
                fraction: t.loc.fraction,
                throttle: t.throttle,
                brake: t.brake,
                velocity: t.velocity,
                cars: t.cars.clone(),
                controller: t.controller.describe(),
            })
            .collect();
        let switches = self.layout.switches().into_iter()
            .filter_map(|s| self.layout.switch(s).map(|sw| (s, sw.flipped())))
            .collect();
        let signals = self.layout.signals().into_iter()
            .filter_map(|s| self.layout.program(s).map(|p| SignalRecord {
                signal: s,
                program: p.name().to_string(),
                state: p.save(),
            }))
            .collect();
        Snapshot { tick: self.ticks, next_id: self.next_id, trains, switches, signals }
    }

    fn restore_train(&self, r: &TrainRecord) -> Result<Train, RestoreError> {
        let seg = self.layout.try_get(r.segment)
            .map_err(|_| RestoreError::UnknownSegment(r.segment))?;
        let origin = if r.origin == NO_ORIGIN {
            None
        } else if r.origin >= 0 && (r.origin as usize) < self.layout.len() {
            Some(r.origin as usize)
        } else {
            return Err(RestoreError::BadOrigin(r.id));
        };
        if seg.slot_of(origin).is_none() {
            return Err(RestoreError::BadOrigin(r.id));
        }
        let in_range = r.fraction >= 0.0 && r.fraction <= 1.0
            && r.velocity >= 0.0 && r.velocity <= MAX_SPEED
            && r.throttle <= MAX_THROTTLE;
        if !in_range {
            return Err(RestoreError::BadState(r.id));
        }
        let controller: Box<dyn Controller> = controller_by_name(&r.controller)
            .ok_or_else(|| RestoreError::UnknownController(r.controller.clone()))?;
        let mut t = Train::new(r.id, r.cars.clone(), Loc::new(r.segment, origin, r.fraction),
                               controller);
        t.throttle = r.throttle;
        t.brake = r.brake;
        t.velocity = r.velocity;
        Ok(t)
    }

    /// Replace trains, switch positions and signal state with those in
    /// `snap`. Nothing changes unless the whole snapshot fits the layout.
    pub fn restore(&mut self, snap: &Snapshot) -> Result<(), RestoreError> {
        let mut trains = Vec::with_capacity(snap.trains.len());
        for r in &snap.trains {
            if trains.iter().any(|t: &Train| t.id == r.id) {
                return Err(RestoreError::DuplicateTrain(r.id));
            }
            trains.push(self.restore_train(r)?);
        }
        for &(s, _) in &snap.switches {
            if self.layout.switch(s).is_none() {
                return Err(RestoreError::NotASwitch(s));
            }
        }
        for rec in &snap.signals {
            let p = self.layout.program(rec.signal).ok_or(RestoreError::NotASignal(rec.signal))?;
            if p.name() != rec.program {
                return Err(RestoreError::ProgramMismatch(rec.signal, p.name().to_string(),
                                                         rec.program.clone()));
            }
            if let Some(mut scratch) = program_by_name(&rec.program) {
                scratch.restore(&rec.state).map_err(|e| RestoreError::Program(rec.signal, e))?;
            }
        }

        for rec in &snap.signals {
            if let Some(p) = self.layout.program_mut(rec.signal) {
                p.restore(&rec.state).map_err(|e| RestoreError::Program(rec.signal, e))?;
            }
        }
        for &(s, flipped) in &snap.switches {
            if let Some(sw) = self.layout.switch_mut(s) {
                sw.set_flipped(flipped);
            }
        }
        let max_id = trains.iter().map(|t| t.id + 1).max().unwrap_or(1);
        self.trains = trains;
        self.next_id = snap.next_id.max(max_id);
        self.ticks = snap.tick;
        Ok(())
    }
}
