//! The movement and collision engine: one `tick` moves every train once.

pub mod accident;
pub mod collision;
pub mod coupling;
pub mod occupancy;

use log::{debug, info, warn};
use smallvec::SmallVec;

use crate::layout::signal::{BlockState, Indication};
use crate::layout::{Layout, SegmentId, SegmentKind, STAGING_LENGTH};
use crate::output::history::{Event, History, Tick};
use crate::position::{Loc, SubLine};
use crate::train::controller::{Command, Controller, Outlook};
use crate::train::{cars_length, Car, Train, TrainId, CAR_GAP};
use crate::units::{mph_to_fps, step_feet, Scale};
use self::accident::Accident;
use self::collision::{Contact, Encounter};
use self::occupancy::{extent, Occupancy, TickOccupancy};

/// How far controllers look for obstacles, feet.
pub const LOOKAHEAD: f64 = 2000.0;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EngineParams {
    /// Simulated time per tick, ms.
    pub tick_ms: f64,
    /// Highest closing speed at which touching trains couple, ft/s.
    pub grace_speed: f64,
    /// Gap at which two trains count as touching, feet.
    pub join_distance: f64,
    /// How far apart the two halves of a split train are set, feet.
    pub split_gap: f64,
}

impl Default for EngineParams {
    fn default() -> EngineParams {
        EngineParams {
            tick_ms: 200.0,
            grace_speed: 6.0,
            join_distance: 10.0,
            split_gap: 20.0,
        }
    }
}

/// Everything that happened during one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub tick: Tick,
    pub events: Vec<Event>,
}

#[derive(Debug, Fail)]
pub enum ToggleError {
    #[fail(display = "unknown segment {}", _0)]
    UnknownSegment(SegmentId),
    #[fail(display = "switch {} is occupied", _0)]
    Occupied(SegmentId),
    #[fail(display = "segment {} cannot be toggled", _0)]
    NotToggleable(SegmentId),
}

#[derive(Debug, Fail)]
pub enum CommandError {
    #[fail(display = "unknown train {}", _0)]
    UnknownTrain(TrainId),
    #[fail(display = "train {} cannot be split at car {}", _0, _1)]
    BadSplit(TrainId, usize),
    #[fail(display = "segment {} is not a portal", _0)]
    NotAPortal(SegmentId),
    #[fail(display = "staging track behind portal {} is occupied", _0)]
    PortalBusy(SegmentId),
}

/// Sub-lines of one car, front to back.
pub type CarLines = SmallVec<[SubLine; 4]>;

enum Step {
    Moved,
    Stopped,
}

#[derive(Debug)]
pub struct Simulation {
    pub layout: Layout,
    pub scale: Scale,
    pub params: EngineParams,
    pub history: History,
    pub(crate) trains: Vec<Train>,
    pub(crate) next_id: TrainId,
    pub(crate) ticks: Tick,
}

impl Simulation {
    pub fn new(layout: Layout, scale: Scale, params: EngineParams) -> Simulation {
        Simulation {
            layout,
            scale,
            params,
            history: History::default(),
            trains: Vec::new(),
            next_id: 1,
            ticks: 0,
        }
    }

    pub fn ticks(&self) -> Tick {
        self.ticks
    }

    pub fn trains(&self) -> &[Train] {
        &self.trains
    }

    pub fn train(&self, id: TrainId) -> Option<&Train> {
        self.trains.iter().find(|t| t.id == id)
    }

    pub fn train_mut(&mut self, id: TrainId) -> Option<&mut Train> {
        self.trains.iter_mut().find(|t| t.id == id)
    }

    fn index_of(&self, id: TrainId) -> Option<usize> {
        self.trains.iter().position(|t| t.id == id)
    }

    pub fn occupancy(&self) -> Occupancy {
        Occupancy::build(&self.layout, &self.scale, &self.trains)
    }

    /// Put a train on the layout with its front at `loc`.
    pub fn add_train(&mut self, cars: Vec<Car>, loc: Loc, controller: Box<dyn Controller>)
        -> TrainId {
        let id = self.next_id;
        self.next_id += 1;
        info!("train {} placed on segment {} with {} cars", id, loc.segment, cars.len());
        self.trains.push(Train::new(id, cars, loc, controller));
        id
    }

    pub fn remove_train(&mut self, id: TrainId) -> Option<Train> {
        let i = self.index_of(id)?;
        info!("train {} removed", id);
        self.history.push(self.ticks, Event::Removed { train: id });
        Some(self.trains.remove(i))
    }

    /// Take the trains named by `accident` off the layout.
    pub fn clear_accident(&mut self, accident: &Accident) -> Vec<Train> {
        accident.trains().iter().filter_map(|&id| self.remove_train(id)).collect()
    }

    /// Stage a new train behind `portal`, heading onto the map.
    pub fn spawn_at_portal(&mut self, portal: SegmentId, cars: Vec<Car>,
                           controller: Box<dyn Controller>) -> Result<TrainId, CommandError> {
        let staging = match self.layout.try_get(portal).map(|s| &s.kind) {
            Ok(&SegmentKind::Portal { staging }) => staging,
            _ => return Err(CommandError::NotAPortal(portal)),
        };
        if self.occupancy().is_occupied(staging) {
            warn!("portal {} is busy", portal);
            return Err(CommandError::PortalBusy(portal));
        }
        let fraction = (cars_length(&cars) / STAGING_LENGTH).min(1.0);
        let id = self.add_train(cars, Loc::new(staging, None, fraction), controller);
        self.history.push(self.ticks, Event::Spawned { train: id, portal });
        Ok(id)
    }

    /// Queue a control input; it takes effect at the top of the next tick.
    pub fn command(&mut self, id: TrainId, command: Command) -> Result<(), CommandError> {
        let train = match self.train_mut(id) {
            Some(t) => t,
            None => {
                warn!("command {:?} for unknown train {}", command, id);
                return Err(CommandError::UnknownTrain(id));
            }
        };
        if let Command::Split(at) = command {
            if at == 0 || at >= train.cars.len() {
                warn!("train {} has {} cars, cannot split at {}", id, train.cars.len(), at);
                return Err(CommandError::BadSplit(id, at));
            }
        }
        debug!("train {} requested {:?}", id, command);
        train.request(command);
        Ok(())
    }

    /// Operator click on a switch or signal.
    pub fn toggle(&mut self, seg: SegmentId) -> Result<Event, ToggleError> {
        let is_switch = match self.layout.try_get(seg).map(|s| &s.kind) {
            Err(_) => return Err(ToggleError::UnknownSegment(seg)),
            Ok(SegmentKind::Switch(_)) => true,
            Ok(SegmentKind::Signal(_)) => false,
            Ok(_) => return Err(ToggleError::NotToggleable(seg)),
        };
        let event = if is_switch {
            if self.occupancy().is_occupied(seg) {
                warn!("switch {} is occupied, not thrown", seg);
                return Err(ToggleError::Occupied(seg));
            }
            let state = self.layout.switch_mut(seg)
                .map(|sw| {
                    sw.toggle();
                    sw.state
                })
                .ok_or(ToggleError::NotToggleable(seg))?;
            Event::SwitchThrown { switch: seg, state, train: None }
        } else {
            let program = self.layout.program_mut(seg).ok_or(ToggleError::NotToggleable(seg))?;
            if !program.toggle() {
                return Err(ToggleError::NotToggleable(seg));
            }
            Event::SignalChanged { signal: seg, indication: program.status() }
        };
        info!("segment {} toggled: {:?}", seg, event);
        self.history.push(self.ticks, event.clone());
        Ok(event)
    }

    /// Geometry of each car of train `id`, front car first.
    pub fn car_lines(&self, id: TrainId) -> Option<Vec<CarLines>> {
        let t = self.train(id)?;
        let mut out = Vec::with_capacity(t.cars.len());
        let mut at = t.loc.reverse(&self.layout);
        for car in &t.cars {
            match at {
                Some(loc) => {
                    let adv = loc.advance(&self.layout, &self.scale, car.length);
                    out.push(adv.lines);
                    at = Some(adv.loc.advance(&self.layout, &self.scale, CAR_GAP).loc);
                }
                None => out.push(CarLines::new()),
            }
        }
        Some(out)
    }

    /// Feet from the front of train `id` to the next thing it must not run
    /// into: a stop signal, the end of the track, an occupied switch or
    /// another train.
    pub fn lookahead(&self, id: TrainId, limit: f64) -> Option<f64> {
        let t = self.train(id)?;
        self.obstacle(&self.occupancy(), t, limit)
    }

    fn obstacle(&self, occ: &Occupancy, t: &Train, limit: f64) -> Option<f64> {
        let on_track = self.track_obstacle(occ, t, limit);
        let train = collision::nearest(&self.layout, &self.scale, &self.trains, t, limit)
            .map(|(_, _, d)| d);
        match (on_track, train) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn track_obstacle(&self, occ: &Occupancy, t: &Train, limit: f64) -> Option<f64> {
        let mut cur = t.loc;
        let mut travelled = 0.0;
        let mut guard = 4 * self.layout.len() + 4;
        loop {
            let seg = self.layout.get(cur.segment);
            travelled += (1.0 - cur.fraction) * seg.length(&self.scale);
            if travelled > limit {
                return None;
            }
            let next = match seg.dest(cur.origin) {
                Some(n) => n,
                None => return match seg.kind {
                    SegmentKind::Staging { .. } => None,
                    _ => Some(travelled),
                },
            };
            let ahead = self.layout.get(next);
            if let SegmentKind::Signal(ref p) = ahead.kind {
                if ahead.links[0] == Some(cur.segment) && p.status() == Indication::Stop {
                    return Some(travelled);
                }
            }
            if ahead.singleton() && occ.trains(next).iter().any(|&o| o != t.id) {
                return Some(travelled);
            }
            cur = Loc::new(next, Some(cur.segment), 0.0);
            guard -= 1;
            if guard == 0 {
                return None;
            }
        }
    }

    /// Advance the simulation by one tick. An accident ends the tick early;
    /// the trains it names stay on the layout until
    /// [`clear_accident`](Simulation::clear_accident) is called.
    pub fn tick(&mut self) -> Result<TickReport, Accident> {
        self.ticks += 1;
        let mut report = TickReport { tick: self.ticks, events: Vec::new() };
        for t in &mut self.trains {
            t.apply_controls();
        }

        let before = self.occupancy();
        self.update_signals(&before, &mut report);
        let mut occ = TickOccupancy::new(before);
        if let Err(accident) = self.move_trains(&mut occ, &mut report) {
            warn!("tick {}: {}", self.ticks, accident);
            report.events.push(Event::Accident(accident.clone()));
            self.record(&report);
            return Err(accident);
        }

        self.load_and_unload(&mut report);
        self.drive_controllers();
        self.record(&report);
        Ok(report)
    }

    fn record(&mut self, report: &TickReport) {
        for e in &report.events {
            self.history.push(report.tick, e.clone());
        }
    }

    /// One pass over the trains in list order. Returns after the first
    /// change to the train list; the rest wait for the next tick.
    fn move_trains(&mut self, occ: &mut TickOccupancy, report: &mut TickReport)
        -> Result<(), Accident> {
        let tick_ms = self.params.tick_ms;
        for i in 0..self.trains.len() {
            if self.trains[i].requests.structural() {
                self.restructure(i, report);
                return Ok(());
            }
            if self.trains[i].idle() {
                continue;
            }
            if let Some(portal) = self.leaving(i) {
                let t = self.trains.remove(i);
                info!("train {} left the map at portal {}", t.id, portal);
                report.events.push(Event::Exited { train: t.id, portal });
                return Ok(());
            }
            if let Some(enc) = collision::scan(&self.layout, &self.scale, &self.trains, i,
                                               self.params.join_distance, tick_ms) {
                self.meet(i, enc, report)?;
                return Ok(());
            }

            self.advance_train(i, occ, report)?;
            let t = &mut self.trains[i];
            t.tick(tick_ms);
            occ.moved(t.id, &extent(&self.layout, &self.scale, &t.loc, t.length()));
        }
        Ok(())
    }

    /// Carry out a pending reverse or split of `trains[i]`.
    fn restructure(&mut self, i: usize, report: &mut TickReport) {
        let requests = self.trains[i].requests;
        let id = self.trains[i].id;
        if requests.reverse {
            let t = &mut self.trains[i];
            if coupling::reverse(&self.layout, &self.scale, t) {
                info!("train {} reversed", id);
                report.events.push(Event::Reversed { train: id });
            } else {
                t.requests.reverse = false;
                warn!("train {} cannot reverse here", id);
            }
        } else if let Some(at) = requests.split {
            let rear_id = self.next_id;
            let t = &mut self.trains[i];
            match coupling::split(&self.layout, &self.scale, t, at, rear_id,
                                  self.params.split_gap) {
                Some(rear) => {
                    self.next_id += 1;
                    self.trains.insert(i + 1, rear);
                    info!("train {} split at car {}, rear is train {}", id, at, rear_id);
                    report.events.push(Event::Split { train: id, rear: rear_id });
                }
                None => warn!("train {} cannot split at car {}", id, at),
            }
        }
    }

    /// The portal `trains[i]` has completely left the map through.
    fn leaving(&self, i: usize) -> Option<SegmentId> {
        let t = &self.trains[i];
        match self.layout.get(t.loc.segment).kind {
            SegmentKind::Staging { portal }
                if t.loc.origin == Some(portal)
                    && t.loc.offset(&self.layout, &self.scale) >= t.length() => Some(portal),
            _ => None,
        }
    }

    /// `trains[i]` touches another train: couple gently, crash otherwise.
    fn meet(&mut self, i: usize, enc: Encounter, report: &mut TickReport)
        -> Result<(), Accident> {
        let id = self.trains[i].id;
        let j = match self.index_of(enc.other) {
            Some(j) => j,
            None => panic!("collision with train {} which is not on the layout", enc.other),
        };
        let point = self.trains[i].loc.point(&self.layout);
        let crash = match enc.contact {
            Contact::HeadToHead => Accident::HeadOn(id, enc.other, point),
            Contact::HeadToTail => Accident::RearEnd(id, enc.other, point),
        };
        if enc.closing > self.params.grace_speed {
            return Err(crash);
        }
        let head = match coupling::join_head(&self.layout, &self.scale, &self.trains[i],
                                             &self.trains[j], enc.contact) {
            Some(h) => h,
            None => return Err(crash),
        };

        let (lo, hi) = if i < j { (i, j) } else { (j, i) };
        let second = self.trains.remove(hi);
        let first = self.trains.remove(lo);
        let (a, b) = if i < j { (first, second) } else { (second, first) };
        let joined = coupling::join(a, b, enc.contact, head);
        let kept = joined.id;
        let absorbed = if kept == id { enc.other } else { id };
        info!("train {} coupled with train {} ({:?})", kept, absorbed, enc.contact);
        report.events.push(Event::Joined { kept, absorbed });
        self.trains.insert(lo, joined);
        Ok(())
    }

    /// Move `trains[i]` along the track for one tick.
    fn advance_train(&mut self, i: usize, occ: &mut TickOccupancy, report: &mut TickReport)
        -> Result<(), Accident> {
        let mut guard = self.layout.len() + 1;
        while self.layout.get(self.trains[i].loc.segment).zero_length() {
            if let Step::Stopped = self.transition(i, occ, report)? {
                return Ok(());
            }
            guard -= 1;
            if guard == 0 {
                panic!("graph inconsistency: train {} circling zero-length segments",
                       self.trains[i].id);
            }
        }

        let len = self.layout.length(self.trains[i].loc.segment, &self.scale);
        let t = &mut self.trains[i];
        let df = if len > 0.0 { step_feet(t.velocity, self.params.tick_ms) / len } else { 1.0 };
        let f = t.loc.fraction + df;
        t.loc.fraction = if f >= 1.0 || 1.0 - f < 0.5 * df { 1.0 } else { f };
        debug!("train {} at {:?}, {:.2} mph", t.id, t.loc, t.velocity);

        if t.loc.fraction >= 1.0 {
            self.transition(i, occ, report)?;
        }
        Ok(())
    }

    /// Take `trains[i]` from the far end of its segment onto the next one.
    fn transition(&mut self, i: usize, occ: &mut TickOccupancy, report: &mut TickReport)
        -> Result<Step, Accident> {
        let loc = self.trains[i].loc;
        let id = self.trains[i].id;
        match self.layout.dest(loc.segment, loc.origin) {
            Some(next) => {
                if self.layout.get(next).singleton() {
                    if let Some(other) = occ.other(next, id) {
                        let len = self.layout.length(loc.segment, &self.scale);
                        if len > 0.0 {
                            let hold = 1.0 - self.scale.to_feet(1.0) / len;
                            self.trains[i].loc.fraction = hold.max(0.0);
                        }
                        let point = self.layout.get(next).point(Some(loc.segment), 0.0);
                        return Err(Accident::SideOn(id, other, point));
                    }
                }
                self.enter(next, loc.segment, id, report);
                self.trains[i].loc = Loc::new(next, Some(loc.segment), 0.0);
                occ.claim(id, next);
                Ok(Step::Moved)
            }
            None => {
                let point = loc.point(&self.layout);
                let t = &mut self.trains[i];
                if mph_to_fps(t.velocity) > self.params.grace_speed {
                    return Err(Accident::Overrun(id, point));
                }
                t.velocity = 0.0;
                t.throttle = 0;
                t.loc.fraction = 1.0;
                info!("train {} stopped at the end of segment {}", id, loc.segment);
                report.events.push(Event::Stopped { train: id, segment: loc.segment });
                Ok(Step::Stopped)
            }
        }
    }

    /// Side effects of `train` arriving on `seg` from `from`.
    fn enter(&mut self, seg: SegmentId, from: SegmentId, train: TrainId,
             report: &mut TickReport) {
        let slot = match self.layout.get(seg).slot_of(Some(from)) {
            Some(s) => s,
            None => panic!("graph inconsistency: {} entered from unlinked {}", seg, from),
        };
        if let Some(sw) = self.layout.switch_mut(seg) {
            if sw.enter(slot) {
                let state = sw.state;
                info!("train {} threw switch {} to {:?}", train, seg, state);
                report.events.push(Event::SwitchThrown { switch: seg, state, train: Some(train) });
            }
        } else if slot == 0 {
            if let Some(p) = self.layout.program_mut(seg) {
                let was = p.status();
                p.enter(train);
                let now = p.status();
                if now != was {
                    debug!("signal {} shows {} behind train {}", seg, now, train);
                    report.events.push(Event::SignalChanged { signal: seg, indication: now });
                }
            }
        }
    }

    fn update_signals(&mut self, occ: &Occupancy, report: &mut TickReport) {
        for sig in self.layout.signals() {
            let block = self.block_state(sig, occ);
            if let Some(p) = self.layout.program_mut(sig) {
                let was = p.status();
                p.update(&block);
                let now = p.status();
                if now != was {
                    debug!("signal {} shows {}", sig, now);
                    report.events.push(Event::SignalChanged { signal: sig, indication: now });
                }
            }
        }
    }

    /// The block from `sig` to the next signal facing the same way, or to
    /// the end of the track.
    fn block_state(&self, sig: SegmentId, occ: &Occupancy) -> BlockState {
        let mut state = BlockState { occupied: occ.is_occupied(sig), next: None };
        let mut cur = Loc::new(sig, self.layout.get(sig).links[0], 0.0);
        let mut guard = self.layout.len();
        while let Some(next) = self.layout.dest(cur.segment, cur.origin) {
            let seg = self.layout.get(next);
            if let SegmentKind::Signal(ref p) = seg.kind {
                if seg.links[0] == Some(cur.segment) {
                    state.next = Some(p.status());
                    break;
                }
            }
            state.occupied |= occ.is_occupied(next);
            cur = Loc::new(next, Some(cur.segment), 0.0);
            guard -= 1;
            if guard == 0 {
                break;
            }
        }
        state
    }

    /// Freight cars of trains standing on load tracks.
    fn load_and_unload(&mut self, report: &mut TickReport) {
        for t in &mut self.trains {
            if t.velocity > 0.0 {
                continue;
            }
            let unload = match self.layout.get(t.loc.segment).kind {
                SegmentKind::Load { unload } => unload,
                _ => continue,
            };
            let mut changed = 0;
            for car in t.cars.iter_mut().filter(|c| c.loadable() && c.loaded == unload) {
                car.loaded = !unload;
                changed += 1;
            }
            if changed > 0 {
                info!("train {} {} {} cars", t.id, if unload { "unloaded" } else { "loaded" },
                      changed);
                report.events.push(Event::Loaded { train: t.id, cars: changed, unload });
            }
        }
    }

    /// Let every controller look at its train; what they ask for is applied
    /// next tick.
    fn drive_controllers(&mut self) {
        let occ = self.occupancy();
        let outlooks: Vec<Outlook> = self.trains.iter()
            .map(|t| Outlook {
                velocity: t.velocity,
                throttle: t.throttle,
                brake: t.brake,
                stopping_distance: t.feet_to_slow(0.0),
                obstacle: self.obstacle(&occ, t, LOOKAHEAD),
            })
            .collect();
        for (t, o) in self.trains.iter_mut().zip(outlooks) {
            for cmd in t.controller.drive(&o) {
                t.request(cmd);
            }
        }
    }
}
