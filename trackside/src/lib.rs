extern crate smallvec;
extern crate ordered_float;
extern crate regex;
extern crate failure;
#[macro_use] extern crate failure_derive;

pub mod units;
pub mod geometry;
pub mod layout;
pub mod position;
pub mod train;
pub mod engine;
pub mod output;
pub mod persist;
pub mod input;

use std::collections::HashMap;
use std::path::Path;

use log::{info, warn};

use engine::accident::Accident;
use engine::{EngineParams, Simulation};
use input::scenario::{Scenario, ScenarioAction, SegmentSpec, Straight, TrainSpec};
use layout::signal::program_by_name;
use layout::{Layout, SegmentId};
use output::history::Tick;
use position::Loc;
use train::controller::{controller_by_name, Command, Controller};
use train::{Car, TrainId};
use units::Scale;

pub type AppResult<T> = Result<T, failure::Error>;

pub fn read_file(f: &Path) -> AppResult<String> {
    use std::fs::File;
    use std::io::prelude::*;
    use std::io::BufReader;

    let file = File::open(f)?;
    let mut file = BufReader::new(&file);
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(contents)
}

pub fn get_scenario(f: &Path) -> AppResult<Scenario> {
    let contents = read_file(f)?;
    let s = input::scenario::parse_scenario(&contents)?;
    Ok(s)
}

#[derive(Debug, Fail)]
pub enum ScenarioError {
    #[fail(display = "unknown segment \"{}\"", _0)]
    UnknownSegment(String),
    #[fail(display = "unknown train \"{}\"", _0)]
    UnknownTrain(String),
    #[fail(display = "name \"{}\" used twice", _0)]
    DuplicateName(String),
    #[fail(display = "unknown signal program \"{}\"", _0)]
    UnknownProgram(String),
    #[fail(display = "unknown controller \"{}\"", _0)]
    UnknownController(String),
    #[fail(display = "train \"{}\" does not come from a segment linked to its own", _0)]
    BadOrigin(String),
    #[fail(display = "scale must be given before any segment")]
    LateScale,
    #[fail(display = "scale must be positive, got {}", _0)]
    BadScale(f64),
}

fn scale(feet_per_pixel: f64) -> AppResult<Scale> {
    if feet_per_pixel > 0.0 && feet_per_pixel.is_finite() {
        Ok(Scale::new(feet_per_pixel))
    } else {
        Err(ScenarioError::BadScale(feet_per_pixel).into())
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct RunOptions {
    pub params: EngineParams,
    /// Used when the script does not set a scale.
    pub scale: Option<f64>,
    /// Stop at the first accident instead of clearing it and going on.
    pub halt: bool,
    /// Never run more than this many ticks in total.
    pub max_ticks: Option<Tick>,
}

/// A finished scenario run.
#[derive(Debug)]
pub struct Outcome {
    pub sim: Simulation,
    pub accidents: Vec<(Tick, Accident)>,
    pub segments: HashMap<String, SegmentId>,
    pub trains: HashMap<String, TrainId>,
    /// Set when the run stopped at an accident.
    pub halted: bool,
}

struct Runner {
    opts: RunOptions,
    sim: Simulation,
    segments: HashMap<String, SegmentId>,
    trains: HashMap<String, TrainId>,
    accidents: Vec<(Tick, Accident)>,
    halted: bool,
}

impl Runner {
    fn segment(&self, name: &str) -> AppResult<SegmentId> {
        self.segments.get(name).cloned()
            .ok_or_else(|| ScenarioError::UnknownSegment(name.to_string()).into())
    }

    fn train(&self, name: &str) -> AppResult<TrainId> {
        self.trains.get(name).cloned()
            .ok_or_else(|| ScenarioError::UnknownTrain(name.to_string()).into())
    }

    fn name_train(&mut self, name: &str, id: TrainId) -> AppResult<()> {
        if self.trains.insert(name.to_string(), id).is_some() {
            return Err(ScenarioError::DuplicateName(name.to_string()).into());
        }
        Ok(())
    }

    fn controller(spec: &TrainSpec) -> AppResult<Box<dyn Controller>> {
        controller_by_name(&spec.controller)
            .ok_or_else(|| ScenarioError::UnknownController(spec.controller.clone()).into())
    }

    fn add_segment(&mut self, name: &str, spec: &SegmentSpec) -> AppResult<()> {
        if self.segments.contains_key(name) {
            return Err(ScenarioError::DuplicateName(name.to_string()).into());
        }
        let layout = &mut self.sim.layout;
        let id = match *spec {
            SegmentSpec::Straight(kind, a, b) => match kind {
                Straight::Track => layout.add_track(a, b),
                Straight::Hidden => layout.add_hidden(a, b),
                Straight::Crossing => layout.add_crossing(a, b),
                Straight::Load => layout.add_load(a, b, false),
                Straight::Unload => layout.add_load(a, b, true),
                Straight::Portal => layout.add_portal(a, b),
            },
            SegmentSpec::Curve(a, ctrl, b) => layout.add_curve(a, ctrl, b),
            SegmentSpec::Switch(at) => layout.add_switch(at),
            SegmentSpec::FourWay(at) => layout.add_four_way(at),
            SegmentSpec::Signal(at, ref prog) => {
                let program = program_by_name(prog)
                    .ok_or_else(|| ScenarioError::UnknownProgram(prog.clone()))?;
                layout.add_signal(at, program)
            }
            SegmentSpec::Label(at, ref text) => layout.add_label(at, text),
        };
        self.segments.insert(name.to_string(), id);
        Ok(())
    }

    /// The graph must be reciprocal and every train must come from a
    /// neighbour of its segment before anything moves.
    fn check_ready(&self) -> AppResult<()> {
        self.sim.layout.check()?;
        for t in self.sim.trains() {
            if self.sim.layout.get(t.loc.segment).slot_of(t.loc.origin).is_none() {
                let name = self.trains.iter()
                    .find(|&(_, id)| *id == t.id)
                    .map(|(name, _)| name.clone())
                    .unwrap_or_else(|| t.id.to_string());
                return Err(ScenarioError::BadOrigin(name).into());
            }
        }
        Ok(())
    }

    fn run_ticks(&mut self, n: Tick) {
        for _ in 0..n {
            if let Some(max) = self.opts.max_ticks {
                if self.sim.ticks() >= max {
                    return;
                }
            }
            if let Err(accident) = self.sim.tick() {
                let tick = self.sim.ticks();
                self.accidents.push((tick, accident.clone()));
                if self.opts.halt {
                    self.halted = true;
                    return;
                }
                self.sim.clear_accident(&accident);
            }
        }
    }

    fn act(&mut self, action: &ScenarioAction) -> AppResult<()> {
        use input::scenario::ScenarioAction::*;
        match *action {
            Scale(fpp) => {
                if !self.sim.layout.is_empty() {
                    return Err(ScenarioError::LateScale.into());
                }
                self.sim.scale = scale(fpp)?;
            }
            Segment(ref name, ref spec) => self.add_segment(name, spec)?,
            Link(ref a, sa, ref b, sb) => {
                let (a, b) = (self.segment(a)?, self.segment(b)?);
                self.sim.layout.connect(a, sa, b, sb)?;
            }
            Train(ref name, ref seg, ref origin, fraction, ref spec) => {
                let seg = self.segment(seg)?;
                let origin = match *origin {
                    Some(ref o) => Some(self.segment(o)?),
                    None => None,
                };
                let cars = spec.cars.iter().map(|k| Car::new(*k)).collect();
                let id = self.sim.add_train(cars, Loc::new(seg, origin, fraction),
                                            Runner::controller(spec)?);
                if let Some(t) = self.sim.train_mut(id) {
                    t.velocity = spec.velocity;
                    t.throttle = spec.throttle;
                }
                self.name_train(name, id)?;
            }
            Spawn(ref name, ref portal, ref spec) => {
                let portal = self.segment(portal)?;
                let cars = spec.cars.iter().map(|k| Car::new(*k)).collect();
                let id = self.sim.spawn_at_portal(portal, cars, Runner::controller(spec)?)?;
                if let Some(t) = self.sim.train_mut(id) {
                    t.velocity = spec.velocity;
                    t.throttle = spec.throttle;
                }
                self.name_train(name, id)?;
            }
            Throttle(ref name, v) => {
                let id = self.train(name)?;
                self.sim.command(id, Command::Throttle(v))?;
            }
            Brake(ref name, on) => {
                let id = self.train(name)?;
                self.sim.command(id, Command::Brake(on))?;
            }
            Reverse(ref name) => {
                let id = self.train(name)?;
                self.sim.command(id, Command::Reverse)?;
            }
            Split(ref name, at) => {
                let id = self.train(name)?;
                self.sim.command(id, Command::Split(at))?;
            }
            Toggle(ref name) => {
                let seg = self.segment(name)?;
                if let Err(e) = self.sim.toggle(seg) {
                    warn!("toggle {} ignored: {}", name, e);
                }
            }
            Run(n) => {
                self.check_ready()?;
                self.run_ticks(n);
            }
        }
        Ok(())
    }
}

/// Build the layout and play the script. Accidents are recorded, their
/// trains taken off, and the run goes on unless `opts.halt` is set.
pub fn run_scenario(scenario: &Scenario, opts: RunOptions) -> AppResult<Outcome> {
    let scale = match opts.scale {
        Some(fpp) => scale(fpp)?,
        None => Scale::default(),
    };
    let mut runner = Runner {
        opts,
        sim: Simulation::new(Layout::new(), scale, opts.params),
        segments: HashMap::new(),
        trains: HashMap::new(),
        accidents: Vec::new(),
        halted: false,
    };
    for action in &scenario.actions {
        runner.act(action)?;
        if runner.halted {
            break;
        }
    }
    runner.check_ready()?;
    info!("scenario finished after {} ticks, {} accidents",
          runner.sim.ticks(), runner.accidents.len());
    Ok(Outcome {
        sim: runner.sim,
        accidents: runner.accidents,
        segments: runner.segments,
        trains: runner.trains,
        halted: runner.halted,
    })
}
