//! Trains: cars, controls and kinematics.

pub mod controller;

use std::fmt;

use crate::position::Loc;
use crate::units::step_feet;
use self::controller::{Command, Controller};

pub type TrainId = usize;

/// Top speed of any train, mph.
pub const MAX_SPEED: f64 = 75.0;
pub const MAX_THROTTLE: u8 = 8;
/// Space between coupled cars, feet.
pub const CAR_GAP: f64 = 5.0;
/// Rolling resistance, mph per second.
pub const FRICTION: f64 = 0.05;
/// Time step used when predicting stopping distances, ms.
const PREDICT_TICK_MS: f64 = 100.0;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CarKind {
    Engine,
    Boxcar,
    Tanker,
    Passenger,
    Caboose,
}

impl CarKind {
    pub fn name(&self) -> &'static str {
        match *self {
            CarKind::Engine => "engine",
            CarKind::Boxcar => "boxcar",
            CarKind::Tanker => "tanker",
            CarKind::Passenger => "passenger",
            CarKind::Caboose => "caboose",
        }
    }

    pub fn from_name(name: &str) -> Option<CarKind> {
        match name {
            "engine" => Some(CarKind::Engine),
            "boxcar" => Some(CarKind::Boxcar),
            "tanker" => Some(CarKind::Tanker),
            "passenger" => Some(CarKind::Passenger),
            "caboose" => Some(CarKind::Caboose),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Car {
    pub kind: CarKind,
    /// Feet.
    pub length: f64,
    /// Empty weight.
    pub tare: f64,
    /// Extra weight when loaded; zero for cars that carry nothing.
    pub capacity: f64,
    pub loaded: bool,
}

impl Car {
    pub fn new(kind: CarKind) -> Car {
        let (length, tare, capacity) = match kind {
            CarKind::Engine => (60.0, 1200.0, 0.0),
            CarKind::Boxcar => (40.0, 300.0, 600.0),
            CarKind::Tanker => (35.0, 250.0, 700.0),
            CarKind::Passenger => (70.0, 500.0, 0.0),
            CarKind::Caboose => (30.0, 200.0, 0.0),
        };
        Car { kind, length, tare, capacity, loaded: false }
    }

    pub fn with_length(mut self, length: f64) -> Car {
        self.length = length;
        self
    }

    pub fn weight(&self) -> f64 {
        if self.loaded { self.tare + self.capacity } else { self.tare }
    }

    pub fn powered(&self) -> bool {
        self.kind == CarKind::Engine
    }

    pub fn loadable(&self) -> bool {
        self.capacity > 0.0
    }
}

/// Length of a string of cars, couplings included.
pub fn cars_length(cars: &[Car]) -> f64 {
    let n = cars.len();
    if n == 0 {
        return 0.0;
    }
    cars.iter().map(|c| c.length).sum::<f64>() + (n - 1) as f64 * CAR_GAP
}

/// The part of a train the physics looks at.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Kinematics {
    pub velocity: f64,
    pub throttle: u8,
    pub brake: bool,
    pub engines: usize,
    pub weight: f64,
}

impl Kinematics {
    /// mph per second.
    pub fn acceleration(&self) -> f64 {
        let throttle = self.throttle as f64;
        let target = throttle / MAX_THROTTLE as f64 * MAX_SPEED;
        let mut force = 0.0;
        if self.velocity <= target {
            force += throttle / 2.0 * self.engines as f64;
        }
        if self.brake {
            // Uses the current throttle, so an open throttle softens the brake.
            force += -2.0 + throttle.sqrt();
        }
        force / (self.weight.max(1.0) / 1000.0) - FRICTION
    }

    pub fn step(&mut self, tick_ms: f64) {
        if self.engines == 0 {
            self.throttle = 0;
        }
        let v = self.velocity + self.acceleration() * tick_ms / 1000.0;
        self.velocity = v.max(0.0).min(MAX_SPEED);
    }

    /// Feet covered while braking (throttle closed) down to `target` mph.
    pub fn feet_to_slow(&self, target: f64) -> f64 {
        let mut k = Kinematics { throttle: 0, brake: true, ..*self };
        let mut feet = 0.0;
        while k.velocity > target {
            feet += step_feet(k.velocity, PREDICT_TICK_MS);
            k.step(PREDICT_TICK_MS);
        }
        feet
    }
}

/// Controls that take effect at the top of the next tick.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Requests {
    pub throttle: Option<u8>,
    pub brake: Option<bool>,
    pub reverse: bool,
    pub split: Option<usize>,
}

impl Requests {
    pub fn structural(&self) -> bool {
        self.reverse || self.split.is_some()
    }
}

pub struct Train {
    pub id: TrainId,
    /// Front to back.
    pub cars: Vec<Car>,
    /// mph, never negative.
    pub velocity: f64,
    pub throttle: u8,
    pub brake: bool,
    /// Position of the front of the first car.
    pub loc: Loc,
    pub controller: Box<dyn Controller>,
    pub requests: Requests,
}

impl fmt::Debug for Train {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f,
               "Train {{ id: {}, cars: {}, velocity: {:.2}, throttle: {}, brake: {}, loc: {:?}, controller: {} }}",
               self.id,
               self.cars.len(),
               self.velocity,
               self.throttle,
               self.brake,
               self.loc,
               self.controller.describe())
    }
}

impl Train {
    pub fn new(id: TrainId, cars: Vec<Car>, loc: Loc, controller: Box<dyn Controller>) -> Train {
        Train {
            id,
            cars,
            velocity: 0.0,
            throttle: 0,
            brake: false,
            loc,
            controller,
            requests: Requests::default(),
        }
    }

    pub fn weight(&self) -> f64 {
        self.cars.iter().map(|c| c.weight()).sum()
    }

    pub fn length(&self) -> f64 {
        cars_length(&self.cars)
    }

    pub fn engines(&self) -> usize {
        self.cars.iter().filter(|c| c.powered()).count()
    }

    pub fn idle(&self) -> bool {
        self.velocity <= 0.0 && self.throttle == 0
    }

    pub fn kinematics(&self) -> Kinematics {
        Kinematics {
            velocity: self.velocity,
            throttle: self.throttle,
            brake: self.brake,
            engines: self.engines(),
            weight: self.weight(),
        }
    }

    /// Apply one tick of throttle, brake and friction.
    pub fn tick(&mut self, tick_ms: f64) {
        let mut k = self.kinematics();
        k.step(tick_ms);
        self.velocity = k.velocity;
        self.throttle = k.throttle;
    }

    pub fn feet_to_slow(&self, target: f64) -> f64 {
        self.kinematics().feet_to_slow(target)
    }

    /// Queue a control input for the next tick.
    pub fn request(&mut self, command: Command) {
        match command {
            Command::Throttle(t) => self.requests.throttle = Some(t.min(MAX_THROTTLE)),
            Command::Brake(b) => self.requests.brake = Some(b),
            Command::Reverse => self.requests.reverse = true,
            Command::Split(at) => self.requests.split = Some(at),
        }
    }

    /// Take queued throttle and brake settings.
    pub fn apply_controls(&mut self) {
        if let Some(t) = self.requests.throttle.take() {
            self.throttle = t;
        }
        if let Some(b) = self.requests.brake.take() {
            self.brake = b;
        }
    }
}
