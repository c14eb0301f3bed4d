use std::str::FromStr;

use regex::{Captures, Regex};

use crate::geometry::Point;
use crate::train::CarKind;

type Name = String;

/// Two-point segment kinds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Straight {
    Track,
    Hidden,
    Crossing,
    Load,
    Unload,
    Portal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SegmentSpec {
    Straight(Straight, Point, Point),
    Curve(Point, Point, Point),
    Switch(Point),
    FourWay(Point),
    /// Position and program name.
    Signal(Point, String),
    Label(Point, String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainSpec {
    pub cars: Vec<CarKind>,
    /// mph.
    pub velocity: f64,
    pub throttle: u8,
    /// Controller description, see `controller_by_name`.
    pub controller: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioAction {
    Scale(f64),
    Segment(Name, SegmentSpec),
    /// `a.slot` to `b.slot`.
    Link(Name, usize, Name, usize),
    /// Train name, front segment, origin (`None` at an open end), fraction.
    Train(Name, Name, Option<Name>, f64, TrainSpec),
    /// Train name, portal.
    Spawn(Name, Name, TrainSpec),
    Throttle(Name, u8),
    Brake(Name, bool),
    Reverse(Name),
    Split(Name, usize),
    Toggle(Name),
    Run(u64),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scenario {
    pub actions: Vec<ScenarioAction>,
}

#[derive(Debug, Fail)]
pub enum ParseError {
    #[fail(display = "error in regular expression: {}", _0)]
    RegexError(String),
    #[fail(display = "line {}: error converting number", _0)]
    NumberError(usize),
    #[fail(display = "line {}: unknown car kind \"{}\"", _0, _1)]
    UnknownCar(usize, String),
    #[fail(display = "line {}: unknown train option \"{}\"", _0, _1)]
    BadOption(usize, String),
    #[fail(display = "line {}: unrecognized command: {}", _0, _1)]
    Unrecognized(usize, String),
}

fn re(s: &str) -> Result<Regex, ParseError> {
    Regex::new(s).map_err(|e| ParseError::RegexError(format!("{:?}", e)))
}

fn num<T: FromStr>(s: &str, line: usize) -> Result<T, ParseError> {
    s.parse::<T>().map_err(|_e| ParseError::NumberError(line))
}

fn train_spec(groups: &Captures, line: usize) -> Result<TrainSpec, ParseError> {
    let mut spec = TrainSpec {
        cars: Vec::new(),
        velocity: 0.0,
        throttle: 0,
        controller: "manual".to_string(),
    };
    for car in groups["cars"].split(',') {
        let kind = CarKind::from_name(car)
            .ok_or_else(|| ParseError::UnknownCar(line, car.to_string()))?;
        spec.cars.push(kind);
    }
    for opt in groups["opts"].split_whitespace() {
        let mut kv = opt.splitn(2, '=');
        match (kv.next(), kv.next()) {
            (Some("v"), Some(v)) => spec.velocity = num(v, line)?,
            (Some("throttle"), Some(v)) => spec.throttle = num(v, line)?,
            (Some("auto"), Some(v)) => {
                let cruise: u8 = num(v, line)?;
                spec.controller = format!("autopilot {}", cruise);
            }
            _ => return Err(ParseError::BadOption(line, opt.to_string())),
        }
    }
    Ok(spec)
}

/// Parses scenario scripts, one command per line, `#` starts a comment:
///
/// * scale 2.0
/// * track a 0 0 100 0  (also hidden, crossing, load, unload, portal)
/// * curve c 100 0 150 0 150 50
/// * switch s1 100 0  (also fourway)
/// * signal g1 100 0 block
/// * label l1 10 10 Upper yard
/// * link a.1 s1.0
/// * train t1 a - 0.5 engine,boxcar v=10 throttle=4 auto=5
/// * spawn t2 p1 engine,tanker
/// * throttle t1 6 / brake t1 on / reverse t1 / split t1 2 / toggle s1
/// * run 100
pub fn parse_scenario(input: &str) -> Result<Scenario, ParseError> {
    let mut actions = Vec::new();
    let num_re = r"-?[\d\.]+";
    let skip_re = re(r"^\s*(#.*)?$")?;
    let scale_re = re(r"^\s*scale\s+(?P<v>[\d\.]+)\s*$")?;
    let shape_re = re(r"(?x) ^ \s*
            (?P<kind>track|hidden|crossing|load|unload|portal|curve|switch|fourway) \s+
            (?P<name>\w+)
            (?P<nums>(?:\s+-?[\d\.]+)+) \s* $")?;
    let signal_re = re(&format!(
        r"^\s*signal\s+(?P<name>\w+)\s+(?P<x>{n})\s+(?P<y>{n})(?:\s+(?P<prog>\w+))?\s*$",
        n = num_re))?;
    let label_re = re(&format!(
        r"^\s*label\s+(?P<name>\w+)\s+(?P<x>{n})\s+(?P<y>{n})\s+(?P<text>.*?)\s*$",
        n = num_re))?;
    let link_re = re(r"^\s*link\s+(?P<a>\w+)\.(?P<sa>\d+)\s+(?P<b>\w+)\.(?P<sb>\d+)\s*$")?;
    let train_re = re(r"(?x) ^ \s* train \s+ (?P<name>\w+) \s+
            (?P<seg>\w+) \s+ (?P<origin>\w+|-) \s+ (?P<frac>[\d\.]+) \s+
            (?P<cars>[\w,]+)
            (?P<opts>(?:\s+\w+=[\d\.]+)*) \s* $")?;
    let spawn_re = re(r"(?x) ^ \s* spawn \s+ (?P<name>\w+) \s+ (?P<portal>\w+) \s+
            (?P<cars>[\w,]+)
            (?P<opts>(?:\s+\w+=[\d\.]+)*) \s* $")?;
    let throttle_re = re(r"^\s*throttle\s+(?P<name>\w+)\s+(?P<v>\d+)\s*$")?;
    let brake_re = re(r"^\s*brake\s+(?P<name>\w+)\s+(?P<v>on|off)\s*$")?;
    let reverse_re = re(r"^\s*reverse\s+(?P<name>\w+)\s*$")?;
    let split_re = re(r"^\s*split\s+(?P<name>\w+)\s+(?P<at>\d+)\s*$")?;
    let toggle_re = re(r"^\s*toggle\s+(?P<name>\w+)\s*$")?;
    let run_re = re(r"^\s*run\s+(?P<n>\d+)\s*$")?;

    for (i, line) in input.lines().enumerate() {
        let n = i + 1;
        if skip_re.is_match(line) {
            continue;
        }
        if let Some(g) = scale_re.captures(line) {
            actions.push(ScenarioAction::Scale(num(&g["v"], n)?));
            continue;
        }
        if let Some(g) = shape_re.captures(line) {
            let nums = g["nums"].split_whitespace()
                .map(|x| num::<f64>(x, n))
                .collect::<Result<Vec<_>, _>>()?;
            let pt = |k: usize| Point::new(nums[2 * k], nums[2 * k + 1]);
            let spec = match (&g["kind"], nums.len()) {
                ("curve", 6) => SegmentSpec::Curve(pt(0), pt(1), pt(2)),
                ("switch", 2) => SegmentSpec::Switch(pt(0)),
                ("fourway", 2) => SegmentSpec::FourWay(pt(0)),
                (kind, 4) => {
                    let straight = match kind {
                        "track" => Straight::Track,
                        "hidden" => Straight::Hidden,
                        "crossing" => Straight::Crossing,
                        "load" => Straight::Load,
                        "unload" => Straight::Unload,
                        "portal" => Straight::Portal,
                        _ => return Err(ParseError::Unrecognized(n, line.to_string())),
                    };
                    SegmentSpec::Straight(straight, pt(0), pt(1))
                }
                _ => return Err(ParseError::Unrecognized(n, line.to_string())),
            };
            actions.push(ScenarioAction::Segment(g["name"].to_string(), spec));
            continue;
        }
        if let Some(g) = signal_re.captures(line) {
            let at = Point::new(num(&g["x"], n)?, num(&g["y"], n)?);
            let prog = g.name("prog").map(|m| m.as_str()).unwrap_or("manual");
            actions.push(ScenarioAction::Segment(g["name"].to_string(),
                                                 SegmentSpec::Signal(at, prog.to_string())));
            continue;
        }
        if let Some(g) = label_re.captures(line) {
            let at = Point::new(num(&g["x"], n)?, num(&g["y"], n)?);
            actions.push(ScenarioAction::Segment(g["name"].to_string(),
                                                 SegmentSpec::Label(at, g["text"].to_string())));
            continue;
        }
        if let Some(g) = link_re.captures(line) {
            actions.push(ScenarioAction::Link(g["a"].to_string(), num(&g["sa"], n)?,
                                              g["b"].to_string(), num(&g["sb"], n)?));
            continue;
        }
        if let Some(g) = train_re.captures(line) {
            let origin = match &g["origin"] {
                "-" => None,
                o => Some(o.to_string()),
            };
            actions.push(ScenarioAction::Train(g["name"].to_string(), g["seg"].to_string(),
                                               origin, num(&g["frac"], n)?,
                                               train_spec(&g, n)?));
            continue;
        }
        if let Some(g) = spawn_re.captures(line) {
            actions.push(ScenarioAction::Spawn(g["name"].to_string(), g["portal"].to_string(),
                                               train_spec(&g, n)?));
            continue;
        }
        if let Some(g) = throttle_re.captures(line) {
            actions.push(ScenarioAction::Throttle(g["name"].to_string(), num(&g["v"], n)?));
            continue;
        }
        if let Some(g) = brake_re.captures(line) {
            actions.push(ScenarioAction::Brake(g["name"].to_string(), &g["v"] == "on"));
            continue;
        }
        if let Some(g) = reverse_re.captures(line) {
            actions.push(ScenarioAction::Reverse(g["name"].to_string()));
            continue;
        }
        if let Some(g) = split_re.captures(line) {
            actions.push(ScenarioAction::Split(g["name"].to_string(), num(&g["at"], n)?));
            continue;
        }
        if let Some(g) = toggle_re.captures(line) {
            actions.push(ScenarioAction::Toggle(g["name"].to_string()));
            continue;
        }
        if let Some(g) = run_re.captures(line) {
            actions.push(ScenarioAction::Run(num(&g["n"], n)?));
            continue;
        }
        return Err(ParseError::Unrecognized(n, line.to_string()));
    }

    Ok(Scenario { actions })
}
