use std::fmt::Write;

use crate::engine::accident::Accident;
use crate::layout::signal::Indication;
use crate::layout::switch::SwitchState;
use crate::layout::SegmentId;
use crate::train::TrainId;

pub type Tick = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// `train` is `None` for operator toggles.
    SwitchThrown { switch: SegmentId, state: SwitchState, train: Option<TrainId> },
    SignalChanged { signal: SegmentId, indication: Indication },
    /// Came to rest at an open end.
    Stopped { train: TrainId, segment: SegmentId },
    Reversed { train: TrainId },
    Split { train: TrainId, rear: TrainId },
    Joined { kept: TrainId, absorbed: TrainId },
    Spawned { train: TrainId, portal: SegmentId },
    Exited { train: TrainId, portal: SegmentId },
    Loaded { train: TrainId, cars: usize, unload: bool },
    Accident(Accident),
    Removed { train: TrainId },
}

impl Event {
    /// Trains the event is about.
    pub fn involves(&self, id: TrainId) -> bool {
        use self::Event::*;
        match *self {
            SwitchThrown { train, .. } => train == Some(id),
            SignalChanged { .. } => false,
            Stopped { train, .. } | Reversed { train } | Spawned { train, .. } |
            Exited { train, .. } | Loaded { train, .. } | Removed { train } => train == id,
            Split { train, rear } => train == id || rear == id,
            Joined { kept, absorbed } => kept == id || absorbed == id,
            Event::Accident(ref a) => a.trains().contains(&id),
        }
    }
}

#[derive(Debug, Default)]
pub struct History {
    pub events: Vec<(Tick, Event)>,
}

impl History {
    pub fn push(&mut self, tick: Tick, event: Event) {
        self.events.push((tick, event));
    }

    pub fn accidents(&self) -> impl Iterator<Item = &Accident> {
        self.events.iter().filter_map(|(_, e)| match *e {
            Event::Accident(ref a) => Some(a),
            _ => None,
        })
    }

    pub fn for_train(&self, id: TrainId) -> impl Iterator<Item = &(Tick, Event)> {
        self.events.iter().filter(move |(_, e)| e.involves(id))
    }
}

/// One event per line: `tick description`.
pub fn log_lines(h: &History) -> Result<String, failure::Error> {
    let mut s = String::new();
    for (tick, ev) in &h.events {
        use self::Event::*;
        write!(s, "{} ", tick)?;
        match *ev {
            SwitchThrown { switch, state, train: Some(t) } =>
                writeln!(s, "switch {} thrown {:?} by train {}", switch, state, t)?,
            SwitchThrown { switch, state, train: None } =>
                writeln!(s, "switch {} thrown {:?}", switch, state)?,
            SignalChanged { signal, indication } =>
                writeln!(s, "signal {} shows {}", signal, indication)?,
            Stopped { train, segment } =>
                writeln!(s, "train {} stopped at the end of segment {}", train, segment)?,
            Reversed { train } => writeln!(s, "train {} reversed", train)?,
            Split { train, rear } => writeln!(s, "train {} split off train {}", train, rear)?,
            Joined { kept, absorbed } =>
                writeln!(s, "train {} coupled with train {}", kept, absorbed)?,
            Spawned { train, portal } =>
                writeln!(s, "train {} entered at portal {}", train, portal)?,
            Exited { train, portal } => writeln!(s, "train {} left at portal {}", train, portal)?,
            Loaded { train, cars, unload: false } =>
                writeln!(s, "train {} loaded {} cars", train, cars)?,
            Loaded { train, cars, unload: true } =>
                writeln!(s, "train {} unloaded {} cars", train, cars)?,
            Event::Accident(ref a) => writeln!(s, "accident: {} at ({:.1}, {:.1})", a, a.at().x, a.at().y)?,
            Removed { train } => writeln!(s, "train {} removed", train)?,
        }
    }
    Ok(s)
}
