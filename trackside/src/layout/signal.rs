//! Signal programs: the pluggable logic behind a signal segment.

use std::fmt;
use std::str::FromStr;

use crate::train::TrainId;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Indication {
    Clear,
    Caution,
    Stop,
}

impl Indication {
    pub fn as_str(&self) -> &'static str {
        match *self {
            Indication::Clear => "clear",
            Indication::Caution => "caution",
            Indication::Stop => "stop",
        }
    }
}

impl fmt::Display for Indication {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Indication {
    type Err = ProgramError;
    fn from_str(s: &str) -> Result<Indication, ProgramError> {
        match s {
            "clear" => Ok(Indication::Clear),
            "caution" => Ok(Indication::Caution),
            "stop" => Ok(Indication::Stop),
            _ => Err(ProgramError::BadValue("indication".to_string(), s.to_string())),
        }
    }
}

#[derive(Debug, Fail)]
pub enum ProgramError {
    #[fail(display = "missing signal state key: {}", _0)]
    MissingKey(String),
    #[fail(display = "bad signal state value {}={}", _0, _1)]
    BadValue(String, String),
}

/// The block protected by a signal, as seen at the start of a tick.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct BlockState {
    /// Some train stands on the track between this signal and the next.
    pub occupied: bool,
    /// Indication of the next signal met in the same direction.
    pub next: Option<Indication>,
}

pub trait SignalProgram: fmt::Debug {
    fn name(&self) -> &'static str;
    fn status(&self) -> Indication;
    /// A train passed the signal from its facing side.
    fn enter(&mut self, train: TrainId);
    /// Called once per tick with the state of the protected block.
    fn update(&mut self, _block: &BlockState) {}
    /// Operator click. Returns false if the program does not take manual input.
    fn toggle(&mut self) -> bool {
        false
    }
    fn save(&self) -> Vec<(String, String)>;
    fn restore(&mut self, state: &[(String, String)]) -> Result<(), ProgramError>;
}

fn lookup<'a>(state: &'a [(String, String)], key: &str) -> Result<&'a str, ProgramError> {
    state.iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .ok_or_else(|| ProgramError::MissingKey(key.to_string()))
}

/// Operator-controlled signal.
#[derive(Debug, Clone)]
pub struct ManualProgram {
    indication: Indication,
}

impl ManualProgram {
    pub fn new(indication: Indication) -> Self {
        ManualProgram { indication }
    }
}

impl SignalProgram for ManualProgram {
    fn name(&self) -> &'static str {
        "manual"
    }

    fn status(&self) -> Indication {
        self.indication
    }

    fn enter(&mut self, _train: TrainId) {}

    fn toggle(&mut self) -> bool {
        self.indication = match self.indication {
            Indication::Clear => Indication::Caution,
            Indication::Caution => Indication::Stop,
            Indication::Stop => Indication::Clear,
        };
        true
    }

    fn save(&self) -> Vec<(String, String)> {
        vec![("indication".to_string(), self.indication.to_string())]
    }

    fn restore(&mut self, state: &[(String, String)]) -> Result<(), ProgramError> {
        self.indication = lookup(state, "indication")?.parse()?;
        Ok(())
    }
}

/// Automatic block signal. Drops to stop behind every train it sees and
/// stays there while the block is occupied; shows caution in front of a
/// signal at stop.
#[derive(Debug, Clone)]
pub struct BlockProgram {
    indication: Indication,
    last_train: Option<TrainId>,
}

impl Default for BlockProgram {
    fn default() -> Self {
        BlockProgram { indication: Indication::Clear, last_train: None }
    }
}

impl SignalProgram for BlockProgram {
    fn name(&self) -> &'static str {
        "block"
    }

    fn status(&self) -> Indication {
        self.indication
    }

    fn enter(&mut self, train: TrainId) {
        self.indication = Indication::Stop;
        self.last_train = Some(train);
    }

    fn update(&mut self, block: &BlockState) {
        self.indication = if block.occupied {
            Indication::Stop
        } else if block.next == Some(Indication::Stop) {
            Indication::Caution
        } else {
            Indication::Clear
        };
    }

    fn save(&self) -> Vec<(String, String)> {
        let mut s = vec![("indication".to_string(), self.indication.to_string())];
        if let Some(t) = self.last_train {
            s.push(("last_train".to_string(), t.to_string()));
        }
        s
    }

    fn restore(&mut self, state: &[(String, String)]) -> Result<(), ProgramError> {
        self.indication = lookup(state, "indication")?.parse()?;
        self.last_train = match lookup(state, "last_train") {
            Ok(v) => Some(v.parse().map_err(|_| {
                ProgramError::BadValue("last_train".to_string(), v.to_string())
            })?),
            Err(_) => None,
        };
        Ok(())
    }
}

/// Build a program from its name, as stored in snapshots and scenarios.
pub fn program_by_name(name: &str) -> Option<Box<dyn SignalProgram>> {
    match name {
        "manual" => Some(Box::new(ManualProgram::new(Indication::Stop))),
        "block" => Some(Box::new(BlockProgram::default())),
        _ => None,
    }
}
