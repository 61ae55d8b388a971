// Runner module - sequences training, artifact discovery and demo evaluation

pub mod artifact;
pub mod launcher;
pub mod smoke;
pub mod workspace;

pub use artifact::discover_artifact;
pub use launcher::{Invocation, Launcher, ProcessLauncher};
pub use smoke::{SmokeReport, SmokeTest, REPORT_FILE};
pub use workspace::Workspace;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which of the two trainer invocations is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Train,
    Demo,
}

impl Mode {
    /// File stem used for captured logs
    pub fn log_stem(&self) -> &'static str {
        match self {
            Mode::Train => "train",
            Mode::Demo => "demo",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.log_stem())
    }
}

/// Accelerator index passed through as `--gpu`; `-1` means none
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub struct Accelerator(Option<u32>);

impl Accelerator {
    pub const NONE: Accelerator = Accelerator(None);

    pub fn device(index: u32) -> Self {
        Self(Some(index))
    }

    pub fn index(&self) -> Option<u32> {
        self.0
    }
}

impl From<Accelerator> for i64 {
    fn from(acc: Accelerator) -> Self {
        acc.0.map(i64::from).unwrap_or(-1)
    }
}

impl TryFrom<i64> for Accelerator {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::NONE),
            v if v >= 0 => u32::try_from(v)
                .map(Self::device)
                .map_err(|_| format!("accelerator index {} is out of range", v)),
            v => Err(format!(
                "accelerator index must be -1 (none) or a device number, got {}",
                v
            )),
        }
    }
}

impl FromStr for Accelerator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| format!("'{}' is not an accelerator index", s))?;
        Self::try_from(value)
    }
}

impl fmt::Display for Accelerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", i64::from(*self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accelerator_parse() {
        assert_eq!("-1".parse::<Accelerator>().unwrap(), Accelerator::NONE);
        assert_eq!("0".parse::<Accelerator>().unwrap(), Accelerator::device(0));
        assert_eq!(" 3 ".parse::<Accelerator>().unwrap().index(), Some(3));
        assert!("-2".parse::<Accelerator>().is_err());
        assert!("gpu0".parse::<Accelerator>().is_err());
    }

    #[test]
    fn test_accelerator_display_round_trips_cli_value() {
        assert_eq!(Accelerator::NONE.to_string(), "-1");
        assert_eq!(Accelerator::device(1).to_string(), "1");
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(Mode::Train.to_string(), "train");
        assert_eq!(Mode::Demo.log_stem(), "demo");
    }
}
