//! CERN HTCondor job flavours (maximum wall-clock time classes).

use std::fmt;
use std::str::FromStr;

/// Value of `+JobFlavour` in `condor.sub`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobFlavour {
    /// 20 minutes.
    Espresso,
    /// 1 hour.
    Microcentury,
    /// 2 hours.
    #[default]
    Longlunch,
    /// 8 hours.
    Workday,
    /// 1 day.
    Tomorrow,
    /// 3 days.
    Testmatch,
    /// 1 week.
    Nextweek,
}

impl JobFlavour {
    /// All flavours, shortest first.
    pub const ALL: [JobFlavour; 7] = [
        JobFlavour::Espresso,
        JobFlavour::Microcentury,
        JobFlavour::Longlunch,
        JobFlavour::Workday,
        JobFlavour::Tomorrow,
        JobFlavour::Testmatch,
        JobFlavour::Nextweek,
    ];

    /// Name as HTCondor expects it.
    pub fn as_str(self) -> &'static str {
        match self {
            JobFlavour::Espresso => "espresso",
            JobFlavour::Microcentury => "microcentury",
            JobFlavour::Longlunch => "longlunch",
            JobFlavour::Workday => "workday",
            JobFlavour::Tomorrow => "tomorrow",
            JobFlavour::Testmatch => "testmatch",
            JobFlavour::Nextweek => "nextweek",
        }
    }
}

impl fmt::Display for JobFlavour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobFlavour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL.into_iter().find(|f| f.as_str() == lower).ok_or_else(|| {
            let names: Vec<_> = Self::ALL.iter().map(|f| f.as_str()).collect();
            format!("unknown job flavour '{s}' (expected one of: {})", names.join(", "))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_agree() {
        for f in JobFlavour::ALL {
            assert_eq!(f.to_string().parse::<JobFlavour>().unwrap(), f);
        }
        assert_eq!("Workday".parse::<JobFlavour>().unwrap(), JobFlavour::Workday);
        assert!("lunch".parse::<JobFlavour>().is_err());
        assert_eq!(JobFlavour::default(), JobFlavour::Longlunch);
    }
}
