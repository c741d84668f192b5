// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::time::{Duration, Instant};

use crate::errors::Error;

pub(crate) const NUMERICAL_EPSILON: f64 = 1e-9;

/// Cooperative time limit of a single calculation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
    start: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    pub(crate) fn start(limit_ms: Option<u64>) -> Self {
        Deadline {
            start: Instant::now(),
            limit: limit_ms.map(Duration::from_millis),
        }
    }

    pub(crate) fn check(&self) -> Result<(), Error> {
        match self.limit {
            Some(limit) if self.start.elapsed() >= limit => Err(Error::Timeout {
                limit_ms: limit.as_millis() as u64,
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline() {
        assert!(Deadline::start(None).check().is_ok());
        assert!(Deadline::start(Some(60_000)).check().is_ok());

        let expired = Deadline {
            start: Instant::now() - Duration::from_millis(20),
            limit: Some(Duration::from_millis(10)),
        };
        assert_eq!(expired.check(), Err(Error::Timeout { limit_ms: 10 }));

        assert_eq!(
            Deadline::start(Some(0)).check(),
            Err(Error::Timeout { limit_ms: 0 })
        );
    }
}
