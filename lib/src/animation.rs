//! Accelerated simulated time, driven by frame timestamps.
use std::fmt;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::{canvas::DateTimeBean, time::duration_from_nanos, SkyError};

const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// Maps real elapsed time to simulated time.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeAccelerator {
    /// Simulated time runs `factor` times faster than real time.
    Continuous { factor: u32 },
    /// Simulated time jumps by `step` `frequency` times per real second.
    Discrete { frequency: u32, step: Duration },
}

impl TimeAccelerator {
    pub fn continuous(factor: u32) -> Result<Self, SkyError> {
        let accelerator = Self::Continuous { factor };
        accelerator.validate()?;
        Ok(accelerator)
    }

    pub fn discrete(frequency: u32, step: Duration) -> Result<Self, SkyError> {
        let accelerator = Self::Discrete { frequency, step };
        accelerator.validate()?;
        Ok(accelerator)
    }

    /// Checks the parameters of an accelerator built from its variants.
    pub fn validate(&self) -> Result<(), SkyError> {
        match *self {
            TimeAccelerator::Continuous { factor: 0 } => {
                Err(SkyError::config("acceleration factor must be positive"))
            }
            TimeAccelerator::Discrete { frequency: 0, .. } => {
                Err(SkyError::config("tick frequency must be positive"))
            }
            TimeAccelerator::Discrete { step, .. } if !step.is_positive() => Err(
                SkyError::config(format!("tick step {step} must be positive")),
            ),
            TimeAccelerator::Continuous { .. } | TimeAccelerator::Discrete { .. } => Ok(()),
        }
    }

    /// Simulated instant reached `elapsed_nanos` real nanoseconds after
    /// `baseline`.
    pub fn adjust(
        &self,
        baseline: OffsetDateTime,
        elapsed_nanos: i128,
    ) -> Result<OffsetDateTime, SkyError> {
        let offset = match *self {
            TimeAccelerator::Continuous { factor } => elapsed_nanos
                .checked_mul(factor as i128)
                .and_then(duration_from_nanos),
            TimeAccelerator::Discrete { frequency, step } => (frequency as i128)
                .checked_mul(elapsed_nanos)
                .map(|n| n.div_euclid(NANOS_PER_SECOND))
                .and_then(|ticks| ticks.checked_mul(step.whole_nanoseconds()))
                .and_then(duration_from_nanos),
        };
        offset
            .and_then(|offset| baseline.checked_add(offset))
            .ok_or_else(|| SkyError::invalid("simulated instant out of range"))
    }
}

impl Default for TimeAccelerator {
    fn default() -> Self {
        Self::Continuous { factor: 1 }
    }
}

/// The accelerators offered to the user.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedTimeAccelerator {
    #[serde(rename = "1x")]
    Times1,
    #[serde(rename = "30x")]
    Times30,
    #[default]
    #[serde(rename = "300x")]
    Times300,
    #[serde(rename = "3000x")]
    Times3000,
    #[serde(rename = "day")]
    Day,
    #[serde(rename = "sidereal-day")]
    SiderealDay,
}

impl NamedTimeAccelerator {
    pub const ALL: [NamedTimeAccelerator; 6] = [
        NamedTimeAccelerator::Times1,
        NamedTimeAccelerator::Times30,
        NamedTimeAccelerator::Times300,
        NamedTimeAccelerator::Times3000,
        NamedTimeAccelerator::Day,
        NamedTimeAccelerator::SiderealDay,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NamedTimeAccelerator::Times1 => "1×",
            NamedTimeAccelerator::Times30 => "30×",
            NamedTimeAccelerator::Times300 => "300×",
            NamedTimeAccelerator::Times3000 => "3000×",
            NamedTimeAccelerator::Day => "day",
            NamedTimeAccelerator::SiderealDay => "sidereal day",
        }
    }

    pub fn accelerator(self) -> TimeAccelerator {
        match self {
            NamedTimeAccelerator::Times1 => TimeAccelerator::Continuous { factor: 1 },
            NamedTimeAccelerator::Times30 => TimeAccelerator::Continuous { factor: 30 },
            NamedTimeAccelerator::Times300 => TimeAccelerator::Continuous { factor: 300 },
            NamedTimeAccelerator::Times3000 => TimeAccelerator::Continuous { factor: 3000 },
            NamedTimeAccelerator::Day => TimeAccelerator::Discrete {
                frequency: 60,
                step: Duration::days(1),
            },
            NamedTimeAccelerator::SiderealDay => TimeAccelerator::Discrete {
                frequency: 60,
                step: Duration::hours(23) + Duration::minutes(56) + Duration::seconds(4),
            },
        }
    }
}

impl fmt::Display for NamedTimeAccelerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Advances a [`DateTimeBean`] from frame timestamps while running.
#[derive(Clone, Debug, Default)]
pub struct TimeAnimator {
    accelerator: TimeAccelerator,
    running: bool,
    baseline: Option<OffsetDateTime>,
    /// Timestamp of the first frame after start, once it has been seen.
    frame_zero: Option<i64>,
}

impl TimeAnimator {
    pub fn new(accelerator: TimeAccelerator) -> Result<Self, SkyError> {
        accelerator.validate()?;
        Ok(Self {
            accelerator,
            ..Self::default()
        })
    }

    pub fn accelerator(&self) -> TimeAccelerator {
        self.accelerator
    }

    /// Takes effect on the next tick; the baseline is kept.
    pub fn set_accelerator(&mut self, accelerator: TimeAccelerator) -> Result<(), SkyError> {
        accelerator.validate()?;
        debug!(?accelerator, "accelerator changed");
        self.accelerator = accelerator;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self, date_time: &DateTimeBean) {
        if self.running {
            return;
        }
        let baseline = date_time.date_time();
        debug!(%baseline, "animation started");
        self.baseline = Some(baseline);
        self.frame_zero = None;
        self.running = true;
    }

    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        debug!("animation stopped");
        self.frame_zero = None;
        self.running = false;
    }

    /// Feeds one frame timestamp, in nanoseconds of an arbitrary monotonic
    /// clock.
    pub fn tick(&mut self, now_nanos: i64, date_time: &mut DateTimeBean) -> Result<(), SkyError> {
        if !self.running {
            return Ok(());
        }
        let Some(baseline) = self.baseline else {
            return Ok(());
        };
        let Some(frame_zero) = self.frame_zero else {
            self.frame_zero = Some(now_nanos);
            return Ok(());
        };
        let elapsed = now_nanos as i128 - frame_zero as i128;
        date_time.set_date_time(self.accelerator.adjust(baseline, elapsed)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    const SECOND: i64 = 1_000_000_000;

    fn bean() -> DateTimeBean {
        DateTimeBean::new(datetime!(2020-04-17 21:00 +2))
    }

    #[test]
    fn continuous_identity_and_linearity() {
        let t0 = datetime!(2020-04-17 21:00 +2);
        let x1 = TimeAccelerator::continuous(1).unwrap();
        assert_eq!(x1.adjust(t0, 0).unwrap(), t0);
        assert_eq!(x1.adjust(t0, 1_500_000_000).unwrap(), t0 + Duration::milliseconds(1500));

        let x300 = TimeAccelerator::continuous(300).unwrap();
        assert_eq!(x300.adjust(t0, 2 * SECOND as i128).unwrap(), t0 + Duration::minutes(10));
    }

    #[test]
    fn discrete_counts_whole_ticks() {
        let t0 = datetime!(2020-04-17 21:00 +2);
        let one_hz_day = TimeAccelerator::discrete(1, Duration::days(1)).unwrap();
        assert_eq!(
            one_hz_day.adjust(t0, 2_500_000_000).unwrap(),
            t0 + Duration::days(2)
        );

        // 60 Hz: nothing happens before the first 1/60 s has fully elapsed.
        let day = NamedTimeAccelerator::Day.accelerator();
        assert_eq!(day.adjust(t0, 16_666_666).unwrap(), t0);
        assert_eq!(day.adjust(t0, 16_666_667).unwrap(), t0 + Duration::days(1));
        assert_eq!(day.adjust(t0, SECOND as i128).unwrap(), t0 + Duration::days(60));
    }

    #[test]
    fn rejects_degenerate_accelerators() {
        assert!(matches!(
            TimeAccelerator::continuous(0),
            Err(SkyError::Configuration(_))
        ));
        assert!(TimeAccelerator::discrete(0, Duration::days(1)).is_err());
        assert!(TimeAccelerator::discrete(60, Duration::ZERO).is_err());
        assert!(TimeAccelerator::discrete(60, Duration::seconds(-1)).is_err());
    }

    #[test]
    fn animator_rejects_hand_built_accelerators() {
        assert!(matches!(
            TimeAnimator::new(TimeAccelerator::Continuous { factor: 0 }),
            Err(SkyError::Configuration(_))
        ));

        let mut animator = TimeAnimator::new(TimeAccelerator::default()).unwrap();
        let negative = TimeAccelerator::Discrete {
            frequency: 60,
            step: Duration::seconds(-1),
        };
        assert!(matches!(
            animator.set_accelerator(negative),
            Err(SkyError::Configuration(_))
        ));
        assert_eq!(animator.accelerator(), TimeAccelerator::default());
    }

    #[test]
    fn adjust_reports_overflow() {
        let t0 = datetime!(2020-04-17 21:00 +2);
        let fast = TimeAccelerator::continuous(u32::MAX).unwrap();
        assert!(matches!(
            fast.adjust(t0, i128::from(i64::MAX)),
            Err(SkyError::InvalidInput(_))
        ));
    }

    #[test]
    fn presets() {
        assert_eq!(NamedTimeAccelerator::default().name(), "300×");
        assert_eq!(
            NamedTimeAccelerator::SiderealDay.accelerator(),
            TimeAccelerator::Discrete {
                frequency: 60,
                step: Duration::seconds(86_164),
            }
        );
        assert_eq!(NamedTimeAccelerator::ALL.len(), 6);
    }

    #[test]
    fn first_tick_only_anchors() {
        let mut dt = bean();
        let t0 = dt.date_time();
        let mut animator = TimeAnimator::new(TimeAccelerator::continuous(60).unwrap()).unwrap();

        animator.tick(5 * SECOND, &mut dt).unwrap();
        assert_eq!(dt.date_time(), t0, "stopped animator must not move time");

        animator.start(&dt);
        animator.tick(100 * SECOND, &mut dt).unwrap();
        assert_eq!(dt.date_time(), t0);
        animator.tick(101 * SECOND, &mut dt).unwrap();
        assert_eq!(dt.date_time(), t0 + Duration::minutes(1));
        animator.tick(103 * SECOND, &mut dt).unwrap();
        assert_eq!(dt.date_time(), t0 + Duration::minutes(3));
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let mut dt = bean();
        let t0 = dt.date_time();
        let mut animator = TimeAnimator::new(TimeAccelerator::continuous(1).unwrap()).unwrap();
        animator.start(&dt);
        animator.tick(0, &mut dt).unwrap();
        animator.tick(10 * SECOND, &mut dt).unwrap();

        // A second start keeps the first baseline and frame zero.
        animator.start(&dt);
        animator.tick(20 * SECOND, &mut dt).unwrap();
        assert_eq!(dt.date_time(), t0 + Duration::seconds(20));

        animator.stop();
        animator.stop();
        assert!(!animator.is_running());
        animator.tick(30 * SECOND, &mut dt).unwrap();
        assert_eq!(dt.date_time(), t0 + Duration::seconds(20));
    }

    #[test]
    fn restart_rebases_on_current_time() {
        let mut dt = bean();
        let t0 = dt.date_time();
        let mut animator = TimeAnimator::new(TimeAccelerator::continuous(1).unwrap()).unwrap();
        animator.start(&dt);
        animator.tick(0, &mut dt).unwrap();
        animator.tick(10 * SECOND, &mut dt).unwrap();
        animator.stop();

        animator.start(&dt);
        animator.tick(500 * SECOND, &mut dt).unwrap();
        animator.tick(505 * SECOND, &mut dt).unwrap();
        assert_eq!(dt.date_time(), t0 + Duration::seconds(15));
    }

    #[test]
    fn swapping_accelerator_keeps_baseline() {
        let mut dt = bean();
        let t0 = dt.date_time();
        let mut animator = TimeAnimator::new(TimeAccelerator::continuous(1).unwrap()).unwrap();
        animator.start(&dt);
        animator.tick(0, &mut dt).unwrap();
        animator.tick(SECOND, &mut dt).unwrap();
        assert_eq!(dt.date_time(), t0 + Duration::seconds(1));

        animator
            .set_accelerator(TimeAccelerator::continuous(30).unwrap())
            .unwrap();
        assert!(animator.is_running());
        animator.tick(2 * SECOND, &mut dt).unwrap();
        assert_eq!(dt.date_time(), t0 + Duration::minutes(1));
    }
}
