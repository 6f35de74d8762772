use oceanbc_core::config::OceanConfig;
use oceanbc_core::errors::{OceanError, OceanResult};
use oceanbc_core::model::{Lifecycle, MaxTimestep, OceanModel, OceanOutputs};
use oceanbc_core::timeseries::Time;
use tracing::debug;

/// Updates the wrapped model at most once per `update_interval` and reports
/// its cached outputs in between.
///
/// The wrapped model is updated over `[t, max(t + update_interval, t + dt)]`,
/// so it sees back-to-back windows even though it is updated less often.
#[derive(Debug)]
pub struct Cache {
    input: Box<dyn OceanModel>,
    update_interval: Time,
    next_update: Option<Time>,
    lifecycle: Lifecycle,
}

impl Cache {
    pub fn new(input: Box<dyn OceanModel>, config: &OceanConfig) -> OceanResult<Self> {
        let update_interval = config.cache.update_interval;
        if !(update_interval > 0.0 && update_interval.is_finite()) {
            return Err(OceanError::InvalidConfiguration(format!(
                "cache.update_interval must be positive, got {update_interval}"
            )));
        }
        Ok(Self {
            input,
            update_interval,
            next_update: None,
            lifecycle: Lifecycle::new("cache"),
        })
    }

    pub fn input(&self) -> &dyn OceanModel {
        self.input.as_ref()
    }

    /// Time at which the wrapped model is next updated.
    pub fn next_update(&self) -> Option<Time> {
        self.next_update
    }
}

impl OceanModel for Cache {
    fn name(&self) -> &str {
        self.lifecycle.name()
    }

    fn init(&mut self) -> OceanResult<()> {
        self.lifecycle.check_init()?;
        self.input.init()?;
        self.lifecycle.mark_ready();
        Ok(())
    }

    fn update(&mut self, t: Time, dt: Time) -> OceanResult<()> {
        self.lifecycle.check_window(t, dt)?;

        if self.next_update.map_or(true, |next| t >= next) {
            let input_dt = self.update_interval.max(dt);
            self.input.update(t, input_dt)?;
            self.next_update = Some(t + input_dt);
            debug!(t, dt = input_dt, "updated cached ocean model");
        }

        let outputs = self.input.outputs()?.clone();
        self.lifecycle.commit(t, dt, outputs);
        Ok(())
    }

    fn outputs(&self) -> OceanResult<&OceanOutputs> {
        self.lifecycle.outputs()
    }

    fn max_timestep(&self, t: Time) -> MaxTimestep {
        let own = match self.next_update {
            Some(next) if next > t => MaxTimestep::limited(next - t, "ocean cache"),
            _ => MaxTimestep::limited(self.update_interval, "ocean cache"),
        };
        own.min(self.input.max_timestep(t))
    }
}
